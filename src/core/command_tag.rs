//! Affected-row extraction from SQL command tags
//!
//! PostgreSQL reports the outcome of a write as a short tag such as
//! `INSERT 0 12` (verb, legacy oid, count) or `DELETE 24` (verb, count).

use crate::core::error::{DatabaseError, Result};

/// Number of rows a write statement affected, as reported by its tag
///
/// The verb is matched case-insensitively. `INSERT` tags carry three fields;
/// `DELETE` and `UPDATE` tags carry two.
///
/// # Errors
///
/// - [`DatabaseError::UnknownCommandTag`] for any other verb
/// - [`DatabaseError::InvalidCommandTag`] for a known verb with the wrong
///   field count or a non-numeric count
///
/// # Example
///
/// ```
/// use rust_user_store::core::command_tag::parse_command_tag;
///
/// assert_eq!(parse_command_tag("INSERT 0 12").unwrap(), 12);
/// assert_eq!(parse_command_tag("DELETE 24").unwrap(), 24);
/// assert!(parse_command_tag("INSERT 24").is_err());
/// ```
pub fn parse_command_tag(tag: &str) -> Result<u64> {
    let fields: Vec<&str> = tag.split_whitespace().collect();
    let verb = fields.first().map(|v| v.to_ascii_uppercase()).unwrap_or_default();

    let expected = match verb.as_str() {
        "INSERT" => 3,
        "DELETE" | "UPDATE" => 2,
        _ => return Err(DatabaseError::UnknownCommandTag(tag.to_string())),
    };

    if fields.len() != expected {
        return Err(DatabaseError::InvalidCommandTag {
            tag: tag.to_string(),
            source: None,
        });
    }

    fields[expected - 1]
        .parse::<u64>()
        .map_err(|err| DatabaseError::InvalidCommandTag {
            tag: tag.to_string(),
            source: Some(err),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_tag() {
        assert_eq!(parse_command_tag("INSERT 0 12").unwrap(), 12);
        assert_eq!(parse_command_tag("insert 12 24").unwrap(), 24);
    }

    #[test]
    fn test_delete_and_update_tags() {
        assert_eq!(parse_command_tag("DELETE 24").unwrap(), 24);
        assert_eq!(parse_command_tag("UPDATE 0").unwrap(), 0);
    }

    #[test]
    fn test_wrong_field_count() {
        for tag in ["INSERT 24", "INSERT 0 1 2", "DELETE", "DELETE 1 2"] {
            assert!(
                matches!(
                    parse_command_tag(tag),
                    Err(DatabaseError::InvalidCommandTag { source: None, .. })
                ),
                "{tag}"
            );
        }
    }

    #[test]
    fn test_non_numeric_count() {
        let err = parse_command_tag("DELETE many").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidCommandTag { source: Some(_), .. }
        ));
        assert!(parse_command_tag("INSERT 0 -3").is_err());
    }

    #[test]
    fn test_unknown_verb() {
        assert!(matches!(
            parse_command_tag("UNKNOWN 1 2"),
            Err(DatabaseError::UnknownCommandTag(_))
        ));
        assert!(matches!(
            parse_command_tag(""),
            Err(DatabaseError::UnknownCommandTag(_))
        ));
        assert!(matches!(
            parse_command_tag("SELECT 3"),
            Err(DatabaseError::UnknownCommandTag(_))
        ));
    }
}

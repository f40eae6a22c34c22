use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{AbstractType, EntityTable, InputKind, StorageType};

/// Letter first, then up to 63 letters, digits or underscores.
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,63}$").expect("identifier pattern compiles"));

/// Returns `true` if `name` may be used as a column identifier in statement text.
///
/// Identifiers cannot be bound as parameters, so this check is the only thing standing
/// between admin input and the schema.
pub fn validate_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Returns `true` if `name` is one of the extendable entity tables.
pub fn validate_table(name: &str) -> bool {
    EntityTable::parse(name).is_some()
}

/// Physical storage type for a type key; `None` for anything outside the vocabulary.
pub fn resolve_storage_type(key: &str) -> Option<StorageType> {
    AbstractType::parse(key).map(|ty| ty.storage_type())
}

/// Rendering kind for a type key, falling back to a plain text input.
///
/// Presentation only: storage decisions go through [`resolve_storage_type`].
pub fn resolve_input_kind(key: &str) -> InputKind {
    AbstractType::parse(key).map(|ty| ty.input_kind()).unwrap_or_default()
}

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_grammar() {
        assert!(validate_identifier("patent_office"));
        assert!(validate_identifier("a"));
        assert!(validate_identifier("NPI_code2"));
        assert!(validate_identifier(&format!("a{}", "b".repeat(63))));

        assert!(!validate_identifier(""));
        assert!(!validate_identifier("_private"));
        assert!(!validate_identifier("1st"));
        assert!(!validate_identifier("has space"));
        assert!(!validate_identifier("drop;table"));
        assert!(!validate_identifier("quote\"d"));
        assert!(!validate_identifier("trailing\n"));
        assert!(!validate_identifier("café"));
        assert!(!validate_identifier(&format!("a{}", "b".repeat(64))));
    }

    #[test]
    fn table_membership() {
        assert!(validate_table("patents"));
        assert!(validate_table("commercializations"));
        assert!(!validate_table("publications"));
        assert!(!validate_table("Patents"));
        assert!(!validate_table("dynamic_fields"));
    }

    #[test]
    fn type_lookups_are_total_over_vocabulary() {
        for ty in AbstractType::ALL {
            assert_eq!(resolve_storage_type(ty.key()), Some(ty.storage_type()));
            assert_eq!(resolve_input_kind(ty.key()), ty.input_kind());
        }
        assert_eq!(resolve_storage_type("varchar"), None);
        assert_eq!(resolve_input_kind("varchar"), InputKind::Text);
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("invalid"));
    }
}

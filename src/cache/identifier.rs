//! Identifier validation
//!
//! Table and column names cannot be bound as statement parameters, so they
//! are checked here before being interpolated into SQL text.

use crate::cache::entry::{EXPIRE_COLUMN, TIMESTAMP_COLUMN};
use crate::storage::Storage;

/// Name of the auto-increment primary key column.
pub const ID_COLUMN: &str = "id";

/// Checks that `token` is safe to interpolate as an identifier.
///
/// A token is valid when it is non-empty and the storage layer's escaping
/// leaves it unchanged. Without a storage connection nothing is valid.
pub fn validate_identifier(storage: Option<&dyn Storage>, token: &str) -> bool {
    match storage {
        Some(storage) => !token.is_empty() && storage.escape(token) == token,
        None => false,
    }
}

/// Checks whether a column name collides with one of the fixed columns.
pub fn is_reserved_column(name: &str) -> bool {
    [ID_COLUMN, EXPIRE_COLUMN, TIMESTAMP_COLUMN]
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Wraps a validated identifier in double quotes for SQLite.
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_plain_identifiers_are_valid() {
        let storage = SqliteStorage::in_memory().unwrap();
        let storage: &dyn Storage = &storage;

        for token in ["cache", "foo", "alice_bob", "Table1"] {
            assert!(validate_identifier(Some(storage), token), "{token}");
        }
    }

    #[test]
    fn test_injection_is_rejected() {
        let storage = SqliteStorage::in_memory().unwrap();
        let storage: &dyn Storage = &storage;

        assert!(!validate_identifier(
            Some(storage),
            "foo'; DROP TABLE cache; --"
        ));
        assert!(!validate_identifier(Some(storage), "foo\"bar"));
        assert!(!validate_identifier(Some(storage), "back\\slash"));
    }

    #[test]
    fn test_empty_is_rejected() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert!(!validate_identifier(Some(&storage), ""));
    }

    #[test]
    fn test_no_storage_rejects_everything() {
        assert!(!validate_identifier(None, "cache"));
    }

    #[test]
    fn test_reserved_columns() {
        assert!(is_reserved_column("id"));
        assert!(is_reserved_column("EXPIRE"));
        assert!(is_reserved_column("Timestamp"));
        assert!(!is_reserved_column("key"));
    }
}

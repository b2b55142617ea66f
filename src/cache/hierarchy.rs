//! Hierarchical key namespace
//!
//! Wraps any [`TtlCache`] and rewrites every key into `base<delimiter>key`,
//! where the base is a stack of pushed segments.

use tracing::debug;

use crate::cache::{CacheEntry, SimpleCache, TtlCache, DEFAULT_DELIMITER, DEFAULT_PLACEHOLDER};
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};

// == Hierarchical Cache ==
/// A cache whose keys live under a mutable path-like base.
///
/// The base starts at the root, which is the delimiter itself. Segments
/// pushed onto the base, and keys resolved against it, have every literal
/// delimiter replaced by the placeholder so they always form one level.
#[derive(Debug)]
pub struct HierarchicalCache<C = SimpleCache> {
    inner: C,
    base: String,
    delimiter: String,
    placeholder: String,
}

impl<C: TtlCache> HierarchicalCache<C> {
    // == Constructors ==
    /// Wraps `inner` with the default delimiter and placeholder, at the root.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            base: DEFAULT_DELIMITER.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    /// Wraps `inner` with a custom hierarchy.
    ///
    /// `base` defaults to the chosen delimiter. The delimiter and placeholder
    /// must be non-empty and distinct.
    pub fn with_hierarchy(
        inner: C,
        base: Option<&str>,
        delimiter: &str,
        placeholder: &str,
    ) -> Result<Self> {
        check_pair(delimiter, placeholder)?;
        Ok(Self {
            inner,
            base: base.unwrap_or(delimiter).to_string(),
            delimiter: delimiter.to_string(),
            placeholder: placeholder.to_string(),
        })
    }

    /// Wraps `inner` using the hierarchy fields of `options`.
    pub fn from_options(inner: C, options: &CacheOptions) -> Result<Self> {
        Self::with_hierarchy(
            inner,
            options.base.as_deref(),
            &options.delimiter,
            &options.placeholder,
        )
    }

    // == Accessors ==
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Changes the delimiter. Rejected when empty or equal to the placeholder.
    ///
    /// A base sitting at the root moves to the new root. Any other base is
    /// kept verbatim, so segments pushed under the old delimiter pop as one.
    pub fn set_delimiter(&mut self, delimiter: &str) -> Result<()> {
        check_pair(delimiter, &self.placeholder)?;
        if self.base == self.delimiter {
            self.base = delimiter.to_string();
        }
        self.delimiter = delimiter.to_string();
        Ok(())
    }

    /// Changes the placeholder. Rejected when empty or equal to the delimiter.
    pub fn set_placeholder(&mut self, placeholder: &str) -> Result<()> {
        check_pair(&self.delimiter, placeholder)?;
        self.placeholder = placeholder.to_string();
        Ok(())
    }

    // == Key Resolution ==
    /// Replaces every delimiter in `segment` with the placeholder.
    pub fn escape_segment(&self, segment: &str) -> String {
        segment.replace(&self.delimiter, &self.placeholder)
    }

    /// Returns the storage key for `key` under the current base.
    pub fn resolved_key(&self, key: &str) -> String {
        format!("{}{}{}", self.base, self.delimiter, self.escape_segment(key))
    }

    // == Push ==
    /// Appends one level to the base and returns the new base.
    pub fn push(&mut self, segment: &str) -> &str {
        let escaped = self.escape_segment(segment);
        self.base.push_str(&self.delimiter);
        self.base.push_str(&escaped);
        debug!("Pushed `{}`, base is now `{}`", escaped, self.base);
        &self.base
    }

    // == Pop ==
    /// Removes the last level of the base and returns it.
    ///
    /// Returns `None` and leaves the base unchanged when it is empty or at
    /// the root. A base with no delimiter left is popped whole, leaving it
    /// empty.
    pub fn pop(&mut self) -> Option<String> {
        if self.base.is_empty() || self.base == self.delimiter {
            return None;
        }

        let mut layers: Vec<&str> = self.base.split(self.delimiter.as_str()).collect();
        let last = layers.pop().unwrap_or_default().to_string();
        self.base = if layers.is_empty() {
            String::new()
        } else {
            layers.join(self.delimiter.as_str())
        };

        debug!("Popped `{}`, base is now `{}`", last, self.base);
        Some(last)
    }
}

fn check_pair(delimiter: &str, placeholder: &str) -> Result<()> {
    if delimiter.is_empty() || placeholder.is_empty() {
        return Err(CacheError::InvalidHierarchy(
            "delimiter and placeholder must not be empty".to_string(),
        ));
    }
    if delimiter == placeholder {
        return Err(CacheError::InvalidHierarchy(format!(
            "delimiter and placeholder must differ (both `{}`)",
            delimiter
        )));
    }
    Ok(())
}

impl<C: TtlCache> TtlCache for HierarchicalCache<C> {
    fn fetch(&mut self, key: &str) -> Result<Option<String>> {
        let key = self.resolved_key(key);
        self.inner.fetch(&key)
    }

    fn store(&mut self, key: &str, payload: String, lifetime: Option<u64>) -> Result<()> {
        let key = self.resolved_key(key);
        self.inner.store(&key, payload, lifetime)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let key = self.resolved_key(key);
        self.inner.delete(&key)
    }

    fn get_entry(&mut self, key: &str) -> Result<Option<CacheEntry>> {
        let key = self.resolved_key(key);
        self.inner.get_entry(&key)
    }

    /// Purging is not scoped to the base; it covers the whole table.
    fn purge_expired(&mut self) -> Result<usize> {
        self.inner.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Expiration;
    use crate::storage::SqliteStorage;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn test_cache() -> HierarchicalCache {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap());
        HierarchicalCache::new(SimpleCache::new(storage))
    }

    /// Records resolved keys instead of persisting anything.
    #[derive(Default)]
    struct RecordingCache {
        rows: HashMap<String, String>,
    }

    impl TtlCache for RecordingCache {
        fn fetch(&mut self, key: &str) -> Result<Option<String>> {
            Ok(self.rows.get(key).cloned())
        }

        fn store(&mut self, key: &str, payload: String, _lifetime: Option<u64>) -> Result<()> {
            self.rows.insert(key.to_string(), payload);
            Ok(())
        }

        fn delete(&mut self, key: &str) -> Result<()> {
            self.rows.remove(key);
            Ok(())
        }

        fn get_entry(&mut self, _key: &str) -> Result<Option<CacheEntry>> {
            Ok(None)
        }

        fn purge_expired(&mut self) -> Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_defaults() {
        let cache = test_cache();
        assert_eq!(cache.base(), "/");
        assert_eq!(cache.delimiter(), "/");
        assert_eq!(cache.placeholder(), "_");
    }

    #[test]
    fn test_resolved_key_at_root() {
        let cache = test_cache();
        assert_eq!(cache.resolved_key("x"), "//x");
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut cache = HierarchicalCache::new(RecordingCache::default());

        assert_eq!(cache.push("a"), "//a");
        assert_eq!(cache.push("b"), "//a/b");
        cache.set("x", "v", None).unwrap();
        assert!(cache.inner().rows.contains_key("//a/b/x"));

        assert_eq!(cache.pop().as_deref(), Some("b"));
        assert_eq!(cache.base(), "//a");
        assert_eq!(cache.pop().as_deref(), Some("a"));
        assert_eq!(cache.base(), "/");
        assert_eq!(cache.pop(), None);
        assert_eq!(cache.base(), "/");
    }

    #[test]
    fn test_push_escapes_delimiter() {
        let mut cache = test_cache();

        assert_eq!(cache.push("a/b"), "//a_b");
        assert_eq!(cache.pop().as_deref(), Some("a_b"));
    }

    #[test]
    fn test_key_escapes_delimiter() {
        let cache = test_cache();
        assert_eq!(cache.resolved_key("x/y"), "//x_y");
    }

    #[test]
    fn test_pop_custom_base() {
        let mut cache =
            HierarchicalCache::with_hierarchy(RecordingCache::default(), Some("app"), "/", "_")
                .unwrap();

        assert_eq!(cache.push("users"), "app/users");
        assert_eq!(cache.pop().as_deref(), Some("users"));
        assert_eq!(cache.pop().as_deref(), Some("app"));
        assert_eq!(cache.base(), "");
        assert_eq!(cache.pop(), None);
        assert_eq!(cache.resolved_key("k"), "/k");
    }

    #[test]
    fn test_custom_delimiter_defaults_base() {
        let cache =
            HierarchicalCache::with_hierarchy(RecordingCache::default(), None, "::", "-").unwrap();

        assert_eq!(cache.base(), "::");
        assert_eq!(cache.resolved_key("a::b"), "::::a-b");
    }

    #[test]
    fn test_delimiter_guards() {
        let mut cache = test_cache();

        assert!(matches!(
            cache.set_delimiter(""),
            Err(CacheError::InvalidHierarchy(_))
        ));
        assert!(matches!(
            cache.set_delimiter("_"),
            Err(CacheError::InvalidHierarchy(_))
        ));
        assert_eq!(cache.delimiter(), "/");

        cache.set_delimiter(".").unwrap();
        assert_eq!(cache.delimiter(), ".");
    }

    #[test]
    fn test_root_follows_delimiter_change() {
        let mut cache = HierarchicalCache::new(RecordingCache::default());

        cache.set_delimiter(".").unwrap();

        assert_eq!(cache.base(), ".");
        assert_eq!(cache.pop(), None);
        assert_eq!(cache.push("a.b"), "..a_b");
        assert_eq!(cache.pop().as_deref(), Some("a_b"));
        assert_eq!(cache.base(), ".");
    }

    #[test]
    fn test_delimiter_change_keeps_pushed_base() {
        let mut cache = HierarchicalCache::new(RecordingCache::default());
        cache.push("a");

        cache.set_delimiter(".").unwrap();

        assert_eq!(cache.base(), "//a");
        assert_eq!(cache.resolved_key("k"), "//a.k");
    }

    #[test]
    fn test_placeholder_guards() {
        let mut cache = test_cache();

        assert!(matches!(
            cache.set_placeholder(""),
            Err(CacheError::InvalidHierarchy(_))
        ));
        assert!(matches!(
            cache.set_placeholder("/"),
            Err(CacheError::InvalidHierarchy(_))
        ));
        assert_eq!(cache.placeholder(), "_");

        cache.set_placeholder("+").unwrap();
        assert_eq!(cache.escape_segment("a/b"), "a+b");
    }

    #[test]
    fn test_with_hierarchy_rejects_equal_pair() {
        let result = HierarchicalCache::with_hierarchy(RecordingCache::default(), None, "|", "|");
        assert!(matches!(result, Err(CacheError::InvalidHierarchy(_))));
    }

    #[test]
    fn test_operations_use_resolved_key() {
        let mut cache = test_cache();
        cache.push("tenant");

        cache.set("k", &42, Some(0)).unwrap();

        assert_eq!(cache.get::<i32>("k").unwrap(), Some(42));
        assert_eq!(cache.get_expiration("k").unwrap(), Some(Expiration::Never));
        assert!(cache.get_timestamp("k").unwrap().is_some());
        assert_eq!(cache.inner_mut().get::<i32>("//tenant/k").unwrap(), Some(42));
        assert_eq!(cache.inner_mut().get::<i32>("k").unwrap(), None);

        // Different base, different key
        cache.pop();
        assert_eq!(cache.get::<i32>("k").unwrap(), None);

        cache.push("tenant");
        cache.delete("k").unwrap();
        assert_eq!(cache.get::<i32>("k").unwrap(), None);
    }

    #[test]
    fn test_missing_row_has_no_metadata() {
        let mut cache = test_cache();
        cache.push("a");
        cache.set("forever", "v", Some(0)).unwrap();

        assert_eq!(cache.get_expiration("missing").unwrap(), None);
        assert_eq!(cache.get_timestamp("missing").unwrap(), None);
        assert_eq!(cache.get_expiration("forever").unwrap(), Some(Expiration::Never));

        // Same key under another base does not exist
        cache.pop();
        assert_eq!(cache.get_expiration("forever").unwrap(), None);
    }

    #[test]
    fn test_entry_key_is_resolved() {
        let mut cache = test_cache();
        cache.push("a");
        cache.set("k", "v", None).unwrap();

        let entry = cache.get_entry("k").unwrap().unwrap();
        assert_eq!(entry.key, "//a/k");
    }
}

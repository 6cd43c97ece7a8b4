//! Ordered key/value container used for column labels and row values.
//!
//! A [`Set`] is the host's generic row representation: the driver fills the
//! keys with column labels once per statement, and each fetched row writes
//! values into the same positions. Keys are not required to be unique, so
//! a join returning two `id` columns keeps both.

/// One key/value pair of a [`Set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: Option<String>,
}

/// Ordered sequence of `(key, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    name: Option<String>,
    fields: Vec<Field>,
}

impl Set {
    /// Create an empty set with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            fields: Vec::new(),
        }
    }

    /// Create an empty set with no name.
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Create a set whose keys are the given labels and whose values are empty.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::unnamed();
        for key in keys {
            set.put(key, None);
        }
        set
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Append a field and return its index.
    pub fn put(&mut self, key: impl Into<String>, value: Option<String>) -> usize {
        self.fields.push(Field {
            key: key.into(),
            value,
        });
        self.fields.len() - 1
    }

    /// Replace the value at `index`. Out-of-range indexes are ignored.
    pub fn put_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = Some(value.into());
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.key.as_str())
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|f| f.value.as_deref())
    }

    /// Index of the first field with this key.
    pub fn find(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }

    /// Value of the first field with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(|i| self.value(i))
    }

    /// Drop every field at or beyond `len`.
    pub fn truncate(&mut self, len: usize) {
        self.fields.truncate(len);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|f| (f.key.as_str(), f.value.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_lookup() {
        let mut set = Set::new("row");
        assert_eq!(set.put("id", None), 0);
        assert_eq!(set.put("name", Some("alice".to_string())), 1);

        assert_eq!(set.name(), Some("row"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.key(1), Some("name"));
        assert_eq!(set.get("name"), Some("alice"));
        assert_eq!(set.get("id"), None);
        assert_eq!(set.find("missing"), None);
    }

    #[test]
    fn test_duplicate_keys_keep_positions() {
        let mut set = Set::with_keys(["id", "id"]);
        set.put_value(1, "7");
        assert_eq!(set.find("id"), Some(0));
        assert_eq!(set.value(0), None);
        assert_eq!(set.value(1), Some("7"));
    }

    #[test]
    fn test_put_value_out_of_range_is_ignored() {
        let mut set = Set::with_keys(["a"]);
        set.put_value(3, "x");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_truncate_and_iter() {
        let mut set = Set::with_keys(["a", "b", "c"]);
        set.put_value(0, "1");
        set.truncate(2);
        let pairs: Vec<_> = set.iter().collect();
        assert_eq!(pairs, vec![("a", Some("1")), ("b", None)]);
        set.clear();
        assert!(set.is_empty());
    }
}

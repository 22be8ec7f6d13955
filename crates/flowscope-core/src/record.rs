//! Untyped per-request input: feature name to submitted text.

use std::collections::HashMap;

use crate::schema::{FeatureSchema, FeatureVector};

/// Raw, unvalidated field values keyed by feature name.
///
/// Presence is explicit: a key mapped to `None` was declared but carries
/// no value, which validation treats the same as an absent key. The
/// record is unordered; only [`FeatureSchema`] defines an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    values: HashMap<String, Option<String>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs such as decoded form data.
    ///
    /// When a name repeats, the first occurrence wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in pairs {
            record
                .values
                .entry(name.into())
                .or_insert_with(|| Some(value.into()));
        }
        record
    }

    /// Text form of every value in a feature vector.
    pub fn from_vector(vector: &FeatureVector) -> Self {
        Self::from_pairs(vector.iter().map(|(name, v)| (name, v.to_string())))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), Some(value.into()));
    }

    /// Declare a field with no value.
    pub fn insert_absent(&mut self, name: impl Into<String>) {
        self.values.insert(name.into(), None);
    }

    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        self.values.remove(name)
    }

    /// The submitted text for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present values as `(name, value)` pairs in schema order.
    ///
    /// Fields without a value are skipped; names outside the schema are
    /// dropped.
    pub fn to_pairs(&self, schema: &FeatureSchema) -> Vec<(String, String)> {
        schema
            .names()
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.clone(), v.to_string())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_duplicate_wins() {
        let record = RawRecord::from_pairs([("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(record.get("a"), Some("1"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn declared_but_absent_reads_as_none() {
        let mut record = RawRecord::new();
        record.insert_absent("a");
        record.insert("b", "");
        assert_eq!(record.get("a"), None);
        assert_eq!(record.get("b"), Some(""));
        assert_eq!(record.get("c"), None);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn pairs_follow_schema_order() {
        let schema = FeatureSchema::new(["x", "y", "z"]).unwrap();
        let record: RawRecord = [("z", "3"), ("x", "1"), ("extra", "9")]
            .into_iter()
            .collect();
        assert_eq!(
            record.to_pairs(&schema),
            vec![("x".to_string(), "1".to_string()), ("z".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn from_vector_formats_values() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let v = FeatureVector::new(schema, vec![62015.0, 0.5]).unwrap();
        let record = RawRecord::from_vector(&v);
        assert_eq!(record.get("a"), Some("62015"));
        assert_eq!(record.get("b"), Some("0.5"));
    }
}

//! The feature schema shared by every Flowscope component.
//!
//! The classifier was fit against 83 named flow statistics in a fixed
//! order. [`FeatureSchema`] is the single place that order is defined;
//! [`FeatureVector`] is a row of values aligned to it.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use thiserror::Error;

/// Number of features in the canonical flow schema.
pub const FEATURE_COUNT: usize = 83;

/// Canonical flow feature names, in the order the classifier expects.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Flow ID",
    "Source IP",
    "Source Port",
    "Destination IP",
    "Destination Port",
    "Protocol",
    "Timestamp",
    "Flow Duration",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Total Length of Fwd Packets",
    "Total Length of Bwd Packets",
    "Fwd Packet Length Max",
    "Fwd Packet Length Min",
    "Fwd Packet Length Mean",
    "Fwd Packet Length Std",
    "Bwd Packet Length Max",
    "Bwd Packet Length Min",
    "Bwd Packet Length Mean",
    "Bwd Packet Length Std",
    "Flow Bytes/s",
    "Flow Packets/s",
    "Flow IAT Mean",
    "Flow IAT Std",
    "Flow IAT Max",
    "Flow IAT Min",
    "Fwd IAT Total",
    "Fwd IAT Mean",
    "Fwd IAT Std",
    "Fwd IAT Max",
    "Fwd IAT Min",
    "Bwd IAT Total",
    "Bwd IAT Mean",
    "Bwd IAT Std",
    "Bwd IAT Max",
    "Bwd IAT Min",
    "Fwd PSH Flags",
    "Bwd PSH Flags",
    "Fwd URG Flags",
    "Bwd URG Flags",
    "Fwd Header Length",
    "Bwd Header Length",
    "Fwd Packets/s",
    "Bwd Packets/s",
    "Min Packet Length",
    "Max Packet Length",
    "Packet Length Mean",
    "Packet Length Std",
    "Packet Length Variance",
    "FIN Flag Count",
    "SYN Flag Count",
    "RST Flag Count",
    "PSH Flag Count",
    "ACK Flag Count",
    "URG Flag Count",
    "CWE Flag Count",
    "ECE Flag Count",
    "Down/Up Ratio",
    "Average Packet Size",
    "Avg Fwd Segment Size",
    "Avg Bwd Segment Size",
    "Fwd Avg Bytes/Bulk",
    "Fwd Avg Packets/Bulk",
    "Fwd Avg Bulk Rate",
    "Bwd Avg Bytes/Bulk",
    "Bwd Avg Packets/Bulk",
    "Bwd Avg Bulk Rate",
    "Subflow Fwd Packets",
    "Subflow Fwd Bytes",
    "Subflow Bwd Packets",
    "Subflow Bwd Bytes",
    "Init_Win_bytes_forward",
    "Init_Win_bytes_backward",
    "act_data_pkt_fwd",
    "min_seg_size_forward",
    "Active Mean",
    "Active Std",
    "Active Max",
    "Active Min",
    "Idle Mean",
    "Idle Std",
    "Idle Max",
    "Idle Min",
];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    Empty,

    #[error("duplicate feature name: {0}")]
    DuplicateField(String),

    #[error("expected {expected} feature values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("no value for feature {0}")]
    MissingField(String),

    #[error("feature {field} is not a finite number")]
    NonFinite { field: String },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Ordered, immutable list of distinct feature names.
///
/// Cloning is cheap (the names live behind an `Arc`), so every component
/// holds its own handle instead of re-declaring the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl FeatureSchema {
    /// The canonical 83-feature flow schema.
    pub fn flow() -> Self {
        Self {
            names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build a schema from an arbitrary ordered list of names.
    pub fn new<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateField(name.clone()));
            }
        }

        Ok(Self {
            names: names.into(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Arrow schema with one non-null `Float64` column per feature.
    pub fn to_arrow(&self) -> Schema {
        Schema::new(
            self.names
                .iter()
                .map(|name| Field::new(name.as_str(), DataType::Float64, false))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::flow()
    }
}

/// One row of finite feature values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pair `values` with `schema`, position by position.
    ///
    /// Fails unless there is exactly one finite value per schema field.
    pub fn new(schema: FeatureSchema, values: Vec<f64>) -> Result<Self, SchemaError> {
        if values.len() != schema.len() {
            return Err(SchemaError::LengthMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(SchemaError::NonFinite {
                field: schema.names()[i].clone(),
            });
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a feature looked up by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.index_of(name).map(|i| self.values[i])
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Single-row Arrow batch whose columns follow the schema order.
    pub fn to_record_batch(&self) -> Result<RecordBatch, SchemaError> {
        let columns: Vec<ArrayRef> = self
            .values
            .iter()
            .map(|&v| Arc::new(Float64Array::from(vec![v])) as ArrayRef)
            .collect();
        Ok(RecordBatch::try_new(
            Arc::new(self.schema.to_arrow()),
            columns,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn flow_schema_has_83_distinct_names() {
        let schema = FeatureSchema::flow();
        assert_eq!(schema.len(), FEATURE_COUNT);
        assert!(FeatureSchema::new(FEATURE_NAMES).is_ok());
        assert_eq!(schema.index_of("Destination Port"), Some(4));
        assert_eq!(schema.index_of("Idle Min"), Some(82));
    }

    #[test]
    fn arrow_schema_mirrors_feature_order() {
        let arrow = FeatureSchema::flow().to_arrow();
        assert_eq!(arrow.fields().len(), FEATURE_COUNT);
        assert_eq!(arrow.field(0).name(), "Flow ID");
        assert_eq!(arrow.field(5).name(), "Protocol");
        assert!(
            arrow
                .fields()
                .iter()
                .all(|f| f.data_type() == &DataType::Float64 && !f.is_nullable())
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FeatureSchema::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(ref n) if n == "a"));
    }

    #[test]
    fn rejects_empty_schema() {
        let names: Vec<String> = Vec::new();
        assert!(matches!(FeatureSchema::new(names), Err(SchemaError::Empty)));
    }

    #[test]
    fn vector_length_must_match() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let err = FeatureVector::new(schema, vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn vector_rejects_non_finite() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let err = FeatureVector::new(schema, vec![1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, SchemaError::NonFinite { ref field } if field == "b"));
    }

    #[test]
    fn vector_lookup_by_name() {
        let schema = FeatureSchema::new(["a", "b", "c"]).unwrap();
        let v = FeatureVector::new(schema, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(v.get("b"), Some(2.0));
        assert_eq!(v.get("z"), None);
        let pairs: Vec<(&str, f64)> = v.iter().collect();
        assert_eq!(pairs, vec![("a", 1.0), ("b", 2.0), ("c", 3.0)]);
    }

    #[test]
    fn record_batch_is_single_row_in_schema_order() {
        let schema = FeatureSchema::new(["x", "y"]).unwrap();
        let v = FeatureVector::new(schema, vec![10.0, -1.5]).unwrap();
        let batch = v.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(1).name(), "y");

        let y = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(y.len(), 1);
        assert_eq!(y.value(0), -1.5);
    }
}

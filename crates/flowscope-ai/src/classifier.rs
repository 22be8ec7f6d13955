//! The classifier capability and artifact loading.
//!
//! A [`Classifier`] is a pre-fitted, immutable model. Inputs arrive as
//! Arrow batches and columns are resolved by name, so a batch whose
//! columns are ordered differently from the model's training order still
//! lines up feature for feature.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::ClassifierError;
use crate::forest::ForestClassifier;

/// A pre-trained classifier producing labels and class probabilities.
pub trait Classifier: Send + Sync {
    /// Short backend name, for logs.
    fn name(&self) -> &str;

    /// Class labels, in the order probability rows use.
    fn classes(&self) -> &[String];

    /// Feature names the model was fit on.
    fn feature_names(&self) -> &[String];

    /// One probability row per input row; each row has one entry per class.
    fn predict_proba(&self, batch: &RecordBatch) -> Result<Vec<Vec<f64>>, ClassifierError>;

    /// Most probable class per input row.
    fn predict(&self, batch: &RecordBatch) -> Result<Vec<String>, ClassifierError> {
        let classes = self.classes();
        self.predict_proba(batch)?
            .iter()
            .map(|row| {
                classes.get(argmax(row)).cloned().ok_or_else(|| {
                    ClassifierError::Inference(format!(
                        "probability row has {} entries for {} classes",
                        row.len(),
                        classes.len()
                    ))
                })
            })
            .collect()
    }

    /// Per-feature importance, when the backend records it.
    fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        None
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Load a classifier artifact, choosing the backend from the file extension.
///
/// - `.json`: tree-ensemble export ([`ForestClassifier`])
/// - `.onnx`: ONNX export plus `<model>.onnx.labels.json` sidecar (`onnx` feature)
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    if !path.exists() {
        return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Arc::new(ForestClassifier::load(path)?)),
        #[cfg(feature = "onnx")]
        Some("onnx") => Ok(Arc::new(crate::onnx::OnnxClassifier::load(path)?)),
        _ => Err(ClassifierError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Gather `names` from `batch` into row-major `f64` rows.
///
/// Numeric columns of any width are cast to `Float64`; nulls are rejected.
pub(crate) fn feature_rows(
    batch: &RecordBatch,
    names: &[String],
) -> Result<Vec<Vec<f64>>, ClassifierError> {
    let mut rows = vec![Vec::with_capacity(names.len()); batch.num_rows()];

    for name in names {
        let col = batch
            .column_by_name(name)
            .ok_or_else(|| ClassifierError::MissingColumn(name.clone()))?;
        let col = cast(col.as_ref(), &DataType::Float64)?;
        let values = col
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| ClassifierError::Inference(format!("column {name:?} is not numeric")))?;

        for (row_idx, row) in rows.iter_mut().enumerate() {
            if values.is_null(row_idx) {
                return Err(ClassifierError::NullValue {
                    column: name.clone(),
                    row: row_idx,
                });
            }
            row.push(values.value(row_idx));
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use arrow::datatypes::{Field, Schema};

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let schema = Schema::new(
            columns
                .iter()
                .map(|(name, arr)| Field::new(*name, arr.data_type().clone(), true))
                .collect::<Vec<_>>(),
        );
        RecordBatch::try_new(
            Arc::new(schema),
            columns.into_iter().map(|(_, arr)| arr).collect(),
        )
        .unwrap()
    }

    #[test]
    fn argmax_first_max_wins() {
        assert_eq!(argmax(&[0.2, 0.5, 0.3]), 1);
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn feature_rows_resolve_by_name() {
        let b = batch(vec![
            ("b", Arc::new(Float64Array::from(vec![2.0, 20.0])) as ArrayRef),
            ("a", Arc::new(Float64Array::from(vec![1.0, 10.0])) as ArrayRef),
        ]);
        let rows = feature_rows(&b, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![10.0, 20.0]]);
    }

    #[test]
    fn feature_rows_cast_integers() {
        let b = batch(vec![("port", Arc::new(Int64Array::from(vec![80])) as ArrayRef)]);
        let rows = feature_rows(&b, &["port".to_string()]).unwrap();
        assert_eq!(rows, vec![vec![80.0]]);
    }

    #[test]
    fn feature_rows_missing_column() {
        let b = batch(vec![("a", Arc::new(Float64Array::from(vec![1.0])) as ArrayRef)]);
        let err = feature_rows(&b, &["a".to_string(), "b".to_string()]).unwrap_err();
        assert!(matches!(err, ClassifierError::MissingColumn(ref c) if c == "b"));
    }

    #[test]
    fn feature_rows_reject_nulls() {
        let b = batch(vec![(
            "a",
            Arc::new(Float64Array::from(vec![Some(1.0), None])) as ArrayRef,
        )]);
        let err = feature_rows(&b, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, ClassifierError::NullValue { row: 1, .. }));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pkl");
        std::fs::write(&path, b"not a model").unwrap();
        let err = load_classifier(&path).err().unwrap();
        assert!(matches!(err, ClassifierError::UnsupportedFormat(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_classifier(Path::new("/nonexistent/model.json"))
            .err()
            .unwrap();
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }

    #[test]
    fn load_demo_forest() {
        let clf = load_classifier(&crate::demo_model_path()).unwrap();
        assert_eq!(clf.name(), "forest");
        assert_eq!(clf.classes().len(), 4);
        assert_eq!(clf.feature_names().len(), flowscope_core::FEATURE_COUNT);
    }
}

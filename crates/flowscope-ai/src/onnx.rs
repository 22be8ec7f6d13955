//! ONNX Runtime backend for classifiers exported from the training stack.
//!
//! Expects a model taking one `[rows, features]` float tensor and emitting
//! a `[rows, classes]` probability tensor (the layout produced by
//! converting a fitted tree ensemble with the class map disabled). Class
//! names and feature order live in a JSON sidecar next to the model:
//! `<model>.onnx.labels.json`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arrow::record_batch::RecordBatch;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tracing::info;

use crate::classifier::{Classifier, feature_rows};
use crate::error::ClassifierError;

#[derive(Debug, Deserialize)]
struct Sidecar {
    classes: Vec<String>,
    feature_names: Vec<String>,
    #[serde(default = "default_input")]
    input: String,
    #[serde(default = "default_probability_output")]
    probability_output: String,
}

fn default_input() -> String {
    "float_input".to_string()
}

fn default_probability_output() -> String {
    "output_probability".to_string()
}

/// Classifier running an ONNX graph.
///
/// `Session::run` needs exclusive access, so concurrent callers take turns
/// on the session; the model itself never changes after load.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    classes: Vec<String>,
    feature_names: Vec<String>,
    input: String,
    probability_output: String,
}

/// Path of the label sidecar for `model_path`.
pub fn sidecar_path(model_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.labels.json", model_path.display()))
}

fn onnx_error(e: impl std::fmt::Display) -> ClassifierError {
    ClassifierError::Onnx(e.to_string())
}

impl OnnxClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        let labels_path = sidecar_path(model_path);
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_path_buf()));
        }
        if !labels_path.exists() {
            return Err(ClassifierError::ModelNotFound(labels_path));
        }

        let sidecar: Sidecar = serde_json::from_str(&std::fs::read_to_string(&labels_path)?)?;
        if sidecar.classes.is_empty() || sidecar.feature_names.is_empty() {
            return Err(ClassifierError::InvalidModel(
                "sidecar must list classes and feature names".into(),
            ));
        }

        let session = Session::builder()
            .map_err(onnx_error)?
            .commit_from_file(model_path)
            .map_err(onnx_error)?;

        info!(
            classes = sidecar.classes.len(),
            features = sidecar.feature_names.len(),
            model = %model_path.display(),
            "loaded onnx model"
        );

        Ok(Self {
            session: Mutex::new(session),
            classes: sidecar.classes,
            feature_names: sidecar.feature_names,
            input: sidecar.input,
            probability_output: sidecar.probability_output,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, batch: &RecordBatch) -> Result<Vec<Vec<f64>>, ClassifierError> {
        let rows = feature_rows(batch, &self.feature_names)?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let n_rows = rows.len();
        let n_features = self.feature_names.len();
        let n_classes = self.classes.len();

        let flat: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let shape = [n_rows as i64, n_features as i64];
        let tensor = Tensor::from_array((shape, flat.into_boxed_slice())).map_err(onnx_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("onnx session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input.as_str() => tensor])
            .map_err(onnx_error)?;

        let output = outputs.get(self.probability_output.as_str()).ok_or_else(|| {
            ClassifierError::Inference(format!(
                "model has no output named {:?}",
                self.probability_output
            ))
        })?;
        let (output_shape, data) = output.try_extract_tensor::<f32>().map_err(onnx_error)?;
        let dims: &[i64] = output_shape;
        if dims.len() != 2 || dims[0] as usize != n_rows || dims[1] as usize != n_classes {
            return Err(ClassifierError::Inference(format!(
                "unexpected output shape: {dims:?}, expected [{n_rows}, {n_classes}]"
            )));
        }

        Ok(data
            .chunks(n_classes)
            .map(|row| row.iter().map(|&p| p as f64).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_sits_next_to_model() {
        let p = sidecar_path(Path::new("models/forest.onnx"));
        assert_eq!(p, PathBuf::from("models/forest.onnx.labels.json"));
    }

    #[test]
    fn sidecar_defaults_io_names() {
        let sidecar: Sidecar =
            serde_json::from_str(r#"{"classes": ["a"], "feature_names": ["x"]}"#).unwrap();
        assert_eq!(sidecar.input, "float_input");
        assert_eq!(sidecar.probability_output, "output_probability");
    }

    #[test]
    fn load_requires_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("m.onnx");
        std::fs::write(&model, b"").unwrap();
        let err = OnnxClassifier::load(&model).err().unwrap();
        assert!(matches!(err, ClassifierError::ModelNotFound(ref p) if p.ends_with("m.onnx.labels.json")));
    }
}

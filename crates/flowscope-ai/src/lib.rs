//! Inference layer: opaque classifiers behind one trait, the request
//! pipeline that feeds them, and offline evaluation helpers.

mod classifier;
mod error;
pub mod evaluate;
mod forest;
#[cfg(feature = "onnx")]
mod onnx;
mod pipeline;

pub use classifier::{Classifier, argmax, load_classifier};
pub use error::ClassifierError;
pub use forest::{ForestClassifier, ForestModel, Node, Tree};
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use pipeline::{MODEL_UNAVAILABLE, Pipeline, PipelineError, Prediction};

#[cfg(test)]
pub(crate) fn demo_model_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("models")
        .join("demo_forest.json")
}

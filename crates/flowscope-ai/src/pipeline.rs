//! The inference request pipeline.
//!
//! Turns an untyped [`RawRecord`] into a [`FeatureVector`] aligned to the
//! [`FeatureSchema`], runs the classifier once, and packages the label with
//! the full probability distribution. Failures are values, never panics,
//! and the first problem in schema order is the one reported.

use std::fmt;
use std::sync::Arc;

use flowscope_core::{FeatureSchema, FeatureVector, RawRecord};
use serde::Serialize;
use thiserror::Error;

use crate::classifier::{Classifier, argmax};

/// Reason reported when no classifier could be loaded.
pub const MODEL_UNAVAILABLE: &str = "model unavailable";

/// Why a single inference request failed.
///
/// The `Display` text is what end users see.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("All fields are required (missing value for {field})")]
    MissingField { field: String },

    #[error("Invalid input for {field}: \"{value}\"")]
    InvalidField { field: String, value: String },

    #[error("Prediction failed: {message}")]
    Inference { message: String },
}

impl PipelineError {
    pub fn model_unavailable() -> Self {
        Self::Inference {
            message: MODEL_UNAVAILABLE.to_string(),
        }
    }

    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::Inference { message } if message == MODEL_UNAVAILABLE)
    }

    /// The offending field, for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidField { field, .. } => Some(field),
            Self::Inference { .. } => None,
        }
    }

    fn inference(message: impl fmt::Display) -> Self {
        Self::Inference {
            message: message.to_string(),
        }
    }
}

/// A successful classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// One entry per class, in the classifier's class order.
    pub probabilities: Vec<(String, f64)>,
}

impl Prediction {
    pub fn probability(&self, class: &str) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|(c, _)| c == class)
            .map(|(_, p)| *p)
    }

    /// Classes by descending probability; ties keep class order.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .probabilities
            .iter()
            .map(|(c, p)| (c.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Schema plus an optional, immutable classifier handle.
///
/// `None` means the model failed to load at startup; every request then
/// still validates its input but ends in [`PipelineError::model_unavailable`].
#[derive(Clone)]
pub struct Pipeline {
    schema: FeatureSchema,
    classifier: Option<Arc<dyn Classifier>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("features", &self.schema.len())
            .field("classifier", &self.classifier.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl Pipeline {
    pub fn new(schema: FeatureSchema, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self { schema, classifier }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classifier(&self) -> Option<&Arc<dyn Classifier>> {
        self.classifier.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    /// Check and coerce every schema field, in schema order.
    ///
    /// Absent or empty is `MissingField`; anything that does not parse to
    /// a finite number after trimming is `InvalidField` with the raw text.
    pub fn validate(&self, record: &RawRecord) -> Result<FeatureVector, PipelineError> {
        let mut values = Vec::with_capacity(self.schema.len());
        for name in self.schema.names() {
            let raw = match record.get(name) {
                None | Some("") => {
                    return Err(PipelineError::MissingField {
                        field: name.clone(),
                    });
                }
                Some(raw) => raw,
            };
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => values.push(v),
                _ => {
                    return Err(PipelineError::InvalidField {
                        field: name.clone(),
                        value: raw.to_string(),
                    });
                }
            }
        }
        FeatureVector::new(self.schema.clone(), values).map_err(PipelineError::inference)
    }

    /// Validate `record` and classify it.
    pub fn infer(&self, record: &RawRecord) -> Result<Prediction, PipelineError> {
        let vector = self.validate(record)?;
        self.classify(&vector)
    }

    /// Classify an already validated vector.
    pub fn classify(&self, vector: &FeatureVector) -> Result<Prediction, PipelineError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or_else(PipelineError::model_unavailable)?;

        let batch = vector
            .to_record_batch()
            .map_err(PipelineError::inference)?;
        let rows = classifier
            .predict_proba(&batch)
            .map_err(PipelineError::inference)?;

        let [row] = rows.as_slice() else {
            return Err(PipelineError::inference(format!(
                "classifier returned {} rows for one input",
                rows.len()
            )));
        };
        let classes = classifier.classes();
        if row.len() != classes.len() {
            return Err(PipelineError::inference(format!(
                "probability row has {} entries for {} classes",
                row.len(),
                classes.len()
            )));
        }

        Ok(Prediction {
            label: classes[argmax(row)].clone(),
            probabilities: classes.iter().cloned().zip(row.iter().copied()).collect(),
        })
    }
}

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowscope_ai::{Classifier, Pipeline, load_classifier};
use flowscope_core::FeatureSchema;
use tracing::{error, info};

/// Shared, read-only state behind every request.
///
/// Built once before the listener binds. When the model could not be
/// loaded the pipeline has no classifier and `unavailable` holds the reason.
#[derive(Debug)]
pub struct AppState {
    pipeline: Pipeline,
    loaded_at: Option<DateTime<Utc>>,
    unavailable: Option<String>,
}

impl AppState {
    /// Load the model at `model_path`; a failure is logged, not returned.
    pub fn load(model_path: &Path) -> Self {
        match load_classifier(model_path) {
            Ok(classifier) => {
                info!(
                    backend = classifier.name(),
                    classes = classifier.classes().len(),
                    model = %model_path.display(),
                    "model loaded successfully"
                );
                Self::with_classifier(classifier)
            }
            Err(e) => {
                error!(error = %e, model = %model_path.display(), "failed to load model");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            pipeline: Pipeline::new(FeatureSchema::flow(), Some(classifier)),
            loaded_at: Some(Utc::now()),
            unavailable: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            pipeline: Pipeline::new(FeatureSchema::flow(), None),
            loaded_at: None,
            unavailable: Some(reason.into()),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_leaves_service_unavailable() {
        let state = AppState::load(Path::new("/nonexistent/forest.json"));
        assert!(!state.pipeline().is_available());
        assert!(state.loaded_at().is_none());
        assert!(state.unavailable_reason().unwrap().contains("not found"));
    }

    #[test]
    fn loaded_model_is_available() {
        let state = AppState::load(&crate::tests::demo_model_path());
        assert!(state.pipeline().is_available());
        assert!(state.loaded_at().is_some());
        assert!(state.unavailable_reason().is_none());
    }
}

//! Run reference samples through the web form and, optionally, a local
//! pipeline, and grade each result against the sample's label.

use std::fmt;

use flowscope_ai::Pipeline;
use flowscope_ai::evaluate::feature_differences;
use flowscope_core::samples::{LABEL_BRUTE_FORCE, LABEL_XSS, XSS_KEY_FEATURES};
use flowscope_core::{FeatureSchema, Sample};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::http::{FormOutcome, PredictClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Pass,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

/// One way of classifying a sample: a predicted label or an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Check {
    Predicted(String),
    Error(String),
}

impl Check {
    /// `Pass` only when the predicted label is exactly `expected`.
    pub fn status(&self, expected: &str) -> Status {
        match self {
            Self::Predicted(label) if label == expected => Status::Pass,
            _ => Status::Fail,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeCase {
    pub label: String,
    /// Through the running web form.
    pub http: Check,
    /// Through the local pipeline.
    pub direct: Check,
}

impl SmokeCase {
    pub fn http_status(&self) -> Status {
        self.http.status(&self.label)
    }

    pub fn direct_status(&self) -> Status {
        self.direct.status(&self.label)
    }
}

/// Submit every sample to the form and to `pipeline`, in order.
///
/// Without a local pipeline each direct check is an error.
pub async fn run_smoke(
    client: &PredictClient,
    pipeline: Option<&Pipeline>,
    samples: &[Sample],
) -> Vec<SmokeCase> {
    let schema = pipeline
        .map(|p| p.schema().clone())
        .unwrap_or_else(FeatureSchema::flow);

    let mut cases = Vec::with_capacity(samples.len());
    for sample in samples {
        let record = sample.to_raw_record();
        let fields = record.to_pairs(&schema);
        debug!(label = %sample.label, fields = ?fields, "smoke input");

        let http = match client.submit(&fields).await {
            Ok(FormOutcome::Prediction(label)) => Check::Predicted(label),
            Ok(FormOutcome::Rejected(message)) => Check::Error(message),
            Err(e) => Check::Error(e.to_string()),
        };

        let direct = match pipeline {
            None => Check::Error("Model not loaded.".into()),
            Some(p) => match p.infer(&record) {
                Ok(prediction) => {
                    info!(
                        label = %sample.label,
                        probabilities = ?prediction.probabilities,
                        "direct prediction"
                    );
                    if sample.label == LABEL_XSS && prediction.label != LABEL_XSS {
                        log_xss_diagnostic(sample, samples);
                    }
                    Check::Predicted(prediction.label)
                }
                Err(e) => Check::Error(format!("Direct prediction failed: {e}")),
            },
        };

        cases.push(SmokeCase {
            label: sample.label.clone(),
            http,
            direct,
        });
    }
    cases
}

fn log_xss_diagnostic(xss: &Sample, samples: &[Sample]) {
    if let Some(bf) = samples.iter().find(|s| s.label == LABEL_BRUTE_FORCE) {
        let diffs = feature_differences(xss, bf, &XSS_KEY_FEATURES);
        warn!(differences = ?diffs, "XSS sample misclassified; key feature differences from brute force");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use flowscope_core::samples::demo_samples;
    use flowscope_web::AppState;
    use tokio::net::TcpListener;

    fn demo_model_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("demo_forest.json")
    }

    async fn spawn(state: AppState) -> PredictClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(flowscope_web::serve_on(listener, Arc::new(state)));
        PredictClient::new(format!("http://{addr}/"))
    }

    #[test]
    fn status_requires_exact_label() {
        assert_eq!(Check::Predicted("BENIGN".into()).status("BENIGN"), Status::Pass);
        assert_eq!(Check::Predicted("BENIGN".into()).status(LABEL_XSS), Status::Fail);
        assert_eq!(Check::Error("boom".into()).status("BENIGN"), Status::Fail);
        assert_eq!(Status::Pass.to_string(), "PASS");
    }

    #[tokio::test]
    async fn demo_samples_pass_end_to_end() {
        let state = AppState::load(&demo_model_path());
        let pipeline = state.pipeline().clone();
        let client = spawn(state).await;

        let samples = demo_samples();
        let cases = run_smoke(&client, Some(&pipeline), &samples).await;
        assert_eq!(cases.len(), samples.len());
        for case in &cases {
            assert_eq!(case.http_status(), Status::Pass, "{case:?}");
            assert_eq!(case.direct_status(), Status::Pass, "{case:?}");
        }
    }

    #[tokio::test]
    async fn missing_field_comes_back_as_rejection() {
        let client = spawn(AppState::load(&demo_model_path())).await;
        let outcome = client
            .submit(&[("Flow ID".to_string(), "1".to_string())])
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FormOutcome::Rejected("All fields are required (missing value for Source IP)".into())
        );
    }

    #[tokio::test]
    async fn unavailable_server_fails_both_checks() {
        let client = spawn(AppState::unavailable("no model")).await;
        let cases = run_smoke(&client, None, &demo_samples()[..1]).await;
        assert_eq!(cases[0].http_status(), Status::Fail);
        assert_eq!(
            cases[0].http,
            Check::Error("Prediction failed: model unavailable".into())
        );
        assert_eq!(cases[0].direct, Check::Error("Model not loaded.".into()));
    }
}

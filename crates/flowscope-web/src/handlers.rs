use std::sync::Arc;

use askama::Template;
use axum::Json;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use flowscope_ai::PipelineError;
use flowscope_core::RawRecord;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::templates::IndexTemplate;

fn render(status: StatusCode, page: IndexTemplate) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    render(
        StatusCode::OK,
        IndexTemplate::new(state.pipeline().schema(), None),
    )
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let pipeline = state.pipeline();
    let record = RawRecord::from_pairs(fields);
    debug!(input = ?record.to_pairs(pipeline.schema()), "prediction request");

    let page = IndexTemplate::new(pipeline.schema(), Some(&record));
    match pipeline.infer(&record) {
        Ok(prediction) => {
            info!(
                prediction = %prediction.label,
                probabilities = ?prediction.probabilities,
                "prediction"
            );
            render(StatusCode::OK, page.with_prediction(&prediction))
        }
        Err(e) => {
            let status = match &e {
                PipelineError::MissingField { field } => {
                    warn!(feature = %field, "missing value for feature");
                    StatusCode::OK
                }
                PipelineError::InvalidField { field, value } => {
                    error!(feature = %field, value = %value, "invalid value for feature");
                    StatusCode::OK
                }
                PipelineError::Inference { message } => {
                    error!(error = %message, "prediction error");
                    if e.is_model_unavailable() {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    }
                }
            };
            render(status, page.with_error(e.to_string()))
        }
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let pipeline = state.pipeline();
    match pipeline.classifier() {
        Some(classifier) => Json(json!({
            "status": "ok",
            "model": classifier.name(),
            "classes": classifier.classes(),
            "features": pipeline.schema().len(),
            "loaded_at": state.loaded_at(),
        }))
        .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "reason": state.unavailable_reason().unwrap_or("model unavailable"),
            })),
        )
            .into_response(),
    }
}

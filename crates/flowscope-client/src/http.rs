//! Form-submitting HTTP client for the `/predict` endpoint.

use std::sync::LazyLock;

use regex_lite::Regex;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("No prediction or error found in response.")]
    NoIndicator,
}

/// What the form page reported for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    /// The success notice, without its `Prediction:` prefix.
    Prediction(String),
    /// The failure notice, without its `Error:` prefix.
    Rejected(String),
}

/// Client for a Flowscope web form at `base_url`.
pub struct PredictClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictClient {
    /// `base_url` looks like `http://127.0.0.1:5000`; a trailing slash is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post `fields` as form data and read the outcome off the page.
    pub async fn submit(&self, fields: &[(String, String)]) -> Result<FormOutcome, ProbeError> {
        let url = format!("{}/predict", self.base_url);

        debug!(url = %url, fields = fields.len(), "submitting form");
        let resp = self.client.post(&url).form(fields).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return match parse_outcome(&body) {
                Ok(FormOutcome::Rejected(message)) => {
                    info!(status = status.as_u16(), message = %message, "form rejected");
                    Ok(FormOutcome::Rejected(message))
                }
                _ => Err(ProbeError::Server {
                    status: status.as_u16(),
                    body: truncate(&body, MAX_ERROR_BODY),
                }),
            };
        }

        let outcome = parse_outcome(&body)?;
        info!(outcome = ?outcome, "form submitted");
        Ok(outcome)
    }
}

/// Longest response body kept in a `ProbeError::Server`, in chars.
const MAX_ERROR_BODY: usize = 200;

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

static SUCCESS: LazyLock<Regex> = LazyLock::new(|| indicator("alert-success"));
static DANGER: LazyLock<Regex> = LazyLock::new(|| indicator("alert-danger"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]+)|#([0-9]+)|(lt|gt|quot|apos|amp|nbsp));")
        .expect("valid entity regex")
});

fn indicator(class: &str) -> Regex {
    Regex::new(&format!(
        r#"(?is)<div\b[^>]*\bclass\s*=\s*"[^"]*\b{class}\b[^"]*"[^>]*>(.*?)</div>"#
    ))
    .expect("valid indicator regex")
}

/// Find the success notice, else the failure notice, in a form page.
pub fn parse_outcome(html: &str) -> Result<FormOutcome, ProbeError> {
    if let Some(text) = notice_text(&SUCCESS, html) {
        return Ok(FormOutcome::Prediction(strip_prefix(&text, "Prediction:")));
    }
    if let Some(text) = notice_text(&DANGER, html) {
        return Ok(FormOutcome::Rejected(strip_prefix(&text, "Error:")));
    }
    Err(ProbeError::NoIndicator)
}

fn notice_text(re: &Regex, html: &str) -> Option<String> {
    let inner = re.captures(html)?.get(1)?.as_str();
    Some(decode_entities(&TAG.replace_all(inner, "")))
}

fn strip_prefix(text: &str, prefix: &str) -> String {
    let text = text.trim();
    text.strip_prefix(prefix).unwrap_or(text).trim().to_string()
}

/// Decode numeric character references and the named entities HTML
/// escaping produces, in one pass.
fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &regex_lite::Captures<'_>| {
            let decoded = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("amp") => Some('&'),
                    Some("nbsp") => Some('\u{a0}'),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client = PredictClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn parses_prediction() {
        let html = r#"<body><div class="alert alert-success">Prediction: Web Attack – XSS</div></body>"#;
        assert_eq!(
            parse_outcome(html).unwrap(),
            FormOutcome::Prediction("Web Attack – XSS".into())
        );
    }

    #[test]
    fn parses_error_with_entities_and_tags() {
        let html = r#"<div class="alert alert-danger">
            <strong>Error:</strong> Invalid input for Flow Bytes&#x2f;s: &quot;x&amp;y&quot;
        </div>"#;
        assert_eq!(
            parse_outcome(html).unwrap(),
            FormOutcome::Rejected("Invalid input for Flow Bytes/s: \"x&y\"".into())
        );
    }

    #[test]
    fn success_wins_over_error() {
        let html = r#"<div class="alert alert-danger">Error: x</div>
            <div class="alert alert-success">Prediction: BENIGN</div>"#;
        assert_eq!(
            parse_outcome(html).unwrap(),
            FormOutcome::Prediction("BENIGN".into())
        );
    }

    #[test]
    fn decodes_any_numeric_entity() {
        assert_eq!(decode_entities("Web Attack &#8211; XSS"), "Web Attack \u{2013} XSS");
        assert_eq!(decode_entities("a&#x2F;b&#X2f;c&#39;"), "a/b/c'");
        assert_eq!(decode_entities("&amp;lt; &#38;gt; &#xD800;"), "&lt; &gt; &#xD800;");
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let body = "\u{2013}".repeat(300);
        let cut = truncate(&body, MAX_ERROR_BODY);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", MAX_ERROR_BODY), "short");
    }

    #[test]
    fn page_without_notice() {
        let html = r#"<div class="alert-info">hello</div><form></form>"#;
        assert!(matches!(parse_outcome(html), Err(ProbeError::NoIndicator)));
    }
}

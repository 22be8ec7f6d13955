use askama::Template;
use flowscope_ai::Prediction;
use flowscope_core::{FeatureSchema, RawRecord};

/// One text input on the form.
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// The form page, optionally showing an outcome.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub fields: Vec<FormField>,
    pub prediction: Option<String>,
    pub probabilities: Vec<(String, String)>,
    pub error: Option<String>,
}

impl IndexTemplate {
    /// Inputs for every schema field, pre-filled from `record` when given.
    pub fn new(schema: &FeatureSchema, record: Option<&RawRecord>) -> Self {
        let fields = schema
            .names()
            .iter()
            .map(|name| FormField {
                name: name.clone(),
                value: record
                    .and_then(|r| r.get(name))
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();
        Self {
            fields,
            prediction: None,
            probabilities: Vec::new(),
            error: None,
        }
    }

    pub fn with_prediction(mut self, prediction: &Prediction) -> Self {
        self.prediction = Some(prediction.label.clone());
        self.probabilities = prediction
            .ranked()
            .into_iter()
            .map(|(class, p)| (class.to_string(), format!("{p:.4}")))
            .collect();
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

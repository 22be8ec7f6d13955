//! Pick one clean reference sample per class label from a dataset.

use flowscope_core::Sample;
use tracing::{error, info, warn};

use crate::Dataset;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Rows of each label to inspect before giving up on it.
    pub max_attempts: usize,
    /// Restrict extraction to this label.
    pub label: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            label: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub samples: Vec<Sample>,
    /// Labels for which no complete row was found.
    pub skipped: Vec<String>,
}

/// One complete sample per label, labels in order of first appearance.
pub fn extract_samples(dataset: &Dataset, options: &ExtractOptions) -> Extraction {
    let mut out = Extraction::default();

    let mut labels: Vec<(String, usize)> = dataset.label_counts();
    if let Some(wanted) = &options.label {
        labels.retain(|(l, _)| l == wanted);
        if labels.is_empty() {
            warn!(label = %wanted, "no samples found for label");
            out.skipped.push(wanted.clone());
            return out;
        }
    }

    for (label, available) in labels {
        info!(label = %label, available, "processing label");

        let found = dataset
            .rows_with_label(&label)
            .take(options.max_attempts)
            .enumerate()
            .find_map(|(attempt, row)| match dataset.sample(row) {
                Some(sample) => {
                    info!(label = %label, attempt, row, "valid sample found");
                    Some(sample)
                }
                None => {
                    warn!(label = %label, attempt, row, "incomplete sample");
                    None
                }
            });

        match found {
            Some(sample) => out.samples.push(sample),
            None => {
                error!(
                    label = %label,
                    checked = available.min(options.max_attempts),
                    "no valid sample found"
                );
                out.skipped.push(label);
            }
        }
    }

    out
}

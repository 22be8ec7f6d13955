//! Storage layer: the labeled CSV flow dataset and demo sample extraction.

mod dataset;
mod error;
mod extract;

pub use dataset::{Dataset, LABEL_COLUMN};
pub use error::StoreError;
pub use extract::{ExtractOptions, Extraction, extract_samples};

pub mod record;
pub mod samples;
pub mod schema;

pub use record::RawRecord;
pub use samples::{Sample, demo_samples};
pub use schema::{FEATURE_COUNT, FEATURE_NAMES, FeatureSchema, FeatureVector, SchemaError};

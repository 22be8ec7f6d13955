//! Black-box checks against a running Flowscope web form.

pub mod http;
mod smoke;

pub use http::{FormOutcome, PredictClient, ProbeError, parse_outcome};
pub use smoke::{Check, SmokeCase, Status, run_smoke};

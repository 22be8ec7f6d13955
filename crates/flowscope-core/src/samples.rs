//! Labelled reference samples.
//!
//! A [`Sample`] keys its values by feature name, so a sample written with
//! one column order can never be replayed against a model fit on another.
//! Positional vectors are only accepted together with the schema that
//! gives them meaning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::RawRecord;
use crate::schema::{FEATURE_COUNT, FEATURE_NAMES, FeatureSchema, FeatureVector, SchemaError};

pub const LABEL_BENIGN: &str = "BENIGN";
pub const LABEL_BRUTE_FORCE: &str = "Web Attack – Brute Force";
pub const LABEL_SQL_INJECTION: &str = "Web Attack – Sql Injection";
pub const LABEL_XSS: &str = "Web Attack – XSS";

/// Key features compared when an XSS flow is mistaken for another class.
pub const XSS_KEY_FEATURES: [&str; 4] = [
    "Flow Duration",
    "Fwd Packet Length Max",
    "Packet Length Variance",
    "Flow Bytes/s",
];

/// A labelled flow with one value per feature name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub label: String,
    pub features: BTreeMap<String, f64>,
}

impl Sample {
    /// Pair positional `values` with `schema` names.
    pub fn from_positional(
        label: impl Into<String>,
        schema: &FeatureSchema,
        values: &[f64],
    ) -> Result<Self, SchemaError> {
        let vector = FeatureVector::new(schema.clone(), values.to_vec())?;
        Ok(Self::from_vector(label, &vector))
    }

    pub fn from_vector(label: impl Into<String>, vector: &FeatureVector) -> Self {
        Self {
            label: label.into(),
            features: vector.iter().map(|(n, v)| (n.to_string(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Arrange the values in `schema` order.
    pub fn to_vector(&self, schema: &FeatureSchema) -> Result<FeatureVector, SchemaError> {
        let values = schema
            .names()
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| SchemaError::MissingField(name.clone()))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        FeatureVector::new(schema.clone(), values)
    }

    /// Text form of every value, as a form submission would carry it.
    pub fn to_raw_record(&self) -> RawRecord {
        self.features
            .iter()
            .map(|(name, v)| (name.as_str(), v.to_string()))
            .collect()
    }
}

/// Parse a JSON array of samples.
pub fn samples_from_json(json: &str) -> Result<Vec<Sample>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn samples_to_json(samples: &[Sample]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(samples)
}

/// The built-in reference flows, one per class.
pub fn demo_samples() -> Vec<Sample> {
    [
        (LABEL_BENIGN, &BENIGN_VALUES),
        (LABEL_BRUTE_FORCE, &BRUTE_FORCE_VALUES),
        (LABEL_SQL_INJECTION, &SQL_INJECTION_VALUES),
        (LABEL_XSS, &XSS_VALUES),
    ]
    .into_iter()
    .map(|(label, values)| Sample {
        label: label.to_string(),
        features: FEATURE_NAMES
            .iter()
            .zip(values.iter())
            .map(|(name, &v)| (name.to_string(), v))
            .collect(),
    })
    .collect()
}

/// Look up a built-in sample by label.
pub fn demo_sample(label: &str) -> Option<Sample> {
    demo_samples().into_iter().find(|s| s.label == label)
}

// ── Reference vectors (canonical schema order) ──

const BENIGN_VALUES: [f64; FEATURE_COUNT] = [
    62015.0, 1261.0, 51885.0, 1599.0, 53.0, 17.0, 181.0, 76978.0, 2.0, 2.0, 78.0, 206.0, 39.0,
    39.0, 39.0, 0.0, 103.0, 103.0, 103.0, 0.0, 3689.365793, 51.96289849, 25659.33333,
    44436.34082, 76970.0, 4.0, 4.0, 4.0, 0.0, 4.0, 4.0, 4.0, 4.0, 0.0, 4.0, 4.0, 0.0, 0.0, 0.0,
    0.0, 64.0, 64.0, 25.98144925, 25.98144925, 39.0, 103.0, 64.6, 35.05424368, 1228.8, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 80.75, 39.0, 103.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0,
    78.0, 2.0, 206.0, -1.0, -1.0, 1.0, 32.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

const BRUTE_FORCE_VALUES: [f64; FEATURE_COUNT] = [
    4022.0, 845.0, 44380.0, 1601.0, 80.0, 6.0, 196.0, 5185118.0, 7.0, 7.0, 1022.0, 2321.0,
    372.0, 0.0, 146.0, 184.0787875, 1047.0, 0.0, 331.5714286, 439.6592837, 644.7297824,
    2.700034985, 398855.2308, 1372180.71, 4963956.0, 4.0, 221162.0, 36860.33333, 56141.02125,
    141434.0, 4.0, 5185004.0, 864167.3333, 2027593.314, 5001548.0, 879.0, 0.0, 0.0, 0.0, 0.0,
    232.0, 232.0, 1.350017492, 1.350017492, 0.0, 1047.0, 222.8666667, 331.3239387, 109775.5524,
    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 238.7857143, 146.0, 331.5714286, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 7.0, 1022.0, 7.0, 2321.0, 29200.0, 252.0, 3.0, 32.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0,
];

const SQL_INJECTION_VALUES: [f64; FEATURE_COUNT] = [
    3698.0, 845.0, 36196.0, 1601.0, 80.0, 6.0, 40.0, 5006127.0, 4.0, 4.0, 447.0, 530.0, 447.0,
    0.0, 111.75, 223.5, 530.0, 0.0, 132.5, 265.0, 195.1608499, 1.59804176, 715161.0,
    1889619.815, 5000415.0, 4.0, 5712.0, 1904.0, 2168.235227, 4266.0, 4.0, 5005996.0,
    1668665.333, 2885896.206, 5001011.0, 1407.0, 0.0, 0.0, 0.0, 0.0, 136.0, 136.0, 0.79902088,
    0.79902088, 0.0, 530.0, 108.5555556, 216.4053552, 46831.27778, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 122.125, 111.75, 132.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 4.0, 447.0, 4.0, 530.0,
    29200.0, 235.0, 1.0, 32.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

const XSS_VALUES: [f64; FEATURE_COUNT] = [
    4628.0, 845.0, 52120.0, 1601.0, 80.0, 6.0, 15.0, 5638432.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.709417086, 1879477.333, 3254752.687, 5637742.0, 72.0,
    5638432.0, 2819216.0, 3985997.695, 5637742.0, 690.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 104.0, 40.0, 0.532062815, 0.1773542719999999, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0, 1.0,
    0.0, 29200.0, 28960.0, 0.0, 32.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

//! Property tests for the inference pipeline over arbitrary flow records.
//!
//! 1. Every complete, finite record classifies, and the probabilities
//!    cover the class set and sum to 1
//! 2. The earliest missing field in schema order is the one reported
//! 3. An invalid field is reported before any later missing field
//! 4. Reordering the schema changes neither the vector nor the result

use std::path::PathBuf;
use std::sync::Arc;

use flowscope_ai::{ForestClassifier, Pipeline, PipelineError, argmax};
use flowscope_core::{FEATURE_COUNT, FEATURE_NAMES, FeatureSchema, RawRecord};
use proptest::prelude::*;

// ── Fixtures ────────────────────────────────────────────────────────────

fn demo_pipeline() -> Pipeline {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("models")
        .join("demo_forest.json");
    let clf = ForestClassifier::load(&path).unwrap();
    Pipeline::new(FeatureSchema::flow(), Some(Arc::new(clf)))
}

fn record_from(values: &[f64]) -> RawRecord {
    RawRecord::from_pairs(
        FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(name, v)| (*name, v.to_string())),
    )
}

// ── Strategies ──────────────────────────────────────────────────────────

fn values_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1e9f64..1e9, FEATURE_COUNT)
}

/// A pair of schema positions with the first strictly before the second.
fn ordered_pair() -> impl Strategy<Value = (usize, usize)> {
    (0..FEATURE_COUNT - 1).prop_flat_map(|i| (Just(i), i + 1..FEATURE_COUNT))
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Complete records classify with a full distribution
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn complete_record_yields_distribution(values in values_strategy()) {
        let pipeline = demo_pipeline();
        let classes = pipeline.classifier().unwrap().classes().to_vec();

        let prediction = pipeline.infer(&record_from(&values)).unwrap();
        let keys: Vec<&str> = prediction.probabilities.iter().map(|(c, _)| c.as_str()).collect();
        prop_assert_eq!(keys, classes.iter().map(String::as_str).collect::<Vec<_>>());

        let probs: Vec<f64> = prediction.probabilities.iter().map(|(_, p)| *p).collect();
        let sum: f64 = probs.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6, "sum {}", sum);
        prop_assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        prop_assert_eq!(&prediction.label, &classes[argmax(&probs)]);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Earliest missing field wins
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn earliest_missing_field_is_reported(
        values in values_strategy(),
        missing in prop::collection::btree_set(0..FEATURE_COUNT, 1..12),
        blank in any::<bool>(),
    ) {
        let mut record = record_from(&values);
        for &i in &missing {
            if blank {
                record.insert(FEATURE_NAMES[i], "");
            } else {
                record.remove(FEATURE_NAMES[i]);
            }
        }

        let earliest = *missing.iter().next().unwrap();
        prop_assert_eq!(
            demo_pipeline().infer(&record).unwrap_err(),
            PipelineError::MissingField { field: FEATURE_NAMES[earliest].to_string() }
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Invalid before a later missing field
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn invalid_field_precedes_later_missing_field(
        values in values_strategy(),
        (bad, gone) in ordered_pair(),
        text in "[a-zA-Z]{1,8}",
    ) {
        let mut record = record_from(&values);
        record.insert(FEATURE_NAMES[bad], text.as_str());
        record.remove(FEATURE_NAMES[gone]);

        prop_assert_eq!(
            demo_pipeline().infer(&record).unwrap_err(),
            PipelineError::InvalidField {
                field: FEATURE_NAMES[bad].to_string(),
                value: text,
            }
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4. Schema order does not matter
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn permuted_schema_is_equivalent(
        values in values_strategy(),
        order in Just(FEATURE_NAMES.to_vec()).prop_shuffle(),
    ) {
        let base = demo_pipeline();
        let permuted = Pipeline::new(
            FeatureSchema::new(order).unwrap(),
            base.classifier().cloned(),
        );
        let record = record_from(&values);

        let a = base.validate(&record).unwrap();
        let b = permuted.validate(&record).unwrap();
        for name in FEATURE_NAMES {
            prop_assert_eq!(a.get(name), b.get(name), "{}", name);
        }
        prop_assert_eq!(base.infer(&record), permuted.infer(&record));
    }
}

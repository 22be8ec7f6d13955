//! Offline evaluation: classification reports, importance ranking, and
//! per-feature comparison of two samples.

use std::collections::BTreeSet;
use std::fmt;

use flowscope_core::Sample;
use serde::Serialize;

/// Precision, recall, F1 and support for one class (or an average).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Per-class and aggregate metrics over `(true, predicted)` label pairs.
///
/// Classes are every label seen on either side, sorted. A metric whose
/// denominator is zero is reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<(String, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub total: usize,
}

impl ClassificationReport {
    /// Build from parallel true/predicted label slices.
    ///
    /// Extra entries in the longer slice are ignored.
    pub fn from_labels<S: AsRef<str>>(y_true: &[S], y_pred: &[S]) -> Self {
        Self::from_pairs(
            y_true
                .iter()
                .zip(y_pred)
                .map(|(t, p)| (t.as_ref(), p.as_ref())),
        )
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        let labels: BTreeSet<&str> = pairs.iter().flat_map(|&(t, p)| [t, p]).collect();

        let classes: Vec<(String, ClassMetrics)> = labels
            .iter()
            .map(|&label| {
                let (mut tp, mut fp, mut fn_) = (0, 0, 0);
                for &(t, p) in &pairs {
                    match (t == label, p == label) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                (label.to_string(), ClassMetrics::from_counts(tp, fp, fn_))
            })
            .collect();

        let total = pairs.len();
        let correct = pairs.iter().filter(|(t, p)| t == p).count();
        let accuracy = if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        };

        let n = classes.len().max(1) as f64;
        let w = total.max(1) as f64;
        let mut macro_avg = ClassMetrics {
            support: total,
            ..Default::default()
        };
        let mut weighted_avg = macro_avg;
        for (_, m) in &classes {
            let share = m.support as f64 / w;
            macro_avg.precision += m.precision / n;
            macro_avg.recall += m.recall / n;
            macro_avg.f1 += m.f1 / n;
            weighted_avg.precision += m.precision * share;
            weighted_avg.recall += m.recall * share;
            weighted_avg.f1 += m.f1 * share;
        }

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            total,
        }
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes
            .iter()
            .find(|(c, _)| c == label)
            .map(|(_, m)| m)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WEIGHTED: &str = "weighted avg";
        let width = self
            .classes
            .iter()
            .map(|(c, _)| c.chars().count())
            .chain([WEIGHTED.len()])
            .max()
            .unwrap_or(WEIGHTED.len());

        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{name:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in &self.classes {
            row(f, name, m)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, WEIGHTED, &self.weighted_avg)
    }
}

/// The `n` most important features, highest first.
pub fn top_features(importances: &[(String, f64)], n: usize) -> Vec<(String, f64)> {
    let mut ranked = importances.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}

/// Absolute difference between two samples for each of `names`.
///
/// Names either sample lacks are skipped.
pub fn feature_differences<S: AsRef<str>>(a: &Sample, b: &Sample, names: &[S]) -> Vec<(String, f64)> {
    names
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            Some((name.to_string(), (a.get(name)? - b.get(name)?).abs()))
        })
        .collect()
}

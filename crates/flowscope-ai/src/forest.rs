//! Tree-ensemble classifier loaded from a JSON export.
//!
//! The artifact is a random forest flattened to plain JSON:
//!
//! ```json
//! {
//!   "classes": ["BENIGN", "Web Attack – XSS"],
//!   "feature_names": ["Destination Port", "Flow Duration"],
//!   "feature_importances": [0.7, 0.3],
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 0, "threshold": 66.5, "left": 1, "right": 2 },
//!         { "value": [40.0, 1.0] },
//!         { "value": [2.0, 30.0] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Node 0 is the root. A split sends a row left when
//! `row[feature] <= threshold`. A leaf holds per-class weights (sample
//! counts or fractions); each tree votes with its leaf normalised to sum 1
//! and the forest averages the votes.

use std::collections::HashSet;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{Classifier, feature_rows};
use crate::error::ClassifierError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf weights reached by `row`.
    ///
    /// Only valid on a tree that passed [`ForestModel::validate`], which
    /// guarantees every walk ends at a leaf.
    fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Serialized form of a fitted forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub classes: Vec<String>,
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
    pub trees: Vec<Tree>,
}

impl ForestModel {
    /// Structural checks that make traversal total and output widths fixed.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let invalid = |msg: String| Err(ClassifierError::InvalidModel(msg));

        if self.classes.is_empty() {
            return invalid("no classes".into());
        }
        if self.trees.is_empty() {
            return invalid("no trees".into());
        }

        let mut seen = HashSet::new();
        for name in &self.feature_names {
            if !seen.insert(name.as_str()) {
                return invalid(format!("duplicate feature name {name:?}"));
            }
        }

        if let Some(importances) = &self.feature_importances
            && importances.len() != self.feature_names.len()
        {
            return invalid(format!(
                "{} feature importances for {} features",
                importances.len(),
                self.feature_names.len()
            ));
        }

        let n_classes = self.classes.len();
        let n_features = self.feature_names.len();

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return invalid(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= n_features {
                            return invalid(format!(
                                "tree {t} node {i}: feature index {feature} out of range"
                            ));
                        }
                        if !threshold.is_finite() {
                            return invalid(format!("tree {t} node {i}: non-finite threshold"));
                        }
                        // Children must come after their parent: rules out cycles.
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return invalid(format!(
                                    "tree {t} node {i}: child index {child} out of range"
                                ));
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != n_classes {
                            return invalid(format!(
                                "tree {t} node {i}: leaf has {} weights for {n_classes} classes",
                                value.len()
                            ));
                        }
                        if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                            return invalid(format!("tree {t} node {i}: invalid leaf weight"));
                        }
                        if value.iter().sum::<f64>() <= 0.0 {
                            return invalid(format!("tree {t} node {i}: empty leaf"));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Random-forest classifier backed by a validated [`ForestModel`].
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    model: ForestModel,
}

impl ForestClassifier {
    /// Load and validate a JSON forest export.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let clf = Self::from_json(&json)?;
        info!(
            trees = clf.model.trees.len(),
            classes = clf.model.classes.len(),
            features = clf.model.feature_names.len(),
            model = %path.display(),
            "loaded forest model"
        );
        Ok(clf)
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        Self::from_model(serde_json::from_str(json)?)
    }

    pub fn from_model(model: ForestModel) -> Result<Self, ClassifierError> {
        model.validate()?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &ForestModel {
        &self.model
    }

    pub fn n_trees(&self) -> usize {
        self.model.trees.len()
    }

    /// Mean of the normalised leaf distributions across trees.
    fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.model.classes.len()];
        for tree in &self.model.trees {
            let leaf = tree.leaf(row);
            let total: f64 = leaf.iter().sum();
            for (p, w) in proba.iter_mut().zip(leaf) {
                *p += w / total;
            }
        }
        let n = self.model.trees.len() as f64;
        for p in &mut proba {
            *p /= n;
        }
        proba
    }
}

impl Classifier for ForestClassifier {
    fn name(&self) -> &str {
        "forest"
    }

    fn classes(&self) -> &[String] {
        &self.model.classes
    }

    fn feature_names(&self) -> &[String] {
        &self.model.feature_names
    }

    fn predict_proba(&self, batch: &RecordBatch) -> Result<Vec<Vec<f64>>, ClassifierError> {
        let rows = feature_rows(batch, &self.model.feature_names)?;
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }

    fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        self.model.feature_importances.as_ref().map(|imp| {
            self.model
                .feature_names
                .iter()
                .cloned()
                .zip(imp.iter().copied())
                .collect()
        })
    }
}

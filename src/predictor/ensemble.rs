//! Tree ensembles: random forests and gradient-boosted trees.
//!
//! Trees are stored as flat node arrays, as exported from a fitted scikit-learn estimator. Node 0
//! is the root and a split sends a row left when its feature value is at most the threshold.
use super::RegressionModel;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// A node in a regression tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// An internal node
    Split {
        /// Index of the feature to test
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// A terminal node
    Leaf {
        /// The predicted value
        value: f64,
    },
}

/// A single regression tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Create a tree from its nodes
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Check the tree is well formed.
    ///
    /// Children must come after their parent so that every traversal terminates.
    fn validate(&self, n_features: usize) -> Result<()> {
        ensure!(!self.nodes.is_empty(), "Tree has no nodes");
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                ensure!(
                    *feature < n_features,
                    "Node {index} splits on feature {feature} but model has {n_features} features"
                );
                ensure!(!threshold.is_nan(), "Node {index} has a NaN threshold");
                for child in [left, right] {
                    ensure!(
                        *child > index && *child < self.nodes.len(),
                        "Node {index} has invalid child index {child}"
                    );
                }
            }
        }

        Ok(())
    }

    /// Evaluate the tree for a single row
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return *value,
            }
        }
    }
}

/// How the outputs of individual trees are combined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    /// Mean of all trees (random forest)
    Mean,
    /// `init + learning_rate × Σ trees` (gradient boosting)
    Boosted {
        /// The initial prediction
        init: f64,
        /// Shrinkage applied to each tree
        learning_rate: f64,
    },
}

/// A collection of regression trees whose outputs are aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    feature_names: Vec<String>,
    trees: Vec<RegressionTree>,
    aggregation: Aggregation,
}

impl TreeEnsemble {
    /// Create a new ensemble, checking every tree is well formed
    pub fn new(
        feature_names: Vec<String>,
        trees: Vec<RegressionTree>,
        aggregation: Aggregation,
    ) -> Result<Self> {
        ensure!(!trees.is_empty(), "Tree ensemble has no trees");
        if let Aggregation::Boosted {
            init,
            learning_rate,
        } = aggregation
        {
            ensure!(
                init.is_finite() && learning_rate.is_finite() && learning_rate > 0.0,
                "Invalid gradient boosting parameters (init: {init}, learning rate: {learning_rate})"
            );
        }
        for (index, tree) in trees.iter().enumerate() {
            tree.validate(feature_names.len())
                .with_context(|| format!("Invalid tree {index}"))?;
        }

        Ok(Self {
            feature_names,
            trees,
            aggregation,
        })
    }
}

impl RegressionModel for TreeEnsemble {
    fn name(&self) -> &'static str {
        match self.aggregation {
            Aggregation::Mean => "random forest",
            Aggregation::Boosted { .. } => "gradient boosting",
        }
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        match self.aggregation {
            Aggregation::Mean => total / self.trees.len() as f64,
            Aggregation::Boosted {
                init,
                learning_rate,
            } => init + learning_rate * total,
        }
    }
}

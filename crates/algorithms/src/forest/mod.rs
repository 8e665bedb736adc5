//! Bootstrapped decision forest classifier
//!
//! Standard random-forest construction: every tree is grown on a
//! bootstrap sample (drawn with replacement) of the training set and
//! considers a random feature subset at each split. The forest predicts
//! by plurality vote of its trees, or reports the per-class vote
//! fractions as a probability vector.

mod split;
mod tree;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::maybe_rayon::*;
use terravote_core::{Error, Result};
use tree::{DecisionTree, TreeParams};

/// Parameters for fitting a decision forest
#[derive(Debug, Clone)]
pub struct ForestParams {
    /// Number of trees T (default: 500)
    pub n_trees: usize,
    /// Features considered per split; `None` uses all features
    pub max_features: Option<usize>,
    /// Minimum samples required to attempt a split (default: 2)
    pub min_samples_split: usize,
    /// Minimum samples required in each leaf (default: 1)
    pub min_samples_leaf: usize,
    /// Random seed; fixed seed gives bit-identical forests
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 500,
            max_features: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// A fitted decision forest over dense 0-based class indices.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl Forest {
    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of classes the forest votes over
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Feature dimensionality expected by [`Forest::predict`]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predict the class index of a sample by plurality vote.
    ///
    /// Vote ties resolve to the lowest class index.
    pub fn predict(&self, sample: &[f64]) -> usize {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(sample)] += 1;
        }
        votes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(class, _)| class)
            .unwrap_or(0)
    }

    /// Per-class probability vector for a sample.
    ///
    /// Probabilities are the fraction of trees voting for each class,
    /// so the vector is non-negative and sums to 1.
    pub fn predict_proba(&self, sample: &[f64]) -> Vec<f64> {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(sample)] += 1;
        }
        let total = self.trees.len() as f64;
        votes.iter().map(|&v| v as f64 / total).collect()
    }
}

/// Fit a decision forest on a row-major design matrix.
///
/// `labels` holds dense 0-based class indices below `n_classes`.
/// Trees are trained in parallel; each draws its bootstrap sample and
/// split choices from a seed fanned out from `params.seed`, so results
/// are reproducible regardless of scheduling.
pub fn fit_forest(
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    params: &ForestParams,
) -> Result<Forest> {
    if params.n_trees == 0 {
        return Err(Error::InvalidParameter {
            name: "n_trees",
            value: "0".into(),
            reason: "a forest needs at least one tree".into(),
        });
    }
    if features.is_empty() || features.len() != labels.len() {
        return Err(Error::InvalidParameter {
            name: "features",
            value: format!("{} rows, {} labels", features.len(), labels.len()),
            reason: "need a non-empty design matrix with one label per row".into(),
        });
    }

    let n_samples = features.len();
    let n_features = features[0].len();
    for row in features {
        if row.len() != n_features {
            return Err(Error::FeatureMismatch(format!(
                "design matrix rows have inconsistent lengths ({} vs {})",
                n_features,
                row.len()
            )));
        }
    }
    if labels.iter().any(|&l| l >= n_classes) {
        return Err(Error::InvalidParameter {
            name: "labels",
            value: n_classes.to_string(),
            reason: "label index outside the class range".into(),
        });
    }

    let tree_params = TreeParams {
        max_features: params.max_features.unwrap_or(n_features).clamp(1, n_features),
        min_samples_split: params.min_samples_split.max(2),
        min_samples_leaf: params.min_samples_leaf.max(1),
    };

    // Column-major layout for the split scan.
    let col_features: Vec<Vec<f64>> = (0..n_features)
        .map(|f| features.iter().map(|row| row[f]).collect())
        .collect();

    // Fan per-tree seeds out of a master stream so tree training is
    // order-independent under work stealing.
    let mut master = ChaCha8Rng::seed_from_u64(params.seed);
    let tree_seeds: Vec<u64> = (0..params.n_trees).map(|_| master.random()).collect();

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap: Vec<usize> = (0..n_samples)
                .map(|_| rng.random_range(0..n_samples))
                .collect();
            DecisionTree::fit(&col_features, labels, &bootstrap, n_classes, tree_params, &mut rng)
        })
        .collect();

    debug!(
        n_trees = trees.len(),
        n_samples,
        n_features,
        n_classes,
        "decision forest fitted"
    );

    Ok(Forest {
        trees,
        n_features,
        n_classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well-separated classes along the first feature.
    fn separable_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..15 {
            features.push(vec![i as f64 * 0.2, 0.5]);
            labels.push(0);
        }
        for i in 0..15 {
            features.push(vec![10.0 + i as f64 * 0.2, 0.5]);
            labels.push(1);
        }
        for i in 0..15 {
            features.push(vec![20.0 + i as f64 * 0.2, 0.5]);
            labels.push(2);
        }
        (features, labels)
    }

    #[test]
    fn test_separable_accuracy() {
        let (features, labels) = separable_data();
        let params = ForestParams {
            n_trees: 30,
            ..Default::default()
        };
        let forest = fit_forest(&features, &labels, 3, &params).unwrap();

        let correct = features
            .iter()
            .zip(&labels)
            .filter(|&(row, &label)| forest.predict(row) == label)
            .count();
        assert!(correct as f64 / labels.len() as f64 > 0.9);
    }

    #[test]
    fn test_proba_sums_to_one() {
        let (features, labels) = separable_data();
        let params = ForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let forest = fit_forest(&features, &labels, 3, &params).unwrap();

        let proba = forest.predict_proba(&[10.5, 0.5]);
        assert_eq!(proba.len(), 3);
        let sum: f64 = proba.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        assert!(proba.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let (features, labels) = separable_data();
        let params = ForestParams {
            n_trees: 10,
            max_features: Some(1),
            seed: 99,
            ..Default::default()
        };
        let forest1 = fit_forest(&features, &labels, 3, &params).unwrap();
        let forest2 = fit_forest(&features, &labels, 3, &params).unwrap();

        for row in &features {
            assert_eq!(forest1.predict(row), forest2.predict(row));
            assert_eq!(forest1.predict_proba(row), forest2.predict_proba(row));
        }
    }

    #[test]
    fn test_zero_trees_error() {
        let (features, labels) = separable_data();
        let params = ForestParams {
            n_trees: 0,
            ..Default::default()
        };
        assert!(fit_forest(&features, &labels, 3, &params).is_err());
    }

    #[test]
    fn test_empty_dataset_error() {
        let params = ForestParams::default();
        assert!(fit_forest(&[], &[], 3, &params).is_err());
    }

    #[test]
    fn test_inconsistent_rows_error() {
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        let labels = vec![0, 1];
        let params = ForestParams::default();
        let err = fit_forest(&features, &labels, 2, &params).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch(_)));
    }
}

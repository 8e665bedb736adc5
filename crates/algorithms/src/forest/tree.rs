//! CART decision tree with arena-based node storage

use rand_chacha::ChaCha8Rng;

use crate::forest::split::{find_best_split, gini};

/// One node of a fitted tree, stored in a flat arena.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted CART decision tree over dense 0-based class indices.
#[derive(Debug, Clone)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
}

/// Stopping parameters shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) max_features: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
}

impl DecisionTree {
    /// Grow a tree on the given (possibly bootstrapped) sample indices.
    ///
    /// `col_features` is column-major over the full design matrix;
    /// `sample_indices` selects this tree's training rows and may
    /// contain duplicates from bootstrap resampling.
    pub(crate) fn fit(
        col_features: &[Vec<f64>],
        labels: &[usize],
        sample_indices: &[usize],
        n_classes: usize,
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut nodes = Vec::new();
        build_node(
            col_features,
            labels,
            sample_indices,
            n_classes,
            params,
            rng,
            &mut nodes,
        );
        Self { nodes }
    }

    /// Predict the class index for a single sample.
    ///
    /// Traverses from the root (index 0): left when
    /// `sample[feature] <= threshold`, right otherwise.
    pub(crate) fn predict(&self, sample: &[f64]) -> usize {
        let mut index = 0usize;
        loop {
            match &self.nodes[index] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Recursively build the arena; returns the index of the node created.
fn build_node(
    col_features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    params: TreeParams,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
) -> usize {
    let n_samples = sample_indices.len();

    let mut class_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        class_counts[labels[si]] += 1;
    }

    // First maximum, so ties resolve to the lowest class index.
    let majority = class_counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(class, _)| class)
        .unwrap_or(0);

    let pure = gini(&class_counts, n_samples) == 0.0;
    if pure || n_samples < params.min_samples_split {
        arena.push(Node::Leaf { class: majority });
        return arena.len() - 1;
    }

    let split = match find_best_split(
        col_features,
        labels,
        sample_indices,
        n_classes,
        params.max_features,
        params.min_samples_leaf,
        rng,
    ) {
        Some(split) => split,
        None => {
            arena.push(Node::Leaf { class: majority });
            return arena.len() - 1;
        }
    };

    // Arena pattern: reserve the index, recurse, then overwrite.
    let node_index = arena.len();
    arena.push(Node::Leaf { class: majority });

    let left = build_node(
        col_features,
        labels,
        &split.left_indices,
        n_classes,
        params,
        rng,
        arena,
    );
    let right = build_node(
        col_features,
        labels,
        &split.right_indices,
        n_classes,
        params,
        rng,
        arena,
    );

    arena[node_index] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };

    node_index
}

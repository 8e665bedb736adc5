//! Gini impurity and exact split search

use rand::Rng;

/// Gini impurity of a node: 1 - Σ(p_i²)
pub(crate) fn gini(class_counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    let sum_sq: f64 = class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// The best split found for a node.
pub(crate) struct BestSplit {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best exact split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// node's samples by value and scans left-to-right with incremental
/// class counts, keeping the boundary with the lowest weighted child
/// impurity. Returns `None` when no valid boundary exists (all values
/// identical, or every boundary violates `min_samples_leaf`).
///
/// `col_features` is column-major: `col_features[feature][sample]`.
/// `sample_indices` may contain duplicates (bootstrap draws index the
/// full design matrix rather than materializing resampled rows).
pub(crate) fn find_best_split(
    col_features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<BestSplit> {
    let n_features = col_features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        parent_counts[labels[si]] += 1;
    }

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let take = max_features.min(n_features);
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    for i in 0..take {
        let j = rng.random_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_score = f64::INFINITY;
    let mut best: Option<(usize, f64)> = None;

    for &feature in &feature_order[..take] {
        let column = &col_features[feature];

        let mut sorted: Vec<(f64, usize)> =
            sample_indices.iter().map(|&si| (column[si], si)).collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..(n_samples - 1) {
            let (value, si) = sorted[i];
            let class = labels[si];

            left_counts[class] += 1;
            right_counts[class] -= 1;

            // No boundary between identical values.
            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let score = (n_left as f64) * gini(&left_counts, n_left)
                + (n_right as f64) * gini(&right_counts, n_right);

            if score < best_score {
                best_score = score;
                best = Some((feature, (value + next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;

    let column = &col_features[feature];
    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &si in sample_indices {
        if column[si] <= threshold {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(BestSplit {
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}

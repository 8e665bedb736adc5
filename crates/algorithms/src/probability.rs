//! Probability-mode classification
//!
//! Trains a single forest and reports, per cell, the fraction of trees
//! voting for each class instead of a hard label. The resulting
//! [`ProbabilityRaster`] feeds the confidence scorer.

use ndarray::Array3;
use tracing::info;

use crate::forest::{ForestParams, fit_forest};
use crate::maybe_rayon::*;
use terravote_core::{Error, FeatureGrid, ProbabilityRaster, Result, TrainingSet};

/// Parameters for probability-mode classification
#[derive(Debug, Clone)]
pub struct ProbabilityParams {
    /// Trees per forest T (default: 500)
    pub trees: usize,
    /// Random seed; fixed seed gives a bit-identical raster
    pub seed: u64,
}

impl Default for ProbabilityParams {
    fn default() -> Self {
        Self {
            trees: 500,
            seed: 42,
        }
    }
}

/// Classify the grid into per-cell class probability vectors.
///
/// One forest is trained with all selected bands considered at every
/// split (no M restriction). Each valid cell gets a vector of vote
/// fractions summing to 1.0, in the order of the training legend;
/// cells with unusable features are NaN across all classes.
pub fn probability_classify(
    grid: &FeatureGrid,
    train: &TrainingSet,
    params: &ProbabilityParams,
) -> Result<ProbabilityRaster> {
    train.validate_grid(grid)?;

    let forest_params = ForestParams {
        n_trees: params.trees,
        max_features: None,
        seed: params.seed,
        ..Default::default()
    };

    info!(
        trees = params.trees,
        n_samples = train.n_samples(),
        n_classes = train.n_classes(),
        "training probability classifier"
    );

    let forest = fit_forest(
        train.features(),
        train.labels(),
        train.n_classes(),
        &forest_params,
    )?;

    let (rows, cols) = grid.shape();
    let n_classes = train.n_classes();
    let band_indices = train.band_indices();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols * n_classes];
            let mut vector = Vec::with_capacity(band_indices.len());
            for col in 0..cols {
                if grid.feature_vector(row, col, band_indices, &mut vector) {
                    let proba = forest.predict_proba(&vector);
                    row_data[col * n_classes..(col + 1) * n_classes].copy_from_slice(&proba);
                }
            }
            row_data
        })
        .collect();

    let array = Array3::from_shape_vec((rows, cols, n_classes), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    ProbabilityRaster::new(array, train.classes().to_vec(), *grid.transform())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use terravote_core::LabelSample;

    fn separable_scene() -> (FeatureGrid, TrainingSet) {
        let mut band = Array2::zeros((4, 4));
        for row in 0..4 {
            for col in 0..4 {
                band[(row, col)] = if row < 2 { 10.0 } else { 90.0 };
            }
        }
        let grid = FeatureGrid::from_bands(vec![("b1".to_string(), band)]).unwrap();
        let samples = vec![
            LabelSample::new(0, 0, 1),
            LabelSample::new(1, 2, 1),
            LabelSample::new(2, 1, 2),
            LabelSample::new(3, 3, 2),
        ];
        let train = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2]).unwrap();
        (grid, train)
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (grid, train) = separable_scene();
        let params = ProbabilityParams {
            trees: 20,
            seed: 3,
        };
        let prob = probability_classify(&grid, &train, &params).unwrap();

        assert_eq!(prob.shape(), (4, 4));
        assert_eq!(prob.classes(), &[1, 2]);
        for row in 0..4 {
            for col in 0..4 {
                let p = prob.probabilities(row, col).unwrap();
                let sum: f64 = p.iter().sum();
                assert!((sum - 1.0).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_separable_cells_near_certain() {
        let (grid, train) = separable_scene();
        let params = ProbabilityParams {
            trees: 30,
            seed: 3,
        };
        let prob = probability_classify(&grid, &train, &params).unwrap();

        // Class 1 dominates in the top half, class 2 in the bottom.
        assert!(prob.probabilities(0, 0).unwrap()[0] > 0.8);
        assert!(prob.probabilities(3, 3).unwrap()[1] > 0.8);
    }

    #[test]
    fn test_masked_cell_is_nan() {
        let (grid, _) = separable_scene();
        let mut grid = grid;
        let mut masked = Array2::from_elem((4, 4), 1.0);
        masked[(1, 1)] = f64::INFINITY;
        grid.push_band("mask", masked).unwrap();

        let samples = vec![
            LabelSample::new(0, 0, 1),
            LabelSample::new(1, 2, 1),
            LabelSample::new(2, 1, 2),
            LabelSample::new(3, 3, 2),
        ];
        let train =
            TrainingSet::from_samples(&grid, &samples, &["b1", "mask"], &[1, 2]).unwrap();
        let prob = probability_classify(
            &grid,
            &train,
            &ProbabilityParams {
                trees: 10,
                seed: 3,
            },
        )
        .unwrap();

        assert!(prob.is_masked(1, 1).unwrap());
        assert!(!prob.is_masked(0, 0).unwrap());
    }

    #[test]
    fn test_foreign_grid_rejected() {
        let (grid, _) = separable_scene();
        let mut two_band = grid.clone();
        two_band
            .push_band("extra", Array2::zeros((4, 4)))
            .unwrap();
        let samples = vec![
            LabelSample::new(0, 0, 1),
            LabelSample::new(1, 2, 1),
            LabelSample::new(2, 1, 2),
            LabelSample::new(3, 3, 2),
        ];
        let train =
            TrainingSet::from_samples(&two_band, &samples, &["b1", "extra"], &[1, 2]).unwrap();

        let err = probability_classify(&grid, &train, &ProbabilityParams::default()).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch(_)));
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let (grid, train) = separable_scene();
        let params = ProbabilityParams {
            trees: 15,
            seed: 21,
        };
        let a = probability_classify(&grid, &train, &params).unwrap();
        let b = probability_classify(&grid, &train, &params).unwrap();
        assert_eq!(a.data(), b.data());
    }
}

//! Ensemble trainer: R independently seeded forests over one training set
//!
//! Training labels drawn from hand-digitized polygons are sparse and
//! noisy, so a single forest is not trusted. Instead R forests are
//! trained with independent bootstrap randomness and each classifies
//! the full grid; the per-run label rasters are reduced to a consensus
//! by [`crate::vote::majority_vote`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::forest::{Forest, ForestParams, fit_forest};
use crate::maybe_rayon::*;
use terravote_core::{Error, FeatureGrid, LabelRaster, NO_CLASS, Result, TrainingSet};

/// Parameters for ensemble training
#[derive(Debug, Clone)]
pub struct EnsembleParams {
    /// Number of independent training runs R (default: 1000)
    pub runs: usize,
    /// Trees per forest T (default: 500)
    pub trees: usize,
    /// Features considered per split M (default: 4, clamped to the
    /// number of selected bands)
    pub split_features: usize,
    /// Master seed; each run derives its own seed from this stream
    pub seed: u64,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            runs: 1000,
            trees: 500,
            split_features: 4,
            seed: 42,
        }
    }
}

/// Train R independent forests and classify the grid with each.
///
/// Runs are stochastically independent (per-run seeds fan out of a
/// master stream) and execute as a parallel map with no shared mutable
/// state; each output raster is written once. The returned vector is
/// ordered by run index, but the downstream majority vote is
/// order-independent.
///
/// All configuration errors surface before any training starts:
/// `TrainingSet` construction has already checked band presence and
/// legend coverage, and the run/tree counts are validated here.
pub fn train_ensemble(
    grid: &FeatureGrid,
    train: &TrainingSet,
    params: &EnsembleParams,
) -> Result<Vec<LabelRaster>> {
    if params.runs == 0 {
        return Err(Error::InvalidParameter {
            name: "runs",
            value: "0".into(),
            reason: "the ensemble needs at least one run".into(),
        });
    }
    if params.split_features == 0 {
        return Err(Error::InvalidParameter {
            name: "split_features",
            value: "0".into(),
            reason: "at least one feature must be considered per split".into(),
        });
    }

    train.validate_grid(grid)?;

    let n_bands = train.band_indices().len();
    let forest_params = ForestParams {
        n_trees: params.trees,
        max_features: Some(params.split_features.min(n_bands)),
        seed: 0, // replaced per run
        ..Default::default()
    };

    info!(
        runs = params.runs,
        trees = params.trees,
        split_features = params.split_features.min(n_bands),
        n_samples = train.n_samples(),
        n_classes = train.n_classes(),
        "training classification ensemble"
    );

    let mut master = ChaCha8Rng::seed_from_u64(params.seed);
    let run_seeds: Vec<u64> = (0..params.runs).map(|_| master.random()).collect();

    run_seeds
        .into_par_iter()
        .map(|seed| {
            let run_params = ForestParams {
                seed,
                ..forest_params.clone()
            };
            let forest = fit_forest(
                train.features(),
                train.labels(),
                train.n_classes(),
                &run_params,
            )?;
            classify_grid(grid, train, &forest)
        })
        .collect()
}

/// Classify every cell of the grid with a fitted forest.
///
/// Cells whose feature vector contains a non-finite value get
/// [`NO_CLASS`]; predicted class indices are mapped back to legend
/// labels.
pub fn classify_grid(
    grid: &FeatureGrid,
    train: &TrainingSet,
    forest: &Forest,
) -> Result<LabelRaster> {
    train.validate_grid(grid)?;

    let (rows, cols) = grid.shape();
    let band_indices = train.band_indices();
    let classes = train.classes();

    let data: Vec<u16> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NO_CLASS; cols];
            let mut vector = Vec::with_capacity(band_indices.len());
            for (col, out) in row_data.iter_mut().enumerate() {
                if grid.feature_vector(row, col, band_indices, &mut vector) {
                    *out = classes[forest.predict(&vector)];
                }
            }
            row_data
        })
        .collect();

    let mut output = LabelRaster::from_vec(data, rows, cols)?;
    output.set_transform(*grid.transform());
    output.set_nodata(Some(NO_CLASS));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use terravote_core::LabelSample;

    /// 6x6 grid whose single band separates three classes by row bands.
    fn separable_scene() -> (FeatureGrid, Vec<LabelSample>) {
        let mut band = Array2::zeros((6, 6));
        for row in 0..6 {
            for col in 0..6 {
                band[(row, col)] = match row / 2 {
                    0 => 10.0,
                    1 => 50.0,
                    _ => 90.0,
                };
            }
        }
        let grid = FeatureGrid::from_bands(vec![("b1".to_string(), band)]).unwrap();
        let samples = vec![
            LabelSample::new(0, 0, 1),
            LabelSample::new(1, 3, 1),
            LabelSample::new(2, 1, 2),
            LabelSample::new(3, 4, 2),
            LabelSample::new(4, 2, 3),
            LabelSample::new(5, 5, 3),
        ];
        (grid, samples)
    }

    #[test]
    fn test_ensemble_produces_r_rasters() {
        let (grid, samples) = separable_scene();
        let train = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2, 3]).unwrap();
        let params = EnsembleParams {
            runs: 3,
            trees: 10,
            split_features: 1,
            seed: 7,
        };

        let rasters = train_ensemble(&grid, &train, &params).unwrap();
        assert_eq!(rasters.len(), 3);
        for raster in &rasters {
            assert_eq!(raster.shape(), (6, 6));
        }
    }

    #[test]
    fn test_separable_scene_classified_correctly() {
        let (grid, samples) = separable_scene();
        let train = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2, 3]).unwrap();
        let params = EnsembleParams {
            runs: 1,
            trees: 15,
            split_features: 1,
            seed: 7,
        };

        let raster = &train_ensemble(&grid, &train, &params).unwrap()[0];
        assert_eq!(raster.get(0, 3).unwrap(), 1);
        assert_eq!(raster.get(2, 3).unwrap(), 2);
        assert_eq!(raster.get(5, 3).unwrap(), 3);
    }

    #[test]
    fn test_masked_cell_gets_no_class() {
        let (mut grid, samples) = separable_scene();
        let mut masked = Array2::from_elem((6, 6), 1.0);
        masked[(0, 5)] = f64::NAN;
        grid.push_band("mask", masked).unwrap();

        let train =
            TrainingSet::from_samples(&grid, &samples, &["b1", "mask"], &[1, 2, 3]).unwrap();
        let params = EnsembleParams {
            runs: 1,
            trees: 10,
            split_features: 2,
            seed: 7,
        };

        let raster = &train_ensemble(&grid, &train, &params).unwrap()[0];
        assert!(raster.is_nodata_at(0, 5).unwrap());
        assert!(!raster.is_nodata_at(0, 0).unwrap());
    }

    #[test]
    fn test_deterministic_across_executions() {
        let (grid, samples) = separable_scene();
        let train = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2, 3]).unwrap();
        let params = EnsembleParams {
            runs: 2,
            trees: 10,
            split_features: 1,
            seed: 11,
        };

        let a = train_ensemble(&grid, &train, &params).unwrap();
        let b = train_ensemble(&grid, &train, &params).unwrap();
        for (ra, rb) in a.iter().zip(&b) {
            assert_eq!(ra.data(), rb.data());
        }
    }

    #[test]
    fn test_foreign_grid_rejected() {
        let (grid, samples) = separable_scene();
        let mut two_band = grid.clone();
        two_band.push_band("extra", Array2::zeros((6, 6))).unwrap();
        let train =
            TrainingSet::from_samples(&two_band, &samples, &["b1", "extra"], &[1, 2, 3]).unwrap();
        let params = EnsembleParams {
            runs: 1,
            trees: 5,
            split_features: 1,
            seed: 1,
        };

        // A grid missing a selected band is an error, never a panic.
        let err = train_ensemble(&grid, &train, &params).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch(_)));
    }

    #[test]
    fn test_zero_runs_rejected() {
        let (grid, samples) = separable_scene();
        let train = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2, 3]).unwrap();
        let params = EnsembleParams {
            runs: 0,
            ..Default::default()
        };
        assert!(train_ensemble(&grid, &train, &params).is_err());
    }
}

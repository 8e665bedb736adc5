//! Training samples and validated training sets

use crate::error::{Error, Result};
use crate::feature::FeatureGrid;
use crate::raster::GeoTransform;

/// A single labeled training point: one grid cell and its class.
///
/// Samples typically come from hand-drawn polygons rasterized against
/// the feature grid, so they are sparse and may be noisy. They are
/// immutable once assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSample {
    pub row: usize,
    pub col: usize,
    pub class: u16,
}

impl LabelSample {
    pub fn new(row: usize, col: usize, class: u16) -> Self {
        Self { row, col, class }
    }

    /// Resolve a map-coordinate point to a grid cell.
    ///
    /// Returns `None` for points left of or above the raster origin,
    /// or when the transform is degenerate. The grid extent is unknown
    /// here; an over-large index surfaces as
    /// [`Error::IndexOutOfBounds`] when the sample is handed to
    /// [`TrainingSet::from_samples`].
    pub fn from_geo(transform: &GeoTransform, x: f64, y: f64, class: u16) -> Option<Self> {
        let (col, row) = transform.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        Some(Self {
            row: row.floor() as usize,
            col: col.floor() as usize,
            class,
        })
    }
}

/// A validated design matrix extracted from a feature grid.
///
/// Construction performs every check that is cheap before training and
/// expensive to discover mid-ensemble:
///
/// - requested bands exist ([`Error::FeatureMismatch`]),
/// - samples fall inside the grid ([`Error::IndexOutOfBounds`]),
/// - sample classes belong to the declared legend
///   ([`Error::InvalidParameter`]),
/// - every legend class has at least one usable sample
///   ([`Error::InsufficientSamples`]).
///
/// Samples whose feature vector contains a non-finite value (masked
/// imagery under a training polygon) are dropped; the legend-coverage
/// check runs after dropping, so a class living entirely on masked
/// pixels is still reported as insufficient.
///
/// Class labels are mapped to dense 0-based indices for the classifier;
/// the sorted legend maps them back.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
    classes: Vec<u16>,
    band_indices: Vec<usize>,
}

impl TrainingSet {
    /// Extract a training set from `grid` restricted to `bands`.
    pub fn from_samples(
        grid: &FeatureGrid,
        samples: &[LabelSample],
        bands: &[&str],
        legend: &[u16],
    ) -> Result<Self> {
        if legend.is_empty() {
            return Err(Error::InvalidParameter {
                name: "legend",
                value: "0 classes".into(),
                reason: "at least one class is required".into(),
            });
        }

        let mut classes: Vec<u16> = legend.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let band_indices = grid.select(bands)?;
        let (rows, cols) = grid.shape();

        let mut features = Vec::with_capacity(samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        let mut counts = vec![0usize; classes.len()];
        let mut vector = Vec::with_capacity(band_indices.len());

        for sample in samples {
            if sample.row >= rows || sample.col >= cols {
                return Err(Error::IndexOutOfBounds {
                    row: sample.row,
                    col: sample.col,
                    rows,
                    cols,
                });
            }

            let class_index = classes.binary_search(&sample.class).map_err(|_| {
                Error::InvalidParameter {
                    name: "samples",
                    value: sample.class.to_string(),
                    reason: "sample class not in the declared legend".into(),
                }
            })?;

            if !grid.feature_vector(sample.row, sample.col, &band_indices, &mut vector) {
                continue;
            }

            counts[class_index] += 1;
            features.push(vector.clone());
            labels.push(class_index);
        }

        for (index, &count) in counts.iter().enumerate() {
            if count == 0 {
                return Err(Error::InsufficientSamples {
                    class: classes[index],
                });
            }
        }

        Ok(Self {
            features,
            labels,
            classes,
            band_indices,
        })
    }

    /// Check that `grid` can satisfy this set's band selection.
    ///
    /// Classifying a grid other than the one the set was extracted
    /// from is only sound when every selected band index still exists
    /// there; otherwise this reports [`Error::FeatureMismatch`] before
    /// any cell is touched.
    pub fn validate_grid(&self, grid: &FeatureGrid) -> Result<()> {
        for &band in &self.band_indices {
            if band >= grid.n_bands() {
                return Err(Error::FeatureMismatch(format!(
                    "training set selects band index {band} but the grid has {} bands",
                    grid.n_bands()
                )));
            }
        }
        Ok(())
    }

    /// Design matrix, one row per usable sample
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Dense 0-based class index per sample
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Sorted class legend; index i holds the label for class index i
    pub fn classes(&self) -> &[u16] {
        &self.classes
    }

    /// Number of classes C
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Indices of the selected bands within the source grid
    pub fn band_indices(&self) -> &[usize] {
        &self.band_indices
    }

    /// Number of usable samples
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn grid_with_values() -> FeatureGrid {
        let mut band = Array2::zeros((5, 5));
        for row in 0..5 {
            for col in 0..5 {
                band[(row, col)] = (row * 5 + col) as f64;
            }
        }
        FeatureGrid::from_bands(vec![("b1".to_string(), band)]).unwrap()
    }

    #[test]
    fn test_training_set_extraction() {
        let grid = grid_with_values();
        let samples = vec![
            LabelSample::new(0, 0, 1),
            LabelSample::new(0, 1, 1),
            LabelSample::new(4, 4, 2),
        ];

        let train = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2]).unwrap();
        assert_eq!(train.n_samples(), 3);
        assert_eq!(train.classes(), &[1, 2]);
        assert_eq!(train.labels(), &[0, 0, 1]);
        assert_eq!(train.features()[2], vec![24.0]);
    }

    #[test]
    fn test_insufficient_samples() {
        let grid = grid_with_values();
        let samples = vec![LabelSample::new(0, 0, 1)];

        let err = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { class: 2 }));
    }

    #[test]
    fn test_missing_band_detected_before_training() {
        let grid = grid_with_values();
        let samples = vec![LabelSample::new(0, 0, 1)];

        let err = TrainingSet::from_samples(&grid, &samples, &["b9"], &[1]).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch(_)));
    }

    #[test]
    fn test_sample_outside_grid() {
        let grid = grid_with_values();
        let samples = vec![LabelSample::new(7, 0, 1)];

        let err = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1]).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_class_outside_legend() {
        let grid = grid_with_values();
        let samples = vec![LabelSample::new(0, 0, 9)];

        let err = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_masked_samples_dropped() {
        let mut band = Array2::from_elem((3, 3), 1.0);
        band[(0, 0)] = f64::NAN;
        let grid = FeatureGrid::from_bands(vec![("b1".to_string(), band)]).unwrap();

        // Class 1 only lives on the masked pixel.
        let samples = vec![LabelSample::new(0, 0, 1), LabelSample::new(1, 1, 2)];
        let err = TrainingSet::from_samples(&grid, &samples, &["b1"], &[1, 2]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { class: 1 }));
    }

    #[test]
    fn test_validate_grid_band_selection() {
        let mut grid = grid_with_values();
        grid.push_band("b2", Array2::zeros((5, 5))).unwrap();
        let samples = vec![LabelSample::new(0, 0, 1), LabelSample::new(1, 1, 2)];
        let train = TrainingSet::from_samples(&grid, &samples, &["b1", "b2"], &[1, 2]).unwrap();

        assert!(train.validate_grid(&grid).is_ok());
        // A grid missing the second selected band is rejected, not indexed.
        let err = train.validate_grid(&grid_with_values()).unwrap_err();
        assert!(matches!(err, Error::FeatureMismatch(_)));
    }

    #[test]
    fn test_sample_from_geo() {
        let transform = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let sample = LabelSample::from_geo(&transform, 125.0, 175.0, 3).unwrap();
        assert_eq!((sample.row, sample.col, sample.class), (2, 2, 3));

        assert!(LabelSample::from_geo(&transform, 95.0, 175.0, 3).is_none());
    }
}

//! Probability and confidence raster types

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use ndarray::{Array3, ArrayView1, s};

/// A per-cell class probability raster.
///
/// Stores one probability vector of length C per cell in an
/// `Array3<f64>` of shape (rows, cols, C), band k corresponding to
/// `classes()[k]`. Probabilities are *fractions*: each valid cell's
/// vector is non-negative and sums to 1.0. Masked cells (no usable
/// features) are NaN across all C bands.
#[derive(Debug, Clone)]
pub struct ProbabilityRaster {
    data: Array3<f64>,
    classes: Vec<u16>,
    transform: GeoTransform,
}

impl ProbabilityRaster {
    /// Create a probability raster from raw data and its class legend.
    ///
    /// The legend length must match the third dimension of `data` and
    /// hold at least two classes.
    pub fn new(data: Array3<f64>, classes: Vec<u16>, transform: GeoTransform) -> Result<Self> {
        if classes.len() < 2 {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: classes.len().to_string(),
                reason: "probability output needs at least 2 classes".into(),
            });
        }
        if data.dim().2 != classes.len() {
            return Err(Error::FeatureMismatch(format!(
                "probability raster has {} bands but the legend has {} classes",
                data.dim().2,
                classes.len()
            )));
        }
        Ok(Self {
            data,
            classes,
            transform,
        })
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (rows, cols, _) = self.data.dim();
        (rows, cols)
    }

    /// Number of classes C
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class legend, in band order
    pub fn classes(&self) -> &[u16] {
        &self.classes
    }

    /// Probability vector at (row, col)
    pub fn probabilities(&self, row: usize, col: usize) -> Result<ArrayView1<'_, f64>> {
        let (rows, cols) = self.shape();
        if row >= rows || col >= cols {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            });
        }
        Ok(self.data.slice(s![row, col, ..]))
    }

    /// Whether the cell at (row, col) is masked (all-NaN vector)
    pub fn is_masked(&self, row: usize, col: usize) -> Result<bool> {
        Ok(self.probabilities(row, col)?[0].is_nan())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }
}

/// Per-cell confidence derived from a [`ProbabilityRaster`].
///
/// Five bands per cell: the two most probable classes, their
/// probabilities, and the margin confidence `1 - top2/top1` in [0, 1].
/// Cells where the classifier carries no information (masked input or
/// top-1 probability of zero) are NaN in all five bands.
#[derive(Debug, Clone)]
pub struct ConfidenceRaster {
    /// Most probable class label (legend value, as f64)
    pub top1_class: Raster<f64>,
    /// Second most probable class label
    pub top2_class: Raster<f64>,
    /// Probability of the most probable class
    pub top1_prob: Raster<f64>,
    /// Probability of the runner-up class
    pub top2_prob: Raster<f64>,
    /// Margin confidence, 1 - top2_prob/top1_prob
    pub confidence: Raster<f64>,
}

impl ConfidenceRaster {
    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.confidence.shape()
    }

    /// Whether the cell at (row, col) is masked
    pub fn is_masked(&self, row: usize, col: usize) -> Result<bool> {
        Ok(self.confidence.get(row, col)?.is_nan())
    }
}

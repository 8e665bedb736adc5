//! Feature grid: named raster bands forming per-cell feature vectors

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::Array2;

/// A stack of named feature bands with identical shape.
///
/// Each cell of the grid carries one feature vector of length D (the
/// number of bands). The band schema is validated once at construction;
/// downstream stages select bands by name and fail with
/// [`Error::FeatureMismatch`] when a requested band is absent, before
/// any training starts.
///
/// The grid is immutable once assembled apart from appending bands;
/// classifiers only ever read from it.
#[derive(Debug, Clone)]
pub struct FeatureGrid {
    names: Vec<String>,
    bands: Vec<Array2<f64>>,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
}

impl FeatureGrid {
    /// Create an empty feature grid of the given shape
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            names: Vec::new(),
            bands: Vec::new(),
            rows,
            cols,
            transform: GeoTransform::default(),
        }
    }

    /// Create a feature grid from named bands.
    ///
    /// All bands must share the same shape and names must be unique.
    pub fn from_bands(bands: Vec<(String, Array2<f64>)>) -> Result<Self> {
        let (rows, cols) = match bands.first() {
            Some((_, data)) => data.dim(),
            None => {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: "0".into(),
                    reason: "a feature grid needs at least one band".into(),
                });
            }
        };

        let mut grid = Self::new(rows, cols);
        for (name, data) in bands {
            grid.push_band(name, data)?;
        }
        Ok(grid)
    }

    /// Append a named band, validating its shape against the grid
    pub fn push_band(&mut self, name: impl Into<String>, data: Array2<f64>) -> Result<()> {
        let name = name.into();
        let (rows, cols) = data.dim();
        if (rows, cols) != (self.rows, self.cols) {
            return Err(Error::ShapeMismatch {
                er: self.rows,
                ec: self.cols,
                ar: rows,
                ac: cols,
            });
        }
        if self.names.iter().any(|n| *n == name) {
            return Err(Error::FeatureMismatch(format!(
                "duplicate band name '{name}'"
            )));
        }
        self.names.push(name);
        self.bands.push(data);
        Ok(())
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of bands (feature dimensionality D)
    pub fn n_bands(&self) -> usize {
        self.bands.len()
    }

    /// Band names, in band order
    pub fn band_names(&self) -> &[String] {
        &self.names
    }

    /// Look up the index of a band by name
    pub fn band_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Get a band by index
    pub fn band(&self, index: usize) -> Option<&Array2<f64>> {
        self.bands.get(index)
    }

    /// Resolve a list of band names to indices.
    ///
    /// Fails with [`Error::FeatureMismatch`] on the first absent band.
    pub fn select(&self, names: &[&str]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.band_index(name).ok_or_else(|| {
                    Error::FeatureMismatch(format!("band '{name}' not present in feature grid"))
                })
            })
            .collect()
    }

    /// Fill `out` with the feature vector at (row, col) restricted to
    /// the given band indices. Returns false when any value is
    /// non-finite (the cell carries no usable features).
    ///
    /// Band indices must come from [`FeatureGrid::select`].
    pub fn feature_vector(&self, row: usize, col: usize, indices: &[usize], out: &mut Vec<f64>) -> bool {
        out.clear();
        let mut valid = true;
        for &b in indices {
            let v = self.bands[b][(row, col)];
            if !v.is_finite() {
                valid = false;
            }
            out.push(v);
        }
        valid
    }

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }
}

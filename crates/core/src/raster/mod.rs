//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;

/// Sentinel value marking a cell that carries no class.
///
/// Kept at the top of the `u16` range so that 0 remains usable as an
/// ordinary class label.
pub const NO_CLASS: u16 = u16::MAX;

/// A raster of class labels. Masked cells hold [`NO_CLASS`].
pub type LabelRaster = Raster<u16>;

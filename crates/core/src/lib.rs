//! # TerraVote Core
//!
//! Core types for the TerraVote land-cover classification library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `FeatureGrid`: Named feature bands forming per-cell feature vectors
//! - `LabelSample` / `TrainingSet`: Validated training data
//! - `ProbabilityRaster` / `ConfidenceRaster`: Derived classification artifacts
//! - Error taxonomy and the `Algorithm` trait shared by pipeline stages

pub mod error;
pub mod feature;
pub mod probability;
pub mod raster;
pub mod training;

pub use error::{Error, Result};
pub use feature::FeatureGrid;
pub use probability::{ConfidenceRaster, ProbabilityRaster};
pub use raster::{GeoTransform, LabelRaster, NO_CLASS, Raster, RasterElement};
pub use training::{LabelSample, TrainingSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::Algorithm;
    pub use crate::error::{Error, Result};
    pub use crate::feature::FeatureGrid;
    pub use crate::probability::{ConfidenceRaster, ProbabilityRaster};
    pub use crate::raster::{GeoTransform, LabelRaster, NO_CLASS, Raster, RasterElement};
    pub use crate::training::{LabelSample, TrainingSet};
}

/// Core trait for pipeline stages.
///
/// Stages are pure functions that transform input data according to
/// parameters; no stage mutates its input.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

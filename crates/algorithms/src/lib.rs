//! # TerraVote Algorithms
//!
//! Ensemble land-cover classification over [`terravote_core`] rasters.
//!
//! The pipeline stages, each usable standalone:
//! - `forest`: bootstrapped decision forest classifier
//! - `ensemble`: R independently seeded forests classifying the grid
//! - `vote`: per-cell majority vote across label rasters
//! - `probability`: single-forest per-class probability rasters
//! - `confidence`: top-two margin confidence scoring
//! - `denoise`: neighborhood-mode smoothing and minimum-region sieve
//! - `pipeline`: the stages wired end to end
//!
//! All stages run row-parallel via rayon when the default `parallel`
//! feature is enabled, and fall back to sequential iteration otherwise.
//! Results are bit-identical either way: randomness is fanned out of
//! per-task seeds, never shared across threads.

mod maybe_rayon;

pub mod confidence;
pub mod denoise;
pub mod ensemble;
pub mod forest;
pub mod pipeline;
pub mod probability;
pub mod vote;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::confidence::{confidence_scores, mask_by_class};
    pub use crate::denoise::{Connectivity, Denoise, DenoiseParams, denoise};
    pub use crate::ensemble::{EnsembleParams, classify_grid, train_ensemble};
    pub use crate::forest::{Forest, ForestParams, fit_forest};
    pub use crate::pipeline::{
        ClassificationParams, ClassificationResult, classify_land_cover,
    };
    pub use crate::probability::{ProbabilityParams, probability_classify};
    pub use crate::vote::{MajorityVote, majority_vote};
}

//! End-to-end land-cover classification pipeline
//!
//! Wires the stages together: training-set validation, ensemble
//! training with majority-vote consensus, spatial denoising, and the
//! probability/confidence branch. Each stage is also usable on its own.

use tracing::info;

use crate::confidence::confidence_scores;
use crate::denoise::{DenoiseParams, denoise};
use crate::ensemble::{EnsembleParams, train_ensemble};
use crate::probability::{ProbabilityParams, probability_classify};
use crate::vote::majority_vote;
use terravote_core::{
    ConfidenceRaster, FeatureGrid, LabelRaster, LabelSample, ProbabilityRaster, Result,
    TrainingSet,
};

/// Parameters for the full pipeline
#[derive(Debug, Clone, Default)]
pub struct ClassificationParams {
    pub ensemble: EnsembleParams,
    pub probability: ProbabilityParams,
    pub denoise: DenoiseParams,
}

/// Everything a classification run produces
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Denoised majority-vote consensus map
    pub consensus: LabelRaster,
    /// Per-cell class probabilities from the probability branch
    pub probability: ProbabilityRaster,
    /// Confidence scores derived from the probabilities
    pub confidence: ConfidenceRaster,
}

/// Run the full classification pipeline on a feature grid.
///
/// Validates the training data once, then runs both branches over the
/// same [`TrainingSet`]: the ensemble branch (R forests, majority vote,
/// spatial denoising) yields the consensus map, and the probability
/// branch (one forest, all features per split) yields the probability
/// and confidence rasters.
///
/// All configuration and training-data errors surface before any
/// training starts.
pub fn classify_land_cover(
    grid: &FeatureGrid,
    samples: &[LabelSample],
    bands: &[&str],
    legend: &[u16],
    params: &ClassificationParams,
) -> Result<ClassificationResult> {
    let train = TrainingSet::from_samples(grid, samples, bands, legend)?;

    info!(
        n_samples = train.n_samples(),
        n_classes = train.n_classes(),
        n_bands = bands.len(),
        "starting land-cover classification"
    );

    let rasters = train_ensemble(grid, &train, &params.ensemble)?;
    let voted = majority_vote(&rasters)?;
    let consensus = denoise(&voted, &params.denoise)?;
    info!("consensus map ready");

    let probability = probability_classify(grid, &train, &params.probability)?;
    let confidence = confidence_scores(&probability)?;
    info!("probability and confidence rasters ready");

    Ok(ClassificationResult {
        consensus,
        probability,
        confidence,
    })
}

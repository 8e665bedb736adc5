//! Majority-vote aggregation of label rasters
//!
//! Reduces R label rasters to one consensus raster by per-cell mode.
//! The reduction is purely local and commutative: the result does not
//! depend on the order the R rasters arrive in.

use crate::maybe_rayon::*;
use terravote_core::{Algorithm, Error, LabelRaster, NO_CLASS, Result};

/// Reduce label rasters of identical shape to their per-cell mode.
///
/// Per cell, the class occurring most often across the inputs wins;
/// count ties resolve to the lowest class value, so shuffling the
/// inputs cannot change the output. No-data votes are skipped, and a
/// cell that is no-data in every raster stays no-data.
///
/// With a single input raster this degenerates to passthrough.
///
/// # Errors
/// [`Error::InvalidParameter`] for an empty input slice,
/// [`Error::ShapeMismatch`] when the rasters disagree in shape (grids
/// are never silently truncated or padded).
pub fn majority_vote(rasters: &[LabelRaster]) -> Result<LabelRaster> {
    let first = rasters.first().ok_or(Error::InvalidParameter {
        name: "rasters",
        value: "0".into(),
        reason: "majority vote needs at least one raster".into(),
    })?;

    let (rows, cols) = first.shape();
    for raster in &rasters[1..] {
        if raster.shape() != (rows, cols) {
            return Err(Error::ShapeMismatch {
                er: rows,
                ec: cols,
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
    }

    if rasters.len() == 1 {
        return Ok(first.clone());
    }

    let data: Vec<u16> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NO_CLASS; cols];
            let mut tally: Vec<(u16, usize)> = Vec::new();

            for (col, out) in row_data.iter_mut().enumerate() {
                tally.clear();
                for raster in rasters {
                    let value = unsafe { raster.get_unchecked(row, col) };
                    if raster.is_nodata(value) {
                        continue;
                    }
                    match tally.iter_mut().find(|(label, _)| *label == value) {
                        Some((_, count)) => *count += 1,
                        None => tally.push((value, 1)),
                    }
                }

                let mut best: Option<(u16, usize)> = None;
                for &(label, count) in &tally {
                    let better = match best {
                        None => true,
                        Some((best_label, best_count)) => {
                            count > best_count || (count == best_count && label < best_label)
                        }
                    };
                    if better {
                        best = Some((label, count));
                    }
                }

                if let Some((label, _)) = best {
                    *out = label;
                }
            }
            row_data
        })
        .collect();

    let mut output = first.with_same_meta::<u16>(rows, cols);
    output.set_nodata(Some(NO_CLASS));
    *output.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Majority-vote aggregation as a pipeline stage.
pub struct MajorityVote;

impl Algorithm for MajorityVote {
    type Input = Vec<LabelRaster>;
    type Output = LabelRaster;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "majority_vote"
    }

    fn description(&self) -> &'static str {
        "Per-cell mode across label rasters, ties to the lowest class"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        majority_vote(&input)
    }
}

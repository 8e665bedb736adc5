//! Spatial denoising of classified label rasters
//!
//! Per-run classification leaves salt-and-pepper noise: isolated cells
//! and tiny regions that disagree with their surroundings. Denoising
//! runs two passes over the consensus raster: a neighborhood-mode
//! smoothing filter, then a connected-component sieve that masks
//! regions too small to be real land-cover patches.

use std::collections::VecDeque;

use ndarray::Array2;
use tracing::debug;

use crate::maybe_rayon::*;
use terravote_core::{Algorithm, Error, LabelRaster, NO_CLASS, Result};

/// Neighborhood shape for the connected-component sieve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge-adjacent neighbors only (von Neumann)
    #[default]
    Four,
    /// Edge- and corner-adjacent neighbors (Moore)
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
            Connectivity::Eight => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        }
    }
}

/// Parameters for spatial denoising
#[derive(Debug, Clone)]
pub struct DenoiseParams {
    /// Smoothing window radius in cells (default: 2, a 5x5 window)
    pub radius: usize,
    /// Regions of this many cells or fewer are masked (default: 25)
    pub min_region_size: usize,
    /// Neighborhood used for region tracing (default: four-connected)
    pub connectivity: Connectivity,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            radius: 2,
            min_region_size: 25,
            connectivity: Connectivity::Four,
        }
    }
}

/// Replace every cell by the mode of its neighborhood.
///
/// The window is `(2*radius + 1)` cells square, truncated at the raster
/// border rather than padded, so edge cells see a smaller but unbiased
/// neighborhood. No-data cells cast no vote and stay no-data; label
/// ties resolve to the lowest class value.
pub fn majority_filter(labels: &LabelRaster, radius: usize) -> Result<LabelRaster> {
    if radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".into(),
            reason: "a zero-radius window cannot smooth anything".into(),
        });
    }

    let (rows, cols) = labels.shape();
    let r = radius as isize;

    let data: Vec<u16> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NO_CLASS; cols];
            let mut tally: Vec<(u16, usize)> = Vec::new();

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { labels.get_unchecked(row, col) };
                if labels.is_nodata(center) {
                    continue;
                }

                tally.clear();
                let row_lo = (row as isize - r).max(0) as usize;
                let row_hi = (row as isize + r).min(rows as isize - 1) as usize;
                let col_lo = (col as isize - r).max(0) as usize;
                let col_hi = (col as isize + r).min(cols as isize - 1) as usize;

                for nr in row_lo..=row_hi {
                    for nc in col_lo..=col_hi {
                        let value = unsafe { labels.get_unchecked(nr, nc) };
                        if labels.is_nodata(value) {
                            continue;
                        }
                        match tally.iter_mut().find(|(label, _)| *label == value) {
                            Some((_, count)) => *count += 1,
                            None => tally.push((value, 1)),
                        }
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

    let mut output = labels.with_same_meta::<u16>(rows, cols);
    output.set_nodata(Some(NO_CLASS));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Mask connected regions of `min_region_size` cells or fewer.
///
/// Regions are traced over same-label cells with the given
/// connectivity; members of an undersized region become no-data rather
/// than being merged into a neighbor, so downstream consumers can tell
/// "removed as noise" apart from any real class.
pub fn region_filter(
    labels: &LabelRaster,
    min_region_size: usize,
    connectivity: Connectivity,
) -> Result<LabelRaster> {
    let (rows, cols) = labels.shape();
    let offsets = connectivity.offsets();

    // 0 = unassigned; region ids start at 1.
    let mut region: Array2<u32> = Array2::zeros((rows, cols));
    let mut sizes: Vec<usize> = vec![0]; // index 0 unused
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            if region[(row, col)] != 0 {
                continue;
            }
            let label = unsafe { labels.get_unchecked(row, col) };
            if labels.is_nodata(label) {
                continue;
            }

            let id = sizes.len() as u32;
            sizes.push(0);
            region[(row, col)] = id;
            queue.push_back((row, col));

            while let Some((cr, cc)) = queue.pop_front() {
                sizes[id as usize] += 1;
                for &(dr, dc) in offsets {
                    let nr = cr as isize + dr;
                    let nc = cc as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if region[(nr, nc)] != 0 {
                        continue;
                    }
                    if unsafe { labels.get_unchecked(nr, nc) } != label {
                        continue;
                    }
                    region[(nr, nc)] = id;
                    queue.push_back((nr, nc));
                }
            }
        }
    }

    let masked_regions = sizes
        .iter()
        .skip(1)
        .filter(|&&size| size <= min_region_size)
        .count();
    debug!(
        regions = sizes.len() - 1,
        masked_regions,
        min_region_size,
        "connected-component sieve"
    );

    let mut output = labels.clone();
    output.set_nodata(Some(NO_CLASS));
    for row in 0..rows {
        for col in 0..cols {
            let id = region[(row, col)];
            if id != 0 && sizes[id as usize] <= min_region_size {
                output.data_mut()[(row, col)] = NO_CLASS;
            }
        }
    }
    Ok(output)
}

/// Smooth then sieve a label raster.
pub fn denoise(labels: &LabelRaster, params: &DenoiseParams) -> Result<LabelRaster> {
    let smoothed = majority_filter(labels, params.radius)?;
    region_filter(&smoothed, params.min_region_size, params.connectivity)
}

/// Spatial denoiser as a pipeline stage.
pub struct Denoise;

impl Algorithm for Denoise {
    type Input = LabelRaster;
    type Output = LabelRaster;
    type Params = DenoiseParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "denoise"
    }

    fn description(&self) -> &'static str {
        "Neighborhood-mode smoothing followed by a minimum-region sieve"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        denoise(&input, &params)
    }
}

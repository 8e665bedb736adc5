//! Confidence scoring from per-cell class probabilities
//!
//! Derives, per cell, the two most probable classes and a margin
//! confidence score from a [`ProbabilityRaster`]. The score is
//! `1 - top2/top1`: 0 when the two leading classes are indistinguishable,
//! approaching 1 when the winner stands alone.

use crate::maybe_rayon::*;
use terravote_core::{
    ConfidenceRaster, Error, LabelRaster, ProbabilityRaster, Raster, Result,
};

/// Score every cell of a probability raster.
///
/// Produces five aligned bands: top-1 class, top-2 class, their
/// probabilities, and the margin confidence. Class rank ties resolve to
/// the lowest legend value. Cells that are masked in the input, or
/// whose top-1 probability is zero (the margin is undefined there), are
/// NaN in all five bands rather than poisoning the whole raster.
pub fn confidence_scores(prob: &ProbabilityRaster) -> Result<ConfidenceRaster> {
    let (rows, cols) = prob.shape();
    let n_classes = prob.n_classes();
    let classes = prob.classes();

    // Five values per cell, flattened per row for the parallel collect.
    let bands: Vec<[f64; 5]> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![[f64::NAN; 5]; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let p = prob.data().slice(ndarray::s![row, col, ..]);
                if p[0].is_nan() {
                    continue;
                }

                let mut top1 = 0usize;
                for k in 1..n_classes {
                    if p[k] > p[top1] {
                        top1 = k;
                    }
                }
                if p[top1] == 0.0 {
                    continue;
                }

                let mut top2 = if top1 == 0 { 1 } else { 0 };
                for k in 0..n_classes {
                    if k != top1 && p[k] > p[top2] {
                        top2 = k;
                    }
                }

                *out = [
                    classes[top1] as f64,
                    classes[top2] as f64,
                    p[top1],
                    p[top2],
                    1.0 - p[top2] / p[top1],
                ];
            }
            row_data
        })
        .collect();

    let band = |k: usize| -> Result<Raster<f64>> {
        let values: Vec<f64> = bands.iter().map(|cell| cell[k]).collect();
        let mut raster = Raster::from_vec(values, rows, cols)?;
        raster.set_transform(*prob.transform());
        Ok(raster)
    };

    Ok(ConfidenceRaster {
        top1_class: band(0)?,
        top2_class: band(1)?,
        top1_prob: band(2)?,
        top2_prob: band(3)?,
        confidence: band(4)?,
    })
}

/// Keep confidence scores only where the label raster holds `class`.
///
/// Everything else becomes NaN. The label raster usually comes from the
/// majority vote, so this isolates the score surface of one land-cover
/// class for inspection.
pub fn mask_by_class(
    conf: &ConfidenceRaster,
    labels: &LabelRaster,
    class: u16,
) -> Result<Raster<f64>> {
    let (rows, cols) = conf.shape();
    if labels.shape() != (rows, cols) {
        return Err(Error::ShapeMismatch {
            er: rows,
            ec: cols,
            ar: labels.rows(),
            ac: labels.cols(),
        });
    }

    let mut masked = conf.confidence.like(f64::NAN);
    for row in 0..rows {
        for col in 0..cols {
            let label = unsafe { labels.get_unchecked(row, col) };
            if label == class && !labels.is_nodata(label) {
                let value = unsafe { conf.confidence.get_unchecked(row, col) };
                masked.data_mut()[(row, col)] = value;
            }
        }
    }
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;
    use terravote_core::{GeoTransform, NO_CLASS};

    fn raster_from(cells: Vec<Vec<f64>>, classes: Vec<u16>) -> ProbabilityRaster {
        let cols = cells.len();
        let c = classes.len();
        let mut data = Array3::zeros((1, cols, c));
        for (col, p) in cells.iter().enumerate() {
            for (k, &v) in p.iter().enumerate() {
                data[(0, col, k)] = v;
            }
        }
        ProbabilityRaster::new(data, classes, GeoTransform::default()).unwrap()
    }

    #[test]
    fn test_margin_confidence() {
        let prob = raster_from(vec![vec![0.6, 0.3, 0.1]], vec![1, 2, 3]);
        let conf = confidence_scores(&prob).unwrap();

        assert_eq!(conf.top1_class.get(0, 0).unwrap(), 1.0);
        assert_eq!(conf.top2_class.get(0, 0).unwrap(), 2.0);
        assert_relative_eq!(conf.top1_prob.get(0, 0).unwrap(), 0.6);
        assert_relative_eq!(conf.top2_prob.get(0, 0).unwrap(), 0.3);
        assert_relative_eq!(conf.confidence.get(0, 0).unwrap(), 0.5);
    }

    #[test]
    fn test_confidence_bounds() {
        let prob = raster_from(
            vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.8, 0.2]],
            vec![1, 2],
        );
        let conf = confidence_scores(&prob).unwrap();
        for col in 0..3 {
            let c = conf.confidence.get(0, col).unwrap();
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_tied_probabilities_give_zero_confidence_lowest_class() {
        let prob = raster_from(vec![vec![0.5, 0.5]], vec![4, 9]);
        let conf = confidence_scores(&prob).unwrap();
        assert_eq!(conf.top1_class.get(0, 0).unwrap(), 4.0);
        assert_eq!(conf.top2_class.get(0, 0).unwrap(), 9.0);
        assert_relative_eq!(conf.confidence.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_top1_masks_cell() {
        let prob = raster_from(vec![vec![0.0, 0.0], vec![0.7, 0.3]], vec![1, 2]);
        let conf = confidence_scores(&prob).unwrap();
        assert!(conf.is_masked(0, 0).unwrap());
        assert!(!conf.is_masked(0, 1).unwrap());
    }

    #[test]
    fn test_masked_input_stays_masked() {
        let prob = raster_from(vec![vec![f64::NAN, f64::NAN]], vec![1, 2]);
        let conf = confidence_scores(&prob).unwrap();
        assert!(conf.is_masked(0, 0).unwrap());
        assert!(conf.top1_class.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_mask_by_class() {
        let prob = raster_from(vec![vec![0.9, 0.1], vec![0.2, 0.8]], vec![1, 2]);
        let conf = confidence_scores(&prob).unwrap();

        let mut labels = LabelRaster::from_vec(vec![1, 2], 1, 2).unwrap();
        labels.set_nodata(Some(NO_CLASS));

        let only_class_1 = mask_by_class(&conf, &labels, 1).unwrap();
        assert!(!only_class_1.get(0, 0).unwrap().is_nan());
        assert!(only_class_1.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_mask_by_class_shape_mismatch() {
        let prob = raster_from(vec![vec![0.9, 0.1]], vec![1, 2]);
        let conf = confidence_scores(&prob).unwrap();
        let labels = LabelRaster::from_vec(vec![1, 2, 1, 2], 2, 2).unwrap();
        assert!(matches!(
            mask_by_class(&conf, &labels, 1).unwrap_err(),
            Error::ShapeMismatch { .. }
        ));
    }
}

use crate::error::StimulusError;
use crate::positive;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Annulus of alternating light and dark sectors around the grating.
#[derive(Debug, Clone, PartialEq)]
pub struct Rim {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub n_bars: usize,
}

impl Rim {
    pub fn new(inner_radius: f64, outer_radius: f64, n_bars: usize) -> Result<Self, StimulusError> {
        positive("rim outer radius", outer_radius)?;
        positive("rim sector count", n_bars as f64)?;
        if !(0.0..outer_radius).contains(&inner_radius) {
            return Err(StimulusError::RimRadii {
                inner: inner_radius,
                outer: outer_radius,
            });
        }
        Ok(Self {
            inner_radius,
            outer_radius,
            n_bars,
        })
    }

    /// Side of the square image in pixels
    pub fn side_len(&self) -> usize {
        (2.0 * self.outer_radius + 1.0) as usize
    }

    /// Sector pattern and annulus mask, both `side_len x side_len`.
    pub fn arrays(&self) -> (Array2<f64>, Array2<f64>) {
        let n = self.side_len();
        let coords = Array1::linspace(-self.outer_radius, self.outer_radius, n);
        let half_bars = self.n_bars as f64 / 2.0;
        let (inner_sq, outer_sq) = (self.inner_radius.powi(2), self.outer_radius.powi(2));

        let rim = Array2::from_shape_fn((n, n), |(i, j)| {
            let (x, y) = (coords[j], coords[i]);
            let sector = (x.atan2(y) / PI * half_bars).round_ties_even();
            sector.rem_euclid(2.0) * 2.0 - 1.0
        });
        let mask = Array2::from_shape_fn((n, n), |(i, j)| {
            let rad = coords[j].powi(2) + coords[i].powi(2);
            if rad > inner_sq && rad < outer_sq { 1.0 } else { -1.0 }
        });
        (rim, mask)
    }
}

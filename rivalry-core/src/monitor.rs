use serde::{Deserialize, Serialize};

/// Screen geometry used to convert visual angle to pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub width_px: u32,
    pub width_cm: f64,
    pub distance_cm: f64,
}

impl Monitor {
    pub fn new(width_px: u32, width_cm: f64, distance_cm: f64) -> Self {
        Self {
            width_px,
            width_cm,
            distance_cm,
        }
    }

    /// Horizontal field of view of the whole screen, in degrees
    pub fn field_of_view_deg(&self) -> f64 {
        2.0 * (self.width_cm / (2.0 * self.distance_cm)).atan().to_degrees()
    }

    pub fn pixels_per_degree(&self) -> f64 {
        self.width_px as f64 / self.field_of_view_deg()
    }

    pub fn deg2pix(&self, deg: f64) -> f64 {
        deg * self.pixels_per_degree()
    }

    pub fn pix2deg(&self, pix: f64) -> f64 {
        pix / self.pixels_per_degree()
    }
}

//! Stimulus arrays for the anaglyph rivalry display.
//!
//! Every generator is computed once at setup time. Arrays use signed
//! intensities in `[-1, 1]`: `-1` is black (or fully transparent for masks)
//! and `+1` is white (or opaque).

pub mod anaglyph;
pub mod checkerboard;
pub mod cross;
pub mod error;
pub mod grating;
pub mod mask;
pub mod rim;
pub mod set;

pub use anaglyph::{AnaglyphParams, AnaglyphStimuli, GratingTexture};
pub use checkerboard::{CheckerBoard, checker_pattern, upscale, upscale_factor};
pub use cross::{CheckerBoardCross, Cross, Segment};
pub use error::StimulusError;
pub use grating::{ColorChannel, anaglyph_texture, make_grating};
pub use mask::{circle_mask, radial_matrix, raised_cosine_mask};
pub use rim::Rim;
pub use set::{FixationPoint, StimulusSet, StimulusSetParams};

pub(crate) fn positive(what: &'static str, value: f64) -> Result<f64, StimulusError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(StimulusError::NonPositive { what, value })
    }
}

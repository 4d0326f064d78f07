use crate::cross::{CheckerBoardCross, Cross};
use crate::error::StimulusError;
use crate::positive;
use crate::rim::Rim;

/// Extent of a "+" glyph relative to its text height
const PLUS_EXTENT: f64 = 0.6;

/// Checkerboard cross size relative to the stimulus
const CHECKER_CROSS_SCALE: f64 = 1.2;

/// Central "+" drawn on top of the gratings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixationPoint {
    pub size: f64,
}

impl FixationPoint {
    /// Line cross used when no font is available to draw the glyph
    pub fn fallback_cross(&self) -> Cross {
        Cross::new(self.size * PLUS_EXTENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusSetParams {
    pub size_px: f64,
    pub rim_ratio: f64,
    pub rim_n_parts: usize,
    pub rim_contrast: f64,
    pub fixation_proportion: f64,
}

/// Rim, fixation and checkerboard cross sharing one centre.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusSet {
    pub size_px: f64,
    pub rim: Rim,
    pub rim_contrast: f64,
    pub fixation: FixationPoint,
    pub checker_cross: CheckerBoardCross,
}

impl StimulusSet {
    pub fn new(params: &StimulusSetParams) -> Result<Self, StimulusError> {
        let size_px = positive("stimulus size", params.size_px)?;
        positive("rim ratio", params.rim_ratio)?;
        positive("fixation proportion", params.fixation_proportion)?;

        let inner = size_px / 2.0;
        let rim = Rim::new(inner, inner * params.rim_ratio, params.rim_n_parts)?;

        Ok(Self {
            size_px,
            rim,
            rim_contrast: params.rim_contrast,
            fixation: FixationPoint {
                size: params.fixation_proportion * size_px,
            },
            checker_cross: CheckerBoardCross::with_size(CHECKER_CROSS_SCALE * size_px)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StimulusSetParams {
        StimulusSetParams {
            size_px: 200.0,
            rim_ratio: 1.25,
            rim_n_parts: 24,
            rim_contrast: 0.5,
            fixation_proportion: 0.05,
        }
    }

    #[test]
    fn rim_surrounds_the_stimulus() {
        let set = StimulusSet::new(&params()).unwrap();
        assert_eq!(set.rim.inner_radius, 100.0);
        assert_eq!(set.rim.outer_radius, 125.0);
        assert_eq!(set.rim.n_bars, 24);
        assert!((set.fixation.size - 10.0).abs() < 1e-9);
        assert!((set.checker_cross.size - 240.0).abs() < 1e-9);
    }

    #[test]
    fn rim_ratio_below_one_is_rejected() {
        let p = StimulusSetParams {
            rim_ratio: 0.8,
            ..params()
        };
        assert!(matches!(
            StimulusSet::new(&p),
            Err(StimulusError::RimRadii { .. })
        ));
    }
}

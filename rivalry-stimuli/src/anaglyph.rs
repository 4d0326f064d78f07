use crate::error::StimulusError;
use crate::grating::{ColorChannel, anaglyph_texture, make_grating};
use crate::mask::raised_cosine_mask;
use crate::positive;
use crate::set::{StimulusSet, StimulusSetParams};
use ndarray::{Array2, Array3};

/// Everything needed to build the rivalry display, already in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnaglyphParams {
    pub size_px: f64,
    /// Grating periods across the stimulus
    pub n_cycles: f64,
    pub grating_resolution: usize,
    pub mask_fringe_width: f64,
    pub rim_ratio: f64,
    pub rim_n_parts: usize,
    pub rim_contrast: f64,
    pub fixation_proportion: f64,
}

/// A colour grating texture, its mask, and the orientation it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct GratingTexture {
    pub texture: Array3<f64>,
    pub mask: Array2<f64>,
    pub size_px: f64,
    pub base_ori: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnaglyphStimuli {
    pub red: GratingTexture,
    pub green: GratingTexture,
    pub set: StimulusSet,
}

impl AnaglyphStimuli {
    pub const RED_BASE_ORI: f64 = 90.0;
    pub const GREEN_BASE_ORI: f64 = 0.0;

    pub fn new(params: &AnaglyphParams) -> Result<Self, StimulusError> {
        let size_px = positive("stimulus size", params.size_px)?;
        positive("grating cycles", params.n_cycles)?;
        let res = params.grating_resolution;
        positive("grating resolution", res as f64)?;

        let grating = make_grating(res, params.n_cycles, 0.0, 0.0, 1.0).mapv(|v| -v);
        let mask = raised_cosine_mask(res, params.mask_fringe_width);

        let red = GratingTexture {
            texture: anaglyph_texture(&grating, ColorChannel::Red),
            mask: mask.clone(),
            size_px,
            base_ori: Self::RED_BASE_ORI,
        };
        let green = GratingTexture {
            texture: anaglyph_texture(&grating, ColorChannel::Green),
            mask,
            size_px,
            base_ori: Self::GREEN_BASE_ORI,
        };

        let set = StimulusSet::new(&StimulusSetParams {
            size_px,
            rim_ratio: params.rim_ratio,
            rim_n_parts: params.rim_n_parts,
            rim_contrast: params.rim_contrast,
            fixation_proportion: params.fixation_proportion,
        })?;

        Ok(Self { red, green, set })
    }
}

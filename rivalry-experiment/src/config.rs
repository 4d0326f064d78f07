use crate::error::{ExperimentError, Result};
use rivalry_core::Monitor;
use rivalry_stimuli::{AnaglyphParams, AnaglyphStimuli};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Refresh rate assumed when neither the config nor the display reports one
pub const FALLBACK_FRAMERATE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub session: SessionSettings,
    pub screen: ScreenSettings,
    pub stimuli: StimulusSettings,
    pub responses: ResponseSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub n_runs: usize,
    pub run_duration_s: f64,
    pub output_dir: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            n_runs: 5,
            run_duration_s: 10.0,
            output_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    /// Overrides the refresh rate reported by the display
    pub framerate: Option<f64>,
    pub physical_width_cm: f64,
    pub distance_cm: f64,
    pub fullscreen: bool,
    pub background: [u8; 3],
    pub font_path: Option<PathBuf>,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            framerate: None,
            physical_width_cm: 53.0,
            distance_cm: 60.0,
            fullscreen: true,
            background: [0, 0, 0],
            font_path: None,
        }
    }
}

/// Sizes are in degrees of visual angle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSettings {
    pub size: f64,
    pub cycles_per_degree: f64,
    pub rotations_per_second: f64,
    pub rim_ratio: f64,
    pub rim_n_parts: usize,
    pub rim_contrast: f64,
    pub fixation_proportion: f64,
    pub grating_resolution: usize,
    pub mask_fringe_width: f64,
    pub show_checker_cross: bool,
}

impl Default for StimulusSettings {
    fn default() -> Self {
        Self {
            size: 3.0,
            cycles_per_degree: 2.0,
            rotations_per_second: 0.1,
            rim_ratio: 1.3,
            rim_n_parts: 24,
            rim_contrast: 1.0,
            fixation_proportion: 0.05,
            grating_resolution: 256,
            mask_fringe_width: 0.1,
            show_checker_cross: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSettings {
    pub continue_key: String,
    pub abort_keys: Vec<String>,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            continue_key: "space".into(),
            abort_keys: vec!["escape".into(), "esc".into(), "q".into()],
        }
    }
}

impl ResponseSettings {
    pub fn is_abort(&self, key: &str) -> bool {
        self.abort_keys.iter().any(|k| k == key)
    }

    pub fn is_continue(&self, key: &str) -> bool {
        self.continue_key == key
    }
}

impl ExperimentConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ExperimentError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ExperimentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("session.run_duration_s", self.session.run_duration_s),
            ("screen.physical_width_cm", self.screen.physical_width_cm),
            ("screen.distance_cm", self.screen.distance_cm),
            ("stimuli.size", self.stimuli.size),
            ("stimuli.cycles_per_degree", self.stimuli.cycles_per_degree),
            ("stimuli.rim_ratio", self.stimuli.rim_ratio),
            ("stimuli.fixation_proportion", self.stimuli.fixation_proportion),
            ("stimuli.grating_resolution", self.stimuli.grating_resolution as f64),
            ("stimuli.rim_n_parts", self.stimuli.rim_n_parts as f64),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ExperimentError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let finite = [
            ("stimuli.rotations_per_second", self.stimuli.rotations_per_second),
            ("stimuli.rim_contrast", self.stimuli.rim_contrast),
            ("stimuli.mask_fringe_width", self.stimuli.mask_fringe_width),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ExperimentError::InvalidConfig(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        if let Some(rate) = self.screen.framerate {
            if !(rate > 0.0 && rate.is_finite()) {
                return Err(ExperimentError::InvalidConfig(format!(
                    "screen.framerate must be positive, got {rate}"
                )));
            }
        }
        if self.stimuli.rim_ratio <= 1.0 {
            return Err(ExperimentError::InvalidConfig(format!(
                "stimuli.rim_ratio must exceed 1 for the rim to surround the gratings, got {}",
                self.stimuli.rim_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.stimuli.mask_fringe_width) {
            return Err(ExperimentError::InvalidConfig(format!(
                "stimuli.mask_fringe_width must lie in [0, 1], got {}",
                self.stimuli.mask_fringe_width
            )));
        }
        if self.is_abort_continue_overlap() {
            return Err(ExperimentError::InvalidConfig(format!(
                "continue key {:?} is also an abort key",
                self.responses.continue_key
            )));
        }
        Ok(())
    }

    fn is_abort_continue_overlap(&self) -> bool {
        self.responses.is_abort(&self.responses.continue_key)
    }

    pub fn monitor(&self, width_px: u32) -> Monitor {
        Monitor::new(width_px, self.screen.physical_width_cm, self.screen.distance_cm)
    }

    /// Configured framerate, else the display's, else 60 Hz
    pub fn framerate(&self, display_refresh: Option<f64>) -> f64 {
        self.screen
            .framerate
            .or(display_refresh.filter(|r| *r > 0.0))
            .unwrap_or(FALLBACK_FRAMERATE)
    }

    /// Degrees the gratings turn per presented frame
    pub fn rotate_per_frame(&self, framerate: f64) -> f64 {
        360.0 / framerate * self.stimuli.rotations_per_second
    }

    pub fn anaglyph_params(&self, monitor: &Monitor) -> AnaglyphParams {
        let size_px = monitor.deg2pix(self.stimuli.size);
        let pix_per_cycle = monitor.deg2pix(1.0 / self.stimuli.cycles_per_degree);
        AnaglyphParams {
            size_px,
            n_cycles: size_px / pix_per_cycle,
            grating_resolution: self.stimuli.grating_resolution,
            mask_fringe_width: self.stimuli.mask_fringe_width,
            rim_ratio: self.stimuli.rim_ratio,
            rim_n_parts: self.stimuli.rim_n_parts,
            rim_contrast: self.stimuli.rim_contrast,
            fixation_proportion: self.stimuli.fixation_proportion,
        }
    }

    pub fn build_stimuli(&self, monitor: &Monitor) -> Result<AnaglyphStimuli> {
        Ok(AnaglyphStimuli::new(&self.anaglyph_params(monitor))?)
    }
}

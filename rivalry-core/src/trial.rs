use serde::{Deserialize, Serialize};

/// Identifier used in logged events for a stimulus run
pub fn trial_id(run: usize) -> String {
    format!("trial{run}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Elapsed,
    Aborted,
}

/// Per-run parameters, saved next to the event array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run: usize,
    pub trial_id: String,
    pub duration_s: f64,
    pub rotate_per_frame: f64,
    pub frames_presented: u64,
    pub stop_reason: StopReason,
    pub mean_frame_ms: f64,
    pub frame_jitter_ms: f64,
}

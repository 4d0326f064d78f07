use serde::{Deserialize, Serialize};
use std::fmt;

/// Code logged when a participant cancels a run
pub const ABORT_CODE: i32 = -99;

/// One entry of a run's event list.
///
/// Messages serialize as plain JSON strings and coded events as a two element
/// array, so the event array reads the same way it prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoggedEvent {
    Message(String),
    Code(i32, f64),
}

impl LoggedEvent {
    pub fn trial_started(trial_id: &str, time_s: f64) -> Self {
        Self::Message(format!("trial {trial_id} started at {time_s:.4}"))
    }

    pub fn phase_started(trial_id: &str, phase: usize, time_s: f64) -> Self {
        Self::Message(format!(
            "trial {trial_id} phase {phase} started at {time_s:.4}"
        ))
    }

    pub fn key(trial_id: &str, key: &str, onset_s: f64) -> Self {
        Self::Message(format!("trial {trial_id} event {key} at {onset_s:.4}"))
    }

    pub fn abort(onset_s: f64) -> Self {
        Self::Code(ABORT_CODE, onset_s)
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Code(ABORT_CODE, _))
    }
}

impl fmt::Display for LoggedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.write_str(msg),
            Self::Code(code, t) => write!(f, "[{code}, {t}]"),
        }
    }
}

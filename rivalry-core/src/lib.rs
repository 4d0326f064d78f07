pub mod event;
pub mod monitor;
pub mod phase;
pub mod trial;

pub use event::{ABORT_CODE, LoggedEvent};
pub use monitor::Monitor;
pub use phase::{Phase, SessionPhase};
pub use trial::{RunRecord, StopReason, TrialState, trial_id};

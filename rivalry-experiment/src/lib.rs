pub mod config;
pub mod error;
pub mod output;
pub mod session;
pub mod trial;

pub use config::{ExperimentConfig, ResponseSettings, ScreenSettings, SessionSettings, StimulusSettings};
pub use error::{ExperimentError, Result};
pub use output::SessionOutput;
pub use session::{Participant, RivalrySession, SessionEvent};
pub use trial::Trial;

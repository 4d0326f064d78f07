use rivalry_core::{LoggedEvent, TrialState, trial_id};

/// One stimulus run: rotating gratings shown for a fixed duration
#[derive(Debug, Clone)]
pub struct Trial {
    pub id: String,
    pub run: usize,
    pub duration_s: f64,
    pub start_ns: u64,
    pub frames: u64,
    pub events: Vec<LoggedEvent>,
    pub state: TrialState,
}

impl Trial {
    pub fn new(run: usize, duration_s: f64, start_ns: u64) -> Self {
        Self {
            id: trial_id(run),
            run,
            duration_s,
            start_ns,
            frames: 0,
            events: Vec::new(),
            state: TrialState::Running,
        }
    }

    /// Seconds since the run started
    pub fn onset_s(&self, now_ns: u64) -> f64 {
        now_ns.saturating_sub(self.start_ns) as f64 / 1e9
    }

    pub fn is_elapsed(&self, now_ns: u64) -> bool {
        self.onset_s(now_ns) >= self.duration_s
    }

    pub fn is_running(&self) -> bool {
        self.state == TrialState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onset_is_relative_to_run_start() {
        let trial = Trial::new(2, 10.0, 5_000_000_000);
        assert_eq!(trial.id, "trial2");
        assert_eq!(trial.onset_s(6_500_000_000), 1.5);
        assert_eq!(trial.onset_s(0), 0.0);
        assert!(!trial.is_elapsed(14_999_999_999));
        assert!(trial.is_elapsed(15_000_000_000));
    }
}

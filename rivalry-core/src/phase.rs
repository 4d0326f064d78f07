/// Defines session phases and how the renderer and input handling treat them
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    /// Phase is a static screen waiting for the continue key.
    fn awaits_continue(&self) -> bool;
    fn presents_stimulus(&self) -> bool;
    fn is_finished(&self) -> bool;

    /// Run shown (stimulus) or just completed (pause).
    fn run(&self) -> Option<usize> {
        None
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Intro,
    Stimulus {
        run: usize,
    },
    Pause {
        completed: usize,
    },
    Finished,
}

impl SessionPhase {
    /// Linear sequence: intro, then `n_runs` stimulus runs separated by pauses.
    pub fn next(&self, n_runs: usize) -> Option<Self> {
        use SessionPhase::*;
        Some(match *self {
            Intro if n_runs == 0 => Finished,
            Intro => Stimulus { run: 1 },
            Stimulus { run } if run < n_runs => Pause { completed: run },
            Stimulus { .. } => Finished,
            Pause { completed } => Stimulus {
                run: completed + 1,
            },
            Finished => return None,
        })
    }
}

impl Phase for SessionPhase {
    fn awaits_continue(&self) -> bool {
        matches!(self, Self::Intro | Self::Pause { .. })
    }

    fn presents_stimulus(&self) -> bool {
        matches!(self, Self::Stimulus { .. })
    }

    fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    fn run(&self) -> Option<usize> {
        match *self {
            Self::Stimulus { run } => Some(run),
            Self::Pause { completed } => Some(completed),
            _ => None,
        }
    }
}

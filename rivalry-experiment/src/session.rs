use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::output::SessionOutput;
use crate::trial::Trial;
use rivalry_core::{LoggedEvent, Phase, RunRecord, SessionPhase, StopReason, TrialState};
use rivalry_timing::Timer;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Named key press (`space`, `escape`, `b`, ...)
    KeyPressed(String),
    RunElapsed,
    /// Window closed by the participant or the operating system
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub subject: u32,
    pub session: u32,
}

/// Intro screen, stimulus runs separated by pauses, then stop.
pub struct RivalrySession<T>
where
    T: Timer,
{
    pub phase: SessionPhase,
    pub timer: T,
    pub config: ExperimentConfig,
    pub participant: Participant,
    pub current: Option<Trial>,
    pub event_array: Vec<Vec<LoggedEvent>>,
    pub parameter_array: Vec<RunRecord>,
    pub rotate_per_frame: f64,
    /// Accumulated grating rotation in degrees, kept across runs
    pub rotation: f64,
    pub session_start: u64,
    pub saved_to: Option<PathBuf>,
}

impl<T> RivalrySession<T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new(config: ExperimentConfig, participant: Participant, timer: T, framerate: f64) -> Self {
        let rotate_per_frame = config.rotate_per_frame(framerate);
        let session_start = timer.now();
        info!(
            subject = participant.subject,
            session = participant.session,
            runs = config.session.n_runs,
            framerate,
            rotate_per_frame,
            "session created"
        );
        Self {
            phase: SessionPhase::default(),
            timer,
            config,
            participant,
            current: None,
            event_array: Vec::new(),
            parameter_array: Vec::new(),
            rotate_per_frame,
            rotation: 0.0,
            session_start,
            saved_to: None,
        }
    }

    /// Time-driven events; call once per frame.
    pub fn update(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(trial) = &self.current {
            if trial.is_running() && trial.is_elapsed(self.timer.now()) {
                events.push(SessionEvent::RunElapsed);
            }
        }
        events
    }

    /// Applies one event. Returns whether the event changed anything.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<bool> {
        match (self.phase, event) {
            // a failed save is retried when the window closes
            (SessionPhase::Finished, SessionEvent::Closed) if self.saved_to.is_none() => {
                self.finish()?;
                Ok(true)
            }
            (SessionPhase::Finished, _) => Ok(false),

            (phase, SessionEvent::KeyPressed(key)) if phase.awaits_continue() => {
                if self.config.responses.is_abort(&key) {
                    info!(%key, ?phase, "session cancelled by user");
                    self.finish()?;
                    Ok(true)
                } else if self.config.responses.is_continue(&key) {
                    self.advance_phase()?;
                    Ok(true)
                } else {
                    debug!(%key, ?phase, "key ignored");
                    Ok(false)
                }
            }

            (SessionPhase::Stimulus { .. }, SessionEvent::KeyPressed(key)) => {
                if self.record_key(&key) {
                    warn!(%key, "run cancelled by user");
                    self.complete_run(StopReason::Aborted);
                    self.finish()?;
                }
                Ok(true)
            }

            (SessionPhase::Stimulus { .. }, SessionEvent::RunElapsed) => {
                self.complete_run(StopReason::Elapsed);
                self.advance_phase()?;
                Ok(true)
            }

            (phase, SessionEvent::Closed) => {
                if phase.presents_stimulus() {
                    self.log_abort();
                    self.complete_run(StopReason::Aborted);
                }
                self.finish()?;
                Ok(true)
            }

            _ => Ok(false),
        }
    }

    /// Called after every presented frame; turns the gratings.
    pub fn advance_frame(&mut self) {
        if let Some(trial) = self.current.as_mut().filter(|t| t.is_running()) {
            trial.frames += 1;
            self.rotation = (self.rotation + self.rotate_per_frame).rem_euclid(360.0);
        }
    }

    fn advance_phase(&mut self) -> Result<()> {
        match self.phase.next(self.config.session.n_runs) {
            Some(SessionPhase::Stimulus { run }) => {
                self.phase = SessionPhase::Stimulus { run };
                self.start_run(run);
            }
            Some(SessionPhase::Finished) | None => self.finish()?,
            Some(next) => {
                info!(phase = ?next, "waiting for participant");
                self.phase = next;
            }
        }
        Ok(())
    }

    fn start_run(&mut self, run: usize) {
        let now = self.timer.now();
        let session_time = self.session_seconds(now);
        let mut trial = Trial::new(run, self.config.session.run_duration_s, now);
        trial
            .events
            .push(LoggedEvent::trial_started(&trial.id, session_time));
        trial
            .events
            .push(LoggedEvent::phase_started(&trial.id, 0, session_time));
        self.timer.reset_frames();
        info!(
            run,
            of = self.config.session.n_runs,
            duration_s = trial.duration_s,
            "run started"
        );
        self.current = Some(trial);
    }

    /// Logs a key press during a run. Returns true when the key cancels the run.
    fn record_key(&mut self, key: &str) -> bool {
        let aborts = self.config.responses.is_abort(key);
        let now = self.timer.now();
        let Some(trial) = self.current.as_mut().filter(|t| t.is_running()) else {
            return false;
        };
        let onset = trial.onset_s(now);
        if aborts {
            trial.events.push(LoggedEvent::abort(onset));
        }
        trial.events.push(LoggedEvent::key(&trial.id, key, onset));
        debug!(run = trial.run, %key, onset, "key press");
        aborts
    }

    fn log_abort(&mut self) {
        let now = self.timer.now();
        if let Some(trial) = self.current.as_mut().filter(|t| t.is_running()) {
            let onset = trial.onset_s(now);
            trial.events.push(LoggedEvent::abort(onset));
        }
    }

    /// Moves the current run's events into the event array.
    fn complete_run(&mut self, reason: StopReason) {
        let Some(mut trial) = self.current.take() else {
            return;
        };
        trial.state = TrialState::Stopped(reason);

        let stats = self.timer.calibration_stats();
        info!(
            run = trial.run,
            ?reason,
            frames = trial.frames,
            key_presses = trial.events.len(),
            mean_frame_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            "run finished"
        );

        self.parameter_array.push(RunRecord {
            run: trial.run,
            trial_id: trial.id.clone(),
            duration_s: trial.duration_s,
            rotate_per_frame: self.rotate_per_frame,
            frames_presented: trial.frames,
            stop_reason: reason,
            mean_frame_ms: stats.average_frame_time_ns / 1e6,
            frame_jitter_ms: stats.jitter_ns / 1e6,
        });
        self.event_array.push(trial.events);
    }

    /// Stops the session and writes its output once.
    ///
    /// When the write fails the session still stops, but stays unsaved: a
    /// later [`SessionEvent::Closed`] or [`RivalrySession::save_to`] can
    /// still write the recorded runs.
    fn finish(&mut self) -> Result<()> {
        self.phase = SessionPhase::Finished;
        if self.saved_to.is_some() {
            return Ok(());
        }
        let dir = self.config.session.output_dir.clone();
        if let Err(e) = self.save_to(&dir) {
            warn!(runs = self.event_array.len(), "session output not written: {e}");
            return Err(e);
        }
        Ok(())
    }

    /// Writes the session output into `dir` and remembers where it went.
    pub fn save_to(&mut self, dir: &Path) -> Result<PathBuf> {
        let path = self.output().save(dir)?;
        info!(path = %path.display(), runs = self.event_array.len(), "session output written");
        self.saved_to = Some(path.clone());
        Ok(path)
    }

    pub fn is_saved(&self) -> bool {
        self.saved_to.is_some()
    }

    fn session_seconds(&self, now: u64) -> f64 {
        now.saturating_sub(self.session_start) as f64 / 1e9
    }

    pub fn output(&self) -> SessionOutput {
        SessionOutput {
            subject: self.participant.subject,
            session: self.participant.session,
            event_array: self.event_array.clone(),
            parameter_array: self.parameter_array.clone(),
        }
    }

    pub fn current_phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    /// Current grating rotation in degrees
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// (runs completed, runs planned)
    pub fn run_progress(&self) -> (usize, usize) {
        (self.event_array.len(), self.config.session.n_runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalry_timing::ManualTimer;
    use std::time::Duration;

    fn session(dir: &std::path::Path, n_runs: usize) -> (RivalrySession<ManualTimer>, ManualTimer) {
        let mut config = ExperimentConfig::default();
        config.session.n_runs = n_runs;
        config.session.run_duration_s = 2.0;
        config.session.output_dir = dir.to_path_buf();
        config.stimuli.rotations_per_second = 0.5;
        let timer = ManualTimer::new();
        let clock = timer.clone();
        let participant = Participant {
            subject: 4,
            session: 1,
        };
        (RivalrySession::new(config, participant, timer, 60.0), clock)
    }

    fn key(k: &str) -> SessionEvent {
        SessionEvent::KeyPressed(k.to_string())
    }

    #[test]
    fn intro_waits_for_continue_key() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = session(dir.path(), 2);
        assert!(!s.handle_event(key("b")).unwrap());
        assert_eq!(s.phase, SessionPhase::Intro);
        assert!(s.handle_event(key("space")).unwrap());
        assert_eq!(s.phase, SessionPhase::Stimulus { run: 1 });
        assert_eq!(s.current.as_ref().map(|t| t.id.as_str()), Some("trial1"));
    }

    #[test]
    fn keys_are_logged_relative_to_run_start() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, clock) = session(dir.path(), 1);
        clock.advance(Duration::from_secs(3));
        s.handle_event(key("space")).unwrap();
        clock.advance(Duration::from_millis(1250));
        s.handle_event(key("b")).unwrap();

        let events = &s.current.as_ref().unwrap().events;
        assert_eq!(
            events[0],
            LoggedEvent::Message("trial trial1 started at 3.0000".into())
        );
        assert_eq!(
            events.last().unwrap(),
            &LoggedEvent::Message("trial trial1 event b at 1.2500".into())
        );
    }

    #[test]
    fn elapsed_run_moves_to_pause() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, clock) = session(dir.path(), 2);
        s.handle_event(key("space")).unwrap();
        assert!(s.update().is_empty());
        clock.advance(Duration::from_secs(2));
        let events = s.update();
        assert_eq!(events, vec![SessionEvent::RunElapsed]);
        for e in events {
            s.handle_event(e).unwrap();
        }
        assert_eq!(s.phase, SessionPhase::Pause { completed: 1 });
        assert_eq!(s.run_progress(), (1, 2));
        assert!(s.current.is_none());
        assert!(s.saved_to.is_none());
    }

    #[test]
    fn last_run_finishes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, clock) = session(dir.path(), 1);
        s.handle_event(key("space")).unwrap();
        clock.advance(Duration::from_secs(2));
        s.handle_event(SessionEvent::RunElapsed).unwrap();
        assert!(s.is_finished());
        let path = s.saved_to.clone().unwrap();
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("4_1_"));
        assert!(name.ends_with("_outputDict.json"));
        assert_eq!(s.parameter_array[0].stop_reason, StopReason::Elapsed);
    }

    #[test]
    fn escape_during_run_logs_abort_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, clock) = session(dir.path(), 3);
        s.handle_event(key("space")).unwrap();
        clock.advance(Duration::from_millis(500));
        s.handle_event(key("escape")).unwrap();

        assert!(s.is_finished());
        let events = &s.event_array[0];
        let n = events.len();
        assert_eq!(events[n - 2], LoggedEvent::Code(-99, 0.5));
        assert_eq!(
            events[n - 1],
            LoggedEvent::Message("trial trial1 event escape at 0.5000".into())
        );
        assert_eq!(s.parameter_array[0].stop_reason, StopReason::Aborted);
        assert!(s.saved_to.is_some());
        // nothing happens after the session stopped
        assert!(!s.handle_event(key("space")).unwrap());
    }

    #[test]
    fn abort_from_pause_saves_completed_runs() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, clock) = session(dir.path(), 3);
        s.handle_event(key("space")).unwrap();
        clock.advance(Duration::from_secs(2));
        s.handle_event(SessionEvent::RunElapsed).unwrap();
        s.handle_event(key("q")).unwrap();
        assert!(s.is_finished());
        assert_eq!(s.event_array.len(), 1);
        let saved = SessionOutput::load(s.saved_to.as_ref().unwrap()).unwrap();
        assert_eq!(saved.event_array, s.event_array);
    }

    #[test]
    fn rotation_advances_only_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = session(dir.path(), 1);
        s.advance_frame();
        assert_eq!(s.rotation(), 0.0);
        s.handle_event(key("space")).unwrap();
        for _ in 0..4 {
            s.advance_frame();
        }
        // 0.5 turns per second at 60 Hz is 3 degrees a frame
        assert!((s.rotation() - 12.0).abs() < 1e-9);
        assert_eq!(s.current.as_ref().unwrap().frames, 4);
    }

    #[test]
    fn closing_the_window_saves() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, _) = session(dir.path(), 2);
        s.handle_event(key("space")).unwrap();
        s.handle_event(SessionEvent::Closed).unwrap();
        assert!(s.is_finished());
        assert!(s.event_array[0].iter().any(LoggedEvent::is_abort));
        assert!(s.saved_to.is_some());
    }

    #[test]
    fn failed_save_is_retried_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("data");
        std::fs::write(&blocked, b"not a directory").unwrap();
        let (mut s, clock) = session(&blocked, 1);
        s.handle_event(key("space")).unwrap();
        clock.advance(Duration::from_secs(2));

        let err = s.handle_event(SessionEvent::RunElapsed).unwrap_err();
        assert!(err.to_string().contains("data"));
        assert!(s.is_finished());
        assert!(!s.is_saved());
        assert_eq!(s.event_array.len(), 1);
        // keys do not retry, only closing does
        assert!(!s.handle_event(key("space")).unwrap());

        std::fs::remove_file(&blocked).unwrap();
        assert!(s.handle_event(SessionEvent::Closed).unwrap());
        let path = s.saved_to.clone().unwrap();
        assert!(path.starts_with(&blocked));
        let saved = SessionOutput::load(&path).unwrap();
        assert_eq!(saved.event_array, s.event_array);
        assert_eq!(saved.parameter_array[0].stop_reason, StopReason::Elapsed);

        // saved once
        assert!(!s.handle_event(SessionEvent::Closed).unwrap());
        assert_eq!(s.saved_to, Some(path));
    }

    #[test]
    fn unsaved_session_can_be_written_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("data");
        std::fs::write(&blocked, b"").unwrap();
        let (mut s, clock) = session(&blocked, 2);
        s.handle_event(key("space")).unwrap();
        clock.advance(Duration::from_millis(700));
        s.handle_event(key("b")).unwrap();
        assert!(s.handle_event(SessionEvent::Closed).is_err());
        assert!(!s.is_saved());

        let fallback = dir.path().join("fallback");
        let path = s.save_to(&fallback).unwrap();
        assert!(path.starts_with(&fallback));
        assert!(s.is_saved());
        let saved = SessionOutput::load(&path).unwrap();
        assert_eq!(saved.parameter_array[0].stop_reason, StopReason::Aborted);
        assert!(saved.event_array[0].iter().any(LoggedEvent::is_abort));
    }
}

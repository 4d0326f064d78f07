use rivalry_core::{LoggedEvent, SessionPhase, StopReason};
use rivalry_experiment::{
    ExperimentConfig, Participant, RivalrySession, SessionEvent, SessionOutput,
};
use rivalry_timing::{ManualTimer, Timer};
use std::time::Duration;

fn press(session: &mut RivalrySession<ManualTimer>, key: &str) {
    session
        .handle_event(SessionEvent::KeyPressed(key.to_string()))
        .unwrap();
}

/// Presents frames at 100 Hz until the run elapses.
fn run_frames(session: &mut RivalrySession<ManualTimer>, clock: &ManualTimer, frames: usize) {
    for _ in 0..frames {
        clock.advance(Duration::from_millis(10));
        session.timer.record_frame(Duration::from_millis(10));
        session.advance_frame();
        for event in session.update() {
            session.handle_event(event).unwrap();
        }
    }
}

fn key_events(events: &[LoggedEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            LoggedEvent::Message(text) if text.contains(" event ") => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn two_runs_with_a_pause_produce_one_event_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig::from_toml_str(&format!(
        r#"
        [session]
        n_runs = 2
        run_duration_s = 1.0
        output_dir = "{}"

        [stimuli]
        rotations_per_second = 1.0
        "#,
        dir.path().display()
    ))
    .unwrap();

    let timer = ManualTimer::new();
    let clock = timer.clone();
    let participant = Participant {
        subject: 21,
        session: 2,
    };
    let framerate = config.framerate(Some(100.0));
    let mut session = RivalrySession::new(config, participant, timer, framerate);

    press(&mut session, "space");
    assert_eq!(*session.current_phase(), SessionPhase::Stimulus { run: 1 });
    run_frames(&mut session, &clock, 30);
    press(&mut session, "b");
    run_frames(&mut session, &clock, 30);
    press(&mut session, "y");
    run_frames(&mut session, &clock, 40);
    assert_eq!(*session.current_phase(), SessionPhase::Pause { completed: 1 });

    // keys during the pause are not logged
    press(&mut session, "b");
    clock.advance(Duration::from_secs(5));
    press(&mut session, "space");
    assert_eq!(*session.current_phase(), SessionPhase::Stimulus { run: 2 });
    run_frames(&mut session, &clock, 50);
    press(&mut session, "y");
    run_frames(&mut session, &clock, 50);

    assert!(session.is_finished());
    let path = session.saved_to.clone().expect("output written");
    let output = SessionOutput::load(&path).unwrap();

    assert_eq!(output.subject, 21);
    assert_eq!(output.session, 2);
    assert_eq!(output.event_array.len(), 2);
    assert!(output.event_array[0].contains(&LoggedEvent::Message(
        "trial trial1 event b at 0.3000".into()
    )));
    assert!(output.event_array[0].contains(&LoggedEvent::Message(
        "trial trial1 event y at 0.6000".into()
    )));
    assert!(output.event_array[1].contains(&LoggedEvent::Message(
        "trial trial2 event y at 0.5000".into()
    )));
    // the b pressed during the pause belongs to no run
    assert_eq!(
        key_events(&output.event_array[0]),
        [
            "trial trial1 event b at 0.3000",
            "trial trial1 event y at 0.6000"
        ]
    );
    assert_eq!(
        key_events(&output.event_array[1]),
        ["trial trial2 event y at 0.5000"]
    );
    assert!(output.event_array[1][0].to_string().starts_with("trial trial2 started at "));

    assert_eq!(output.parameter_array.len(), 2);
    let first = &output.parameter_array[0];
    assert_eq!(first.stop_reason, StopReason::Elapsed);
    assert_eq!(first.frames_presented, 100);
    assert!((first.rotate_per_frame - 3.6).abs() < 1e-9);
    assert!((first.mean_frame_ms - 10.0).abs() < 1e-9);
}

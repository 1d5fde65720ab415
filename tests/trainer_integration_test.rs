//! Integration tests for the speed trainer driving a live session
//!
//! Covers the step sequence, pauses between tempos, the pause/finish
//! interaction on the last cycle, and cancellation of pending countdowns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use string_practice::events::TrainerUpdate;
use string_practice::storage::MemoryStore;
use string_practice::testing::{ManualClock, RecordingOutput, SyntheticInput};
use string_practice::trainer::{TrainerConfig, TrainerPhase, TrainerSummary};
use string_practice::{AppConfig, PracticeSession, SessionDeps, SessionEvent, TrainerError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::sleep;

fn session() -> (PracticeSession, Arc<RecordingOutput>) {
    let output = Arc::new(RecordingOutput::new(8000));
    let session = PracticeSession::new(
        AppConfig::default(),
        SessionDeps {
            runtime: Handle::current(),
            output: output.clone(),
            input: Arc::new(SyntheticInput::silence(48000)),
            storage: Arc::new(MemoryStore::new()),
            clock: Arc::new(ManualClock::new(1)),
        },
    );
    (session, output)
}

fn config(start: u32, target: u32, increment: i32, reps: u32, pause: u32) -> TrainerConfig {
    TrainerConfig {
        start_tempo: start,
        target_tempo: target,
        increment_bpm: increment,
        interval_seconds: 1,
        repetitions_per_tempo: reps,
        pause_between_seconds: pause,
    }
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, SessionEvent::Beat(_)) {
            events.push(event);
        }
    }
    events
}

fn step_tempos(events: &[SessionEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Trainer(TrainerUpdate::Step { tempo, .. }) => Some(*tempo),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_sixty_to_eighty_in_ten_steps() {
    let (session, _output) = session();
    let mut rx = session.subscribe();
    session.start_trainer(config(60, 80, 5, 2, 0)).unwrap();

    let started = session.trainer_session().unwrap();
    assert_eq!(started.total_steps, 10);
    assert_eq!(started.current_step, 1);
    assert_eq!(started.phase, TrainerPhase::Running);

    sleep(Duration::from_millis(10_500)).await;
    let events = drain(&mut rx);
    assert_eq!(
        step_tempos(&events),
        vec![60, 60, 65, 65, 70, 70, 75, 75, 80, 80]
    );
    assert!(events.contains(&SessionEvent::Trainer(TrainerUpdate::Finished(
        TrainerSummary {
            start_tempo: 60,
            final_tempo: 80,
            steps_taken: 10,
        }
    ))));

    // Final tempo keeps playing and manual control is back
    assert!(session.is_playing());
    assert_eq!(session.tempo().unwrap().bpm(), 80);
    assert!(!session.trainer_session().unwrap().active);
    session.set_bpm(90).unwrap();
    session.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_descending_ramp() {
    let (session, _output) = session();
    let mut rx = session.subscribe();
    session.start_trainer(config(120, 100, -10, 1, 0)).unwrap();

    sleep(Duration::from_millis(3_500)).await;
    let events = drain(&mut rx);
    assert_eq!(step_tempos(&events), vec![120, 110, 100]);
    assert_eq!(session.tempo().unwrap().bpm(), 100);
    assert!(!session.trainer_session().unwrap().active);
}

#[tokio::test(start_paused = true)]
async fn test_direction_mismatch_leaves_session_untouched() {
    let (session, _output) = session();
    let before = session.tempo().unwrap();

    let result = session.start_trainer(config(100, 60, 5, 1, 0));
    assert_eq!(
        result,
        Err(TrainerError::DirectionMismatch {
            start: 100,
            target: 60,
            increment: 5,
        })
    );
    assert_eq!(session.tempo().unwrap(), before);
    assert!(!session.is_playing());
    session.play().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pause_between_tempos_and_last_cycle() {
    let (session, _output) = session();
    let mut rx = session.subscribe();
    // Steps at 60, 65, 70 with a 2 s pause after each
    session.start_trainer(config(60, 70, 5, 1, 2)).unwrap();

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(session.trainer_session().unwrap().phase, TrainerPhase::Paused);
    assert!(!session.is_playing(), "Silent during the pause");

    sleep(Duration::from_secs(2)).await;
    assert_eq!(session.trainer_session().unwrap().phase, TrainerPhase::Running);
    assert!(session.is_playing());
    assert_eq!(session.tempo().unwrap().bpm(), 65);

    // 70 plays at t=6, pauses at t=7, then the next cycle would overshoot
    sleep(Duration::from_secs(6)).await;
    let events = drain(&mut rx);
    assert_eq!(step_tempos(&events), vec![60, 65, 70]);

    let tail: Vec<&SessionEvent> = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                SessionEvent::Trainer(TrainerUpdate::Paused { .. })
                    | SessionEvent::Trainer(TrainerUpdate::Finished(_))
                    | SessionEvent::TransportStarted { .. }
            )
        })
        .collect();
    assert_eq!(
        tail[tail.len() - 3..],
        [
            &SessionEvent::Trainer(TrainerUpdate::Paused { seconds: 2 }),
            &SessionEvent::TransportStarted { bpm: 70 },
            &SessionEvent::Trainer(TrainerUpdate::Finished(TrainerSummary {
                start_tempo: 60,
                final_tempo: 70,
                steps_taken: 3,
            })),
        ]
    );
    assert!(session.is_playing(), "Final tempo resumes after the last pause");
    assert_eq!(session.tempo().unwrap().bpm(), 70);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_pause_never_resumes() {
    let (session, output) = session();
    let mut rx = session.subscribe();
    session.start_trainer(config(60, 100, 10, 1, 3)).unwrap();

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(session.trainer_session().unwrap().phase, TrainerPhase::Paused);
    session.stop_trainer().unwrap();
    drain(&mut rx);
    let clicks = output.count();

    sleep(Duration::from_secs(10)).await;
    let events = drain(&mut rx);
    assert!(step_tempos(&events).is_empty(), "No stale step after stop");
    assert!(!session.is_playing());
    assert_eq!(output.count(), clicks);
    assert_eq!(session.trainer_session().unwrap().phase, TrainerPhase::Idle);
    assert_eq!(session.stop_trainer(), Err(TrainerError::NotRunning));
}

#[tokio::test(start_paused = true)]
async fn test_tempo_steps_never_overlap_tickers() {
    let (session, output) = session();
    let mut rx = session.subscribe();
    // 50 BPM (1200 ms) for 3 s, then 100 BPM (600 ms)
    let mut cfg = config(50, 100, 50, 1, 0);
    cfg.interval_seconds = 3;
    session.start_trainer(cfg).unwrap();

    sleep(Duration::from_millis(5_700)).await;
    let mut beats = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Beat(beat) = event {
            beats.push((beat.bpm, beat.beat_index));
        }
    }
    assert_eq!(
        beats,
        vec![
            (50, 0),
            (50, 1),
            (50, 2),
            (100, 0),
            (100, 1),
            (100, 2),
            (100, 3),
            (100, 4),
        ]
    );
    assert_eq!(output.count(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_finish() {
    let (session, _output) = session();
    session.start_trainer(config(60, 65, 5, 1, 0)).unwrap();
    assert_eq!(
        session.start_trainer(config(60, 65, 5, 1, 0)),
        Err(TrainerError::AlreadyRunning)
    );

    sleep(Duration::from_millis(2_500)).await;
    assert!(!session.trainer_session().unwrap().active);
    session.start_trainer(config(70, 80, 5, 1, 0)).unwrap();
    assert_eq!(session.tempo().unwrap().bpm(), 70);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_manual_tempo_cannot_override_trainer_start() {
    for round in 0..100 {
        let (session, _output) = session();
        let session = Arc::new(session);
        let done = Arc::new(AtomicBool::new(false));

        let hammer = {
            let session = Arc::clone(&session);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut bpm = 190;
                while !done.load(Ordering::Relaxed) {
                    let _ = session.set_bpm(bpm);
                    bpm = if bpm == 190 { 191 } else { 190 };
                }
            })
        };
        thread::yield_now();

        session.start_trainer(config(60, 80, 5, 1, 0)).unwrap();
        let snapshot = session.snapshot().unwrap();
        done.store(true, Ordering::Relaxed);
        hammer.join().unwrap();

        assert!(snapshot.trainer.active, "round {}", round);
        assert_eq!(snapshot.tempo.bpm(), 60, "round {}", round);
        assert_eq!(snapshot.beat.bpm, 60, "round {}", round);
        assert_eq!(
            session.set_bpm(120),
            Err(string_practice::AudioError::TransportLocked)
        );
        session.stop_trainer().unwrap();
    }
}

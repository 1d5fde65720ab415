use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use string_practice::audio::wav::{render_click_track, write_wav};
use string_practice::audio::{
    render_click, AudioOutput, CpalInput, CpalOutput, NullOutput, Timbre,
};
use string_practice::events::{TrainerUpdate, TunerUpdate};
use string_practice::metronome::{TempoConfig, TempoMarking, TimeSignature};
use string_practice::presets::SystemWallClock;
use string_practice::storage::FileStore;
use string_practice::trainer::TrainerConfig;
use string_practice::{AppConfig, PracticeSession, SessionDeps, SessionEvent};
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(
    name = "practice_cli",
    about = "Metronome, speed trainer and tuner for string players"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/practice_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the directory presets, playlists and calibration are stored in
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Print every session event as a JSON line
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TempoArgs {
    #[arg(long)]
    bpm: Option<i64>,
    /// Tempo marking name, e.g. allegro
    #[arg(long, conflicts_with = "bpm")]
    marking: Option<TempoMarking>,
    /// Time signature as N/D
    #[arg(long)]
    signature: Option<TimeSignature>,
    /// Click sound id, e.g. dry-click
    #[arg(long)]
    timbre: Option<Timbre>,
    /// 0-100
    #[arg(long)]
    volume: Option<i64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the metronome for a while
    Metronome {
        #[command(flatten)]
        tempo: TempoArgs,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Listen on the microphone and print pitch readings
    Tune {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        /// Set and persist the A4 reference (432-445 Hz) first
        #[arg(long)]
        a4: Option<f32>,
    },
    /// Run a speed-training session until it finishes
    Train {
        #[arg(long)]
        start: Option<u32>,
        #[arg(long)]
        target: Option<u32>,
        #[arg(long, allow_hyphen_values = true)]
        increment: Option<i32>,
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long)]
        repetitions: Option<u32>,
        #[arg(long)]
        pause: Option<u32>,
        #[arg(long)]
        timbre: Option<Timbre>,
    },
    /// Manage saved presets
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },
    /// Manage and play playlists
    Playlists {
        #[command(subcommand)]
        action: PlaylistAction,
    },
    /// Render clicks to a WAV file
    Render {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "metronome-beats")]
        timbre: Timbre,
        #[arg(long, default_value_t = 70)]
        volume: i64,
        /// Render a single accented click
        #[arg(long)]
        accent: bool,
        /// Render this many measures of a click track instead of one click
        #[arg(long)]
        measures: Option<u32>,
        #[arg(long, default_value_t = 120)]
        bpm: i64,
        #[arg(long, default_value = "4/4")]
        signature: TimeSignature,
    },
}

#[derive(Subcommand, Debug)]
enum PresetAction {
    List,
    /// Save the given settings under a name
    Save {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        tempo: TempoArgs,
    },
    Delete {
        #[arg(long)]
        id: u64,
    },
    Clear,
    /// Apply a preset and play it
    Apply {
        #[arg(long)]
        id: u64,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[derive(Subcommand, Debug)]
enum PlaylistAction {
    List,
    Create {
        #[arg(long)]
        name: String,
        /// Preset ids in playing order
        #[arg(long, value_delimiter = ',', required = true)]
        presets: Vec<u64>,
    },
    Delete {
        #[arg(long)]
        id: u64,
    },
    /// Play every preset of a playlist in turn
    Play {
        #[arg(long)]
        id: u64,
        #[arg(long, default_value_t = 10)]
        seconds_each: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    string_practice::init_logging();
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }

    if let Commands::Render {
        output,
        timbre,
        volume,
        accent,
        measures,
        bpm,
        signature,
    } = &cli.command
    {
        return run_render(&config, output, *timbre, *volume, *accent, *measures, *bpm, *signature);
    }

    let session = open_session(&config)?;
    match cli.command {
        Commands::Metronome { tempo, seconds } => {
            apply_tempo_args(&session, &tempo)?;
            session.play().context("starting the metronome")?;
            watch(&session, Duration::from_secs(seconds), cli.json, |_| false).await;
            session.stop()?;
        }
        Commands::Tune { seconds, a4 } => {
            if let Some(a4) = a4 {
                let applied = session.set_a4_hz(a4).context("saving the A4 reference")?;
                println!("A4 = {:.1} Hz", applied);
            }
            session.start_tuner().context("opening the microphone")?;
            watch(&session, Duration::from_secs(seconds), cli.json, |_| false).await;
            session.stop_tuner()?;
        }
        Commands::Train {
            start,
            target,
            increment,
            interval,
            repetitions,
            pause,
            timbre,
        } => {
            let mut trainer = TrainerConfig::from(&config.trainer);
            trainer.start_tempo = start.unwrap_or(trainer.start_tempo);
            trainer.target_tempo = target.unwrap_or(trainer.target_tempo);
            trainer.increment_bpm = increment.unwrap_or(trainer.increment_bpm);
            trainer.interval_seconds = interval.unwrap_or(trainer.interval_seconds);
            trainer.repetitions_per_tempo = repetitions.unwrap_or(trainer.repetitions_per_tempo);
            trainer.pause_between_seconds = pause.unwrap_or(trainer.pause_between_seconds);
            if let Some(timbre) = timbre {
                session.set_timbre(timbre)?;
            }

            session
                .start_trainer(trainer)
                .context("starting the speed trainer")?;
            let finished = watch(&session, Duration::MAX, cli.json, |event| {
                matches!(
                    event,
                    SessionEvent::Trainer(TrainerUpdate::Finished(_) | TrainerUpdate::Stopped)
                )
            })
            .await;
            if finished {
                session.stop()?;
            } else {
                session.stop_trainer()?;
            }
        }
        Commands::Presets { action } => run_presets(&session, action, cli.json).await?,
        Commands::Playlists { action } => run_playlists(&session, action, cli.json).await?,
        Commands::Render { .. } => {}
    }
    Ok(ExitCode::from(0))
}

fn open_session(config: &AppConfig) -> Result<PracticeSession> {
    let storage = FileStore::open(&config.storage.data_dir).with_context(|| {
        format!(
            "opening data directory {}",
            config.storage.data_dir.display()
        )
    })?;
    let output: Arc<dyn AudioOutput> = match CpalOutput::open(&config.audio) {
        Ok(output) => Arc::new(output),
        Err(err) => {
            log::warn!("[practice_cli] No audio output ({}), running silent", err);
            Arc::new(NullOutput::new(config.audio.sample_rate))
        }
    };
    let input = Arc::new(CpalInput::new(&config.audio, config.tuner.frame_size));

    Ok(PracticeSession::new(
        config.clone(),
        SessionDeps {
            runtime: tokio::runtime::Handle::current(),
            output,
            input,
            storage: Arc::new(storage),
            clock: Arc::new(SystemWallClock),
        },
    ))
}

fn apply_tempo_args(session: &PracticeSession, args: &TempoArgs) -> Result<()> {
    if let Some(marking) = args.marking {
        session.apply_marking(marking)?;
    }
    if let Some(bpm) = args.bpm {
        session.set_bpm(bpm)?;
    }
    if let Some(signature) = args.signature {
        session.set_time_signature(signature)?;
    }
    if let Some(timbre) = args.timbre {
        session.set_timbre(timbre)?;
    }
    if let Some(volume) = args.volume {
        session.set_volume(volume)?;
    }
    Ok(())
}

/// Print events until `limit` elapses, Ctrl-C, or `done` accepts an event.
/// Returns whether `done` ended the wait.
async fn watch<F>(session: &PracticeSession, limit: Duration, json: bool, done: F) -> bool
where
    F: Fn(&SessionEvent) -> bool,
{
    let mut rx = session.subscribe();
    let deadline = tokio::time::Instant::now()
        .checked_add(limit)
        .unwrap_or_else(|| tokio::time::Instant::now() + Duration::from_secs(86_400 * 365));
    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            _ = tokio::signal::ctrl_c() => return false,
            received = rx.recv() => match received {
                Ok(event) => {
                    print_event(&event, json);
                    if done(&event) {
                        return true;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("[practice_cli] Skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return false,
            },
        }
    }
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(err) => log::warn!("[practice_cli] Could not encode event: {}", err),
        }
        return;
    }
    match event {
        SessionEvent::Beat(beat) => {
            let mark = if beat.accent { "TICK" } else { "tick" };
            println!("{} {}/{}", mark, beat.beat_in_measure + 1, beat.beats_per_measure);
        }
        SessionEvent::TempoChanged(tempo) => {
            println!("tempo {} BPM, {}, {}", tempo.bpm(), tempo.time_signature, tempo.timbre);
        }
        SessionEvent::Trainer(TrainerUpdate::Step { step, tempo, .. }) => {
            println!("step {} at {} BPM", step, tempo);
        }
        SessionEvent::Trainer(TrainerUpdate::Paused { seconds }) => {
            println!("pause {}s", seconds);
        }
        SessionEvent::Trainer(TrainerUpdate::Finished(summary)) => {
            println!(
                "finished: {} -> {} BPM in {} steps",
                summary.start_tempo, summary.final_tempo, summary.steps_taken
            );
        }
        SessionEvent::Tuner(TunerUpdate::Reading(reading)) => {
            println!(
                "{:>8.2} Hz  {}{}  {:+} cents  {:?}",
                reading.sample.frequency_hz,
                reading.sample.note,
                reading.sample.octave,
                reading.sample.cents,
                reading.status
            );
        }
        SessionEvent::Tuner(TunerUpdate::Error { message }) => println!("tuner error: {}", message),
        SessionEvent::PresetApplied { preset_id, name } => {
            println!("preset {} '{}'", preset_id, name);
        }
        _ => {}
    }
}

async fn run_presets(session: &PracticeSession, action: PresetAction, json: bool) -> Result<()> {
    match action {
        PresetAction::List => {
            for preset in session.presets()? {
                println!(
                    "{:>14}  {:<20} {:>3} BPM  {:<5} {:<16} vol {}",
                    preset.id,
                    preset.name,
                    preset.tempo,
                    preset.time_signature,
                    preset.sound_type,
                    preset.volume
                );
            }
        }
        PresetAction::Save { name, tempo } => {
            apply_tempo_args(session, &tempo)?;
            let preset = session.save_preset(&name)?;
            println!("saved preset {} '{}'", preset.id, preset.name);
        }
        PresetAction::Delete { id } => session.delete_preset(id)?,
        PresetAction::Clear => session.clear_presets()?,
        PresetAction::Apply { id, seconds } => {
            session.apply_preset(id)?;
            session.play()?;
            watch(session, Duration::from_secs(seconds), json, |_| false).await;
            session.stop()?;
        }
    }
    Ok(())
}

async fn run_playlists(
    session: &PracticeSession,
    action: PlaylistAction,
    json: bool,
) -> Result<()> {
    match action {
        PlaylistAction::List => {
            for playlist in session.playlists()? {
                let names: Vec<&str> = playlist.presets.iter().map(|p| p.name.as_str()).collect();
                println!("{:>14}  {:<20} [{}]", playlist.id, playlist.name, names.join(", "));
            }
        }
        PlaylistAction::Create { name, presets } => {
            let playlist = session.create_playlist(&name, &presets)?;
            println!("created playlist {} '{}'", playlist.id, playlist.name);
        }
        PlaylistAction::Delete { id } => session.delete_playlist(id)?,
        PlaylistAction::Play { id, seconds_each } => {
            session.play_playlist(id)?;
            session.play()?;
            loop {
                watch(session, Duration::from_secs(seconds_each), json, |_| false).await;
                if session.next_preset()?.is_none() {
                    break;
                }
            }
            session.exit_playlist();
            session.stop()?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_render(
    config: &AppConfig,
    output: &Path,
    timbre: Timbre,
    volume: i64,
    accent: bool,
    measures: Option<u32>,
    bpm: i64,
    signature: TimeSignature,
) -> Result<ExitCode> {
    let sample_rate = config.audio.sample_rate;
    let samples = match measures {
        Some(0) => bail!("--measures must be at least 1"),
        Some(measures) => {
            let mut tempo = TempoConfig::default();
            tempo.set_bpm(bpm);
            tempo.set_volume(volume);
            tempo.time_signature = signature;
            tempo.timbre = timbre;
            render_click_track(&tempo, measures, sample_rate)
        }
        None => {
            let gain = volume.clamp(0, 100) as f32 / 100.0;
            render_click(timbre, accent, gain, sample_rate)
        }
    };
    write_wav(output, &samples, sample_rate)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "wrote {} samples at {} Hz to {}",
        samples.len(),
        sample_rate,
        output.display()
    );
    Ok(ExitCode::from(0))
}

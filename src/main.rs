use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use parley::voice::{AudioCapture, AudioPlayback, CaptureSource, Speaker, SpeechSynthesisPlayer};
use parley::{
    Config, ConversationHistory, DialogueClient, Error, ResponseStreamConsumer, Role,
    TracingNotifier, TranscriptionClient, TurnCoordinator, TurnOutcome,
};

/// Parley - conversational practice simulator
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Path to config file (defaults to the platform config directory)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a practice conversation (the default)
    Run,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the speech synthesis system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::TestMic { duration }) => return test_mic(duration).await,
        Some(Command::TestSpeaker) => return test_speaker().await,
        Some(Command::TestTts { text }) => return test_tts(cli.config.as_deref(), &text).await,
        Some(Command::Run) | None => {}
    }

    let config = load_config(cli.config.as_deref())?;
    tracing::info!(
        scenario = %config.scenario.name,
        language = %config.language.name,
        mode = ?config.scenario.mode,
        "starting practice conversation"
    );

    run_conversation(config).await
}

/// Resolve and load the configuration file
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config directory"))?,
    };
    Ok(Config::load(&path)?)
}

/// Interactive conversation loop
///
/// Enter starts a recording, Enter again stops it and drives the turn;
/// Ctrl-C abandons the conversation.
#[allow(clippy::future_not_send)]
async fn run_conversation(config: Config) -> anyhow::Result<()> {
    let capture = AudioCapture::new()?;
    let playback = AudioPlayback::new()?;

    let transcriber = TranscriptionClient::new(config.endpoints.transcription_url.clone());
    let dialogue = DialogueClient::new(config.endpoints.dialogue_url.clone());
    let replies = ResponseStreamConsumer::new(config.endpoints.stream_url.clone());
    let speaker = SpeechSynthesisPlayer::new(config.endpoints.synthesis_url.clone(), playback);

    let mut coordinator = TurnCoordinator::new(
        capture,
        transcriber,
        dialogue,
        replies,
        speaker,
        TracingNotifier,
        config.session(),
    );

    // Ctrl-C abandons the conversation: playback stops, streams are dropped
    let cancel = coordinator.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    println!("Scenario: {}", config.scenario.name);
    println!("Press Enter to start recording, Enter again to stop, Ctrl-C to quit.\n");

    loop {
        if lines.next_line().await?.is_none() {
            break;
        }

        match coordinator.start_turn() {
            Ok(()) => {}
            Err(Error::MicDisabled) => {
                coordinator.rearm_mic();
                println!("(microphone re-enabled, press Enter to record)");
                continue;
            }
            Err(Error::ScenarioComplete | Error::Cancelled) => break,
            Err(e) => {
                tracing::error!(error = %e, "cannot start turn");
                continue;
            }
        }

        println!("Recording... press Enter to stop.");
        if lines.next_line().await?.is_none() {
            break;
        }

        match coordinator.finish_turn().await {
            Ok(TurnOutcome::NoSpeech) => {
                println!("(no speech detected, press Enter to re-enable the mic)");
            }
            Ok(TurnOutcome::Exchanged { message, spoken }) => {
                print_exchange(coordinator.history(), &message, spoken);
            }
            Ok(TurnOutcome::Finished { message, spoken }) => {
                print_exchange(coordinator.history(), &message, spoken);
                println!("\nScenario complete!");
                break;
            }
            Ok(TurnOutcome::Abandoned) => break,
            Err(e) => {
                println!("(turn failed: {e}; press Enter to re-enable the mic)");
            }
        }
    }

    for sample in coordinator.timing_samples() {
        tracing::info!(turn = sample.turn_index, seconds = sample.seconds, "turn timing");
    }

    Ok(())
}

/// Print the latest exchange from the transcript
fn print_exchange(history: &ConversationHistory, bot_message: &str, spoken: bool) {
    if let Some(user_turn) = history.turns().iter().rev().find(|t| t.role == Role::User) {
        println!("You: {}", user_turn.message);
    }
    let tag = if spoken { " (spoken)" } else { "" };
    println!("Bot: {bot_message}{tag}");
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Recording for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    let handle = capture.begin()?;
    tokio::time::sleep(Duration::from_secs(duration)).await;
    let wav = capture.end(handle)?;

    let reader = hound::WavReader::new(std::io::Cursor::new(&wav[..]))?;
    let samples: Vec<f32> = reader
        .into_samples::<i16>()
        .map(|s| s.map(|v| f32::from(v) / 32768.0))
        .collect::<Result<_, _>>()?;

    let energy = calculate_rms(&samples);
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    println!("Captured {} samples | RMS: {energy:.4} | Peak: {peak:.4}", samples.len());

    println!("\n---");
    println!("If RMS moved above 0, your mic is working!");
    println!("If it stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = AudioPlayback::new()?;

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_i32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());

    let cancel = tokio_util::sync::CancellationToken::new();
    playback.play(samples, &cancel).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test speech synthesis output
#[allow(clippy::future_not_send)]
async fn test_tts(config_path: Option<&std::path::Path>, text: &str) -> anyhow::Result<()> {
    println!("Testing synthesis with text: \"{text}\"\n");

    let config = load_config(config_path)?;
    let playback = AudioPlayback::new()?;
    let mut speaker = SpeechSynthesisPlayer::new(config.endpoints.synthesis_url.clone(), playback);

    let cancel = tokio_util::sync::CancellationToken::new();
    speaker.speak(text, &config.voice, &cancel).await?;

    println!("Done.");
    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mouthpiece::config::Overrides;
use mouthpiece::metrics::{self, MetricsReport};
use mouthpiece::voice::{self, AudioCapture, MicListener, Pcm, calculate_energy};
use mouthpiece::{
    AnimationDriver, Config, Orchestrator, QueryClient, QuitSignal, Shutdown, SpeakingSignal,
    SpeechWorker, display,
};

/// Mouthpiece - talk to a local language model and hear it answer
#[derive(Parser)]
#[command(name = "mouthpiece", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/mouthpiece/config.toml)
    #[arg(short, long, env = "MOUTHPIECE_CONFIG")]
    config: Option<PathBuf>,

    /// Where metrics are saved on shutdown
    #[arg(long, env = "MOUTHPIECE_METRICS_PATH")]
    metrics: Option<PathBuf>,

    /// Generation model name
    #[arg(long)]
    model: Option<String>,

    /// Generation endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Do not draw the mouth in the terminal
    #[arg(long)]
    headless: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List synthesis voices and the one replies will use
    Voices,
    /// Print the report from a saved metrics file
    Report {
        /// Metrics file (defaults to the configured path)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Send one prompt to the generation service
    Ask {
        /// Prompt text
        prompt: String,
    },
    /// Speak a sentence through the configured engine
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output with a tone
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,mouthpiece=info",
        1 => "info,mouthpiece=debug",
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
    let overrides = Overrides {
        config_file: cli.config,
        metrics_path: cli.metrics,
        model: cli.model,
        endpoint: cli.endpoint,
        headless: cli.headless,
    };
    let config = Config::load_with_options(&overrides)?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Voices => list_voices(&config).await,
            Command::Report { path } => show_report(path.as_deref().unwrap_or(config.metrics_path())),
            Command::Ask { prompt } => ask(&config, &prompt).await,
            Command::Say { text } => say(&config, text).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
        };
    }

    converse(config).await
}

/// Run the interaction loop until exit or interrupt
#[allow(clippy::future_not_send)]
async fn converse(config: Config) -> anyhow::Result<()> {
    let quit = QuitSignal::install();

    let client = QueryClient::new(config.generation.clone())?;
    let speech = speech_worker(&config)?;
    let listener = MicListener::open(&config.recognition)?;
    let display = display::from_config(config.display, quit.clone());

    banner(&client);

    let mut orchestrator = Orchestrator::new(Box::new(listener), display, client, speech, quit)
        .with_animation(AnimationDriver::with_fps(config.display.fps))
        .with_metrics_path(config.metrics_path());

    let shutdown = orchestrator.run().await;
    orchestrator.finish();

    if shutdown == Shutdown::Quit {
        println!("Interrupted.");
        // A reply may still be playing on a blocking thread; don't wait for it
        std::process::exit(0);
    }

    println!("Goodbye.");
    Ok(())
}

fn banner(client: &QueryClient) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("MOUTHPIECE");
    println!("{rule}");
    println!("Model: {} at {}", client.model(), client.endpoint());
    println!("Make sure the model server is running (e.g. `ollama serve`)");
    println!("Metrics are collected automatically");
    println!("Say 'report' to display statistics");
    println!("Say 'voices' to list available voices");
    println!("Say 'exit' to quit");
    println!("{rule}\n");
}

fn speech_worker(config: &Config) -> anyhow::Result<SpeechWorker> {
    let synth = voice::synthesizer_from_config(&config.speech)?;
    Ok(SpeechWorker::new(
        synth,
        config.speech.language_preferences.clone(),
    ))
}

async fn list_voices(config: &Config) -> anyhow::Result<()> {
    let speech = speech_worker(config)?;
    let voices = speech.list_voices().await?;

    if voices.is_empty() {
        println!("No synthesis voices available.");
        return Ok(());
    }

    println!("{}", voice::voice_listing(&voices));
    match voice::select_voice(&voices, speech.preferences()) {
        Some(choice) if choice.matched => println!("Replies will use: {}", choice.voice),
        Some(choice) => println!(
            "No voice matches {:?}; replies will use: {}",
            speech.preferences(),
            choice.voice
        ),
        None => {}
    }
    Ok(())
}

fn show_report(path: &std::path::Path) -> anyhow::Result<()> {
    let snapshot = metrics::load(path)?;
    println!("{}", MetricsReport::from_metrics(snapshot));
    Ok(())
}

async fn ask(config: &Config, prompt: &str) -> anyhow::Result<()> {
    let client = QueryClient::new(config.generation.clone())?;
    let result = client.query(prompt).await;

    println!("Outcome: {}", result.outcome);
    println!("Latency: {:.2}s", result.elapsed.as_secs_f64());
    println!("Reply: {}", result.reply);
    Ok(())
}

async fn say(config: &Config, text: String) -> anyhow::Result<()> {
    let speech = speech_worker(config)?;
    let (writer, _reader) = SpeakingSignal::pair();

    let report = speech.spawn(text, writer).await?;
    report.result?;
    println!("Spoke in {:.2}s", report.elapsed.as_secs_f64());
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::open()?;
    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    println!("\n---");
    println!("If the meter moved, your mic is working.");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Play a 440Hz tone for two seconds
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24_000_u32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    tokio::task::spawn_blocking(move || voice::play_blocking(Pcm { samples, sample_rate }))
        .await??;

    println!("Done.");
    Ok(())
}

//! Sonora TTS - command-line entry point
//!
//! Generates speech with Gemini, plays it on the default (or chosen) output
//! device and saves it as WAV. `say` runs a single generation,
//! `interactive` keeps a studio session open on stdin.

use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sonora_common::voices::{default_voice, resolve_voice, VoiceProfile, VOICES};
use sonora_tts::audio::{AudioOutput, CpalContext, HeadlessContext, OutputContext};
use sonora_tts::config::Config;
use sonora_tts::speech::GeminiClient;
use sonora_tts::{Studio, UiState};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for sonora-tts
#[derive(Parser, Debug)]
#[command(name = "sonora-tts")]
#[command(about = "Text-to-speech studio powered by Gemini")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SONORA_CONFIG")]
    config: Option<PathBuf>,

    /// Output device name (default device when omitted or not found)
    #[arg(long, global = true, env = "SONORA_AUDIO_DEVICE")]
    device: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the voice catalog
    Voices,

    /// List audio output devices
    Devices,

    /// Generate speech once
    Say {
        /// Voice id or prebuilt voice name (see `voices`)
        #[arg(short, long)]
        voice: Option<String>,

        /// Save the WAV here (file or directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not play; save to the output file instead
        #[arg(long)]
        no_play: bool,

        /// Text to speak (read from stdin when omitted)
        text: Vec<String>,
    },

    /// Open an interactive session reading lines from stdin
    Interactive {
        /// Initial voice id or prebuilt voice name
        #[arg(short, long)]
        voice: Option<String>,
    },
}

type SonoraStudio<C> = Studio<C, GeminiClient>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::resolve(args.config.clone(), args.device.clone())
        .context("Failed to load configuration")?;

    // Initialize tracing (stderr keeps stdout for command output)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "sonora-tts v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("SONORA_GIT_HASH"),
        env!("SONORA_BUILD_TIMESTAMP"),
        env!("SONORA_BUILD_PROFILE"),
    );

    match args.command {
        Command::Voices => {
            print_voices();
            Ok(())
        }
        Command::Devices => {
            let devices = AudioOutput::list_devices().context("Failed to list audio devices")?;
            for name in devices {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Say {
            voice,
            output,
            no_play,
            text,
        } => {
            let text = read_text(text)?;
            let generator = GeminiClient::new(config.gemini_settings())
                .context("Failed to create Gemini client")?;
            let options = config.studio_options();

            if no_play {
                let context = HeadlessContext::new(options.sample_rate);
                let studio = Studio::new(context, generator, options);
                run_say(&studio, voice.as_deref(), &text, false, Some(output.as_deref())).await
            } else {
                let context = CpalContext::open(config.audio_device.clone(), options.sample_rate)
                    .context("Failed to open audio output")?;
                let studio = Studio::new(context, generator, options);
                run_say(&studio, voice.as_deref(), &text, true, output.as_deref().map(Some)).await
            }
        }
        Command::Interactive { voice } => {
            let generator = GeminiClient::new(config.gemini_settings())
                .context("Failed to create Gemini client")?;
            let options = config.studio_options();
            let context = CpalContext::open(config.audio_device.clone(), options.sample_rate)
                .context("Failed to open audio output")?;
            let studio = Studio::new(context, generator, options);
            run_interactive(&studio, voice.as_deref()).await
        }
    }
}

fn print_voices() {
    let default_id = default_voice().id;
    for voice in VOICES {
        let marker = if voice.id == default_id { "*" } else { " " };
        println!("{} {:<28} {:<8} {}", marker, voice.id, voice.voice_name.as_str(), voice.label);
    }
}

/// Text from arguments, or all of stdin when none were given
fn read_text(words: Vec<String>) -> Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;
    Ok(text.trim_end().to_string())
}

fn user_error(err: sonora_tts::Error) -> anyhow::Error {
    anyhow!(err.user_message())
}

/// Resolve a `--voice` argument and select it
async fn select_voice<C: OutputContext>(
    studio: &SonoraStudio<C>,
    query: &str,
) -> Result<&'static VoiceProfile> {
    let voice = resolve_voice(query)?;
    studio.select_voice(voice.id).await.map_err(user_error)
}

/// Read lines on a dedicated thread.
///
/// A blocking read cannot be cancelled, and one parked on tokio's blocking
/// pool would keep the runtime from shutting down until the next Enter.
/// This thread is simply abandoned when `main` returns.
fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("sonora-stdin".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start stdin reader: {}", e);
    }
    rx
}

/// One generation; `save` is `None` for "don't save", `Some(None)` for the
/// default output file
async fn run_say<C: OutputContext>(
    studio: &SonoraStudio<C>,
    voice: Option<&str>,
    text: &str,
    play: bool,
    save: Option<Option<&Path>>,
) -> Result<()> {
    if let Some(voice) = voice {
        select_voice(studio, voice).await?;
    }

    let report = studio.generate_text(text).await.map_err(user_error)?;
    info!(
        frames = report.frame_count,
        duration_ms = report.duration_ms,
        "Generated {} of audio",
        format_duration(report.duration_ms)
    );

    if play {
        tokio::select! {
            _ = studio.wait_for_playback() => {},
            _ = shutdown_signal() => {
                studio.stop();
            },
        }
    }

    if let Some(dest) = save {
        let path = studio.download(dest).await.map_err(user_error)?;
        println!("Saved {}", path.display());
    }

    studio.shutdown();
    Ok(())
}

async fn run_interactive<C: OutputContext>(
    studio: &SonoraStudio<C>,
    voice: Option<&str>,
) -> Result<()> {
    if let Some(voice) = voice {
        select_voice(studio, voice).await?;
    }

    println!("Type text to speak. Commands: :voice <id|name>, :voices, :save [path], :replay, :stop, :pause, :resume, :status, :quit");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            break; // EOF
        };
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            ":quit" | ":q" => break,
            ":voices" => print_voices(),
            ":voice" => match select_voice(studio, arg).await {
                Ok(voice) => println!("Voice: {}", voice.label),
                Err(e) => println!("{}", e),
            },
            ":save" => {
                let dest = (!arg.is_empty()).then(|| Path::new(arg));
                match studio.download(dest).await {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ":replay" => match studio.replay() {
                Ok(Some(_)) => {}
                Ok(None) => println!("Nothing to replay."),
                Err(e) => println!("{}", e.user_message()),
            },
            ":stop" => {
                studio.stop();
            }
            ":pause" => {
                if let Err(e) = studio.pause() {
                    println!("{}", e.user_message());
                }
            }
            ":resume" => {
                if let Err(e) = studio.resume() {
                    println!("{}", e.user_message());
                }
            }
            ":status" => print_status(&studio.snapshot().await, studio.state().generations()),
            _ if command.starts_with(':') => println!("Unknown command: {}", command),
            _ => {
                tokio::select! {
                    result = studio.generate_text(line) => match result {
                        Ok(report) => println!(
                            "Playing {} ({} bytes WAV)",
                            format_duration(report.duration_ms),
                            report.wav_bytes
                        ),
                        Err(e) => println!("{}", e.user_message()),
                    },
                    _ = &mut shutdown => break,
                }
            }
        }
    }

    studio.shutdown();
    Ok(())
}

fn print_status(ui: &UiState, generations: u64) {
    println!("voice:      {}", ui.voice_id);
    println!("generated:  {}", generations);
    println!("chars left: {}", ui.chars_left());
    println!("loading:    {}", ui.loading);
    println!("audio:      {}", if ui.has_buffer { "ready" } else { "none" });
    match &ui.resource_url {
        Some(url) => println!("download:   {}", url),
        None => println!("download:   none"),
    }
    if let Some(error) = &ui.error {
        println!("error:      {}", error);
    }
}

fn format_duration(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

/// Resolves on Ctrl+C (or SIGTERM on unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    /// Reader that never returns, like a terminal nobody types into
    struct Silent;

    impl Read for Silent {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    #[tokio::test]
    async fn test_line_reader_delivers_lines_then_eof() {
        let mut lines = spawn_line_reader(Cursor::new("hello\n:quit\n"));

        assert_eq!(lines.recv().await.unwrap().unwrap(), "hello");
        assert_eq!(lines.recv().await.unwrap().unwrap(), ":quit");
        assert!(lines.recv().await.is_none());
    }

    #[test]
    fn test_pending_read_does_not_block_runtime_shutdown() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let mut lines = spawn_line_reader(std::io::BufReader::new(Silent));
            let waited = tokio::time::timeout(Duration::from_millis(20), lines.recv()).await;
            assert!(waited.is_err());
        });

        // A read on the blocking pool would hold shutdown for the full timeout
        let started = Instant::now();
        runtime.shutdown_timeout(Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1_000), "1.000s");
        assert_eq!(format_duration(2_345), "2.345s");
    }
}

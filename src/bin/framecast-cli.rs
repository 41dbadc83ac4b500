use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framecast::{
    ConversionSignal, DisplaySink, FrameConverter, FrameSetResolver, FramebufferDisplay,
    HeadlessDisplay, PlaybackEngine, PlaybackOptions, StatusRenderer, VideoLibrary,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framecast play --framebuffer /dev/fb1 --backlight /sys/class/backlight/soc:backlight\n  framecast play --video clip.mp4 --duration 00:05:00\n  framecast convert uploads/clip.mp4 --frames frames\n  framecast frames --json\n  framecast library set-default clip.mp4\n  framecast completions zsh > _framecast";

#[derive(Debug, Parser)]
#[command(
    name = "framecast",
    version,
    about = "Loop converted video frames on a small display",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Log filter (error, warn, info, debug, trace, or an env_logger spec).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory holding the converted frames.
    #[arg(long, global = true, default_value = "frames")]
    frames: PathBuf,

    /// Directory holding uploaded videos.
    #[arg(long, global = true, default_value = "uploads")]
    uploads: PathBuf,

    /// Directory holding the last-played and default state files.
    #[arg(long, global = true, default_value = "state")]
    state_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play the frame directory until interrupted.
    #[command(
        about = "Loop frames on the display",
        after_help = "Examples:\n  framecast play\n  framecast play --framebuffer /dev/fb1 --fps 12 --duration 90\n  framecast play --video clip.mp4"
    )]
    Play {
        /// Target frames per second.
        #[arg(long, default_value_t = 15.0)]
        fps: f64,
        /// Frames decoded ahead of the display.
        #[arg(long, default_value_t = 15)]
        buffer: usize,
        /// Framebuffer device; plays headless when omitted.
        #[arg(long)]
        framebuffer: Option<PathBuf>,
        /// Sysfs directory describing the framebuffer (derived from the device by default).
        #[arg(long)]
        sysfs_dir: Option<PathBuf>,
        /// Backlight sysfs directory (/sys/class/backlight/<name>).
        #[arg(long)]
        backlight: Option<PathBuf>,
        /// Backlight level while playing, 0-100.
        #[arg(long, default_value_t = 50)]
        backlight_percent: u8,
        /// TrueType font for the status caption.
        #[arg(long)]
        font: Option<PathBuf>,
        /// Caption shown while converting.
        #[arg(long, default_value = "Processing...")]
        caption: String,
        /// Uploaded video to convert before playing (name inside --uploads).
        #[arg(long)]
        video: Option<String>,
        /// Converter executable.
        #[arg(long, default_value = "ffmpeg")]
        converter: PathBuf,
        /// Stop after this long (seconds, MM:SS, or HH:MM:SS).
        #[arg(long)]
        duration: Option<String>,
    },

    /// Convert a video into the frame directory.
    #[command(
        about = "Convert a video to frames",
        after_help = "Examples:\n  framecast convert uploads/clip.mp4\n  framecast convert clip.mp4 --frames /srv/frames --width 240 --height 240"
    )]
    Convert {
        /// Input video path.
        video: PathBuf,
        /// Converter executable.
        #[arg(long, default_value = "ffmpeg")]
        converter: PathBuf,
        #[arg(long, default_value_t = 320)]
        width: u32,
        #[arg(long, default_value_t = 240)]
        height: u32,
        #[arg(long, default_value_t = 15)]
        fps: u32,
    },

    /// List the frames the player would loop.
    #[command(about = "List resolved frames")]
    Frames {
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage uploaded videos.
    #[command(about = "Manage the video library")]
    Library {
        #[command(subcommand)]
        action: LibraryCommand,
    },

    /// Render the status image to a file.
    #[command(
        about = "Render the status image",
        after_help = "Examples:\n  framecast status-image --out status.png --font /usr/share/fonts/TTF/DejaVuSans.ttf"
    )]
    StatusImage {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 320)]
        width: u32,
        #[arg(long, default_value_t = 240)]
        height: u32,
        #[arg(long)]
        font: Option<PathBuf>,
        #[arg(long, default_value_t = 20.0)]
        font_size: f32,
        #[arg(long, default_value = "Processing...")]
        caption: String,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum LibraryCommand {
    /// List uploaded videos with their default / last-played markers.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Choose the video played at start-up.
    SetDefault { name: String },
    /// Forget the default video.
    ClearDefault,
    /// Delete an uploaded video.
    Delete { name: String },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return seconds_to_duration(seconds, trimmed);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    seconds_to_duration(total_seconds, trimmed)
}

fn seconds_to_duration(
    seconds: f64,
    original: &str,
) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|error| format!("time value out of range: {original} ({error})").into())
}

fn log_filter(global: &GlobalOptions) -> String {
    match (&global.log_level, global.verbose) {
        (Some(level), _) => level.clone(),
        (None, true) => "debug".to_string(),
        (None, false) => "info".to_string(),
    }
}

fn init_logging(global: &GlobalOptions) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(global)))
        .format_timestamp_millis()
        .init();
}

fn conversion_spinner(video: &Path) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")?);
    spinner.set_message(format!("converting {}", video.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let term = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                log::warn!("Cannot listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = term => {},
    }

    log::warn!("Shutdown signal received");
}

fn wait_for_shutdown(duration: Option<Duration>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = shutdown_signal() => {},
                    _ = tokio::time::sleep(duration) => log::info!("Playback duration elapsed"),
                }
            }
            None => shutdown_signal().await,
        }
    });

    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let library = VideoLibrary::new(&cli.global.uploads, &cli.global.state_dir);

    match cli.command {
        Commands::Play {
            fps,
            buffer,
            framebuffer,
            sysfs_dir,
            backlight,
            backlight_percent,
            font,
            caption,
            video,
            converter,
            duration,
        } => {
            let duration = duration.as_deref().map(parse_timecode).transpose()?;

            let mut options = PlaybackOptions::new()
                .with_frames_directory(&cli.global.frames)
                .with_target_fps(fps)
                .with_buffer_capacity(buffer)
                .with_backlight_percent(backlight_percent)
                .with_status_caption(caption);
            if font.is_some() {
                options = options.with_font(font);
            }

            let sink: Box<dyn DisplaySink> = match framebuffer {
                Some(device) => {
                    let mut panel = FramebufferDisplay::new(device);
                    if let Some(directory) = sysfs_dir {
                        panel = panel.with_sysfs_dir(directory);
                    }
                    if let Some(directory) = backlight {
                        panel = panel.with_backlight(directory);
                    }
                    Box::new(panel)
                }
                None => Box::new(HeadlessDisplay),
            };

            let signal = ConversionSignal::new();
            let engine = Arc::new(PlaybackEngine::new(options, sink, signal.clone())?);
            engine.start()?;

            let frames_empty = FrameSetResolver::new(&cli.global.frames)
                .resolve()
                .is_empty();
            let startup = match video {
                Some(name) => Some(name),
                None if frames_empty => library.startup_video(),
                None => None,
            };

            let conversion = match startup {
                Some(name) => {
                    let path = library.resolve(&name)?;
                    let engine = Arc::clone(&engine);
                    let library = library.clone();
                    let frames = cli.global.frames.clone();
                    let converter = FrameConverter::new().with_program(converter);
                    Some(thread::spawn(move || {
                        match converter.convert(&path, &frames, &signal, Some(engine.as_ref())) {
                            Ok(count) => {
                                log::info!("Playing {name} ({count} frames)");
                                if let Err(error) = library.set_last_played(&name) {
                                    log::warn!("Cannot record last played video: {error}");
                                }
                            }
                            Err(error) => log::error!("{error}"),
                        }
                    }))
                }
                None => None,
            };

            wait_for_shutdown(duration)?;
            engine.stop();

            if let Some(handle) = conversion {
                if !handle.is_finished() {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "conversion still running; exiting without waiting".yellow()
                    );
                }
            }
            println!("{} {}", "stopped".green().bold(), "playback finished");
        }
        Commands::Convert {
            video,
            converter,
            width,
            height,
            fps,
        } => {
            let converter = FrameConverter::new()
                .with_program(converter)
                .with_size(width, height)
                .with_fps(fps);
            let signal = ConversionSignal::new();

            let spinner = conversion_spinner(&video)?;
            let result = converter.convert(&video, &cli.global.frames, &signal, None);
            spinner.finish_and_clear();
            let count = result?;

            if let Some(name) = video.file_name().and_then(|name| name.to_str()) {
                if library.resolve(name).is_ok() {
                    library.set_last_played(name)?;
                }
            }

            println!(
                "{} Converted {} into {count} frame(s) in {}",
                "success:".green().bold(),
                video.display(),
                cli.global.frames.display()
            );
        }
        Commands::Frames { json } => {
            let frames = FrameSetResolver::new(&cli.global.frames).resolve();
            if json {
                let payload = json!({
                    "directory": cli.global.frames.display().to_string(),
                    "count": frames.len(),
                    "frames": frames
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if frames.is_empty() {
                println!("No frames in {}", cli.global.frames.display());
            } else {
                for path in frames.iter() {
                    println!("{}", path.display());
                }
                println!("{} frame(s)", frames.len());
            }
        }
        Commands::Library { action } => match action {
            LibraryCommand::List { json } => {
                let videos = library.list()?;
                let default_video = library.default_video();
                let last_played = library.last_played();
                if json {
                    let payload = json!({
                        "videos": videos,
                        "default": default_video,
                        "last_played": last_played,
                    });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                } else if videos.is_empty() {
                    println!("No videos in {}", library.uploads_directory().display());
                } else {
                    for name in &videos {
                        let mut markers = Vec::new();
                        if default_video.as_deref() == Some(name.as_str()) {
                            markers.push("default".cyan().to_string());
                        }
                        if last_played.as_deref() == Some(name.as_str()) {
                            markers.push("last played".cyan().to_string());
                        }
                        if markers.is_empty() {
                            println!("{name}");
                        } else {
                            println!("{name} ({})", markers.join(", "));
                        }
                    }
                }
            }
            LibraryCommand::SetDefault { name } => {
                library.set_default_video(&name)?;
                println!("{} {name}", "default".green().bold());
            }
            LibraryCommand::ClearDefault => {
                library.clear_default_video()?;
                println!("{}", "default cleared".green().bold());
            }
            LibraryCommand::Delete { name } => {
                library.delete(&name)?;
                println!("{} {name}", "deleted".green().bold());
            }
        },
        Commands::StatusImage {
            out,
            width,
            height,
            font,
            font_size,
            caption,
        } => {
            let font = font.unwrap_or_else(|| PathBuf::from(framecast::configuration::DEFAULT_FONT_PATH));
            let renderer = StatusRenderer::new(Some(font.as_path()), font_size);
            if !renderer.has_font() {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "font unavailable, rendering without caption".yellow()
                );
            }
            renderer.render(width, height, &caption).save(&out)?;
            println!("{} {}", "saved".green().bold(), out.display());
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framecast", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{GlobalOptions, log_filter, parse_timecode};

    fn global(verbose: bool, log_level: Option<&str>) -> GlobalOptions {
        GlobalOptions {
            verbose,
            log_level: log_level.map(str::to_string),
            frames: "frames".into(),
            uploads: "uploads".into(),
            state_dir: "state".into(),
        }
    }

    #[test]
    fn parse_timecode_formats() {
        let seconds = parse_timecode("75").unwrap();
        assert_eq!(seconds.as_secs(), 75);

        let mm_ss = parse_timecode("01:15").unwrap();
        assert_eq!(mm_ss.as_secs(), 75);

        let hh_mm_ss = parse_timecode("00:01:15.5").unwrap();
        assert_eq!(hh_mm_ss.as_secs(), 75);

        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn parse_timecode_rejects_unrepresentable_values() {
        assert!(parse_timecode("inf").is_err());
        assert!(parse_timecode("1e30").is_err());
        assert!(parse_timecode("00:00:1e30").is_err());
        assert_eq!(parse_timecode("-5").unwrap(), std::time::Duration::ZERO);
    }

    #[test]
    fn log_filter_precedence() {
        assert_eq!(log_filter(&global(false, None)), "info");
        assert_eq!(log_filter(&global(true, None)), "debug");
        assert_eq!(log_filter(&global(true, Some("warn"))), "warn");
    }
}

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use morse_beacon::audio;
use morse_beacon::cw::{self, TransmissionPlan};
use morse_beacon::flash::{FlashColor, TerminalLight};
use morse_beacon::{MonotonicClock, PlaybackController, Settings};

/// Time for the sound card to drain its buffer before the stream is closed
const OUTPUT_TAIL: Duration = Duration::from_millis(250);

#[derive(Default, Debug, Copy, Clone, ValueEnum)]
enum Level {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<Level> for log::LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => log::LevelFilter::Error,
            Level::Warn => log::LevelFilter::Warn,
            Level::Info => log::LevelFilter::Info,
            Level::Debug => log::LevelFilter::Debug,
            Level::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "morse-beacon")]
#[command(version)]
#[command(about = "Encode, decode and transmit Morse code as sound or light", long_about = None)]
struct Cli {
    /// Include source locations in log lines
    #[arg(short, long)]
    debug: bool,
    #[arg(short, long, default_value_t = Level::Warn)]
    #[clap(value_enum)]
    level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the Morse for some text
    Encode {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Turn Morse (space separated, `/` between words) back into text
    Decode {
        #[arg(required = true, allow_hyphen_values = true)]
        morse: Vec<String>,
    },
    /// Print the timed schedule for some text as JSON
    Plan {
        #[arg(long)]
        wpm: Option<u32>,
        /// Include silent gaps
        #[arg(long)]
        gaps: bool,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Send text as audio tones
    Play {
        #[command(flatten)]
        send: SendArgs,
        /// Tone frequency in Hz
        #[arg(long)]
        frequency: Option<f32>,
        /// Tone volume, 0.0 - 1.0
        #[arg(long)]
        volume: Option<f32>,
        /// Output device name (see `devices`)
        #[arg(long)]
        device: Option<String>,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Send text as light flashes in the terminal
    Flash {
        #[command(flatten)]
        send: SendArgs,
        #[arg(long)]
        color: Option<FlashColor>,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List audio output devices
    Devices,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    wpm: u32,
    #[serde(rename = "unit_ms", serialize_with = "cw::as_millis")]
    unit: Duration,
    #[serde(flatten)]
    plan: &'a TransmissionPlan,
}

#[derive(Args)]
struct SendArgs {
    /// Words per minute, 5 - 50
    #[arg(long)]
    wpm: Option<u32>,
    /// Remember these options for next time
    #[arg(long)]
    save: bool,
}

fn init_logging(cli: &Cli) {
    let mut builder = env_logger::Builder::new();
    builder.filter(None, cli.level.into());
    if cli.debug {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        });
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Command::Encode { text } => {
            let text = text.join(" ");
            let report = cw::encode_report(&text);
            if report.skipped > 0 {
                warn!("skipped {} unsupported characters", report.skipped);
            }
            println!("{}", cw::encode_to_string(&text));
        }
        Command::Decode { morse } => {
            println!("{}", cw::decode(&morse.join(" ")));
        }
        Command::Plan { wpm, gaps, text } => {
            let settings = Settings::load();
            let timing = cw::TimingModel::from_rate(wpm.unwrap_or(settings.wpm));
            let codes = cw::encode(&text.join(" "));
            let plan = if gaps {
                cw::plan_with_gaps(&codes, &timing)
            } else {
                cw::plan(&codes, &timing)
            };

            let out = PlanReport {
                wpm: timing.rate(),
                unit: timing.unit(),
                plan: &plan,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Play {
            send,
            frequency,
            volume,
            device,
            text,
        } => {
            let mut settings = Settings::load();
            if let Some(wpm) = send.wpm {
                settings.wpm = wpm;
            }
            if let Some(hz) = frequency {
                settings.tone_frequency = hz;
            }
            if let Some(v) = volume {
                settings.tone_volume = v;
            }
            if device.is_some() {
                settings.output_device = device;
            }
            if send.save {
                settings.save().context("saving settings")?;
            }

            let sink = audio::open_output(&settings.tone_config()).context("opening audio output")?;
            let controller = PlaybackController::new(
                Some(sink),
                Arc::new(TerminalLight::new()),
                Arc::new(MonotonicClock::new()),
            );
            transmit(&controller, &text.join(" "), &settings, |c| c.play(settings.wpm))?;
            thread::sleep(OUTPUT_TAIL);
        }
        Command::Flash { send, color, text } => {
            let mut settings = Settings::load();
            if let Some(wpm) = send.wpm {
                settings.wpm = wpm;
            }
            if let Some(color) = color {
                settings.flash_color = color;
            }
            if send.save {
                settings.save().context("saving settings")?;
            }

            let controller = PlaybackController::new(
                None,
                Arc::new(TerminalLight::new()),
                Arc::new(MonotonicClock::new()),
            );
            transmit(&controller, &text.join(" "), &settings, |c| {
                c.flash(settings.wpm, settings.flash_color)
            })?;
            eprintln!();
        }
        Command::Devices => {
            let devices = audio::list_output_devices();
            if devices.is_empty() {
                println!("no output devices found");
            }
            for name in devices {
                println!("{name}");
            }
        }
    }

    Ok(())
}

/// Load `text`, start the session and block until it has been sent
fn transmit<F>(controller: &PlaybackController, text: &str, settings: &Settings, start: F) -> Result<()>
where
    F: FnOnce(&PlaybackController) -> morse_beacon::Result<()>,
{
    let morse = controller.load(text);
    println!("{morse}");

    let total = cw::plan(&cw::encode(text), &settings.timing()).total_duration();
    info!("sending at {} WPM, {:?}", settings.timing().rate(), total);

    start(controller)?;
    if !controller.wait_idle(total + Duration::from_secs(2)) {
        warn!("transmission did not finish in time, stopping");
        controller.stop();
    }
    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sessioncam::{
    list_devices, plan_combinations, CaptureEngine, CaptureEvent, CaptureRequest, NokhwaDevice,
    SessionCamConfig,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "sessioncam-cli", version, about = "One-shot session camera capture")]
struct Cli {
    /// Configuration file; SESSIONCAM__* environment variables override it
    #[arg(long, global = true, env = "SESSIONCAM_CONFIG")]
    config: Option<PathBuf>,

    /// Capture immediately for this event when launched at session start
    #[arg(long, value_name = "EVENT")]
    startup_trigger: Option<CaptureEvent>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a single frame
    Capture(CaptureArgs),
    /// List cameras visible to the platform
    ListDevices {
        #[arg(long)]
        json: bool,
    },
    /// Print the combinations that would be tried, in order
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(clap::Args, Debug)]
struct CaptureArgs {
    /// Event tag recorded with the capture
    #[arg(long, default_value = "manual")]
    event: CaptureEvent,
    /// Where to write the JPEG
    #[arg(long, short)]
    output: Option<PathBuf>,
    #[arg(long)]
    camera: Option<u32>,
    /// Maximum output width; 0 disables resizing
    #[arg(long)]
    max_width: Option<u32>,
    /// JPEG quality between 0.0 and 1.0
    #[arg(long)]
    quality: Option<f64>,
    #[arg(long)]
    no_watermark: bool,
    /// Print full diagnostics as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionCamConfig> {
    let path = path.cloned().unwrap_or_else(SessionCamConfig::default_path);
    let config = SessionCamConfig::load_layered(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn hostname() -> String {
    ["COMPUTERNAME", "HOSTNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

async fn cmd_capture(config: &SessionCamConfig, args: CaptureArgs) -> Result<()> {
    let mut request = CaptureRequest::from_config(args.event, config, hostname());
    if let Some(camera) = args.camera {
        request = request.with_camera_index(camera);
    }
    if let Some(max_width) = args.max_width {
        request = request.with_max_width(max_width);
    }
    if let Some(quality) = args.quality {
        request = request.with_quality(quality);
    }
    if args.no_watermark {
        request.watermark_enabled = false;
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, cancelling capture");
        handler_token.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let engine = CaptureEngine::from_config(NokhwaDevice, config);
    let result = match engine.capture_once(&request, &cancel).await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => {
            eprintln!("Capture cancelled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let (Some(bytes), Some(path)) = (&result.image_bytes, &args.output) {
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        println!(
            "Captured {} bytes from {} via {} in {} attempt(s)",
            result.image_len(),
            result.camera_device_name,
            result.diagnostics.backend,
            result.diagnostics.attempts
        );
        if let Some(path) = &args.output {
            println!("Saved to {}", path.display());
        }
    }

    if !result.success {
        bail!(
            "capture failed ({}): {}",
            result.diagnostics.failure_code.as_deref().unwrap_or_default(),
            result.error_message.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_list_devices(json: bool) -> Result<()> {
    let devices = list_devices()?;
    if json {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for d in devices {
            println!("{}: {}", d.index, d.name.as_deref().unwrap_or("(unnamed)"));
        }
    }
    Ok(())
}

fn cmd_plan(config: &SessionCamConfig, json: bool) -> Result<()> {
    let combinations = plan_combinations(&config.negotiation);
    if json {
        let keys: Vec<String> = combinations.iter().map(|c| c.key()).collect();
        println!("{}", serde_json::to_string(&keys)?);
    } else {
        for (i, c) in combinations.iter().enumerate() {
            println!(
                "{:>2}. {} {} {} convert={}",
                i + 1,
                c.backend_name(),
                c.pixel_format,
                c.resolution,
                c.convert_rgb_mode
            );
        }
        println!(
            "{} combination(s) x {} attempt(s)",
            combinations.len(),
            config.negotiation.attempts_per_combination
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    sessioncam::init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match (cli.command, cli.startup_trigger) {
        (Some(Command::Capture(args)), _) => cmd_capture(&config, args).await,
        (Some(Command::ListDevices { json }), _) => cmd_list_devices(json),
        (Some(Command::Plan { json }), _) => cmd_plan(&config, json),
        (Some(Command::PrintConfig), _) => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        (None, Some(event)) => {
            let args = CaptureArgs {
                event,
                output: None,
                camera: None,
                max_width: None,
                quality: None,
                no_watermark: false,
                json: false,
            };
            cmd_capture(&config, args).await
        }
        (None, None) => bail!("no command given; try --help"),
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_core::gallery::{self, GalleryStore};
use vigil_core::{alert_log, frame, paths, select_profile};
use vigil_hw::Camera;
use vigil_recognizer::OnnxRecognizer;

mod enroll;

#[derive(Parser)]
#[command(name = "vigil", about = "Vigil surveillance CLI")]
struct Cli {
    /// Talk to the daemon on the system bus instead of the session bus
    #[arg(long, global = true)]
    system: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon and session status
    Status,
    /// Stop the running engine
    Stop,
    /// Show the most recent alerts
    Alerts {
        /// Number of alerts to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
        /// Alert log path (default: $VIGIL_ALERT_LOG or the data directory)
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Encode faces from images into the gallery
    Enroll {
        /// Label for every face (default: each image's file name)
        #[arg(short, long)]
        label: Option<String>,
        /// Prepended to every label (e.g. "AUG_" for augmented images)
        #[arg(long, default_value = "")]
        prefix: String,
        /// Image files or directories of images
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Run camera diagnostics
    Test {
        /// List capture devices instead of grabbing a frame
        #[arg(long)]
        list: bool,
        /// V4L2 device (default: $VIGIL_CAMERA_DEVICE or /dev/video0)
        #[arg(short, long)]
        device: Option<String>,
    },
}

#[zbus::proxy(
    interface = "org.vigil.Vigil1",
    default_service = "org.vigil.Vigil1",
    default_path = "/org/vigil/Vigil1"
)]
trait Vigil {
    async fn status(&self) -> zbus::Result<String>;
    async fn stop(&self) -> zbus::Result<bool>;
}

async fn connect(system: bool) -> Result<VigilProxy<'static>> {
    let conn = if system {
        zbus::Connection::system().await?
    } else {
        zbus::Connection::session().await?
    };
    VigilProxy::new(&conn).await.context("vigild is not reachable on D-Bus")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status => {
            let proxy = connect(cli.system).await?;
            let raw = proxy.status().await?;
            let status: serde_json::Value = serde_json::from_str(&raw)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Stop => {
            let proxy = connect(cli.system).await?;
            if proxy.stop().await? {
                println!("engine stopping");
            } else {
                println!("engine was not running");
            }
        }
        Commands::Alerts { limit, log } => {
            let path = log.unwrap_or_else(|| paths::env_path("VIGIL_ALERT_LOG", paths::default_alert_log));
            let records = alert_log::read_recent(&path, limit)
                .with_context(|| format!("cannot read {}", path.display()))?;
            if records.is_empty() {
                println!("No alerts recorded");
            }
            for record in records {
                let snapshot = record.snapshot.map(|s| format!("  [{s}]")).unwrap_or_default();
                println!("{}  {:<16}  {}{snapshot}", record.timestamp, record.key, record.message);
            }
        }
        Commands::Enroll { label, prefix, images } => {
            let model_dir = paths::env_path("VIGIL_MODEL_DIR", paths::default_model_dir);
            let store = GalleryStore::new(paths::env_path("VIGIL_GALLERY_PATH", paths::default_gallery_path));

            let images = enroll::collect_images(&images)?;
            println!("Encoding {} image(s) into {}", images.len(), store.path().display());

            let mut recognizer = OnnxRecognizer::load(&model_dir)?;
            let added = enroll::enroll(&mut recognizer, &store, &images, label.as_deref(), &prefix)?;
            if added == 0 {
                anyhow::bail!("no face encodings were found");
            }

            let faces = store.load()?;
            println!(
                "Added {added} encoding(s); gallery holds {} for: {}",
                faces.len(),
                gallery::labels(&faces).join(", ")
            );
        }
        Commands::Test { list, device } => {
            if list {
                let devices = Camera::list_devices();
                if devices.is_empty() {
                    println!("No V4L2 capture devices found");
                }
                for dev in devices {
                    println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
                }
                return Ok(());
            }

            let device = device
                .or_else(|| std::env::var("VIGIL_CAMERA_DEVICE").ok())
                .unwrap_or_else(|| "/dev/video0".to_string());
            println!("Running camera diagnostics on {device}...");

            let camera = Camera::open(&device)?;
            let captured = camera.capture_frame()?;
            let brightness = frame::mean_brightness(&captured.to_gray());
            let profile = select_profile(brightness);
            println!("  format:     {:?} ({:?})", camera.pixel_format(), camera.fourcc);
            println!("  frame:      {}x{}", captured.width(), captured.height());
            println!("  brightness: {brightness:.1}");
            println!(
                "  lighting:   {} (edge ≥ {}, vertical ≥ {}, colour std ≥ {}, tolerance {})",
                profile.bucket, profile.edge_density, profile.vertical_density, profile.color_std, profile.base_tolerance
            );
        }
    }

    Ok(())
}

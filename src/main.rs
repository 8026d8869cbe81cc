// src/main.rs
mod app;
mod ui;
mod video;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use std::path::PathBuf;
use tracing::{error, info};

use pinch_quiz::recognizer::{ReplaySource, SimulatedHands};
use pinch_quiz::{AppConfig, LandmarkSource, Page, Session};

use crate::video::CameraFeed;

#[derive(Parser, Debug)]
#[command(name = "pinch_quiz", about = "Pinch-and-dwell hand gesture quiz")]
struct Cli {
    /// Page to open: home, quiz, levels or ar
    #[arg(long, default_value = "home")]
    page: Page,

    /// JSON-lines hand recording to play instead of simulated hands
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Restart the recording when it ends
    #[arg(long = "loop")]
    looping: bool,

    /// Settings file (default: the per-user config.json, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write each session's selections and summary under this directory
    #[arg(long)]
    export: Option<PathBuf>,

    /// Camera device index
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Run without opening a camera
    #[arg(long)]
    no_camera: bool,
}

fn prepare_source(replay: Option<PathBuf>, looping: bool, stage: (f64, f64), page: Page) -> Result<Box<dyn LandmarkSource + Send>> {
    match replay {
        Some(path) => {
            let source = ReplaySource::from_path(&path)
                .with_context(|| format!("Failed to load recording {}", path.display()))?
                .looping(looping);
            info!("Replaying {} ms of recorded hands", source.duration_ms());
            Ok(Box::new(source))
        }
        None => {
            info!("No recording given, using simulated hands");
            Ok(Box::new(SimulatedHands::new(stage).with_left_hand(page == Page::Ar)))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.export.is_some() {
        config.output_dir = args.export.clone();
    }
    let page = args.page;

    // Open the camera while the landmark source loads.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let stage = config.video.stage();
    let (camera, source) = runtime.block_on(async {
        let replay = args.replay.clone();
        let looping = args.looping;
        let source_task =
            tokio::task::spawn_blocking(move || prepare_source(replay, looping, stage, page));

        let camera = if args.no_camera {
            info!("Running without a camera");
            None
        } else {
            match CameraFeed::open(args.camera, &config.video) {
                Ok(camera) => Some(camera),
                Err(e) => {
                    error!("Camera setup failed: {:#}", e);
                    return Err(e.context("Camera unavailable (use --no-camera to run without one)"));
                }
            }
        };

        let source = source_task.await.context("Landmark source task panicked")??;
        Ok::<_, anyhow::Error>((camera, source))
    })?;

    let session = Session::new(page, &config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([960.0, 600.0]),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        "Pinch Quiz",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(ui::create_visuals());
            Box::new(app::PinchQuizApp::new(config, session, camera, source))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Error running application: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_and_flags() {
        let cli = Cli::try_parse_from(["pinch_quiz"]).unwrap();
        assert_eq!(cli.page, Page::Home);
        assert!(cli.export.is_none());
        assert!(!cli.no_camera);

        let cli = Cli::try_parse_from([
            "pinch_quiz", "--page", "Levels", "--replay", "hands.jsonl", "--loop", "--export", "out", "--camera", "2",
        ])
        .unwrap();
        assert_eq!(cli.page, Page::Levels);
        assert_eq!(cli.replay, Some(PathBuf::from("hands.jsonl")));
        assert!(cli.looping);
        assert_eq!(cli.export, Some(PathBuf::from("out")));
        assert_eq!(cli.camera, 2);
    }

    #[test]
    fn cli_rejects_unknown_page() {
        assert!(Cli::try_parse_from(["pinch_quiz", "--page", "lobby"]).is_err());
    }
}

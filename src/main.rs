use clap::Parser;
use colored::*;

mod args;
mod camera;
mod output;

use args::Args;
use camera::CameraSource;
use chrono::Local;
use output::WindowOutput;
use proctor_eyes::config::AppConfig;
use proctor_eyes::debounce::SnapshotStore;
use proctor_eyes::event_log::CsvEventLog;
use proctor_eyes::presenter::{AlertSound, WarningPresenter};
use proctor_eyes::session::{Monitor, SessionContext};
use proctor_eyes::warning::WarningStep;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("proctor_eyes=info,ort=warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    if args.list {
        return camera::list_cameras();
    }

    if args.write_config {
        AppConfig::default().save(&args.config)?;
        println!("{}", format!("Wrote default configuration to {}", args.config.display()).green());
        return Ok(());
    }

    // 0. Load Config
    let config = AppConfig::load(&args.config)?;

    // 1. Setup Camera (fatal if it cannot be opened)
    let mut camera = CameraSource::new(args.cam_index as usize)?;

    // 2. Setup Outputs
    let snapshots = SnapshotStore::new(&config.paths.log_dir)?;
    let event_log = CsvEventLog::open(&config.paths.csv_log)?;
    tracing::info!(
        "Snapshots in {}, events in {}",
        snapshots.dir().display(),
        event_log.path().display()
    );

    // 3. Setup Inference
    let classifiers = proctor_eyes::build_classifiers(&config)?;
    let mut monitor = Monitor::new(classifiers, event_log, snapshots);

    let mut window = WindowOutput::new("Combined Detection", camera.width() as usize, camera.height() as usize)?;
    let mut presenter = WarningPresenter::new(AlertSound::new(&config.paths.alert_sound));

    println!("{}", "Calibrating... Keep your head straight".yellow());
    println!("Controls: [q] Quit");

    // 4. Loop
    let mut ctx = SessionContext::new(Local::now(), &config.timing);
    while window.is_open() {
        let mut frame = match camera.capture() {
            Ok(f) => f,
            Err(e) => {
                tracing::error!("Error: {:#}", e);
                break;
            }
        };

        let report = monitor.process_frame(&mut ctx, &mut frame, Local::now())?;
        for path in &report.snapshots {
            println!("{}", format!("Snapshot saved: {}", path.display()).red());
        }

        if report.warning == WarningStep::Presenting {
            let warning = presenter.present(&frame);
            window.show(&warning)?;
        } else if report.warning.suppresses_display() {
            // Arming frame: neither the frame nor the warning is shown
            window.poll();
        } else {
            window.show(&frame)?;
        }

        if window.quit_requested() {
            break;
        }
    }

    Ok(())
}

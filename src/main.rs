use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use pathplay::{
    init_logging, interpret_with, interpreter_options, playback_config, stock_removal, Config,
    PlaybackDriver, PlaybackObserver, PlaybackStatus, Point3, ProgramSummary, Simulator,
    SettingsStore, BUILD_DATE, VERSION,
};

/// Interpret a G-code program and optionally play it back
#[derive(Parser, Debug)]
#[command(name = "pathplay", version, about)]
struct Args {
    /// G-code program to interpret
    file: PathBuf,

    /// Playback speed in mm/s (defaults to the configured speed)
    #[arg(long)]
    speed: Option<f64>,

    /// Configuration file (JSON or TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the segment log as JSON
    #[arg(long)]
    json: bool,

    /// Play the toolpath back on the playback timer
    #[arg(long)]
    play: bool,
}

/// Logs what a renderer would draw
struct LogObserver;

impl PlaybackObserver for LogObserver {
    fn on_status_changed(&mut self, status: PlaybackStatus) {
        info!("Playback {}", status);
    }

    fn on_operation_changed(&mut self, operation_index: usize, label: &str) {
        info!("Operation {} ({})", operation_index, label);
    }

    fn on_marker_moved(&mut self, position: Point3, _operation_index: usize) {
        tracing::trace!("Marker at {}", position);
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => match SettingsStore::open_default() {
            Ok(store) => Ok(store.config().clone()),
            Err(err) => {
                warn!("Using default settings: {}", err);
                Ok(Config::default())
            }
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Args::parse();
    debug!("pathplay {} built {}", VERSION, BUILD_DATE);

    let mut config = load_config(args.config.as_ref())?;
    if let Some(speed) = args.speed {
        config.playback.default_speed = speed;
    }

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    info!("Interpreting {}", args.file.display());
    let run = interpret_with(&text, interpreter_options(&config));
    let summary = ProgramSummary::new(&run);

    if args.json {
        let dump = serde_json::json!({
            "summary": &summary,
            "segments": &run.log,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
    } else {
        println!("{}", summary);
    }

    if args.play {
        if run.log.is_empty() {
            warn!("Nothing to play");
        } else {
            play(run.log.clone(), &config).await?;
        }
    }

    if let Some(err) = run.outcome.error() {
        anyhow::bail!("interpretation failed: {}", err);
    }
    Ok(())
}

async fn play(log: pathplay::SegmentLog, config: &Config) -> anyhow::Result<()> {
    let mut simulator = Simulator::with_log(playback_config(config), log);
    simulator.add_observer(Box::new(LogObserver));
    let removal = if config.playback.removal_interval > 0 {
        let removal = stock_removal(config)?;
        let stock = removal.stock();
        simulator.set_material_removal(Box::new(removal), config.playback.removal_interval);
        Some(stock)
    } else {
        None
    };

    let mut driver = PlaybackDriver::spawn(simulator);
    let mut snapshots = driver.subscribe();
    driver.start(config.playback.default_speed).await?;

    let mut next_report = 0.1;
    loop {
        if snapshots.changed().await.is_err() {
            break;
        }
        let snapshot = snapshots.borrow_and_update().clone();
        if snapshot.progress >= next_report {
            info!("{:.0}% complete", snapshot.progress * 100.0);
            while next_report <= snapshot.progress {
                next_report += 0.1;
            }
        }
        if snapshot.status == PlaybackStatus::Stopped
            && snapshot.segment_index >= snapshot.segment_count
        {
            break;
        }
    }
    driver.close().await?;

    if let Some(stock) = removal {
        let stock = stock.lock();
        info!(
            "Removed {} of {} voxels",
            stock.removed_count(),
            stock.cell_count()
        );
    }
    Ok(())
}

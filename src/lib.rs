//! # PathPlay
//!
//! A G-code motion interpreter and time-domain toolpath playback simulator:
//! - Interprets G0-G3 motion, G81/G83 canned cycles, labels, R registers and REPEAT loops
//! - Produces an append-only log of rapid and feed segments
//! - Plays the log back on a fixed timer, optionally cutting a voxel stock
//!
//! ## Architecture
//!
//! PathPlay is organized as a workspace with multiple crates:
//!
//! 1. **pathplay-core** - Geometry types, constants and errors
//! 2. **pathplay-gcode** - Tokenizer, modal state, motion, cycles and the interpreter
//! 3. **pathplay-simulator** - Playback engine, material removal and the async driver
//! 4. **pathplay-settings** - Configuration files
//! 5. **pathplay** - CLI that ties the crates together

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

pub use pathplay_core::{Bounds3, Error, GcodeError, Point3, Result, SimulationError};
pub use pathplay_gcode::{
    interpret, interpret_with, Interpretation, InterpreterOptions, Program, RunOutcome, Segment,
    SegmentKind, SegmentLog,
};
pub use pathplay_settings::{Config, SettingsError, SettingsStore};
pub use pathplay_simulator::{
    BallTool, Operation, PlaybackConfig, PlaybackDriver, PlaybackObserver, PlaybackSnapshot,
    PlaybackStatus, Simulator, StockRemoval, VoxelStock,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr, so stdout stays clean for summaries and JSON
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Interpreter options from the `[interpreter]` settings
pub fn interpreter_options(config: &Config) -> InterpreterOptions {
    InterpreterOptions {
        arc_step_degrees: config.interpreter.arc_step_degrees,
        max_repeat_depth: config.interpreter.max_repeat_depth,
        ..InterpreterOptions::default()
    }
}

/// Playback configuration from the `[playback]` settings
pub fn playback_config(config: &Config) -> PlaybackConfig {
    PlaybackConfig {
        tick_interval: config.playback.tick_interval(),
        speed: config.playback.default_speed,
        removal_interval: config.playback.removal_interval,
    }
}

/// Ball tool and voxel block from the `[stock]` settings
pub fn stock_removal(
    config: &Config,
) -> std::result::Result<StockRemoval<BallTool, VoxelStock>, SimulationError> {
    let stock = &config.stock;
    let voxels = VoxelStock::new(
        (stock.width, stock.height, stock.depth),
        Point3::new(stock.origin[0], stock.origin[1], stock.origin[2]),
        stock.resolution,
    )?;
    let tool = BallTool::new(stock.tool_radius)?;
    Ok(StockRemoval::new(tool, Arc::new(Mutex::new(voxels))))
}

/// Printable digest of one interpretation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramSummary {
    pub segments: usize,
    pub rapids: usize,
    pub feeds: usize,
    pub total_length: f64,
    pub rapid_length: f64,
    pub feed_length: f64,
    pub bounds: Option<Bounds3>,
    pub outcome: String,
}

impl ProgramSummary {
    pub fn new(run: &Interpretation) -> Self {
        let log = &run.log;
        let outcome = match &run.outcome {
            RunOutcome::Completed => "completed".to_string(),
            RunOutcome::Halted { line } => format!("halted at line {}", line),
            RunOutcome::Failed(err) => format!("failed: {}", err),
        };
        Self {
            segments: log.len(),
            rapids: log.count_of(SegmentKind::Rapid),
            feeds: log.count_of(SegmentKind::Feed),
            total_length: log.total_length(),
            rapid_length: log.rapid_length(),
            feed_length: log.feed_length(),
            bounds: log.bounds(),
            outcome,
        }
    }
}

impl std::fmt::Display for ProgramSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "segments: {} ({} rapid, {} feed)",
            self.segments, self.rapids, self.feeds
        )?;
        writeln!(
            f,
            "length:   {:.3} mm ({:.3} rapid, {:.3} feed)",
            self.total_length, self.rapid_length, self.feed_length
        )?;
        if let Some(bounds) = &self.bounds {
            writeln!(f, "bounds:   {} .. {}", bounds.min, bounds.max)?;
        }
        write!(f, "outcome:  {}", self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_program() {
        let run = interpret("G0 X0 Y0 Z5\nG1 Z0\nG1 X10\nM30");
        let summary = ProgramSummary::new(&run);
        assert_eq!(summary.segments, 3);
        assert_eq!(summary.rapids, 1);
        assert_eq!(summary.feeds, 2);
        assert!((summary.feed_length - 15.0).abs() < 1e-9);
        assert_eq!(summary.outcome, "halted at line 4");
    }

    #[test]
    fn test_summary_reports_failure() {
        let run = interpret("G1 X1\nREPEAT NOWHERE");
        let summary = ProgramSummary::new(&run);
        assert_eq!(summary.segments, 1);
        assert!(summary.outcome.starts_with("failed"));
    }

    #[test]
    fn test_settings_map_to_runtime_options() {
        let mut config = Config::default();
        config.interpreter.arc_step_degrees = 2.5;
        config.playback.tick_interval_ms = 50;
        config.playback.removal_interval = 3;

        let options = interpreter_options(&config);
        assert_eq!(options.arc_step_degrees, 2.5);
        assert_eq!(options.operation_index, 0);

        let playback = playback_config(&config);
        assert_eq!(playback.tick_interval, std::time::Duration::from_millis(50));
        assert_eq!(playback.removal_interval, 3);
    }

    #[test]
    fn test_config_file_drives_arc_subdivision() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pathplay.toml");
        std::fs::write(&path, "[interpreter]\narc_step_degrees = 45.0\n").unwrap();
        let config = Config::load_from_file(&path).unwrap();

        // half circle from (10,0) to (-10,0) around the origin
        let program = "G0 X10 Y0\nG3 X-10 Y0 I-10 J0";
        let coarse = interpret_with(program, interpreter_options(&config));
        assert_eq!(coarse.outcome, RunOutcome::Completed);
        assert_eq!(coarse.log.count_of(SegmentKind::Feed), 4);

        let fine = interpret_with(program, interpreter_options(&Config::default()));
        assert_eq!(fine.log.count_of(SegmentKind::Feed), 36);
    }

    #[test]
    fn test_configured_playback_runs_program_to_end() {
        let mut config = Config::default();
        config.playback.tick_interval_ms = 100;
        config.playback.default_speed = 50.0;

        let run = interpret_with("G1 X10\nG1 Y10\nM30", interpreter_options(&config));
        let mut sim = Simulator::with_log(playback_config(&config), run.log);
        sim.start(config.playback.default_speed).unwrap();
        // 5 mm per tick over 20 mm of path
        for _ in 0..4 {
            sim.on_timer();
        }
        assert_eq!(sim.progress(), 1.0);
        assert_eq!(sim.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_stock_removal_from_defaults() {
        let removal = stock_removal(&Config::default()).unwrap();
        assert_eq!(removal.stock().lock().removed_count(), 0);
    }
}

//! Playback state types

use pathplay_core::Point3;
use pathplay_gcode::SegmentLog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pathplay_core::constants::{DEFAULT_PLAYBACK_SPEED, DEFAULT_TICK_INTERVAL_MS};

/// Player status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running => write!(f, "Running"),
            Self::Paused => write!(f, "Paused"),
        }
    }
}

/// One machining operation: a label plus its own segment log
///
/// The log is shared read-only, so several players may hold the same one.
#[derive(Debug, Clone)]
pub struct Operation {
    pub label: String,
    pub log: Arc<SegmentLog>,
}

impl Operation {
    pub fn new(label: impl Into<String>, log: impl Into<Arc<SegmentLog>>) -> Self {
        Self {
            label: label.into(),
            log: log.into(),
        }
    }
}

/// Player tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Fixed timer interval
    pub tick_interval: Duration,
    /// Speed used until `start` or `set_speed` says otherwise, mm/s
    pub speed: f64,
    /// Run material removal every Nth marker update (0 disables it)
    pub removal_interval: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            speed: DEFAULT_PLAYBACK_SPEED,
            removal_interval: 0,
        }
    }
}

/// Read-only view of the player, published to renderers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    /// Index of the segment under the cursor, `segment_count` once finished
    pub segment_index: usize,
    /// Distance travelled along the current segment, mm
    pub distance_along: f64,
    pub segment_count: usize,
    pub speed: f64,
    /// Visible marker position, `None` when hidden
    pub marker: Option<Point3>,
    pub operation_index: usize,
    pub operation_label: Option<String>,
    /// Fraction of the total path length covered, 0..=1
    pub progress: f64,
}

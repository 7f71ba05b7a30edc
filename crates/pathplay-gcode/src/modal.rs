//! Modal state tracking
//!
//! Tracks the modal groups this interpreter understands:
//! - Distance mode (G90, G91)
//! - Cutter compensation (G40, G41, G42) - recorded, never applied to geometry
//! - Canned cycle (G80, G81, G83)
//! - Current tool position, feed rate and spindle speed

use pathplay_core::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance mode - G90/G91
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Positioning {
    #[default]
    Absolute,
    Incremental,
}

/// Cutter compensation - G40/G41/G42
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compensation {
    #[default]
    Off,
    Left,
    Right,
}

/// Active canned cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CannedCycle {
    #[default]
    None,
    /// G81: feed to `z`, rapid back to `r`
    Simple { z: f64, r: f64 },
    /// G83: peck to `z` in steps of `q`, rapid back to `r` after each peck
    Peck { z: f64, r: f64, q: f64 },
}

impl CannedCycle {
    /// True unless the cycle is [`CannedCycle::None`]
    pub fn is_active(&self) -> bool {
        !matches!(self, CannedCycle::None)
    }

    /// Retract height of the active cycle
    pub fn retract(&self) -> Option<f64> {
        match self {
            CannedCycle::None => None,
            CannedCycle::Simple { r, .. } | CannedCycle::Peck { r, .. } => Some(*r),
        }
    }
}

impl fmt::Display for CannedCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "G80"),
            Self::Simple { z, r } => write!(f, "G81 Z{} R{}", z, r),
            Self::Peck { z, r, q } => write!(f, "G83 Z{} R{} Q{}", z, r, q),
        }
    }
}

/// Interpreter modal state
///
/// Exactly one instance lives for an interpretation run. Settings persist
/// across lines until explicitly changed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModalState {
    /// Distance mode
    pub positioning: Positioning,
    /// Cutter compensation side
    pub compensation: Compensation,
    /// Active canned cycle
    pub cycle: CannedCycle,
    /// Current tool position
    pub position: Point3,
    /// Last programmed feed rate (F)
    pub feed_rate: Option<f64>,
    /// Last programmed spindle speed (S)
    pub spindle_speed: Option<f64>,
}

impl ModalState {
    /// Create a modal state starting at `position`
    pub fn at(position: Point3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Apply a non-motion G code. Returns `false` if the code is not modal here.
    pub fn apply_modal_code(&mut self, code: u32) -> bool {
        match code {
            90 => self.positioning = Positioning::Absolute,
            91 => self.positioning = Positioning::Incremental,
            40 => self.compensation = Compensation::Off,
            41 => self.compensation = Compensation::Left,
            42 => self.compensation = Compensation::Right,
            80 => self.cycle = CannedCycle::None,
            _ => return false,
        }
        true
    }

    /// Resolve one axis word against its current value
    pub fn resolve_axis(&self, current: f64, raw: Option<f64>) -> f64 {
        match (raw, self.positioning) {
            (None, _) => current,
            (Some(value), Positioning::Absolute) => value,
            (Some(value), Positioning::Incremental) => current + value,
        }
    }

    /// Resolve an X/Y/Z target; omitted axes keep their current value
    pub fn resolve_target(&self, x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Point3 {
        Point3 {
            x: self.resolve_axis(self.position.x, x),
            y: self.resolve_axis(self.position.y, y),
            z: self.resolve_axis(self.position.z, z),
        }
    }
}

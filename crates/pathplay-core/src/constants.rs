//! Numeric constants shared by the interpreter and the player.

/// Largest angular step (degrees) of one arc sub-segment.
pub const ARC_STEP_DEGREES: f64 = 5.0;

/// Radii at or below this are treated as degenerate arcs.
pub const MIN_ARC_RADIUS: f64 = 1e-12;

/// Tolerance used when comparing resolved coordinates.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Segments shorter than this are skipped during playback.
pub const ZERO_LENGTH_EPSILON: f64 = 1e-12;

/// Default playback timer interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 30;

/// Default playback speed in mm/s.
pub const DEFAULT_PLAYBACK_SPEED: f64 = 10.0;

/// Default limit on nested REPEAT frames.
pub const DEFAULT_MAX_REPEAT_DEPTH: usize = 64;

/// Upper bound on the pecks one G83 trigger may expand into.
pub const MAX_PECK_COUNT: usize = 10_000;

/// Largest accepted arc step in degrees.
pub const MAX_ARC_STEP_DEGREES: f64 = 90.0;

//! Motion resolver
//!
//! Turns G0/G1/G2/G3 targets into linear segments. Arcs are subdivided into
//! chords of at most `step_degrees` each; Z is interpolated linearly along
//! the sweep so helical moves come out as a continuous chain.

use pathplay_core::constants::{ARC_STEP_DEGREES, GEOMETRY_EPSILON, MAX_ARC_STEP_DEGREES, MIN_ARC_RADIUS};
use pathplay_core::Point3;
use std::f64::consts::TAU;

use crate::segment::{Segment, SegmentKind, SegmentTag};

/// Arc direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// G2
    Clockwise,
    /// G3
    CounterClockwise,
}

/// How the arc center was programmed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcCenter {
    /// I/J offsets from the start point
    Offset { i: f64, j: f64 },
    /// R radius
    Radius(f64),
    /// Neither I/J nor R given
    Missing,
}

/// Why an arc collapsed to a straight line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearFallback {
    DegenerateRadius,
    UnresolvedCenter,
    MissingCenter,
}

/// Result of resolving one arc command
#[derive(Debug, Clone, PartialEq)]
pub enum ArcPath {
    /// Subdivided arc; `points` excludes the start and ends exactly on the target
    Arc {
        center: (f64, f64),
        radius: f64,
        sweep: f64,
        points: Vec<Point3>,
    },
    /// Start and end share XY but differ in Z
    Vertical,
    /// Start equals end
    Stationary,
    /// Emit one straight feed move instead
    Linear(LinearFallback),
}

impl ArcPath {
    /// Feed segments for this path starting at `start`
    pub fn segments(&self, start: Point3, end: Point3, tag: SegmentTag) -> Vec<Segment> {
        match self {
            ArcPath::Arc { points, .. } => {
                let mut from = start;
                points
                    .iter()
                    .map(|&to| {
                        let segment = tag.segment(SegmentKind::Feed, from, to);
                        from = to;
                        segment
                    })
                    .collect()
            }
            ArcPath::Vertical | ArcPath::Linear(_) => {
                vec![tag.segment(SegmentKind::Feed, start, end)]
            }
            ArcPath::Stationary => Vec::new(),
        }
    }
}

/// Usable arc step in degrees: clamped to at most 90, default for non-positive or non-finite input
pub fn arc_step(step_degrees: f64) -> f64 {
    if step_degrees.is_finite() && step_degrees > 0.0 {
        step_degrees.min(MAX_ARC_STEP_DEGREES)
    } else {
        ARC_STEP_DEGREES
    }
}

/// Normalize `end_angle - start_angle` so CCW is in `(0, 2π]` and CW in `[-2π, 0)`
pub fn normalize_sweep(start_angle: f64, end_angle: f64, direction: ArcDirection) -> f64 {
    let mut sweep = end_angle - start_angle;
    match direction {
        ArcDirection::CounterClockwise => {
            while sweep <= 0.0 {
                sweep += TAU;
            }
            while sweep > TAU {
                sweep -= TAU;
            }
        }
        ArcDirection::Clockwise => {
            while sweep >= 0.0 {
                sweep -= TAU;
            }
            while sweep < -TAU {
                sweep += TAU;
            }
        }
    }
    sweep
}

/// Signed angular sweep from `start` to `end` about `center`
pub fn arc_sweep(start: Point3, end: Point3, center: (f64, f64), direction: ArcDirection) -> f64 {
    let start_angle = (start.y - center.1).atan2(start.x - center.0);
    let end_angle = (end.y - center.1).atan2(end.x - center.0);
    normalize_sweep(start_angle, end_angle, direction)
}

/// The two centers at distance `radius` from both points (two-circle intersection)
pub fn centers_from_radius(start: Point3, end: Point3, radius: f64) -> Option<[(f64, f64); 2]> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let chord = dx.hypot(dy);
    if chord <= GEOMETRY_EPSILON || !radius.is_finite() {
        return None;
    }
    let half = chord / 2.0;
    if radius < half - GEOMETRY_EPSILON {
        return None;
    }
    let h = (radius * radius - half * half).max(0.0).sqrt();
    let (mx, my) = ((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
    let (ux, uy) = (-dy / chord, dx / chord);
    Some([(mx + ux * h, my + uy * h), (mx - ux * h, my - uy * h)])
}

/// Pick the radius-form center giving the smaller absolute sweep
pub fn center_from_radius(
    start: Point3,
    end: Point3,
    radius: f64,
    direction: ArcDirection,
) -> Option<(f64, f64)> {
    let [a, b] = centers_from_radius(start, end, radius.abs())?;
    let sweep_a = arc_sweep(start, end, a, direction).abs();
    let sweep_b = arc_sweep(start, end, b, direction).abs();
    Some(if sweep_a <= sweep_b { a } else { b })
}

/// Resolve an arc command into a path
pub fn resolve_arc(
    start: Point3,
    end: Point3,
    center: ArcCenter,
    direction: ArcDirection,
    step_degrees: f64,
) -> ArcPath {
    if start.same_xy(&end) {
        return if (start.z - end.z).abs() <= GEOMETRY_EPSILON {
            ArcPath::Stationary
        } else {
            ArcPath::Vertical
        };
    }

    let center = match center {
        ArcCenter::Offset { i, j } => (start.x + i, start.y + j),
        ArcCenter::Radius(r) => match center_from_radius(start, end, r, direction) {
            Some(c) => c,
            None => return ArcPath::Linear(LinearFallback::UnresolvedCenter),
        },
        ArcCenter::Missing => return ArcPath::Linear(LinearFallback::MissingCenter),
    };

    let radius = (start.x - center.0).hypot(start.y - center.1);
    if radius <= MIN_ARC_RADIUS {
        return ArcPath::Linear(LinearFallback::DegenerateRadius);
    }

    let start_angle = (start.y - center.1).atan2(start.x - center.0);
    let sweep = arc_sweep(start, end, center, direction);
    let step = arc_step(step_degrees).to_radians();
    let steps = ((sweep.abs() / step) - 1e-9).ceil().max(1.0) as usize;

    let points = (1..=steps)
        .map(|i| {
            if i == steps {
                return end;
            }
            let t = i as f64 / steps as f64;
            let angle = start_angle + sweep * t;
            Point3 {
                x: center.0 + radius * angle.cos(),
                y: center.1 + radius * angle.sin(),
                z: start.z + (end.z - start.z) * t,
            }
        })
        .collect();

    ArcPath::Arc {
        center,
        radius,
        sweep,
        points,
    }
}

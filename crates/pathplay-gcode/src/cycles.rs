//! Canned-cycle expander
//!
//! Expands one G81/G83 trigger at an XY position into plunge and retract
//! segments. Cycle depth `z` and retract height `r` are absolute.

use pathplay_core::constants::MAX_PECK_COUNT;
use pathplay_core::{GcodeError, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modal::CannedCycle;
use crate::segment::{Segment, SegmentKind, SegmentLog, SegmentTag};

/// Hole position supplied by upstream geometry instead of program text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HolePosition {
    pub x: f64,
    pub y: f64,
}

impl HolePosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Expand one trigger of `cycle` at `(x, y)` starting from `from`
///
/// `text` is the raw line used if the peck depth is rejected. An inactive
/// cycle yields no segments.
pub fn expand_cycle(
    cycle: &CannedCycle,
    from: Point3,
    x: f64,
    y: f64,
    tag: SegmentTag,
    text: &str,
) -> Result<Vec<Segment>, GcodeError> {
    match *cycle {
        CannedCycle::None => Ok(Vec::new()),
        CannedCycle::Simple { z, r } => {
            let bottom = Point3 { x, y, z };
            let retract = Point3 { x, y, z: r };
            Ok(vec![
                tag.segment(SegmentKind::Feed, from, bottom),
                tag.segment(SegmentKind::Rapid, bottom, retract),
            ])
        }
        CannedCycle::Peck { z, r, q } => {
            let invalid = || GcodeError::InvalidPeckDepth {
                line_number: tag.line,
                depth: q,
                text: text.to_string(),
            };
            if !q.is_finite() || q <= 0.0 {
                return Err(invalid());
            }
            let count = peck_count(from.z, z, q).ok_or_else(invalid)?;
            peck(from, x, y, z, r, q, count, tag).ok_or_else(invalid)
        }
    }
}

/// Number of pecks from `top` down to `z`, or `None` past [`MAX_PECK_COUNT`]
fn peck_count(top: f64, z: f64, q: f64) -> Option<usize> {
    let count = ((top - z) / q).ceil().max(1.0);
    if !count.is_finite() || count > MAX_PECK_COUNT as f64 {
        return None;
    }
    Some(count as usize)
}

/// Pecks at `top - q*k` clamped to `z`; `None` if a peck would not go deeper
#[allow(clippy::too_many_arguments)]
fn peck(
    from: Point3,
    x: f64,
    y: f64,
    z: f64,
    r: f64,
    q: f64,
    count: usize,
    tag: SegmentTag,
) -> Option<Vec<Segment>> {
    let retract = Point3 { x, y, z: r };
    let mut segments = Vec::with_capacity(count * 2);
    let mut position = from;
    let mut last = from.z;

    for k in 1..=count {
        let depth = if k == count {
            z
        } else {
            (from.z - q * k as f64).max(z)
        };
        if depth >= last && last > z {
            return None;
        }
        let bottom = Point3 { x, y, z: depth };
        segments.push(tag.segment(SegmentKind::Feed, position, bottom));
        segments.push(tag.segment(SegmentKind::Rapid, bottom, retract));
        position = retract;
        last = depth;
        if depth <= z {
            break;
        }
    }

    debug!("G83 expanded into {} pecks", segments.len() / 2);
    Some(segments)
}

/// Build a segment log for a list of holes without going through program text
pub fn drill_segments(
    holes: &[HolePosition],
    cycle: &CannedCycle,
    start: Point3,
) -> Result<SegmentLog, GcodeError> {
    let text = cycle.to_string();
    let mut log = SegmentLog::new();
    let mut position = start;

    for hole in holes {
        for segment in expand_cycle(cycle, position, hole.x, hole.y, SegmentTag::default(), &text)? {
            position = segment.end;
            log.push(segment);
        }
    }

    Ok(log)
}

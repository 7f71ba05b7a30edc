//! Motion segments and the append-only segment log

use pathplay_core::constants::ZERO_LENGTH_EPSILON;
use pathplay_core::{Bounds3, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of straight-line motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Non-cutting repositioning (G0, cycle retracts)
    Rapid,
    /// Cutting move (G1, G2/G3 sub-segments, cycle plunges)
    Feed,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rapid => write!(f, "Rapid"),
            Self::Feed => write!(f, "Feed"),
        }
    }
}

/// One atomic straight-line motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: Point3,
    pub end: Point3,
    /// Index of the operation this segment belongs to
    pub operation_index: usize,
    /// 1-based source line that produced the segment (0 when not from text)
    pub line: usize,
}

impl Segment {
    pub fn new(kind: SegmentKind, start: Point3, end: Point3) -> Self {
        Self {
            kind,
            start,
            end,
            operation_index: 0,
            line: 0,
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    pub fn is_zero_length(&self) -> bool {
        self.length() <= ZERO_LENGTH_EPSILON
    }

    /// Point at `distance` mm from the start, clamped to the segment
    pub fn point_at_distance(&self, distance: f64) -> Point3 {
        let length = self.length();
        if length <= ZERO_LENGTH_EPSILON {
            return self.end;
        }
        self.start.lerp(&self.end, (distance / length).clamp(0.0, 1.0))
    }
}

/// Provenance stamped onto every segment an interpreter step produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentTag {
    pub operation_index: usize,
    pub line: usize,
}

impl SegmentTag {
    pub fn segment(&self, kind: SegmentKind, start: Point3, end: Point3) -> Segment {
        Segment {
            kind,
            start,
            end,
            operation_index: self.operation_index,
            line: self.line,
        }
    }
}

/// Ordered, append-only list of segments in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentLog {
    segments: Vec<Segment>,
}

impl SegmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a pre-built segment list supplied by an upstream collaborator
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub(crate) fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    /// Total path length of every segment
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    /// Path length of one kind of motion
    pub fn length_of(&self, kind: SegmentKind) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(Segment::length)
            .sum()
    }

    pub fn feed_length(&self) -> f64 {
        self.length_of(SegmentKind::Feed)
    }

    pub fn rapid_length(&self) -> f64 {
        self.length_of(SegmentKind::Rapid)
    }

    pub fn count_of(&self, kind: SegmentKind) -> usize {
        self.segments.iter().filter(|s| s.kind == kind).count()
    }

    /// Bounding box of all segment endpoints
    pub fn bounds(&self) -> Option<Bounds3> {
        let first = self.segments.first()?;
        let mut bounds = Bounds3::from_point(first.start);
        for segment in &self.segments {
            bounds.include(segment.start);
            bounds.include(segment.end);
        }
        Some(bounds)
    }
}

impl<'a> IntoIterator for &'a SegmentLog {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

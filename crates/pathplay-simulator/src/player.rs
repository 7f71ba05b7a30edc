//! Toolpath player
//!
//! Walks a virtual tool along a segment snapshot at a controllable speed.
//! One call to [`Simulator::on_timer`] is one fixed-interval tick; the caller
//! owns the timer (see [`crate::driver::PlaybackDriver`]).

use pathplay_core::constants::ZERO_LENGTH_EPSILON;
use pathplay_core::{Point3, SimulationError};
use pathplay_gcode::{Segment, SegmentLog};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::observer::PlaybackObserver;
use crate::removal::MaterialRemoval;
use crate::state::{Operation, PlaybackConfig, PlaybackSnapshot, PlaybackStatus};

type Loader = Box<dyn FnMut() -> Vec<Operation> + Send>;

/// Playback session over one or more operations
pub struct Simulator {
    config: PlaybackConfig,
    operations: Vec<Operation>,
    /// Concatenated segments, tagged with their operation index
    segments: Vec<Segment>,
    total_length: f64,
    segment_index: usize,
    distance_along: f64,
    /// Length of every segment before `segment_index`
    completed_length: f64,
    speed: f64,
    status: PlaybackStatus,
    current_operation: usize,
    marker: Option<Point3>,
    marker_updates: u64,
    loader: Option<Loader>,
    removal: Option<Box<dyn MaterialRemoval>>,
    observers: Vec<Box<dyn PlaybackObserver>>,
    closed: bool,
}

impl Simulator {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            speed: config.speed,
            config,
            operations: Vec::new(),
            segments: Vec::new(),
            total_length: 0.0,
            segment_index: 0,
            distance_along: 0.0,
            completed_length: 0.0,
            status: PlaybackStatus::Stopped,
            current_operation: 0,
            marker: None,
            marker_updates: 0,
            loader: None,
            removal: None,
            observers: Vec::new(),
            closed: false,
        }
    }

    /// Player over a single segment log
    pub fn with_log(config: PlaybackConfig, log: impl Into<Arc<SegmentLog>>) -> Self {
        let mut simulator = Self::new(config);
        simulator.load(vec![Operation::new("Operation 1", log)]);
        simulator
    }

    /// Replace the playback snapshot with `operations`, concatenated in order
    ///
    /// Resets the cursor like [`Simulator::stop`].
    pub fn load(&mut self, operations: Vec<Operation>) {
        self.stop();
        self.segments = operations
            .iter()
            .enumerate()
            .flat_map(|(index, operation)| {
                operation.log.iter().map(move |segment| Segment {
                    operation_index: index,
                    ..*segment
                })
            })
            .collect();
        self.total_length = self.segments.iter().map(Segment::length).sum();
        self.operations = operations;
        self.current_operation = 0;
        debug!(
            "Loaded {} operations, {} segments, {:.3} mm",
            self.operations.len(),
            self.segments.len(),
            self.total_length
        );
    }

    /// Supplier called by `start` when nothing is loaded yet
    pub fn set_loader<F>(&mut self, loader: F)
    where
        F: FnMut() -> Vec<Operation> + Send + 'static,
    {
        self.loader = Some(Box::new(loader));
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    /// Install a removal hook run every `interval` marker updates (0 disables it)
    pub fn set_material_removal(&mut self, removal: Box<dyn MaterialRemoval>, interval: u32) {
        self.removal = Some(removal);
        self.config.removal_interval = interval;
    }

    pub fn clear_material_removal(&mut self) {
        self.removal = None;
    }

    /// Start playback from the first segment at `speed` mm/s
    pub fn start(&mut self, speed: f64) -> Result<(), SimulationError> {
        self.ensure_open()?;
        validate_speed(speed)?;

        if self.segments.is_empty() {
            if let Some(loader) = self.loader.as_mut() {
                let operations = loader();
                self.load(operations);
            }
        }
        if self.segments.is_empty() {
            warn!("Nothing to play: no segments loaded");
            return Err(SimulationError::NotLoaded);
        }

        self.speed = speed;
        self.reset_cursor();
        let first = self.segments[0];
        self.sync_operation(first.operation_index);
        self.move_marker(first.start);
        self.set_status(PlaybackStatus::Running);
        info!(
            "Playback started at {} mm/s over {} segments",
            speed,
            self.segments.len()
        );
        Ok(())
    }

    /// One timer tick; does nothing unless running
    pub fn on_timer(&mut self) {
        if self.status == PlaybackStatus::Running && !self.closed {
            self.tick();
        }
    }

    /// Exactly one tick regardless of status
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.ensure_open()?;
        if self.segments.is_empty() {
            return Err(SimulationError::NotLoaded);
        }
        self.tick();
        Ok(())
    }

    /// Running -> Paused, keeping the cursor
    pub fn pause(&mut self) {
        if self.status == PlaybackStatus::Running {
            self.set_status(PlaybackStatus::Paused);
            debug!(
                "Playback paused at segment {} (+{:.3} mm)",
                self.segment_index, self.distance_along
            );
        }
    }

    /// Paused -> Running from the kept cursor
    pub fn resume(&mut self) -> Result<(), SimulationError> {
        self.ensure_open()?;
        if self.status == PlaybackStatus::Paused {
            self.set_status(PlaybackStatus::Running);
        }
        Ok(())
    }

    /// Reset the cursor to the origin, hide the marker and stop
    pub fn stop(&mut self) {
        self.reset_cursor();
        if self.marker.take().is_some() {
            for observer in &mut self.observers {
                observer.on_marker_hidden();
            }
        }
        self.set_status(PlaybackStatus::Stopped);
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), SimulationError> {
        validate_speed(speed)?;
        self.speed = speed;
        Ok(())
    }

    /// Stop and release transient state. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.stop();
        self.observers.clear();
        self.removal = None;
        self.loader = None;
        self.segments.clear();
        self.operations.clear();
        self.total_length = 0.0;
        self.closed = true;
        debug!("Simulator closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn distance_along(&self) -> f64 {
        self.distance_along
    }

    pub fn marker(&self) -> Option<Point3> {
        self.marker
    }

    pub fn current_operation_index(&self) -> usize {
        self.current_operation
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Fraction of the total path length already covered
    pub fn progress(&self) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }
        if self.segment_index >= self.segments.len() {
            return 1.0;
        }
        if self.total_length <= ZERO_LENGTH_EPSILON {
            return 0.0;
        }
        ((self.completed_length + self.distance_along) / self.total_length).clamp(0.0, 1.0)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            segment_index: self.segment_index,
            distance_along: self.distance_along,
            segment_count: self.segments.len(),
            speed: self.speed,
            marker: self.marker,
            operation_index: self.current_operation,
            operation_label: self
                .operations
                .get(self.current_operation)
                .map(|op| op.label.clone()),
            progress: self.progress(),
        }
    }

    fn tick(&mut self) {
        let mut distance = self.speed * self.config.tick_interval.as_secs_f64();
        let mut snapped = None;

        loop {
            let Some(segment) = self.segments.get(self.segment_index).copied() else {
                if let Some(end) = snapped {
                    self.move_marker(end);
                }
                self.finish();
                return;
            };
            self.sync_operation(segment.operation_index);

            let length = segment.length();
            if length <= ZERO_LENGTH_EPSILON {
                self.segment_index += 1;
                self.distance_along = 0.0;
                continue;
            }

            let remaining = length - self.distance_along;
            if distance < remaining {
                self.distance_along += distance;
                self.move_marker(segment.point_at_distance(self.distance_along));
                return;
            }

            distance -= remaining;
            snapped = Some(segment.end);
            self.completed_length += length;
            self.segment_index += 1;
            self.distance_along = 0.0;
            trace!("Segment {} done", self.segment_index - 1);
        }
    }

    fn finish(&mut self) {
        self.segment_index = self.segments.len();
        self.distance_along = 0.0;
        if self.status != PlaybackStatus::Stopped {
            info!("Playback finished");
        }
        self.set_status(PlaybackStatus::Stopped);
    }

    fn reset_cursor(&mut self) {
        self.segment_index = 0;
        self.distance_along = 0.0;
        self.completed_length = 0.0;
        self.marker_updates = 0;
    }

    fn move_marker(&mut self, position: Point3) {
        self.marker = Some(position);
        self.marker_updates += 1;
        for observer in &mut self.observers {
            observer.on_marker_moved(position, self.current_operation);
        }

        let interval = u64::from(self.config.removal_interval);
        if interval == 0 || self.marker_updates % interval != 0 {
            return;
        }
        if let Some(removal) = self.removal.as_mut() {
            if let Err(err) = removal.remove_at(position) {
                warn!("Material removal failed at {}: {}", position, err);
            }
        }
    }

    fn sync_operation(&mut self, operation_index: usize) {
        if operation_index == self.current_operation {
            return;
        }
        self.current_operation = operation_index;
        let label = self
            .operations
            .get(operation_index)
            .map(|op| op.label.as_str())
            .unwrap_or_default();
        debug!("Entering operation {} ({})", operation_index, label);
        for observer in &mut self.observers {
            observer.on_operation_changed(operation_index, label);
        }
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        for observer in &mut self.observers {
            observer.on_status_changed(status);
        }
    }

    fn ensure_open(&self) -> Result<(), SimulationError> {
        if self.closed {
            return Err(SimulationError::Closed);
        }
        Ok(())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.close();
    }
}

fn validate_speed(speed: f64) -> Result<(), SimulationError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(SimulationError::InvalidSpeed { speed });
    }
    Ok(())
}

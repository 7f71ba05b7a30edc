//! Playback observer interface
//!
//! Defines the listener trait a renderer implements to follow playback.

use pathplay_core::Point3;

use crate::state::PlaybackStatus;

/// Listener trait for playback events
///
/// Every method has an empty default so observers only implement what they draw.
pub trait PlaybackObserver: Send {
    /// Called whenever the marker moves
    fn on_marker_moved(&mut self, _position: Point3, _operation_index: usize) {}

    /// Called when the marker is hidden by `stop` or `close`
    fn on_marker_hidden(&mut self) {}

    /// Called when the player status changes
    fn on_status_changed(&mut self, _status: PlaybackStatus) {}

    /// Called when playback crosses into another operation
    fn on_operation_changed(&mut self, _operation_index: usize, _label: &str) {}
}

//! # PathPlay Simulator
//!
//! Time-domain playback of interpreted toolpaths.
//!
//! - [`Simulator`] walks a marker along a segment snapshot, one fixed tick at a time
//! - [`PlaybackObserver`] lets a renderer follow the marker and status
//! - [`MaterialRemoval`] is the optional stock-cutting hook, with
//!   [`VoxelStock`] and [`BallTool`] as the built-in volumes
//! - [`PlaybackDriver`] runs a simulator on a tokio task with a real timer

pub mod driver;
pub mod observer;
pub mod player;
pub mod removal;
pub mod state;
pub mod voxel;

pub use driver::PlaybackDriver;
pub use observer::PlaybackObserver;
pub use player::Simulator;
pub use removal::{MaterialRemoval, StockRemoval, StockVolume, ToolVolume};
pub use state::{Operation, PlaybackConfig, PlaybackSnapshot, PlaybackStatus};
pub use voxel::{BallTool, Sphere, VoxelStock};

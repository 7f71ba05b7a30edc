//! # PathPlay Core
//!
//! Core types shared by the PathPlay crates.
//! Provides the 3D point type used for every motion, the error hierarchy
//! for interpretation and playback, and the numeric constants both sides agree on.

pub mod constants;
pub mod error;
pub mod geometry;

pub use error::{Error, GcodeError, Result, SimulationError};
pub use geometry::{Bounds3, Point3};

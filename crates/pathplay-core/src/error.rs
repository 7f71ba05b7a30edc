//! Error handling for PathPlay
//!
//! Provides the error types for both halves of the system:
//! - G-Code errors (fatal interpretation failures)
//! - Simulation errors (playback and material removal)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// G-Code error type
///
/// Every variant is fatal for the interpretation run that raised it.
/// Each one carries the 1-based line number and the raw text of the offending line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// A numeric literal could not be parsed
    #[error("Malformed number '{literal}' at line {line_number}: {text}")]
    MalformedNumber {
        /// The line number where the literal was found.
        line_number: usize,
        /// The offending literal.
        literal: String,
        /// The raw line text.
        text: String,
    },

    /// A word used an address letter the interpreter does not accept
    #[error("Invalid address '{address}' at line {line_number}: {text}")]
    InvalidAddress {
        /// The line number where the word was found.
        line_number: usize,
        /// The rejected address letter.
        address: char,
        /// The raw line text.
        text: String,
    },

    /// The same address appeared twice on one line
    #[error("Duplicate address '{address}' at line {line_number}: {text}")]
    DuplicateAddress {
        /// The line number where the duplicate was found.
        line_number: usize,
        /// The repeated address letter.
        address: char,
        /// The raw line text.
        text: String,
    },

    /// REPEAT named a label that has not been registered yet
    #[error("Unknown label '{label}' at line {line_number}: {text}")]
    UnknownLabel {
        /// The line number of the REPEAT statement.
        line_number: usize,
        /// The missing label.
        label: String,
        /// The raw line text.
        text: String,
    },

    /// An R register was read before being assigned
    #[error("Undefined variable R{register} at line {line_number}: {text}")]
    UndefinedVariable {
        /// The line number of the reference.
        line_number: usize,
        /// The register number.
        register: u32,
        /// The raw line text.
        text: String,
    },

    /// G83 peck depth was not positive, or too small to reach the cycle depth
    #[error("Invalid peck depth Q{depth} at line {line_number}: {text}")]
    InvalidPeckDepth {
        /// The line number of the cycle.
        line_number: usize,
        /// The rejected depth.
        depth: f64,
        /// The raw line text.
        text: String,
    },

    /// REPEAT frames nested beyond the configured limit
    #[error("REPEAT nesting deeper than {limit} at line {line_number}: {text}")]
    RepeatNestingTooDeep {
        /// The line number of the REPEAT that overflowed.
        line_number: usize,
        /// The configured limit.
        limit: usize,
        /// The raw line text.
        text: String,
    },
}

impl GcodeError {
    /// The 1-based line number the error refers to
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedNumber { line_number, .. }
            | Self::InvalidAddress { line_number, .. }
            | Self::DuplicateAddress { line_number, .. }
            | Self::UnknownLabel { line_number, .. }
            | Self::UndefinedVariable { line_number, .. }
            | Self::InvalidPeckDepth { line_number, .. }
            | Self::RepeatNestingTooDeep { line_number, .. } => *line_number,
        }
    }

    /// The raw text of the offending line
    pub fn text(&self) -> &str {
        match self {
            Self::MalformedNumber { text, .. }
            | Self::InvalidAddress { text, .. }
            | Self::DuplicateAddress { text, .. }
            | Self::UnknownLabel { text, .. }
            | Self::UndefinedVariable { text, .. }
            | Self::InvalidPeckDepth { text, .. }
            | Self::RepeatNestingTooDeep { text, .. } => text,
        }
    }
}

/// Simulation error type
///
/// Playback never aborts on these; the player logs them and either continues or stops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// No segments were available to play
    #[error("No segments loaded")]
    NotLoaded,

    /// The simulator has been closed
    #[error("Simulator is closed")]
    Closed,

    /// Playback speed must be positive and finite
    #[error("Invalid playback speed: {speed}")]
    InvalidSpeed {
        /// The rejected speed in mm/s.
        speed: f64,
    },

    /// The stock/tool collaborator failed to subtract material
    #[error("Material removal failed: {reason}")]
    MaterialRemoval {
        /// The reason reported by the collaborator.
        reason: String,
    },

    /// The playback driver task is gone
    #[error("Playback driver stopped")]
    DriverStopped,
}

/// Main error type for PathPlay
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Simulation error
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a simulation error
    pub fn is_simulation_error(&self) -> bool {
        matches!(self, Error::Simulation(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_error_display_includes_line() {
        let err = GcodeError::UndefinedVariable {
            line_number: 4,
            register: 9,
            text: "REPEAT LABEL1 P=R9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Undefined variable R9 at line 4: REPEAT LABEL1 P=R9"
        );
        assert_eq!(err.line_number(), 4);
        assert_eq!(err.text(), "REPEAT LABEL1 P=R9");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = SimulationError::NotLoaded.into();
        assert!(err.is_simulation_error());
        assert!(!err.is_gcode_error());
    }
}

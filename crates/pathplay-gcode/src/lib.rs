//! # PathPlay G-Code
//!
//! G-code motion interpreter. Turns program text into an ordered, append-only
//! [`SegmentLog`] of rapid and feed moves.
//!
//! ## Pipeline
//!
//! 1. [`tokenizer`] splits each line into labels, assignments, REPEATs or address words
//! 2. [`modal`] tracks distance mode, compensation, canned cycle and position
//! 3. [`motion`] resolves G0-G3 into straight segments, subdividing arcs
//! 4. [`cycles`] expands G81/G83 triggers
//! 5. [`interpreter`] drives the above over the line stream, with labels,
//!    R registers and REPEAT loops
//!
//! ```
//! use pathplay_gcode::{interpret, RunOutcome, SegmentKind};
//!
//! let run = interpret("G0 X0 Y0 Z5\nG1 Z-1\nG1 X10\nM30");
//! assert_eq!(run.outcome, RunOutcome::Halted { line: 4 });
//! assert_eq!(run.log.count_of(SegmentKind::Feed), 2);
//! ```

pub mod cycles;
pub mod interpreter;
pub mod modal;
pub mod motion;
pub mod program;
pub mod segment;
pub mod tokenizer;
pub mod variables;

pub use cycles::{drill_segments, expand_cycle, HolePosition};
pub use interpreter::{
    interpret, interpret_with, Interpretation, Interpreter, InterpreterOptions, RunOutcome,
};
pub use modal::{CannedCycle, Compensation, ModalState, Positioning};
pub use motion::{arc_step, resolve_arc, ArcCenter, ArcDirection, ArcPath, LinearFallback};
pub use program::{LabelTable, Program};
pub use segment::{Segment, SegmentKind, SegmentLog, SegmentTag};
pub use tokenizer::{tokenize_line, Statement, Value};
pub use variables::VariableStore;

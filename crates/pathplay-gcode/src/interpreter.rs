//! Control-flow engine
//!
//! Walks the program line by line, threading one [`ModalState`] through the
//! run. REPEAT blocks are executed through an explicit stack of
//! [`RepeatFrame`]s so loop counts never grow the call stack.
//!
//! A repeated block is scoped for distance mode: every pass starts, and the
//! line after the REPEAT continues, in the G90/G91 mode that was active when
//! the block's start label was reached.

use pathplay_core::constants::{ARC_STEP_DEGREES, DEFAULT_MAX_REPEAT_DEPTH};
use pathplay_core::{GcodeError, Point3};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, trace, warn};

use crate::cycles::expand_cycle;
use crate::modal::{CannedCycle, ModalState, Positioning};
use crate::motion::{arc_step, resolve_arc, ArcCenter, ArcDirection, ArcPath};
use crate::program::{LabelTable, Program};
use crate::segment::{Segment, SegmentKind, SegmentLog, SegmentTag};
use crate::tokenizer::{tokenize_line, Block, RepeatStatement, Statement, Value};
use crate::variables::VariableStore;

/// Tunables for one interpretation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpreterOptions {
    /// Largest angular step of one arc sub-segment, in degrees
    pub arc_step_degrees: f64,
    /// Maximum number of simultaneously pending REPEAT frames
    pub max_repeat_depth: usize,
    /// Operation index stamped on every produced segment
    pub operation_index: usize,
    /// Tool position before the first line
    pub start: Point3,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            arc_step_degrees: ARC_STEP_DEGREES,
            max_repeat_depth: DEFAULT_MAX_REPEAT_DEPTH,
            operation_index: 0,
            start: Point3::ORIGIN,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Ran past the last line
    Completed,
    /// Stopped by M2/M30 on the given 1-based line
    Halted { line: usize },
    /// Aborted by a fatal error; segments appended before it are kept
    Failed(GcodeError),
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&GcodeError> {
        match self {
            RunOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub log: SegmentLog,
    pub outcome: RunOutcome,
    /// Modal state after the last executed line
    pub modal: ModalState,
    pub variables: VariableStore,
    pub labels: LabelTable,
}

impl Interpretation {
    /// The segment log, or the fatal error if the run failed
    pub fn into_result(self) -> Result<SegmentLog, GcodeError> {
        match self.outcome {
            RunOutcome::Failed(err) => Err(err),
            _ => Ok(self.log),
        }
    }
}

/// One pending REPEAT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RepeatFrame {
    /// Line each pass starts at
    start_line: usize,
    /// Reaching this line ends a pass
    return_line: usize,
    /// Passes left including the one in progress
    remaining: u64,
    /// Line after the REPEAT statement
    resume_line: usize,
    /// Distance mode at the start label
    positioning: Positioning,
}

enum Flow {
    Next,
    Jump(usize),
    Halt,
}

#[derive(Clone, Copy)]
enum Motion {
    Line(SegmentKind),
    Arc(ArcDirection),
    Drill,
    PeckDrill,
}

/// Interpreter for one program
pub struct Interpreter<'p> {
    program: &'p Program,
    options: InterpreterOptions,
    modal: ModalState,
    variables: VariableStore,
    labels: LabelTable,
    label_modes: HashMap<usize, Positioning>,
    log: SegmentLog,
    frames: Vec<RepeatFrame>,
    statements: Vec<Option<Statement>>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, options: InterpreterOptions) -> Self {
        let step = arc_step(options.arc_step_degrees);
        if step != options.arc_step_degrees {
            warn!(
                "Arc step {} degrees is out of range, using {}",
                options.arc_step_degrees, step
            );
        }
        let options = InterpreterOptions {
            arc_step_degrees: step,
            ..options
        };
        Self {
            program,
            options,
            modal: ModalState::at(options.start),
            variables: VariableStore::new(),
            labels: LabelTable::new(),
            label_modes: HashMap::new(),
            log: SegmentLog::new(),
            frames: Vec::new(),
            statements: vec![None; program.len()],
        }
    }

    /// Run the program to completion, halt or first fatal error
    pub fn run(mut self) -> Interpretation {
        debug!("Interpreting {} lines", self.program.len());
        let outcome = match self.execute() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("G-code interpretation failed: {}", err);
                RunOutcome::Failed(err)
            }
        };
        debug!(
            "Interpretation finished with {} segments ({:?})",
            self.log.len(),
            outcome
        );

        Interpretation {
            log: self.log,
            outcome,
            modal: self.modal,
            variables: self.variables,
            labels: self.labels,
        }
    }

    fn execute(&mut self) -> Result<RunOutcome, GcodeError> {
        let mut cursor = 0;
        loop {
            cursor = self.unwind_frames(cursor);
            if cursor >= self.program.len() {
                break;
            }
            let statement = self.statement(cursor)?;
            trace!("Line {}: {:?}", cursor + 1, statement);
            match self.execute_statement(cursor, &statement)? {
                Flow::Next => cursor += 1,
                Flow::Jump(target) => cursor = target,
                Flow::Halt => return Ok(RunOutcome::Halted { line: cursor + 1 }),
            }
        }
        Ok(RunOutcome::Completed)
    }

    /// Finish or restart repeat passes whose return marker is `cursor`
    fn unwind_frames(&mut self, mut cursor: usize) -> usize {
        while let Some(frame) = self.frames.last_mut() {
            if frame.return_line != cursor {
                break;
            }
            frame.remaining = frame.remaining.saturating_sub(1);
            self.modal.positioning = frame.positioning;
            if frame.remaining > 0 {
                trace!(
                    "REPEAT pass done, {} left, back to line {}",
                    frame.remaining,
                    frame.start_line + 1
                );
                return frame.start_line;
            }
            cursor = frame.resume_line;
            self.frames.pop();
        }
        cursor
    }

    fn statement(&mut self, index: usize) -> Result<Statement, GcodeError> {
        if let Some(statement) = &self.statements[index] {
            return Ok(statement.clone());
        }
        let statement = tokenize_line(index + 1, self.text(index))?;
        self.statements[index] = Some(statement.clone());
        Ok(statement)
    }

    fn text(&self, index: usize) -> &'p str {
        self.program.line(index).unwrap_or_default()
    }

    fn execute_statement(&mut self, index: usize, statement: &Statement) -> Result<Flow, GcodeError> {
        match statement {
            Statement::Blank | Statement::Comment => Ok(Flow::Next),
            Statement::Label { name, rest } => {
                if let Some(previous) = self.labels.register(name, index) {
                    if previous != index {
                        debug!("Label {} moved from line {} to {}", name, previous + 1, index + 1);
                    }
                }
                if !self.frames.iter().any(|frame| frame.start_line == index) {
                    self.label_modes.insert(index, self.modal.positioning);
                }
                match rest {
                    Some(rest) => self.execute_statement(index, rest),
                    None => Ok(Flow::Next),
                }
            }
            Statement::Assign(assignments) => {
                for (register, value) in assignments {
                    let value = self.resolve(index, value)?;
                    debug!("R{} = {}", register, value);
                    self.variables.set(*register, value);
                }
                Ok(Flow::Next)
            }
            Statement::Repeat(repeat) => self.repeat(index, repeat),
            Statement::Block(block) => self.block(index, block),
            Statement::Unrecognized => {
                warn!("Ignoring unrecognized line {}: {}", index + 1, self.text(index));
                Ok(Flow::Next)
            }
        }
    }

    fn resolve(&self, index: usize, value: &Value) -> Result<f64, GcodeError> {
        self.variables
            .resolve(value)
            .map_err(|register| GcodeError::UndefinedVariable {
                line_number: index + 1,
                register,
                text: self.text(index).to_string(),
            })
    }

    fn label_line(&self, index: usize, label: &str) -> Result<usize, GcodeError> {
        self.labels
            .get(label)
            .ok_or_else(|| GcodeError::UnknownLabel {
                line_number: index + 1,
                label: label.to_string(),
                text: self.text(index).to_string(),
            })
    }

    fn repeat(&mut self, index: usize, repeat: &RepeatStatement) -> Result<Flow, GcodeError> {
        let start_line = self.label_line(index, &repeat.start)?;
        let return_line = match &repeat.end {
            Some(end) => self.label_line(index, end)?,
            None => index,
        };

        // The pass that reached this line counts as the first one.
        let passes = match &repeat.count {
            None => 1,
            Some(value) => {
                let count = self.resolve(index, value)?;
                if count.is_finite() && count >= 1.0 {
                    count.trunc() as u64 - 1
                } else {
                    0
                }
            }
        };

        let positioning = self
            .label_modes
            .get(&start_line)
            .copied()
            .unwrap_or(self.modal.positioning);

        if passes == 0 {
            debug!("REPEAT at line {} has no passes left", index + 1);
            self.modal.positioning = positioning;
            return Ok(Flow::Next);
        }
        if start_line >= return_line {
            self.modal.positioning = positioning;
            warn!(
                "REPEAT at line {} has an empty block, skipping: {}",
                index + 1,
                self.text(index)
            );
            return Ok(Flow::Next);
        }
        if self.frames.len() >= self.options.max_repeat_depth {
            return Err(GcodeError::RepeatNestingTooDeep {
                line_number: index + 1,
                limit: self.options.max_repeat_depth,
                text: self.text(index).to_string(),
            });
        }

        debug!(
            "REPEAT lines {}..{} {} more time(s)",
            start_line + 1,
            return_line,
            passes
        );
        self.frames.push(RepeatFrame {
            start_line,
            return_line,
            remaining: passes,
            resume_line: index + 1,
            positioning,
        });
        self.modal.positioning = positioning;
        Ok(Flow::Jump(start_line))
    }

    fn block(&mut self, index: usize, block: &Block) -> Result<Flow, GcodeError> {
        let mut words = BTreeMap::new();
        for (&address, value) in &block.words {
            words.insert(address, self.resolve(index, value)?);
        }
        let words = Words(words);

        if let Some(feed) = words.get('F') {
            debug!("Feed rate F{} at line {}", feed, index + 1);
            self.modal.feed_rate = Some(feed);
        }
        if let Some(speed) = words.get('S') {
            debug!("Spindle speed S{} at line {}", speed, index + 1);
            self.modal.spindle_speed = Some(speed);
        }

        let mut motion = None;
        for &code in &block.g_codes {
            let next = match code {
                0 => Motion::Line(SegmentKind::Rapid),
                1 => Motion::Line(SegmentKind::Feed),
                2 => Motion::Arc(ArcDirection::Clockwise),
                3 => Motion::Arc(ArcDirection::CounterClockwise),
                81 => Motion::Drill,
                83 => Motion::PeckDrill,
                _ => {
                    if !self.modal.apply_modal_code(code) {
                        warn!("Ignoring unsupported G{} at line {}", code, index + 1);
                    }
                    continue;
                }
            };
            if motion.is_some() {
                warn!("Several motion codes at line {}, G{} wins", index + 1, code);
            }
            motion = Some(next);
        }

        let mut halt = None;
        for &code in &block.m_codes {
            match code {
                2 | 30 => halt = Some(code),
                _ => debug!("Ignoring M{} at line {}", code, index + 1),
            }
        }

        let tag = SegmentTag {
            operation_index: self.options.operation_index,
            line: index + 1,
        };
        match motion {
            Some(Motion::Line(kind)) => self.linear(kind, &words, tag),
            Some(Motion::Arc(direction)) => self.arc(direction, &words, tag),
            Some(Motion::Drill) => self.activate_cycle(false, &words, tag)?,
            Some(Motion::PeckDrill) => self.activate_cycle(true, &words, tag)?,
            None => self.bare_words(&words, tag)?,
        }

        if let Some(code) = halt {
            info!("Program halted by M{} at line {}", code, index + 1);
            return Ok(Flow::Halt);
        }
        Ok(Flow::Next)
    }

    fn emit(&mut self, segment: Segment) {
        self.modal.position = segment.end;
        self.log.push(segment);
    }

    fn linear(&mut self, kind: SegmentKind, words: &Words, tag: SegmentTag) {
        if !words.has_axis() {
            debug!("{} without axis words at line {}", kind, tag.line);
            return;
        }
        let target = self.target(words);
        self.emit(tag.segment(kind, self.modal.position, target));
    }

    fn arc(&mut self, direction: ArcDirection, words: &Words, tag: SegmentTag) {
        let start = self.modal.position;
        let end = self.target(words);
        let center = match (words.get('I'), words.get('J'), words.get('R')) {
            (None, None, Some(radius)) => ArcCenter::Radius(radius),
            (None, None, None) => ArcCenter::Missing,
            (i, j, _) => ArcCenter::Offset {
                i: i.unwrap_or(0.0),
                j: j.unwrap_or(0.0),
            },
        };

        let path = resolve_arc(start, end, center, direction, self.options.arc_step_degrees);
        match &path {
            ArcPath::Linear(reason) => warn!(
                "Arc at line {} falls back to a linear move ({:?}): {}",
                tag.line,
                reason,
                self.text(tag.line - 1)
            ),
            ArcPath::Arc {
                center,
                radius,
                sweep,
                ..
            } => trace!(
                "Arc: from=({:.2},{:.2}), to=({:.2},{:.2}), center=({:.2},{:.2}), radius={:.4}, sweep={:.2}deg",
                start.x,
                start.y,
                end.x,
                end.y,
                center.0,
                center.1,
                radius,
                sweep.to_degrees()
            ),
            ArcPath::Vertical | ArcPath::Stationary => {}
        }

        for segment in path.segments(start, end, tag) {
            self.emit(segment);
        }
        self.modal.position = end;
    }

    fn activate_cycle(&mut self, peck: bool, words: &Words, tag: SegmentTag) -> Result<(), GcodeError> {
        let (previous_z, previous_r, previous_q) = match self.modal.cycle {
            CannedCycle::None => (None, None, None),
            CannedCycle::Simple { z, r } => (Some(z), Some(r), None),
            CannedCycle::Peck { z, r, q } => (Some(z), Some(r), Some(q)),
        };
        let current_z = self.modal.position.z;
        let z = words.get('Z').or(previous_z).unwrap_or_else(|| {
            warn!("Canned cycle at line {} has no Z, using {}", tag.line, current_z);
            current_z
        });
        let r = words.get('R').or(previous_r).unwrap_or_else(|| {
            warn!("Canned cycle at line {} has no R, using {}", tag.line, current_z);
            current_z
        });

        self.modal.cycle = if peck {
            let q = words.get('Q').or(previous_q).unwrap_or(0.0);
            self.check_peck(q, tag)?;
            CannedCycle::Peck { z, r, q }
        } else {
            CannedCycle::Simple { z, r }
        };
        debug!("Canned cycle {} active from line {}", self.modal.cycle, tag.line);

        if words.has('X') || words.has('Y') {
            self.trigger(words, tag)?;
        }
        Ok(())
    }

    /// Words on a line without a motion code
    fn bare_words(&mut self, words: &Words, tag: SegmentTag) -> Result<(), GcodeError> {
        if self.modal.cycle.is_active() {
            match &mut self.modal.cycle {
                CannedCycle::None => {}
                CannedCycle::Simple { z, r } => {
                    *z = words.get('Z').unwrap_or(*z);
                    *r = words.get('R').unwrap_or(*r);
                }
                CannedCycle::Peck { z, r, q } => {
                    *z = words.get('Z').unwrap_or(*z);
                    *r = words.get('R').unwrap_or(*r);
                    *q = words.get('Q').unwrap_or(*q);
                }
            }
            if let CannedCycle::Peck { q, .. } = self.modal.cycle {
                self.check_peck(q, tag)?;
            }
            if words.has('X') || words.has('Y') {
                self.trigger(words, tag)?;
            }
            return Ok(());
        }

        if words.has_axis() {
            self.modal.position = self.target(words);
            debug!("Line {} moves to {} without motion", tag.line, self.modal.position);
        }
        Ok(())
    }

    fn trigger(&mut self, words: &Words, tag: SegmentTag) -> Result<(), GcodeError> {
        let position = self.modal.position;
        let x = self.modal.resolve_axis(position.x, words.get('X'));
        let y = self.modal.resolve_axis(position.y, words.get('Y'));
        let segments = expand_cycle(
            &self.modal.cycle,
            position,
            x,
            y,
            tag,
            self.text(tag.line - 1),
        )?;
        for segment in segments {
            self.emit(segment);
        }
        Ok(())
    }

    fn check_peck(&self, q: f64, tag: SegmentTag) -> Result<(), GcodeError> {
        if !q.is_finite() || q <= 0.0 {
            return Err(GcodeError::InvalidPeckDepth {
                line_number: tag.line,
                depth: q,
                text: self.text(tag.line - 1).to_string(),
            });
        }
        Ok(())
    }

    fn target(&self, words: &Words) -> Point3 {
        self.modal
            .resolve_target(words.get('X'), words.get('Y'), words.get('Z'))
    }
}

/// Address words of one line after register resolution
struct Words(BTreeMap<char, f64>);

impl Words {
    fn get(&self, address: char) -> Option<f64> {
        self.0.get(&address).copied()
    }

    fn has(&self, address: char) -> bool {
        self.0.contains_key(&address)
    }

    fn has_axis(&self) -> bool {
        self.has('X') || self.has('Y') || self.has('Z')
    }
}

/// Interpret program text with default options
pub fn interpret(text: &str) -> Interpretation {
    interpret_with(text, InterpreterOptions::default())
}

/// Interpret program text with explicit options
pub fn interpret_with(text: &str, options: InterpreterOptions) -> Interpretation {
    let program = Program::parse(text);
    Interpreter::new(&program, options).run()
}

//! G-Code line tokenizer
//!
//! Turns one raw program line into a [`Statement`]. Values stay symbolic
//! ([`Value::Register`]) so the interpreter can resolve them against the
//! variable store at the moment the line executes.

use pathplay_core::GcodeError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// Address letters accepted inside a word line
const ADDRESSES: &str = "GMNXYZIJRQFSP";

/// A numeric value as written in the program
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A literal number
    Literal(f64),
    /// A reference to register `R<n>`
    Register(u32),
}

/// Address words of a code line
///
/// `G` and `M` may repeat on one line; every other address may appear once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// G codes in the order written
    pub g_codes: Vec<u32>,
    /// M codes in the order written
    pub m_codes: Vec<u32>,
    /// Remaining address words keyed by upper-case letter
    pub words: BTreeMap<char, Value>,
}

impl Block {
    /// True when the line carries the address
    pub fn has(&self, address: char) -> bool {
        self.words.contains_key(&address)
    }
}

/// `REPEAT <start> [<end>] [P=<count>]`
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatStatement {
    /// Label the repeated block starts at
    pub start: String,
    /// Label whose line ends the block (exclusive); `None` means the REPEAT line itself
    pub end: Option<String>,
    /// `P=` count, if given
    pub count: Option<Value>,
}

/// One tokenized program line
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Blank,
    Comment,
    /// `NAME:` optionally followed by more code on the same line
    Label {
        name: String,
        rest: Option<Box<Statement>>,
    },
    /// One or more `R<n>=<value>` assignments
    Assign(Vec<(u32, Value)>),
    Repeat(RepeatStatement),
    Block(Block),
    /// Anything else; logged and skipped by the interpreter
    Unrecognized,
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("invalid regex pattern"))
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*):(.*)$").expect("invalid regex pattern")
    })
}

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[Rr](\d+)=(\S+)$").expect("invalid regex pattern"))
}

fn equals_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*=\s*").expect("invalid regex pattern"))
}

/// Drop an inline `( ... )` or `; ...` comment
pub fn strip_comment(text: &str) -> &str {
    match text.find(|c| c == '(' || c == ';') {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Tokenize one raw line. `line_number` is 1-based and only used for errors.
pub fn tokenize_line(line_number: usize, text: &str) -> Result<Statement, GcodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Statement::Blank);
    }
    if trimmed.starts_with('(') || trimmed.starts_with(';') {
        return Ok(Statement::Comment);
    }

    let code = strip_comment(trimmed).trim();
    if code.is_empty() {
        return Ok(Statement::Blank);
    }
    let code = equals_regex().replace_all(code, "=");
    let ctx = LineContext { line_number, text };
    ctx.statement(&code)
}

struct LineContext<'a> {
    line_number: usize,
    text: &'a str,
}

impl LineContext<'_> {
    fn statement(&self, code: &str) -> Result<Statement, GcodeError> {
        if let Some(caps) = label_regex().captures(code) {
            let rest = caps[2].trim();
            let rest = if rest.is_empty() {
                None
            } else {
                Some(Box::new(self.statement(rest)?))
            };
            return Ok(Statement::Label {
                name: caps[1].to_string(),
                rest,
            });
        }

        let first = code.split_whitespace().next().unwrap_or_default();
        if first.eq_ignore_ascii_case("REPEAT") {
            return self.repeat(code);
        }
        if assignment_regex().is_match(first) {
            return self.assignments(code);
        }
        if starts_with_word(code) {
            return self.words(code).map(Statement::Block);
        }

        Ok(Statement::Unrecognized)
    }

    fn repeat(&self, code: &str) -> Result<Statement, GcodeError> {
        let mut labels = Vec::new();
        let mut count = None;

        for part in code.split_whitespace().skip(1) {
            if part.len() > 2 && part[..2].eq_ignore_ascii_case("P=") {
                count = Some(self.value(&part[2..])?);
            } else {
                labels.push(part.to_string());
            }
        }

        let mut labels = labels.into_iter();
        match (labels.next(), labels.next(), labels.next()) {
            (Some(start), end, None) => Ok(Statement::Repeat(RepeatStatement { start, end, count })),
            _ => {
                warn!(
                    "Malformed REPEAT at line {}: {}",
                    self.line_number, self.text
                );
                Ok(Statement::Unrecognized)
            }
        }
    }

    fn assignments(&self, code: &str) -> Result<Statement, GcodeError> {
        let mut assignments = Vec::new();
        for part in code.split_whitespace() {
            let caps = assignment_regex()
                .captures(part)
                .ok_or_else(|| self.malformed(part))?;
            let register = caps[1].parse::<u32>().map_err(|_| self.malformed(part))?;
            assignments.push((register, self.value(&caps[2])?));
        }
        Ok(Statement::Assign(assignments))
    }

    fn words(&self, code: &str) -> Result<Block, GcodeError> {
        let chars: Vec<char> = code.chars().collect();
        let mut block = Block::default();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if !c.is_ascii_alphabetic() {
                let literal: String = chars[i..]
                    .iter()
                    .take_while(|c| !c.is_whitespace())
                    .collect();
                return Err(self.malformed(&literal));
            }

            let address = c.to_ascii_uppercase();
            if !ADDRESSES.contains(address) {
                return Err(GcodeError::InvalidAddress {
                    line_number: self.line_number,
                    address,
                    text: self.text.to_string(),
                });
            }
            i += 1;
            if chars.get(i) == Some(&'=') {
                i += 1;
            }

            let start = i;
            let is_register = matches!(chars.get(i).copied(), Some('R' | 'r'))
                && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
            if is_register {
                i += 1;
                while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                }
            } else {
                while chars
                    .get(i)
                    .is_some_and(|&c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
                {
                    i += 1;
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let word = format!("{}{}", address, literal);
            if literal.is_empty() {
                return Err(self.malformed(&word));
            }
            let value = self.value(&literal).map_err(|_| self.malformed(&word))?;

            match address {
                'G' | 'M' => {
                    let Value::Literal(number) = value else {
                        return Err(self.malformed(&word));
                    };
                    if number < 0.0 || number.fract() != 0.0 {
                        warn!(
                            "Ignoring unsupported code {} at line {}",
                            word, self.line_number
                        );
                        continue;
                    }
                    if address == 'G' {
                        block.g_codes.push(number as u32);
                    } else {
                        block.m_codes.push(number as u32);
                    }
                }
                'N' => {}
                _ => {
                    if block.words.insert(address, value).is_some() {
                        return Err(GcodeError::DuplicateAddress {
                            line_number: self.line_number,
                            address,
                            text: self.text.to_string(),
                        });
                    }
                }
            }
        }

        Ok(block)
    }

    fn value(&self, literal: &str) -> Result<Value, GcodeError> {
        if let Some(digits) = literal
            .strip_prefix('R')
            .or_else(|| literal.strip_prefix('r'))
        {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return digits
                    .parse::<u32>()
                    .map(Value::Register)
                    .map_err(|_| self.malformed(literal));
            }
        }
        if !number_regex().is_match(literal) {
            return Err(self.malformed(literal));
        }
        literal
            .parse::<f64>()
            .map(Value::Literal)
            .map_err(|_| self.malformed(literal))
    }

    fn malformed(&self, literal: &str) -> GcodeError {
        GcodeError::MalformedNumber {
            line_number: self.line_number,
            literal: literal.to_string(),
            text: self.text.to_string(),
        }
    }
}

/// A word line starts with an address letter directly followed by a value
fn starts_with_word(code: &str) -> bool {
    let mut chars = code.chars();
    let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
        return false;
    };
    ADDRESSES.contains(first.to_ascii_uppercase())
        && (second.is_ascii_digit() || matches!(second, '+' | '-' | '.' | '='))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> Block {
        match tokenize_line(1, text).unwrap() {
            Statement::Block(block) => block,
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_lines() {
        assert_eq!(tokenize_line(1, "(setup)").unwrap(), Statement::Comment);
        assert_eq!(tokenize_line(1, "  ; note").unwrap(), Statement::Comment);
        assert_eq!(tokenize_line(1, "   ").unwrap(), Statement::Blank);
    }

    #[test]
    fn test_spaced_and_compact_words() {
        let spaced = block("G1 X10 Y-2.5 Z.5 F300");
        let compact = block("g1x10y-2.5z.5f300");
        assert_eq!(spaced, compact);
        assert_eq!(spaced.g_codes, vec![1]);
        assert_eq!(spaced.words.get(&'Y'), Some(&Value::Literal(-2.5)));
        assert_eq!(spaced.words.get(&'Z'), Some(&Value::Literal(0.5)));
    }

    #[test]
    fn test_inline_comment_is_dropped() {
        let b = block("G0 X1 (rapid over) Y2");
        assert!(b.has('X'));
        assert!(!b.has('Y'));
    }

    #[test]
    fn test_multiple_g_codes_and_line_numbers() {
        let b = block("N20 G91 G01 X1 M30");
        assert_eq!(b.g_codes, vec![91, 1]);
        assert_eq!(b.m_codes, vec![30]);
        assert!(!b.has('N'));
    }

    #[test]
    fn test_register_reference_in_value() {
        let b = block("G1 XR1 Y=R2 Z = 3");
        assert_eq!(b.words.get(&'X'), Some(&Value::Register(1)));
        assert_eq!(b.words.get(&'Y'), Some(&Value::Register(2)));
        assert_eq!(b.words.get(&'Z'), Some(&Value::Literal(3.0)));
    }

    #[test]
    fn test_malformed_number_is_fatal() {
        let err = tokenize_line(7, "G1 X1.2.3").unwrap_err();
        assert!(matches!(
            err,
            GcodeError::MalformedNumber { line_number: 7, ref literal, .. } if literal == "X1.2.3"
        ));
        assert!(tokenize_line(1, "G1 X").is_err());
        assert!(tokenize_line(1, "G1 X10-5").is_err());
    }

    #[test]
    fn test_duplicate_address_is_fatal() {
        let err = tokenize_line(3, "G1 X1 X2").unwrap_err();
        assert!(matches!(
            err,
            GcodeError::DuplicateAddress { address: 'X', .. }
        ));
    }

    #[test]
    fn test_invalid_address_is_fatal() {
        let err = tokenize_line(2, "G0 X1 T4").unwrap_err();
        assert!(matches!(err, GcodeError::InvalidAddress { address: 'T', .. }));
    }

    #[test]
    fn test_unrecognized_lines() {
        assert_eq!(tokenize_line(1, "%").unwrap(), Statement::Unrecognized);
        assert_eq!(tokenize_line(1, "T1 M6").unwrap(), Statement::Unrecognized);
        assert_eq!(tokenize_line(1, "MSG hello").unwrap(), Statement::Unrecognized);
    }

    #[test]
    fn test_label_with_trailing_code() {
        match tokenize_line(1, "LOOP_A: G1 X1").unwrap() {
            Statement::Label { name, rest } => {
                assert_eq!(name, "LOOP_A");
                assert!(matches!(rest.as_deref(), Some(Statement::Block(_))));
            }
            other => panic!("expected label, got {:?}", other),
        }
        assert_eq!(
            tokenize_line(1, "LABEL1:").unwrap(),
            Statement::Label {
                name: "LABEL1".to_string(),
                rest: None
            }
        );
    }

    #[test]
    fn test_assignments() {
        assert_eq!(
            tokenize_line(1, "R1=3 R2 = -0.5 R3=R1").unwrap(),
            Statement::Assign(vec![
                (1, Value::Literal(3.0)),
                (2, Value::Literal(-0.5)),
                (3, Value::Register(1)),
            ])
        );
        assert!(tokenize_line(1, "R1=abc").is_err());
    }

    #[test]
    fn test_repeat_forms() {
        assert_eq!(
            tokenize_line(1, "REPEAT LABEL1").unwrap(),
            Statement::Repeat(RepeatStatement {
                start: "LABEL1".to_string(),
                end: None,
                count: None,
            })
        );
        assert_eq!(
            tokenize_line(1, "REPEAT LABEL1 P=R1").unwrap(),
            Statement::Repeat(RepeatStatement {
                start: "LABEL1".to_string(),
                end: None,
                count: Some(Value::Register(1)),
            })
        );
        assert_eq!(
            tokenize_line(1, "repeat A B P = 4").unwrap(),
            Statement::Repeat(RepeatStatement {
                start: "A".to_string(),
                end: Some("B".to_string()),
                count: Some(Value::Literal(4.0)),
            })
        );
        assert_eq!(tokenize_line(1, "REPEAT").unwrap(), Statement::Unrecognized);
    }
}

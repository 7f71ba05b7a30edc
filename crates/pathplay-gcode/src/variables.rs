//! R-register variable store

use crate::tokenizer::Value;
use std::collections::BTreeMap;

/// `R<n> -> f64` registers, alive for a whole interpretation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    registers: BTreeMap<u32, f64>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value in register `R<register>`
    pub fn set(&mut self, register: u32, value: f64) {
        self.registers.insert(register, value);
    }

    /// Read register `R<register>`
    pub fn get(&self, register: u32) -> Option<f64> {
        self.registers.get(&register).copied()
    }

    /// Resolve a symbolic value. `Err` carries the undefined register number.
    pub fn resolve(&self, value: &Value) -> Result<f64, u32> {
        match *value {
            Value::Literal(v) => Ok(v),
            Value::Register(register) => self.get(register).ok_or(register),
        }
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Registers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.registers.iter().map(|(k, v)| (*k, *v))
    }
}

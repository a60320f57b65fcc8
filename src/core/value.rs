/// Decoded values exchanged with the controller.
///
/// The variant is chosen by the address's inferred type, never declared by
/// the caller; see [`crate::protocol::address`].
use serde::Serialize;
use std::fmt;

use crate::protocol::address::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i16),
    Real(f32),
    DWord(u32),
}

impl Value {
    /// The kind a write target must resolve to for this value to apply.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bit,
            Value::Int(_) => ValueKind::Word,
            Value::Real(_) => ValueKind::Real,
            Value::DWord(_) => ValueKind::DWord,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::DWord(v) => write!(f, "{v}"),
        }
    }
}

//! Facts: named assertions over policy values.

use serde::{Deserialize, Serialize};

use crate::value::{Arg, ToValue, Value};

/// A durable or context assertion, e.g. `has_role(User:1, "creator", Issue:7)`.
///
/// Immutable once built; derive a new fact instead of editing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    #[serde(rename = "predicate")]
    pub name: String,
    pub args: Vec<Value>,
}

impl Fact {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl core::fmt::Display for Fact {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// An unencoded fact as supplied by callers of the mutation gateway.
///
/// Delete entries are encoded with unbound arguments allowed so they can
/// match by partial key; insert entries must be fully bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFact {
    pub name: String,
    pub args: Vec<Arg>,
}

impl BulkFact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<T: ToValue + ?Sized>(mut self, value: &T) -> Self {
        self.args.push(value.to_arg());
        self
    }

    /// # Panics
    ///
    /// When a partial reference is present and `allow_unbound` is false.
    pub fn encode(&self, allow_unbound: bool) -> Fact {
        Fact::new(
            self.name.clone(),
            self.args.iter().map(|a| a.encode(allow_unbound)).collect(),
        )
    }
}

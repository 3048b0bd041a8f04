//! Named functions
//!
//! Functions are compiled once and shared; each invocation gets its own
//! activation frame in the runtime, so recursion and concurrent calls are
//! safe.

use crate::command::CommandDef;
use indexmap::IndexMap;
use std::sync::Arc;

/// A compiled function: declared parameter names plus a shared body
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Arc<CommandDef>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, parameters: Vec<String>, body: CommandDef) -> Self {
        FunctionDef {
            name: name.into(),
            parameters,
            body: Arc::new(body),
        }
    }
}

/// Functions by name, in declaration order. The first entry is the
/// program's primary entry point.
pub type FunctionTable = IndexMap<String, FunctionDef>;

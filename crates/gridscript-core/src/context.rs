//! Evaluation context
//!
//! Variable evaluation is read-only: it sees the global and thread-local
//! variable stores plus the device bus, but never mutates them.

use crate::device::DeviceBus;
use crate::variable::Variable;
use indexmap::IndexMap;

/// Named variable bindings, in insertion order
pub type VarStore = IndexMap<String, Variable>;

/// Read-only view over the stores and the device bus, borrowed for the
/// duration of a single evaluation.
pub struct EvalCx<'a> {
    pub globals: &'a VarStore,
    pub locals: &'a VarStore,
    pub devices: &'a dyn DeviceBus,
}

impl<'a> EvalCx<'a> {
    pub fn new(globals: &'a VarStore, locals: &'a VarStore, devices: &'a dyn DeviceBus) -> Self {
        EvalCx {
            globals,
            locals,
            devices,
        }
    }

    /// Look up a variable, thread-locals shadowing globals.
    pub fn lookup(&self, name: &str) -> Option<&'a Variable> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }
}

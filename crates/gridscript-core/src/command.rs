//! Command definitions
//!
//! A [`CommandDef`] is the immutable program tree produced by the parser.
//! Execution state lives entirely in the runtime's per-activation frames,
//! so one definition can back any number of concurrent activations.

use crate::device::{Direction, PropertySpec};
use crate::selector::Selector;
use crate::variable::Variable;
use serde::{Deserialize, Serialize};

/// Control-flow verbs with no operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Halt the whole program
    Stop,
    /// Restart the whole program from its primary entry point
    Restart,
    /// Toggle the program's paused state
    Pause,
    /// Rewind the current thread to the start of its command
    Repeat,
}

/// How a function invocation transfers control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallMode {
    /// Run the function body, then resume after the call
    Call,
    /// Replace the current thread's program with the function body
    Jump,
}

/// Unit of a wait duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Ticks,
    Seconds,
}

/// A device-targeting action, dispatched per resolved entity
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    /// Negate a numeric property
    Reverse { property: PropertySpec },
    /// Move a numeric property in a direction
    Move {
        property: PropertySpec,
        direction: Direction,
    },
    /// Raise or lower a numeric property by an amount
    Increment {
        property: PropertySpec,
        direction: Option<Direction>,
        amount: Variable,
    },
    /// Set a property to a value
    Set {
        property: PropertySpec,
        direction: Option<Direction>,
        value: Variable,
    },
}

/// Immutable command tree node
#[derive(Debug, Clone, PartialEq)]
pub enum CommandDef {
    /// Run steps in order, the whole block `count` times
    Sequence {
        steps: Vec<CommandDef>,
        count: Variable,
    },
    /// Run one of two branches depending on a condition
    Conditional {
        condition: Variable,
        when_met: Box<CommandDef>,
        when_unmet: Box<CommandDef>,
        /// Re-evaluate the condition on every step while the taken branch
        /// runs, restarting the branch when the outcome flips
        always_evaluate: bool,
    },
    /// Yield for a duration
    Wait { duration: Variable, unit: TimeUnit },
    /// A control-flow verb
    Control(ControlKind),
    /// Invoke a named function with argument bindings
    Function {
        name: String,
        mode: CallMode,
        args: Vec<(String, Variable)>,
    },
    /// Spawn the wrapped command as a new thread
    Queue {
        command: Box<CommandDef>,
        concurrent: bool,
    },
    /// Bind a variable
    Assign {
        name: String,
        value: Variable,
        global: bool,
        by_reference: bool,
    },
    /// Overwrite elements of a bound list at computed indexes. The target
    /// must bottom out at a named binding; nested indexes rewrite the
    /// containing lists outward.
    AssignListIndex {
        list: Variable,
        index: Variable,
        value: Variable,
    },
    /// Move items between entity inventories
    Transfer {
        from: Selector,
        to: Selector,
        filter: Variable,
        amount: Option<Variable>,
    },
    /// Apply a device action to every entity a selector resolves to
    Device {
        selector: Selector,
        action: DeviceAction,
    },
    Print(Variable),
    /// Broadcast a message on a tagged channel
    Send { message: Variable, tag: Variable },
    /// Start listening on a tagged channel
    Listen { tag: Variable },
    /// Do nothing, complete immediately
    Null,
}

impl CommandDef {
    /// Wrap steps in a once-through sequence.
    pub fn sequence(steps: Vec<CommandDef>) -> Self {
        CommandDef::Sequence {
            steps,
            count: Variable::number(1.0),
        }
    }

    /// Build a conditional. When `always_evaluate` is set it is pushed
    /// down into nested conditionals in either branch, so a watched block
    /// re-checks every condition along the taken path.
    pub fn conditional(
        condition: Variable,
        mut when_met: CommandDef,
        mut when_unmet: CommandDef,
        always_evaluate: bool,
    ) -> Self {
        if always_evaluate {
            when_met.propagate_always_evaluate();
            when_unmet.propagate_always_evaluate();
        }
        CommandDef::Conditional {
            condition,
            when_met: Box::new(when_met),
            when_unmet: Box::new(when_unmet),
            always_evaluate,
        }
    }

    fn propagate_always_evaluate(&mut self) {
        if let CommandDef::Conditional {
            when_met,
            when_unmet,
            always_evaluate,
            ..
        } = self
        {
            *always_evaluate = true;
            when_met.propagate_always_evaluate();
            when_unmet.propagate_always_evaluate();
        }
    }
}

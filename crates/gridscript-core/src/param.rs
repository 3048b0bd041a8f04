//! Parse tokens
//!
//! The parser works over a flat sequence of [`Param`] tokens. The embedder
//! maps its surface keywords onto these tokens; the engine never sees raw
//! text except inside words and strings. Early in a parse most tokens are
//! leaves straight from the token stream; reduction folds them into the
//! carrier variants (selectors, variables, conditions, commands) until a
//! single [`Param::CommandRef`] remains.

use crate::command::{CallMode, CommandDef, ControlKind, TimeUnit};
use crate::condition::{Comparison, DeviceCondition, Quantifier};
use crate::device::{DeviceType, Direction, PropertyId};
use crate::function::FunctionDef;
use crate::primitive::{BinaryOp, UnaryOp};
use crate::selector::Selector;
use crate::variable::{PropertyAggregate, Variable};
use std::fmt;

/// One token of a command being parsed
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    // leaf tokens from the token stream
    Bool(bool),
    Num(f64),
    /// A bare word. `subtokens` carries the tokenization of the word's own
    /// text, used when a quoted multiword string doubles as a device query
    /// ("test piston" names a piston).
    Word {
        text: String,
        subtokens: Vec<Param>,
    },
    /// String literal; `explicit` marks quoted strings, which never resolve
    /// as variable references
    Str {
        text: String,
        explicit: bool,
    },
    DeviceTypeTok(DeviceType),
    GroupTok,
    SelfTok,
    /// An explicit variable used in selector position
    VarSelector(Variable),
    PropertyTok(PropertyId),
    DirectionTok(Direction),
    ComparisonTok(Comparison),
    NotTok,
    UnaryTok(UnaryOp),
    /// Tightest-binding operator tier
    Binary1Tok(BinaryOp),
    /// Multiplicative-tier operator
    Binary2Tok(BinaryOp),
    /// Additive-tier operator
    Binary3Tok(BinaryOp),
    AndTok,
    OrTok,
    QuantifierTok(Quantifier),
    AggregateTok(PropertyAggregate),
    IfTok {
        /// Re-evaluate continuously ("while"/"until" phrasing)
        always_evaluate: bool,
        /// Negate the condition ("unless"/"until")
        inverse: bool,
        /// Condition written after the body ("... if ...")
        swap: bool,
    },
    ElseTok,
    ControlTok(ControlKind),
    WaitTok,
    UnitTok(TimeUnit),
    PrintTok,
    SendTok,
    ListenTok,
    FunctionTok(CallMode),
    AssignTok {
        by_reference: bool,
    },
    GlobalTok,
    RelativeTok,
    ReverseTok,
    TransferTok {
        /// Whether the source selector is written before the token
        from_first: bool,
    },
    IterateTok,
    QueueTok {
        concurrent: bool,
    },
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Separator,
    IndexTok,
    WithTok,
    /// Filler word, dropped during reduction
    Ignored,

    // carrier tokens produced by reduction
    SelectorTok(Selector),
    VariableTok(Variable),
    DeviceConditionTok(DeviceCondition),
    ConditionTok {
        condition: Variable,
        always_evaluate: bool,
        swap: bool,
    },
    /// A bracketed list literal, reduced to a variable
    ListTok(Variable),
    /// A named list being indexed on the left side of an assignment
    ListIndexTok {
        list: Variable,
        index: Variable,
    },
    /// An index expression awaiting the selector or list it applies to
    IndexValueTok(Variable),
    FunctionRef {
        mode: CallMode,
        def: FunctionDef,
    },
    /// An assignment target awaiting its value
    AssignRef {
        name: String,
        global: bool,
        by_reference: bool,
    },
    /// A loop count awaiting its body
    IterationTok(Variable),
    CommandRef(CommandDef),
}

impl Param {
    pub fn word(text: impl Into<String>) -> Self {
        Param::Word {
            text: text.into(),
            subtokens: Vec::new(),
        }
    }

    pub fn implicit_string(text: impl Into<String>) -> Self {
        Param::Str {
            text: text.into(),
            explicit: false,
        }
    }

    pub fn explicit_string(text: impl Into<String>) -> Self {
        Param::Str {
            text: text.into(),
            explicit: true,
        }
    }

    /// The fieldless kind used for trigger and slot matching.
    pub fn kind(&self) -> ParamKind {
        match self {
            Param::Bool(_) => ParamKind::Bool,
            Param::Num(_) => ParamKind::Num,
            Param::Word { .. } => ParamKind::Word,
            Param::Str { .. } => ParamKind::Str,
            Param::DeviceTypeTok(_) => ParamKind::DeviceType,
            Param::GroupTok => ParamKind::Group,
            Param::SelfTok => ParamKind::SelfRef,
            Param::VarSelector(_) => ParamKind::VarSelector,
            Param::PropertyTok(_) => ParamKind::Property,
            Param::DirectionTok(_) => ParamKind::Direction,
            Param::ComparisonTok(_) => ParamKind::Comparison,
            Param::NotTok => ParamKind::Not,
            Param::UnaryTok(_) => ParamKind::Unary,
            Param::Binary1Tok(_) => ParamKind::Binary1,
            Param::Binary2Tok(_) => ParamKind::Binary2,
            Param::Binary3Tok(_) => ParamKind::Binary3,
            Param::AndTok => ParamKind::And,
            Param::OrTok => ParamKind::Or,
            Param::QuantifierTok(_) => ParamKind::Quantifier,
            Param::AggregateTok(_) => ParamKind::Aggregate,
            Param::IfTok { .. } => ParamKind::If,
            Param::ElseTok => ParamKind::Else,
            Param::ControlTok(_) => ParamKind::Control,
            Param::WaitTok => ParamKind::Wait,
            Param::UnitTok(_) => ParamKind::Unit,
            Param::PrintTok => ParamKind::Print,
            Param::SendTok => ParamKind::Send,
            Param::ListenTok => ParamKind::Listen,
            Param::FunctionTok(_) => ParamKind::Function,
            Param::AssignTok { .. } => ParamKind::Assign,
            Param::GlobalTok => ParamKind::Global,
            Param::RelativeTok => ParamKind::Relative,
            Param::ReverseTok => ParamKind::Reverse,
            Param::TransferTok { .. } => ParamKind::Transfer,
            Param::IterateTok => ParamKind::Iterate,
            Param::QueueTok { .. } => ParamKind::Queue,
            Param::OpenParen => ParamKind::OpenParen,
            Param::CloseParen => ParamKind::CloseParen,
            Param::OpenBracket => ParamKind::OpenBracket,
            Param::CloseBracket => ParamKind::CloseBracket,
            Param::Separator => ParamKind::Separator,
            Param::IndexTok => ParamKind::Index,
            Param::WithTok => ParamKind::With,
            Param::Ignored => ParamKind::Ignored,
            Param::SelectorTok(_) => ParamKind::Selector,
            Param::VariableTok(_) => ParamKind::Variable,
            Param::DeviceConditionTok(_) => ParamKind::DeviceCondition,
            Param::ConditionTok { .. } => ParamKind::Condition,
            Param::ListTok(_) => ParamKind::List,
            Param::ListIndexTok { .. } => ParamKind::ListIndex,
            Param::IndexValueTok(_) => ParamKind::IndexValue,
            Param::FunctionRef { .. } => ParamKind::FunctionRef,
            Param::AssignRef { .. } => ParamKind::AssignRef,
            Param::IterationTok(_) => ParamKind::Iteration,
            Param::CommandRef(_) => ParamKind::Command,
        }
    }
}

/// Fieldless kind tag for [`Param`], used by trigger and slot matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Bool,
    Num,
    Word,
    Str,
    DeviceType,
    Group,
    SelfRef,
    VarSelector,
    Property,
    Direction,
    Comparison,
    Not,
    Unary,
    Binary1,
    Binary2,
    Binary3,
    And,
    Or,
    Quantifier,
    Aggregate,
    If,
    Else,
    Control,
    Wait,
    Unit,
    Print,
    Send,
    Listen,
    Function,
    Assign,
    Global,
    Relative,
    Reverse,
    Transfer,
    Iterate,
    Queue,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Separator,
    Index,
    With,
    Ignored,
    Selector,
    Variable,
    DeviceCondition,
    Condition,
    List,
    ListIndex,
    IndexValue,
    FunctionRef,
    AssignRef,
    Iteration,
    Command,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

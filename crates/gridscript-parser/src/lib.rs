//! Ambiguity-tolerant reduction parser for gridscript commands
//!
//! The embedder tokenizes its surface syntax into [`gridscript_core::Param`]
//! leaves; this crate folds a flat token sequence into a single command
//! tree. Reduction is a fixed point over a rank-ordered processor table,
//! and ambiguous folds fork alternate sequences that are retried in order,
//! so the first branch to reach a single command wins deterministically.

pub mod engine;
pub mod error;
pub mod rules;
pub mod slot;

pub use engine::{ParseCx, Parser, Processor, RuleSet};
pub use error::{ParseError, ParseResult};
pub use rules::standard_rules;
pub use slot::{Captures, Reduction, Rule, Side, Slot};

//! Runtime error type shared across the engine

use crate::primitive::PrimitiveKind;
use thiserror::Error;

/// Errors raised while evaluating variables, conditions, or commands.
///
/// All of these are fatal to the owning thread: the scheduler retires the
/// thread and surfaces the error to the host without retry. Control-flow
/// interruptions (stop/pause/restart) are never represented as errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("cannot cast {from} to {to}")]
    InvalidCast {
        from: PrimitiveKind,
        to: PrimitiveKind,
    },

    #[error("{op} is not supported between {lhs} and {rhs}")]
    InvalidOperation {
        op: &'static str,
        lhs: PrimitiveKind,
        rhs: PrimitiveKind,
    },

    #[error("{0} comparisons only support equality")]
    UnsupportedComparison(PrimitiveKind),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("list index {index} is out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("no device handler registered for type: {0}")]
    UnknownDeviceType(String),

    #[error("unknown entity")]
    UnknownEntity,

    #[error("device error: {0}")]
    Device(String),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

//! Core types for the gridscript command engine.
//!
//! This crate defines the shared vocabulary of the engine: primitive
//! values and operators, deferred variable expressions, entity selectors,
//! conditions, the parse-token model, and the immutable command tree.
//! Parsing lives in `gridscript-parser` and execution in
//! `gridscript-runtime`; both build on these types. Device access is
//! abstracted behind the [`device::DeviceBus`] and
//! [`device::DeviceHandler`] traits so the engine stays independent of any
//! concrete device catalog.

pub mod command;
pub mod condition;
pub mod context;
pub mod device;
pub mod error;
pub mod function;
pub mod param;
pub mod primitive;
pub mod selector;
pub mod variable;

pub use command::{CallMode, CommandDef, ControlKind, DeviceAction, TimeUnit};
pub use condition::{Comparison, DeviceCondition, Quantifier};
pub use context::{EvalCx, VarStore};
pub use device::{
    DeviceBus, DeviceHandler, DeviceType, Direction, EntityHandle, PropertyHint, PropertyId,
    PropertySpec,
};
pub use error::{RuntimeError, RuntimeResult};
pub use function::{FunctionDef, FunctionTable};
pub use param::{Param, ParamKind};
pub use primitive::{BinaryOp, Primitive, PrimitiveKind, UnaryOp};
pub use selector::{ResolvedSelector, Selector};
pub use variable::{PropertyAggregate, Variable};

//! Command interpreter and cooperative scheduler
//!
//! This crate runs the command trees produced by `gridscript-parser`.
//! Definitions stay immutable and shared; every activation carries its own
//! frame, so loops, recursion, and concurrently queued threads never alias
//! mutable state. A [`Program`] advances one tick at a time, stepping the
//! front serial thread and every concurrent thread once; all waiting is
//! cooperative.
//!
//! # Key Types
//!
//! - [`Exec`] - one activation of a command definition
//! - [`Program`] - the scheduler and program-wide services
//! - [`Host`] - output and broadcast capabilities of the embedder
//! - [`ProgramConfig`] - runtime tunables

pub mod config;
pub mod exec;
pub mod host;
pub mod scheduler;

pub use config::{CompletionPolicy, ProgramConfig};
pub use exec::{ControlSignal, Effects, Exec, RunCx, Spawn, Step};
pub use host::{Host, NullHost};
pub use scheduler::{Program, ProgramState};

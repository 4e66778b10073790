//! Ahead-of-time compilation: target configuration and artifact emission.

pub mod object;
pub mod target;

pub use object::{EmitError, ObjectEmitter, OutputFormat};
pub use target::{OptLevel, RelocModel, TargetConfig, TargetError};

//! LLVM backend for Opal.
//!
//! This crate lowers a parsed program onto LLVM IR through `inkwell` and
//! either emits per-file artifacts (object, assembly, textual IR) or links
//! the modules in memory and runs the entry function under a JIT.
//!
//! # Architecture
//!
//! - [`context::CGContext`]: per-unit codegen state (module, builder, type
//!   tables, namespace stack, mangler)
//! - [`symbol`]: scoped symbol tables and typed values
//! - [`expr`] / [`stmt`] / [`toplevel`]: the AST visitors
//! - [`aot`]: target configuration and artifact emission
//! - [`jit`]: in-memory linking and entry-point execution
//! - [`driver`]: the compile loop tying the above together
//!
//! # Debugging
//!
//! Enable tracing with `RUST_LOG=opal_llvm=debug` (or `=trace`).

pub mod aot;
pub mod context;
pub mod driver;
pub mod expr;
pub mod jit;
pub mod mangle;
pub mod stmt;
pub mod symbol;
pub mod toplevel;
pub mod types;

#[cfg(test)]
mod tests;

pub use context::CGContext;
pub use driver::{CompileError, CompileOptions, CompileOutcome, Compiler, ParsedUnit};
pub use mangle::{Mangler, NamespaceHierarchy};
pub use symbol::{SymbolTable, Value, Variable};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times. Only installs a
/// subscriber when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

//! Just-in-time execution.
//!
//! All compiled modules are linked into one in memory, a JIT execution
//! engine is created over the result, and the program's entry function is
//! called. External-linkage symbols resolve against the host process.

use std::fmt;

use inkwell::execution_engine::ExecutionEngine;
use inkwell::module::Module;
use tracing::debug;

use crate::aot::OptLevel;

/// The symbol the JIT looks for first: `main` with no parameters, mangled.
pub const ENTRY_SYMBOL: &str = "_Z4mainE";

/// Error type for JIT execution.
#[derive(Debug, Clone)]
pub enum JitError {
    /// Linking two modules failed.
    Link(String),
    /// The execution engine could not be created.
    Engine(String),
    /// No entry function was found in the linked module.
    MissingEntry,
}

impl fmt::Display for JitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(msg) => write!(f, "failed to link modules: {msg}"),
            Self::Engine(msg) => write!(f, "failed to create execution engine: {msg}"),
            Self::MissingEntry => write!(f, "no 'main' function to execute"),
        }
    }
}

impl std::error::Error for JitError {}

/// Link all modules in memory and run the entry function, returning its
/// `i32` exit code. The optimization level is forwarded to the engine.
///
/// # Errors
///
/// Returns an error if linking fails, the engine cannot be created, or no
/// entry function exists.
pub fn run_entry(modules: Vec<Module<'_>>, opt_level: OptLevel) -> Result<i32, JitError> {
    let mut iter = modules.into_iter();
    let main_module = iter.next().ok_or(JitError::MissingEntry)?;
    for other in iter {
        main_module
            .link_in_module(other)
            .map_err(|e| JitError::Link(e.to_string()))?;
    }

    let engine = main_module
        .create_jit_execution_engine(opt_level.to_llvm())
        .map_err(|e| JitError::Engine(e.to_string()))?;

    let entry = find_entry(&engine, &main_module).ok_or(JitError::MissingEntry)?;
    debug!("calling entry function");

    // SAFETY: the entry function was compiled from a verified module with
    // the signature `() -> i32`.
    let code = unsafe { entry.call() };
    Ok(code)
}

type EntryFn = unsafe extern "C" fn() -> i32;

fn find_entry<'ctx>(
    engine: &ExecutionEngine<'ctx>,
    module: &Module<'ctx>,
) -> Option<inkwell::execution_engine::JitFunction<'ctx, EntryFn>> {
    for name in [ENTRY_SYMBOL, "main"] {
        if module.get_function(name).is_some() {
            // SAFETY: the signature matches the lowered entry function.
            if let Ok(f) = unsafe { engine.get_function::<EntryFn>(name) } {
                return Some(f);
            }
        }
    }
    None
}

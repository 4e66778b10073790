//! The compile driver.
//!
//! One [`Compiler`] owns the compile loop for a set of parsed translation
//! units: lower every unit to an LLVM module, then either emit one artifact
//! per input or link everything in memory and run the entry function. Each
//! unit gets its own [`CGContext`]; the first diagnostic aborts the unit.

use std::fmt;
use std::path::{Path, PathBuf};

use inkwell::context::Context;
use tracing::debug;

use opal_ast::Program;
use opal_diagnostic::SourceFile;

use crate::aot::{EmitError, ObjectEmitter, OptLevel, OutputFormat, RelocModel, TargetConfig, TargetError};
use crate::context::CGContext;
use crate::jit::{self, JitError};
use crate::toplevel::gen_toplevel;

/// Compile configuration from the command line.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Link in memory and run instead of emitting artifacts.
    pub jit: bool,
    pub emit: OutputFormat,
    pub opt_level: OptLevel,
    pub reloc_model: RelocModel,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            jit: false,
            emit: OutputFormat::Object,
            opt_level: OptLevel::O0,
            reloc_model: RelocModel::default(),
        }
    }
}

/// One parsed translation unit, ready for code generation.
pub struct ParsedUnit {
    pub path: PathBuf,
    pub file: SourceFile,
    pub program: Program,
}

/// The result of a compiler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOutcome {
    /// The entry function's return value, when run under `--JIT`.
    pub jit_exit: Option<i32>,
}

/// Error from a compiler run. Diagnostics arrive already rendered against
/// their unit's source.
#[derive(Debug)]
pub enum CompileError {
    /// A compile-time diagnostic, rendered with file, line, and caret.
    Diagnostic(String),
    Target(TargetError),
    Emit(EmitError),
    Jit(JitError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostic(rendered) => f.write_str(rendered),
            Self::Target(err) => write!(f, "{err}"),
            Self::Emit(err) => write!(f, "{err}"),
            Self::Jit(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<TargetError> for CompileError {
    fn from(err: TargetError) -> Self {
        Self::Target(err)
    }
}

impl From<EmitError> for CompileError {
    fn from(err: EmitError) -> Self {
        Self::Emit(err)
    }
}

impl From<JitError> for CompileError {
    fn from(err: JitError) -> Self {
        Self::Jit(err)
    }
}

/// Owns the options and drives codegen, emission, and the JIT.
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile every unit, then emit artifacts or run the entry function.
    ///
    /// # Errors
    ///
    /// Returns the first diagnostic of the failing unit, or a back-end
    /// error.
    pub fn run(&self, units: Vec<ParsedUnit>) -> Result<CompileOutcome, CompileError> {
        let llcx = Context::create();

        let mut compiled = Vec::with_capacity(units.len());
        for unit in units {
            let module_name = unit
                .path
                .file_stem()
                .map_or_else(|| "module".to_string(), |s| s.to_string_lossy().into_owned());
            debug!(module = %module_name, "compiling unit");

            let mut ctx = CGContext::new(&llcx, &module_name, unit.file);
            for item in &unit.program {
                if let Err(diag) = gen_toplevel(&mut ctx, item) {
                    return Err(CompileError::Diagnostic(ctx.file.render(&diag)));
                }
            }
            compiled.push((unit.path, ctx.module));
        }

        if self.options.jit {
            let modules = compiled.into_iter().map(|(_, module)| module).collect();
            let code = jit::run_entry(modules, self.options.opt_level)?;
            return Ok(CompileOutcome {
                jit_exit: Some(code),
            });
        }

        let config = TargetConfig::native()?
            .with_opt_level(self.options.opt_level)
            .with_reloc_model(self.options.reloc_model);
        let emitter = ObjectEmitter::new(&config)?;

        for (path, module) in &compiled {
            emitter.configure_module(module)?;
            let out = artifact_path(path, self.options.emit);
            debug!(path = %out.display(), "emitting");
            emitter.verify_optimize_emit(module, self.options.opt_level, &out, self.options.emit)?;
        }

        Ok(CompileOutcome { jit_exit: None })
    }
}

/// `<input-stem>.<ext>` in the working directory.
fn artifact_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "out".to_string(), |s| s.to_string_lossy().into_owned());
    PathBuf::from(format!("{stem}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_use_the_input_stem() {
        assert_eq!(
            artifact_path(Path::new("src/hello.opal"), OutputFormat::Object),
            PathBuf::from("hello.o")
        );
        assert_eq!(
            artifact_path(Path::new("hello.opal"), OutputFormat::Assembly),
            PathBuf::from("hello.s")
        );
        assert_eq!(
            artifact_path(Path::new("hello.opal"), OutputFormat::LlvmIr),
            PathBuf::from("hello.ll")
        );
    }

    #[test]
    fn default_options_emit_objects() {
        let options = CompileOptions::default();
        assert!(!options.jit);
        assert_eq!(options.emit, OutputFormat::Object);
        assert_eq!(options.opt_level, OptLevel::O0);
    }
}

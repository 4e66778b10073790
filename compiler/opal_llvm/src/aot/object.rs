//! Artifact emission: object files, assembly, and textual LLVM IR.
//!
//! Emission always runs the verify → optimize → write pipeline; a module
//! that fails verification is a compiler bug and never reaches the target
//! machine.

use std::fmt;
use std::path::Path;

use inkwell::module::Module;
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{FileType, TargetMachine};

use super::target::{OptLevel, TargetConfig, TargetError};

/// Error type for artifact emission.
#[derive(Debug, Clone)]
pub enum EmitError {
    /// Failed to create or configure the target machine.
    TargetMachine(TargetError),
    /// LLVM IR verification failed (a compiler bug).
    Verification(String),
    /// The optimization pipeline failed.
    Optimization(String),
    /// Writing the artifact failed.
    Write { path: String, message: String },
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetMachine(err) => write!(f, "target machine: {err}"),
            Self::Verification(msg) => write!(f, "IR verification failed: {msg}"),
            Self::Optimization(msg) => write!(f, "optimization failed: {msg}"),
            Self::Write { path, message } => {
                write!(f, "failed to write '{path}': {message}")
            }
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TargetMachine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TargetError> for EmitError {
    fn from(err: TargetError) -> Self {
        Self::TargetMachine(err)
    }
}

/// Output format for code emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Native object file.
    Object,
    /// Assembly text.
    Assembly,
    /// Textual LLVM IR.
    LlvmIr,
}

impl OutputFormat {
    /// Parse the `--emit` option argument.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "obj" => Some(Self::Object),
            "asm" => Some(Self::Assembly),
            "llvm" => Some(Self::LlvmIr),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Object => "o",
            Self::Assembly => "s",
            Self::LlvmIr => "ll",
        }
    }
}

/// Artifact emitter for one target configuration.
pub struct ObjectEmitter {
    machine: TargetMachine,
    config: TargetConfig,
}

impl ObjectEmitter {
    /// Create an emitter for a target configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the target machine cannot be created.
    pub fn new(config: &TargetConfig) -> Result<Self, EmitError> {
        let machine = config.create_target_machine()?;
        Ok(Self {
            machine,
            config: config.clone(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Set triple and data layout on a module before emission.
    ///
    /// # Errors
    ///
    /// Returns an error if module configuration fails.
    pub fn configure_module(&self, module: &Module<'_>) -> Result<(), EmitError> {
        self.config.configure_module(module).map_err(EmitError::from)
    }

    /// Verify, optimize, and write a module in the requested format.
    ///
    /// # Errors
    ///
    /// Returns an error if verification, optimization, or the write fails.
    pub fn verify_optimize_emit(
        &self,
        module: &Module<'_>,
        opt_level: OptLevel,
        path: &Path,
        format: OutputFormat,
    ) -> Result<(), EmitError> {
        if let Err(msg) = module.verify() {
            return Err(EmitError::Verification(msg.to_string()));
        }

        module
            .run_passes(
                opt_level.pipeline_string(),
                &self.machine,
                PassBuilderOptions::create(),
            )
            .map_err(|e| EmitError::Optimization(e.to_string()))?;

        self.emit(module, path, format)
    }

    /// Write a module in the requested format, without optimizing.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn emit(
        &self,
        module: &Module<'_>,
        path: &Path,
        format: OutputFormat,
    ) -> Result<(), EmitError> {
        match format {
            OutputFormat::Object => self.emit_machine_code(module, path, FileType::Object),
            OutputFormat::Assembly => self.emit_machine_code(module, path, FileType::Assembly),
            OutputFormat::LlvmIr => module.print_to_file(path).map_err(|e| EmitError::Write {
                path: path.to_string_lossy().into_owned(),
                message: e.to_string(),
            }),
        }
    }

    fn emit_machine_code(
        &self,
        module: &Module<'_>,
        path: &Path,
        file_type: FileType,
    ) -> Result<(), EmitError> {
        self.machine
            .write_to_file(module, file_type, path)
            .map_err(|e| EmitError::Write {
                path: path.to_string_lossy().into_owned(),
                message: e.to_string(),
            })
    }
}

impl fmt::Debug for ObjectEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectEmitter")
            .field("target", &self.config.triple())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::from_name("obj"), Some(OutputFormat::Object));
        assert_eq!(OutputFormat::from_name("asm"), Some(OutputFormat::Assembly));
        assert_eq!(OutputFormat::from_name("llvm"), Some(OutputFormat::LlvmIr));
        assert_eq!(OutputFormat::from_name("wasm"), None);
        assert_eq!(OutputFormat::Object.extension(), "o");
        assert_eq!(OutputFormat::Assembly.extension(), "s");
        assert_eq!(OutputFormat::LlvmIr.extension(), "ll");
    }

    #[test]
    fn emits_an_object_file() {
        let Ok(config) = TargetConfig::native() else {
            return;
        };
        let Ok(emitter) = ObjectEmitter::new(&config) else {
            return;
        };

        let llcx = Context::create();
        let module = llcx.create_module("t");
        let i32_ty = llcx.i32_type();
        let fn_ty = i32_ty.fn_type(&[], false);
        let func = module.add_function("answer", fn_ty, None);
        let entry = llcx.append_basic_block(func, "entry");
        let builder = llcx.create_builder();
        builder.position_at_end(entry);
        builder
            .build_return(Some(&i32_ty.const_int(42, false)))
            .unwrap();

        emitter.configure_module(&module).unwrap();

        let dir = std::env::temp_dir();
        let path = dir.join("opal_emit_test.o");
        emitter
            .verify_optimize_emit(&module, OptLevel::O1, &path, OutputFormat::Object)
            .unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn broken_module_fails_verification() {
        let Ok(config) = TargetConfig::native() else {
            return;
        };
        let Ok(emitter) = ObjectEmitter::new(&config) else {
            return;
        };

        let llcx = Context::create();
        let module = llcx.create_module("t");
        let fn_ty = llcx.void_type().fn_type(&[], false);
        let func = module.add_function("broken", fn_ty, None);
        // A block with no terminator fails LLVM verification.
        llcx.append_basic_block(func, "entry");

        emitter.configure_module(&module).unwrap();
        let path = std::env::temp_dir().join("opal_emit_broken.o");
        let err = emitter
            .verify_optimize_emit(&module, OptLevel::O0, &path, OutputFormat::Object)
            .unwrap_err();
        assert!(matches!(err, EmitError::Verification(_)));
    }
}

//! Target configuration for AOT compilation.
//!
//! Wraps LLVM target initialization (which must happen exactly once per
//! process) and `TargetMachine` creation for the host triple.

use std::fmt;
use std::sync::Once;

use inkwell::targets::{
    CodeModel, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use inkwell::OptimizationLevel;

/// Error type for target configuration operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// Failed to initialize the LLVM target.
    InitializationFailed(String),
    /// Failed to create a target machine.
    TargetMachineCreationFailed(String),
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => {
                write!(f, "failed to initialize LLVM target: {msg}")
            }
            Self::TargetMachineCreationFailed(msg) => {
                write!(f, "failed to create target machine: {msg}")
            }
        }
    }
}

impl std::error::Error for TargetError {}

/// Optimization level forwarded to the back-end, `-O0` through `-O3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
}

impl OptLevel {
    /// Parse the `--Opt` option argument.
    #[must_use]
    pub fn from_digit(digit: u32) -> Option<Self> {
        Some(match digit {
            0 => Self::O0,
            1 => Self::O1,
            2 => Self::O2,
            3 => Self::O3,
            _ => return None,
        })
    }

    /// The new-pass-manager pipeline string for this level.
    #[must_use]
    pub fn pipeline_string(self) -> &'static str {
        match self {
            Self::O0 => "default<O0>",
            Self::O1 => "default<O1>",
            Self::O2 => "default<O2>",
            Self::O3 => "default<O3>",
        }
    }

    #[must_use]
    pub fn to_llvm(self) -> OptimizationLevel {
        match self {
            Self::O0 => OptimizationLevel::None,
            Self::O1 => OptimizationLevel::Less,
            Self::O2 => OptimizationLevel::Default,
            Self::O3 => OptimizationLevel::Aggressive,
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::O0 => write!(f, "O0"),
            Self::O1 => write!(f, "O1"),
            Self::O2 => write!(f, "O2"),
            Self::O3 => write!(f, "O3"),
        }
    }
}

/// Relocation model for non-JIT artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocModel {
    Static,
    #[default]
    Pic,
}

impl RelocModel {
    /// Parse the `--relocation-model` option argument.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "static" => Some(Self::Static),
            "pic" => Some(Self::Pic),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_llvm(self) -> RelocMode {
        match self {
            Self::Static => RelocMode::Static,
            Self::Pic => RelocMode::PIC,
        }
    }
}

/// Target configuration for the host machine.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    triple: String,
    cpu: String,
    features: String,
    opt_level: OptLevel,
    reloc_model: RelocModel,
}

impl TargetConfig {
    /// Create a configuration for the native (host) target.
    ///
    /// # Errors
    ///
    /// Returns an error if LLVM target initialization fails.
    pub fn native() -> Result<Self, TargetError> {
        initialize_native_target()?;

        let triple = TargetMachine::get_default_triple();
        Ok(Self {
            triple: triple.as_str().to_string_lossy().to_string(),
            cpu: "generic".to_string(),
            features: String::new(),
            opt_level: OptLevel::O0,
            reloc_model: RelocModel::default(),
        })
    }

    #[must_use]
    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    #[must_use]
    pub fn with_reloc_model(mut self, model: RelocModel) -> Self {
        self.reloc_model = model;
        self
    }

    #[must_use]
    pub fn triple(&self) -> &str {
        &self.triple
    }

    #[must_use]
    pub fn opt_level(&self) -> OptLevel {
        self.opt_level
    }

    /// Create an LLVM `TargetMachine` for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if LLVM cannot create a machine for the triple.
    pub fn create_target_machine(&self) -> Result<TargetMachine, TargetError> {
        let target_triple = TargetTriple::create(&self.triple);
        let target = Target::from_triple(&target_triple).map_err(|e| {
            TargetError::TargetMachineCreationFailed(format!("failed to get target: {e}"))
        })?;

        target
            .create_target_machine(
                &target_triple,
                &self.cpu,
                &self.features,
                self.opt_level.to_llvm(),
                self.reloc_model.to_llvm(),
                CodeModel::Default,
            )
            .ok_or_else(|| {
                TargetError::TargetMachineCreationFailed(format!(
                    "LLVM returned no machine for target '{}'",
                    self.triple
                ))
            })
    }

    /// Set the target triple and data layout on a module. Required before
    /// emission.
    ///
    /// # Errors
    ///
    /// Returns an error if a target machine cannot be created.
    pub fn configure_module(
        &self,
        module: &inkwell::module::Module<'_>,
    ) -> Result<(), TargetError> {
        let machine = self.create_target_machine()?;
        module.set_triple(&TargetTriple::create(&self.triple));
        module.set_data_layout(&machine.get_target_data().get_data_layout());
        Ok(())
    }
}

static NATIVE_TARGET_INIT: Once = Once::new();

/// Initialize the native LLVM target. Safe to call multiple times;
/// initialization happens once per process.
pub fn initialize_native_target() -> Result<(), TargetError> {
    let mut result = Ok(());
    NATIVE_TARGET_INIT.call_once(|| {
        if let Err(e) = Target::initialize_native(&InitializationConfig::default()) {
            result = Err(TargetError::InitializationFailed(e.clone()));
        }
    });
    result
}

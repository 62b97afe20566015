//! Host target configuration.

use std::sync::Once;

use inkwell::targets::{
    CodeModel, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use inkwell::OptimizationLevel;
use thiserror::Error;

/// Target-resolution failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("failed to initialize native target: {0}")]
    Initialization(String),

    #[error("failed to resolve target '{triple}': {message}")]
    Resolution { triple: String, message: String },

    #[error("failed to create target machine for '{triple}'")]
    MachineCreation { triple: String },
}

static NATIVE_INIT: Once = Once::new();

fn initialize_native() -> Result<(), TargetError> {
    let mut result = Ok(());
    NATIVE_INIT.call_once(|| {
        result = Target::initialize_native(&InitializationConfig::default())
            .map_err(TargetError::Initialization);
    });
    result
}

/// Description of the machine code is emitted for.
pub struct TargetConfig {
    triple: TargetTriple,
    cpu: String,
    features: String,
}

impl TargetConfig {
    /// Auto-detect the host target.
    pub fn native() -> Result<Self, TargetError> {
        initialize_native()?;
        Ok(TargetConfig {
            triple: TargetMachine::get_default_triple(),
            cpu: TargetMachine::get_host_cpu_name().to_string(),
            features: TargetMachine::get_host_cpu_features().to_string(),
        })
    }

    pub fn triple(&self) -> &TargetTriple {
        &self.triple
    }

    /// Build the LLVM target machine for this configuration.
    pub fn create_target_machine(&self) -> Result<TargetMachine, TargetError> {
        let triple_str = self.triple.as_str().to_string_lossy().into_owned();

        let target = Target::from_triple(&self.triple).map_err(|message| {
            TargetError::Resolution {
                triple: triple_str.clone(),
                message: message.to_string(),
            }
        })?;

        target
            .create_target_machine(
                &self.triple,
                &self.cpu,
                &self.features,
                OptimizationLevel::Default,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or(TargetError::MachineCreation { triple: triple_str })
    }
}

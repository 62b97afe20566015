//! Object-file emission and executable linking.

use std::path::{Path, PathBuf};
use std::process::Command;

use inkwell::module::Module;
use inkwell::targets::{FileType, TargetMachine};
use thiserror::Error;

use super::target::{TargetConfig, TargetError};

/// Emission and linking failures. Temporary artifacts are cleaned up on
/// every failure path.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("failed to emit object file '{path}': {message}")]
    ObjectEmission { path: String, message: String },

    #[error("failed to link executable '{path}': {message}")]
    Link { path: String, message: String },
}

/// Removes the temporary object file when dropped.
struct TempObject(PathBuf);

impl Drop for TempObject {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Emits a finished module for one target.
pub struct ObjectEmitter {
    machine: TargetMachine,
    config: TargetConfig,
}

impl ObjectEmitter {
    pub fn new(config: TargetConfig) -> Result<Self, EmitError> {
        let machine = config.create_target_machine()?;
        Ok(ObjectEmitter { machine, config })
    }

    /// Emitter for the host target.
    pub fn native() -> Result<Self, EmitError> {
        Self::new(TargetConfig::native()?)
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Emit a native object file.
    pub fn emit_object(&self, module: &Module<'_>, path: &Path) -> Result<(), EmitError> {
        module.set_triple(self.config.triple());
        self.machine
            .write_to_file(module, FileType::Object, path)
            .map_err(|message| EmitError::ObjectEmission {
                path: path.to_string_lossy().into_owned(),
                message: message.to_string(),
            })
    }

    /// Emit a standalone executable by linking a temporary object file
    /// with the system C compiler.
    pub fn emit_executable(&self, module: &Module<'_>, path: &Path) -> Result<(), EmitError> {
        let temp = TempObject(std::env::temp_dir().join(format!(
            "desim-{}-{}.o",
            std::process::id(),
            path.file_stem().map_or_else(
                || "out".to_owned(),
                |stem| stem.to_string_lossy().into_owned()
            )
        )));

        self.emit_object(module, &temp.0)?;

        let output = Command::new("cc")
            .arg("-no-pie")
            .arg("-o")
            .arg(path)
            .arg(&temp.0)
            .output()
            .map_err(|err| EmitError::Link {
                path: path.to_string_lossy().into_owned(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(EmitError::Link {
                path: path.to_string_lossy().into_owned(),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

//! AOT backend: native object emission and executable linking.
//!
//! Thin glue between the finished module and the system toolchain: a
//! target-machine description for the host, object-file emission, and an
//! external linker invocation for standalone executables.

mod object;
mod target;

pub use object::{EmitError, ObjectEmitter};
pub use target::{TargetConfig, TargetError};

use std::path::Path;

use crate::module::Generator;

impl Generator<'_> {
    /// Emit the module as a native object file for the host target.
    pub fn emit_object_file(&self, path: &Path) -> Result<(), EmitError> {
        let emitter = ObjectEmitter::native()?;
        emitter.emit_object(self.cx().llmod(), path)
    }

    /// Emit the module as a standalone executable: emit a temporary
    /// object file, then drive the system C compiler as the linker.
    pub fn emit_executable(&self, path: &Path) -> Result<(), EmitError> {
        let emitter = ObjectEmitter::native()?;
        emitter.emit_executable(self.cx().llmod(), path)
    }
}

//! Lowering errors.

use thiserror::Error;

/// An unrecoverable lowering failure.
//
// Not-yet-implemented constructs are deliberately NOT errors: they degrade
// to a `tracing::warn!` and a no-op for that node, per construct. Only the
// kinds below abort a `generate` pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodegenError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("variable '{name}' used before initialization")]
    UninitializedRead { name: String },

    #[error("'{name}' already declared")]
    Redeclaration { name: String },

    #[error("type mismatch in {context}")]
    TypeMismatch { context: &'static str },

    #[error("undefined function '{name}'")]
    UndefinedFunction { name: String },

    #[error("undefined class or object '{name}'")]
    UndefinedClassOrObject { name: String },

    #[error("module verification failed: {message}")]
    ModuleVerification { message: String },
}

impl CodegenError {
    pub fn undefined_variable(name: &str) -> Self {
        CodegenError::UndefinedVariable {
            name: name.to_owned(),
        }
    }

    pub fn uninitialized_read(name: &str) -> Self {
        CodegenError::UninitializedRead {
            name: name.to_owned(),
        }
    }

    pub fn redeclaration(name: &str) -> Self {
        CodegenError::Redeclaration {
            name: name.to_owned(),
        }
    }

    pub fn undefined_function(name: &str) -> Self {
        CodegenError::UndefinedFunction {
            name: name.to_owned(),
        }
    }

    pub fn undefined_class_or_object(name: &str) -> Self {
        CodegenError::UndefinedClassOrObject {
            name: name.to_owned(),
        }
    }
}

//! LLVM backend for desim.
//!
//! Lowers a parsed desim program (see `desim_ir`) into an LLVM module,
//! then either JIT-executes it in-process — optionally under interactive
//! source-level debugging via `desim_debug` — or emits a native object
//! file / executable.
//!
//! # Debug Environment Variables
//!
//! - `DESIM_DEBUG_LLVM`: Print LLVM IR to stderr before JIT execution.
//!   Any non-empty value enables this.
//! - `RUST_LOG=desim_llvm=debug`: Enable debug-level tracing output.
//! - `RUST_LOG=desim_llvm=trace`: Trace expression lowering step by step.
//!
//! # Key Types
//!
//! - [`Generator`](module::Generator): owns the LLVM module/builder and
//!   drives lowering, JIT execution, and native emission
//! - [`CodegenCx`](context::CodegenCx): type mapping and declaration cache
//! - [`SymbolTable`](symbols::SymbolTable): flat per-unit name store

// Crate-level lint configuration for codegen-specific patterns
#![allow(
    // LLVM APIs use specific integer widths; desim INT is i32
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    // Codegen methods thread context, symbols, and debug state together
    clippy::too_many_arguments,
)]

pub mod aot;
pub mod builder;
pub mod context;
pub mod error;
pub mod jit;
pub mod module;
pub mod parallel;
pub mod runtime;
pub mod symbols;

mod exprs;
mod functions;
mod stmts;

pub use aot::{EmitError, ObjectEmitter, TargetConfig, TargetError};
pub use builder::Builder;
pub use context::CodegenCx;
pub use error::CodegenError;
pub use jit::JitError;
pub use module::Generator;
pub use parallel::{body_is_parallel_safe, EmissionStrategy, ParallelPolicy, SequentialPolicy};
pub use symbols::{Symbol, SymbolInfo, SymbolTable};

#[cfg(test)]
mod tests;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=desim_llvm=debug` or `RUST_LOG=desim_llvm=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

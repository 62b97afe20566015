//! Lowering and execution tests.
//!
//! These compile small programs built directly as AST and JIT-execute
//! them, so they need LLVM 17 available (this crate is excluded from the
//! default workspace build for the same reason).

mod helpers;

mod debug_tests;
mod error_tests;

//! Debug instrumentation for JIT-executed desim programs.
//!
//! The backend threads calls to [`hook::desim_debug_hook`] into emitted
//! code; at runtime the hook consults a [`DebugContext`] shared with the
//! compiler, checks breakpoints, and can suspend the program in a blocking
//! interactive command loop on stdin.
//!
//! The context is shared by reference, never copied: the lowering engine
//! writes compile-time records (variable values, call entry/exit) into it,
//! and the hook mutates its location and debugger state from inside
//! already-compiled native code. Execution is single-threaded (the hook is
//! a synchronous call-back from the JIT thread), so the [`parking_lot`]
//! mutex around it is uncontended.

pub mod hook;

mod breakpoint;
mod commands;
mod context;

pub use breakpoint::{Breakpoint, BreakpointKind};
pub use context::{DebugContext, DebugLevel, DebugRecordKind, DebuggerState};
pub use hook::{HookRegistry, HookToken};

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to a debug context.
///
/// Held by the code generator (non-owning from its point of view) and by
/// the hook registry for the duration of one compile+execute run.
pub type DebugHandle = Arc<Mutex<DebugContext>>;

/// Wrap a context in a shareable handle.
pub fn share(ctx: DebugContext) -> DebugHandle {
    Arc::new(Mutex::new(ctx))
}

//! Native hook trampoline callable from JIT-compiled code.
//!
//! Emitted code calls [`desim_debug_hook`] synchronously at instrumented
//! call sites, passing the current line and the enclosing function name.
//! The hook consults whichever registered context is active, re-checks
//! breakpoints, and blocks in the interactive command loop while the
//! debugger is in `Break` or `Step`.
//!
//! Contexts are registered per engine instance rather than through a bare
//! process-wide pointer, so concurrent compilations do not collide: each
//! JIT run registers its handle, activates it for the duration of the run,
//! and unregisters afterwards.

use std::ffi::{c_char, CStr};
use std::io;

use parking_lot::Mutex;

use crate::context::DebuggerState;
use crate::DebugHandle;

/// Token returned by [`HookRegistry::register`]; identifies one entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HookToken(u64);

struct Registry {
    entries: Vec<(u64, DebugHandle)>,
    active: Option<u64>,
    next: u64,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    entries: Vec::new(),
    active: None,
    next: 1,
});

/// Registration table mapping engine instances to debug contexts.
pub struct HookRegistry;

impl HookRegistry {
    /// Register a context and return its token. The context does not
    /// receive hook calls until [`activate`](Self::activate)d.
    pub fn register(handle: DebugHandle) -> HookToken {
        let mut reg = REGISTRY.lock();
        let id = reg.next;
        reg.next += 1;
        reg.entries.push((id, handle));
        HookToken(id)
    }

    /// Make this registration the one the trampoline consults.
    pub fn activate(token: HookToken) {
        REGISTRY.lock().active = Some(token.0);
    }

    /// Deactivate without unregistering.
    pub fn deactivate(token: HookToken) {
        let mut reg = REGISTRY.lock();
        if reg.active == Some(token.0) {
            reg.active = None;
        }
    }

    /// Remove a registration entirely.
    pub fn unregister(token: HookToken) {
        let mut reg = REGISTRY.lock();
        reg.entries.retain(|(id, _)| *id != token.0);
        if reg.active == Some(token.0) {
            reg.active = None;
        }
    }

    /// The currently active handle, if any.
    pub fn active_handle() -> Option<DebugHandle> {
        let reg = REGISTRY.lock();
        let active = reg.active?;
        reg.entries
            .iter()
            .find(|(id, _)| *id == active)
            .map(|(_, handle)| handle.clone())
    }
}

/// Breakpoint hook called from JIT-compiled native code.
///
/// ABI: 32-bit line number plus a NUL-terminated function name, no return
/// value. Execution of the generated program is fully suspended while this
/// blocks on stdin.
#[no_mangle]
pub extern "C" fn desim_debug_hook(line: i32, function_name: *const c_char) {
    let Some(handle) = HookRegistry::active_handle() else {
        tracing::warn!("debug hook called with no active debug context");
        return;
    };

    let function = if function_name.is_null() {
        "<unknown>".to_owned()
    } else {
        // SAFETY: emitted code passes a pointer to a NUL-terminated global
        // string constant it created for this call site.
        unsafe { CStr::from_ptr(function_name) }
            .to_string_lossy()
            .into_owned()
    };

    let mut ctx = handle.lock();
    if !ctx.is_enabled() {
        return;
    }

    let line = u32::try_from(line).unwrap_or(0);
    ctx.set_location(line, &function);

    if matches!(ctx.state(), DebuggerState::Break | DebuggerState::Step) {
        let stdin = io::stdin();
        ctx.run_break_loop(stdin.lock(), line, &function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{DebugContext, DebugLevel};
    use crate::BreakpointKind;
    use std::ffi::CString;
    use std::sync::Arc;

    // The registry is process-global; serialize the tests that touch it.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn quiet_ctx() -> DebugContext {
        DebugContext::with_sink(DebugLevel::None, Box::new(io::sink()))
    }

    #[test]
    fn hook_without_active_context_is_a_noop() {
        let _guard = TEST_LOCK.lock();
        let name = CString::new("main").expect("cstring");
        desim_debug_hook(1, name.as_ptr());
    }

    #[test]
    fn hook_updates_location_and_hits_breakpoint() {
        let _guard = TEST_LOCK.lock();
        let mut ctx = quiet_ctx();
        ctx.set_breakpoint(BreakpointKind::Line, "10");
        let handle = crate::share(ctx);
        let token = HookRegistry::register(handle.clone());
        HookRegistry::activate(token);

        // Line 9: no hit, no suspension.
        let name = CString::new("main").expect("cstring");
        desim_debug_hook(9, name.as_ptr());
        assert_eq!(handle.lock().state(), DebuggerState::Running);
        assert_eq!(handle.lock().current_line(), 9);

        // The matching transition is exercised directly rather than
        // through the trampoline, which would block on stdin once Break
        // is reached.
        {
            let mut ctx = handle.lock();
            ctx.set_location(10, "main");
            assert_eq!(ctx.state(), DebuggerState::Break);
            assert_eq!(ctx.breakpoints()[0].hit_count, 1);
        }

        HookRegistry::unregister(token);
        assert!(HookRegistry::active_handle().is_none());
    }

    #[test]
    fn registry_activation_switches_between_entries() {
        let _guard = TEST_LOCK.lock();
        let a = crate::share(quiet_ctx());
        let b = crate::share(quiet_ctx());
        let ta = HookRegistry::register(a.clone());
        let tb = HookRegistry::register(b);

        HookRegistry::activate(ta);
        assert!(HookRegistry::active_handle().is_some_and(|h| Arc::ptr_eq(&h, &a)));

        HookRegistry::activate(tb);
        assert!(HookRegistry::active_handle().is_some_and(|h| !Arc::ptr_eq(&h, &a)));

        HookRegistry::unregister(ta);
        HookRegistry::unregister(tb);
        assert!(HookRegistry::active_handle().is_none());
    }
}

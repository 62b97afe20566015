//! JIT execution backend.
//!
//! Creates an execution engine for the finished module, binds the debug
//! hook and runtime stub symbols to their in-process implementations, and
//! invokes the program's `main`. Once the engine exists it conceptually
//! owns the module; the generator never disposes the module independently
//! afterwards (inkwell enforces the teardown order).

use inkwell::OptimizationLevel;
use thiserror::Error;

use desim_debug::hook::desim_debug_hook;
use desim_debug::HookRegistry;

use crate::context::DEBUG_HOOK_SYMBOL;
use crate::module::Generator;
use crate::runtime;

/// JIT-specific failures. Each stage fails distinctly; the generator
/// stays safely destructible after any of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JitError {
    #[error("JIT engine not initialized")]
    NotInitialized,

    #[error("failed to create execution engine: {0}")]
    EngineCreation(String),

    #[error("no 'main' entry point in module")]
    EntryPointNotFound,

    #[error("failed to resolve entry point address: {0}")]
    SymbolResolution(String),
}

impl<'ll> Generator<'ll> {
    /// Build the execution engine and bind runtime symbols.
    ///
    /// Idempotent: a second call on an initialized generator is a no-op.
    pub fn init_jit(&mut self) -> Result<(), JitError> {
        if self.engine.is_some() {
            return Ok(());
        }

        let engine = self
            .cx
            .llmod()
            .create_jit_execution_engine(OptimizationLevel::None)
            .map_err(|message| JitError::EngineCreation(message.to_string()))?;

        // Bind whichever runtime stubs the module actually references.
        for (symbol, address) in runtime::symbol_mappings() {
            if let Some(function) = self.cx.llmod().get_function(symbol) {
                engine.add_global_mapping(&function, address);
            }
        }

        // Bind the hook trampoline and activate this run's debug context.
        if let Some(handle) = &self.debug {
            if let Some(hook) = self.cx.llmod().get_function(DEBUG_HOOK_SYMBOL) {
                engine.add_global_mapping(&hook, desim_debug_hook as *const () as usize);
            }
            let token = HookRegistry::register(handle.clone());
            HookRegistry::activate(token);
            self.hook_token = Some(token);
        }

        self.engine = Some(engine);
        Ok(())
    }

    /// Execute the program's entry function and return its exit code.
    pub fn execute_jit(&self) -> Result<i32, JitError> {
        let Some(engine) = self.engine.as_ref() else {
            return Err(JitError::NotInitialized);
        };

        if std::env::var("DESIM_DEBUG_LLVM").is_ok() {
            eprintln!("=== LLVM IR ===");
            eprintln!("{}", self.ir_to_string());
            eprintln!("=== END IR ===");
        }

        if self.cx.llmod().get_function("main").is_none() {
            return Err(JitError::EntryPointNotFound);
        }

        // SAFETY: `main` was generated with signature () -> i32 and the
        // module passed verification; the JIT resolves it to native code.
        unsafe {
            let main = engine
                .get_function::<unsafe extern "C" fn() -> i32>("main")
                .map_err(|message| JitError::SymbolResolution(message.to_string()))?;
            Ok(main.call())
        }
    }

    /// Release the hook registration. The engine itself stays alive until
    /// the generator is dropped.
    pub fn destroy_jit(&mut self) {
        if let Some(token) = self.hook_token.take() {
            HookRegistry::deactivate(token);
            HookRegistry::unregister(token);
        }
    }
}

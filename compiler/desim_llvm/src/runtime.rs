//! Runtime functions for JIT-compiled desim code.
//!
//! These are called by LLVM-compiled code at runtime and declared
//! `extern "C"` with stable symbol names. The random routines are a PCG32
//! generator with the classic distribution transforms, seeded
//! deterministically so runs are reproducible; the simulation-control
//! entries are stubs for the external event-queue runtime.

#![allow(unsafe_code)]
// FFI functions dereference pointers from LLVM-generated code (always valid)
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::cell::Cell;
use std::ffi::{c_char, CStr};

const PCG32_DEFAULT_STATE: u64 = 0x853c_49e6_748f_ea9b;
const PCG32_DEFAULT_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;
const PCG32_MULT: u64 = 0x5851_f42d_4c95_7f2d;

// Thread-local generator state so parallel test runs stay independent.
thread_local! {
    static RNG_STATE: Cell<u64> = const { Cell::new(PCG32_DEFAULT_STATE) };
    static RNG_INC: Cell<u64> = const { Cell::new(PCG32_DEFAULT_STREAM) };
}

fn pcg32_next() -> u32 {
    let oldstate = RNG_STATE.with(Cell::get);
    let inc = RNG_INC.with(Cell::get);
    RNG_STATE.with(|s| s.set(oldstate.wrapping_mul(PCG32_MULT).wrapping_add(inc)));
    let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
    let rot = (oldstate >> 59) as u32;
    xorshifted.rotate_right(rot)
}

fn uniform_f64() -> f64 {
    f64::from(pcg32_next()) / f64::from(u32::MAX)
}

/// Seed the generator and warm it up.
#[no_mangle]
pub extern "C" fn desim_rand_seed(seed: i64) {
    let seed = seed as u64;
    RNG_STATE.with(|s| s.set(seed.wrapping_add(PCG32_DEFAULT_STREAM)));
    RNG_INC.with(|s| s.set((seed << 1) | 1));
    let _ = pcg32_next();
}

/// Uniform draw in `[0, 1]`.
#[no_mangle]
pub extern "C" fn desim_rand_uniform() -> f64 {
    uniform_f64()
}

/// Uniform integer draw in `[min, max]` (inclusive).
#[no_mangle]
pub extern "C" fn desim_rand_uniform_int(min: i32, max: i32) -> i32 {
    if min > max {
        return min;
    }
    let span = f64::from(max) - f64::from(min) + 1.0;
    // The draw can land exactly on 1.0; clamp the top edge.
    (min + (span * uniform_f64()) as i32).min(max)
}

/// Normal draw via the Box-Muller transform.
#[no_mangle]
pub extern "C" fn desim_rand_normal(mean: f64, stddev: f64) -> f64 {
    let u1 = uniform_f64().max(f64::MIN_POSITIVE);
    let u2 = uniform_f64();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z0 * stddev
}

/// Exponential draw with the given rate.
#[no_mangle]
pub extern "C" fn desim_rand_exponential(rate: f64) -> f64 {
    if rate <= 0.0 {
        return 0.0;
    }
    let u = uniform_f64().max(f64::MIN_POSITIVE);
    -u.ln() / rate
}

/// Poisson draw: Knuth's algorithm for small lambda, normal
/// approximation above 30.
#[no_mangle]
pub extern "C" fn desim_rand_poisson(lambda: f64) -> i32 {
    if lambda <= 0.0 {
        return 0;
    }
    if lambda < 30.0 {
        let limit = (-lambda).exp();
        let mut k = 0i32;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= uniform_f64();
            if p <= limit {
                break;
            }
        }
        k - 1
    } else {
        (desim_rand_normal(lambda, lambda.sqrt()) + 0.5) as i32
    }
}

/// Stub for the external event-queue runtime: `SCHEDULE`.
#[no_mangle]
pub extern "C" fn desim_sim_schedule(event: *const c_char, time: f64) {
    let event = if event.is_null() {
        "<unnamed>".to_owned()
    } else {
        // SAFETY: emitted code passes a NUL-terminated global string.
        unsafe { CStr::from_ptr(event) }
            .to_string_lossy()
            .into_owned()
    };
    tracing::info!(event, time, "schedule requested (event queue not linked)");
}

/// Stub for the external event-queue runtime: `ADVANCE TIME`.
#[no_mangle]
pub extern "C" fn desim_sim_advance(delta: f64) {
    tracing::info!(delta, "time advance requested (event queue not linked)");
}

/// Symbols the JIT binds before execution.
pub fn symbol_mappings() -> Vec<(&'static str, usize)> {
    vec![
        ("desim_rand_seed", desim_rand_seed as *const () as usize),
        ("desim_rand_uniform", desim_rand_uniform as *const () as usize),
        ("desim_rand_uniform_int", desim_rand_uniform_int as *const () as usize),
        ("desim_rand_normal", desim_rand_normal as *const () as usize),
        ("desim_rand_exponential", desim_rand_exponential as *const () as usize),
        ("desim_rand_poisson", desim_rand_poisson as *const () as usize),
        ("desim_sim_schedule", desim_sim_schedule as *const () as usize),
        ("desim_sim_advance", desim_sim_advance as *const () as usize),
    ]
}

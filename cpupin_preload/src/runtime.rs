//! Process-wide runtime state and the load-time bootstrap.
//!
//! The runtime is built on first touch behind a once-guard: normally by the
//! `.init_array` constructor below, before the host's `main`; or, if some
//! other early constructor creates a thread first, by the intercepted call
//! itself through the same guard. Either way it is built exactly once, and
//! afterwards is read-only.

use std::io::Write;
use std::process;

use lazy_static::lazy_static;

use cpupin_core::config;
use cpupin_core::{AffinityStore, CpuMask, PinError};

use crate::real::RealFns;

// CpuMask hands its bytes straight to pthread_setaffinity_np.
const _: () = assert!(CpuMask::BYTE_LEN == std::mem::size_of::<libc::cpu_set_t>());

pub(crate) struct Runtime {
    pub real: RealFns,
    pub store: AffinityStore,
}

lazy_static! {
    pub(crate) static ref RUNTIME: Runtime = bootstrap();
}

fn bootstrap() -> Runtime {
    let store = config::store_from_env().unwrap_or_else(|err| die(&err));
    let real = RealFns::resolve().unwrap_or_else(|err| die(&err));
    Runtime { real, store }
}

/// A process must never keep running on a partial or ambiguous
/// configuration, so bootstrap failures end it before any intercepted call
/// can be served.
fn die(err: &PinError) -> ! {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "cpupin: fatal: {err}");
    process::abort();
}

/// Pin the thread that is loading the library to the first pool entry, so
/// the host's initial thread takes part in the rotation exactly like every
/// thread created after it.
fn pin_initial_thread() {
    let rt = &*RUNTIME;
    if let Some(mask) = rt.store.next_mask() {
        // Best effort: a failed pin must not keep the host from starting.
        // SAFETY: the mask bytes form a full cpu_set_t-sized buffer.
        let _ = unsafe {
            libc::pthread_setaffinity_np(
                libc::pthread_self(),
                CpuMask::BYTE_LEN,
                mask.as_bytes().as_ptr() as *const libc::cpu_set_t,
            )
        };
    }
}

extern "C" fn module_init() {
    pin_initial_thread();
}

#[used]
#[link_section = ".init_array"]
static MODULE_INIT: extern "C" fn() = module_init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_bootstraps_in_an_unconfigured_process() {
        // Neither CPUPIN variable is set in the test environment, so the
        // store must come up empty and translation must be the identity.
        let rt = &*RUNTIME;
        assert_eq!(rt.store.translate_forward(5), 5);
        assert_eq!(rt.store.translate_reverse(5), 5);
    }
}

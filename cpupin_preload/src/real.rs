//! One-time resolution of the genuine primitives.
//!
//! Every substituted entry point delegates to the implementation the host
//! would have called without us. Each address is looked up exactly once,
//! during bootstrap, with `dlsym(RTLD_NEXT, ...)`; a lookup that fails is a
//! fatal startup error, so the call paths never re-check.

use std::ffi::{c_void, CStr};
use std::mem;

use cpupin_core::{PinError, PinResult};

pub(crate) type PthreadCreateFn = unsafe extern "C" fn(
    *mut libc::pthread_t,
    *const libc::pthread_attr_t,
    extern "C" fn(*mut c_void) -> *mut c_void,
    *mut c_void,
) -> libc::c_int;

pub(crate) type SetAffinityFn =
    unsafe extern "C" fn(libc::pid_t, libc::size_t, *const libc::cpu_set_t) -> libc::c_int;

pub(crate) type GetAffinityFn =
    unsafe extern "C" fn(libc::pid_t, libc::size_t, *mut libc::cpu_set_t) -> libc::c_int;

pub(crate) type GetCpuFn = unsafe extern "C" fn() -> libc::c_int;

/// The genuine primitives, bound once and never re-resolved.
pub(crate) struct RealFns {
    pub pthread_create: PthreadCreateFn,
    pub sched_setaffinity: SetAffinityFn,
    pub sched_getaffinity: GetAffinityFn,
    pub sched_getcpu: GetCpuFn,
}

impl RealFns {
    pub fn resolve() -> PinResult<Self> {
        // SAFETY: each symbol is looked up under the name libc declares it
        // with, and cast to the matching signature; RTLD_NEXT skips this
        // library, so the result is the genuine implementation.
        unsafe {
            Ok(Self {
                pthread_create: lookup(c"pthread_create")?,
                sched_setaffinity: lookup(c"sched_setaffinity")?,
                sched_getaffinity: lookup(c"sched_getaffinity")?,
                sched_getcpu: lookup(c"sched_getcpu")?,
            })
        }
    }
}

/// Resolve `name` to its next occurrence after this library.
///
/// # Safety
/// `T` must be the fn-pointer type matching the symbol's actual signature.
unsafe fn lookup<T: Copy>(name: &CStr) -> PinResult<T> {
    debug_assert_eq!(mem::size_of::<T>(), mem::size_of::<*mut c_void>());
    let addr = libc::dlsym(libc::RTLD_NEXT, name.as_ptr());
    if addr.is_null() {
        return Err(PinError::symbol(name.to_string_lossy().into_owned()));
    }
    // SAFETY: fn pointers and data pointers share size and representation on
    // every platform this library supports.
    Ok(mem::transmute_copy(&addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_primitives_resolve() {
        let real = RealFns::resolve().unwrap();
        // The resolved sched_getcpu must be callable and answer sensibly.
        // SAFETY: resolved with the signature sched_getcpu actually has.
        let cpu = unsafe { (real.sched_getcpu)() };
        assert!(cpu >= 0);
    }

    #[test]
    fn unknown_symbols_fail_resolution() {
        // SAFETY: a failed lookup never produces a value to misuse.
        let missing: PinResult<GetCpuFn> =
            unsafe { lookup(c"cpupin_no_such_symbol_anywhere") };
        assert!(missing.is_err());
    }
}

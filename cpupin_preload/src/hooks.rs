//! The substituted entry points.
//!
//! Each function matches the signature and error contract of the primitive
//! it replaces, performs exactly one delegated call, and only rewrites the
//! affinity data flowing through. Delegation failures propagate verbatim;
//! the follow-up pin after `pthread_create` is best-effort and never alters
//! the primary result.

use std::ffi::c_void;
use std::slice;

use memmap2::MmapMut;

use cpupin_core::CpuMask;

use crate::runtime::RUNTIME;

/// Covers every cpu_set_t size glibc callers pass (128 bytes) with room for
/// enlarged sets; anything bigger falls back to an anonymous mapping, since
/// translation must not touch the host allocator mid-call.
const STACK_SCRATCH: usize = 512;

enum Scratch {
    Stack([u8; STACK_SCRATCH]),
    Mapped(MmapMut),
}

impl Scratch {
    fn with_len(len: usize) -> Option<Scratch> {
        if len <= STACK_SCRATCH {
            Some(Scratch::Stack([0; STACK_SCRATCH]))
        } else {
            MmapMut::map_anon(len).ok().map(Scratch::Mapped)
        }
    }

    fn bytes_mut(&mut self, len: usize) -> &mut [u8] {
        match self {
            Scratch::Stack(buf) => &mut buf[..len],
            Scratch::Mapped(map) => &mut map[..len],
        }
    }
}

fn scratch_failure() -> libc::c_int {
    // SAFETY: __errno_location always returns a valid thread-local pointer.
    unsafe { *libc::__errno_location() = libc::ENOMEM };
    -1
}

/// Delegates with the caller's original arguments, then pins the new thread
/// to the next round-robin mask. The thread's logical correctness does not
/// depend on pinning, so a failed pin leaves the return value untouched.
#[no_mangle]
pub unsafe extern "C" fn pthread_create(
    thread: *mut libc::pthread_t,
    attr: *const libc::pthread_attr_t,
    start_routine: extern "C" fn(*mut c_void) -> *mut c_void,
    arg: *mut c_void,
) -> libc::c_int {
    let rt = &*RUNTIME;
    let ret = (rt.real.pthread_create)(thread, attr, start_routine, arg);
    if ret == 0 {
        if let Some(mask) = rt.store.next_mask() {
            let _ = libc::pthread_setaffinity_np(
                *thread,
                CpuMask::BYTE_LEN,
                mask.as_bytes().as_ptr() as *const libc::cpu_set_t,
            );
        }
    }
    ret
}

/// Translates the caller's mask logical→physical into a scratch buffer of
/// the caller's byte length and delegates with that; the input buffer is
/// never written.
#[no_mangle]
pub unsafe extern "C" fn sched_setaffinity(
    pid: libc::pid_t,
    cpusetsize: libc::size_t,
    mask: *const libc::cpu_set_t,
) -> libc::c_int {
    let rt = &*RUNTIME;
    if mask.is_null() {
        // Delegate untouched so the genuine primitive raises its own EFAULT.
        return (rt.real.sched_setaffinity)(pid, cpusetsize, mask);
    }

    let src = slice::from_raw_parts(mask as *const u8, cpusetsize);
    let mut scratch = match Scratch::with_len(cpusetsize) {
        Some(scratch) => scratch,
        None => return scratch_failure(),
    };
    let translated = scratch.bytes_mut(cpusetsize);
    rt.store.translate_mask_forward(translated, src);

    (rt.real.sched_setaffinity)(pid, cpusetsize, translated.as_ptr() as *const libc::cpu_set_t)
}

/// Delegates into a scratch buffer and, only on success, translates the
/// result physical→logical into the caller's buffer. On failure the
/// caller's buffer is not written.
#[no_mangle]
pub unsafe extern "C" fn sched_getaffinity(
    pid: libc::pid_t,
    cpusetsize: libc::size_t,
    mask: *mut libc::cpu_set_t,
) -> libc::c_int {
    let rt = &*RUNTIME;
    if mask.is_null() {
        return (rt.real.sched_getaffinity)(pid, cpusetsize, mask);
    }

    let mut scratch = match Scratch::with_len(cpusetsize) {
        Some(scratch) => scratch,
        None => return scratch_failure(),
    };
    let raw = scratch.bytes_mut(cpusetsize);
    let ret = (rt.real.sched_getaffinity)(pid, cpusetsize, raw.as_mut_ptr() as *mut libc::cpu_set_t);
    if ret == 0 {
        let dest = slice::from_raw_parts_mut(mask as *mut u8, cpusetsize);
        rt.store.translate_mask_reverse(dest, raw);
    }
    ret
}

/// Delegates, then reports the physical index as its logical counterpart.
/// Negative sentinels are not CPU indices and pass through unmodified.
#[no_mangle]
pub unsafe extern "C" fn sched_getcpu() -> libc::c_int {
    let rt = &*RUNTIME;
    let cpu = (rt.real.sched_getcpu)();
    if cpu < 0 {
        return cpu;
    }
    rt.store.translate_reverse(cpu as usize) as libc::c_int
}

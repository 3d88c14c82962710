//! `LD_PRELOAD` interposition layer for transparent CPU-affinity control.
//!
//! Loaded ahead of libc into an unmodified host program, this library
//! substitutes four primitives and rewrites the affinity data flowing
//! through them:
//!
//! - `pthread_create` — after a successful creation, the new thread is
//!   pinned to the next mask of the configured round-robin pool
//! - `sched_setaffinity` — the caller's mask is translated logical→physical
//!   before reaching the kernel
//! - `sched_getaffinity` — the kernel's answer is translated
//!   physical→logical before reaching the caller
//! - `sched_getcpu` — the returned index is translated physical→logical
//!
//! Configuration comes from `CPUPIN_MAP` and `CPUPIN_RR` (see
//! `cpupin_core::config`); with neither set every substitute is a pure
//! pass-through. Host programs observe identical signatures, return values
//! and errno behavior throughout.
//!
//! Linux only: interposition relies on ELF symbol precedence and
//! `dlsym(RTLD_NEXT, ...)`.

#[cfg(target_os = "linux")]
mod hooks;
#[cfg(target_os = "linux")]
mod real;
#[cfg(target_os = "linux")]
mod runtime;

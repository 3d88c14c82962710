//! # cpupin core
//!
//! The affinity remapping engine behind the `cpupin` tools.
//!
//! A host program sees "logical" CPU indices; this crate holds the state and
//! logic to rewrite them into the physical layout actually handed to the
//! kernel, and back:
//!
//! - **Store**: bidirectional CPU-index translation tables and a round-robin
//!   pool of masks assigned to successively created threads
//! - **Config**: the `CPUPIN_MAP` / `CPUPIN_RR` environment specifications
//! - **Procfs**: per-thread state readers used by the monitor
//!
//! The interposition entry points themselves live in `cpupin_preload`; the
//! monitor CLI lives in `cpupin_monitor`. Everything here is plain library
//! code with no symbol tricks, so it can be tested like any other crate.
//!
//! ## Quick start
//!
//! ```rust
//! use cpupin_core::config;
//! use cpupin_core::store::{AffinityStore, PermutationTable};
//!
//! let pairs = config::parse_map_spec("0=1 1=0").unwrap();
//! let table = PermutationTable::from_pairs(&pairs).unwrap();
//! let store = AffinityStore::new(Some(table), None);
//!
//! assert_eq!(store.translate_forward(0), 1);
//! assert_eq!(store.translate_reverse(1), 0);
//! assert_eq!(store.translate_forward(9), 9);
//! ```

pub mod config;
pub mod error;
pub mod mask;
pub mod procfs;
pub mod store;

pub use error::{PinError, PinResult};
pub use mask::{CpuMask, MAX_CPUS};
pub use store::{AffinityStore, MaskPool, PermutationTable};

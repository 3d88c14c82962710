//! Environment configuration for the affinity engine.
//!
//! Two independent sources are read once, at load time:
//!
//! - [`MAP_ENV`] — a whitespace-separated list of `from=to` index pairs
//!   building the permutation table, e.g. `"0=4 1=5 4=0 5=1"`.
//! - [`RR_ENV`] — a whitespace-separated list of mask tokens for round-robin
//!   assignment; each token is comma-separated single indices or `a-b`
//!   ranges (either bound may come first), e.g. `"0 1 2-3"`.
//!
//! Any malformed token is a configuration error. Running on a partial or
//! ambiguous table is never an option, so callers treat these errors as
//! fatal.

use std::env;

use log::debug;

use crate::error::{PinError, PinResult};
use crate::mask::{CpuMask, MAX_CPUS};
use crate::store::{AffinityStore, MaskPool, PermutationTable};

/// Permutation specification variable.
pub const MAP_ENV: &str = "CPUPIN_MAP";

/// Round-robin mask list variable.
pub const RR_ENV: &str = "CPUPIN_RR";

/// Parse a permutation specification into `(from, to)` pairs.
pub fn parse_map_spec(spec: &str) -> PinResult<Vec<(usize, usize)>> {
    let mut pairs = Vec::new();
    for token in spec.split_whitespace() {
        let (from, to) = token.split_once('=').ok_or_else(|| {
            PinError::parse(format!("invalid mapping '{token}': expected <from>=<to>"))
        })?;
        let from = from.parse::<usize>().map_err(|_| {
            PinError::parse(format!("invalid mapping '{token}': bad source index"))
        })?;
        let to = to.parse::<usize>().map_err(|_| {
            PinError::parse(format!("invalid mapping '{token}': bad target index"))
        })?;
        pairs.push((from, to));
    }
    Ok(pairs)
}

/// Parse one mask token: comma-separated indices and ranges.
pub fn parse_mask_token(token: &str) -> PinResult<CpuMask> {
    let mut mask = CpuMask::empty();
    for group in token.split(',') {
        let (lo, hi) = match group.split_once('-') {
            Some((a, b)) => {
                let a = parse_cpu(a, token)?;
                let b = parse_cpu(b, token)?;
                (a.min(b), a.max(b))
            }
            None => {
                let cpu = parse_cpu(group, token)?;
                (cpu, cpu)
            }
        };
        for cpu in lo..=hi {
            if !mask.set(cpu) {
                return Err(PinError::config(format!(
                    "cpu {cpu} in '{token}' exceeds the supported maximum ({})",
                    MAX_CPUS - 1
                )));
            }
        }
    }
    Ok(mask)
}

fn parse_cpu(text: &str, token: &str) -> PinResult<usize> {
    text.parse::<usize>()
        .map_err(|_| PinError::parse(format!("invalid cpu list '{token}'")))
}

/// Parse a round-robin specification into an ordered mask list.
pub fn parse_rr_spec(spec: &str) -> PinResult<Vec<CpuMask>> {
    spec.split_whitespace().map(parse_mask_token).collect()
}

/// Build the store from the process environment. Absent variables simply
/// leave their half of the store disabled.
pub fn store_from_env() -> PinResult<AffinityStore> {
    let table = match env_spec(MAP_ENV)? {
        Some(spec) => {
            let pairs = parse_map_spec(&spec)?;
            if pairs.is_empty() {
                None
            } else {
                debug!("{MAP_ENV}: {} translation pairs", pairs.len());
                Some(PermutationTable::from_pairs(&pairs)?)
            }
        }
        None => None,
    };

    let pool = match env_spec(RR_ENV)? {
        Some(spec) => {
            let masks = parse_rr_spec(&spec)?;
            debug!("{RR_ENV}: {} rotation masks", masks.len());
            MaskPool::from_masks(&masks)?
        }
        None => None,
    };

    Ok(AffinityStore::new(table, pool))
}

fn env_spec(name: &str) -> PinResult<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(PinError::config(format!("{name} is not valid UTF-8")))
        }
    }
}

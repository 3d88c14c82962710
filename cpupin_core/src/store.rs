//! Process-wide translation tables and the round-robin mask pool.
//!
//! Both structures are built exactly once, at load time, and are read-only
//! afterwards; the rotation cursor is the only field that ever changes, via a
//! single atomic increment. Backing memory comes from anonymous private
//! mappings rather than the global allocator, so the store stays usable even
//! when thread creation is intercepted from inside the host's own allocator
//! or library-loading paths.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use memmap2::MmapMut;

use crate::error::{PinError, PinResult};
use crate::mask::{self, CpuMask};

// ============================================================================
// Permutation table
// ============================================================================

/// Bidirectional mapping between the CPU indices a host program uses and the
/// indices actually passed to the kernel.
///
/// Indices never configured, and all indices at or beyond the table length,
/// translate to themselves. The reverse half is a best-effort inverse: when
/// two sources map to the same target, the reverse entry keeps whichever pair
/// was written last. That asymmetry is inherent to non-injective
/// configurations and is deliberately left as-is.
pub struct PermutationTable {
    /// `forward` occupies the first `len` cells, `reverse` the second.
    cells: MmapMut,
    len: usize,
}

impl PermutationTable {
    /// Build a table from `(from, to)` pairs, sized to the largest index
    /// mentioned. Later pairs for the same source overwrite earlier ones.
    ///
    /// Large inputs are not an error; only a failed mapping is.
    pub fn from_pairs(pairs: &[(usize, usize)]) -> PinResult<Self> {
        let max = pairs.iter().map(|&(from, to)| from.max(to)).max().unwrap_or(0);
        let len = max + 1;

        let bytes = 2 * len * mem::size_of::<usize>();
        let mut cells = MmapMut::map_anon(bytes).map_err(|err| {
            PinError::config(format!("cannot map translation tables ({len} entries): {err}"))
        })?;

        {
            let words: &mut [usize] = bytemuck::cast_slice_mut(&mut cells[..]);
            let (forward, reverse) = words.split_at_mut(len);
            for (i, cell) in forward.iter_mut().enumerate() {
                *cell = i;
            }
            for (i, cell) in reverse.iter_mut().enumerate() {
                *cell = i;
            }
            for &(from, to) in pairs {
                forward[from] = to;
                reverse[to] = from;
            }
        }

        Ok(Self { cells, len })
    }

    /// Number of entries in each direction.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn forward_cells(&self) -> &[usize] {
        &bytemuck::cast_slice(&self.cells[..])[..self.len]
    }

    fn reverse_cells(&self) -> &[usize] {
        &bytemuck::cast_slice(&self.cells[..])[self.len..]
    }

    /// Logical index -> physical index. Identity outside the table.
    pub fn forward(&self, cpu: usize) -> usize {
        if cpu < self.len {
            self.forward_cells()[cpu]
        } else {
            cpu
        }
    }

    /// Physical index -> logical index. Identity outside the table.
    pub fn reverse(&self, cpu: usize) -> usize {
        if cpu < self.len {
            self.reverse_cells()[cpu]
        } else {
            cpu
        }
    }
}

// ============================================================================
// Round-robin mask pool
// ============================================================================

/// Ordered masks cyclically assigned to successively created threads.
pub struct MaskPool {
    entries: MmapMut,
    len: usize,
    cursor: AtomicUsize,
}

impl MaskPool {
    /// Copy `masks` into a pool. An empty list yields `None`: rotation is
    /// disabled rather than configured to do nothing.
    pub fn from_masks(masks: &[CpuMask]) -> PinResult<Option<Self>> {
        if masks.is_empty() {
            return Ok(None);
        }

        let bytes = masks.len() * mem::size_of::<CpuMask>();
        let mut entries = MmapMut::map_anon(bytes).map_err(|err| {
            PinError::config(format!("cannot map mask pool ({} masks): {err}", masks.len()))
        })?;
        bytemuck::cast_slice_mut::<u8, CpuMask>(&mut entries[..]).copy_from_slice(masks);

        Ok(Some(Self {
            entries,
            len: masks.len(),
            cursor: AtomicUsize::new(0),
        }))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn masks(&self) -> &[CpuMask] {
        bytemuck::cast_slice(&self.entries[..])
    }

    /// Hand out the next mask in insertion order, wrapping around.
    ///
    /// The cursor only ever increments; each caller reduces its own fetched
    /// value modulo the pool length, so no interleaving of concurrent callers
    /// can observe an out-of-range slot. The raw counter wrapping at
    /// `usize::MAX` shifts the rotation phase once per 2^64 assignments,
    /// which is still always in range.
    pub fn next(&self) -> &CpuMask {
        let id = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.masks()[id % self.len]
    }
}

// ============================================================================
// Store facade
// ============================================================================

enum Direction {
    Forward,
    Reverse,
}

/// The state every interposed call consults: an optional permutation table
/// and an optional round-robin pool, each absent when its specification was
/// not supplied.
pub struct AffinityStore {
    table: Option<PermutationTable>,
    pool: Option<MaskPool>,
}

impl AffinityStore {
    pub fn new(table: Option<PermutationTable>, pool: Option<MaskPool>) -> Self {
        Self { table, pool }
    }

    /// A store that translates nothing and assigns nothing.
    pub const fn empty() -> Self {
        Self {
            table: None,
            pool: None,
        }
    }

    pub fn table(&self) -> Option<&PermutationTable> {
        self.table.as_ref()
    }

    pub fn pool(&self) -> Option<&MaskPool> {
        self.pool.as_ref()
    }

    /// Logical -> physical index translation; identity without a table.
    pub fn translate_forward(&self, cpu: usize) -> usize {
        match &self.table {
            Some(table) => table.forward(cpu),
            None => cpu,
        }
    }

    /// Physical -> logical index translation; identity without a table.
    pub fn translate_reverse(&self, cpu: usize) -> usize {
        match &self.table {
            Some(table) => table.reverse(cpu),
            None => cpu,
        }
    }

    /// The next round-robin mask, or `None` when rotation is disabled.
    pub fn next_mask(&self) -> Option<&CpuMask> {
        self.pool.as_ref().map(|pool| pool.next())
    }

    /// Rewrite every set bit of `src` through the forward table into `dest`.
    pub fn translate_mask_forward(&self, dest: &mut [u8], src: &[u8]) {
        self.translate_mask(dest, src, Direction::Forward);
    }

    /// Rewrite every set bit of `src` through the reverse table into `dest`.
    pub fn translate_mask_reverse(&self, dest: &mut [u8], src: &[u8]) {
        self.translate_mask(dest, src, Direction::Reverse);
    }

    /// Masks are caller-sized: `dest` and `src` carry the byte length of the
    /// original call and may cover far more CPUs than the table knows about.
    /// Bits outside the table copy unchanged; a translated bit that does not
    /// fit in `dest` is dropped, like `CPU_SET_S` past the set size.
    fn translate_mask(&self, dest: &mut [u8], src: &[u8], direction: Direction) {
        debug_assert_eq!(dest.len(), src.len());
        let len = dest.len().min(src.len());

        let table = match &self.table {
            Some(table) => table,
            None => {
                dest[..len].copy_from_slice(&src[..len]);
                return;
            }
        };

        for byte in dest.iter_mut() {
            *byte = 0;
        }

        let bits = len * 8;
        let mut remaining = mask::count_set(&src[..len]);
        for cpu in 0..bits {
            if remaining == 0 {
                break;
            }
            if !mask::bit_is_set(src, cpu) {
                continue;
            }
            remaining -= 1;

            let target = match direction {
                Direction::Forward => table.forward(cpu),
                Direction::Reverse => table.reverse(cpu),
            };
            if target < bits {
                mask::set_bit(dest, target);
            }
        }
    }
}

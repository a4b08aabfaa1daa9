//! Copying a value arena into a caller buffer, and computing element-wise
//! diffs between two such snapshots.

use super::catalog::{self, Layout, ValueKind};
use super::derive::derive;

/// `alloc_values()`: a zeroed buffer sized for the whole catalog.
pub fn alloc_values(layout: &Layout) -> Vec<u64> {
    vec![0u64; layout.total_slots() as usize]
}

pub fn copy(dst: &mut [u64], src: &[u64]) {
    dst.copy_from_slice(src);
}

/// `diff(out, new, old)`: non-negative subtraction per statistic's kind,
/// then Derivation is re-run on `out` (§4.8).
pub fn diff(out: &mut [u64], new: &[u64], old: &[u64], layout: &Layout) {
    for entry in catalog::CATALOG {
        let base = layout.offset_of(entry.id) as usize;
        let count = entry.slot_count as usize;
        let treat_as_gauge = entry.kind == ValueKind::PeekSingle && !entry.diff_as_accumulator;
        for i in base..base + count {
            out[i] = if treat_as_gauge {
                new[i]
            } else if new[i] >= old[i] {
                new[i] - old[i]
            } else {
                0
            };
        }
    }
    derive(out, layout);
}

/// A narrow three-counter diff (page fetches/ioreads/iowrites) for tracing
/// paths that don't need a full snapshot diff.
pub fn diff_trace_counters(new: &[u64], old: &[u64], layout: &Layout) -> (u64, u64, u64) {
    let sub = |id: usize| -> u64 {
        let off = layout.offset_of(id) as usize;
        new[off].saturating_sub(old[off])
    };
    (sub(catalog::PB_NUM_FETCHES), sub(catalog::PB_NUM_IOREADS), sub(catalog::PB_NUM_IOWRITES))
}

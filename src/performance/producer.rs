//! Allocation-free hot-path helpers writers call from anywhere in the
//! engine. The primitive is `add_at_offset`; everything else is a thin,
//! specialized wrapper that computes a flat offset and calls it.

use std::sync::atomic::{AtomicU64, Ordering};

use super::catalog::{self, ValueKind, CT_COUNT, CT_MAX, CT_TOTAL};
use super::families::{
    self, CondType, FoundMode, LatchMode, LockMode, PageType, PromoteCond, SnapshotKind,
    Visibility,
};
use super::module_tag::{Module, ThreadContext};
use super::PerfMonitor;

/// Writes to the global arena unconditionally, and to the caller's
/// per-tran arena only while someone is watching (§4.3, §8 invariant 10,
/// §8 S6: the global arena accumulates regardless of watch state; only
/// the per-tran view is gated, since locating and touching a tran's slot
/// is the expensive part the watcher gate exists to bypass).
fn fetch_add_both(engine: &PerfMonitor, ctx: &ThreadContext, base: u32, amount: u64) {
    engine.store.global()[base as usize].fetch_add(amount, Ordering::Relaxed);
    if engine.watchers.anyone_watching() != 0 {
        engine.store.tran(ctx.tran_index)[base as usize].fetch_add(amount, Ordering::Relaxed);
    }
}

fn fetch_max_both(engine: &PerfMonitor, ctx: &ThreadContext, base: u32, amount: u64) {
    fetch_max_one(&engine.store.global()[base as usize], amount);
    if engine.watchers.anyone_watching() != 0 {
        fetch_max_one(&engine.store.tran(ctx.tran_index)[base as usize], amount);
    }
}

fn fetch_max_one(cell: &AtomicU64, amount: u64) {
    let mut current = cell.load(Ordering::Relaxed);
    while amount > current {
        match cell.compare_exchange_weak(current, amount, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

/// The producer primitive (§4.4). Always updates the global arena; updates
/// the caller's per-tran slot too, but only while `anyone_watching()` is
/// nonzero (§8 invariant 10, scenario S6). The two updates are not ordered
/// relative to each other (§5, §9 open question #3).
pub fn add_at_offset(engine: &PerfMonitor, ctx: &ThreadContext, id: usize, extra_offset: u32, amount: u64) {
    debug_assert!(extra_offset < catalog::slot_count_of(id), "extra_offset out of range for {id}");

    let base = engine.layout.offset_of(id) + extra_offset;
    match catalog::kind_of(id) {
        ValueKind::AccumulateSingle | ValueKind::Complex(_) => {
            fetch_add_both(engine, ctx, base, amount);
        }
        ValueKind::CounterTimer => {
            fetch_add_both(engine, ctx, base + CT_COUNT, 1);
            fetch_add_both(engine, ctx, base + CT_TOTAL, amount);
            fetch_max_both(engine, ctx, base + CT_MAX, amount);
        }
        ValueKind::PeekSingle | ValueKind::ComputedRatio | ValueKind::DerivedCount => {
            debug_assert!(false, "producers must not write peek/computed statistic {id}");
        }
    }
}

/// `add(thread, id, amount)` for `AccumulateSingle` or `CounterTimer` ids.
pub fn add(engine: &PerfMonitor, ctx: &ThreadContext, id: usize, amount: u64) {
    add_at_offset(engine, ctx, id, 0, amount);
}

/// Peer subsystems that push rather than being pulled write straight into
/// the global arena's slot for a `PeekSingle`/`ComputedRatio`/`DerivedCount` id.
pub fn set_peek(engine: &PerfMonitor, id: usize, value: u64) {
    let base = engine.layout.offset_of(id);
    engine.store.global()[base as usize].store(value, Ordering::Relaxed);
}

pub fn pbx_fix(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    module: Module,
    page_type: PageType,
    found_mode: FoundMode,
    latch_mode: LatchMode,
    cond_type: CondType,
) {
    let off = families::pbx_fix_offset(module, page_type, found_mode, latch_mode, cond_type);
    add_at_offset(engine, ctx, catalog::PBX_FIX_COUNTERS, off, 1);
}

pub fn pbx_promote(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    module: Module,
    page_type: PageType,
    promote_cond: PromoteCond,
    holder_latch: LatchMode,
    success: bool,
) {
    let off = families::pbx_promote_offset(module, page_type, promote_cond, holder_latch, success);
    add_at_offset(engine, ctx, catalog::PBX_PROMOTE_COUNTERS, off, 1);
}

pub fn pbx_unfix(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    module: Module,
    page_type: PageType,
    buf_dirty: bool,
    holder_dirty: bool,
    holder_latch: LatchMode,
) {
    let off = families::pbx_unfix_offset(module, page_type, buf_dirty, holder_dirty, holder_latch);
    add_at_offset(engine, ctx, catalog::PBX_UNFIX_COUNTERS, off, 1);
}

pub fn pbx_lock_acquire_time(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    module: Module,
    page_type: PageType,
    found_mode: FoundMode,
    latch_mode: LatchMode,
    cond_type: CondType,
    elapsed_usec: u64,
) {
    let off = families::pbx_time_offset(module, page_type, found_mode, latch_mode, cond_type);
    add_at_offset(engine, ctx, catalog::PBX_LOCK_TIME_COUNTERS, off, elapsed_usec);
}

pub fn pbx_hold_acquire_time(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    module: Module,
    page_type: PageType,
    found_mode: FoundMode,
    latch_mode: LatchMode,
    cond_type: CondType,
    elapsed_usec: u64,
) {
    let off = families::pbx_time_offset(module, page_type, found_mode, latch_mode, cond_type);
    add_at_offset(engine, ctx, catalog::PBX_HOLD_TIME_COUNTERS, off, elapsed_usec);
}

pub fn pbx_fix_acquire_time(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    module: Module,
    page_type: PageType,
    found_mode: FoundMode,
    latch_mode: LatchMode,
    cond_type: CondType,
    elapsed_usec: u64,
) {
    let off = families::pbx_time_offset(module, page_type, found_mode, latch_mode, cond_type);
    add_at_offset(engine, ctx, catalog::PBX_FIX_TIME_COUNTERS, off, elapsed_usec);
}

pub fn mvcc_snapshot(
    engine: &PerfMonitor,
    ctx: &ThreadContext,
    snapshot_kind: SnapshotKind,
    record_type: families::RecordType,
    visibility: Visibility,
) {
    let off = families::mvcc_snapshot_offset(snapshot_kind, record_type, visibility);
    add_at_offset(engine, ctx, catalog::MVCC_SNAPSHOT_COUNTERS, off, 1);
}

pub fn obj_lock_time(engine: &PerfMonitor, ctx: &ThreadContext, lock_mode: LockMode, elapsed_usec: u64) {
    let off = families::obj_lock_time_offset(lock_mode);
    add_at_offset(engine, ctx, catalog::OBJ_LOCK_TIME_COUNTERS, off, elapsed_usec);
}

pub fn dwb_flushed_block_volumes(engine: &PerfMonitor, ctx: &ThreadContext, num_volumes: u32) {
    let off = families::dwb_bucket(num_volumes);
    add_at_offset(engine, ctx, catalog::DWB_FLUSHED_BLOCK_VOLUMES, off, 1);
}

/// Thread pool/daemon stats arrive as whole flat blocks from their owning
/// subsystems; the PTE does not interpret individual fields (§3.4).
pub fn thread_pool_stats(engine: &PerfMonitor, ctx: &ThreadContext, block: &[u64]) {
    for (i, value) in block.iter().enumerate() {
        add_at_offset(engine, ctx, catalog::THREAD_POOL_STATS, i as u32, *value);
    }
}

pub fn thread_daemon_stats(engine: &PerfMonitor, ctx: &ThreadContext, block: &[u64]) {
    for (i, value) in block.iter().enumerate() {
        add_at_offset(engine, ctx, catalog::THREAD_DAEMON_STATS, i as u32, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{EngineConfig, PerfMonitor};

    #[test]
    fn add_accumulates_in_global_regardless_of_watchers_but_tran_is_gated() {
        let engine = PerfMonitor::initialize(2, EngineConfig::default()).unwrap();
        let ctx = ThreadContext::new(1, Module::Worker);
        let off = engine.layout.offset_of(catalog::PB_NUM_FETCHES) as usize;

        add(&engine, &ctx, catalog::PB_NUM_FETCHES, 1);
        let mut out = vec![0u64; engine.stats_count_slots()];
        engine.store.copy_into(super::super::store::Which::Global, &mut out);
        assert_eq!(out[off], 1, "global arena accumulates even with no watcher");
        engine.store.copy_into(super::super::store::Which::Tran(1), &mut out);
        assert_eq!(out[off], 0, "per-tran arena untouched with no watcher");

        engine.watchers.start(1, &engine.store);
        add(&engine, &ctx, catalog::PB_NUM_FETCHES, 5);
        engine.store.copy_into(super::super::store::Which::Global, &mut out);
        assert_eq!(out[off], 6);
        engine.store.copy_into(super::super::store::Which::Tran(1), &mut out);
        assert_eq!(out[off], 5);
    }

    #[test]
    fn counter_timer_tracks_count_total_and_max() {
        let engine = PerfMonitor::initialize(1, EngineConfig::default()).unwrap();
        let ctx = ThreadContext::new(1, Module::Worker);
        engine.watchers.start(1, &engine.store);

        add(&engine, &ctx, catalog::HEAP_INSERT_EXECUTE, 100);
        add(&engine, &ctx, catalog::HEAP_INSERT_EXECUTE, 50);

        let base = engine.layout.offset_of(catalog::HEAP_INSERT_EXECUTE) as usize;
        let mut out = vec![0u64; engine.stats_count_slots()];
        engine.store.copy_into(super::super::store::Which::Tran(1), &mut out);
        assert_eq!(out[base + CT_COUNT as usize], 2);
        assert_eq!(out[base + CT_TOTAL as usize], 150);
        assert_eq!(out[base + CT_MAX as usize], 100);
    }

    #[test]
    fn pbx_fix_writes_exactly_one_offset() {
        let engine = PerfMonitor::initialize(1, EngineConfig::default()).unwrap();
        let ctx = ThreadContext::new(1, Module::Vacuum);
        engine.watchers.start(1, &engine.store);

        for _ in 0..4 {
            pbx_fix(
                &engine,
                &ctx,
                Module::Vacuum,
                PageType::Heap,
                FoundMode::OldInBuffer,
                LatchMode::Read,
                CondType::Conditional,
            );
        }

        let base = engine.layout.offset_of(catalog::PBX_FIX_COUNTERS) as usize;
        let written = families::pbx_fix_offset(
            Module::Vacuum,
            PageType::Heap,
            FoundMode::OldInBuffer,
            LatchMode::Read,
            CondType::Conditional,
        ) as usize;

        let mut out = vec![0u64; engine.stats_count_slots()];
        engine.store.copy_into(super::super::store::Which::Tran(1), &mut out);
        assert_eq!(out[base + written], 4);
        let family_card = families::pbx_fix_cardinality() as usize;
        for i in 0..family_card {
            if i != written {
                assert_eq!(out[base + i], 0);
            }
        }
    }
}

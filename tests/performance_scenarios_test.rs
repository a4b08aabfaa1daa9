// Performance Telemetry Engine - integration tests
// Covers the universal invariants and concrete scenarios (S1-S6).

use perfmon_engine::performance::families::{CondType, FoundMode, LatchMode, PageType};
use perfmon_engine::performance::module_tag::{Module, ThreadContext};
use perfmon_engine::performance::{catalog, families};
use perfmon_engine::{EngineConfig, PerfMonitor};

fn engine(num_trans: usize) -> PerfMonitor {
    PerfMonitor::initialize(num_trans, EngineConfig::default()).unwrap()
}

// Invariant 1: catalog[i].id == i.
#[test]
fn invariant_1_catalog_ids_match_index() {
    for (i, entry) in catalog::CATALOG.iter().enumerate() {
        assert_eq!(entry.id, i);
    }
}

// Invariant 2: offsets form a disjoint, contiguous cover of [0, total_slots).
#[test]
fn invariant_2_layout_is_disjoint_contiguous_cover() {
    let layout = catalog::Layout::compute().unwrap();
    let mut expect = 0u32;
    for entry in catalog::CATALOG {
        assert_eq!(layout.offset_of(entry.id), expect);
        expect += entry.slot_count;
    }
    assert_eq!(layout.total_slots(), expect);
}

// Invariant 3: alloc_values() is zeroed and sized to stats_count().
#[test]
fn invariant_3_alloc_values_is_zeroed_and_sized() {
    let engine = engine(1);
    let layout = catalog::Layout::compute().unwrap();
    let values = engine.alloc_values();
    assert_eq!(values.len(), layout.total_slots() as usize);
    assert!(values.iter().all(|&v| v == 0));
}

// Invariant 4: repeated adds sum (mod 2^64), single-threaded.
#[test]
fn invariant_4_adds_sum_modulo_wraparound() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);
    for amount in [5u64, 3, 100, 7] {
        engine.add(&ctx, catalog::PB_NUM_FETCHES, amount);
    }
    let mut out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut out);
    assert_eq!(out[off(&engine, catalog::PB_NUM_FETCHES)], 115);
}

// Invariant 5: after derivation, every CounterTimer's avg == safe_div(total, count).
#[test]
fn invariant_5_counter_timer_avg_matches_total_over_count() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);
    engine.add(&ctx, catalog::HEAP_INSERT_EXECUTE, 100);
    engine.add(&ctx, catalog::HEAP_INSERT_EXECUTE, 50);
    let mut out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut out);
    let base = off(&engine, catalog::HEAP_INSERT_EXECUTE);
    assert_eq!(out[base + catalog::CT_AVG as usize], 75);
}

// Invariant 6: diff(out, snap, snap) is all zeros for accumulator kinds.
#[test]
fn invariant_6_diff_of_identical_snapshots_is_zero() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);
    engine.add(&ctx, catalog::PB_NUM_FETCHES, 42);
    let mut snap = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut snap);
    let mut out = engine.alloc_values();
    engine.diff(&mut out, &snap, &snap);
    assert_eq!(out[off(&engine, catalog::PB_NUM_FETCHES)], 0);
}

// Invariant 7: pack then unpack round-trips.
#[test]
fn invariant_7_pack_unpack_round_trips() {
    let engine = engine(1);
    let mut values = engine.alloc_values();
    for (i, v) in values.iter_mut().enumerate() {
        *v = (i as u64) * 0x0102030405060708;
    }
    let packed = engine.pack(&values);
    let unpacked = engine.unpack(&packed).unwrap();
    assert_eq!(unpacked, values);
}

// Invariant 8: for any pair of snapshots taken from the same process
// without intervening writes, diff(out, new, old) == alloc_values().
#[test]
fn invariant_8_diff_of_back_to_back_snapshots_is_zeroed() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);
    engine.add(&ctx, catalog::PB_NUM_FETCHES, 7);
    engine.add(&ctx, catalog::HEAP_INSERT_EXECUTE, 20);

    let mut old = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut old);
    let mut new = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut new);

    let mut out = engine.alloc_values();
    engine.diff(&mut out, &new, &old);
    assert_eq!(out, engine.alloc_values());
}

// Invariant 9: dump_to_buffer never writes past N-1 and always null-terminates.
#[test]
fn invariant_9_dump_to_buffer_never_overruns() {
    let engine = engine(1);
    let values = engine.alloc_values();
    let mut buf = [0xFFu8; 37];
    let len = buf.len();
    engine.dump_to_buffer(&mut buf, &values, None);
    assert!(buf[..len].contains(&0));
}

// Invariant 10: with anyone_watching() == 0, no per-tran array is modified.
#[test]
fn invariant_10_no_watcher_means_no_per_tran_writes() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.add(&ctx, catalog::PB_NUM_FETCHES, 999);
    let mut out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut out);
    assert_eq!(out[off(&engine, catalog::PB_NUM_FETCHES)], 0);
}

// S1 - single counter plus derived hit ratio.
#[test]
fn s1_single_counter_and_hit_ratio() {
    let engine = engine(2);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);

    for _ in 0..3 {
        engine.add(&ctx, catalog::PB_NUM_FETCHES, 5);
    }
    engine.add(&ctx, catalog::PB_NUM_IOREADS, 1);

    let mut out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut out);
    assert_eq!(out[off(&engine, catalog::PB_NUM_FETCHES)], 15);
    assert_eq!(out[off(&engine, catalog::PB_NUM_IOREADS)], 1);
    assert_eq!(out[off(&engine, catalog::PB_HIT_RATIO)], 9333);
}

// S2 - CounterTimer count/total/max/avg.
#[test]
fn s2_counter_timer_fields() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);

    engine.add(&ctx, catalog::HEAP_INSERT_EXECUTE, 100);
    engine.add(&ctx, catalog::HEAP_INSERT_EXECUTE, 50);

    let mut out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut out);
    let base = off(&engine, catalog::HEAP_INSERT_EXECUTE);
    assert_eq!(out[base + catalog::CT_COUNT as usize], 2);
    assert_eq!(out[base + catalog::CT_TOTAL as usize], 150);
    assert_eq!(out[base + catalog::CT_MAX as usize], 100);
    assert_eq!(out[base + catalog::CT_AVG as usize], 75);
}

// S3 - diffing recomputes derived fields instead of subtracting them.
#[test]
fn s3_diff_recomputes_derived_fields() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Worker);
    engine.watch_start(&ctx);

    // establish a non-trivial baseline ratio before the first snapshot
    engine.add(&ctx, catalog::PB_NUM_FETCHES, 5);
    engine.add(&ctx, catalog::PB_NUM_IOREADS, 1);

    let mut snap_a = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut snap_a);

    engine.add(&ctx, catalog::PB_NUM_FETCHES, 10);

    let mut snap_b = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut snap_b);

    let mut diffed = engine.alloc_values();
    engine.diff(&mut diffed, &snap_b, &snap_a);
    assert_eq!(diffed[off(&engine, catalog::PB_NUM_FETCHES)], 10);
    let naive_ratio_delta =
        snap_b[off(&engine, catalog::PB_HIT_RATIO)] - snap_a[off(&engine, catalog::PB_HIT_RATIO)];
    assert_ne!(diffed[off(&engine, catalog::PB_HIT_RATIO)], naive_ratio_delta);
}

// S4 - pack round-trip with id-indexed sentinel values.
#[test]
fn s4_pack_round_trip_with_sentinels() {
    let engine = engine(1);
    let mut values = engine.alloc_values();
    for (i, v) in values.iter_mut().enumerate() {
        *v = (i as u64) * 0x0102030405060708;
    }
    let packed = engine.pack(&values);
    let unpacked = engine.unpack(&packed).unwrap();
    assert_eq!(unpacked, values);
}

// S5 - complex write lands at exactly one offset in the family.
#[test]
fn s5_complex_write_hits_exactly_one_offset() {
    let engine = engine(1);
    let ctx = ThreadContext::new(1, Module::Vacuum);
    engine.watch_start(&ctx);

    for _ in 0..4 {
        engine.pbx_fix(
            &ctx,
            Module::Vacuum,
            PageType::Heap,
            FoundMode::OldInBuffer,
            LatchMode::Read,
            CondType::Conditional,
        );
    }

    let mut out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut out);
    let base = off(&engine, catalog::PBX_FIX_COUNTERS);
    let written = families::pbx_fix_offset(
        Module::Vacuum,
        PageType::Heap,
        FoundMode::OldInBuffer,
        LatchMode::Read,
        CondType::Conditional,
    ) as usize;

    assert_eq!(out[base + written], 4);
    for i in 0..families::pbx_fix_cardinality() as usize {
        if i != written {
            assert_eq!(out[base + i], 0);
        }
    }
}

// S6 - watch gating: the global arena accumulates regardless of watch
// state, the per-tran view only reflects activity after watch_start.
#[test]
fn s6_watch_gating() {
    let engine = engine(2);
    let ctx = ThreadContext::new(1, Module::Worker);

    for _ in 0..1000 {
        engine.add(&ctx, catalog::PB_NUM_FETCHES, 1);
    }
    engine.watch_start(&ctx);
    engine.add(&ctx, catalog::PB_NUM_FETCHES, 1);

    let mut tran_out = engine.alloc_values();
    engine.copy_tran_snapshot(&ctx, &mut tran_out);
    assert_eq!(tran_out[off(&engine, catalog::PB_NUM_FETCHES)], 1);

    let mut global_out = engine.alloc_values();
    engine.copy_global_snapshot(&mut global_out);
    assert_eq!(global_out[off(&engine, catalog::PB_NUM_FETCHES)], 1001);
}

fn off(_engine: &PerfMonitor, id: usize) -> usize {
    catalog::Layout::compute().unwrap().offset_of(id) as usize
}

//! Post-processing pass that fills `ComputedRatio`, `DerivedCount`, and
//! `CounterTimer.avg` fields from raw accumulated values. Applied exactly
//! once per snapshot, in the order listed in §4.7, and re-applied to diff
//! output (§4.8).

use super::catalog::{self, Layout, ValueKind, CT_AVG, CT_COUNT, CT_TOTAL};
use super::families::{CondType, FoundMode, LatchMode, PageType};
use super::module_tag::Module;

fn safe_div(a: u64, b: u64) -> u64 {
    if b == 0 {
        0
    } else {
        a / b
    }
}

fn get(values: &[u64], layout: &Layout, id: usize) -> u64 {
    values[layout.offset_of(id) as usize]
}

fn set(values: &mut [u64], layout: &Layout, id: usize, v: u64) {
    values[layout.offset_of(id) as usize] = v;
}

fn sum_unfix(values: &[u64], layout: &Layout) -> (u64, u64, u64) {
    let base = layout.offset_of(catalog::PBX_UNFIX_COUNTERS) as usize;
    let mut total = 0u64;
    let mut vacuum = 0u64;
    let mut vacuum_dirty = 0u64;
    for module in Module::ALL {
        for page_type in PageType::ALL {
            for buf_dirty in [false, true] {
                for holder_dirty in [false, true] {
                    for holder_latch in
                        [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed]
                    {
                        let off = super::families::pbx_unfix_offset(
                            module,
                            page_type,
                            buf_dirty,
                            holder_dirty,
                            holder_latch,
                        );
                        let v = values[base + off as usize];
                        total += v;
                        if module == Module::Vacuum {
                            vacuum += v;
                            if buf_dirty {
                                vacuum_dirty += v;
                            }
                        }
                    }
                }
            }
        }
    }
    (total, vacuum, vacuum_dirty)
}

/// Sums one of the fix/hold/lock time families, excluding LOG pages, and
/// (for the fix-count family) counting vacuum cache hits.
fn sum_time_family(values: &[u64], layout: &Layout, family_id: usize) -> u64 {
    let base = layout.offset_of(family_id) as usize;
    let mut total = 0u64;
    for module in Module::ALL {
        for page_type in PageType::ALL {
            if page_type.is_log() {
                continue;
            }
            for found_mode in [FoundMode::OldInBuffer, FoundMode::NewBuffer] {
                for latch_mode in
                    [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed]
                {
                    for cond_type in [CondType::Conditional, CondType::Unconditional] {
                        let off = super::families::pbx_time_offset(
                            module, page_type, found_mode, latch_mode, cond_type,
                        );
                        total += values[base + off as usize];
                    }
                }
            }
        }
    }
    total
}

fn sum_vacuum_fix_hits(values: &[u64], layout: &Layout) -> u64 {
    let base = layout.offset_of(catalog::PBX_FIX_COUNTERS) as usize;
    let mut total = 0u64;
    for page_type in PageType::ALL {
        if page_type.is_log() {
            continue;
        }
        for latch_mode in [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed] {
            for cond_type in [CondType::Conditional, CondType::Unconditional] {
                let off = super::families::pbx_fix_offset(
                    Module::Vacuum,
                    page_type,
                    FoundMode::OldInBuffer,
                    latch_mode,
                    cond_type,
                );
                total += values[base + off as usize];
            }
        }
    }
    total
}

fn sum_promote(values: &[u64], layout: &Layout) -> (u64, u64, u64) {
    let base = layout.offset_of(catalog::PBX_PROMOTE_COUNTERS) as usize;
    let mut success = 0u64;
    let mut failed = 0u64;
    for module in Module::ALL {
        for page_type in PageType::ALL {
            for promote_cond in [CondType::Conditional, CondType::Unconditional] {
                for holder_latch in
                    [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed]
                {
                    let succ_off = super::families::pbx_promote_offset(
                        module, page_type, promote_cond, holder_latch, true,
                    );
                    let fail_off = super::families::pbx_promote_offset(
                        module, page_type, promote_cond, holder_latch, false,
                    );
                    success += values[base + succ_off as usize];
                    failed += values[base + fail_off as usize];
                }
            }
        }
    }
    // Total promote time is tracked by the hold-time family (the time spent
    // holding the latch being promoted); reuse that sum here.
    let total_time = sum_time_family(values, layout, catalog::PBX_HOLD_TIME_COUNTERS);
    (success, failed, total_time / 10)
}

pub fn derive(values: &mut [u64], layout: &Layout) {
    // 1. unfix sums
    let (total_unfix, unfix_vacuum, unfix_vacuum_dirty) = sum_unfix(values, layout);
    set(values, layout, catalog::TOTAL_UNFIX, total_unfix);
    set(values, layout, catalog::TOTAL_UNFIX_VACUUM, unfix_vacuum);
    set(values, layout, catalog::TOTAL_UNFIX_VACUUM_DIRTY, unfix_vacuum_dirty);

    // 2. hold/fix/lock time sums excluding LOG, plus vacuum fix-hit count
    let lock_time = sum_time_family(values, layout, catalog::PBX_LOCK_TIME_COUNTERS);
    let hold_time = sum_time_family(values, layout, catalog::PBX_HOLD_TIME_COUNTERS);
    let fix_time = sum_time_family(values, layout, catalog::PBX_FIX_TIME_COUNTERS);
    set(values, layout, catalog::PAGE_LOCK_TIME_USEC, lock_time);
    set(values, layout, catalog::PAGE_HOLD_TIME_USEC, hold_time);
    set(values, layout, catalog::PAGE_FIX_TIME_USEC, fix_time);
    set(values, layout, catalog::VACUUM_DATA_HITS, sum_vacuum_fix_hits(values, layout));

    // 3. ratios and scaled time fields
    let unfix_dirty = get(values, layout, catalog::TOTAL_UNFIX_VACUUM_DIRTY);
    let unfix_vac = get(values, layout, catalog::TOTAL_UNFIX_VACUUM);
    let unfix_tot = get(values, layout, catalog::TOTAL_UNFIX);
    let vacuum_hits = get(values, layout, catalog::VACUUM_DATA_HITS);
    let vacuum_fetches = get(values, layout, catalog::VACUUM_DATA_FETCHES);
    let fetches = get(values, layout, catalog::PB_NUM_FETCHES);
    let ioreads = get(values, layout, catalog::PB_NUM_IOREADS);
    let log_fetches = get(values, layout, catalog::LOG_NUM_FETCHES);
    let log_ioreads = get(values, layout, catalog::LOG_NUM_IOREADS);

    set(values, layout, catalog::VACUUM_EFFICIENCY, safe_div(unfix_dirty * 10000, unfix_vac));
    set(values, layout, catalog::VACUUM_FETCH_RATIO, safe_div(unfix_vac * 10000, unfix_tot));
    set(
        values,
        layout,
        catalog::VACUUM_DATA_HIT_RATIO,
        safe_div(vacuum_hits * 10000, vacuum_fetches),
    );
    set(
        values,
        layout,
        catalog::PB_HIT_RATIO,
        safe_div(fetches.saturating_sub(ioreads) * 10000, fetches),
    );
    set(
        values,
        layout,
        catalog::LOG_HIT_RATIO,
        safe_div(log_fetches.saturating_sub(log_ioreads) * 10000, log_fetches),
    );
    set(values, layout, catalog::PAGE_LOCK_TIME_10USEC, lock_time / 10);
    set(values, layout, catalog::PAGE_HOLD_TIME_10USEC, hold_time / 10);
    set(values, layout, catalog::PAGE_FIX_TIME_10USEC, fix_time / 10);
    set(
        values,
        layout,
        catalog::PAGE_ALLOCATE_TIME_RATIO,
        safe_div(fix_time.saturating_sub(hold_time).saturating_sub(lock_time) * 10000, fix_time),
    );

    // 4. promote folding
    let (promote_success, promote_failed, promote_time_10usec) = sum_promote(values, layout);
    set(values, layout, catalog::PROMOTE_SUCCESS, promote_success);
    set(values, layout, catalog::PROMOTE_FAILED, promote_failed);
    set(values, layout, catalog::PROMOTE_TOTAL_TIME_10USEC, promote_time_10usec);

    // 5. counter+timer averages
    for entry in catalog::CATALOG {
        if entry.kind == ValueKind::CounterTimer {
            let base = layout.offset_of(entry.id) as usize;
            let count = values[base + CT_COUNT as usize];
            let total = values[base + CT_TOTAL as usize];
            values[base + CT_AVG as usize] = safe_div(total, count);
        }
    }
}

//! The compile-time statistic catalog. One entry per statistic, indexed by
//! a stable numeric id equal to its position in [`CATALOG`].
//!
//! A tagged variant (`ValueKind`) stands in for the source's three function
//! pointers per complex entry, per the "kind set is closed" design note:
//! the load-size function becomes [`ComplexFamily::cardinality`], and
//! dump-to-file/dump-to-buffer become match arms in `serialize.rs`.

use super::families::{
    mvcc_snapshot_cardinality, obj_lock_time_cardinality, pbx_fix_cardinality,
    pbx_promote_cardinality, pbx_time_cardinality, pbx_unfix_cardinality,
    THREAD_DAEMON_STATS_FIELDS, THREAD_POOL_STATS_FIELDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexFamily {
    PbxFix,
    PbxPromote,
    PbxUnfix,
    PbxLockTime,
    PbxHoldTime,
    PbxFixTime,
    MvccSnapshot,
    ObjLockTime,
    DwbFlushedBlockVolumes,
    ThreadPoolStats,
    ThreadDaemonStats,
}

impl ComplexFamily {
    pub const fn cardinality(self) -> u32 {
        match self {
            ComplexFamily::PbxFix => pbx_fix_cardinality(),
            ComplexFamily::PbxPromote => pbx_promote_cardinality(),
            ComplexFamily::PbxUnfix => pbx_unfix_cardinality(),
            ComplexFamily::PbxLockTime | ComplexFamily::PbxHoldTime | ComplexFamily::PbxFixTime => {
                pbx_time_cardinality()
            }
            ComplexFamily::MvccSnapshot => mvcc_snapshot_cardinality(),
            ComplexFamily::ObjLockTime => obj_lock_time_cardinality(),
            ComplexFamily::DwbFlushedBlockVolumes => super::families::DWB_VOLUME_BUCKETS,
            ComplexFamily::ThreadPoolStats => THREAD_POOL_STATS_FIELDS,
            ComplexFamily::ThreadDaemonStats => THREAD_DAEMON_STATS_FIELDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    AccumulateSingle,
    PeekSingle,
    /// Filled by `derive()`; holds a true percentage scaled by 100
    /// (e.g. `Data_page_buffer_hit_ratio`).
    ComputedRatio,
    /// Also filled by `derive()`, but holds a raw folded count or time sum,
    /// not a percentage (e.g. the vacuum hit count folded in from
    /// per-worker accumulators, or a summed microsecond timer) — dumped as
    /// a plain integer, not `value/100`.
    DerivedCount,
    CounterTimer,
    Complex(ComplexFamily),
}

impl ValueKind {
    pub const fn slot_count(self) -> u32 {
        match self {
            ValueKind::AccumulateSingle
            | ValueKind::PeekSingle
            | ValueKind::ComputedRatio
            | ValueKind::DerivedCount => 1,
            ValueKind::CounterTimer => 4,
            ValueKind::Complex(family) => family.cardinality(),
        }
    }
}

/// Offsets within a `CounterTimer`'s four-slot block.
pub const CT_COUNT: u32 = 0;
pub const CT_TOTAL: u32 = 1;
pub const CT_MAX: u32 = 2;
pub const CT_AVG: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: usize,
    pub name: &'static str,
    pub kind: ValueKind,
    pub slot_count: u32,
    /// When true, `diff` treats this `PeekSingle` entry as an accumulator
    /// instead of a gauge (§4.8's documented `PB_AVOID_VICTIM_CNT` exception).
    pub diff_as_accumulator: bool,
}

const fn simple(id: usize, name: &'static str, kind: ValueKind) -> CatalogEntry {
    CatalogEntry { id, name, kind, slot_count: kind.slot_count(), diff_as_accumulator: false }
}

const fn peek(id: usize, name: &'static str, diff_as_accumulator: bool) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        kind: ValueKind::PeekSingle,
        slot_count: 1,
        diff_as_accumulator,
    }
}

const fn complex(id: usize, name: &'static str, family: ComplexFamily) -> CatalogEntry {
    let kind = ValueKind::Complex(family);
    CatalogEntry { id, name, kind, slot_count: kind.slot_count(), diff_as_accumulator: false }
}

pub const PB_NUM_FETCHES: usize = 0;
pub const PB_NUM_IOREADS: usize = 1;
pub const PB_NUM_IOWRITES: usize = 2;
pub const PB_NUM_VICTIMS: usize = 3;
pub const PB_AVOID_VICTIM_CNT: usize = 4;
pub const PB_HIT_RATIO: usize = 5;
pub const LOG_NUM_FETCHES: usize = 6;
pub const LOG_NUM_IOREADS: usize = 7;
pub const LOG_HIT_RATIO: usize = 8;
pub const HEAP_INSERT_EXECUTE: usize = 9;
pub const HEAP_UPDATE_EXECUTE: usize = 10;
pub const BTREE_INSERT_EXECUTE: usize = 11;
pub const TOTAL_UNFIX: usize = 12;
pub const TOTAL_UNFIX_VACUUM: usize = 13;
pub const TOTAL_UNFIX_VACUUM_DIRTY: usize = 14;
pub const PAGE_LOCK_TIME_USEC: usize = 15;
pub const PAGE_HOLD_TIME_USEC: usize = 16;
pub const PAGE_FIX_TIME_USEC: usize = 17;
pub const PAGE_LOCK_TIME_10USEC: usize = 18;
pub const PAGE_HOLD_TIME_10USEC: usize = 19;
pub const PAGE_FIX_TIME_10USEC: usize = 20;
pub const PAGE_ALLOCATE_TIME_RATIO: usize = 21;
pub const VACUUM_DATA_FETCHES: usize = 22;
pub const VACUUM_DATA_HITS: usize = 23;
pub const VACUUM_EFFICIENCY: usize = 24;
pub const VACUUM_FETCH_RATIO: usize = 25;
pub const VACUUM_DATA_HIT_RATIO: usize = 26;
pub const PROMOTE_SUCCESS: usize = 27;
pub const PROMOTE_FAILED: usize = 28;
pub const PROMOTE_TOTAL_TIME_10USEC: usize = 29;
pub const PBX_FIX_COUNTERS: usize = 30;
pub const PBX_PROMOTE_COUNTERS: usize = 31;
pub const PBX_UNFIX_COUNTERS: usize = 32;
pub const PBX_LOCK_TIME_COUNTERS: usize = 33;
pub const PBX_HOLD_TIME_COUNTERS: usize = 34;
pub const PBX_FIX_TIME_COUNTERS: usize = 35;
pub const MVCC_SNAPSHOT_COUNTERS: usize = 36;
pub const OBJ_LOCK_TIME_COUNTERS: usize = 37;
pub const DWB_FLUSHED_BLOCK_VOLUMES: usize = 38;
pub const THREAD_POOL_STATS: usize = 39;
pub const THREAD_DAEMON_STATS: usize = 40;
pub const PLAN_CACHE_ENTRIES: usize = 41;
pub const HEAP_BEST_SPACE_ENTRIES: usize = 42;
pub const HOLDABLE_CURSORS: usize = 43;

pub const CATALOG: &[CatalogEntry] = &[
    simple(PB_NUM_FETCHES, "Num_data_page_fetches", ValueKind::AccumulateSingle),
    simple(PB_NUM_IOREADS, "Num_data_page_ioreads", ValueKind::AccumulateSingle),
    simple(PB_NUM_IOWRITES, "Num_data_page_iowrites", ValueKind::AccumulateSingle),
    simple(PB_NUM_VICTIMS, "Num_data_page_victims", ValueKind::AccumulateSingle),
    peek(PB_AVOID_VICTIM_CNT, "Num_data_page_avoid_victim", true),
    simple(PB_HIT_RATIO, "Data_page_buffer_hit_ratio", ValueKind::ComputedRatio),
    simple(LOG_NUM_FETCHES, "Num_log_page_fetches", ValueKind::AccumulateSingle),
    simple(LOG_NUM_IOREADS, "Num_log_page_ioreads", ValueKind::AccumulateSingle),
    simple(LOG_HIT_RATIO, "Log_page_buffer_hit_ratio", ValueKind::ComputedRatio),
    simple(HEAP_INSERT_EXECUTE, "Time_heap_insert_execute", ValueKind::CounterTimer),
    simple(HEAP_UPDATE_EXECUTE, "Time_heap_update_execute", ValueKind::CounterTimer),
    simple(BTREE_INSERT_EXECUTE, "Time_btree_insert_execute", ValueKind::CounterTimer),
    simple(TOTAL_UNFIX, "Total_page_unfix", ValueKind::DerivedCount),
    simple(TOTAL_UNFIX_VACUUM, "Total_page_unfix_vacuum", ValueKind::DerivedCount),
    simple(TOTAL_UNFIX_VACUUM_DIRTY, "Total_page_unfix_vacuum_dirty", ValueKind::DerivedCount),
    simple(PAGE_LOCK_TIME_USEC, "Page_lock_time_usec", ValueKind::DerivedCount),
    simple(PAGE_HOLD_TIME_USEC, "Page_hold_time_usec", ValueKind::DerivedCount),
    simple(PAGE_FIX_TIME_USEC, "Page_fix_time_usec", ValueKind::DerivedCount),
    simple(PAGE_LOCK_TIME_10USEC, "Page_lock_time_10usec", ValueKind::DerivedCount),
    simple(PAGE_HOLD_TIME_10USEC, "Page_hold_time_10usec", ValueKind::DerivedCount),
    simple(PAGE_FIX_TIME_10USEC, "Page_fix_time_10usec", ValueKind::DerivedCount),
    simple(PAGE_ALLOCATE_TIME_RATIO, "Page_allocate_time_ratio", ValueKind::ComputedRatio),
    simple(VACUUM_DATA_FETCHES, "Num_vacuum_data_page_fetches", ValueKind::AccumulateSingle),
    simple(VACUUM_DATA_HITS, "Num_vacuum_data_page_hits", ValueKind::DerivedCount),
    simple(VACUUM_EFFICIENCY, "Vacuum_efficiency", ValueKind::ComputedRatio),
    simple(VACUUM_FETCH_RATIO, "Vacuum_fetch_ratio", ValueKind::ComputedRatio),
    simple(VACUUM_DATA_HIT_RATIO, "Vacuum_data_hit_ratio", ValueKind::ComputedRatio),
    simple(PROMOTE_SUCCESS, "Num_page_promote_success", ValueKind::DerivedCount),
    simple(PROMOTE_FAILED, "Num_page_promote_failed", ValueKind::DerivedCount),
    simple(PROMOTE_TOTAL_TIME_10USEC, "Page_promote_time_10usec", ValueKind::DerivedCount),
    complex(PBX_FIX_COUNTERS, "Pbx_fix_counters", ComplexFamily::PbxFix),
    complex(PBX_PROMOTE_COUNTERS, "Pbx_promote_counters", ComplexFamily::PbxPromote),
    complex(PBX_UNFIX_COUNTERS, "Pbx_unfix_counters", ComplexFamily::PbxUnfix),
    complex(PBX_LOCK_TIME_COUNTERS, "Pbx_lock_time_counters", ComplexFamily::PbxLockTime),
    complex(PBX_HOLD_TIME_COUNTERS, "Pbx_hold_time_counters", ComplexFamily::PbxHoldTime),
    complex(PBX_FIX_TIME_COUNTERS, "Pbx_fix_time_counters", ComplexFamily::PbxFixTime),
    complex(MVCC_SNAPSHOT_COUNTERS, "Mvcc_snapshot_counters", ComplexFamily::MvccSnapshot),
    complex(OBJ_LOCK_TIME_COUNTERS, "Obj_lock_time_counters", ComplexFamily::ObjLockTime),
    complex(
        DWB_FLUSHED_BLOCK_VOLUMES,
        "Dwb_flushed_block_volumes",
        ComplexFamily::DwbFlushedBlockVolumes,
    ),
    complex(THREAD_POOL_STATS, "Thread_pool_stats", ComplexFamily::ThreadPoolStats),
    complex(THREAD_DAEMON_STATS, "Thread_daemon_stats", ComplexFamily::ThreadDaemonStats),
    peek(PLAN_CACHE_ENTRIES, "Num_plan_cache_entries", false),
    peek(HEAP_BEST_SPACE_ENTRIES, "Num_heap_best_space_entries", false),
    peek(HOLDABLE_CURSORS, "Num_holdable_cursors", false),
];

pub fn kind_of(id: usize) -> ValueKind {
    CATALOG[id].kind
}

pub fn slot_count_of(id: usize) -> u32 {
    CATALOG[id].slot_count
}

pub fn name_of(id: usize) -> &'static str {
    CATALOG[id].name
}

pub fn diff_as_accumulator(id: usize) -> bool {
    CATALOG[id].diff_as_accumulator
}

pub fn find_by_name(name: &str) -> Option<usize> {
    CATALOG.iter().position(|entry| entry.name == name)
}

/// Running offsets for every catalog entry, computed once at
/// `initialize()` time by iterating the catalog in id order (§4.1).
#[derive(Debug, Clone)]
pub struct Layout {
    offsets: Vec<u32>,
    total_slots: u32,
}

impl Layout {
    pub fn compute() -> crate::error::Result<Layout> {
        let mut offsets = Vec::with_capacity(CATALOG.len());
        let mut running: u32 = 0;
        for (i, entry) in CATALOG.iter().enumerate() {
            if entry.id != i {
                return Err(crate::error::PerfError::ConfigError(format!(
                    "catalog entry at index {i} has id {}",
                    entry.id
                )));
            }
            offsets.push(running);
            running = running.checked_add(entry.slot_count).ok_or_else(|| {
                crate::error::PerfError::ConfigError("catalog slot count overflow".into())
            })?;
        }
        Ok(Layout { offsets, total_slots: running })
    }

    pub fn offset_of(&self, id: usize) -> u32 {
        self.offsets[id]
    }

    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    pub fn stats_count(&self) -> usize {
        CATALOG.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_id_matches_its_index() {
        for (i, entry) in CATALOG.iter().enumerate() {
            assert_eq!(entry.id, i);
        }
    }

    #[test]
    fn layout_is_a_disjoint_contiguous_cover() {
        let layout = Layout::compute().unwrap();
        let mut expect = 0u32;
        for entry in CATALOG {
            assert_eq!(layout.offset_of(entry.id), expect);
            expect += entry.slot_count;
        }
        assert_eq!(layout.total_slots(), expect);
    }

    #[test]
    fn find_by_name_round_trips() {
        let id = find_by_name("Num_data_page_fetches").unwrap();
        assert_eq!(id, PB_NUM_FETCHES);
        assert_eq!(name_of(id), "Num_data_page_fetches");
    }

    #[test]
    fn find_by_name_missing_returns_none() {
        assert!(find_by_name("no_such_stat").is_none());
    }
}

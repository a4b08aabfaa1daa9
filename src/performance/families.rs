//! Multi-index to flat-offset mappings for the "complex" statistic families.
//!
//! Each family reproduces one shape from the catalog: a fixed set of
//! dimensions, linearized row-major. `cardinality()` derives the slot count
//! so it is never duplicated against the offset function.

use super::module_tag::Module;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    Heap,
    HeapOverflow,
    Volheader,
    Volbitmap,
    Btree,
    BtreeOverflow,
    Log,
    Catalog,
}

impl PageType {
    pub const ALL: [PageType; 8] = [
        PageType::Heap,
        PageType::HeapOverflow,
        PageType::Volheader,
        PageType::Volbitmap,
        PageType::Btree,
        PageType::BtreeOverflow,
        PageType::Log,
        PageType::Catalog,
    ];
    pub const COUNT: u32 = 8;

    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Heap => "heap",
            PageType::HeapOverflow => "heap_overflow",
            PageType::Volheader => "volheader",
            PageType::Volbitmap => "volbitmap",
            PageType::Btree => "btree",
            PageType::BtreeOverflow => "btree_overflow",
            PageType::Log => "log",
            PageType::Catalog => "catalog",
        }
    }

    pub fn is_log(self) -> bool {
        matches!(self, PageType::Log)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoundMode {
    OldInBuffer,
    NewBuffer,
}

impl FoundMode {
    pub const COUNT: u32 = 2;

    pub fn as_str(self) -> &'static str {
        match self {
            FoundMode::OldInBuffer => "old_in_buffer",
            FoundMode::NewBuffer => "new_buffer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatchMode {
    NoLatch,
    Read,
    Write,
    Mixed,
}

impl LatchMode {
    pub const COUNT: u32 = 4;

    pub fn as_str(self) -> &'static str {
        match self {
            LatchMode::NoLatch => "no_latch",
            LatchMode::Read => "read",
            LatchMode::Write => "write",
            LatchMode::Mixed => "mixed",
        }
    }
}

/// Shared by fix/lock/hold acquisition. CUBRID calls this the conditional
/// vs. unconditional fix request; page-promote reuses the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondType {
    Conditional,
    Unconditional,
}

impl CondType {
    pub const COUNT: u32 = 2;

    pub fn as_str(self) -> &'static str {
        match self {
            CondType::Conditional => "conditional",
            CondType::Unconditional => "unconditional",
        }
    }
}

pub type PromoteCond = CondType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Mvcc,
    Dirty,
}

impl SnapshotKind {
    pub const COUNT: u32 = 2;

    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotKind::Mvcc => "mvcc",
            SnapshotKind::Dirty => "dirty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Data,
    Index,
    NonExistent,
    Marked,
}

impl RecordType {
    pub const COUNT: u32 = 4;

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Data => "data",
            RecordType::Index => "index",
            RecordType::NonExistent => "non_existent",
            RecordType::Marked => "marked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Invisible,
}

impl Visibility {
    pub const COUNT: u32 = 2;

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Visible => "visible",
            Visibility::Invisible => "invisible",
        }
    }
}

/// Object lock modes, `NA_LOCK` through `SCH_M_LOCK`, in the source's
/// declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    NaLock,
    NullLock,
    SchS,
    IsLock,
    SLock,
    IxLock,
    SixLock,
    ULock,
    XLock,
    SchM,
}

impl LockMode {
    pub const ALL: [LockMode; 10] = [
        LockMode::NaLock,
        LockMode::NullLock,
        LockMode::SchS,
        LockMode::IsLock,
        LockMode::SLock,
        LockMode::IxLock,
        LockMode::SixLock,
        LockMode::ULock,
        LockMode::XLock,
        LockMode::SchM,
    ];
    pub const COUNT: u32 = 10;

    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::NaLock => "NA_LOCK",
            LockMode::NullLock => "NULL_LOCK",
            LockMode::SchS => "SCH_S_LOCK",
            LockMode::IsLock => "IS_LOCK",
            LockMode::SLock => "S_LOCK",
            LockMode::IxLock => "IX_LOCK",
            LockMode::SixLock => "SIX_LOCK",
            LockMode::ULock => "U_LOCK",
            LockMode::XLock => "X_LOCK",
            LockMode::SchM => "SCH_M_LOCK",
        }
    }
}

pub const DWB_VOLUME_BUCKETS: u32 = 8;

/// Clamp a raw "volumes flushed in this block" count into the bucket range.
pub fn dwb_bucket(num_volumes: u32) -> u32 {
    num_volumes.min(DWB_VOLUME_BUCKETS - 1)
}

pub const THREAD_POOL_STATS_FIELDS: u32 = 8;
pub const THREAD_DAEMON_COUNT: u32 = 5;
pub const THREAD_DAEMON_FIELDS_PER_DAEMON: u32 = 3;
pub const THREAD_DAEMON_STATS_FIELDS: u32 = THREAD_DAEMON_COUNT * THREAD_DAEMON_FIELDS_PER_DAEMON;

pub const fn pbx_fix_cardinality() -> u32 {
    Module::COUNT * PageType::COUNT * FoundMode::COUNT * LatchMode::COUNT * CondType::COUNT
}

pub fn pbx_fix_offset(
    module: Module,
    page_type: PageType,
    found_mode: FoundMode,
    latch_mode: LatchMode,
    cond_type: CondType,
) -> u32 {
    let m = module as u32;
    let pt = page_type as u32;
    let fm = found_mode as u32;
    let lm = latch_mode as u32;
    let ct = cond_type as u32;
    (((m * PageType::COUNT + pt) * FoundMode::COUNT + fm) * LatchMode::COUNT + lm)
        * CondType::COUNT
        + ct
}

/// Page-lock-time, page-hold-time, and page-fix-time counters share the
/// fix shape exactly (§3.4: "same shapes as their counter peers").
pub fn pbx_time_offset(
    module: Module,
    page_type: PageType,
    found_mode: FoundMode,
    latch_mode: LatchMode,
    cond_type: CondType,
) -> u32 {
    pbx_fix_offset(module, page_type, found_mode, latch_mode, cond_type)
}

pub const fn pbx_time_cardinality() -> u32 {
    pbx_fix_cardinality()
}

pub const fn pbx_promote_cardinality() -> u32 {
    Module::COUNT * PageType::COUNT * PromoteCond::COUNT * LatchMode::COUNT * 2
}

pub fn pbx_promote_offset(
    module: Module,
    page_type: PageType,
    promote_cond: PromoteCond,
    holder_latch: LatchMode,
    success: bool,
) -> u32 {
    let m = module as u32;
    let pt = page_type as u32;
    let pc = promote_cond as u32;
    let hl = holder_latch as u32;
    let s = success as u32;
    (((m * PageType::COUNT + pt) * PromoteCond::COUNT + pc) * LatchMode::COUNT + hl) * 2 + s
}

pub const fn pbx_unfix_cardinality() -> u32 {
    Module::COUNT * PageType::COUNT * 2 * 2 * LatchMode::COUNT
}

pub fn pbx_unfix_offset(
    module: Module,
    page_type: PageType,
    buf_dirty: bool,
    holder_dirty: bool,
    holder_latch: LatchMode,
) -> u32 {
    let m = module as u32;
    let pt = page_type as u32;
    let bd = buf_dirty as u32;
    let hd = holder_dirty as u32;
    let hl = holder_latch as u32;
    (((m * PageType::COUNT + pt) * 2 + bd) * 2 + hd) * LatchMode::COUNT + hl
}

pub const fn mvcc_snapshot_cardinality() -> u32 {
    SnapshotKind::COUNT * RecordType::COUNT * Visibility::COUNT
}

pub fn mvcc_snapshot_offset(
    snapshot_kind: SnapshotKind,
    record_type: RecordType,
    visibility: Visibility,
) -> u32 {
    (snapshot_kind as u32 * RecordType::COUNT + record_type as u32) * Visibility::COUNT
        + visibility as u32
}

pub const fn obj_lock_time_cardinality() -> u32 {
    LockMode::COUNT
}

pub fn obj_lock_time_offset(lock_mode: LockMode) -> u32 {
    lock_mode as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pbx_fix_offsets_stay_within_cardinality() {
        let card = pbx_fix_cardinality();
        let off = pbx_fix_offset(
            Module::Vacuum,
            PageType::Heap,
            FoundMode::OldInBuffer,
            LatchMode::Read,
            CondType::Conditional,
        );
        assert!(off < card);
    }

    #[test]
    fn pbx_fix_offsets_are_injective_over_module() {
        let a = pbx_fix_offset(
            Module::System,
            PageType::Heap,
            FoundMode::OldInBuffer,
            LatchMode::Read,
            CondType::Conditional,
        );
        let b = pbx_fix_offset(
            Module::Worker,
            PageType::Heap,
            FoundMode::OldInBuffer,
            LatchMode::Read,
            CondType::Conditional,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn dwb_bucket_clamps_to_max_minus_one() {
        assert_eq!(dwb_bucket(0), 0);
        assert_eq!(dwb_bucket(DWB_VOLUME_BUCKETS - 1), DWB_VOLUME_BUCKETS - 1);
        assert_eq!(dwb_bucket(DWB_VOLUME_BUCKETS + 50), DWB_VOLUME_BUCKETS - 1);
    }

    #[test]
    fn obj_lock_time_offset_matches_declared_order() {
        assert_eq!(obj_lock_time_offset(LockMode::NaLock), 0);
        assert_eq!(obj_lock_time_offset(LockMode::SchM), 9);
    }
}

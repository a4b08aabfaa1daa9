//! The performance telemetry engine: a process-wide, concurrent, low
//! overhead statistics fabric. [`PerfMonitor`] is the engine-owned object
//! callers create at startup and thread through (or reach via
//! [`global`]) for the life of the process.

pub mod catalog;
pub mod client;
pub mod derive;
pub mod families;
pub mod global;
pub mod module_tag;
pub mod peek;
pub mod producer;
pub mod serialize;
pub mod snapshot;
pub mod store;
pub mod watcher;

use std::sync::atomic::Ordering;
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::{PerfError, Result};

use catalog::{Layout, CT_AVG, CT_COUNT, CT_MAX, CT_TOTAL};
use families::{CondType, FoundMode, LatchMode, LockMode, PageType, PromoteCond, SnapshotKind, Visibility};
use module_tag::{Module, ThreadContext};
use peek::{PeekRegistry, PeekSource};
use serialize::DumpFlags;
use store::{ValueStore, Which};
use watcher::WatcherRegistry;

pub use families::RecordType;

/// Bundles the boot-time choices the source took from a config file:
/// how many transaction slots to reserve, whether a phantom "always
/// collect" watcher should be seeded, and which Complex families are
/// dumped by default.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub always_watching: bool,
    pub dump_flags: DumpFlags,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { always_watching: false, dump_flags: DumpFlags::default() }
    }
}

pub struct PerfMonitor {
    pub(crate) layout: Layout,
    pub(crate) store: ValueStore,
    pub(crate) watchers: WatcherRegistry,
    peek_registry: RwLock<PeekRegistry>,
    config: EngineConfig,
}

impl PerfMonitor {
    /// `initialize(num_trans)` (§4.11): computes the catalog layout,
    /// allocates the arenas, and optionally seeds the "always watching"
    /// counter. Single-threaded boot step.
    pub fn initialize(num_trans: usize, config: EngineConfig) -> Result<PerfMonitor> {
        let layout = Layout::compute()?;
        let store = ValueStore::allocate(layout.total_slots(), num_trans)?;
        let watchers = WatcherRegistry::new(num_trans);
        watchers.seed_always_watching(config.always_watching);
        info!(
            total_slots = layout.total_slots(),
            num_trans, always_watching = config.always_watching, "performance engine initialized"
        );
        Ok(PerfMonitor { layout, store, watchers, peek_registry: RwLock::new(PeekRegistry::new()), config })
    }

    /// `finalize()` (§4.11): clears watch state. The arenas themselves are
    /// released when `PerfMonitor` drops, Rust's ownership model standing
    /// in for the source's explicit `free()`.
    pub fn finalize(&self) {
        self.watchers.reset();
        info!("performance engine finalized");
    }

    pub fn register_peek_source(&self, source: Box<dyn PeekSource>) {
        self.peek_registry.write().expect("peek registry lock poisoned").register(source);
    }

    pub fn stats_count(&self) -> usize {
        self.layout.stats_count()
    }

    pub(crate) fn stats_count_slots(&self) -> usize {
        self.layout.total_slots() as usize
    }

    pub fn alloc_values(&self) -> Vec<u64> {
        snapshot::alloc_values(&self.layout)
    }

    pub fn copy(&self, dst: &mut [u64], src: &[u64]) {
        snapshot::copy(dst, src);
    }

    pub fn watch_start(&self, ctx: &ThreadContext) {
        debug!(tran_index = ctx.tran_index, "watch start");
        self.watchers.start(ctx.tran_index, &self.store);
    }

    pub fn watch_stop(&self, ctx: &ThreadContext) {
        debug!(tran_index = ctx.tran_index, "watch stop");
        self.watchers.stop(ctx.tran_index);
    }

    pub fn watching(&self, ctx: &ThreadContext) -> bool {
        self.watchers.watching(ctx.tran_index)
    }

    pub fn anyone_watching(&self) -> u32 {
        self.watchers.anyone_watching()
    }

    fn run_peek(&self, arena: Which) {
        let registry = self.peek_registry.read().expect("peek registry lock poisoned");
        let target = match arena {
            Which::Global => self.store.global(),
            Which::Tran(slot) => self.store.tran(slot),
        };
        registry.run(&self.layout, target);
    }

    /// Peeks peer subsystems into the caller's per-tran slot, copies into
    /// `out`, then derives (§6.2).
    pub fn copy_tran_snapshot(&self, ctx: &ThreadContext, out: &mut [u64]) {
        self.run_peek(Which::Tran(ctx.tran_index));
        self.store.copy_into(Which::Tran(ctx.tran_index), out);
        derive::derive(out, &self.layout);
    }

    pub fn copy_global_snapshot(&self, out: &mut [u64]) {
        self.run_peek(Which::Global);
        self.store.copy_into(Which::Global, out);
        derive::derive(out, &self.layout);
    }

    pub fn diff(&self, out: &mut [u64], new: &[u64], old: &[u64]) {
        snapshot::diff(out, new, old, &self.layout);
    }

    pub fn diff_trace_counters(&self, new: &[u64], old: &[u64]) -> (u64, u64, u64) {
        snapshot::diff_trace_counters(new, old, &self.layout)
    }

    pub fn dump_to_stream<W: std::io::Write>(
        &self,
        writer: &mut W,
        values: &[u64],
        substr: Option<&str>,
    ) -> std::io::Result<()> {
        serialize::dump_to_stream(writer, &self.layout, values, substr, self.config.dump_flags)
    }

    pub fn dump_to_buffer(&self, buf: &mut [u8], values: &[u64], substr: Option<&str>) {
        serialize::dump_to_buffer(buf, &self.layout, values, substr, self.config.dump_flags)
    }

    pub fn pack(&self, values: &[u64]) -> Vec<u8> {
        serialize::pack(values)
    }

    pub fn unpack(&self, buf: &[u8]) -> Result<Vec<u64>> {
        serialize::unpack(buf)
    }

    /// `get_named_value_and_clear` (§9 supplemented feature): reads the
    /// caller's per-tran value for `name`, zeroes it, and returns the read.
    /// `CounterTimer`s return the total and clear all four slots; `Complex`
    /// ids have no single value and are rejected.
    pub fn get_named_value_and_clear(&self, ctx: &ThreadContext, name: &str) -> Result<u64> {
        let id = catalog::find_by_name(name)
            .ok_or_else(|| PerfError::InvalidArg(format!("unknown statistic: {name}")))?;
        let base = self.layout.offset_of(id) as usize;
        let slice = self.store.tran(ctx.tran_index);
        match catalog::kind_of(id) {
            catalog::ValueKind::CounterTimer => {
                let total = slice[base + CT_TOTAL as usize].swap(0, Ordering::Relaxed);
                slice[base + CT_COUNT as usize].store(0, Ordering::Relaxed);
                slice[base + CT_MAX as usize].store(0, Ordering::Relaxed);
                slice[base + CT_AVG as usize].store(0, Ordering::Relaxed);
                Ok(total)
            }
            catalog::ValueKind::Complex(_) => {
                Err(PerfError::InvalidArg(format!("{name} is a complex statistic")))
            }
            _ => Ok(slice[base].swap(0, Ordering::Relaxed)),
        }
    }

    pub fn add(&self, ctx: &ThreadContext, id: usize, amount: u64) {
        producer::add(self, ctx, id, amount);
    }

    pub fn set_peek(&self, id: usize, value: u64) {
        producer::set_peek(self, id, value);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pbx_fix(
        &self,
        ctx: &ThreadContext,
        module: Module,
        page_type: PageType,
        found_mode: FoundMode,
        latch_mode: LatchMode,
        cond_type: CondType,
    ) {
        producer::pbx_fix(self, ctx, module, page_type, found_mode, latch_mode, cond_type);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pbx_promote(
        &self,
        ctx: &ThreadContext,
        module: Module,
        page_type: PageType,
        promote_cond: PromoteCond,
        holder_latch: LatchMode,
        success: bool,
    ) {
        producer::pbx_promote(self, ctx, module, page_type, promote_cond, holder_latch, success);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pbx_unfix(
        &self,
        ctx: &ThreadContext,
        module: Module,
        page_type: PageType,
        buf_dirty: bool,
        holder_dirty: bool,
        holder_latch: LatchMode,
    ) {
        producer::pbx_unfix(self, ctx, module, page_type, buf_dirty, holder_dirty, holder_latch);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pbx_lock_acquire_time(
        &self,
        ctx: &ThreadContext,
        module: Module,
        page_type: PageType,
        found_mode: FoundMode,
        latch_mode: LatchMode,
        cond_type: CondType,
        elapsed_usec: u64,
    ) {
        producer::pbx_lock_acquire_time(
            self, ctx, module, page_type, found_mode, latch_mode, cond_type, elapsed_usec,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pbx_hold_acquire_time(
        &self,
        ctx: &ThreadContext,
        module: Module,
        page_type: PageType,
        found_mode: FoundMode,
        latch_mode: LatchMode,
        cond_type: CondType,
        elapsed_usec: u64,
    ) {
        producer::pbx_hold_acquire_time(
            self, ctx, module, page_type, found_mode, latch_mode, cond_type, elapsed_usec,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pbx_fix_acquire_time(
        &self,
        ctx: &ThreadContext,
        module: Module,
        page_type: PageType,
        found_mode: FoundMode,
        latch_mode: LatchMode,
        cond_type: CondType,
        elapsed_usec: u64,
    ) {
        producer::pbx_fix_acquire_time(
            self, ctx, module, page_type, found_mode, latch_mode, cond_type, elapsed_usec,
        );
    }

    pub fn mvcc_snapshot(
        &self,
        ctx: &ThreadContext,
        snapshot_kind: SnapshotKind,
        record_type: RecordType,
        visibility: Visibility,
    ) {
        producer::mvcc_snapshot(self, ctx, snapshot_kind, record_type, visibility);
    }

    pub fn obj_lock_time(&self, ctx: &ThreadContext, lock_mode: LockMode, elapsed_usec: u64) {
        producer::obj_lock_time(self, ctx, lock_mode, elapsed_usec);
    }

    pub fn dwb_flushed_block_volumes(&self, ctx: &ThreadContext, num_volumes: u32) {
        producer::dwb_flushed_block_volumes(self, ctx, num_volumes);
    }

    pub fn thread_pool_stats(&self, ctx: &ThreadContext, block: &[u64]) {
        producer::thread_pool_stats(self, ctx, block);
    }

    pub fn thread_daemon_stats(&self, ctx: &ThreadContext, block: &[u64]) {
        producer::thread_daemon_stats(self, ctx, block);
    }
}

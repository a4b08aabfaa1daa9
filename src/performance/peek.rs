//! Pull-mode sampling of gauges maintained by peer subsystems (buffer pool,
//! plan cache, heap best-space tracking, holdable cursors, thread pool,
//! daemons). Invoked exactly once per snapshot export, never re-entering
//! the engine.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

/// Implemented by a peer subsystem that wants its counters sampled instead
/// of pushed. `sample` must not block on heavy locks.
pub trait PeekSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn target_id(&self) -> usize;
    fn sample(&self, into: &[AtomicU64]);
}

#[derive(Default)]
pub struct PeekRegistry {
    sources: Vec<Box<dyn PeekSource>>,
}

impl PeekRegistry {
    pub fn new() -> PeekRegistry {
        PeekRegistry { sources: Vec::new() }
    }

    pub fn register(&mut self, source: Box<dyn PeekSource>) {
        self.sources.push(source);
    }

    /// Runs every registered source in registration order against the given
    /// arena. A peer that panics is treated as a peek error: its sub-range
    /// is left unchanged and the failure is logged, never propagated.
    pub fn run(&self, layout: &super::catalog::Layout, arena: &[AtomicU64]) {
        for source in &self.sources {
            let base = layout.offset_of(source.target_id()) as usize;
            let count = super::catalog::slot_count_of(source.target_id()) as usize;
            let slice = &arena[base..base + count];
            let result = catch_unwind(AssertUnwindSafe(|| source.sample(slice)));
            if result.is_err() {
                warn!(peer = source.name(), "peek source panicked, sub-range left stale");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::catalog;

    struct FixedSource(u64);
    impl PeekSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn target_id(&self) -> usize {
            catalog::PLAN_CACHE_ENTRIES
        }
        fn sample(&self, into: &[AtomicU64]) {
            into[0].store(self.0, Ordering::Relaxed);
        }
    }

    struct PanicSource;
    impl PeekSource for PanicSource {
        fn name(&self) -> &'static str {
            "panics"
        }
        fn target_id(&self) -> usize {
            catalog::HEAP_BEST_SPACE_ENTRIES
        }
        fn sample(&self, _into: &[AtomicU64]) {
            panic!("peer is unavailable");
        }
    }

    #[test]
    fn run_writes_into_the_targets_sub_range() {
        let layout = catalog::Layout::compute().unwrap();
        let arena: Vec<AtomicU64> = (0..layout.total_slots()).map(|_| AtomicU64::new(0)).collect();
        let mut registry = PeekRegistry::new();
        registry.register(Box::new(FixedSource(42)));
        registry.run(&layout, &arena);

        let base = layout.offset_of(catalog::PLAN_CACHE_ENTRIES) as usize;
        assert_eq!(arena[base].load(Ordering::Relaxed), 42);
    }

    #[test]
    fn a_panicking_peer_leaves_its_range_unchanged_and_does_not_propagate() {
        let layout = catalog::Layout::compute().unwrap();
        let arena: Vec<AtomicU64> = (0..layout.total_slots()).map(|_| AtomicU64::new(7)).collect();
        let mut registry = PeekRegistry::new();
        registry.register(Box::new(PanicSource));
        registry.run(&layout, &arena);

        let base = layout.offset_of(catalog::HEAP_BEST_SPACE_ENTRIES) as usize;
        assert_eq!(arena[base].load(Ordering::Relaxed), 7);
    }
}

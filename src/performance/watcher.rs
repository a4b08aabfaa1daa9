//! Tracks which per-transaction slots are actively collected, plus a cheap
//! process-wide "anyone watching?" counter producers consult to skip work.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::store::ValueStore;

pub struct WatcherRegistry {
    is_watching: Vec<AtomicBool>,
    total_watchers: AtomicU32,
}

impl WatcherRegistry {
    pub fn new(num_trans: usize) -> WatcherRegistry {
        let mut is_watching = Vec::with_capacity(num_trans + 1);
        for _ in 0..=num_trans {
            is_watching.push(AtomicBool::new(false));
        }
        WatcherRegistry { is_watching, total_watchers: AtomicU32::new(0) }
    }

    /// If `enable`, bumps `total_watchers` once without attaching it to any
    /// slot, per the "always watching" boot-time flag (§4.11 step 4).
    pub fn seed_always_watching(&self, enable: bool) {
        if enable {
            self.total_watchers.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Idempotent: watching an already-watched slot does nothing.
    pub fn start(&self, slot: usize, store: &ValueStore) {
        if self.is_watching[slot]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            store.clear_slot(slot);
            self.total_watchers.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stop(&self, slot: usize) {
        if self.is_watching[slot]
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.total_watchers.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn watching(&self, slot: usize) -> bool {
        self.is_watching[slot].load(Ordering::Acquire)
    }

    pub fn anyone_watching(&self) -> u32 {
        self.total_watchers.load(Ordering::Relaxed)
    }

    /// Resets bookkeeping at shutdown. The source never decrements its
    /// "always watching" seed at finalize; this crate resets unconditionally
    /// so repeated initialize/finalize cycles never leak a phantom watcher
    /// (§10 open question #2).
    pub fn reset(&self) {
        for flag in &self.is_watching {
            flag.store(false, Ordering::Relaxed);
        }
        self.total_watchers.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent() {
        let store = ValueStore::allocate(4, 2).unwrap();
        let watchers = WatcherRegistry::new(2);
        watchers.start(1, &store);
        watchers.start(1, &store);
        assert_eq!(watchers.anyone_watching(), 1);
        assert!(watchers.watching(1));
    }

    #[test]
    fn start_zeroes_the_slot() {
        let store = ValueStore::allocate(4, 2).unwrap();
        store.tran(1)[0].store(99, std::sync::atomic::Ordering::Relaxed);
        let watchers = WatcherRegistry::new(2);
        watchers.start(1, &store);
        assert_eq!(store.tran(1)[0].load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[test]
    fn stop_decrements_and_is_idempotent() {
        let store = ValueStore::allocate(4, 2).unwrap();
        let watchers = WatcherRegistry::new(2);
        watchers.start(1, &store);
        watchers.stop(1);
        watchers.stop(1);
        assert_eq!(watchers.anyone_watching(), 0);
        assert!(!watchers.watching(1));
    }
}

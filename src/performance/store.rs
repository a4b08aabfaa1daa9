//! The raw value arenas: one global array and `num_trans + 1` per-transaction
//! arrays, all sharing the catalog's offset layout.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PerfError, Result};

pub struct ValueStore {
    global: Box<[AtomicU64]>,
    tran: Vec<Box<[AtomicU64]>>,
}

fn zeroed_arena(total_slots: u32) -> Result<Box<[AtomicU64]>> {
    let len = total_slots as usize;
    let mut v: Vec<AtomicU64> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| PerfError::OutOfMemory(e.to_string()))?;
    v.resize_with(len, || AtomicU64::new(0));
    Ok(v.into_boxed_slice())
}

impl ValueStore {
    /// Allocates the global array plus `num_trans + 1` per-tran arrays, all
    /// zeroed. On failure nothing partially allocated is retained.
    pub fn allocate(total_slots: u32, num_trans: usize) -> Result<ValueStore> {
        let global = zeroed_arena(total_slots)?;
        let mut tran = Vec::new();
        tran.try_reserve_exact(num_trans + 1)
            .map_err(|e| PerfError::OutOfMemory(e.to_string()))?;
        for _ in 0..=num_trans {
            tran.push(zeroed_arena(total_slots)?);
        }
        Ok(ValueStore { global, tran })
    }

    pub fn global(&self) -> &[AtomicU64] {
        &self.global
    }

    pub fn tran(&self, slot: usize) -> &[AtomicU64] {
        &self.tran[slot]
    }

    pub fn num_trans(&self) -> usize {
        self.tran.len() - 1
    }

    pub fn total_slots(&self) -> usize {
        self.global.len()
    }

    /// Zeroes a per-transaction slot's entire arena. Called on the watch-on
    /// transition so stale history never leaks into a freshly watched slot.
    pub fn clear_slot(&self, slot: usize) {
        for cell in self.tran[slot].iter() {
            cell.store(0, Ordering::Relaxed);
        }
    }

    pub fn copy_into(&self, arena: Which, dest: &mut [u64]) {
        let src = match arena {
            Which::Global => &self.global,
            Which::Tran(slot) => &self.tran[slot],
        };
        for (d, s) in dest.iter_mut().zip(src.iter()) {
            *d = s.load(Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Which {
    Global,
    Tran(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_zeroed_arrays() {
        let store = ValueStore::allocate(16, 2).unwrap();
        assert_eq!(store.global().len(), 16);
        assert_eq!(store.num_trans(), 2);
        for cell in store.global() {
            assert_eq!(cell.load(Ordering::Relaxed), 0);
        }
    }

    #[test]
    fn clear_slot_zeroes_only_that_slot() {
        let store = ValueStore::allocate(4, 1).unwrap();
        store.tran(1)[0].store(42, Ordering::Relaxed);
        store.tran(0)[0].store(7, Ordering::Relaxed);
        store.clear_slot(1);
        assert_eq!(store.tran(1)[0].load(Ordering::Relaxed), 0);
        assert_eq!(store.tran(0)[0].load(Ordering::Relaxed), 7);
    }
}

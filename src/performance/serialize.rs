//! Big-endian wire pack/unpack, and the two human-readable dumpers (file
//! stream and bounded buffer) that share one formatting routine per
//! statistic kind.

use std::io::{self, Write};

use crate::error::{PerfError, Result};

use super::catalog::{self, CatalogEntry, ComplexFamily, Layout, ValueKind};
use super::families::{self, CondType, LatchMode, LockMode, PageType};
use super::module_tag::Module;

/// Selects which Complex families are actually dumped; counters still
/// accumulate regardless of the flag (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpFlags(u8);

impl DumpFlags {
    pub const MVCC_SNAPSHOT: DumpFlags = DumpFlags(1 << 0);
    pub const LOCK_OBJECT: DumpFlags = DumpFlags(1 << 1);
    pub const FLUSHED_BLOCK_VOLUMES: DumpFlags = DumpFlags(1 << 2);
    pub const THREAD: DumpFlags = DumpFlags(1 << 3);
    pub const DAEMONS: DumpFlags = DumpFlags(1 << 4);
    pub const NONE: DumpFlags = DumpFlags(0);
    pub const ALL: DumpFlags = DumpFlags(
        Self::MVCC_SNAPSHOT.0
            | Self::LOCK_OBJECT.0
            | Self::FLUSHED_BLOCK_VOLUMES.0
            | Self::THREAD.0
            | Self::DAEMONS.0,
    );

    pub fn contains(self, other: DumpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: DumpFlags) -> DumpFlags {
        DumpFlags(self.0 | other.0)
    }
}

impl Default for DumpFlags {
    fn default() -> Self {
        DumpFlags::ALL
    }
}

fn family_gate(family: ComplexFamily, flags: DumpFlags) -> bool {
    match family {
        ComplexFamily::MvccSnapshot => flags.contains(DumpFlags::MVCC_SNAPSHOT),
        ComplexFamily::ObjLockTime => flags.contains(DumpFlags::LOCK_OBJECT),
        ComplexFamily::DwbFlushedBlockVolumes => flags.contains(DumpFlags::FLUSHED_BLOCK_VOLUMES),
        ComplexFamily::ThreadPoolStats => flags.contains(DumpFlags::THREAD),
        ComplexFamily::ThreadDaemonStats => flags.contains(DumpFlags::DAEMONS),
        _ => true,
    }
}

/// `pack(values) -> bytes`: big-endian, back-to-back, in catalog id order.
pub fn pack(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}

/// `unpack(bytes) -> values`: the exact inverse of [`pack`].
pub fn unpack(buf: &[u8]) -> Result<Vec<u64>> {
    if buf.len() % 8 != 0 {
        return Err(PerfError::Serialization(format!(
            "buffer length {} is not a multiple of 8",
            buf.len()
        )));
    }
    Ok(buf.chunks_exact(8).map(|c| u64::from_be_bytes(c.try_into().unwrap())).collect())
}

fn complex_labels(family: ComplexFamily, slice: &[u64]) -> Vec<(String, u64)> {
    let mut out = Vec::new();
    match family {
        ComplexFamily::PbxFix | ComplexFamily::PbxLockTime | ComplexFamily::PbxHoldTime
        | ComplexFamily::PbxFixTime => {
            for module in Module::ALL {
                for page_type in PageType::ALL {
                    for found_mode in [families::FoundMode::OldInBuffer, families::FoundMode::NewBuffer] {
                        for latch_mode in
                            [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed]
                        {
                            for cond_type in [CondType::Conditional, CondType::Unconditional] {
                                let off = families::pbx_fix_offset(
                                    module, page_type, found_mode, latch_mode, cond_type,
                                ) as usize;
                                let v = slice[off];
                                if v != 0 {
                                    out.push((
                                        format!(
                                            "{}_{}_{}_{}_{}",
                                            module.as_str(),
                                            page_type.as_str(),
                                            found_mode.as_str(),
                                            latch_mode.as_str(),
                                            cond_type.as_str()
                                        ),
                                        v,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        ComplexFamily::PbxPromote => {
            for module in Module::ALL {
                for page_type in PageType::ALL {
                    for promote_cond in [CondType::Conditional, CondType::Unconditional] {
                        for holder_latch in
                            [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed]
                        {
                            for success in [false, true] {
                                let off = families::pbx_promote_offset(
                                    module, page_type, promote_cond, holder_latch, success,
                                ) as usize;
                                let v = slice[off];
                                if v != 0 {
                                    out.push((
                                        format!(
                                            "{}_{}_{}_{}_{}",
                                            module.as_str(),
                                            page_type.as_str(),
                                            promote_cond.as_str(),
                                            holder_latch.as_str(),
                                            success
                                        ),
                                        v,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        ComplexFamily::PbxUnfix => {
            for module in Module::ALL {
                for page_type in PageType::ALL {
                    for buf_dirty in [false, true] {
                        for holder_dirty in [false, true] {
                            for holder_latch in
                                [LatchMode::NoLatch, LatchMode::Read, LatchMode::Write, LatchMode::Mixed]
                            {
                                let off = families::pbx_unfix_offset(
                                    module, page_type, buf_dirty, holder_dirty, holder_latch,
                                ) as usize;
                                let v = slice[off];
                                if v != 0 {
                                    out.push((
                                        format!(
                                            "{}_{}_{}_{}_{}",
                                            module.as_str(),
                                            page_type.as_str(),
                                            buf_dirty,
                                            holder_dirty,
                                            holder_latch.as_str()
                                        ),
                                        v,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        ComplexFamily::MvccSnapshot => {
            for snapshot_kind in [families::SnapshotKind::Mvcc, families::SnapshotKind::Dirty] {
                for record_type in [
                    families::RecordType::Data,
                    families::RecordType::Index,
                    families::RecordType::NonExistent,
                    families::RecordType::Marked,
                ] {
                    for visibility in [families::Visibility::Visible, families::Visibility::Invisible] {
                        let off =
                            families::mvcc_snapshot_offset(snapshot_kind, record_type, visibility)
                                as usize;
                        let v = slice[off];
                        if v != 0 {
                            out.push((
                                format!(
                                    "{}_{}_{}",
                                    snapshot_kind.as_str(),
                                    record_type.as_str(),
                                    visibility.as_str()
                                ),
                                v,
                            ));
                        }
                    }
                }
            }
        }
        ComplexFamily::ObjLockTime => {
            for lock_mode in LockMode::ALL {
                let off = families::obj_lock_time_offset(lock_mode) as usize;
                let v = slice[off];
                if v != 0 {
                    out.push((lock_mode.as_str().to_string(), v));
                }
            }
        }
        ComplexFamily::DwbFlushedBlockVolumes => {
            for (bucket, v) in slice.iter().enumerate() {
                if *v != 0 {
                    out.push((format!("bucket_{bucket}"), *v));
                }
            }
        }
        ComplexFamily::ThreadPoolStats | ComplexFamily::ThreadDaemonStats => {
            for (i, v) in slice.iter().enumerate() {
                if *v != 0 {
                    out.push((format!("field_{i}"), *v));
                }
            }
        }
    }
    out
}

fn format_entry(entry: &CatalogEntry, slice: &[u64], flags: DumpFlags) -> String {
    let mut s = String::new();
    match entry.kind {
        ValueKind::AccumulateSingle | ValueKind::PeekSingle | ValueKind::DerivedCount => {
            s.push_str(&format!("{:<29}= {:>12}\n", entry.name, slice[0]));
        }
        ValueKind::ComputedRatio => {
            s.push_str(&format!("{:<29}= {:>9.2}\n", entry.name, slice[0] as f64 / 100.0));
        }
        ValueKind::CounterTimer => {
            s.push_str(&format!("Num_{:<25}= {:>12}\n", entry.name, slice[catalog::CT_COUNT as usize]));
            s.push_str(&format!(
                "Total_time_{:<18}= {:>12}\n",
                entry.name,
                slice[catalog::CT_TOTAL as usize]
            ));
            s.push_str(&format!(
                "Max_time_{:<20}= {:>12}\n",
                entry.name,
                slice[catalog::CT_MAX as usize]
            ));
            s.push_str(&format!(
                "Avg_time_{:<20}= {:>12}\n",
                entry.name,
                slice[catalog::CT_AVG as usize]
            ));
        }
        ValueKind::Complex(family) => {
            if !family_gate(family, flags) {
                return s;
            }
            s.push_str(&format!("{}:\n", entry.name));
            for (label, value) in complex_labels(family, slice) {
                s.push_str(&format!("    {label:<40}= {value:>12}\n"));
            }
        }
    }
    s
}

fn matches_filter(name: &str, substr: Option<&str>) -> bool {
    substr.map_or(true, |needle| name.contains(needle))
}

/// Writes the human-readable dump for every statistic matching `substr`
/// (or all, if `None`) to `writer`.
pub fn dump_to_stream<W: Write>(
    writer: &mut W,
    layout: &Layout,
    values: &[u64],
    substr: Option<&str>,
    flags: DumpFlags,
) -> io::Result<()> {
    for entry in catalog::CATALOG {
        if !matches_filter(entry.name, substr) {
            continue;
        }
        let base = layout.offset_of(entry.id) as usize;
        let slice = &values[base..base + entry.slot_count as usize];
        let text = format_entry(entry, slice, flags);
        if !text.is_empty() {
            writer.write_all(text.as_bytes())?;
        }
    }
    Ok(())
}

/// Writes into a bounded buffer, truncating silently and always
/// null-terminating within `buf.len()` (§4.9, §7 BufferOverflow).
pub fn dump_to_buffer(
    buf: &mut [u8],
    layout: &Layout,
    values: &[u64],
    substr: Option<&str>,
    flags: DumpFlags,
) {
    if buf.is_empty() {
        return;
    }
    let mut cursor = 0usize;
    let capacity = buf.len() - 1; // reserve the trailing null terminator
    for entry in catalog::CATALOG {
        if cursor >= capacity {
            break;
        }
        if !matches_filter(entry.name, substr) {
            continue;
        }
        let base = layout.offset_of(entry.id) as usize;
        let slice = &values[base..base + entry.slot_count as usize];
        let text = format_entry(entry, slice, flags);
        if text.is_empty() {
            continue;
        }
        let bytes = text.as_bytes();
        let remaining = capacity - cursor;
        let take = bytes.len().min(remaining);
        buf[cursor..cursor + take].copy_from_slice(&bytes[..take]);
        cursor += take;
        if take < bytes.len() {
            break;
        }
    }
    buf[cursor] = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::catalog::Layout;

    #[test]
    fn pack_unpack_round_trips() {
        let layout = Layout::compute().unwrap();
        let values: Vec<u64> =
            (0..layout.total_slots() as u64).map(|i| i.wrapping_mul(0x0102030405060708)).collect();
        let packed = pack(&values);
        assert_eq!(packed.len(), values.len() * 8);
        let unpacked = unpack(&packed).unwrap();
        assert_eq!(unpacked, values);
    }

    #[test]
    fn pack_is_big_endian() {
        let packed = pack(&[1u64]);
        assert_eq!(packed, vec![0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn unpack_rejects_misaligned_buffers() {
        assert!(unpack(&[0u8; 7]).is_err());
    }

    #[test]
    fn dump_to_buffer_never_overruns_and_always_terminates() {
        let layout = Layout::compute().unwrap();
        let mut values = vec![0u64; layout.total_slots() as usize];
        values[layout.offset_of(catalog::PB_NUM_FETCHES) as usize] = 5;
        let mut buf = [0xAAu8; 16];
        dump_to_buffer(&mut buf, &layout, &values, None, DumpFlags::ALL);
        let nul = buf.iter().position(|&b| b == 0);
        assert!(nul.is_some());
        assert!(nul.unwrap() < buf.len());
    }

    #[test]
    fn dump_to_stream_honors_substring_filter() {
        let layout = Layout::compute().unwrap();
        let values = vec![0u64; layout.total_slots() as usize];
        let mut out = Vec::new();
        dump_to_stream(&mut out, &layout, &values, Some("no_such_substring_at_all"), DumpFlags::ALL)
            .unwrap();
        assert!(out.is_empty());
    }
}

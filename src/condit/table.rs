//! The CONDIT offset table and its shared bytecode chains.
//!
//! A decompressed CONDIT resource opens with a table of little-endian
//! 16-bit offsets, one per condition entry; the rest of the resource is the
//! bytecode area. The entry count is implied by the first offset, which
//! points at the start of the bytecode area (the reference resource has
//! 713 entries and a 1,426-byte table). An offset of zero marks an empty
//! entry that evaluates unconditionally true.
//!
//! The authoring tools deduplicated programs at the byte level: several
//! logical conditions share the tail of one byte sequence, entering at
//! different offsets to skip leading clauses they do not need. All entries
//! whose walks converge on the same terminator form a [`Chain`].

use std::collections::BTreeMap;

use super::decompile;
use crate::errors::{DecodeError, FormatError};

/// One slot of the condition offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditEntry {
    /// position in the offset table
    pub index: u16,
    /// absolute offset of this entry's program, or 0 for an empty entry
    pub offset: u16,
}

impl ConditEntry {
    /// Empty entries have no program and evaluate unconditionally true.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }
}

/// A group of entries whose programs terminate at the same sentinel byte.
///
/// Members are ordered by starting offset: the first evaluates the most
/// conditions, the last (deepest into the shared bytes) the fewest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// lowest member offset
    pub start: u16,
    /// offset one past the shared terminator
    pub end: u16,
    /// member entry indices, ordered by their offsets ascending
    pub members: Vec<u16>,
}

/// A parsed condition offset table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditTable {
    entries: Vec<ConditEntry>,
}

impl ConditTable {
    /// Parse the offset table at the front of a decompressed CONDIT
    /// resource.
    ///
    /// Fails if the first offset is zero, odd, or past the end of the
    /// buffer, or if any non-zero entry offset points outside the bytecode
    /// area.
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < 2 {
            return Err(FormatError::TableTooShort(data.len()));
        }
        let first = u16::from_le_bytes([data[0], data[1]]);
        if first == 0 || first % 2 != 0 || first as usize > data.len() {
            return Err(FormatError::BadOffsetTable(first));
        }

        let count = first / 2;
        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count {
            let at = index as usize * 2;
            let offset = u16::from_le_bytes([data[at], data[at + 1]]);
            if offset != 0 && (offset < first || offset as usize >= data.len()) {
                return Err(FormatError::EntryOutOfBounds { index, offset });
            }
            entries.push(ConditEntry { index, offset });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ConditEntry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of empty (unconditionally true) entries.
    pub fn empty_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_empty()).count()
    }

    /// Size in bytes of the offset table; the bytecode area starts here.
    pub fn table_size(&self) -> usize {
        self.entries.len() * 2
    }

    /// Walk every non-empty entry's program in `data` (the same buffer the
    /// table was parsed from) and group entries by the terminator their
    /// walks converge on.
    ///
    /// Chains are ordered by end offset, members within a chain by start
    /// offset. Chain member counts plus [`empty_count`](Self::empty_count)
    /// always partition the table exactly.
    pub fn derive_chains(&self, data: &[u8]) -> Result<Vec<Chain>, DecodeError> {
        let mut groups: BTreeMap<u16, Vec<&ConditEntry>> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| !e.is_empty()) {
            let end = decompile::walk(data, entry.offset as usize)?;
            groups.entry(end as u16).or_default().push(entry);
        }

        Ok(groups
            .into_iter()
            .map(|(end, mut members)| {
                members.sort_by_key(|e| e.offset);
                Chain {
                    start: members[0].offset,
                    end,
                    members: members.iter().map(|e| e.index).collect(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Four entries: two share a program tail, one has its own program,
    /// one is empty.
    fn sample_resource() -> Vec<u8> {
        let mut data = Vec::new();
        // offset table: bytecode area starts at 8
        data.extend_from_slice(&8u16.to_le_bytes()); // entry 0
        data.extend_from_slice(&11u16.to_le_bytes()); // entry 1, same tail
        data.extend_from_slice(&0u16.to_le_bytes()); // entry 2, empty
        data.extend_from_slice(&17u16.to_le_bytes()); // entry 3
        // entry 0: byte[0x2A] == byte[0x2A] & 0x01; entry 1 enters at the
        // second operand, so both walks converge at offset 17
        data.extend_from_slice(&[0x01, 0x2A, 0x00, 0x01, 0x2A, 0x08, 0x80, 0x01, 0xFF]);
        // entry 3: word[0x10] != 0x00
        data.extend_from_slice(&[0x00, 0x10, 0x03, 0x80, 0x00, 0xFF]);
        data
    }

    #[test]
    fn parses_entry_count_from_first_offset() {
        let data = sample_resource();
        let table = ConditTable::parse(&data).unwrap();
        assert_eq!(table.entry_count(), 4);
        assert_eq!(table.table_size(), 8);
        assert_eq!(table.empty_count(), 1);
        assert!(table.entries()[2].is_empty());
    }

    #[test]
    fn chains_partition_non_empty_entries() {
        let data = sample_resource();
        let table = ConditTable::parse(&data).unwrap();
        let chains = table.derive_chains(&data).unwrap();

        assert_eq!(chains.len(), 2);
        let member_total: usize = chains.iter().map(|c| c.members.len()).sum();
        assert_eq!(member_total + table.empty_count(), table.entry_count());

        // entries 0 and 1 converge on the same terminator
        assert_eq!(chains[0].members, vec![0, 1]);
        assert_eq!(chains[0].start, 8);
        assert_eq!(chains[0].end, 17);
        assert_eq!(chains[1].members, vec![3]);
    }

    #[test]
    fn zero_first_offset_rejected() {
        let data = [0u8; 8];
        assert!(matches!(
            ConditTable::parse(&data),
            Err(FormatError::BadOffsetTable(0))
        ));
    }

    #[test]
    fn odd_first_offset_rejected() {
        let mut data = vec![0u8; 8];
        data[0] = 7;
        assert!(matches!(
            ConditTable::parse(&data),
            Err(FormatError::BadOffsetTable(7))
        ));
    }

    #[test]
    fn entry_pointing_into_table_rejected() {
        let mut data = sample_resource();
        // entry 1 now points inside the offset table itself
        data[2..4].copy_from_slice(&2u16.to_le_bytes());
        assert!(matches!(
            ConditTable::parse(&data),
            Err(FormatError::EntryOutOfBounds { index: 1, .. })
        ));
    }
}

//! Identifiers and the per-revision global identifier table.
//!
//! An [`ExtendedGuid`] is self-contained. A [`CompactId`] is only an index
//! into the global identifier table of the revision that was current when it
//! was decoded, so the decoder captures that revision alongside it
//! ([`ScopedId`]) and resolution can happen at any later time.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::reader::ByteReader;

pub const EXTENDED_GUID_SIZE: usize = 20;
pub const COMPACT_ID_SIZE:    usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExtendedGuid {
    pub guid: Uuid,
    pub n:    u32,
}

impl ExtendedGuid {
    pub const NIL: ExtendedGuid = ExtendedGuid { guid: Uuid::nil(), n: 0 };

    pub fn new(guid: Uuid, n: u32) -> Self {
        Self { guid, n }
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        reader.ensure(EXTENDED_GUID_SIZE as u64, "ExtendedGUID")?;
        let guid = reader.read_guid("ExtendedGUID guid")?;
        let n = reader.read_u32("ExtendedGUID n")?;
        Ok(Self { guid, n })
    }

    pub fn is_nil(&self) -> bool {
        self.guid.is_nil() && self.n == 0
    }
}

impl fmt::Display for ExtendedGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guid, self.n)
    }
}

/// 24-bit table index plus 8-bit instance number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CompactId {
    pub n:          u8,
    pub guid_index: u32,
}

impl CompactId {
    pub fn from_u32(value: u32) -> Self {
        Self { n: (value & 0xFF) as u8, guid_index: value >> 8 }
    }

    pub fn to_u32(self) -> u32 {
        (self.guid_index << 8) | self.n as u32
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::from_u32(reader.read_u32("CompactID")?))
    }

    /// `(0, 0)` stands for the nil ExtendedGUID and needs no table entry.
    pub fn is_nil(&self) -> bool {
        self.n == 0 && self.guid_index == 0
    }
}

/// A compact id together with the revision it must be resolved under and
/// the table generation that was in effect when it was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScopedId {
    pub id:         CompactId,
    pub revision:   Option<ExtendedGuid>,
    pub generation: u64,
}

impl ScopedId {
    pub fn read(reader: &mut ByteReader<'_>, revision: &RevisionContext) -> Result<Self> {
        Ok(Self {
            id:         CompactId::read(reader)?,
            revision:   revision.current,
            generation: revision.generation,
        })
    }
}

/// The revision whose global id table is in effect, the revision it depends
/// on, and how far the tables had been built. Set by the revision manifest
/// start records and by every table change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionContext {
    pub current:    Option<ExtendedGuid>,
    pub dependent:  Option<ExtendedGuid>,
    pub generation: u64,
}

impl RevisionContext {
    pub fn enter(&mut self, rid: ExtendedGuid, dependent: ExtendedGuid) {
        self.current = Some(rid);
        self.dependent = if dependent.is_nil() { None } else { Some(dependent) };
    }
}

/// Per-revision index → GUID tables.
///
/// Object groups within one revision reuse indexes, so an index keeps every
/// GUID it was ever bound to, tagged with the generation of the change that
/// bound it. An id decoded at generation `g` resolves to the latest binding
/// made at or before `g`.
#[derive(Debug, Clone, Default)]
pub struct GlobalIdTable {
    tables:     HashMap<ExtendedGuid, BTreeMap<u32, Vec<(u64, Uuid)>>>,
    generation: u64,
}

impl GlobalIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recent change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn insert(&mut self, revision: ExtendedGuid, index: u32, guid: Uuid) {
        self.generation += 1;
        let generation = self.generation;
        self.tables.entry(revision).or_default().entry(index).or_default().push((generation, guid));
    }

    /// The current binding of `index`.
    pub fn get(&self, revision: &ExtendedGuid, index: u32) -> Option<Uuid> {
        self.get_at(revision, index, u64::MAX)
    }

    /// The binding of `index` as of `generation`.
    pub fn get_at(&self, revision: &ExtendedGuid, index: u32, generation: u64) -> Option<Uuid> {
        self.tables
            .get(revision)?
            .get(&index)?
            .iter()
            .rev()
            .find(|(g, _)| *g <= generation)
            .map(|(_, guid)| *guid)
    }

    /// Copy `count` consecutive entries of `from` starting at `from_index`
    /// into `to` starting at `to_index`. Entries are checked before any is
    /// written, so a failed copy leaves the target unchanged.
    pub fn copy_entries(
        &mut self,
        from:       &ExtendedGuid,
        from_index: u32,
        to:         ExtendedGuid,
        to_index:   u32,
        count:      u32,
    ) -> Result<()> {
        let mut copied = Vec::with_capacity(count.min(0x1_0000) as usize);
        for i in 0..count {
            let guid = from_index.checked_add(i).and_then(|ix| self.get(from, ix));
            match guid {
                Some(guid) => copied.push((to_index.wrapping_add(i), guid)),
                None => {
                    return Err(Error::UnresolvedIdentifier {
                        index:    from_index.wrapping_add(i),
                        n:        0,
                        revision: from.to_string(),
                    })
                }
            }
        }
        self.generation += 1;
        let generation = self.generation;
        let target = self.tables.entry(to).or_default();
        for (index, guid) in copied {
            target.entry(index).or_default().push((generation, guid));
        }
        Ok(())
    }

    /// Resolve against the current bindings.
    pub fn resolve(&self, revision: Option<&ExtendedGuid>, id: CompactId) -> Result<ExtendedGuid> {
        self.resolve_at(revision, u64::MAX, id)
    }

    pub fn resolve_at(&self, revision: Option<&ExtendedGuid>, generation: u64, id: CompactId) -> Result<ExtendedGuid> {
        if id.is_nil() {
            return Ok(ExtendedGuid::NIL);
        }
        let unresolved = || Error::UnresolvedIdentifier {
            index:    id.guid_index,
            n:        id.n,
            revision: revision.map_or_else(|| "<none>".to_string(), |r| r.to_string()),
        };
        let revision = revision.ok_or_else(unresolved)?;
        let guid = self.get_at(revision, id.guid_index, generation).ok_or_else(unresolved)?;
        Ok(ExtendedGuid::new(guid, id.n as u32))
    }

    /// Resolve against the bindings in effect when `id` was decoded.
    pub fn resolve_scoped(&self, id: &ScopedId) -> Result<ExtendedGuid> {
        self.resolve_at(id.revision.as_ref(), id.generation, id.id)
    }

    pub fn revisions(&self) -> impl Iterator<Item = &ExtendedGuid> {
        self.tables.keys()
    }

    /// Current bindings of one revision's table.
    pub fn entries(&self, revision: &ExtendedGuid) -> Option<BTreeMap<u32, Uuid>> {
        let table = self.tables.get(revision)?;
        Some(table.iter().filter_map(|(ix, history)| Some((*ix, history.last()?.1))).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(byte: u8) -> ExtendedGuid {
        ExtendedGuid::new(Uuid::from_bytes([byte; 16]), 1)
    }

    #[test]
    fn compact_id_bit_split() {
        let id = CompactId::from_u32(0x0000_2A05);
        assert_eq!(id.n, 5);
        assert_eq!(id.guid_index, 0x2A);
        assert_eq!(id.to_u32(), 0x2A05);
    }

    #[test]
    fn resolves_under_populated_revision() {
        let mut table = GlobalIdTable::new();
        let guid = Uuid::from_bytes([7; 16]);
        table.insert(rev(1), 3, guid);
        let resolved = table.resolve(Some(&rev(1)), CompactId { n: 9, guid_index: 3 }).unwrap();
        assert_eq!(resolved, ExtendedGuid::new(guid, 9));
    }

    #[test]
    fn other_revision_is_unresolved() {
        let mut table = GlobalIdTable::new();
        table.insert(rev(1), 3, Uuid::from_bytes([7; 16]));
        let err = table.resolve(Some(&rev(2)), CompactId { n: 1, guid_index: 3 }).unwrap_err();
        assert!(matches!(err, Error::UnresolvedIdentifier { index: 3, n: 1, .. }));
    }

    #[test]
    fn missing_index_and_missing_revision_are_unresolved() {
        let mut table = GlobalIdTable::new();
        table.insert(rev(1), 0, Uuid::from_bytes([7; 16]));
        assert!(table.resolve(Some(&rev(1)), CompactId { n: 1, guid_index: 4 }).is_err());
        assert!(table.resolve(None, CompactId { n: 1, guid_index: 0 }).is_err());
    }

    #[test]
    fn nil_compact_id_needs_no_entry() {
        let table = GlobalIdTable::new();
        assert_eq!(table.resolve(None, CompactId { n: 0, guid_index: 0 }).unwrap(), ExtendedGuid::NIL);
    }

    #[test]
    fn copy_entries_is_all_or_nothing() {
        let mut table = GlobalIdTable::new();
        table.insert(rev(1), 0, Uuid::from_bytes([1; 16]));
        table.insert(rev(1), 1, Uuid::from_bytes([2; 16]));

        table.copy_entries(&rev(1), 0, rev(2), 10, 2).unwrap();
        assert_eq!(table.get(&rev(2), 10), Some(Uuid::from_bytes([1; 16])));
        assert_eq!(table.get(&rev(2), 11), Some(Uuid::from_bytes([2; 16])));

        assert!(table.copy_entries(&rev(1), 1, rev(3), 0, 2).is_err());
        assert!(table.entries(&rev(3)).is_none());
    }

    #[test]
    fn reused_index_resolves_as_of_decode_time() {
        let mut table = GlobalIdTable::new();
        let first = Uuid::from_bytes([1; 16]);
        let second = Uuid::from_bytes([2; 16]);

        table.insert(rev(1), 0, first);
        let early = ScopedId { id: CompactId { n: 4, guid_index: 0 }, revision: Some(rev(1)), generation: table.generation() };
        table.insert(rev(1), 0, second);
        let late = ScopedId { id: CompactId { n: 4, guid_index: 0 }, revision: Some(rev(1)), generation: table.generation() };

        assert_eq!(table.resolve_scoped(&early).unwrap(), ExtendedGuid::new(first, 4));
        assert_eq!(table.resolve_scoped(&late).unwrap(), ExtendedGuid::new(second, 4));
        assert_eq!(table.get(&rev(1), 0), Some(second));
        assert_eq!(table.entries(&rev(1)).unwrap()[&0], second);
    }

    #[test]
    fn id_decoded_before_its_entry_is_unresolved() {
        let mut table = GlobalIdTable::new();
        let early = ScopedId { id: CompactId { n: 1, guid_index: 2 }, revision: Some(rev(1)), generation: table.generation() };
        table.insert(rev(1), 2, Uuid::from_bytes([9; 16]));
        assert!(matches!(table.resolve_scoped(&early), Err(Error::UnresolvedIdentifier { index: 2, .. })));
    }
}

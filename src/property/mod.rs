//! Object property sets.
//!
//! An `ObjectSpaceObjectPropSet` is laid out as
//!
//! ```text
//! OID stream │ [OSID stream] │ [ContextID stream] │ PropertySet
//! ```
//!
//! Each stream is a u32 header (`count:24 … ExtendedStreamsPresent:1
//! OsidStreamNotPresent:1`) followed by `count` CompactIDs. Properties never
//! carry identifiers inline: an id-typed property takes the next entries of
//! the matching stream, so values can only be decoded in order, one cursor
//! per stream, shared with nested property sets.

pub mod format;
pub mod names;

use serde::Serialize;

use crate::chunk::ChunkReference;
use crate::context::DecodeContext;
use crate::error::{Error, Result};
use crate::ids::{RevisionContext, ScopedId, COMPACT_ID_SIZE};
use crate::reader::ByteReader;

pub use format::format_value;

// ── Property ids ─────────────────────────────────────────────────────────────

/// Raw property tag: `id:26 type:5 bool:1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PropertyId(pub u32);

impl PropertyId {
    pub fn id(self) -> u32 {
        self.0 & 0x03FF_FFFF
    }

    pub fn prop_type(self) -> u8 {
        ((self.0 >> 26) & 0x1F) as u8
    }

    pub fn bool_value(self) -> bool {
        self.0 >> 31 == 1
    }

    /// The tag with the inline boolean masked off, as used for naming.
    pub fn key(self) -> u32 {
        self.0 & 0x7FFF_FFFF
    }

    pub fn name(self) -> String {
        match names::property_name(self.key()) {
            Some(name) => name.to_string(),
            None => format!("0x{:08X}", self.key()),
        }
    }
}

pub mod prop_type {
    pub const NO_DATA: u8 = 0x01;
    pub const BOOL: u8 = 0x02;
    pub const ONE_BYTE: u8 = 0x03;
    pub const TWO_BYTES: u8 = 0x04;
    pub const FOUR_BYTES: u8 = 0x05;
    pub const EIGHT_BYTES: u8 = 0x06;
    pub const FOUR_BYTES_OF_LENGTH_FOLLOWED_BY_DATA: u8 = 0x07;
    pub const OBJECT_ID: u8 = 0x08;
    pub const ARRAY_OF_OBJECT_IDS: u8 = 0x09;
    pub const OBJECT_SPACE_ID: u8 = 0x0A;
    pub const ARRAY_OF_OBJECT_SPACE_IDS: u8 = 0x0B;
    pub const CONTEXT_ID: u8 = 0x0C;
    pub const ARRAY_OF_CONTEXT_IDS: u8 = 0x0D;
    pub const ARRAY_OF_PROPERTY_VALUES: u8 = 0x10;
    pub const PROPERTY_SET: u8 = 0x11;
}

// ── Values ───────────────────────────────────────────────────────────────────

/// Which id stream an id-typed property draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdStreamKind {
    Object,
    ObjectSpace,
    Context,
}

/// The ids of a counted id property. Entries the stream ran out of are only
/// counted, so a large count costs no memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdArray {
    pub ids:    Vec<ScopedId>,
    pub absent: u32,
}

impl IdArray {
    pub fn len(&self) -> usize {
        self.ids.len() + self.absent as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded property value. Id reads past the end of their stream, or from
/// a stream that is not present, are `None` (or counted as absent).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    NoData,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Blob(Vec<u8>),
    Id(IdStreamKind, Option<ScopedId>),
    Ids(IdStreamKind, IdArray),
    PropertySet(PropertySet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id:    PropertyId,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    pub properties: Vec<Property>,
}

// ── Id streams ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub count:                    u32,
    pub extended_streams_present: bool,
    pub osid_stream_not_present:  bool,
}

impl StreamHeader {
    pub fn from_u32(v: u32) -> Self {
        Self {
            count:                    v & 0x00FF_FFFF,
            extended_streams_present: (v >> 30) & 1 == 1,
            osid_stream_not_present:  (v >> 31) & 1 == 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdStream {
    pub header: StreamHeader,
    pub ids:    Vec<ScopedId>,
}

impl IdStream {
    pub fn read(r: &mut ByteReader<'_>, revision: &RevisionContext) -> Result<Self> {
        let header = StreamHeader::from_u32(r.read_u32("id stream header")?);
        r.ensure(header.count as u64 * COMPACT_ID_SIZE as u64, "id stream")?;
        let ids = (0..header.count)
            .map(|_| ScopedId::read(r, revision))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { header, ids })
    }
}

/// Read position in one id stream.
struct StreamCursor<'s> {
    ids:  &'s [ScopedId],
    head: usize,
}

impl<'s> StreamCursor<'s> {
    fn new(stream: Option<&'s IdStream>) -> Self {
        Self { ids: stream.map_or(&[][..], |s| &s.ids[..]), head: 0 }
    }

    fn next(&mut self) -> Option<ScopedId> {
        let id = self.ids.get(self.head).copied();
        self.head = self.head.saturating_add(1);
        id
    }

    /// The next `count` entries; those past the end are only counted.
    fn take(&mut self, count: u32) -> IdArray {
        let start = self.head.min(self.ids.len());
        let end = start.saturating_add(count as usize).min(self.ids.len());
        let ids = self.ids[start..end].to_vec();
        self.head = self.head.saturating_add(count as usize);
        IdArray { absent: count - ids.len() as u32, ids }
    }
}

struct Streams<'s> {
    oids:        StreamCursor<'s>,
    osids:       StreamCursor<'s>,
    context_ids: StreamCursor<'s>,
}

impl<'s> Streams<'s> {
    fn get(&mut self, kind: IdStreamKind) -> &mut StreamCursor<'s> {
        match kind {
            IdStreamKind::Object      => &mut self.oids,
            IdStreamKind::ObjectSpace => &mut self.osids,
            IdStreamKind::Context     => &mut self.context_ids,
        }
    }
}

// ── ObjectSpaceObjectPropSet ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ObjectPropSet {
    pub oids:        IdStream,
    pub osids:       Option<IdStream>,
    pub context_ids: Option<IdStream>,
    pub body:        PropertySet,
}

impl ObjectPropSet {
    /// Decode the property set stored in the region `reference` points at.
    pub fn read_from(ctx: &DecodeContext<'_>, reference: &ChunkReference) -> Result<Self> {
        let (start, end) = reference.bounds(ctx.container_len(), "object property set")?;
        let mut r = ByteReader::new(&ctx.data[start as usize..end as usize]);
        Self::read(&mut r, &ctx.revision, ctx.options.max_property_depth)
    }

    pub fn read(r: &mut ByteReader<'_>, revision: &RevisionContext, max_depth: usize) -> Result<Self> {
        let oids = IdStream::read(r, revision)?;
        let osids = if oids.header.osid_stream_not_present {
            None
        } else {
            Some(IdStream::read(r, revision)?)
        };
        let context_ids = if oids.header.extended_streams_present {
            Some(IdStream::read(r, revision)?)
        } else {
            None
        };

        let mut streams = Streams {
            oids:        StreamCursor::new(Some(&oids)),
            osids:       StreamCursor::new(osids.as_ref()),
            context_ids: StreamCursor::new(context_ids.as_ref()),
        };
        let body = PropertySet::read(r, &mut streams, 1, max_depth)?;
        Ok(Self { oids, osids, context_ids, body })
    }
}

impl PropertySet {
    fn read(r: &mut ByteReader<'_>, streams: &mut Streams<'_>, depth: usize, max_depth: usize) -> Result<Self> {
        if depth > max_depth {
            return Err(Error::NestingTooDeep { what: "property set", limit: max_depth });
        }

        let count = r.read_u16("cProperties")? as usize;
        r.ensure(count as u64 * 4, "rgPrids")?;
        let ids = (0..count)
            .map(|_| r.read_u32("PropertyID").map(PropertyId))
            .collect::<Result<Vec<_>>>()?;

        let mut properties = Vec::with_capacity(count);
        for id in ids {
            let value = read_value(r, streams, id, depth, max_depth)?;
            properties.push(Property { id, value });
        }
        Ok(Self { properties })
    }

    pub fn get(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.id.key() == id.key()).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn read_value(
    r:         &mut ByteReader<'_>,
    streams:   &mut Streams<'_>,
    id:        PropertyId,
    depth:     usize,
    max_depth: usize,
) -> Result<PropertyValue> {
    use prop_type::*;

    let ty = id.prop_type();
    Ok(match ty {
        NO_DATA     => PropertyValue::NoData,
        BOOL        => PropertyValue::Bool(id.bool_value()),
        ONE_BYTE    => PropertyValue::U8(r.read_u8("property value")?),
        TWO_BYTES   => PropertyValue::U16(r.read_u16("property value")?),
        FOUR_BYTES  => PropertyValue::U32(r.read_u32("property value")?),
        EIGHT_BYTES => PropertyValue::U64(r.read_u64("property value")?),
        FOUR_BYTES_OF_LENGTH_FOLLOWED_BY_DATA => {
            let cb = r.read_u32("prtFourBytesOfLengthFollowedByData cb")?;
            PropertyValue::Blob(r.read_bytes(cb as usize, "prtFourBytesOfLengthFollowedByData")?.to_vec())
        }
        OBJECT_ID | OBJECT_SPACE_ID | CONTEXT_ID => {
            let kind = stream_kind(ty);
            PropertyValue::Id(kind, streams.get(kind).next())
        }
        ARRAY_OF_OBJECT_IDS | ARRAY_OF_OBJECT_SPACE_IDS | ARRAY_OF_CONTEXT_IDS => {
            let kind = stream_kind(ty);
            let count = r.read_u32("id array count")?;
            let limit = r.len() / COMPACT_ID_SIZE as u64;
            if count as u64 > limit {
                return Err(Error::ExcessiveCount { context: "id array", count: count as u64, limit });
            }
            PropertyValue::Ids(kind, streams.get(kind).take(count))
        }
        ARRAY_OF_PROPERTY_VALUES => {
            return Err(Error::UnsupportedPropertyType { prop_type: ty, prop_id: id.0 })
        }
        PROPERTY_SET => PropertyValue::PropertySet(PropertySet::read(r, streams, depth + 1, max_depth)?),
        _ => return Err(Error::InvalidPropertyType { prop_type: ty, prop_id: id.0 }),
    })
}

fn stream_kind(ty: u8) -> IdStreamKind {
    match ty {
        prop_type::OBJECT_ID | prop_type::ARRAY_OF_OBJECT_IDS => IdStreamKind::Object,
        prop_type::OBJECT_SPACE_ID | prop_type::ARRAY_OF_OBJECT_SPACE_IDS => IdStreamKind::ObjectSpace,
        _ => IdStreamKind::Context,
    }
}

//! File nodes: the tagged records that make up every node list.
//!
//! ## Header layout (u32, little-endian)
//!
//! ```text
//! bits  0..10  FileNodeID
//! bits 10..23  Size (bytes, header included)
//! bits 23..25  StpFormat  ─┐ encoding of the payload's chunk reference,
//! bits 25..27  CbFormat   ─┘ see crate::chunk
//! bits 27..31  BaseType   (2 = payload references a child node list)
//! bit  31      Reserved
//! ```
//!
//! A node is the unit of failure isolation. Anything that goes wrong inside
//! its payload, property set, store object or child list is recorded as a
//! diagnostic on the context and the node is kept with whatever decoded.
//! Only fatal errors escape [`decode_node`].

pub mod list;
pub mod payload;

use serde::Serialize;
use tracing::trace;

use crate::context::DecodeContext;
use crate::error::{Error, Result};
use crate::ids::ExtendedGuid;
use crate::property::ObjectPropSet;
use crate::reader::ByteReader;

pub use list::{read_list, FileNodeList, FileNodeListFragment, FragmentHeader};
pub use payload::NodeData;

/// `BaseType` of nodes whose payload references a child node list.
pub const BASE_TYPE_CHILD_LIST: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileNodeHeader {
    pub id:         u16,
    pub size:       u16,
    pub stp_format: u8,
    pub cb_format:  u8,
    pub base_type:  u8,
    pub reserved:   u8,
}

impl FileNodeHeader {
    pub fn from_u32(v: u32) -> Self {
        Self {
            id:         (v & 0x3FF) as u16,
            size:       ((v >> 10) & 0x1FFF) as u16,
            stp_format: ((v >> 23) & 0x3) as u8,
            cb_format:  ((v >> 25) & 0x3) as u8,
            base_type:  ((v >> 27) & 0xF) as u8,
            reserved:   (v >> 31) as u8,
        }
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::from_u32(reader.read_u32("file node header")?))
    }

    pub fn has_child_list(&self) -> bool {
        self.base_type == BASE_TYPE_CHILD_LIST
    }

    /// Node ids 0 and 0xFF end the node sequence of a fragment.
    pub fn is_terminator(&self) -> bool {
        self.id == 0 || self.id == 0xFF
    }
}

macro_rules! node_kinds {
    ($($id:literal => $variant:ident,)*) => {
        /// Every file node kind the decoder knows, keyed by `FileNodeID`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum NodeKind {
            $($variant,)*
            Unknown(u16),
        }

        impl NodeKind {
            pub fn from_id(id: u16) -> Self {
                match id {
                    $($id => NodeKind::$variant,)*
                    other => NodeKind::Unknown(other),
                }
            }

            pub fn id(self) -> u16 {
                match self {
                    $(NodeKind::$variant => $id,)*
                    NodeKind::Unknown(id) => id,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => stringify!($variant),)*
                    NodeKind::Unknown(_) => "Unknown",
                }
            }
        }
    };
}

node_kinds! {
    0x004 => ObjectSpaceManifestRootFND,
    0x008 => ObjectSpaceManifestListReferenceFND,
    0x00C => ObjectSpaceManifestListStartFND,
    0x010 => RevisionManifestListReferenceFND,
    0x014 => RevisionManifestListStartFND,
    0x01B => RevisionManifestStart4FND,
    0x01C => RevisionManifestEndFND,
    0x01E => RevisionManifestStart6FND,
    0x01F => RevisionManifestStart7FND,
    0x021 => GlobalIdTableStartFNDX,
    0x022 => GlobalIdTableStart2FND,
    0x024 => GlobalIdTableEntryFNDX,
    0x025 => GlobalIdTableEntry2FNDX,
    0x026 => GlobalIdTableEntry3FNDX,
    0x028 => GlobalIdTableEndFNDX,
    0x02D => ObjectDeclarationWithRefCountFNDX,
    0x02E => ObjectDeclarationWithRefCount2FNDX,
    0x041 => ObjectRevisionWithRefCountFNDX,
    0x042 => ObjectRevisionWithRefCount2FNDX,
    0x059 => RootObjectReference2FNDX,
    0x05A => RootObjectReference3FND,
    0x05C => RevisionRoleDeclarationFND,
    0x05D => RevisionRoleAndContextDeclarationFND,
    0x072 => ObjectDeclarationFileData3RefCountFND,
    0x073 => ObjectDeclarationFileData3LargeRefCountFND,
    0x07C => ObjectDataEncryptionKeyV2FNDX,
    0x084 => ObjectInfoDependencyOverridesFND,
    0x08C => DataSignatureGroupDefinitionFND,
    0x090 => FileDataStoreListReferenceFND,
    0x094 => FileDataStoreObjectReferenceFND,
    0x0A4 => ObjectDeclaration2RefCountFND,
    0x0A5 => ObjectDeclaration2LargeRefCountFND,
    0x0B0 => ObjectGroupListReferenceFND,
    0x0B4 => ObjectGroupStartFND,
    0x0B8 => ObjectGroupEndFND,
    0x0C2 => HashedChunkDescriptor2FND,
    0x0C4 => ReadOnlyObjectDeclaration2RefCountFND,
    0x0C5 => ReadOnlyObjectDeclaration2LargeRefCountFND,
    0x0FF => ChunkTerminatorFND,
}

#[derive(Debug)]
pub struct FileNode {
    /// Absolute offset of the node header.
    pub offset:       u64,
    pub header:       FileNodeHeader,
    pub kind:         NodeKind,
    pub data:         NodeData,
    pub property_set: Option<ObjectPropSet>,
    pub child:        Option<FileNodeList>,
}

impl FileNode {
    /// Depth-first pre-order walk: this node, then its child list.
    pub fn walk<'n>(&'n self, out: &mut Vec<&'n FileNode>) {
        out.push(self);
        if let Some(child) = &self.child {
            child.walk(out);
        }
    }
}

/// Decode one node at the reader's position. The reader is left after the
/// bytes the payload consumed; the caller decides where the next node starts.
pub fn decode_node(ctx: &mut DecodeContext<'_>, reader: &mut ByteReader<'_>) -> Result<FileNode> {
    let offset = reader.position();
    ctx.charge_node()?;

    let header = FileNodeHeader::read(reader)?;
    let kind = NodeKind::from_id(header.id);
    trace!(offset, node = kind.name(), size = header.size, "file node");

    let data = match payload::read_payload(ctx, reader, &header, kind) {
        Ok(data) => data,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            ctx.diagnose(offset, Some(kind.name()), e);
            NodeData::Undecoded
        }
    };

    if let Err(e) = apply_to_context(ctx, &data) {
        ctx.diagnose(offset, Some(kind.name()), e);
    }
    ctx.revision.generation = ctx.global_ids.generation();

    let property_set = match data.property_set_reference() {
        Some(reference) => match ObjectPropSet::read_from(ctx, &reference) {
            Ok(set) => Some(set),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                ctx.diagnose(offset, Some(kind.name()), e);
                None
            }
        },
        None => None,
    };

    let child = match (header.has_child_list(), data.child_list_reference()) {
        (true, Some(reference)) if !reference.is_nil() => match read_list(ctx, &reference) {
            Ok(list) => Some(list),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                ctx.diagnose(offset, Some(kind.name()), e);
                None
            }
        },
        _ => None,
    };

    Ok(FileNode { offset, header, kind, data, property_set, child })
}

/// Revision and global id table bookkeeping for the node just decoded.
fn apply_to_context(ctx: &mut DecodeContext<'_>, data: &NodeData) -> Result<()> {
    match data {
        NodeData::RevisionManifestStart(start) => {
            ctx.revision.enter(start.rid, start.rid_dependent);
        }
        NodeData::GlobalIdTableEntry(entry) => {
            let revision = current_revision(ctx, entry.index)?;
            ctx.global_ids.insert(revision, entry.index, entry.guid);
        }
        NodeData::GlobalIdTableEntry2(entry) => {
            let (from, to) = copy_revisions(ctx, entry.index_map_from)?;
            ctx.global_ids.copy_entries(&from, entry.index_map_from, to, entry.index_map_to, 1)?;
        }
        NodeData::GlobalIdTableEntry3(entry) => {
            let (from, to) = copy_revisions(ctx, entry.index_copy_from_start)?;
            ctx.global_ids.copy_entries(
                &from,
                entry.index_copy_from_start,
                to,
                entry.index_copy_to_start,
                entry.entries_to_copy,
            )?;
        }
        _ => {}
    }
    Ok(())
}

fn current_revision(ctx: &DecodeContext<'_>, index: u32) -> Result<ExtendedGuid> {
    ctx.revision.current.ok_or_else(|| Error::UnresolvedIdentifier {
        index,
        n:        0,
        revision: "<none>".to_string(),
    })
}

/// `(dependency, current)` for a table copy.
fn copy_revisions(ctx: &DecodeContext<'_>, index: u32) -> Result<(ExtendedGuid, ExtendedGuid)> {
    let to = current_revision(ctx, index)?;
    let from = ctx.revision.dependent.ok_or_else(|| Error::UnresolvedIdentifier {
        index,
        n:        0,
        revision: format!("dependency of {to}"),
    })?;
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_bit_fields() {
        // id 0x094, size 0x2C, stp 1, cb 2, base type 2
        let v = 0x094 | (0x2C << 10) | (1 << 23) | (2 << 25) | (2 << 27);
        let h = FileNodeHeader::from_u32(v);
        assert_eq!(h.id, 0x094);
        assert_eq!(h.size, 0x2C);
        assert_eq!(h.stp_format, 1);
        assert_eq!(h.cb_format, 2);
        assert_eq!(h.base_type, 2);
        assert_eq!(h.reserved, 0);
        assert!(h.has_child_list());
    }

    #[test]
    fn kinds_round_trip_through_ids() {
        assert_eq!(NodeKind::from_id(0x0A4), NodeKind::ObjectDeclaration2RefCountFND);
        assert_eq!(NodeKind::ObjectDeclaration2RefCountFND.id(), 0x0A4);
        assert_eq!(NodeKind::from_id(0x072).name(), "ObjectDeclarationFileData3RefCountFND");
        assert_eq!(NodeKind::from_id(0x3AB), NodeKind::Unknown(0x3AB));
        assert_eq!(NodeKind::Unknown(0x3AB).name(), "Unknown");
    }

    proptest! {
        #[test]
        fn header_fields_stay_in_range(v in any::<u32>()) {
            let h = FileNodeHeader::from_u32(v);
            prop_assert!(h.id <= 0x3FF);
            prop_assert!(h.size <= 0x1FFF);
            prop_assert!(h.stp_format <= 3 && h.cb_format <= 3);
            prop_assert!(h.base_type <= 0xF && h.reserved <= 1);
        }
    }
}

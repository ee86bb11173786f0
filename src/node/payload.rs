//! Typed payloads, one per node kind.

use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use crate::chunk::ChunkReference;
use crate::context::DecodeContext;
use crate::error::Result;
use crate::filedata::FileDataStoreObject;
use crate::ids::{ExtendedGuid, RevisionContext, ScopedId};
use crate::jcid::Jcid;
use crate::reader::ByteReader;

use super::{FileNodeHeader, NodeKind};

// ── Object spaces and revisions ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ObjectSpaceManifestListReference {
    pub reference: ChunkReference,
    pub gosid:     ExtendedGuid,
}

#[derive(Debug, Clone)]
pub struct RevisionManifestListStart {
    pub gosid:      ExtendedGuid,
    pub n_instance: u32,
}

/// `RevisionManifestStart4FND`, `…6FND` and `…7FND`. The fields a variant
/// does not carry are `None`.
#[derive(Debug, Clone)]
pub struct RevisionManifestStart {
    pub rid:            ExtendedGuid,
    pub rid_dependent:  ExtendedGuid,
    pub time_creation:  Option<u64>,
    pub revision_role:  u32,
    pub odcs_default:   u16,
    pub gctxid:         Option<ExtendedGuid>,
}

#[derive(Debug, Clone)]
pub struct RevisionRoleDeclaration {
    pub rid:           ExtendedGuid,
    pub revision_role: u32,
    pub gctxid:        Option<ExtendedGuid>,
}

#[derive(Debug, Clone)]
pub struct RootObjectReference {
    pub oid_root:  RootObjectId,
    pub root_role: u32,
}

#[derive(Debug, Clone, Copy)]
pub enum RootObjectId {
    Compact(ScopedId),
    Extended(ExtendedGuid),
}

// ── Global id table ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GlobalIdTableEntry {
    pub index: u32,
    pub guid:  Uuid,
}

#[derive(Debug, Clone)]
pub struct GlobalIdTableEntry2 {
    pub index_map_from: u32,
    pub index_map_to:   u32,
}

#[derive(Debug, Clone)]
pub struct GlobalIdTableEntry3 {
    pub index_copy_from_start: u32,
    pub entries_to_copy:       u32,
    pub index_copy_to_start:   u32,
}

// ── Objects ──────────────────────────────────────────────────────────────────

/// The common body of every object declaration: the object's id, its class,
/// and whether its property set references other objects or object spaces.
#[derive(Debug, Clone)]
pub struct ObjectDeclarationBody {
    pub oid:                 ScopedId,
    pub jcid:                Jcid,
    /// Only carried by the legacy `…WithRefCount` records.
    pub odcs:                Option<u8>,
    pub has_oid_references:  bool,
    pub has_osid_references: bool,
}

/// `ObjectDeclarationWithRefCount(2)FNDX`, `ObjectDeclaration2(Large)RefCountFND`
/// and their read-only variants.
#[derive(Debug, Clone)]
pub struct ObjectDeclaration {
    pub reference: ChunkReference,
    pub body:      ObjectDeclarationBody,
    pub ref_count: u32,
    /// MD5 of the referenced data, read-only variants only.
    pub md5_hash:  Option<[u8; 16]>,
}

#[derive(Debug, Clone)]
pub struct ObjectRevision {
    pub reference:           ChunkReference,
    pub oid:                 ScopedId,
    pub has_oid_references:  bool,
    pub has_osid_references: bool,
    pub ref_count:           u32,
}

/// An embedded file declared by GUID and extension; the bytes live in a
/// file data store object elsewhere.
#[derive(Debug, Clone)]
pub struct ObjectDeclarationFileData {
    pub oid:                 ScopedId,
    pub jcid:                Jcid,
    pub ref_count:           u32,
    /// `<ifndf>{GUID}` of the store object holding the bytes.
    pub file_data_reference: String,
    pub extension:           String,
}

#[derive(Debug, Clone)]
pub struct DependencyOverride {
    pub oid:       ScopedId,
    pub ref_count: u32,
}

#[derive(Debug, Clone)]
pub struct ObjectInfoDependencyOverrideData {
    pub overrides_8:  Vec<DependencyOverride>,
    pub overrides_32: Vec<DependencyOverride>,
    pub crc:          u32,
}

#[derive(Debug, Clone)]
pub struct ObjectInfoDependencyOverrides {
    pub reference: ChunkReference,
    pub data:      ObjectInfoDependencyOverrideData,
}

#[derive(Debug, Clone)]
pub struct ObjectGroupListReference {
    pub reference:       ChunkReference,
    pub object_group_id: ExtendedGuid,
}

// ── File data ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FileDataStoreObjectReference {
    pub reference:      ChunkReference,
    pub guid_reference: Uuid,
    /// `None` when the referenced store object is corrupt.
    pub object:         Option<FileDataStoreObject>,
}

#[derive(Debug, Clone)]
pub struct HashedChunkDescriptor {
    pub blob_reference: ChunkReference,
    pub guid_hash:      [u8; 16],
}

// ── NodeData ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum NodeData {
    ObjectSpaceManifestRoot { gosid_root: ExtendedGuid },
    ObjectSpaceManifestListReference(ObjectSpaceManifestListReference),
    ObjectSpaceManifestListStart { gosid: ExtendedGuid },
    RevisionManifestListReference { reference: ChunkReference },
    RevisionManifestListStart(RevisionManifestListStart),
    RevisionManifestStart(RevisionManifestStart),
    GlobalIdTableStart { reserved: u8 },
    GlobalIdTableEntry(GlobalIdTableEntry),
    GlobalIdTableEntry2(GlobalIdTableEntry2),
    GlobalIdTableEntry3(GlobalIdTableEntry3),
    ObjectDeclaration(ObjectDeclaration),
    ObjectRevision(ObjectRevision),
    RootObjectReference(RootObjectReference),
    RevisionRoleDeclaration(RevisionRoleDeclaration),
    ObjectDeclarationFileData(ObjectDeclarationFileData),
    ObjectDataEncryptionKey { reference: ChunkReference },
    ObjectInfoDependencyOverrides(ObjectInfoDependencyOverrides),
    DataSignatureGroupDefinition { data_signature_group: ExtendedGuid },
    FileDataStoreListReference { reference: ChunkReference },
    FileDataStoreObjectReference(FileDataStoreObjectReference),
    ObjectGroupListReference(ObjectGroupListReference),
    ObjectGroupStart { oid: ExtendedGuid },
    HashedChunkDescriptor(HashedChunkDescriptor),
    /// Kinds without a payload: list and group ends, table start 2,
    /// the chunk terminator.
    Empty,
    /// Unknown node id. Base types 1 and 2 always start their payload with a
    /// chunk reference, so that much is still read.
    Unknown { reference: Option<ChunkReference> },
    /// The payload failed to decode; see the document diagnostics.
    Undecoded,
}

impl NodeData {
    /// Reference to the child node list, for nodes with base type 2.
    pub fn child_list_reference(&self) -> Option<ChunkReference> {
        match self {
            NodeData::ObjectSpaceManifestListReference(n) => Some(n.reference),
            NodeData::RevisionManifestListReference { reference }
            | NodeData::FileDataStoreListReference { reference } => Some(*reference),
            NodeData::ObjectGroupListReference(n) => Some(n.reference),
            NodeData::Unknown { reference } => *reference,
            _ => None,
        }
    }

    /// Reference to the object's property set, when one must be decoded.
    pub fn property_set_reference(&self) -> Option<ChunkReference> {
        match self {
            NodeData::ObjectDeclaration(decl) => {
                let legacy = decl.body.odcs.is_some();
                (legacy || decl.body.jcid.is_property_set()).then_some(decl.reference)
            }
            NodeData::ObjectRevision(rev) => Some(rev.reference),
            _ => None,
        }
    }

    /// The declared object id, for nodes that declare or revise an object.
    pub fn object_id(&self) -> Option<&ScopedId> {
        match self {
            NodeData::ObjectDeclaration(decl) => Some(&decl.body.oid),
            NodeData::ObjectRevision(rev) => Some(&rev.oid),
            NodeData::ObjectDeclarationFileData(decl) => Some(&decl.oid),
            _ => None,
        }
    }

    pub fn jcid(&self) -> Option<Jcid> {
        match self {
            NodeData::ObjectDeclaration(decl) => Some(decl.body.jcid),
            NodeData::ObjectDeclarationFileData(decl) => Some(decl.jcid),
            _ => None,
        }
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

pub(crate) fn read_payload(
    ctx:    &mut DecodeContext<'_>,
    r:      &mut ByteReader<'_>,
    header: &FileNodeHeader,
    kind:   NodeKind,
) -> Result<NodeData> {
    use NodeKind::*;

    let chunk_ref = |r: &mut ByteReader<'_>| ChunkReference::read(r, header.stp_format, header.cb_format);
    let revision = ctx.revision;

    Ok(match kind {
        ObjectSpaceManifestRootFND => NodeData::ObjectSpaceManifestRoot { gosid_root: ExtendedGuid::read(r)? },
        ObjectSpaceManifestListReferenceFND => {
            NodeData::ObjectSpaceManifestListReference(ObjectSpaceManifestListReference {
                reference: chunk_ref(r)?,
                gosid:     ExtendedGuid::read(r)?,
            })
        }
        ObjectSpaceManifestListStartFND => NodeData::ObjectSpaceManifestListStart { gosid: ExtendedGuid::read(r)? },
        RevisionManifestListReferenceFND => NodeData::RevisionManifestListReference { reference: chunk_ref(r)? },
        RevisionManifestListStartFND => NodeData::RevisionManifestListStart(RevisionManifestListStart {
            gosid:      ExtendedGuid::read(r)?,
            n_instance: r.read_u32("nInstance")?,
        }),
        RevisionManifestStart4FND => NodeData::RevisionManifestStart(RevisionManifestStart {
            rid:           ExtendedGuid::read(r)?,
            rid_dependent: ExtendedGuid::read(r)?,
            time_creation: Some(r.read_u64("timeCreation")?),
            revision_role: r.read_u32("RevisionRole")?,
            odcs_default:  r.read_u16("odcsDefault")?,
            gctxid:        None,
        }),
        RevisionManifestStart6FND | RevisionManifestStart7FND => {
            let mut start = RevisionManifestStart {
                rid:           ExtendedGuid::read(r)?,
                rid_dependent: ExtendedGuid::read(r)?,
                time_creation: None,
                revision_role: r.read_u32("RevisionRole")?,
                odcs_default:  r.read_u16("odcsDefault")?,
                gctxid:        None,
            };
            if kind == RevisionManifestStart7FND {
                start.gctxid = Some(ExtendedGuid::read(r)?);
            }
            NodeData::RevisionManifestStart(start)
        }
        GlobalIdTableStartFNDX => NodeData::GlobalIdTableStart { reserved: r.read_u8("GlobalIdTableStart reserved")? },
        GlobalIdTableEntryFNDX => NodeData::GlobalIdTableEntry(GlobalIdTableEntry {
            index: r.read_u32("GlobalIdTableEntry index")?,
            guid:  r.read_guid("GlobalIdTableEntry guid")?,
        }),
        GlobalIdTableEntry2FNDX => NodeData::GlobalIdTableEntry2(GlobalIdTableEntry2 {
            index_map_from: r.read_u32("iIndexMapFrom")?,
            index_map_to:   r.read_u32("iIndexMapTo")?,
        }),
        GlobalIdTableEntry3FNDX => NodeData::GlobalIdTableEntry3(GlobalIdTableEntry3 {
            index_copy_from_start: r.read_u32("iIndexCopyFromStart")?,
            entries_to_copy:       r.read_u32("cEntriesToCopy")?,
            index_copy_to_start:   r.read_u32("iIndexCopyToStart")?,
        }),
        ObjectDeclarationWithRefCountFNDX | ObjectDeclarationWithRefCount2FNDX => {
            let reference = chunk_ref(r)?;
            let body = read_legacy_declaration_body(r, &revision)?;
            let ref_count = read_ref_count(r, kind == ObjectDeclarationWithRefCount2FNDX)?;
            NodeData::ObjectDeclaration(ObjectDeclaration { reference, body, ref_count, md5_hash: None })
        }
        ObjectRevisionWithRefCountFNDX => {
            let reference = chunk_ref(r)?;
            let oid = ScopedId::read(r, &revision)?;
            let bits = r.read_u8("ObjectRevisionWithRefCount flags")?;
            NodeData::ObjectRevision(ObjectRevision {
                reference,
                oid,
                has_oid_references:  bits & 0x1 != 0,
                has_osid_references: bits & 0x2 != 0,
                ref_count:           (bits >> 2) as u32,
            })
        }
        ObjectRevisionWithRefCount2FNDX => {
            let reference = chunk_ref(r)?;
            let oid = ScopedId::read(r, &revision)?;
            let flags = r.read_u32("ObjectRevisionWithRefCount2 flags")?;
            NodeData::ObjectRevision(ObjectRevision {
                reference,
                oid,
                has_oid_references:  flags & 0x1 != 0,
                has_osid_references: flags & 0x2 != 0,
                ref_count:           r.read_u32("cRef")?,
            })
        }
        RootObjectReference2FNDX => NodeData::RootObjectReference(RootObjectReference {
            oid_root:  RootObjectId::Compact(ScopedId::read(r, &revision)?),
            root_role: r.read_u32("RootRole")?,
        }),
        RootObjectReference3FND => NodeData::RootObjectReference(RootObjectReference {
            oid_root:  RootObjectId::Extended(ExtendedGuid::read(r)?),
            root_role: r.read_u32("RootRole")?,
        }),
        RevisionRoleDeclarationFND | RevisionRoleAndContextDeclarationFND => {
            let mut decl = RevisionRoleDeclaration {
                rid:           ExtendedGuid::read(r)?,
                revision_role: r.read_u32("RevisionRole")?,
                gctxid:        None,
            };
            if kind == RevisionRoleAndContextDeclarationFND {
                decl.gctxid = Some(ExtendedGuid::read(r)?);
            }
            NodeData::RevisionRoleDeclaration(decl)
        }
        ObjectDeclarationFileData3RefCountFND | ObjectDeclarationFileData3LargeRefCountFND => {
            let oid = ScopedId::read(r, &revision)?;
            let jcid = Jcid::read(r)?;
            let ref_count = read_ref_count(r, kind == ObjectDeclarationFileData3LargeRefCountFND)?;
            NodeData::ObjectDeclarationFileData(ObjectDeclarationFileData {
                oid,
                jcid,
                ref_count,
                file_data_reference: read_storage_string(r, "FileDataReference")?,
                extension:           read_storage_string(r, "Extension")?,
            })
        }
        ObjectDataEncryptionKeyV2FNDX => NodeData::ObjectDataEncryptionKey { reference: chunk_ref(r)? },
        ObjectInfoDependencyOverridesFND => {
            let reference = chunk_ref(r)?;
            let data = if reference.is_nil() {
                read_dependency_overrides(r, &revision)?
            } else {
                let (start, end) = reference.bounds(ctx.container_len(), "ObjectInfoDependencyOverrideData")?;
                let mut region = ByteReader::new(&ctx.data[start as usize..end as usize]);
                read_dependency_overrides(&mut region, &revision)?
            };
            NodeData::ObjectInfoDependencyOverrides(ObjectInfoDependencyOverrides { reference, data })
        }
        DataSignatureGroupDefinitionFND => {
            NodeData::DataSignatureGroupDefinition { data_signature_group: ExtendedGuid::read(r)? }
        }
        FileDataStoreListReferenceFND => NodeData::FileDataStoreListReference { reference: chunk_ref(r)? },
        FileDataStoreObjectReferenceFND => {
            let reference = chunk_ref(r)?;
            let guid_reference = r.read_guid("guidReference")?;
            let object = match FileDataStoreObject::read(ctx.data, &reference) {
                Ok(object) => Some(object),
                Err(e) => {
                    ctx.diagnose(reference.offset, Some(kind.name()), e);
                    None
                }
            };
            NodeData::FileDataStoreObjectReference(FileDataStoreObjectReference { reference, guid_reference, object })
        }
        ObjectDeclaration2RefCountFND
        | ObjectDeclaration2LargeRefCountFND
        | ReadOnlyObjectDeclaration2RefCountFND
        | ReadOnlyObjectDeclaration2LargeRefCountFND => {
            let large = matches!(kind, ObjectDeclaration2LargeRefCountFND | ReadOnlyObjectDeclaration2LargeRefCountFND);
            let read_only = matches!(kind, ReadOnlyObjectDeclaration2RefCountFND | ReadOnlyObjectDeclaration2LargeRefCountFND);
            let reference = chunk_ref(r)?;
            let body = read_declaration2_body(r, &revision)?;
            let ref_count = read_ref_count(r, large)?;
            let md5_hash = if read_only { Some(r.read_array::<16>("md5Hash")?) } else { None };
            NodeData::ObjectDeclaration(ObjectDeclaration { reference, body, ref_count, md5_hash })
        }
        ObjectGroupListReferenceFND => NodeData::ObjectGroupListReference(ObjectGroupListReference {
            reference:       chunk_ref(r)?,
            object_group_id: ExtendedGuid::read(r)?,
        }),
        ObjectGroupStartFND => NodeData::ObjectGroupStart { oid: ExtendedGuid::read(r)? },
        HashedChunkDescriptor2FND => NodeData::HashedChunkDescriptor(HashedChunkDescriptor {
            blob_reference: chunk_ref(r)?,
            guid_hash:      r.read_array::<16>("guidHash")?,
        }),
        RevisionManifestEndFND
        | GlobalIdTableStart2FND
        | GlobalIdTableEndFNDX
        | ObjectGroupEndFND
        | ChunkTerminatorFND => NodeData::Empty,
        Unknown(_) => {
            let reference = match header.base_type {
                1 | 2 => Some(chunk_ref(r)?),
                _ => None,
            };
            NodeData::Unknown { reference }
        }
    })
}

fn read_ref_count(r: &mut ByteReader<'_>, large: bool) -> Result<u32> {
    if large {
        r.read_u32("cRef")
    } else {
        Ok(r.read_u8("cRef")? as u32)
    }
}

/// `ObjectDeclarationWithRefCountBody`: oid, then 48 bits of
/// `jci:10 odcs:4 reserved:2 fHasOidReferences:1 fHasOsidReferences:1 reserved:30`.
fn read_legacy_declaration_body(
    r:        &mut ByteReader<'_>,
    revision: &RevisionContext,
) -> Result<ObjectDeclarationBody> {
    let oid = ScopedId::read(r, revision)?;
    let bits = r.read_u32("ObjectDeclarationWithRefCountBody")?;
    r.skip(2, "ObjectDeclarationWithRefCountBody reserved")?;
    Ok(ObjectDeclarationBody {
        oid,
        jcid:                Jcid::from_jci((bits & 0x3FF) as u16),
        odcs:                Some(((bits >> 10) & 0xF) as u8),
        has_oid_references:  (bits >> 16) & 1 == 1,
        has_osid_references: (bits >> 17) & 1 == 1,
    })
}

/// `ObjectDeclaration2Body`: oid, JCID, then one flag byte.
fn read_declaration2_body(
    r:        &mut ByteReader<'_>,
    revision: &RevisionContext,
) -> Result<ObjectDeclarationBody> {
    let oid = ScopedId::read(r, revision)?;
    let jcid = Jcid::read(r)?;
    let flags = r.read_u8("ObjectDeclaration2Body flags")?;
    Ok(ObjectDeclarationBody {
        oid,
        jcid,
        odcs:                None,
        has_oid_references:  flags & 0x1 != 0,
        has_osid_references: flags & 0x2 != 0,
    })
}

fn read_dependency_overrides(
    r:        &mut ByteReader<'_>,
    revision: &RevisionContext,
) -> Result<ObjectInfoDependencyOverrideData> {
    let c8 = r.read_u32("c8BitOverrides")?;
    let c32 = r.read_u32("c32BitOverrides")?;
    let crc = r.read_u32("ObjectInfoDependencyOverrideData crc")?;

    // 5 and 8 bytes per entry respectively.
    let needed = (c8 as u64) * 5 + (c32 as u64) * 8;
    r.ensure(needed, "ObjectInfoDependencyOverrideData overrides")?;

    let mut overrides_8 = Vec::with_capacity(c8 as usize);
    for _ in 0..c8 {
        let oid = ScopedId::read(r, revision)?;
        overrides_8.push(DependencyOverride { oid, ref_count: r.read_u8("cRef")? as u32 });
    }
    let mut overrides_32 = Vec::with_capacity(c32 as usize);
    for _ in 0..c32 {
        let oid = ScopedId::read(r, revision)?;
        overrides_32.push(DependencyOverride { oid, ref_count: r.read_u32("cRef")? });
    }
    Ok(ObjectInfoDependencyOverrideData { overrides_8, overrides_32, crc })
}

/// `StringInStorageBuffer`: u32 character count, then UTF-16LE code units.
/// Decoded lossily; trailing NULs are dropped.
pub fn read_storage_string(r: &mut ByteReader<'_>, context: &'static str) -> Result<String> {
    let cch = r.read_u32(context)? as u64;
    let byte_len = cch * 2;
    r.ensure(byte_len, context)?;
    let bytes = r.read_bytes(byte_len as usize, context)?;
    Ok(decode_utf16_lossy(bytes))
}

pub(crate) fn decode_utf16_lossy(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(LittleEndian::read_u16).collect();
    String::from_utf16_lossy(&units).trim_end_matches('\0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeOptions;
    use crate::error::Error;
    use crate::ids::CompactId;

    fn utf16(s: &str) -> Vec<u8> {
        let mut out = (s.encode_utf16().count() as u32).to_le_bytes().to_vec();
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    fn decode(bytes: &[u8], id: u16, base_type: u8) -> (NodeData, usize) {
        let mut ctx = DecodeContext::new(bytes, DecodeOptions::default());
        let header = FileNodeHeader::from_u32(id as u32 | ((base_type as u32) << 27));
        let mut r = ByteReader::new(bytes);
        let data = read_payload(&mut ctx, &mut r, &header, NodeKind::from_id(id)).unwrap();
        (data, ctx.diagnostics.len())
    }

    #[test]
    fn storage_string_is_lossy_and_trimmed() {
        let mut bytes = utf16("png\0");
        bytes.extend_from_slice(&[0x00, 0xD8, 0x41, 0x00]);
        let mut r = ByteReader::new(&bytes);
        assert_eq!(read_storage_string(&mut r, "s").unwrap(), "png");
        let units = [0x00u8, 0xD8, 0x41, 0x00];
        assert_eq!(decode_utf16_lossy(&units), "\u{FFFD}A");
    }

    #[test]
    fn storage_string_count_is_checked_before_reading() {
        let bytes = 0xFFFF_FFFFu32.to_le_bytes();
        let err = read_storage_string(&mut ByteReader::new(&bytes), "s").unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { .. }));
    }

    #[test]
    fn file_data_declaration() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x0006_0035u32.to_le_bytes());
        bytes.push(1);
        bytes.extend(utf16("<ifndf>{11111111-1111-1111-1111-111111111111}"));
        bytes.extend(utf16(".png"));

        let (data, diags) = decode(&bytes, 0x072, 0);
        assert_eq!(diags, 0);
        match data {
            NodeData::ObjectDeclarationFileData(decl) => {
                assert_eq!(decl.extension, ".png");
                assert_eq!(decl.ref_count, 1);
                assert_eq!(decl.jcid, Jcid(0x0006_0035));
                assert!(decl.oid.id.is_nil());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn legacy_declaration_body_bits() {
        let mut bytes = 0x40u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x10u32.to_le_bytes());
        bytes.extend_from_slice(&CompactId { n: 2, guid_index: 1 }.to_u32().to_le_bytes());
        let bits: u32 = 0x0B | (3 << 10) | (1 << 16);
        bytes.extend_from_slice(&bits.to_le_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes.push(5);

        let (data, _) = decode(&bytes, 0x02D, 1);
        let NodeData::ObjectDeclaration(decl) = data else { panic!("not a declaration") };
        assert_eq!(decl.reference.offset, 0x40);
        assert_eq!(decl.reference.length, 0x10);
        assert_eq!(decl.body.jcid, Jcid::from_jci(0x0B));
        assert_eq!(decl.body.odcs, Some(3));
        assert!(decl.body.has_oid_references);
        assert!(!decl.body.has_osid_references);
        assert_eq!(decl.ref_count, 5);
        assert!(NodeData::ObjectDeclaration(decl).property_set_reference().is_some());
    }

    #[test]
    fn declaration2_needs_property_set_flag() {
        let mut bytes = vec![0u8; 12];
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x0001_0001u32.to_le_bytes()); // binary, not a property set
        bytes.push(0);
        bytes.push(1);
        let (data, _) = decode(&bytes, 0x0A4, 1);
        assert!(data.property_set_reference().is_none());
    }

    #[test]
    fn read_only_declaration_carries_md5() {
        let mut bytes = vec![0u8; 12];
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x0012_0001u32.to_le_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&[0xAB; 16]);
        let (data, _) = decode(&bytes, 0x0C5, 1);
        let NodeData::ObjectDeclaration(decl) = data else { panic!("not a declaration") };
        assert_eq!(decl.ref_count, 7);
        assert_eq!(decl.md5_hash, Some([0xAB; 16]));
    }

    #[test]
    fn inline_dependency_overrides() {
        let mut bytes = vec![0xFF; 8];
        bytes.extend_from_slice(&[0; 4]); // nil reference
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0xDEADu32.to_le_bytes());
        bytes.extend_from_slice(&0x0100u32.to_le_bytes());
        bytes.push(3);
        bytes.extend_from_slice(&0x0200u32.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());

        let (data, _) = decode(&bytes, 0x084, 1);
        let NodeData::ObjectInfoDependencyOverrides(o) = data else { panic!("not overrides") };
        assert_eq!(o.data.crc, 0xDEAD);
        assert_eq!(o.data.overrides_8[0].ref_count, 3);
        assert_eq!(o.data.overrides_32[0].oid.id.guid_index, 2);
        assert_eq!(o.data.overrides_32[0].ref_count, 9);
    }

    #[test]
    fn unknown_kind_with_child_list_keeps_reference() {
        let mut bytes = 0x800u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x40u32.to_le_bytes());
        let (data, _) = decode(&bytes, 0x3AB, 2);
        assert_eq!(data.child_list_reference().map(|r| r.offset), Some(0x800));

        let (data, _) = decode(&bytes, 0x3AB, 0);
        assert!(data.child_list_reference().is_none());
    }

    #[test]
    fn scoped_ids_capture_current_revision() {
        let rid = ExtendedGuid::new(Uuid::from_bytes([3; 16]), 1);
        let mut revision = RevisionContext::default();
        revision.enter(rid, ExtendedGuid::NIL);
        let bytes = [0x05, 0x01, 0, 0, 0x01, 0, 0x02, 0, 0];
        let body = read_declaration2_body(&mut ByteReader::new(&bytes), &revision).unwrap();
        assert_eq!(body.oid.revision, Some(rid));
        assert_eq!(body.oid.id, CompactId { n: 5, guid_index: 1 });
    }
}

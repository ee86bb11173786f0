//! The fixed 1024-byte container header at offset 0.
//!
//! The first 16 bytes (`guidFileType`) are the signature. They are checked
//! before any other field is touched; everything after that follows one
//! fixed little-endian layout.

use serde::Serialize;
use uuid::{uuid, Uuid};

use crate::chunk::ChunkReference;
use crate::error::{Error, Result};
use crate::reader::ByteReader;

pub const HEADER_SIZE: usize = 1024;

/// `guidFileType` of a `.one` section file.
pub const ONE_FILE_TYPE: Uuid = uuid!("7b5c52e4-d88c-4da7-aeb1-5378d02996d3");
/// `guidFileType` of a `.onetoc2` table-of-contents file.
pub const ONETOC2_FILE_TYPE: Uuid = uuid!("43ff2fa1-efd9-4c76-9ee2-10ea5722765f");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    One,
    OneToc2,
}

impl FileType {
    pub fn from_guid(guid: &Uuid) -> Option<Self> {
        match *guid {
            g if g == ONE_FILE_TYPE     => Some(FileType::One),
            g if g == ONETOC2_FILE_TYPE => Some(FileType::OneToc2),
            _                           => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileType::One     => "one",
            FileType::OneToc2 => "onetoc2",
        }
    }
}

/// Check the signature alone. Fails with `InvalidSignature` for anything that
/// is not a revision-store container.
pub fn check_signature(data: &[u8]) -> Result<FileType> {
    let guid = ByteReader::new(data).read_guid("file signature")?;
    FileType::from_guid(&guid).ok_or(Error::InvalidSignature { found: guid })
}

#[derive(Debug, Clone)]
pub struct Header {
    pub guid_file_type:                          Uuid,
    pub guid_file:                               Uuid,
    pub guid_legacy_file_version:                Uuid,
    pub guid_file_format:                        Uuid,
    pub ffv_last_code_that_wrote_to_this_file:   u32,
    pub ffv_oldest_code_that_has_written_to_this_file: u32,
    pub ffv_newest_code_that_has_written_to_this_file: u32,
    pub ffv_oldest_code_that_may_read_this_file: u32,
    pub fcr_legacy_free_chunk_list:              ChunkReference,
    pub fcr_legacy_transaction_log:              ChunkReference,
    pub c_transactions_in_log:                   u32,
    pub cb_legacy_expected_file_length:          u32,
    pub rgb_placeholder:                         u64,
    pub fcr_legacy_file_node_list_root:          ChunkReference,
    pub cb_legacy_free_space_in_free_chunk_list: u32,
    pub f_needs_defrag:                          u8,
    pub f_repaired_file:                         u8,
    pub f_needs_garbage_collect:                 u8,
    pub f_has_no_embedded_file_objects:          u8,
    pub guid_ancestor:                           Uuid,
    pub crc_name:                                u32,
    pub fcr_hashed_chunk_list:                   ChunkReference,
    pub fcr_transaction_log:                     ChunkReference,
    pub fcr_file_node_list_root:                 ChunkReference,
    pub fcr_free_chunk_list:                     ChunkReference,
    pub cb_expected_file_length:                 u64,
    pub cb_free_space_in_free_chunk_list:        u64,
    pub guid_file_version:                       Uuid,
    pub n_file_version_generation:               u64,
    pub guid_deny_read_file_version:             Uuid,
    pub grf_debug_log_flags:                     u32,
    pub fcr_debug_log:                           ChunkReference,
    pub fcr_alloc_verification_free_chunk_list:  ChunkReference,
    pub bn_created:                              u32,
    pub bn_last_wrote_to_this_file:              u32,
    pub bn_oldest_written:                       u32,
    pub bn_newest_written:                       u32,
}

/// One header field as shown to report consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Text(String),
    Number(u64),
}

impl Header {
    pub fn read(data: &[u8]) -> Result<Self> {
        check_signature(data)?;

        let mut r = ByteReader::new(data);
        r.ensure(HEADER_SIZE as u64, "file header")?;

        let header = Self {
            guid_file_type:                          r.read_guid("guidFileType")?,
            guid_file:                               r.read_guid("guidFile")?,
            guid_legacy_file_version:                r.read_guid("guidLegacyFileVersion")?,
            guid_file_format:                        r.read_guid("guidFileFormat")?,
            ffv_last_code_that_wrote_to_this_file:   r.read_u32("ffvLastCodeThatWroteToThisFile")?,
            ffv_oldest_code_that_has_written_to_this_file: r.read_u32("ffvOldestCodeThatHasWrittenToThisFile")?,
            ffv_newest_code_that_has_written_to_this_file: r.read_u32("ffvNewestCodeThatHasWrittenToThisFile")?,
            ffv_oldest_code_that_may_read_this_file: r.read_u32("ffvOldestCodeThatMayReadThisFile")?,
            fcr_legacy_free_chunk_list:              ChunkReference::read_32(&mut r)?,
            fcr_legacy_transaction_log:              ChunkReference::read_32(&mut r)?,
            c_transactions_in_log:                   r.read_u32("cTransactionsInLog")?,
            cb_legacy_expected_file_length:          r.read_u32("cbLegacyExpectedFileLength")?,
            rgb_placeholder:                         r.read_u64("rgbPlaceholder")?,
            fcr_legacy_file_node_list_root:          ChunkReference::read_32(&mut r)?,
            cb_legacy_free_space_in_free_chunk_list: r.read_u32("cbLegacyFreeSpaceInFreeChunkList")?,
            f_needs_defrag:                          r.read_u8("fNeedsDefrag")?,
            f_repaired_file:                         r.read_u8("fRepairedFile")?,
            f_needs_garbage_collect:                 r.read_u8("fNeedsGarbageCollect")?,
            f_has_no_embedded_file_objects:          r.read_u8("fHasNoEmbeddedFileObjects")?,
            guid_ancestor:                           r.read_guid("guidAncestor")?,
            crc_name:                                r.read_u32("crcName")?,
            fcr_hashed_chunk_list:                   ChunkReference::read_64x32(&mut r)?,
            fcr_transaction_log:                     ChunkReference::read_64x32(&mut r)?,
            fcr_file_node_list_root:                 ChunkReference::read_64x32(&mut r)?,
            fcr_free_chunk_list:                     ChunkReference::read_64x32(&mut r)?,
            cb_expected_file_length:                 r.read_u64("cbExpectedFileLength")?,
            cb_free_space_in_free_chunk_list:        r.read_u64("cbFreeSpaceInFreeChunkList")?,
            guid_file_version:                       r.read_guid("guidFileVersion")?,
            n_file_version_generation:               r.read_u64("nFileVersionGeneration")?,
            guid_deny_read_file_version:             r.read_guid("guidDenyReadFileVersion")?,
            grf_debug_log_flags:                     r.read_u32("grfDebugLogFlags")?,
            fcr_debug_log:                           ChunkReference::read_64x32(&mut r)?,
            fcr_alloc_verification_free_chunk_list:  ChunkReference::read_64x32(&mut r)?,
            bn_created:                              r.read_u32("bnCreated")?,
            bn_last_wrote_to_this_file:              r.read_u32("bnLastWroteToThisFile")?,
            bn_oldest_written:                       r.read_u32("bnOldestWritten")?,
            bn_newest_written:                       r.read_u32("bnNewestWritten")?,
        };
        debug_assert_eq!(r.position(), (HEADER_SIZE - 728) as u64);
        Ok(header)
    }

    pub fn file_type(&self) -> FileType {
        // Header::read only succeeds for a known signature.
        FileType::from_guid(&self.guid_file_type).unwrap_or(FileType::One)
    }

    /// Flat field name → value listing, in on-disk order. The reserved tail
    /// is omitted.
    pub fn fields(&self) -> Vec<(&'static str, HeaderValue)> {
        use HeaderValue::{Number as N, Text as T};
        let g = |u: &Uuid| T(u.to_string());
        let c = |r: &ChunkReference| T(r.to_string());
        vec![
            ("guidFileType",                          g(&self.guid_file_type)),
            ("guidFile",                              g(&self.guid_file)),
            ("guidLegacyFileVersion",                 g(&self.guid_legacy_file_version)),
            ("guidFileFormat",                        g(&self.guid_file_format)),
            ("ffvLastCodeThatWroteToThisFile",        N(self.ffv_last_code_that_wrote_to_this_file as u64)),
            ("ffvOldestCodeThatHasWrittenToThisFile", N(self.ffv_oldest_code_that_has_written_to_this_file as u64)),
            ("ffvNewestCodeThatHasWrittenToThisFile", N(self.ffv_newest_code_that_has_written_to_this_file as u64)),
            ("ffvOldestCodeThatMayReadThisFile",      N(self.ffv_oldest_code_that_may_read_this_file as u64)),
            ("fcrLegacyFreeChunkList",                c(&self.fcr_legacy_free_chunk_list)),
            ("fcrLegacyTransactionLog",               c(&self.fcr_legacy_transaction_log)),
            ("cTransactionsInLog",                    N(self.c_transactions_in_log as u64)),
            ("cbLegacyExpectedFileLength",            N(self.cb_legacy_expected_file_length as u64)),
            ("rgbPlaceholder",                        N(self.rgb_placeholder)),
            ("fcrLegacyFileNodeListRoot",             c(&self.fcr_legacy_file_node_list_root)),
            ("cbLegacyFreeSpaceInFreeChunkList",      N(self.cb_legacy_free_space_in_free_chunk_list as u64)),
            ("fNeedsDefrag",                          N(self.f_needs_defrag as u64)),
            ("fRepairedFile",                         N(self.f_repaired_file as u64)),
            ("fNeedsGarbageCollect",                  N(self.f_needs_garbage_collect as u64)),
            ("fHasNoEmbeddedFileObjects",             N(self.f_has_no_embedded_file_objects as u64)),
            ("guidAncestor",                          g(&self.guid_ancestor)),
            ("crcName",                               N(self.crc_name as u64)),
            ("fcrHashedChunkList",                    c(&self.fcr_hashed_chunk_list)),
            ("fcrTransactionLog",                     c(&self.fcr_transaction_log)),
            ("fcrFileNodeListRoot",                   c(&self.fcr_file_node_list_root)),
            ("fcrFreeChunkList",                      c(&self.fcr_free_chunk_list)),
            ("cbExpectedFileLength",                  N(self.cb_expected_file_length)),
            ("cbFreeSpaceInFreeChunkList",            N(self.cb_free_space_in_free_chunk_list)),
            ("guidFileVersion",                       g(&self.guid_file_version)),
            ("nFileVersionGeneration",                N(self.n_file_version_generation)),
            ("guidDenyReadFileVersion",               g(&self.guid_deny_read_file_version)),
            ("grfDebugLogFlags",                      N(self.grf_debug_log_flags as u64)),
            ("fcrDebugLog",                           c(&self.fcr_debug_log)),
            ("fcrAllocVerificationFreeChunkList",     c(&self.fcr_alloc_verification_free_chunk_list)),
            ("bnCreated",                             N(self.bn_created as u64)),
            ("bnLastWroteToThisFile",                 N(self.bn_last_wrote_to_this_file as u64)),
            ("bnOldestWritten",                       N(self.bn_oldest_written as u64)),
            ("bnNewestWritten",                       N(self.bn_newest_written as u64)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_header(file_type: Uuid) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..16].copy_from_slice(&file_type.to_bytes_le());
        data
    }

    #[test]
    fn accepts_both_signatures() {
        assert_eq!(Header::read(&blank_header(ONE_FILE_TYPE)).unwrap().file_type(), FileType::One);
        assert_eq!(Header::read(&blank_header(ONETOC2_FILE_TYPE)).unwrap().file_type(), FileType::OneToc2);
    }

    #[test]
    fn rejects_unknown_signature_before_length_check() {
        // Only 16 bytes: a wrong signature must be reported, not truncation.
        let err = Header::read(&[0x42u8; 16]).unwrap_err();
        assert!(matches!(err, Error::InvalidSignature { .. }));
    }

    #[test]
    fn valid_signature_in_short_file_is_truncated() {
        let data = blank_header(ONE_FILE_TYPE);
        let err = Header::read(&data[..512]).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { .. }));
    }

    #[test]
    fn decodes_root_reference_at_fixed_offset() {
        let mut data = blank_header(ONE_FILE_TYPE);
        data[172..180].copy_from_slice(&0x400u64.to_le_bytes());
        data[180..184].copy_from_slice(&0x80u32.to_le_bytes());
        data[228..236].copy_from_slice(&7u64.to_le_bytes());
        let header = Header::read(&data).unwrap();
        assert_eq!(header.fcr_file_node_list_root.offset, 0x400);
        assert_eq!(header.fcr_file_node_list_root.length, 0x80);
        assert_eq!(header.n_file_version_generation, 7);
    }

    #[test]
    fn fields_are_flat_and_ordered() {
        let header = Header::read(&blank_header(ONE_FILE_TYPE)).unwrap();
        let fields = header.fields();
        assert_eq!(fields[0].0, "guidFileType");
        assert_eq!(fields[0].1, HeaderValue::Text(ONE_FILE_TYPE.to_string()));
        assert_eq!(fields.last().unwrap().0, "bnNewestWritten");
    }
}

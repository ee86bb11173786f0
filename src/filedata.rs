//! Embedded file payloads.
//!
//! The bytes of an embedded file live in a `FileDataStoreObject`:
//!
//! ```text
//! guidHeader (16) │ cbLength u64 │ unused u32 │ reserved u64 │ data … │ pad │ guidFooter (16)
//! ```
//!
//! Both GUIDs are the same constant. The footer sits at the end of the
//! referenced region, not directly after the data.

use serde::Serialize;
use uuid::{uuid, Uuid};

use crate::chunk::ChunkReference;
use crate::error::{Error, Result};
use crate::reader::ByteReader;

pub const FILE_DATA_STORE_GUID: Uuid = uuid!("bde316e7-2665-4511-a4c4-8d4d0b7a9eac");

const STORE_HEADER_SIZE: u64 = 36;
const STORE_FOOTER_SIZE: u64 = 16;

#[derive(Debug, Clone)]
pub struct FileDataStoreObject {
    pub header_guid: Uuid,
    pub length:      u64,
    pub content:     Vec<u8>,
    pub footer_guid: Uuid,
}

impl FileDataStoreObject {
    pub fn read(data: &[u8], reference: &ChunkReference) -> Result<Self> {
        let (start, end) = reference.bounds(data.len() as u64, "file data store object")?;
        let corrupt = |reason: String| Error::CorruptFileData { offset: start, reason };

        let region_len = end - start;
        if region_len < STORE_HEADER_SIZE + STORE_FOOTER_SIZE {
            return Err(corrupt(format!("region of {region_len} bytes cannot hold header and footer")));
        }

        let mut r = ByteReader::new(&data[start as usize..end as usize]);
        let header_guid = r.read_guid("guidHeader")?;
        if header_guid != FILE_DATA_STORE_GUID {
            return Err(corrupt(format!("header guid {header_guid}")));
        }
        let length = r.read_u64("cbLength")?;
        r.skip(4 + 8, "FileDataStoreObject unused/reserved")?;

        let capacity = region_len - STORE_HEADER_SIZE - STORE_FOOTER_SIZE;
        if length > capacity {
            return Err(corrupt(format!("cbLength {length} exceeds the {capacity} bytes available")));
        }
        let content = r.read_bytes(length as usize, "FileData")?.to_vec();

        r.seek(region_len - STORE_FOOTER_SIZE)?;
        let footer_guid = r.read_guid("guidFooter")?;
        if footer_guid != FILE_DATA_STORE_GUID {
            return Err(corrupt(format!("footer guid {footer_guid}")));
        }

        Ok(Self { header_guid, length, content, footer_guid })
    }
}

/// The store object GUID named by a `FileDataReference` string
/// (`<ifndf>{GUID}`).
pub fn parse_file_data_reference(reference: &str) -> Result<Uuid> {
    let invalid = || Error::InvalidFileDataReference { reference: reference.to_string() };
    let braced = reference.strip_prefix("<ifndf>").ok_or_else(invalid)?;
    if !(braced.starts_with('{') && braced.ends_with('}')) {
        return Err(invalid());
    }
    Uuid::parse_str(braced).map_err(|_| invalid())
}

/// One embedded file, merged from its store object and its declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmbeddedFile {
    pub extension: String,
    /// `None` when no intact store object carried this GUID.
    #[serde(skip)]
    pub content:   Option<Vec<u8>>,
    /// Resolved id of the declaring object, when one was found and resolved.
    pub identity:  Option<String>,
}

impl EmbeddedFile {
    pub fn size(&self) -> usize {
        self.content.as_ref().map_or(0, Vec::len)
    }
}

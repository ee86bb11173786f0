use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::reader::ByteReader;

/// Object class identifier: a 16-bit class index plus type flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Jcid(pub u32);

impl Jcid {
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self(reader.read_u32("JCID")?))
    }

    /// JCID implied by the 10-bit `jci` of the legacy object declaration
    /// records, which always describe property-set objects.
    pub fn from_jci(jci: u16) -> Self {
        Self(0x0002_0000 | (jci as u32 & 0x3FF))
    }

    pub fn index(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn is_binary(self) -> bool {
        (self.0 >> 16) & 1 == 1
    }

    pub fn is_property_set(self) -> bool {
        (self.0 >> 17) & 1 == 1
    }

    pub fn is_graph_node(self) -> bool {
        (self.0 >> 18) & 1 == 1
    }

    pub fn is_file_data(self) -> bool {
        (self.0 >> 19) & 1 == 1
    }

    pub fn is_read_only(self) -> bool {
        (self.0 >> 20) & 1 == 1
    }

    pub fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0x0012_0001 => "jcidReadOnlyPersistablePropertyContainerForAuthor",
            0x0002_0001 => "jcidPersistablePropertyContainerForTOCSection",
            0x0006_0007 => "jcidSectionNode",
            0x0006_0008 => "jcidPageSeriesNode",
            0x0006_000B => "jcidPageNode",
            0x0006_000C => "jcidOutlineNode",
            0x0006_000D => "jcidOutlineElementNode",
            0x0006_000E => "jcidRichTextOENode",
            0x0006_0011 => "jcidImageNode",
            0x0006_0012 => "jcidNumberListNode",
            0x0006_0019 => "jcidOutlineGroup",
            0x0006_0022 => "jcidTableNode",
            0x0006_0023 => "jcidTableRowNode",
            0x0006_0024 => "jcidTableCellNode",
            0x0006_002C => "jcidTitleNode",
            0x0002_0030 => "jcidPageMetaData",
            0x0002_0031 => "jcidSectionMetaData",
            0x0006_0035 => "jcidEmbeddedFileNode",
            0x0006_0037 => "jcidPageManifestNode",
            0x0002_0038 => "jcidConflictPageMetaData",
            0x0006_003C => "jcidVersionHistoryContent",
            0x0006_003D => "jcidVersionProxy",
            0x0012_0043 => "jcidNoteTagSharedDefinitionContainer",
            0x0002_0044 => "jcidRevisionMetaData",
            0x0002_0046 => "jcidVersionHistoryMetaData",
            0x0012_004D => "jcidParagraphStyleObjectForText",
            _ => return None,
        })
    }
}

impl fmt::Display for Jcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Unknown({:#010x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits() {
        let page = Jcid(0x0006_000B);
        assert_eq!(page.index(), 0x0B);
        assert!(page.is_property_set());
        assert!(page.is_graph_node());
        assert!(!page.is_binary());
        assert!(!page.is_file_data());

        let author = Jcid(0x0012_0001);
        assert!(author.is_read_only());
        assert!(author.is_property_set());
    }

    #[test]
    fn legacy_jci_is_a_property_set() {
        let j = Jcid::from_jci(0x0B);
        assert!(j.is_property_set());
        assert_eq!(j.index(), 0x0B);
    }

    #[test]
    fn display_names_unknown_classes() {
        assert_eq!(Jcid(0x0006_0035).to_string(), "jcidEmbeddedFileNode");
        assert_eq!(Jcid(0x0009_9999).to_string(), "Unknown(0x00099999)");
    }
}

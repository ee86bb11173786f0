//! File node lists and their fragment chains.
//!
//! ```text
//! ┌──────────────── fragment (ref.offset .. ref.offset + ref.length) ───────────────┐
//! │ uintMagic u64 │ FileNodeListID u32 │ nFragmentSequence u32 │ nodes … │ pad │ next │ footer │
//! └─────────────────────────────────────────────────────────────────────────────────┘
//!                                                          end-20 ──┘ 64x32 ref   u64
//! ```
//!
//! A chain ends at a nil next reference. Hostile chains that loop or never
//! end are cut off by a visited-offset set and a cap derived from the
//! container size.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::chunk::ChunkReference;
use crate::context::DecodeContext;
use crate::error::{Error, Result};
use crate::reader::ByteReader;

use super::{decode_node, FileNode};

pub const FRAGMENT_HEADER_SIZE: u64 = 16;
/// Next-fragment reference (12) plus footer (8).
pub const FRAGMENT_TRAILER_SIZE: u64 = 20;
/// The smallest well-formed fragment: header and trailer, no nodes.
pub const MIN_FRAGMENT_SIZE: u64 = FRAGMENT_HEADER_SIZE + FRAGMENT_TRAILER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FragmentHeader {
    pub magic:             u64,
    pub list_id:           u32,
    pub fragment_sequence: u32,
}

#[derive(Debug)]
pub struct FileNodeListFragment {
    pub offset: u64,
    pub header: FragmentHeader,
    pub nodes:  Vec<FileNode>,
    pub next:   ChunkReference,
    pub footer: u64,
}

#[derive(Debug, Default)]
pub struct FileNodeList {
    pub fragments: Vec<FileNodeListFragment>,
}

impl FileNodeList {
    /// Nodes of this list only, in fragment order.
    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.fragments.iter().flat_map(|f| f.nodes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.nodes.is_empty())
    }

    /// Every node in the tree below this list, depth-first, each node before
    /// its child list.
    pub fn walk<'n>(&'n self, out: &mut Vec<&'n FileNode>) {
        for node in self.nodes() {
            node.walk(out);
        }
    }

    pub fn all_nodes(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }
}

/// Read the node list that starts at `reference`, following its chain.
pub fn read_list(ctx: &mut DecodeContext<'_>, reference: &ChunkReference) -> Result<FileNodeList> {
    ctx.enter_list(reference.offset)?;
    let result = read_chain(ctx, reference);
    ctx.leave_list();
    result
}

fn read_chain(ctx: &mut DecodeContext<'_>, start: &ChunkReference) -> Result<FileNodeList> {
    let max_fragments = (ctx.container_len() / MIN_FRAGMENT_SIZE) as usize + 1;
    let mut visited = HashSet::new();
    let mut list = FileNodeList::default();
    let mut current = *start;

    debug!(offset = start.offset, depth = ctx.list_depth(), "reading file node list");

    loop {
        if list.fragments.len() >= max_fragments || !visited.insert(current.offset) {
            return Err(Error::UnboundedFragmentChain {
                start:     start.offset,
                fragments: list.fragments.len() + 1,
            });
        }

        match read_fragment(ctx, &current) {
            Ok(fragment) => {
                let next = fragment.next;
                list.fragments.push(fragment);
                if next.is_nil() {
                    break;
                }
                current = next;
            }
            Err(e) if e.is_fatal() || list.fragments.is_empty() => return Err(e),
            Err(e) => {
                // Keep what the earlier fragments produced.
                ctx.diagnose(current.offset, None, e);
                break;
            }
        }
    }

    Ok(list)
}

pub fn read_fragment(ctx: &mut DecodeContext<'_>, reference: &ChunkReference) -> Result<FileNodeListFragment> {
    let (start, end) = reference.bounds(ctx.container_len(), "file node list fragment")?;
    if reference.length < MIN_FRAGMENT_SIZE {
        return Err(Error::TruncatedInput {
            context:   "file node list fragment",
            offset:    start,
            needed:    MIN_FRAGMENT_SIZE,
            available: reference.length,
        });
    }

    let data = ctx.data;
    let mut r = ByteReader::at(data, start)?;
    let header = FragmentHeader {
        magic:             r.read_u64("uintMagic")?,
        list_id:           r.read_u32("FileNodeListID")?,
        fragment_sequence: r.read_u32("nFragmentSequence")?,
    };

    let mut nodes = Vec::new();
    while r.position() + 24 < end {
        let node_start = r.position();
        let node = decode_node(ctx, &mut r)?;
        let stop = node.header.is_terminator();
        let size = node.header.size as u64;
        nodes.push(node);
        if stop {
            break;
        }
        let next = if size >= 4 { node_start + size } else { r.position() };
        r.seek(next.min(end))?;
    }

    r.seek(end - FRAGMENT_TRAILER_SIZE)?;
    let next = ChunkReference::read_64x32(&mut r)?;
    let footer = r.read_u64("FileNodeListFragment footer")?;

    Ok(FileNodeListFragment { offset: start, header, nodes, next, footer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::OffsetFormat;
    use crate::config::DecodeOptions;

    /// A fragment of `len` bytes at `offset` holding raw node bytes.
    fn put_fragment(buf: &mut Vec<u8>, offset: usize, len: usize, nodes: &[u8], next: Option<(u64, u32)>) {
        if buf.len() < offset + len {
            buf.resize(offset + len, 0);
        }
        buf[offset..offset + 8].copy_from_slice(&0xA4567AB1F5F7F4C4u64.to_le_bytes());
        buf[offset + 8..offset + 12].copy_from_slice(&0x10u32.to_le_bytes());
        buf[offset + 16..offset + 16 + nodes.len()].copy_from_slice(nodes);
        let (next_off, next_len) = next.unwrap_or((u64::MAX, 0));
        let t = offset + len - 20;
        buf[t..t + 8].copy_from_slice(&next_off.to_le_bytes());
        buf[t + 8..t + 12].copy_from_slice(&next_len.to_le_bytes());
        buf[t + 12..t + 20].copy_from_slice(&0x8BC215C38233BA4Bu64.to_le_bytes());
    }

    /// A size-4 node with no payload bytes.
    fn empty_node(id: u32) -> [u8; 4] {
        (id | (4 << 10)).to_le_bytes()
    }

    fn nodes(ids: &[u32]) -> Vec<u8> {
        ids.iter().flat_map(|&id| empty_node(id)).collect()
    }

    #[test]
    fn two_fragment_chain_concatenates() {
        let mut buf = Vec::new();
        put_fragment(&mut buf, 0, 64, &nodes(&[0x0B8, 0x01C]), Some((64, 64)));
        put_fragment(&mut buf, 64, 64, &nodes(&[0x028]), None);

        let mut ctx = DecodeContext::new(&buf, DecodeOptions::default());
        let list = read_list(&mut ctx, &ChunkReference::new(0, 64, OffsetFormat::Absolute64)).unwrap();
        assert_eq!(list.fragments.len(), 2);
        // Zero padding after the last node reads as an id-0 node, which ends
        // each fragment.
        let ids: Vec<u16> = list.nodes().map(|n| n.header.id).collect();
        assert_eq!(ids, vec![0x0B8, 0x01C, 0, 0x028, 0]);
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn terminator_stops_the_fragment() {
        let mut buf = Vec::new();
        put_fragment(&mut buf, 0, 96, &nodes(&[0x0B8, 0x0FF, 0x0B8, 0x0B8]), None);

        let mut ctx = DecodeContext::new(&buf, DecodeOptions::default());
        let list = read_list(&mut ctx, &ChunkReference::new(0, 96, OffsetFormat::Absolute64)).unwrap();
        let ids: Vec<u16> = list.nodes().map(|n| n.header.id).collect();
        assert_eq!(ids, vec![0x0B8, 0x0FF]);
    }

    #[test]
    fn self_referencing_chain_is_unbounded() {
        let mut buf = Vec::new();
        put_fragment(&mut buf, 0, 64, &nodes(&[0x0B8]), Some((0, 64)));

        let mut ctx = DecodeContext::new(&buf, DecodeOptions::default());
        let err = read_list(&mut ctx, &ChunkReference::new(0, 64, OffsetFormat::Absolute64)).unwrap_err();
        assert!(matches!(err, Error::UnboundedFragmentChain { start: 0, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn broken_second_fragment_keeps_first() {
        let mut buf = Vec::new();
        put_fragment(&mut buf, 0, 64, &nodes(&[0x0B8]), Some((4096, 64)));

        let mut ctx = DecodeContext::new(&buf, DecodeOptions::default());
        let list = read_list(&mut ctx, &ChunkReference::new(0, 64, OffsetFormat::Absolute64)).unwrap();
        assert_eq!(list.fragments.len(), 1);
        assert_eq!(ctx.diagnostics.len(), 1);
        assert!(matches!(ctx.diagnostics[0].error, Error::OutOfBounds { .. }));
    }

    #[test]
    fn first_fragment_errors_propagate() {
        let buf = vec![0u8; 64];
        let mut ctx = DecodeContext::new(&buf, DecodeOptions::default());
        let err = read_list(&mut ctx, &ChunkReference::new(0, 20, OffsetFormat::Absolute64)).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput { needed: 36, .. }));
    }

    #[test]
    fn oversized_node_steps_are_clamped() {
        // Size 0x1FFF would step far past the fragment end.
        let big = (0x0B8u32 | (0x1FFF << 10)).to_le_bytes();
        let mut buf = Vec::new();
        put_fragment(&mut buf, 0, 64, &big, None);

        let mut ctx = DecodeContext::new(&buf, DecodeOptions::default());
        let list = read_list(&mut ctx, &ChunkReference::new(0, 64, OffsetFormat::Absolute64)).unwrap();
        assert_eq!(list.nodes().count(), 1);
        assert!(list.fragments[0].next.is_nil());
    }
}

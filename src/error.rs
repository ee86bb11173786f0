use std::io;
use thiserror::Error;
use uuid::Uuid;

/// Every failure the decoder can report.
///
/// Errors come in two weights. Fatal errors ([`Error::is_fatal`]) abort the
/// whole decode: the input is not a container at all, or it is built to keep
/// the decoder busy forever. Everything else is scoped to the record that
/// produced it; the node decoder catches it at the node boundary, records a
/// [`Diagnostic`](crate::context::Diagnostic) and moves on to the next sibling.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid file signature {found} (not a .one or .onetoc2 container)")]
    InvalidSignature { found: Uuid },

    #[error("truncated input reading {context} at offset {offset:#x}: need {needed} bytes, {available} available")]
    TruncatedInput {
        context:   &'static str,
        offset:    u64,
        needed:    u64,
        available: u64,
    },

    #[error("{context} region {offset:#x}+{length:#x} lies outside the {container_len}-byte container")]
    OutOfBounds {
        context:       &'static str,
        offset:        u64,
        length:        u64,
        container_len: u64,
    },

    #[error("{context} count {count} exceeds the limit of {limit}")]
    ExcessiveCount {
        context: &'static str,
        count:   u64,
        limit:   u64,
    },

    #[error("fragment chain starting at {start:#x} did not terminate after {fragments} fragments")]
    UnboundedFragmentChain { start: u64, fragments: usize },

    #[error("file node list at {offset:#x} is already being decoded by an enclosing node")]
    CyclicNodeList { offset: u64 },

    #[error("{what} nesting exceeds the limit of {limit}")]
    NestingTooDeep { what: &'static str, limit: usize },

    #[error("node budget of {budget} exhausted")]
    NodeBudgetExceeded { budget: usize },

    #[error("compact id (index {index}, n {n}) has no global id table entry for revision {revision}")]
    UnresolvedIdentifier { index: u32, n: u8, revision: String },

    #[error("unsupported property type {prop_type:#04x} on property {prop_id:#010x}")]
    UnsupportedPropertyType { prop_type: u8, prop_id: u32 },

    #[error("invalid property type {prop_type:#04x} on property {prop_id:#010x}")]
    InvalidPropertyType { prop_type: u8, prop_id: u32 },

    #[error("corrupt file data store object at {offset:#x}: {reason}")]
    CorruptFileData { offset: u64, reason: String },

    #[error("malformed file data reference {reference:?}")]
    InvalidFileDataReference { reference: String },

    #[error("unsafe file name component {name:?}")]
    UnsafeFileName { name: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Fatal errors propagate through every node boundary and abort the decode.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidSignature { .. }
                | Error::UnboundedFragmentChain { .. }
                | Error::NodeBudgetExceeded { .. }
                | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

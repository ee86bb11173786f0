//! Decoder for the OneNote revision-store container (`.one` / `.onetoc2`).
//!
//! The container is a tree of file node lists. [`Document::parse`] walks it
//! once, building the global id tables as revisions are entered, and keeps
//! going past damaged records: every non-fatal failure is recorded as a
//! [`Diagnostic`] instead of aborting the decode.

pub mod chunk;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod filedata;
pub mod header;
pub mod ids;
pub mod jcid;
pub mod node;
pub mod property;
pub mod reader;
pub mod report;

pub use chunk::ChunkReference;
pub use config::DecodeOptions;
pub use context::Diagnostic;
pub use document::{Document, Extraction, ObjectProperties};
pub use error::{Error, Result};
pub use filedata::EmbeddedFile;
pub use header::{FileType, Header};
pub use ids::{CompactId, ExtendedGuid, GlobalIdTable};
pub use jcid::Jcid;

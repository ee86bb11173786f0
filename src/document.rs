//! High-level [`Document`] API: the primary embedding surface.
//!
//! ```no_run
//! use onestore::Document;
//!
//! let doc = Document::open("notes.one")?;
//! for (guid, file) in doc.files() {
//!     println!("{guid} {} {} bytes", file.extension, file.size());
//! }
//! for diag in doc.diagnostics() {
//!     eprintln!("{diag}");
//! }
//! # Ok::<(), onestore::Error>(())
//! ```
//!
//! Decoding happens once, in the constructor. The property and file views
//! are computed on first access and cached.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DecodeOptions;
use crate::context::{DecodeContext, Diagnostic};
use crate::error::{Error, Result};
use crate::filedata::{parse_file_data_reference, EmbeddedFile};
use crate::header::Header;
use crate::ids::GlobalIdTable;
use crate::node::{read_list, FileNode, FileNodeList, NodeData};
use crate::property::format_value;

// ── ObjectProperties ──────────────────────────────────────────────────────────

/// The formatted property set of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectProperties {
    /// JCID name, or the node kind for object revisions.
    #[serde(rename = "type")]
    pub jcid:       String,
    pub identity:   String,
    #[serde(rename = "val")]
    pub properties: BTreeMap<String, String>,
}

type FileMap = BTreeMap<String, EmbeddedFile>;

/// Outcome of [`Document::extract_all`].
#[derive(Debug, Default)]
pub struct Extraction {
    pub written: Vec<PathBuf>,
    /// Files that were not written, keyed by GUID.
    pub skipped: Vec<(String, Error)>,
}

// ── Document ──────────────────────────────────────────────────────────────────

pub struct Document {
    header:        Header,
    root:          FileNodeList,
    global_ids:    GlobalIdTable,
    diagnostics:   Vec<Diagnostic>,
    nodes_decoded: usize,
    properties:    OnceLock<(Vec<ObjectProperties>, Vec<Diagnostic>)>,
    files:         OnceLock<(FileMap, Vec<Diagnostic>)>,
}

impl Document {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), len = bytes.len(), "opened container");
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_with(bytes, DecodeOptions::default())
    }

    pub fn parse_with(bytes: &[u8], options: DecodeOptions) -> Result<Self> {
        let header = Header::read(bytes)?;
        let mut ctx = DecodeContext::new(bytes, options);

        let root_ref = header.fcr_file_node_list_root;
        let root = if root_ref.is_nil() {
            FileNodeList::default()
        } else {
            read_list(&mut ctx, &root_ref)?
        };

        let nodes_decoded = ctx.nodes_decoded();
        info!(
            file_type   = header.file_type().extension(),
            nodes       = nodes_decoded,
            diagnostics = ctx.diagnostics.len(),
            "decoded container"
        );

        Ok(Self {
            header,
            root,
            global_ids:    ctx.global_ids,
            diagnostics:   ctx.diagnostics,
            nodes_decoded,
            properties:    OnceLock::new(),
            files:         OnceLock::new(),
        })
    }

    // ── Structure ────────────────────────────────────────────────────────────

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn root(&self) -> &FileNodeList {
        &self.root
    }

    pub fn global_id_table(&self) -> &GlobalIdTable {
        &self.global_ids
    }

    pub fn nodes_decoded(&self) -> usize {
        self.nodes_decoded
    }

    /// Every node, depth-first, each node before its child list.
    pub fn nodes(&self) -> Vec<&FileNode> {
        self.root.all_nodes()
    }

    // ── Views ────────────────────────────────────────────────────────────────

    /// Formatted property sets, one entry per object that carried one.
    /// Objects whose identity cannot be resolved are skipped, as are single
    /// properties whose ids cannot be resolved; both leave a diagnostic.
    pub fn properties(&self) -> &[ObjectProperties] {
        &self.properties.get_or_init(|| self.collect_properties()).0
    }

    /// Embedded files keyed by lower-case GUID.
    pub fn files(&self) -> &BTreeMap<String, EmbeddedFile> {
        &self.files.get_or_init(|| self.collect_files()).0
    }

    /// Decode diagnostics followed by those raised while building the
    /// property and file views.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        let (_, prop_diags) = self.properties.get_or_init(|| self.collect_properties());
        let (_, file_diags) = self.files.get_or_init(|| self.collect_files());
        self.diagnostics.iter().chain(prop_diags).chain(file_diags).collect()
    }

    /// Write each embedded file with content into `dest` as
    /// `file_{n}{.extension}{suffix}`, numbered in GUID order.
    ///
    /// Extensions come from the container and are only used when they are a
    /// plain name component. A file with an unusable extension, or whose
    /// write fails, is reported in [`Extraction::skipped`] and the remaining
    /// files are still written.
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P, suffix: &str) -> Result<Extraction> {
        let dest = dest.as_ref();
        let suffix = dotted(safe_component(suffix)?);
        if !dest.exists() {
            fs::create_dir_all(dest)?;
        }

        let mut out = Extraction::default();
        for (n, (guid, file)) in self.files().iter().enumerate() {
            let Some(content) = &file.content else { continue };
            let written = safe_component(&file.extension).and_then(|ext| {
                let path = dest.join(format!("file_{n}{}{suffix}", dotted(ext)));
                fs::write(&path, content)?;
                Ok(path)
            });
            match written {
                Ok(path) => out.written.push(path),
                Err(error) => {
                    warn!(%guid, %error, "embedded file not extracted");
                    out.skipped.push((guid.clone(), error));
                }
            }
        }
        info!(
            dest    = %dest.display(),
            written = out.written.len(),
            skipped = out.skipped.len(),
            "extracted embedded files"
        );
        Ok(out)
    }

    // ── Traversal ────────────────────────────────────────────────────────────

    fn collect_properties(&self) -> (Vec<ObjectProperties>, Vec<Diagnostic>) {
        let mut out = Vec::new();
        let mut diags = Vec::new();

        for node in self.nodes() {
            let Some(set) = &node.property_set else { continue };
            let Some(oid) = node.data.object_id() else { continue };

            let identity = match self.global_ids.resolve_scoped(oid) {
                Ok(id) => id.to_string(),
                Err(error) => {
                    record(&mut diags, node, error);
                    continue;
                }
            };

            let mut properties = BTreeMap::new();
            for prop in &set.body.properties {
                let name = prop.id.name();
                match format_value(&name, &prop.value, &self.global_ids) {
                    Ok(value) => {
                        properties.insert(name, value);
                    }
                    Err(error) => {
                        record(&mut diags, node, error)
                    }
                }
            }

            let jcid = match node.data.jcid() {
                Some(jcid) => jcid.to_string(),
                None => node.kind.name().to_string(),
            };
            out.push(ObjectProperties { jcid, identity, properties });
        }

        (out, diags)
    }

    fn collect_files(&self) -> (FileMap, Vec<Diagnostic>) {
        let mut files = FileMap::new();
        let mut diags = Vec::new();

        for node in self.nodes() {
            match &node.data {
                NodeData::FileDataStoreObjectReference(store) => {
                    let entry = files.entry(store.guid_reference.to_string()).or_default();
                    if let Some(object) = &store.object {
                        entry.content = Some(object.content.clone());
                    }
                }
                NodeData::ObjectDeclarationFileData(decl) => {
                    let guid = match parse_file_data_reference(&decl.file_data_reference) {
                        Ok(guid) => guid.to_string(),
                        Err(error) => {
                            record(&mut diags, node, error);
                            continue;
                        }
                    };
                    let entry = files.entry(guid).or_default();
                    entry.extension = decl.extension.clone();
                    entry.identity = match self.global_ids.resolve_scoped(&decl.oid) {
                        Ok(id) => Some(id.to_string()),
                        Err(error) => {
                            record(&mut diags, node, error);
                            None
                        }
                    };
                }
                _ => {}
            }
        }

        (files, diags)
    }
}

fn record(diags: &mut Vec<Diagnostic>, node: &FileNode, error: Error) {
    warn!(offset = node.offset, node = node.kind.name(), %error, "view diagnostic");
    diags.push(Diagnostic { offset: node.offset, node: Some(node.kind.name()), error });
}

/// `name` unchanged when it can only ever name a file inside the output
/// directory.
fn safe_component(name: &str) -> Result<&str> {
    let unsafe_char = |c: char| c == '/' || c == '\\' || c == ':' || c.is_control();
    if name.contains("..") || name.chars().any(unsafe_char) {
        return Err(Error::UnsafeFileName { name: name.to_string() });
    }
    Ok(name)
}

/// `ext` with a leading dot, or empty.
fn dotted(ext: &str) -> String {
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

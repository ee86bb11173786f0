//! Text and JSON reports over a decoded [`Document`].

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::document::Document;
use crate::header::HeaderValue;

/// Bytes of each embedded file shown in the text report.
pub const PREVIEW_BYTES: usize = 256;

const RULE: &str = "####################################################################";

#[derive(Serialize)]
struct JsonFile<'a> {
    extension: &'a str,
    /// Hex-encoded content; empty when no store object was found.
    content:   String,
    identity:  Option<&'a str>,
}

/// One JSON document with headers, properties, files (hex content) and
/// diagnostics.
pub fn to_json(doc: &Document) -> Value {
    let headers: Map<String, Value> = doc
        .header()
        .fields()
        .into_iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();

    let files: Map<String, Value> = doc
        .files()
        .iter()
        .map(|(guid, file)| {
            let entry = JsonFile {
                extension: &file.extension,
                content:   file.content.as_deref().map(hex::encode).unwrap_or_default(),
                identity:  file.identity.as_deref(),
            };
            (guid.clone(), json!(entry))
        })
        .collect();

    json!({
        "headers":     headers,
        "properties":  doc.properties(),
        "files":       files,
        "diagnostics": doc.diagnostics(),
    })
}

pub fn render_headers(doc: &Document) -> String {
    let mut out = format!("Headers\n{RULE}\n");
    for (name, value) in doc.header().fields() {
        let value = match value {
            HeaderValue::Text(t) => t,
            HeaderValue::Number(n) => n.to_string(),
        };
        let _ = writeln!(out, "\t{name}: {value}");
    }
    out
}

pub fn render_properties(doc: &Document) -> String {
    let mut out = format!("Properties\n{RULE}\n");
    for object in doc.properties() {
        let _ = writeln!(out, "\t{} ({}):", object.jcid, object.identity);
        for (name, value) in &object.properties {
            let _ = writeln!(out, "\t\t{name}: {value}");
        }
        out.push('\n');
    }
    out
}

pub fn render_files(doc: &Document) -> String {
    let mut out = format!("Embedded Files\n{RULE}\n");
    for (guid, file) in doc.files() {
        let _ = writeln!(out, "\t{guid}:");
        let _ = writeln!(out, "\t\tExtension: {}", file.extension);
        let _ = writeln!(out, "\t\tSize: {}", file.size());
        if let Some(identity) = &file.identity {
            let _ = writeln!(out, "\t\tIdentity: {identity}");
        }
        match &file.content {
            Some(content) => {
                let preview = &content[..content.len().min(PREVIEW_BYTES)];
                out.push_str(&hex_dump(preview, 16, "\t\t"));
            }
            None => out.push_str("\t\t(no content)\n"),
        }
    }
    out
}

pub fn render_diagnostics(doc: &Document) -> String {
    let diagnostics = doc.diagnostics();
    if diagnostics.is_empty() {
        return String::new();
    }
    let mut out = format!("Diagnostics\n{RULE}\n");
    for diag in diagnostics {
        let _ = writeln!(out, "\t{diag}");
    }
    out
}

/// Space-separated hex bytes, `columns` per line, each line indented.
pub fn hex_dump(bytes: &[u8], columns: usize, indent: &str) -> String {
    let mut out = String::new();
    for line in bytes.chunks(columns.max(1)) {
        let cells: Vec<String> = line.iter().map(|b| format!("{b:02x}")).collect();
        let _ = writeln!(out, "{indent}{}", cells.join(" "));
    }
    out
}

//! State threaded through one decode.
//!
//! Identifier resolution depends on which revision manifest was most
//! recently entered, and the global id table accumulates across the whole
//! traversal. Both live here, next to the diagnostics sink and the resource
//! guards, and the context is passed `&mut` to every decode call that needs
//! it. Nothing is global, so independent documents decode independently.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::config::DecodeOptions;
use crate::error::{Error, Result};
use crate::ids::{GlobalIdTable, RevisionContext};

/// A non-fatal failure, recorded where it happened.
#[derive(Debug)]
pub struct Diagnostic {
    pub offset: u64,
    /// Node kind name, when the failure belongs to a file node.
    pub node:   Option<&'static str>,
    pub error:  Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{:#x} [{}]: {}", self.offset, node, self.error),
            None => write!(f, "{:#x}: {}", self.offset, self.error),
        }
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Diagnostic", 3)?;
        s.serialize_field("offset", &self.offset)?;
        s.serialize_field("node", &self.node)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.end()
    }
}

pub struct DecodeContext<'a> {
    pub data:        &'a [u8],
    pub options:     DecodeOptions,
    pub global_ids:  GlobalIdTable,
    pub revision:    RevisionContext,
    pub diagnostics: Vec<Diagnostic>,
    active_lists:    Vec<u64>,
    nodes_decoded:   usize,
    node_budget:     usize,
}

impl<'a> DecodeContext<'a> {
    pub fn new(data: &'a [u8], options: DecodeOptions) -> Self {
        let node_budget = options.node_budget_for(data.len());
        Self {
            data,
            options,
            global_ids:    GlobalIdTable::new(),
            revision:      RevisionContext::default(),
            diagnostics:   Vec::new(),
            active_lists:  Vec::new(),
            nodes_decoded: 0,
            node_budget,
        }
    }

    #[inline]
    pub fn container_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Record a non-fatal error and keep going.
    pub fn diagnose(&mut self, offset: u64, node: Option<&'static str>, error: Error) {
        warn!(offset, node = node.unwrap_or("-"), %error, "decode diagnostic");
        self.diagnostics.push(Diagnostic { offset, node, error });
    }

    /// Count one more node against the budget.
    pub fn charge_node(&mut self) -> Result<()> {
        self.nodes_decoded += 1;
        if self.nodes_decoded > self.node_budget {
            return Err(Error::NodeBudgetExceeded { budget: self.node_budget });
        }
        Ok(())
    }

    pub fn nodes_decoded(&self) -> usize {
        self.nodes_decoded
    }

    /// Push a list onto the active path. Fails when the list is already
    /// being decoded by an ancestor or the path is too deep.
    pub fn enter_list(&mut self, offset: u64) -> Result<()> {
        if self.active_lists.contains(&offset) {
            return Err(Error::CyclicNodeList { offset });
        }
        if self.active_lists.len() >= self.options.max_list_depth {
            return Err(Error::NestingTooDeep {
                what:  "file node list",
                limit: self.options.max_list_depth,
            });
        }
        self.active_lists.push(offset);
        Ok(())
    }

    pub fn leave_list(&mut self) {
        self.active_lists.pop();
    }

    pub fn list_depth(&self) -> usize {
        self.active_lists.len()
    }
}

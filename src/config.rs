//! Decoder limits.
//!
//! Every recursive or repeated structure in the container is attacker
//! controlled. These limits bound the work a single document can cause.

/// Default cap on nested property sets (type 0x11).
pub const DEFAULT_MAX_PROPERTY_DEPTH: usize = 256;
/// Default cap on nested child file node lists.
pub const DEFAULT_MAX_LIST_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub max_property_depth: usize,
    pub max_list_depth:     usize,
    /// Total file nodes one document may decode. `None` derives the budget
    /// from the container size.
    pub node_budget:        Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_property_depth: DEFAULT_MAX_PROPERTY_DEPTH,
            max_list_depth:     DEFAULT_MAX_LIST_DEPTH,
            node_budget:        None,
        }
    }
}

impl DecodeOptions {
    /// The node budget in effect for a container of `container_len` bytes.
    /// Every node occupies at least four bytes, so a derived budget of one
    /// node per four bytes can only be exceeded by re-reading regions.
    pub fn node_budget_for(&self, container_len: usize) -> usize {
        self.node_budget.unwrap_or(container_len / 4 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_budget_scales_with_input() {
        let opts = DecodeOptions::default();
        assert_eq!(opts.node_budget_for(0), 1);
        assert_eq!(opts.node_budget_for(4096), 1025);

        let fixed = DecodeOptions { node_budget: Some(10), ..Default::default() };
        assert_eq!(fixed.node_budget_for(4096), 10);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod ltm_tools;
mod registry;
mod tool;

pub use ltm_tools::{
    FinishConsolidationTool, LtmArchiveTool, LtmCreateTool, LtmEditTool, LtmGlobTool, LtmReadTool,
    LtmRenameTool, LtmReparentTool, LtmSearchTool, LtmUpdateTool,
};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolOutput};

use std::sync::Arc;

use memoria_ltm::LtmTree;

/// Builds the registry the consolidation sub-agent is handed (§4.8, §9):
/// every `ltm_*` tool bound to the same tree, plus `finish_consolidation`.
/// Returns the registry alongside the finish tool so callers can poll
/// `take_outcome()` once the sub-agent's run completes.
pub fn consolidation_registry(tree: Arc<LtmTree>) -> (ToolRegistry, Arc<FinishConsolidationTool>) {
    let finish = FinishConsolidationTool::new();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(LtmReadTool(tree.clone())));
    registry.register(Arc::new(LtmGlobTool(tree.clone())));
    registry.register(Arc::new(LtmSearchTool(tree.clone())));
    registry.register(Arc::new(LtmCreateTool(tree.clone())));
    registry.register(Arc::new(LtmUpdateTool(tree.clone())));
    registry.register(Arc::new(LtmEditTool(tree.clone())));
    registry.register(Arc::new(LtmRenameTool(tree.clone())));
    registry.register(Arc::new(LtmReparentTool(tree.clone())));
    registry.register(Arc::new(LtmArchiveTool(tree)));
    registry.register(finish.clone());
    (registry, finish)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_store::Store;
    use serde_json::json;

    #[tokio::test]
    async fn consolidation_registry_wires_all_ten_tools() {
        let tree = Arc::new(LtmTree::open(Store::open_in_memory().unwrap()).unwrap());
        let (registry, finish) = consolidation_registry(tree);
        assert_eq!(registry.names().len(), 10);

        let out = registry.execute("finish_consolidation", json!({"summary": "done"})).await;
        assert!(!out.is_error);
        assert_eq!(finish.take_outcome().unwrap()["summary"], "done");
    }
}

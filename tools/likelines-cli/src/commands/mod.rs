pub mod compact;
pub mod heatmap;
pub mod palette;
pub mod replay;
pub mod timeline;

use std::path::Path;

use likelines_interaction_model::event::{parse_interactions, InteractionEvent};

/// Read a JSONL interaction log (header comment lines allowed).
pub(crate) fn load_interactions(path: &Path) -> anyhow::Result<Vec<InteractionEvent>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    parse_interactions(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse interactions in {}: {e}", path.display()))
}

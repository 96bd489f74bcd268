//! Compact an interaction log.

use std::path::PathBuf;

use likelines_interaction_model::event::serialize_interactions;
use likelines_telemetry::buffer::{compact, kind_counts};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let events = super::load_interactions(&path)?;
    let compacted = compact(&events);

    print!("{}", serialize_interactions(&compacted)?);

    eprintln!("{} -> {} interactions", events.len(), compacted.len());
    for ((kind, before), (_, after)) in kind_counts(&events).iter().zip(kind_counts(&compacted)) {
        if *before > 0 {
            eprintln!("  {:<8} {before:6} -> {after}", kind.as_str());
        }
    }
    Ok(())
}

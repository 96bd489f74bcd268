//! Rebuild a session's timeline from its interaction log.

use std::path::PathBuf;

use likelines_interaction_model::timeline::SessionTimeline;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let events = super::load_interactions(&path)?;
    let timeline = SessionTimeline::reconstruct(&events);

    println!("Session: {} interactions", events.len());
    println!("  Played: {:.2}s", timeline.played_secs());
    println!();

    println!("Intervals:");
    if timeline.intervals.is_empty() {
        println!("  (none)");
    }
    for interval in &timeline.intervals {
        println!(
            "  {:8.2} -> {:8.2}  ({:.2}s)",
            interval.start,
            interval.end,
            interval.length()
        );
    }

    println!("Likes: {}", format_points(&timeline.likes));
    println!("Seeks: {}", format_points(&timeline.seeks));
    Ok(())
}

fn format_points(points: &[f64]) -> String {
    if points.is_empty() {
        return "(none)".to_string();
    }
    points
        .iter()
        .map(|p| format!("{p:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
}

//! Replay a recorded interaction log through the player.
//!
//! The log is fed to a player backed by a session store directory, with
//! a manual clock set to each recorded timestamp so throttling behaves
//! as it did live. The resulting heatmap is read back from the store.

use std::path::PathBuf;
use std::sync::Arc;

use likelines_common::clock::ManualClock;
use likelines_common::config::PlayerConfig;
use likelines_heatmap_core::palette::to_hex;
use likelines_interaction_model::event::InteractionKind;
use likelines_telemetry::backend::directory::DirectoryBackend;
use likelines_telemetry::backend::InteractionBackend;
use likelines_telemetry::{Player, ViewerId};

pub struct ReplayArgs {
    pub path: PathBuf,
    pub video: String,
    pub duration: f64,
    pub store: PathBuf,
    pub viewer: Option<String>,
}

pub async fn run(config: &PlayerConfig, args: ReplayArgs) -> anyhow::Result<()> {
    let ReplayArgs {
        path,
        video,
        duration,
        store,
        viewer,
    } = args;
    let viewer = viewer.map(ViewerId::new).unwrap_or_else(ViewerId::generate);

    let mut events = super::load_interactions(&path)?;
    events.sort_by(|a, b| a.replay_cmp(b));

    let start = events.first().map(|e| e.timestamp).unwrap_or(0.0);
    let clock = ManualClock::new(start);
    let backend: Arc<dyn InteractionBackend> = Arc::new(DirectoryBackend::new(&store));

    let mut player = Player::with_backend(
        config.clone(),
        Some(backend),
        Arc::new(clock.clone()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create player: {e}"))?
    .with_viewer(viewer);

    let video_id = player.load_video(&video, duration).await.video_id.clone();
    if !player.wait_for_session().await {
        anyhow::bail!("Could not open a session for {video_id}");
    }

    let mut dispatched = 0usize;
    for event in &events {
        clock.set(event.timestamp);
        let outcome = match event.kind {
            InteractionKind::Tick => player.on_tick(event.current_time).await,
            InteractionKind::Like => player.on_like(event.current_time).await,
            kind => player.on_playback_event(kind, event.current_time).await,
        };
        if outcome.is_dispatched() {
            dispatched += 1;
        }
    }

    let token = player
        .session()
        .and_then(|s| s.token())
        .map(|t| t.to_string())
        .unwrap_or_default();
    // Closing flushes what is left; the video stays loaded for the refresh.
    player.close().await;
    if !player.refresh_heatmap().await {
        anyhow::bail!("Failed to load the aggregate for {video_id}");
    }

    println!("Replayed {} interactions", events.len());
    println!("  Video:   {video_id}");
    println!("  Viewer:  {}", player.viewer());
    println!("  Session: {token}");
    println!("  Sends:   {dispatched}");
    println!("  Store:   {}", store.display());
    println!(
        "  Likes:   {}",
        player
            .markers()
            .iter()
            .map(|t| format!("{t:.2}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let heatmap = player.heatmap();
    match heatmap.peak_bin() {
        Some(bin) => println!(
            "  Peak:    bin {bin} at {:.2}s ({})",
            heatmap.bin_start(bin, duration),
            to_hex(player.palette().color_at(heatmap.values()[bin]))
        ),
        None => println!("  Peak:    (flat)"),
    }
    Ok(())
}

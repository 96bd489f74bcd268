//! On-disk interaction store.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   <sanitised video id>/
//!     <token>.jsonl   # header comment line, then one interaction per line
//!     mca.json        # content-analysis tracks by name
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use likelines_common::error::{LikelinesError, LikelinesResult};
use likelines_interaction_model::aggregate::{AggregateBuilder, AggregateResult, McaTrack};
use likelines_interaction_model::event::{
    parse_interactions, serialize_interactions, InteractionEvent,
};

use super::{
    foreign_session, likes_in, validate_interactions, InteractionBackend, SessionToken, ViewerId,
};

const MCA_FILE: &str = "mca.json";
const SESSION_EXT: &str = "jsonl";

/// First line of every session file, written as `# {json}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub video_id: String,
    pub created_at: String,
    /// Owner of the session. Files without one belong to nobody.
    #[serde(default)]
    pub viewer: ViewerId,
}

impl SessionHeader {
    fn new(viewer: &ViewerId, video_id: &str, timestamp: f64) -> Self {
        let secs = timestamp.floor();
        let nanos = ((timestamp - secs) * 1_000_000_000.0) as u32;
        let created_at = chrono::DateTime::<chrono::Utc>::from_timestamp(secs as i64, nanos)
            .unwrap_or_else(chrono::Utc::now)
            .to_rfc3339();
        Self {
            video_id: video_id.to_string(),
            created_at,
            viewer: viewer.clone(),
        }
    }

    /// Parse a `# {json}` header line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let json = line.trim().strip_prefix('#')?;
        serde_json::from_str(json.trim()).ok()
    }
}

/// One session file read back from disk.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub header: SessionHeader,
    pub interactions: Vec<InteractionEvent>,
}

/// Where a session lives and who owns it.
#[derive(Debug, Clone)]
struct SessionFile {
    path: PathBuf,
    viewer: ViewerId,
}

/// Map a video id to a safe directory name.
pub fn sanitize_video_id(video_id: &str) -> String {
    video_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Stores each session as an append-only JSONL file.
#[derive(Debug)]
pub struct DirectoryBackend {
    root: PathBuf,
    session_files: Mutex<HashMap<SessionToken, SessionFile>>,
}

impl DirectoryBackend {
    /// The root directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            session_files: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn video_dir(&self, video_id: &str) -> PathBuf {
        self.root.join(sanitize_video_id(video_id))
    }

    /// Locate the file of a session created by this or an earlier process.
    async fn session_file(&self, token: &SessionToken) -> LikelinesResult<SessionFile> {
        let mut files = self.session_files.lock().await;
        if let Some(file) = files.get(token) {
            return Ok(file.clone());
        }

        let file_name = format!("{token}.{SESSION_EXT}");
        if self.root.is_dir() {
            for entry in std::fs::read_dir(&self.root)? {
                let candidate = entry?.path().join(&file_name);
                if !candidate.is_file() {
                    continue;
                }
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading session file {}", candidate.display()))?;
                let header = content
                    .lines()
                    .next()
                    .and_then(SessionHeader::parse_line)
                    .ok_or_else(|| {
                        LikelinesError::backend(format!(
                            "session file {} has no header",
                            candidate.display()
                        ))
                    })?;
                let file = SessionFile {
                    path: candidate,
                    viewer: header.viewer,
                };
                files.insert(token.clone(), file.clone());
                return Ok(file);
            }
        }
        Err(LikelinesError::backend(format!("unknown session token {token}")))
    }

    /// Attach a content-analysis track to a video, replacing one with the same name.
    pub fn post_mca(&self, video_id: &str, name: &str, track: McaTrack) -> LikelinesResult<()> {
        let dir = self.video_dir(video_id);
        std::fs::create_dir_all(&dir)?;
        let mut tracks = read_mca(&dir)?;
        tracks.insert(name.to_string(), track);
        write_mca(&dir, &tracks)
    }

    /// Remove a content-analysis track. Returns whether it existed.
    pub fn delete_mca(&self, video_id: &str, name: &str) -> LikelinesResult<bool> {
        let dir = self.video_dir(video_id);
        let mut tracks = read_mca(&dir)?;
        let existed = tracks.remove(name).is_some();
        if existed {
            write_mca(&dir, &tracks)?;
        }
        Ok(existed)
    }

    /// Every stored session of `video_id`, oldest first.
    pub fn load_sessions(&self, video_id: &str) -> LikelinesResult<Vec<StoredSession>> {
        let dir = self.video_dir(video_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut sessions: Vec<(PathBuf, StoredSession)> = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXT) {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading session file {}", path.display()))?;
            let Some(header) = content.lines().next().and_then(SessionHeader::parse_line) else {
                tracing::warn!(path = %path.display(), "Session file without header, skipping");
                continue;
            };
            if header.video_id != video_id {
                continue;
            }
            let interactions = parse_interactions(&content).map_err(|e| {
                LikelinesError::invalid_event(format!(
                    "corrupt session file {}: {e}",
                    path.display()
                ))
            })?;
            sessions.push((
                path,
                StoredSession {
                    header,
                    interactions,
                },
            ));
        }

        sessions.sort_by(|a, b| {
            a.1.header
                .created_at
                .cmp(&b.1.header.created_at)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(sessions.into_iter().map(|(_, session)| session).collect())
    }
}

fn read_mca(dir: &Path) -> LikelinesResult<BTreeMap<String, McaTrack>> {
    let path = dir.join(MCA_FILE);
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_mca(dir: &Path, tracks: &BTreeMap<String, McaTrack>) -> LikelinesResult<()> {
    let json = serde_json::to_string_pretty(tracks)?;
    std::fs::write(dir.join(MCA_FILE), json)?;
    Ok(())
}

#[async_trait::async_trait]
impl InteractionBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn create_session(
        &self,
        viewer: &ViewerId,
        video_id: &str,
        timestamp: f64,
    ) -> LikelinesResult<SessionToken> {
        let dir = self.video_dir(video_id);
        std::fs::create_dir_all(&dir)?;

        let token = SessionToken::generate();
        let path = dir.join(format!("{token}.{SESSION_EXT}"));
        let header = serde_json::to_string(&SessionHeader::new(viewer, video_id, timestamp))?;
        std::fs::write(&path, format!("# {header}\n"))
            .with_context(|| format!("creating session file {}", path.display()))?;

        self.session_files.lock().await.insert(
            token.clone(),
            SessionFile {
                path,
                viewer: viewer.clone(),
            },
        );
        tracing::debug!(video_id, token = %token, "Session file created");
        Ok(token)
    }

    async fn send_interactions(
        &self,
        viewer: &ViewerId,
        token: &SessionToken,
        interactions: &[InteractionEvent],
    ) -> LikelinesResult<()> {
        validate_interactions(interactions)?;
        let SessionFile { path, viewer: owner } = self.session_file(token).await?;
        if &owner != viewer {
            return Err(foreign_session(token));
        }
        let lines = serialize_interactions(interactions)?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("opening session file {}", path.display()))?;
        file.write_all(lines.as_bytes())
            .map_err(|e| LikelinesError::backend(format!("Failed to append interactions: {e}")))?;
        file.flush()?;
        Ok(())
    }

    async fn aggregate(
        &self,
        viewer: &ViewerId,
        video_id: &str,
    ) -> LikelinesResult<AggregateResult> {
        let sessions = self.load_sessions(video_id)?;
        let mut builder = AggregateBuilder::new();
        for session in &sessions {
            builder.add_session(&session.interactions);
        }
        let my_likes = likes_in(
            sessions
                .iter()
                .filter(|s| &s.header.viewer == viewer)
                .map(|s| s.interactions.as_slice()),
        );
        let mca = read_mca(&self.video_dir(video_id))?;
        Ok(builder.finish(my_likes, mca))
    }
}

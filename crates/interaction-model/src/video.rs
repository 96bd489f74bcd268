//! Video sources and canonical identifiers.

use serde::{Deserialize, Serialize};

/// Where a video is played from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VideoSource {
    /// A YouTube video id.
    #[serde(rename = "youtube")]
    YouTube(String),
    /// Any other URL, played by a native video element.
    Html5(String),
}

impl VideoSource {
    /// Classify a video URL.
    ///
    /// `youtu.be/<id>` and `youtube.com/...?v=<id>` (optionally `www.`,
    /// with or without scheme) are YouTube; everything else is HTML5.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim();
        let rest = strip_scheme(trimmed);

        let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let host = rest[..host_end].to_ascii_lowercase();
        let host = host.split(':').next().unwrap_or_default();
        let after_host = &rest[host_end..];

        let (path, query) = split_path_query(after_host);

        let id = match host {
            "youtu.be" | "www.youtu.be" => {
                let id = path.trim_start_matches('/');
                let id = id.split('/').next().unwrap_or_default();
                (!id.is_empty()).then(|| id.to_string())
            }
            "youtube.com" | "www.youtube.com" | "m.youtube.com" => query_param(query, "v"),
            _ => None,
        };

        match id {
            Some(id) => VideoSource::YouTube(id),
            None => VideoSource::Html5(trimmed.to_string()),
        }
    }

    /// Identifier used for sessions and aggregates on the backend.
    pub fn canonical_id(&self) -> String {
        match self {
            VideoSource::YouTube(id) => format!("YouTube:{id}"),
            VideoSource::Html5(url) => url.clone(),
        }
    }

    /// Player family name.
    pub fn player_name(&self) -> &'static str {
        match self {
            VideoSource::YouTube(_) => "YouTube",
            VideoSource::Html5(_) => "HTML5",
        }
    }
}

fn strip_scheme(url: &str) -> &str {
    if let Some(idx) = url.find("://") {
        let scheme = &url[..idx];
        if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
            return &url[idx + 3..];
        }
    }
    url.strip_prefix("//").unwrap_or(url)
}

fn split_path_query(after_host: &str) -> (&str, &str) {
    let without_fragment = after_host.split('#').next().unwrap_or_default();
    match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == key).then(|| percent_decode(v))
        })
        .find(|v| !v.is_empty())
}

/// Decode `+` and `%XX` escapes; malformed escapes are kept verbatim.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

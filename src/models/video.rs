use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::LazyLock};

static VIDEO_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"videos/(\d+)").expect("video path pattern is valid"));

/// Identifier of a recorded video. Immutable for the lifetime of a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extracts the id from a page path or URL containing `videos/<digits>`.
    /// A bare numeric id is accepted as well.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Some(Self::new(trimmed));
        }

        VIDEO_PATH
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| Self::new(m.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

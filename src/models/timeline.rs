use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use super::VideoId;

/// Result of a completed fetch: every comment offset of a video, ascending.
///
/// Created once per successful fetch and never mutated afterwards; a newer
/// fetch replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub video_id: VideoId,
    /// Video length in seconds
    pub duration: f64,
    pub fetched_at: DateTime<Utc>,
    pub timestamps: Vec<f64>,
}

impl Timeline {
    pub fn new(video_id: VideoId, duration: f64, timestamps: Vec<f64>) -> Self {
        Self {
            video_id,
            duration,
            fetched_at: Utc::now(),
            timestamps,
        }
    }

    pub fn comment_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write timeline to {}", path.display()))
    }
}

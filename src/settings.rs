use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

pub const DEFAULT_GQL_URL: &str = "https://gql.twitch.tv/gql";
pub const DEFAULT_CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";
pub const DEFAULT_SETTINGS_FILE: &str = "vodpulse.json";

const CLIENT_ID_ENV: &str = "VODPULSE_CLIENT_ID";
const AUTH_TOKEN_ENV: &str = "VODPULSE_AUTH_TOKEN";

/// Tunables for the segmented comment crawl.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerSettings {
    /// Number of disjoint segments crawled at once
    pub concurrency: usize,
    pub page_limit: usize,
    /// Delay before re-requesting a page after a failed call
    pub retry_delay_ms: u64,
    pub progress_interval_ms: u64,
    /// Cursor step over a silent stretch
    pub empty_step_secs: f64,
    /// Cursor step once more than `escalate_after_empty` pages in a row came back empty
    pub escalated_step_secs: f64,
    pub escalate_after_empty: u32,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            concurrency: 6,
            page_limit: 100,
            retry_delay_ms: 1000,
            progress_interval_ms: 500,
            empty_step_secs: 10.0,
            escalated_step_secs: 60.0,
            escalate_after_empty: 5,
        }
    }
}

impl CrawlerSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Never zero; a timer cannot tick at a zero period.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// RGBA
    pub bar_color: [u8; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 60,
            bar_color: [169, 112, 255, 230],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub gql_url: String,
    pub client_id: String,
    pub auth_token: Option<String>,
    pub crawler: CrawlerSettings,
    pub render: RenderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gql_url: DEFAULT_GQL_URL.into(),
            client_id: DEFAULT_CLIENT_ID.into(),
            auth_token: None,
            crawler: CrawlerSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

impl Settings {
    /// Value for the `Authorization` header, if a token is configured.
    pub fn authorization(&self) -> Option<String> {
        self.auth_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| format!("OAuth {token}"))
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(client_id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
            self.client_id = client_id;
        }
        if let Some(token) = lookup(AUTH_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.auth_token = Some(token);
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable as JSON. Credentials from the environment win
    /// over the file.
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings in {}: {err}", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        data.apply_overrides(|key| std::env::var(key).ok());

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Settings {
        self.data
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

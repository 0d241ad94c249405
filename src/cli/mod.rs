mod fetch;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::settings::{Settings, SettingsStore, DEFAULT_SETTINGS_FILE};

#[derive(Debug, Parser)]
#[command(name = "vodpulse", version, about = "Chat activity graphs for recorded Twitch videos")]
pub struct Cli {
    /// Settings file
    #[arg(long, global = true, env = "VODPULSE_CONFIG", default_value = DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every comment offset of one video and render its graph
    Fetch(FetchArgs),
    /// Follow page events from stdin (`open <url>`, `player`, `detach`,
    /// `fetch`, `resize <w> <h>`, `state`, `quit`)
    Watch(WatchArgs),
    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Args)]
pub struct GraphArgs {
    /// Graph width in pixels
    #[arg(long)]
    pub width: Option<u32>,
    /// Graph height in pixels
    #[arg(long)]
    pub height: Option<u32>,
}

impl GraphArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(width) = self.width {
            settings.render.width = width;
        }
        if let Some(height) = self.height {
            settings.render.height = height;
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct FetchArgs {
    /// Video URL, path or numeric id
    pub video: String,
    #[command(flatten)]
    pub graph: GraphArgs,
    /// PNG output, defaults to `<video id>.png`
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Also write the timeline as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub graph: GraphArgs,
    /// PNG written after every redraw
    #[arg(short, long, default_value = "vodpulse.png")]
    pub output: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write the effective settings to the settings file
    Init,
    /// Print the effective settings
    Show,
}

/// Rounded percentage shown while a fetch runs.
pub(crate) fn progress_percent(covered: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 0;
    }
    (covered / total * 100.0).round().clamp(0.0, 100.0) as u32
}

pub async fn execute(cli: Cli) -> Result<bool> {
    let store = SettingsStore::new(cli.config.clone())?;

    match cli.command {
        Command::Fetch(args) => {
            let mut settings = store.settings();
            args.graph.apply(&mut settings);
            fetch::run(settings, args).await
        }
        Command::Watch(args) => {
            let mut settings = store.settings();
            args.graph.apply(&mut settings);
            watch::run(settings, args).await?;
            Ok(true)
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Init => {
                    store.update(store.settings())?;
                    println!("Wrote settings to {}", store.path().display());
                }
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&store.settings())?);
                }
            }
            Ok(true)
        }
    }
}

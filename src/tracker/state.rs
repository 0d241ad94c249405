use log::info;
use serde::Serialize;
use tokio::sync::watch;

use crate::models::VideoId;

/// Where the page currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "videoId")]
pub enum TrackerState {
    /// Not on a video page.
    NoVideo,
    /// On a video page, player not ready yet.
    Idle(VideoId),
    /// Player present: the graph can be shown and a fetch started.
    Tracking(VideoId),
}

impl TrackerState {
    pub fn video(&self) -> Option<&VideoId> {
        match self {
            TrackerState::NoVideo => None,
            TrackerState::Idle(video) | TrackerState::Tracking(video) => Some(video),
        }
    }
}

/// Page-level signals from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The page location changed; carries the new path or URL.
    Navigated(String),
    PlayerAttached,
    PlayerDetached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerChange {
    None,
    /// Another video (or none) is now active. Any data for the previous one
    /// is stale.
    VideoChanged {
        previous: Option<VideoId>,
        current: Option<VideoId>,
    },
    Attached(VideoId),
    Detached(VideoId),
}

/// Tracks the active video and publishes it to fetches in flight.
pub struct VideoTracker {
    state: TrackerState,
    active_tx: watch::Sender<Option<VideoId>>,
}

impl Default for VideoTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoTracker {
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(None);
        Self {
            state: TrackerState::NoVideo,
            active_tx,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn current(&self) -> Option<&VideoId> {
        self.state.video()
    }

    /// Receiver that always holds the active video; usable as the
    /// cancellation oracle for crawls.
    pub fn subscribe(&self) -> watch::Receiver<Option<VideoId>> {
        self.active_tx.subscribe()
    }

    pub fn handle(&mut self, event: PageEvent) -> TrackerChange {
        match event {
            PageEvent::Navigated(path) => self.navigate(VideoId::from_path(&path)),
            PageEvent::PlayerAttached => match &self.state {
                TrackerState::Idle(video) => {
                    let video = video.clone();
                    self.state = TrackerState::Tracking(video.clone());
                    TrackerChange::Attached(video)
                }
                _ => TrackerChange::None,
            },
            PageEvent::PlayerDetached => match &self.state {
                TrackerState::Tracking(video) => {
                    let video = video.clone();
                    self.state = TrackerState::Idle(video.clone());
                    TrackerChange::Detached(video)
                }
                _ => TrackerChange::None,
            },
        }
    }

    fn navigate(&mut self, next: Option<VideoId>) -> TrackerChange {
        let previous = self.state.video().cloned();
        if previous == next {
            return TrackerChange::None;
        }

        self.state = match &next {
            Some(video) => TrackerState::Idle(video.clone()),
            None => TrackerState::NoVideo,
        };
        self.active_tx.send_replace(next.clone());
        info!("active video changed: {previous:?} -> {next:?}");

        TrackerChange::VideoChanged {
            previous,
            current: next,
        }
    }
}

pub mod orchestrator;
pub mod progress;
pub mod segment;
pub mod segment_crawler;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::{FetchOrchestrator, FetchOutcome};
pub use progress::{ProgressSlot, ProgressVector};
pub use segment::{partition, Segment};
pub use segment_crawler::{CrawlConfig, SegmentCrawler};

use tokio::sync::watch;

use crate::models::VideoId;

/// Answers "which video is on screen right now". Polled before every remote
/// call, so it must be cheap.
pub trait ActiveVideo: Send + Sync {
    fn current(&self) -> Option<VideoId>;

    fn is_active(&self, video: &VideoId) -> bool {
        self.current().as_ref() == Some(video)
    }
}

impl ActiveVideo for watch::Receiver<Option<VideoId>> {
    fn current(&self) -> Option<VideoId> {
        self.borrow().clone()
    }
}

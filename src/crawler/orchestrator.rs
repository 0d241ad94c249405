use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinSet,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    gql::{fetch_duration, GqlTransport},
    models::{Timeline, VideoId},
    settings::CrawlerSettings,
};

use super::{partition, ActiveVideo, CrawlConfig, ProgressVector, SegmentCrawler};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// How a fetch settled. Callers that only care about success use
/// [`FetchOutcome::into_timeline`].
#[derive(Debug)]
pub enum FetchOutcome {
    Completed(Timeline),
    /// No duration for the video: unknown id, or not a finished recording.
    Unavailable,
    /// The active video changed while crawling.
    Cancelled,
    /// A crawler task died without reporting.
    Failed,
}

impl FetchOutcome {
    pub fn into_timeline(self) -> Option<Timeline> {
        match self {
            FetchOutcome::Completed(timeline) => Some(timeline),
            _ => None,
        }
    }
}

/// Splits a video into segments and crawls them concurrently.
pub struct FetchOrchestrator {
    transport: Arc<dyn GqlTransport>,
    active: Arc<dyn ActiveVideo>,
    settings: CrawlerSettings,
}

impl FetchOrchestrator {
    pub fn new(
        transport: Arc<dyn GqlTransport>,
        active: Arc<dyn ActiveVideo>,
        settings: CrawlerSettings,
    ) -> Self {
        Self {
            transport,
            active,
            settings,
        }
    }

    /// Fetches every comment offset of `video`.
    ///
    /// `on_progress(covered, duration)` is called every progress interval
    /// while crawlers run; it is advisory and the last call need not reach
    /// `duration`. Anything short of a complete crawl of every segment
    /// yields no timeline.
    pub async fn fetch_all<F>(&self, video: &VideoId, on_progress: F) -> FetchOutcome
    where
        F: Fn(f64, f64) + Send + 'static,
    {
        let fetch_id = Uuid::new_v4();
        let started = Instant::now();

        let duration = match fetch_duration(self.transport.as_ref(), video).await {
            Ok(Some(duration)) => duration,
            Ok(None) => {
                log_warn!("[{fetch_id}] video {video} has no length, nothing to fetch");
                return FetchOutcome::Unavailable;
            }
            Err(err) => {
                log_warn!("[{fetch_id}] failed to resolve length of video {video}: {err:#}");
                return FetchOutcome::Unavailable;
            }
        };

        let segments = partition(duration, self.settings.concurrency);
        log_info!(
            "[{fetch_id}] fetching comments of video {video} ({duration:.0}s) in {} segments",
            segments.len()
        );

        let (progress, slots) = ProgressVector::new(segments.len());
        let ticker_token = CancellationToken::new();
        // Stops the ticker however this future ends, including being dropped.
        let _ticker_guard = ticker_token.clone().drop_guard();
        let ticker = tokio::spawn(progress_ticker(
            progress,
            duration,
            self.settings.progress_interval(),
            on_progress,
            ticker_token.clone(),
        ));

        let crawler = Arc::new(SegmentCrawler::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.active),
            CrawlConfig::from(&self.settings),
        ));

        // Dropping the set aborts any crawler still running.
        let mut crawlers = JoinSet::new();
        for (segment, slot) in segments.into_iter().zip(slots) {
            let crawler = Arc::clone(&crawler);
            let video = video.clone();
            crawlers.spawn(async move { crawler.crawl(&video, segment, &slot).await });
        }

        let mut results = Vec::with_capacity(crawlers.len());
        let mut failed = false;
        while let Some(joined) = crawlers.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => {
                    log_error!("[{fetch_id}] segment task failed to join: {err}");
                    failed = true;
                }
            }
        }

        ticker_token.cancel();
        if let Err(err) = ticker.await {
            log_error!("[{fetch_id}] progress ticker failed: {err}");
        }

        if failed {
            return FetchOutcome::Failed;
        }

        let Some(per_segment) = results.into_iter().collect::<Option<Vec<_>>>() else {
            log_info!("[{fetch_id}] fetch of video {video} abandoned after video change");
            return FetchOutcome::Cancelled;
        };

        let timestamps = merge_segments(per_segment);
        log_info!(
            "[{fetch_id}] fetched {} comments of video {video} in {:.1}s",
            timestamps.len(),
            started.elapsed().as_secs_f64()
        );

        FetchOutcome::Completed(Timeline::new(video.clone(), duration, timestamps))
    }
}

/// Concatenates per-segment results and sorts ascending. Segments are
/// disjoint, so no comment can appear in two of them.
fn merge_segments(per_segment: Vec<Vec<f64>>) -> Vec<f64> {
    let mut merged: Vec<f64> = per_segment.into_iter().flatten().collect();
    merged.sort_by(f64::total_cmp);
    merged
}

async fn progress_ticker<F>(
    progress: ProgressVector,
    duration: f64,
    every: Duration,
    on_progress: F,
    cancel_token: CancellationToken,
) where
    F: Fn(f64, f64),
{
    let start = Instant::now() + every;
    let mut ticker = tokio::time::interval_at(start, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => on_progress(progress.total(), duration),
        }
    }
}

use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::{
    gql::{fetch_comments, CommentNode, GqlTransport},
    models::VideoId,
    settings::CrawlerSettings,
};

use super::{ActiveVideo, ProgressSlot, Segment};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Paging policy for one segment.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub page_limit: usize,
    pub retry_delay: Duration,
    pub empty_step_secs: f64,
    pub escalated_step_secs: f64,
    /// Consecutive empty pages tolerated before switching to the escalated step
    pub escalate_after_empty: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&CrawlerSettings::default())
    }
}

impl From<&CrawlerSettings> for CrawlConfig {
    fn from(settings: &CrawlerSettings) -> Self {
        Self {
            page_limit: settings.page_limit.max(1),
            retry_delay: settings.retry_delay(),
            empty_step_secs: settings.empty_step_secs.max(1.0),
            escalated_step_secs: settings.escalated_step_secs.max(1.0),
            escalate_after_empty: settings.escalate_after_empty,
        }
    }
}

/// Walks one segment of a video page by page.
pub struct SegmentCrawler {
    transport: Arc<dyn GqlTransport>,
    active: Arc<dyn ActiveVideo>,
    config: CrawlConfig,
}

impl SegmentCrawler {
    pub fn new(
        transport: Arc<dyn GqlTransport>,
        active: Arc<dyn ActiveVideo>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            transport,
            active,
            config,
        }
    }

    /// Collects the offsets of every distinct comment in `segment`, in no
    /// particular order.
    ///
    /// Returns `None` as soon as `video` stops being the active video. The
    /// check runs before every request; a request already in flight is not
    /// interrupted. Failed calls are retried at the same cursor until the
    /// segment is exhausted or the fetch is cancelled.
    pub async fn crawl(
        &self,
        video: &VideoId,
        segment: Segment,
        progress: &ProgressSlot,
    ) -> Option<Vec<f64>> {
        let mut stamps = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut offset = segment.start;
        let mut empty_pages: u32 = 0;

        while offset < segment.end {
            if !self.active.is_active(video) {
                log_info!(
                    "segment {} of video {} cancelled at {:.0}s",
                    segment.index,
                    video,
                    offset
                );
                return None;
            }

            let page = match fetch_comments(
                self.transport.as_ref(),
                video,
                offset,
                self.config.page_limit,
            )
            .await
            {
                Ok(page) => page,
                Err(err) => {
                    log_warn!(
                        "segment {} page at {:.0}s failed, retrying in {:?}: {err:#}",
                        segment.index,
                        offset,
                        self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    continue;
                }
            };

            if page.is_empty() {
                empty_pages += 1;
                let step = if empty_pages > self.config.escalate_after_empty {
                    self.config.escalated_step_secs
                } else {
                    self.config.empty_step_secs
                };
                offset += step.min(segment.end - offset);
                progress.report(offset - segment.start);
                continue;
            }

            empty_pages = 0;

            for node in &page {
                if segment.contains(node.content_offset_seconds) && seen.insert(node.id.clone()) {
                    stamps.push(node.content_offset_seconds);
                }
            }

            let next = next_cursor(offset, &page, self.config.page_limit);
            log_debug!(
                "segment {} cursor {:.0}s -> {:.0}s ({} comments on page)",
                segment.index,
                offset,
                next,
                page.len()
            );
            offset = next;
            progress.report(offset.min(segment.end) - segment.start);
        }

        log_info!(
            "segment {} [{:.0}s, {:.0}s) of video {} done with {} comments",
            segment.index,
            segment.start,
            segment.end,
            video,
            stamps.len()
        );
        Some(stamps)
    }
}

/// Cursor after a non-empty page.
///
/// Normally the largest offset on the page. A full page whose comments all
/// share one offset cannot be paged past by time, so it skips one second
/// ahead; this assumes the endpoint returns comments in offset order. A
/// cursor that would not move forward is bumped by one second.
fn next_cursor(offset: f64, page: &[CommentNode], page_limit: usize) -> f64 {
    let (min, max) = page.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), node| {
        (
            lo.min(node.content_offset_seconds),
            hi.max(node.content_offset_seconds),
        )
    });

    let mut next = max;
    if page.len() >= page_limit && min == max {
        next = max + 1.0;
    }
    if next <= offset {
        next = offset + 1.0;
    }
    next
}

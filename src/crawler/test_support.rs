//! Scripted transports and video oracles shared by the crawler tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    gql::{CommentNode, GqlRequest, GqlTransport},
    models::VideoId,
};

use super::ActiveVideo;

pub fn node(id: &str, offset: f64) -> CommentNode {
    CommentNode {
        id: id.to_string(),
        content_offset_seconds: offset,
    }
}

fn comments_response(nodes: &[CommentNode]) -> Value {
    let edges: Vec<Value> = nodes
        .iter()
        .map(|n| json!({ "node": { "id": n.id, "contentOffsetSeconds": n.content_offset_seconds } }))
        .collect();
    json!({ "data": { "video": { "comments": { "edges": edges } } } })
}

fn duration_response(duration: Option<f64>) -> Value {
    match duration {
        Some(length) => json!({ "data": { "video": { "lengthSeconds": length } } }),
        None => json!({ "data": { "video": null } }),
    }
}

fn is_comments_query(request: &GqlRequest) -> bool {
    request.operation_name == Some("VideoComments")
}

fn paging(request: &GqlRequest) -> Result<(i64, usize)> {
    let off = request.variables["off"]
        .as_i64()
        .ok_or_else(|| anyhow!("missing off"))?;
    let lim = request.variables["lim"]
        .as_u64()
        .ok_or_else(|| anyhow!("missing lim"))? as usize;
    Ok((off, lim))
}

/// Behaves like the real endpoint over a fixed set of comments: a page is
/// the first `lim` comments at or after the requested second.
pub struct EventTransport {
    duration: Option<f64>,
    events: Vec<CommentNode>,
    pub comment_calls: AtomicUsize,
}

impl EventTransport {
    pub fn new(duration: Option<f64>, mut events: Vec<CommentNode>) -> Self {
        events.sort_by(|a, b| a.content_offset_seconds.total_cmp(&b.content_offset_seconds));
        Self {
            duration,
            events,
            comment_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GqlTransport for EventTransport {
    async fn call(&self, request: &GqlRequest) -> Result<Value> {
        if !is_comments_query(request) {
            return Ok(duration_response(self.duration));
        }

        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        let (off, lim) = paging(request)?;
        let page: Vec<CommentNode> = self
            .events
            .iter()
            .filter(|n| n.content_offset_seconds >= off as f64)
            .take(lim)
            .cloned()
            .collect();
        Ok(comments_response(&page))
    }
}

type PageFn = dyn Fn(i64, usize) -> Result<Vec<CommentNode>> + Send + Sync;

/// Answers comment pages from a closure over `(off, lim)`.
pub struct FnTransport {
    duration: Option<f64>,
    pages: Box<PageFn>,
}

impl FnTransport {
    pub fn new<F>(pages: F) -> Self
    where
        F: Fn(i64, usize) -> Result<Vec<CommentNode>> + Send + Sync + 'static,
    {
        Self {
            duration: Some(3600.0),
            pages: Box::new(pages),
        }
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }
}

#[async_trait]
impl GqlTransport for FnTransport {
    async fn call(&self, request: &GqlRequest) -> Result<Value> {
        if !is_comments_query(request) {
            return Ok(duration_response(self.duration));
        }
        let (off, lim) = paging(request)?;
        (self.pages)(off, lim).map(|page| comments_response(&page))
    }
}

/// Always reports the same video.
pub struct FixedVideo(VideoId);

impl FixedVideo {
    pub fn new(id: &str) -> Self {
        Self(VideoId::new(id))
    }
}

impl ActiveVideo for FixedVideo {
    fn current(&self) -> Option<VideoId> {
        Some(self.0.clone())
    }
}

/// Reports `video` for the first `checks` queries, then no video at all.
pub struct SwitchAfter {
    video: VideoId,
    checks: usize,
    seen: AtomicUsize,
}

impl SwitchAfter {
    pub fn new(id: &str, checks: usize) -> Self {
        Self {
            video: VideoId::new(id),
            checks,
            seen: AtomicUsize::new(0),
        }
    }
}

impl ActiveVideo for SwitchAfter {
    fn current(&self) -> Option<VideoId> {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst);
        (seen < self.checks).then(|| self.video.clone())
    }
}

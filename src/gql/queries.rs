use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::models::VideoId;

use super::{GqlRequest, GqlTransport};

const VIDEO_COMMENTS_QUERY: &str = "query VideoComments($id:ID!,$off:Int,$lim:Int){\
video(id:$id){comments(contentOffsetSeconds:$off,first:$lim){\
edges{node{contentOffsetSeconds id}}}}}";

const VIDEO_LENGTH_QUERY: &str = "query V($id:ID!){video(id:$id){lengthSeconds}}";

/// One chat comment as seen by the crawler.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub content_offset_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<VideoData<T>>,
}

#[derive(Debug, Deserialize)]
struct VideoData<T> {
    video: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CommentsVideo {
    comments: Option<CommentConnection>,
}

#[derive(Debug, Deserialize)]
struct CommentConnection {
    edges: Option<Vec<CommentEdge>>,
}

#[derive(Debug, Deserialize)]
struct CommentEdge {
    node: CommentNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LengthVideo {
    length_seconds: Option<f64>,
}

/// Fetches one page of comments anchored at `offset` (floored to whole
/// seconds). A response without a comment list is an empty page.
pub async fn fetch_comments(
    transport: &dyn GqlTransport,
    video: &VideoId,
    offset: f64,
    limit: usize,
) -> Result<Vec<CommentNode>> {
    let request = GqlRequest {
        operation_name: Some("VideoComments"),
        query: VIDEO_COMMENTS_QUERY,
        variables: json!({
            "id": video.as_str(),
            "off": offset.floor() as i64,
            "lim": limit,
        }),
    };

    let value = transport.call(&request).await?;
    let envelope: Envelope<CommentsVideo> =
        serde_json::from_value(value).context("malformed VideoComments response")?;

    Ok(envelope
        .data
        .and_then(|data| data.video)
        .and_then(|video| video.comments)
        .and_then(|comments| comments.edges)
        .unwrap_or_default()
        .into_iter()
        .map(|edge| edge.node)
        .collect())
}

/// Length of the video in seconds. `None` when the video is unknown or has
/// no length yet (e.g. still live).
pub async fn fetch_duration(transport: &dyn GqlTransport, video: &VideoId) -> Result<Option<f64>> {
    let request = GqlRequest {
        operation_name: None,
        query: VIDEO_LENGTH_QUERY,
        variables: json!({ "id": video.as_str() }),
    };

    let value = transport.call(&request).await?;
    let envelope: Envelope<LengthVideo> =
        serde_json::from_value(value).context("malformed video length response")?;

    Ok(envelope
        .data
        .and_then(|data| data.video)
        .and_then(|video| video.length_seconds)
        .filter(|length| *length > 0.0))
}

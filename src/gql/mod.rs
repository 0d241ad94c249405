mod client;
mod queries;

pub use client::GqlClient;
pub use queries::{fetch_comments, fetch_duration, CommentNode};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// One GraphQL request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GqlRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'static str>,
    pub query: &'static str,
    pub variables: Value,
}

/// A single request/response cycle against the GraphQL endpoint.
///
/// Implementations may retry internally but must give up eventually; callers
/// decide whether an error is worth another attempt.
#[async_trait]
pub trait GqlTransport: Send + Sync {
    async fn call(&self, request: &GqlRequest) -> Result<Value>;
}

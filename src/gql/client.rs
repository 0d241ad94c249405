use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::warn;
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;

use crate::settings::Settings;

use super::{GqlRequest, GqlTransport};

const MAX_ATTEMPTS: u32 = 3;
const ATTEMPT_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport for the public GraphQL endpoint.
pub struct GqlClient {
    url: String,
    client_id: String,
    authorization: Option<String>,
    http_client: Client,
}

impl GqlClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            url: settings.gql_url.clone(),
            client_id: settings.client_id.clone(),
            authorization: settings.authorization(),
            http_client,
        })
    }

    async fn send_once(&self, request: &GqlRequest) -> Result<Value> {
        let mut builder = self
            .http_client
            .post(&self.url)
            .header("Client-Id", &self.client_id)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);

        if let Some(authorization) = &self.authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("GraphQL endpoint returned {status}: {body}");
        }

        let value = response.json::<Value>().await?;
        check_errors(&value)?;
        Ok(value)
    }
}

#[async_trait]
impl GqlTransport for GqlClient {
    /// Up to three attempts, half a second apart, before giving up.
    async fn call(&self, request: &GqlRequest) -> Result<Value> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.send_once(request).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(
                        "GraphQL call {} failed (attempt {attempt}/{MAX_ATTEMPTS}): {err:#}",
                        request.operation_name.unwrap_or("<anonymous>")
                    );
                    last_err = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(ATTEMPT_DELAY).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("GraphQL call made no attempts")))
    }
}

/// A response with `errors` and no usable `data` is a failed call, not an
/// empty result.
fn check_errors(value: &Value) -> Result<()> {
    let has_data = value.get("data").is_some_and(|data| !data.is_null());
    match value.get("errors").and_then(Value::as_array) {
        Some(errors) if !errors.is_empty() && !has_data => {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            bail!("GraphQL errors: {}", messages.join("; "))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn errors_without_data_fail_the_call() {
        let value = json!({ "errors": [{ "message": "service timeout" }] });
        let err = check_errors(&value).unwrap_err();
        assert!(err.to_string().contains("service timeout"));
    }

    #[test]
    fn partial_errors_with_data_are_accepted() {
        let value = json!({
            "errors": [{ "message": "minor" }],
            "data": { "video": null }
        });
        assert!(check_errors(&value).is_ok());
        assert!(check_errors(&json!({ "data": {} })).is_ok());
    }

    #[test]
    fn authorization_comes_from_settings() {
        let settings = Settings {
            auth_token: Some("abc".into()),
            ..Settings::default()
        };
        let client = GqlClient::new(&settings).unwrap();
        assert_eq!(client.authorization.as_deref(), Some("OAuth abc"));
        assert_eq!(client.client_id, settings.client_id);
    }
}

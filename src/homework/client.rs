use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::PollError;

const USER_AGENT: &str = concat!("homework-bot/", env!("CARGO_PKG_VERSION"));
const BODY_PREVIEW_CHARS: usize = 180;

/// Anything that can answer "which homework statuses changed since `from_date`".
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch(&self, from_date: i64) -> Result<Value, PollError>;
}

pub struct PracticumClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl PracticumClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build review API HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl ReviewSource for PracticumClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self, from_date: i64) -> Result<Value, PollError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Authorization", format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|err| PollError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PollError::Network(format!("failed reading response body: {err}")))?;
        if status != StatusCode::OK {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            return Err(PollError::HttpStatus {
                status: status.as_u16(),
                preview,
            });
        }
        debug!(bytes = body.len(), "review API answered");
        serde_json::from_str(&body)
            .map_err(|err| PollError::Schema(format!("response is not valid JSON: {err}")))
    }
}

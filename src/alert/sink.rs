use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::PollError;

const USER_AGENT: &str = concat!("homework-bot/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), PollError>;
}

pub struct StdoutSink;

#[async_trait]
impl AlertSink for StdoutSink {
    async fn send(&self, text: &str) -> Result<(), PollError> {
        println!("{text}");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramSink {
    client: Client,
    url: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(
        api_url: &str,
        bot_token: &str,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build Telegram HTTP client")?;
        Ok(Self {
            client,
            url: format!("{}/bot{bot_token}/sendMessage", api_url.trim_end_matches('/')),
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    #[instrument(skip_all, fields(chat_id = %self.chat_id))]
    async fn send(&self, text: &str) -> Result<(), PollError> {
        info!("sending message: {text}");
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .map_err(|err| {
                PollError::Delivery(format!(
                    "sendMessage request failed: {}",
                    err.without_url()
                ))
            })?;
        let status = response.status();
        let reply: TelegramReply = response.json().await.map_err(|err| {
            PollError::Delivery(format!(
                "sendMessage returned {status} with unreadable body: {}",
                err.without_url()
            ))
        })?;
        if !reply.ok {
            return Err(PollError::Delivery(
                reply
                    .description
                    .unwrap_or_else(|| format!("sendMessage returned {status}")),
            ));
        }
        info!("message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use crate::alert::sink::{AlertSink, TelegramSink};
    use crate::error::PollError;
    use crate::test_support::serve_once;

    #[tokio::test]
    async fn posts_text_to_configured_chat() {
        let (url, server) =
            serve_once(200, r#"{"ok": true, "result": {"message_id": 7}}"#).await;
        let sink = TelegramSink::new(&url, "123:abc", "4242", Duration::from_secs(5)).unwrap();

        assert_ok!(sink.send("Changed review status for \"proj1\".").await);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendMessage HTTP/1.1"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let payload: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(payload["chat_id"], "4242");
        assert_eq!(payload["text"], "Changed review status for \"proj1\".");
    }

    #[tokio::test]
    async fn falsy_reply_is_a_delivery_error() {
        let (url, server) = serve_once(
            400,
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#,
        )
        .await;
        let sink = TelegramSink::new(&url, "123:abc", "1", Duration::from_secs(5)).unwrap();

        let err = assert_err!(sink.send("hello").await);
        server.await.unwrap();
        assert_eq!(
            err,
            PollError::Delivery("Bad Request: chat not found".to_string())
        );
    }
}

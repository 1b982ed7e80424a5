// src/notify/telegram.rs
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Delivery, Notifier, OutboundMessage, PublishError};

pub const DEFAULT_ENDPOINT: &str = "https://api.telegram.org";

/// Bot API `sendMessage` client. The token is part of the request path, so
/// transport errors are stripped of their URL before they are surfaced.
#[derive(Clone)]
pub struct TelegramNotifier {
    endpoint: String,
    bot_token: String,
    chat_id: String,
    client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("endpoint", &self.endpoint)
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Point at a different API base, e.g. a local stand-in during tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.max(1));
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.endpoint, self.bot_token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

fn map_transport(e: reqwest::Error) -> PublishError {
    if e.is_timeout() {
        PublishError::Timeout
    } else {
        PublishError::Transport(e.without_url().to_string())
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, msg: &OutboundMessage) -> Result<Delivery, PublishError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &msg.text,
            parse_mode: msg.parse_mode.as_deref(),
            disable_web_page_preview: msg.disable_preview,
        };

        let rsp = self
            .client
            .post(self.send_url())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(map_transport)?;

        let status = rsp.status();
        let body = rsp.text().await.map_err(map_transport)?;
        let envelope: Option<Envelope> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let description = envelope
                .and_then(|e| e.description)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(PublishError::Status {
                status: status.as_u16(),
                description,
            });
        }

        let envelope = envelope.ok_or_else(|| PublishError::Decode("body is not a Bot API envelope".into()))?;
        if !envelope.ok {
            return Err(PublishError::Rejected(
                envelope.description.unwrap_or_else(|| "ok=false".into()),
            ));
        }
        Ok(Delivery {
            message_id: envelope.result.map(|r| r.message_id),
        })
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token() {
        let n = TelegramNotifier::new("123:SECRET", "-100");
        let dbg = format!("{n:?}");
        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("-100"));
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let n = TelegramNotifier::new("t", "c").with_endpoint("http://127.0.0.1:9/");
        assert_eq!(n.send_url(), "http://127.0.0.1:9/bott/sendMessage");
    }

    #[test]
    fn payload_shape() {
        let p = SendMessage {
            chat_id: "-100",
            text: "hi",
            parse_mode: None,
            disable_web_page_preview: true,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["chat_id"], "-100");
        assert!(v.get("parse_mode").is_none());
        assert_eq!(v["disable_web_page_preview"], true);
    }
}

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::app::{FeedwatchError, Result};
use crate::config::NotifyConfig;
use crate::notifier::{Notifier, PostLine};

/// Feishu custom-bot webhook.
///
/// With a secret configured every post carries `timestamp` and `sign`, where
/// `sign` is the base64 HMAC-SHA256 keyed with `"{timestamp}\n{secret}"` over
/// an empty message.
pub struct FeishuNotifier {
    client: Client,
    webhook_url: String,
    secret: Option<String>,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sign: Option<String>,
    msg_type: &'static str,
    content: PostContent<'a>,
}

#[derive(Debug, Serialize)]
struct PostContent<'a> {
    post: LocalizedPost<'a>,
}

#[derive(Debug, Serialize)]
struct LocalizedPost<'a> {
    zh_cn: Post<'a>,
}

#[derive(Debug, Serialize)]
struct Post<'a> {
    title: &'a str,
    content: Vec<PostLine>,
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

impl FeishuNotifier {
    pub fn new(webhook_url: impl Into<String>, secret: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            secret: secret.filter(|s| !s.is_empty()),
        })
    }

    /// Build a notifier from config, or `None` when no webhook is configured.
    pub fn from_config(config: &NotifyConfig) -> Result<Option<Self>> {
        match config.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(Some(Self::new(url, config.secret.clone())?)),
            _ => Ok(None),
        }
    }

    fn envelope<'a>(
        &self,
        title: &'a str,
        content: Vec<PostLine>,
        timestamp: i64,
    ) -> Result<Envelope<'a>> {
        let (timestamp, sign) = match &self.secret {
            Some(secret) => (Some(timestamp.to_string()), Some(sign(timestamp, secret)?)),
            None => (None, None),
        };

        Ok(Envelope {
            timestamp,
            sign,
            msg_type: "post",
            content: PostContent {
                post: LocalizedPost {
                    zh_cn: Post { title, content },
                },
            },
        })
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    async fn send_post(&self, title: &str, content: Vec<PostLine>) -> Result<()> {
        let envelope = self.envelope(title, content, chrono::Utc::now().timestamp())?;

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedwatchError::Notify(format!(
                "webhook returned HTTP {}: {}",
                status, body
            )));
        }

        let reply: WebhookReply = serde_json::from_str(&body)
            .map_err(|e| FeedwatchError::Notify(format!("unexpected webhook reply: {}", e)))?;
        if reply.code != 0 {
            return Err(FeedwatchError::Notify(format!(
                "webhook rejected the message (code {}): {}",
                reply.code, reply.msg
            )));
        }

        tracing::info!("Sent notification \"{}\"", title);
        Ok(())
    }
}

/// Signature Feishu expects for `timestamp` (unix seconds).
pub fn sign(timestamp: i64, secret: &str) -> Result<String> {
    let key = format!("{}\n{}", timestamp, secret);
    let mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| FeedwatchError::Notify(e.to_string()))?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::app::{FeedwatchError, Result};
use crate::config::FetchConfig;
use crate::fetcher::Fetcher;

const FEED_ACCEPT: &str =
    "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.7";

const XML_PROLOG: &[u8] = b"<?xml";

/// Length of the body excerpt kept in [`FeedwatchError::HttpStatus`].
const BODY_PREFIX_CHARS: usize = 200;

/// Lowercase phrases that identify an anti-bot interstitial.
const CHALLENGE_MARKERS: &[&str] = &[
    "just a moment",
    "cf-browser-verification",
    "challenge-platform",
];

/// Browser-like HTTP session.
///
/// Every fetch first visits the origin root to pick up session cookies, waits
/// `warmup_delay`, then requests the feed with the same headers.
pub struct HttpFetcher {
    client: Client,
    accept_language: String,
    warmup_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            tracing::debug!("TLS certificate validation is disabled for feed requests");
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            accept_language: config.accept_language.clone(),
            warmup_delay: config.warmup_delay(),
        })
    }

    fn headers(&self, referer: &str, cookie: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        if let Ok(value) = HeaderValue::from_str(&self.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }

        if let Some(cookie) = cookie {
            match HeaderValue::from_str(cookie.trim()) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(_) => tracing::warn!("Ignoring cookie that is not a valid header value"),
            }
        }

        headers
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cookie: Option<&str>) -> Result<Vec<u8>> {
        let feed_url = Url::parse(url)?;
        let origin = feed_url.join("/")?;
        let headers = self.headers(origin.as_str(), cookie);

        let warmup = self
            .client
            .get(origin.clone())
            .headers(headers.clone())
            .send()
            .await?;
        tracing::debug!("Warm-up request to {} returned {}", origin, warmup.status());
        if let Err(e) = warmup.bytes().await {
            tracing::debug!("Discarding unreadable warm-up body: {}", e);
        }

        if !self.warmup_delay.is_zero() {
            tokio::time::sleep(self.warmup_delay).await;
        }

        let response = self.client.get(feed_url).headers(headers).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        validate_body(status, &body)
    }
}

/// Check a feed response and cut it down to the XML document.
pub fn validate_body(status: StatusCode, body: &[u8]) -> Result<Vec<u8>> {
    if status != StatusCode::OK {
        return Err(FeedwatchError::HttpStatus {
            status: status.as_u16(),
            body_prefix: String::from_utf8_lossy(body)
                .chars()
                .take(BODY_PREFIX_CHARS)
                .collect(),
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FeedwatchError::EmptyBody);
    }

    match find_prolog(body) {
        Some(start) => {
            if body[..start]
                .iter()
                .any(|&b| !b.is_ascii_whitespace() && !matches!(b, 0xEF | 0xBB | 0xBF))
            {
                tracing::debug!("Discarding {} bytes before the XML prolog", start);
            }
            Ok(body[start..].to_vec())
        }
        None => Err(FeedwatchError::Blocked {
            challenge: is_challenge_page(body),
        }),
    }
}

fn find_prolog(body: &[u8]) -> Option<usize> {
    body.windows(XML_PROLOG.len())
        .position(|window| window == XML_PROLOG)
}

fn is_challenge_page(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body).to_lowercase();
    CHALLENGE_MARKERS.iter().any(|marker| text.contains(marker))
}

//! Delivery of poll results to a chat webhook.
//!
//! Messages are Feishu rich-text posts: a list of lines, each line a list of
//! [`PostElement`]s.

pub mod feishu;

use async_trait::async_trait;
use serde::Serialize;

use crate::app::Result;
use crate::domain::NewItem;

pub use feishu::FeishuNotifier;

const SEPARATOR: &str = "----------------------------------------";

/// One inline element of a rich-text line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum PostElement {
    Text { text: String },
    A { text: String, href: String },
}

impl PostElement {
    pub fn text(text: impl Into<String>) -> Self {
        PostElement::Text { text: text.into() }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        PostElement::A {
            text: text.into(),
            href: href.into(),
        }
    }
}

pub type PostLine = Vec<PostElement>;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a rich-text post.
    async fn send_post(&self, title: &str, content: Vec<PostLine>) -> Result<()>;
}

/// Lay out new entries: title, link, optional publish time, separator.
pub fn format_new_items(items: &[NewItem]) -> Vec<PostLine> {
    let mut lines = Vec::with_capacity(items.len() * 4);

    for item in items {
        lines.push(vec![PostElement::text(item.title.clone())]);

        let link = if item.link.starts_with("http://") || item.link.starts_with("https://") {
            PostElement::link(item.link.clone(), item.link.clone())
        } else {
            PostElement::text(item.link.clone())
        };
        lines.push(vec![PostElement::text("Link: "), link]);

        if let Some(published_at) = &item.published_at {
            lines.push(vec![PostElement::text(format!("Published: {}", published_at))]);
        }

        lines.push(vec![PostElement::text(SEPARATOR)]);
    }

    lines
}

/// Lay out a failed feed request for the operator.
pub fn format_fetch_failure(url: &str, status: u16, body_prefix: &str) -> Vec<PostLine> {
    let mut lines = vec![
        vec![PostElement::text(format!("The feed request returned HTTP {}", status))],
        vec![PostElement::text("Feed: "), PostElement::link(url, url)],
    ];

    let excerpt = body_prefix.trim();
    if !excerpt.is_empty() {
        lines.push(vec![PostElement::text(excerpt)]);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PLACEHOLDER;

    #[test]
    fn test_post_element_wire_format() {
        let line = vec![
            PostElement::text("Link: "),
            PostElement::link("x", "https://x"),
        ];
        assert_eq!(
            serde_json::to_value(&line).unwrap(),
            serde_json::json!([
                {"tag": "text", "text": "Link: "},
                {"tag": "a", "text": "x", "href": "https://x"}
            ])
        );
    }

    #[test]
    fn test_format_new_items() {
        let items = vec![
            NewItem {
                title: "First".into(),
                link: "https://example.com/1".into(),
                published_at: Some("2025-05-14 19:05:36".into()),
            },
            NewItem {
                title: "Second".into(),
                link: PLACEHOLDER.into(),
                published_at: None,
            },
        ];

        let lines = format_new_items(&items);
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], vec![PostElement::text("First")]);
        assert_eq!(
            lines[1][1],
            PostElement::link("https://example.com/1", "https://example.com/1")
        );
        assert_eq!(
            lines[2],
            vec![PostElement::text("Published: 2025-05-14 19:05:36")]
        );
        assert_eq!(lines[3], vec![PostElement::text(SEPARATOR)]);
        assert_eq!(lines[5][1], PostElement::text(PLACEHOLDER));
        assert_eq!(lines[6], vec![PostElement::text(SEPARATOR)]);
    }

    #[test]
    fn test_format_fetch_failure() {
        let lines = format_fetch_failure("https://example.com/feed", 503, "  ");
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            vec![PostElement::text("The feed request returned HTTP 503")]
        );

        let lines = format_fetch_failure("https://example.com/feed", 403, "Forbidden");
        assert_eq!(lines[2], vec![PostElement::text("Forbidden")]);
    }
}

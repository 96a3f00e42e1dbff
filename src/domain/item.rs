use serde::{Deserialize, Serialize};

/// Placeholder stored when a feed entry has no title or no link.
pub const PLACEHOLDER: &str = "N/A";

/// One feed entry as parsed and persisted in the state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    #[serde(rename = "pubDate", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl FeedItem {
    /// Build an item from the raw values extracted from one feed entry.
    ///
    /// Blank values count as missing. The title falls back to [`PLACEHOLDER`],
    /// the guid falls back to the link, and a missing link becomes
    /// [`PLACEHOLDER`]. Returns `None` when no guid can be derived, in which
    /// case the entry is dropped.
    pub fn from_entry(
        title: Option<&str>,
        link: Option<&str>,
        guid: Option<&str>,
        published_at: Option<String>,
    ) -> Option<Self> {
        let title = non_blank(title).unwrap_or(PLACEHOLDER);
        let link = non_blank(link);
        let guid = non_blank(guid).or(link)?;

        Some(Self {
            title: title.to_string(),
            link: link.unwrap_or(PLACEHOLDER).to_string(),
            guid: guid.to_string(),
            published_at,
        })
    }

    pub fn has_link(&self) -> bool {
        self.link != PLACEHOLDER
    }
}

/// The part of a [`FeedItem`] handed downstream when it is new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl From<&FeedItem> for NewItem {
    fn from(item: &FeedItem) -> Self {
        Self {
            title: item.title.clone(),
            link: item.link.clone(),
            published_at: item.published_at.clone(),
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

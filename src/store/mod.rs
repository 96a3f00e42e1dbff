pub mod json;

use std::collections::HashSet;

use crate::app::Result;
use crate::domain::FeedItem;

pub use json::JsonStore;

/// Durable snapshot of the feed entries seen by the last successful poll.
pub trait Store {
    /// Guids of the stored snapshot. A missing snapshot yields an empty set.
    fn load_guids(&self) -> Result<HashSet<String>>;

    /// The stored snapshot in feed order.
    fn load_items(&self) -> Result<Vec<FeedItem>>;

    /// Replace the snapshot wholesale with `items`.
    fn save_items(&self, items: &[FeedItem]) -> Result<()>;

    /// Remove the snapshot. Returns whether there was one.
    fn clear(&self) -> Result<bool>;
}

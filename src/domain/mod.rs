pub mod item;

pub use item::{FeedItem, NewItem, PLACEHOLDER};

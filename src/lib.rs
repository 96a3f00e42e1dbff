//! # feedwatch
//!
//! Polls one RSS/Atom feed per invocation and reports the entries that were
//! not present in the previous poll.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Monitor (diff against Store) → Notifier
//! ```
//!
//! - [`fetcher`]: browser-like HTTP session with a warm-up request
//! - [`normalizer`]: RSS 2.0 / Atom parsing and timestamp normalization
//! - [`store`]: JSON snapshot of the last successful poll
//! - [`monitor`]: one poll, from fetch to persisted snapshot
//! - [`notifier`]: Feishu webhook delivery
//!
//! ## Quick Start
//!
//! ```bash
//! # Poll the configured feed and print new entries
//! feedwatch check
//!
//! # Poll another feed, output JSON, no webhook
//! feedwatch --url https://blog.rust-lang.org/feed.xml check --json --no-notify
//!
//! # Forget what has been seen
//! feedwatch reset
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, monitor, notifier.
pub mod app;

/// Command-line interface using clap.
///
/// - `check [--json] [--no-notify]` - Poll once and report new entries
/// - `show` - List the stored snapshot
/// - `reset` - Delete the stored snapshot
/// - `init` - Write a default config file
pub mod cli;

/// Configuration loaded from `~/.config/feedwatch/config.toml` and the environment.
pub mod config;

/// Core domain models: [`FeedItem`](domain::FeedItem) and [`NewItem`](domain::NewItem).
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Poll orchestration and novelty detection.
pub mod monitor;

/// Feed parsing and normalization.
///
/// Converts RSS 2.0 and Atom 1.0 into [`FeedItem`](domain::FeedItem)s with
/// publish dates rendered in UTC+8.
pub mod normalizer;

/// Webhook notifications.
pub mod notifier;

/// Snapshot persistence.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`JsonStore`](store::JsonStore): JSON file implementation
pub mod store;

use std::path::Path;

use crate::app::{AppContext, FeedwatchError, Result};
use crate::config::Config;
use crate::domain::NewItem;
use crate::monitor::PollReport;
use crate::notifier::{format_fetch_failure, format_new_items};
use crate::store::Store;

pub async fn check(ctx: &AppContext, json: bool, notify: bool) -> Result<()> {
    let feed = &ctx.config.feed;
    let report = ctx.monitor.poll(&feed.url, feed.cookie.as_deref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.new_items)?);
    } else {
        print_report(&report);
    }

    if notify {
        send_notifications(ctx, &report).await;
    }

    Ok(())
}

fn print_report(report: &PollReport) {
    if let Some(e) = &report.error {
        eprintln!("Poll failed: {}", e);
        return;
    }

    if let Some(e) = &report.persist_error {
        eprintln!("Warning: {}", e);
    }

    if report.new_items.is_empty() {
        println!("No new entries ({} in feed)", report.fetched);
        return;
    }

    println!("{} new entries:", report.new_items.len());
    for (i, item) in report.new_items.iter().enumerate() {
        print_item(i + 1, item);
    }
}

fn print_item(index: usize, item: &NewItem) {
    println!("  {}. {}", index, item.title);
    println!("     {}", item.link);
    if let Some(published_at) = &item.published_at {
        println!("     {}", published_at);
    }
}

async fn send_notifications(ctx: &AppContext, report: &PollReport) {
    let Some(notifier) = &ctx.notifier else {
        tracing::debug!("No webhook configured, skipping notifications");
        return;
    };
    let notify = &ctx.config.notify;

    if !report.new_items.is_empty() {
        let content = format_new_items(&report.new_items);
        if let Err(e) = notifier.send_post(&notify.title, content).await {
            tracing::error!("Failed to send new-entry notification: {}", e);
        }
    }

    if let Some(FeedwatchError::HttpStatus {
        status,
        body_prefix,
    }) = &report.error
    {
        let content = format_fetch_failure(&ctx.config.feed.url, *status, body_prefix);
        if let Err(e) = notifier.send_post(&notify.failure_title, content).await {
            tracing::error!("Failed to send failure notification: {}", e);
        }
    }
}

pub fn show(ctx: &AppContext) -> Result<()> {
    let items = ctx.store.load_items()?;

    if items.is_empty() {
        println!("No stored entries in {}", ctx.store.path().display());
        return Ok(());
    }

    for item in items {
        let date = item.published_at.as_deref().unwrap_or("                   ");
        println!("{} {}", date, item.title);
        if item.has_link() {
            println!("  {}", item.link);
        }
    }

    Ok(())
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    if ctx.store.clear()? {
        println!("Removed {}", ctx.store.path().display());
    } else {
        println!("Nothing stored at {}", ctx.store.path().display());
    }
    Ok(())
}

pub fn init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path().map_err(|e| FeedwatchError::Config(e.to_string()))?,
    };

    let created =
        Config::create_default_config(&path).map_err(|e| FeedwatchError::Config(e.to_string()))?;
    if created {
        println!("Wrote default config to {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

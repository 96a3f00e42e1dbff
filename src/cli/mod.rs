pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedwatch")]
#[command(about = "Poll an RSS/Atom feed and report entries not seen before", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/feedwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Feed URL, overriding config and environment
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Directory holding the state snapshot, overriding config and environment
    #[arg(short, long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the feed once and report new entries
    Check {
        /// Print new entries as JSON
        #[arg(long)]
        json: bool,

        /// Do not send webhook notifications
        #[arg(long)]
        no_notify: bool,
    },
    /// List the entries stored by the last successful poll
    Show,
    /// Delete the stored snapshot so the next poll reports every entry
    Reset,
    /// Write a default config file
    Init,
}

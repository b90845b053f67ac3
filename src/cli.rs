use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Browse and search a locally downloaded scripture library.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Configuration file (defaults to `config.toml` in the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Language code; the configured default language when omitted
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show an item and list its children
    Lookup {
        /// Absolute path, e.g. /scriptures/bofm/1-ne
        path: String,
    },
    /// Search everything below a path for keywords
    Search {
        path: String,
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// List the footnotes of a node
    Footnotes {
        path: String,
        /// Only footnotes for these verses (repeatable)
        #[arg(long = "verse")]
        verses: Vec<u32>,
    },
}

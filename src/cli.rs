//! Command-line interface definitions.
//!
//! Global options override the YAML settings file; the proxy prefix can
//! also come from the environment.

use clap::{Parser, Subcommand};

/// Command-line arguments for newsreel.
///
/// # Examples
///
/// ```sh
/// # One article, printed as JSON
/// newsreel extract https://www.bbc.co.uk/news/articles/c0000000000o
///
/// # Crawl two sources and write a dated edition file
/// newsreel -j ./json crawl --source bbc --source npr --cap 3
///
/// # Through an indirection service
/// NEWSREEL_PROXY="https://api.allorigins.win/raw?url=" newsreel crawl
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a settings YAML file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output directory for JSON editions; results go to stdout when absent
    #[arg(short, long, global = true)]
    pub json_output_dir: Option<String>,

    /// Per-request fetch deadline in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Prefix of an indirection service used when a direct fetch fails
    #[arg(long, env = "NEWSREEL_PROXY", global = true)]
    pub proxy_prefix: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Extract a single article URL
    Extract {
        url: String,
    },
    /// Crawl enabled sources (or the ones named) and collect their articles
    Crawl {
        /// Source id to crawl; repeat for several
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// Maximum articles per source
        #[arg(long)]
        cap: Option<usize>,

        /// Sources crawled at the same time
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// List the known sources
    Sources,
}

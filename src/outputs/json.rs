//! JSON output of an [`Edition`].
//!
//! Files are organized by date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//! A later run in the same edition slot overwrites the earlier file.

use crate::models::{Article, CrawlProgress, Edition};
use crate::utils::time_of_day;
use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Stamp `articles` with the current local date, time and edition name.
pub fn edition_now(articles: Vec<Article>, sources: Vec<CrawlProgress>) -> Edition {
    let now = Local::now();
    Edition {
        local_date: now.date_naive().to_string(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        time_of_day: time_of_day(),
        articles,
        sources,
    }
}

/// Path the edition is written to under `json_output_dir`.
pub fn edition_path(edition: &Edition, json_output_dir: &str) -> PathBuf {
    Path::new(json_output_dir)
        .join(&edition.local_date)
        .join(format!("{}.json", edition.time_of_day))
}

/// Write `edition` to `{json_output_dir}/{date}/{time_of_day}.json`,
/// creating the date directory as needed. Returns the written path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_edition(edition: &Edition, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(edition)?;
    let path = edition_path(edition, json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = edition.articles.len(), "Wrote JSON edition");
    Ok(path)
}

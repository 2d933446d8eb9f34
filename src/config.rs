use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::book_metadata::{DEFAULT_CATALOG_URL, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::db::DEFAULT_STORE_KEY;

const APP_DIR_NAME: &str = "shelfmark";
const DB_FILE_NAME: &str = "shelfmark.db";

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Directory holding the reading list database
    #[arg(long, global = true, env = "SHELFMARK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Key the list is stored under
    #[arg(long, global = true, env = "SHELFMARK_STORE_KEY", default_value = DEFAULT_STORE_KEY)]
    pub store_key: String,

    /// Base URL of the Google Books volumes API
    #[arg(long, global = true, env = "SHELFMARK_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Request timeout for catalog lookups, in seconds (at least 1)
    #[arg(
        long,
        global = true,
        env = "SHELFMARK_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_HTTP_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store_key: String,
    pub catalog_url: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_args(args: &ConfigArgs) -> Self {
        Config {
            data_dir: args.data_dir.clone().unwrap_or_else(default_data_dir),
            store_key: args.store_key.clone(),
            catalog_url: args.catalog_url.clone(),
            http_timeout: Duration::from_secs(args.timeout_secs),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

/// Linux: ~/.local/share/shelfmark, macOS: ~/Library/Application Support/shelfmark,
/// Windows: %APPDATA%\shelfmark. Falls back to the working directory.
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

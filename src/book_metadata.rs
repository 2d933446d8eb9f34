use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::LookupError;
use crate::models::BookMetadata;

pub const DEFAULT_CATALOG_URL: &str = "https://www.googleapis.com/books/v1";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const HTTP_USER_AGENT: &str = concat!("shelfmark/", env!("CARGO_PKG_VERSION"));
static METADATA_DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();
static ISBN_QUERY: OnceLock<Regex> = OnceLock::new();
static WHITESPACE: OnceLock<Regex> = OnceLock::new();

/// Transport to the volumes search endpoint. `query` is the already-escaped
/// value of the `q` parameter.
pub trait CatalogClient {
    fn search_volumes(&self, query: &str) -> Result<Value, LookupError>;
}

pub struct GoogleBooksClient {
    client: Client,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(LookupError::Client)?;
        Ok(GoogleBooksClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl CatalogClient for GoogleBooksClient {
    fn search_volumes(&self, query: &str) -> Result<Value, LookupError> {
        let url = format!("{}/volumes?q={}&maxResults=1", self.base_url, query);
        if metadata_debug_enabled() {
            log::info!("[metadata-debug] http start url={}", url);
        }

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(LookupError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        if metadata_debug_enabled() {
            log::info!("[metadata-debug] http success url={} status={}", url, status);
        }
        response.json::<Value>().map_err(LookupError::Decode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(BookMetadata),
    NotFound,
}

/// Enrich a title/author pair. Never fails: a miss or any error yields
/// `BookMetadata::fallback(title)`.
pub fn lookup(catalog: &dyn CatalogClient, title: &str, author: &str) -> BookMetadata {
    match try_lookup(catalog, title, author) {
        Ok(LookupOutcome::Found(metadata)) => metadata,
        Ok(LookupOutcome::NotFound) => BookMetadata::fallback(title),
        Err(err) => {
            log::warn!("metadata lookup failed for \"{}\": {}", title, err);
            BookMetadata::fallback(title)
        }
    }
}

pub fn try_lookup(
    catalog: &dyn CatalogClient,
    title: &str,
    author: &str,
) -> Result<LookupOutcome, LookupError> {
    if looks_like_isbn(title) {
        let data = catalog.search_volumes(&format!("isbn:{}", title))?;
        if let Some(item) = first_item(&data) {
            if metadata_debug_enabled() {
                log::info!("[metadata-debug] isbn hit isbn={}", title);
            }
            let mut metadata = extract_metadata(item, title);
            metadata.isbn = Some(title.to_string());
            return Ok(LookupOutcome::Found(metadata));
        }
    }

    let data = catalog.search_volumes(&free_text_query(title, author))?;
    match first_item(&data) {
        Some(item) => {
            if metadata_debug_enabled() {
                log::info!("[metadata-debug] search hit title=\"{}\" author=\"{}\"", title, author);
            }
            Ok(LookupOutcome::Found(extract_metadata(item, title)))
        }
        None => {
            if metadata_debug_enabled() {
                log::info!("[metadata-debug] search miss title=\"{}\" author=\"{}\"", title, author);
            }
            Ok(LookupOutcome::NotFound)
        }
    }
}

fn looks_like_isbn(value: &str) -> bool {
    ISBN_QUERY
        .get_or_init(|| Regex::new(r"^[0-9]{10,13}$").expect("isbn pattern compiles"))
        .is_match(value)
}

fn free_text_query(title: &str, author: &str) -> String {
    let combined = format!("{} {}", title, author);
    WHITESPACE
        .get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern compiles"))
        .split(combined.trim())
        .filter(|token| !token.is_empty())
        .map(|token| urlencoding::encode(token).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

fn first_item(data: &Value) -> Option<&Value> {
    data.get("items")
        .and_then(|value| value.as_array())
        .and_then(|items| items.first())
}

fn extract_metadata(item: &Value, fallback_title: &str) -> BookMetadata {
    let info = item.get("volumeInfo").unwrap_or(&Value::Null);
    let page_count = info
        .get("pageCount")
        .and_then(|value| value.as_u64())
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0);
    let thumbnail_url = info
        .get("imageLinks")
        .and_then(|value| value.get("thumbnail").or_else(|| value.get("smallThumbnail")))
        .and_then(|value| value.as_str())
        .and_then(non_empty)
        .map(|value| value.replace("http://", "https://"));
    let categories: Vec<String> = info
        .get("categories")
        .and_then(|value| value.as_array())
        .map(|values| values.iter().filter_map(|v| v.as_str().and_then(non_empty)).collect())
        .unwrap_or_default();

    BookMetadata {
        isbn: preferred_isbn(info),
        catalog_id: item.get("id").and_then(|value| value.as_str()).and_then(non_empty),
        page_count,
        thumbnail_url,
        description: string_field(info, "description"),
        display_title: string_field(info, "title").or_else(|| Some(fallback_title.to_string())),
        publisher: string_field(info, "publisher"),
        published_date: string_field(info, "publishedDate"),
        categories,
    }
}

/// First ISBN_13 identifier, else first ISBN_10.
fn preferred_isbn(info: &Value) -> Option<String> {
    let identifiers = info.get("industryIdentifiers")?.as_array()?;
    let find = |kind: &str| {
        identifiers.iter().find_map(|entry| {
            if entry.get("type").and_then(|value| value.as_str()) != Some(kind) {
                return None;
            }
            entry.get("identifier").and_then(|value| value.as_str()).and_then(non_empty)
        })
    };
    find("ISBN_13").or_else(|| find("ISBN_10"))
}

fn string_field(info: &Value, key: &str) -> Option<String> {
    info.get(key).and_then(|value| value.as_str()).and_then(non_empty)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn metadata_debug_enabled() -> bool {
    *METADATA_DEBUG_ENABLED.get_or_init(|| {
        std::env::var("SHELFMARK_METADATA_DEBUG")
            .map(|value| {
                let lowered = value.trim().to_ascii_lowercase();
                lowered == "1" || lowered == "true" || lowered == "yes" || lowered == "on"
            })
            .unwrap_or(false)
    })
}

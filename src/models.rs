use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry in the reading list.
///
/// Field names on the wire are fixed: the store, the export file and the
/// import file all share this shape. Fields this crate does not know about
/// are carried in `extra` so an import followed by an export keeps them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default, rename = "googleBooksId")]
    pub catalog_id: Option<String>,
    #[serde(default, rename = "pages", deserialize_with = "null_as_default")]
    pub page_count: u32,
    #[serde(default, rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "fullTitle")]
    pub display_title: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl BookRecord {
    pub fn from_lookup(title: String, author: String, metadata: BookMetadata) -> Self {
        BookRecord {
            title,
            author,
            isbn: metadata.isbn,
            catalog_id: metadata.catalog_id,
            page_count: metadata.page_count,
            thumbnail_url: metadata.thumbnail_url,
            description: metadata.description,
            display_title: metadata.display_title,
            publisher: metadata.publisher,
            published_date: metadata.published_date,
            categories: metadata.categories,
            extra: Map::new(),
        }
    }

    /// Canonical title, or the user's title when the catalog never gave one.
    pub fn shown_title(&self) -> &str {
        self.display_title.as_deref().unwrap_or(&self.title)
    }

    /// Fresh values win wherever they are present; null, zero and empty
    /// values leave the stored field alone.
    pub fn merge_metadata(&mut self, fresh: BookMetadata) {
        if fresh.isbn.is_some() {
            self.isbn = fresh.isbn;
        }
        if fresh.catalog_id.is_some() {
            self.catalog_id = fresh.catalog_id;
        }
        if fresh.page_count > 0 {
            self.page_count = fresh.page_count;
        }
        if fresh.thumbnail_url.is_some() {
            self.thumbnail_url = fresh.thumbnail_url;
        }
        if fresh.description.is_some() {
            self.description = fresh.description;
        }
        if fresh.display_title.is_some() {
            self.display_title = fresh.display_title;
        }
        if fresh.publisher.is_some() {
            self.publisher = fresh.publisher;
        }
        if fresh.published_date.is_some() {
            self.published_date = fresh.published_date;
        }
        if !fresh.categories.is_empty() {
            self.categories = fresh.categories;
        }
    }
}

/// Normalized catalog data for one book.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub isbn: Option<String>,
    pub catalog_id: Option<String>,
    pub page_count: u32,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub display_title: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub categories: Vec<String>,
}

impl BookMetadata {
    /// What a lookup yields when the catalog had nothing or could not be reached.
    pub fn fallback(title: &str) -> Self {
        BookMetadata {
            display_title: Some(title.to_string()),
            ..Default::default()
        }
    }
}

/// Result summary for bulk operations.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationStats {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub books: usize,
    pub pages: u64,
}

impl Totals {
    pub fn of(books: &[BookRecord]) -> Self {
        Totals {
            books: books.len(),
            pages: books.iter().map(|book| u64::from(book.page_count)).sum(),
        }
    }
}

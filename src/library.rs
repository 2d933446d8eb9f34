use serde_json::Value;

use crate::book_metadata::{self, CatalogClient, LookupOutcome};
use crate::db::LocalStore;
use crate::error::LibraryError;
use crate::models::{BookRecord, OperationStats, Totals};

/// The reading list and the store it is bound to.
///
/// Every successful mutation is flushed through `commit`; a rejected
/// operation never touches the store.
pub struct BookList {
    books: Vec<BookRecord>,
    store: LocalStore,
}

impl BookList {
    pub fn open(store: LocalStore) -> Result<Self, LibraryError> {
        let books = store.load()?;
        log::info!("loaded {} books from '{}'", books.len(), store.key());
        Ok(BookList { books, store })
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    fn commit(&mut self, books: Vec<BookRecord>) -> Result<(), LibraryError> {
        self.store.save(&books)?;
        self.books = books;
        Ok(())
    }

    pub fn add(
        &mut self,
        catalog: &dyn CatalogClient,
        title: &str,
        author: &str,
    ) -> Result<BookRecord, LibraryError> {
        let title = title.trim();
        let author = author.trim();
        if title.is_empty() {
            return Err(LibraryError::MissingField("title"));
        }
        if author.is_empty() {
            return Err(LibraryError::MissingField("author"));
        }

        let metadata = book_metadata::lookup(catalog, title, author);
        let record = BookRecord::from_lookup(title.to_string(), author.to_string(), metadata);
        log::info!(
            "adding \"{}\" by {} isbn={} pages={}",
            record.title,
            record.author,
            record.isbn.as_deref().unwrap_or("-"),
            record.page_count
        );

        let mut books = self.books.clone();
        books.push(record.clone());
        self.commit(books)?;
        Ok(record)
    }

    pub fn delete(&mut self, index: usize) -> Result<BookRecord, LibraryError> {
        if index >= self.books.len() {
            return Err(LibraryError::IndexOutOfRange {
                index,
                len: self.books.len(),
            });
        }
        let mut books = self.books.clone();
        let removed = books.remove(index);
        self.commit(books)?;
        log::info!("deleted \"{}\" at position {}", removed.title, index);
        Ok(removed)
    }

    /// Re-enrich every record in list order, one lookup at a time. A miss or
    /// a failed lookup leaves that record as it was. Saves once at the end.
    pub fn update_all(&mut self, catalog: &dyn CatalogClient) -> Result<OperationStats, LibraryError> {
        let total = self.books.len();
        let mut stats = OperationStats {
            total,
            ..Default::default()
        };
        let mut updated = Vec::with_capacity(total);

        log::info!("starting metadata refresh for {} books", total);

        for (idx, book) in self.books.iter().enumerate() {
            let mut book = book.clone();
            match book_metadata::try_lookup(catalog, &book.title, &book.author) {
                Ok(LookupOutcome::Found(fresh)) => {
                    book.merge_metadata(fresh);
                    stats.processed += 1;
                }
                Ok(LookupOutcome::NotFound) => {
                    log::info!("[{}/{}] no catalog match for \"{}\"", idx + 1, total, book.title);
                    stats.skipped += 1;
                }
                Err(err) => {
                    log::warn!("[{}/{}] error updating \"{}\": {}", idx + 1, total, book.title, err);
                    stats.errors += 1;
                }
            }
            updated.push(book);
        }

        self.commit(updated)?;
        log::info!(
            "metadata refresh done: processed={} skipped={} errors={}",
            stats.processed,
            stats.skipped,
            stats.errors
        );
        Ok(stats)
    }

    /// Replace the whole list with `payload`, which must be a JSON array of
    /// book objects.
    pub fn import(&mut self, payload: &str) -> Result<usize, LibraryError> {
        let value: Value = serde_json::from_str(payload).map_err(LibraryError::InvalidImport)?;
        if !value.is_array() {
            return Err(LibraryError::NotASequence);
        }
        let books: Vec<BookRecord> = serde_json::from_value(value).map_err(LibraryError::InvalidImport)?;
        let count = books.len();
        self.commit(books)?;
        log::info!("imported {} books", count);
        Ok(count)
    }

    pub fn export(&self) -> Result<String, LibraryError> {
        serde_json::to_string_pretty(&self.books).map_err(LibraryError::Export)
    }

    pub fn totals(&self) -> Totals {
        Totals::of(&self.books)
    }
}

#[cfg(test)]
mod tests {
    use super::BookList;
    use crate::book_metadata::testing::{empty, volume, ScriptedCatalog};
    use crate::db::{LocalStore, DEFAULT_STORE_KEY};
    use crate::error::LibraryError;
    use crate::models::BookRecord;
    use serde_json::json;

    fn list_with(titles: &[&str]) -> BookList {
        let store = LocalStore::open_in_memory(DEFAULT_STORE_KEY).unwrap();
        let books = titles
            .iter()
            .map(|title| BookRecord {
                title: title.to_string(),
                author: format!("{} author", title),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        store.save(&books).unwrap();
        BookList::open(store).unwrap()
    }

    fn titles(list: &BookList) -> Vec<&str> {
        list.books().iter().map(|book| book.title.as_str()).collect()
    }

    fn reloaded(list: &BookList) -> Vec<BookRecord> {
        list.store.load().unwrap()
    }

    #[test]
    fn add_trims_input_and_persists() {
        let mut list = list_with(&["A"]);
        let catalog = ScriptedCatalog::new(vec![Ok(volume(
            "id-1",
            json!({ "title": "Dune", "pageCount": 412 }),
        ))]);

        let added = list.add(&catalog, "  Dune ", " Frank Herbert\n").unwrap();

        assert_eq!(added.title, "Dune");
        assert_eq!(added.author, "Frank Herbert");
        assert_eq!(added.page_count, 412);
        assert_eq!(list.len(), 2);
        assert_eq!(reloaded(&list), list.books().to_vec());
    }

    #[test]
    fn add_proceeds_with_defaults_when_lookup_fails() {
        let mut list = list_with(&[]);
        let catalog = ScriptedCatalog::new(vec![Err(500)]);

        let added = list.add(&catalog, "Dune", "Frank Herbert").unwrap();

        assert!(added.isbn.is_none());
        assert_eq!(added.page_count, 0);
        assert_eq!(added.display_title.as_deref(), Some("Dune"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn add_rejects_blank_fields_without_lookup() {
        let mut list = list_with(&["A"]);
        let catalog = ScriptedCatalog::default();

        assert!(matches!(
            list.add(&catalog, "   ", "Someone"),
            Err(LibraryError::MissingField("title"))
        ));
        assert!(matches!(
            list.add(&catalog, "Title", ""),
            Err(LibraryError::MissingField("author"))
        ));
        assert!(catalog.queries().is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicates_are_allowed() {
        let mut list = list_with(&[]);
        let catalog = ScriptedCatalog::default();
        list.add(&catalog, "Dune", "Frank Herbert").unwrap();
        list.add(&catalog, "Dune", "Frank Herbert").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn delete_removes_only_the_indexed_book() {
        let mut list = list_with(&["A", "B", "C", "D"]);

        let removed = list.delete(1).unwrap();

        assert_eq!(removed.title, "B");
        assert_eq!(titles(&list), vec!["A", "C", "D"]);
        assert_eq!(reloaded(&list).len(), 3);
    }

    #[test]
    fn delete_out_of_range_changes_nothing() {
        let mut list = list_with(&["A", "B"]);
        assert!(matches!(
            list.delete(2),
            Err(LibraryError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert_eq!(titles(&list), vec!["A", "B"]);
    }

    #[test]
    fn export_then_import_round_trips() {
        let mut list = list_with(&["A", "B"]);
        let catalog = ScriptedCatalog::new(vec![Ok(volume(
            "x",
            json!({ "title": "C full", "categories": ["Poetry"], "pageCount": 12 }),
        ))]);
        list.add(&catalog, "C", "Poet").unwrap();
        let before = list.books().to_vec();

        let exported = list.export().unwrap();
        let mut other = list_with(&["Z"]);
        other.import(&exported).unwrap();

        assert_eq!(other.books(), before.as_slice());
        assert!(exported.contains("\n  {"));
    }

    #[test]
    fn import_rejects_non_sequence_and_keeps_state() {
        let mut list = list_with(&["A", "B"]);

        assert!(matches!(
            list.import(r#"{"title":"X","author":"Y"}"#),
            Err(LibraryError::NotASequence)
        ));
        assert!(matches!(list.import("not json"), Err(LibraryError::InvalidImport(_))));
        assert!(matches!(list.import(r#"[{"title":"X"}]"#), Err(LibraryError::InvalidImport(_))));

        assert_eq!(titles(&list), vec!["A", "B"]);
        assert_eq!(reloaded(&list).len(), 2);
    }

    #[test]
    fn update_all_merges_fresh_values_in_list_order() {
        let mut list = list_with(&["A", "B"]);
        list.books[0].page_count = 100;
        list.books[1].page_count = 100;
        let catalog = ScriptedCatalog::new(vec![
            Ok(volume("a", json!({ "publisher": "Pub A" }))),
            Ok(volume("b", json!({ "pageCount": 250 }))),
        ]);

        let stats = list.update_all(&catalog).unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(list.books()[0].page_count, 100);
        assert_eq!(list.books()[0].publisher.as_deref(), Some("Pub A"));
        assert_eq!(list.books()[1].page_count, 250);
        assert_eq!(catalog.queries(), vec!["A+A+author".to_string(), "B+B+author".to_string()]);
        assert_eq!(reloaded(&list), list.books().to_vec());
    }

    #[test]
    fn update_all_keeps_failed_and_missing_records_unchanged() {
        let mut list = list_with(&["A", "B", "C"]);
        list.books[0].display_title = Some("A, the full title".to_string());
        list.books[0].page_count = 80;
        list.books[1].categories = vec!["History".to_string()];
        let before = list.books().to_vec();
        let catalog = ScriptedCatalog::new(vec![
            Err(503),
            Ok(empty()),
            Ok(volume("c", json!({ "title": "C!", "pageCount": 5 }))),
        ]);

        let stats = list.update_all(&catalog).unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(list.books()[0], before[0]);
        assert_eq!(list.books()[1], before[1]);
        assert_eq!(list.books()[2].display_title.as_deref(), Some("C!"));
        assert_eq!(list.books()[2].page_count, 5);
    }

    #[test]
    fn update_all_writes_the_store_once() {
        let mut list = list_with(&["A", "B", "C"]);
        let catalog = ScriptedCatalog::new(vec![
            Ok(volume("a", json!({ "pageCount": 10 }))),
            Err(500),
            Ok(volume("c", json!({ "pageCount": 30 }))),
        ]);
        let writes_before = list.store.total_changes();

        let stats = list.update_all(&catalog).unwrap();

        assert_eq!(stats.errors, 1);
        assert_eq!(list.store.total_changes() - writes_before, 1);
        assert_eq!(reloaded(&list), list.books().to_vec());
        assert_eq!(reloaded(&list)[2].page_count, 30);
    }

    #[test]
    fn import_accepts_nulls_and_keeps_unknown_fields() {
        let mut list = list_with(&["A"]);

        let count = list
            .import(r#"[{"title":"X","author":"Y","pages":null,"categories":null,"rating":5}]"#)
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(list.books()[0].page_count, 0);
        assert!(list.books()[0].categories.is_empty());
        let exported: serde_json::Value = serde_json::from_str(&list.export().unwrap()).unwrap();
        assert_eq!(exported[0]["rating"], 5);
        assert_eq!(reloaded(&list)[0].extra.get("rating"), Some(&json!(5)));
    }

    #[test]
    fn totals_sum_pages() {
        let mut list = list_with(&["A", "B"]);
        list.books[0].page_count = 120;
        list.books[1].page_count = 30;
        let totals = list.totals();
        assert_eq!(totals.books, 2);
        assert_eq!(totals.pages, 150);
    }

    #[test]
    fn open_fails_on_corrupt_store() {
        let store = LocalStore::open_in_memory(DEFAULT_STORE_KEY).unwrap();
        store.write_raw("[{]").unwrap();
        assert!(matches!(BookList::open(store), Err(LibraryError::Store(_))));
    }
}

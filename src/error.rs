#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("catalog request failed: {0}")]
    Transport(reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(u16),
    #[error("failed to decode catalog response: {0}")]
    Decode(reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create data directory: {0}")]
    DataDir(std::io::Error),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode book list: {0}")]
    Encode(serde_json::Error),
    #[error("stored book list under '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("no book at position {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("import payload is not a list of books")]
    NotASequence,
    #[error("import payload could not be read: {0}")]
    InvalidImport(serde_json::Error),
    #[error("failed to encode book list: {0}")]
    Export(serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

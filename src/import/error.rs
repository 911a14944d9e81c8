use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot open \"{resource}\": unsupported scheme {scheme}")]
    UnsupportedScheme { resource: String, scheme: String },

    #[error("unsupported bookmark format: {0}")]
    UnsupportedFormat(String),

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("no bookmarks or tracks found in {0}")]
    Empty(String),

    #[error("failed to store collection: {0}")]
    Persist(std::io::Error),
}

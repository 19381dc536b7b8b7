use thiserror::Error;

/// The main error type for arrowlabel operations.
#[derive(Debug, Error)]
pub enum ArrowlabelError {
    /// A value violates its own shape contract: wrong coordinate count,
    /// unknown format tag, non-positive normalization dimensions, or a
    /// plain-structure cell of the wrong JSON shape.
    #[error("malformed value: {0}")]
    MalformedValue(String),

    /// Columnar data does not match the declared storage layout: missing or
    /// mistyped columns, divergent attribute sets across batch rows, or
    /// unequal column lengths.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Reading content behind an image URI failed.
    #[error("failed to read content from '{uri}': {source}")]
    ContentRead {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    /// An arrow-layer failure, surfaced unchanged.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Plain-structure (JSON) conversion failed.
    #[error("plain-structure conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

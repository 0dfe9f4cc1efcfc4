//! Per-document failures. None of these abort a batch: the document is
//! logged, counted and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetailError {
    #[error("detail document is empty")]
    Empty,

    #[error("detail document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("detail data for '{id}' ({kind}) is not an object")]
    NotAnObject { id: String, kind: String },

    #[error("'{kind}' detail produced an invalid record for '{id}': {source}")]
    InvalidOverlay {
        id: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

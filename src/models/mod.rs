//! Shared model types: document references, paging windows and result shapes

use serde::{Deserialize, Serialize};

use crate::error::KrillError;

/// A reference to another logical document
///
/// Stored inline on the referring document as a `{documentType, id}` pair.
/// Equality against a related-document constant compiles into two term
/// leaves over the sub-fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedDocument {
    #[serde(rename = "documentType")]
    pub document_type: String,
    pub id: String,
}

impl RelatedDocument {
    /// Create a new related-document reference
    pub fn new(document_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            id: id.into(),
        }
    }
}

/// An offset/limit slice over a result set
///
/// A limit of zero means "use the configured default" for direct queries
/// and "use the fixed window ceiling" inside the dedup aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    /// Create a new window
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// One page of search results
#[derive(Debug)]
pub struct Page<D> {
    pub documents: Vec<D>,
    /// Backend-tagged continuation token; absent on a terminal page
    pub continuation_token: Option<String>,
}

impl<D> Page<D> {
    pub fn is_terminal(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Outcome of a batched bulk operation
///
/// A batch that exhausts its retries is skipped, not aborted: `succeeded`
/// holds every document from the batches that did go through, and `error`
/// marks the aggregate as partially failed. Never a silent drop.
#[derive(Debug)]
pub struct BatchOutcome<D> {
    pub succeeded: Vec<D>,
    pub error: Option<KrillError>,
}

impl<D> BatchOutcome<D> {
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

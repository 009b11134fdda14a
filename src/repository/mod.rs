//! Search repository
//!
//! Executes compiled queries against a [`SearchBackend`]: paged and
//! unpaged reads, counts, scroll continuation, single-document creation
//! and batched bulk writes. Every read composes the same base query: the
//! soft-delete guard, an optional free-text clause over the schema's
//! full-text fields, and the caller's compiled predicate.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::OnceLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use tracing::{debug, error, warn};

pub mod backend;
pub mod token;

pub use backend::{CountRequest, Hit, SearchBackend, SearchRequest, SearchResponse};
pub use token::TokenBackend;

use crate::config::SearchSettings;
use crate::error::{KrillError, Result};
use crate::expr::Expr;
use crate::models::{BatchOutcome, Page, Window};
use crate::query::{self, sort, DedupAggregation, Query};
use crate::schema::Searchable;

/// Documents per bulk batch
const BATCH_SIZE: usize = 500;
/// Bulk batches in flight at once
const MAX_CONCURRENT_BATCHES: usize = 4;

/// Repository over one document type and a set of physical indices
pub struct Repository<B, D> {
    backend: B,
    settings: SearchSettings,
    _document: PhantomData<fn() -> D>,
}

impl<B: SearchBackend, D: Searchable> Repository<B, D> {
    pub fn new(backend: B, settings: SearchSettings) -> Self {
        Self {
            backend,
            settings,
            _document: PhantomData,
        }
    }

    /// The underlying transport
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One page of documents matching the predicate
    ///
    /// On a composite target the page is produced by the dedup aggregation
    /// and carries no continuation token; paging is driven by the window.
    /// On a single index the page comes from a direct query with an open
    /// scroll context, and the token resumes it.
    pub async fn search_paged(
        &self,
        predicate: Option<&Expr>,
        order_by: Option<&Expr>,
        order_by_desc: Option<&Expr>,
        window: Window,
        include_deleted: bool,
        search_text: Option<&str>,
    ) -> Result<Page<D>> {
        let schema = D::schema();
        let query = self.compose(predicate, include_deleted, search_text)?;
        let sort = sort::sort_for(order_by, order_by_desc, &schema)?;

        if self.settings.is_composite() {
            let aggregation = DedupAggregation::build(window, sort, query, true);
            let request = SearchRequest {
                index: self.settings.index_expression(),
                query: None,
                size: 0,
                from: 0,
                sort: None,
                aggregations: Some(aggregation.to_dsl()),
                scroll: None,
            };
            let response = self.execute_search(&request).await?;
            return Ok(Page {
                documents: response.aggregated_documents()?,
                continuation_token: None,
            });
        }

        let limit = if window.limit == 0 {
            self.settings.page_size
        } else {
            window.limit
        };
        let request = SearchRequest {
            index: self.settings.index_expression(),
            query,
            size: limit,
            from: window.offset,
            sort,
            aggregations: None,
            scroll: Some(self.settings.scroll_lifetime.clone()),
        };
        let response = self.execute_search(&request).await?;
        Ok(Page {
            documents: response.documents()?,
            continuation_token: mint_token(response.scroll_id.as_deref()),
        })
    }

    /// All documents matching the predicate, first page only
    pub async fn search_where(
        &self,
        predicate: &Expr,
        include_deleted: bool,
    ) -> Result<Vec<D>> {
        let page = self
            .search_paged(
                Some(predicate),
                None,
                None,
                Window::default(),
                include_deleted,
                None,
            )
            .await?;
        Ok(page.documents)
    }

    /// First page of the whole document set
    pub async fn search_all(
        &self,
        order_by: Option<&Expr>,
        order_by_desc: Option<&Expr>,
        include_deleted: bool,
    ) -> Result<Page<D>> {
        self.search_paged(
            None,
            order_by,
            order_by_desc,
            Window::default(),
            include_deleted,
            None,
        )
        .await
    }

    /// Count documents matching the predicate
    ///
    /// On a composite target physical copies would inflate a plain count,
    /// so the dedup aggregation runs and its bucket count is returned.
    pub async fn count(
        &self,
        predicate: Option<&Expr>,
        include_deleted: bool,
        search_text: Option<&str>,
    ) -> Result<u64> {
        let query = self.compose(predicate, include_deleted, search_text)?;

        if self.settings.is_composite() {
            let aggregation = DedupAggregation::build(Window::default(), None, query, false);
            let request = SearchRequest {
                index: self.settings.index_expression(),
                query: None,
                size: 0,
                from: 0,
                sort: None,
                aggregations: Some(aggregation.to_dsl()),
                scroll: None,
            };
            let response = self.execute_search(&request).await?;
            return Ok(response.aggregated_count() as u64);
        }

        let request = CountRequest {
            index: self.settings.index_expression(),
            query,
        };
        let body = request.body();
        self.with_retry(&body, || self.backend.count(&request)).await
    }

    /// Fetch one document by id, trying the indices in precedence order
    ///
    /// A missing id is not an error.
    pub async fn get(&self, id: &str) -> Result<Option<D>> {
        for index in &self.settings.indices {
            debug!(index, id, "fetching document");
            if let Some(source) = self.backend.get(index, id).await? {
                return Ok(Some(serde_json::from_value(source)?));
            }
        }
        Ok(None)
    }

    /// Continue a previously returned page
    pub async fn scroll(&self, continuation_token: &str) -> Result<Page<D>> {
        let (backend, raw) = token::decode(continuation_token)?;
        if backend == TokenBackend::DocumentDb {
            return Err(KrillError::InvalidToken(
                "legacy document-store tokens cannot be continued here".to_string(),
            ));
        }
        let body = serde_json::json!({ "scroll_id": raw });
        let response = self
            .with_retry(&body, || {
                self.backend.scroll(&raw, &self.settings.scroll_lifetime)
            })
            .await?;
        Ok(Page {
            documents: response.documents()?,
            continuation_token: mint_token(response.scroll_id.as_deref()),
        })
    }

    /// Create a document, failing if its id already exists
    pub async fn create(&self, document: &D) -> Result<()> {
        let index = self.write_index()?;
        let body = serde_json::to_value(document)?;
        debug!(index, id = document.id(), "creating document");
        match self.backend.create(index, document.id(), body).await {
            Err(KrillError::Http { status: 409, .. }) => Err(KrillError::DocumentConflict),
            other => other,
        }
    }

    /// Upsert documents in bounded concurrent batches
    ///
    /// A batch that exhausts its retries is skipped; its documents are
    /// missing from `succeeded` and the outcome carries a partial-failure
    /// error alongside everything that did go through.
    pub async fn bulk_upsert(&self, documents: Vec<D>) -> Result<BatchOutcome<D>> {
        let index = self.write_index()?.to_string();
        let batches: Vec<Vec<D>> = into_batches(documents, BATCH_SIZE);
        let total = batches.len();

        let outcomes = stream::iter(batches)
            .map(|batch| {
                let index = index.clone();
                async move { self.index_batch(&index, batch).await }
            })
            .buffer_unordered(MAX_CONCURRENT_BATCHES)
            .collect::<Vec<_>>()
            .await;

        let mut succeeded = Vec::new();
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                Ok(batch) => succeeded.extend(batch),
                Err(err) => {
                    error!(error = %err, "bulk batch dropped after retries");
                    failed += 1;
                }
            }
        }
        let error = (failed > 0).then_some(KrillError::PartialBatch { failed, total });
        Ok(BatchOutcome { succeeded, error })
    }

    /// Index one batch, retrying up to the configured count
    async fn index_batch(&self, index: &str, batch: Vec<D>) -> Result<Vec<D>> {
        let mut payload = Vec::with_capacity(batch.len());
        for document in &batch {
            payload.push((document.id().to_string(), serde_json::to_value(document)?));
        }
        let mut last = None;
        for attempt in 1..=self.settings.retry_count.max(1) {
            match self.backend.bulk_index(index, payload.clone()).await {
                Ok(()) => return Ok(batch),
                Err(err) => {
                    warn!(attempt, error = %err, "bulk batch attempt failed");
                    last = Some(err);
                }
            }
        }
        Err(last.unwrap_or_else(|| KrillError::Backend("bulk batch failed".to_string())))
    }

    /// AND together the soft-delete guard, the free-text clause and the
    /// compiled predicate
    fn compose(
        &self,
        predicate: Option<&Expr>,
        include_deleted: bool,
        search_text: Option<&str>,
    ) -> Result<Option<Query>> {
        let schema = D::schema();
        let deleted = (!include_deleted).then(|| Query::term(D::deleted_field(), false));
        let text = search_text.and_then(|text| free_text_query(text, &schema.full_text_paths()));
        let filter = predicate
            .map(|predicate| query::compile(predicate, &schema))
            .transpose()?;
        Ok(Query::and_all(vec![deleted, text, filter]))
    }

    async fn execute_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let body = request.body();
        debug!(index = %request.index, body = %body, "executing search");
        self.with_retry(&body, || self.backend.search(request)).await
    }

    /// Run a backend call up to the configured attempt count
    ///
    /// Exhaustion is terminal: the error carries the index expression, the
    /// last failure and the serialized request body for postmortem.
    async fn with_retry<T, Fut>(
        &self,
        body: &serde_json::Value,
        call: impl Fn() -> Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut last = None;
        for attempt in 1..=self.settings.retry_count.max(1) {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retriable() => {
                    warn!(attempt, error = %err, "search attempt failed");
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        let last = last.map(|err| err.to_string()).unwrap_or_default();
        let index = self.settings.index_expression();
        error!(%index, error = %last, "search attempts exhausted");
        Err(KrillError::ClusterUnavailable {
            index,
            message: last,
            request: body.to_string(),
        })
    }

    fn write_index(&self) -> Result<&str> {
        self.settings
            .indices
            .first()
            .map(String::as_str)
            .ok_or_else(|| KrillError::Backend("no index configured".to_string()))
    }
}

/// Build the free-text clause over the schema's full-text paths
///
/// Email-looking input is matched exactly as a phrase; anything else has
/// its delimiter characters replaced with spaces and the whole string
/// wrapped in a single wildcard pair.
pub(crate) fn free_text_query(text: &str, fields: &[String]) -> Option<Query> {
    let trimmed = text.trim();
    if trimmed.is_empty() || fields.is_empty() {
        return None;
    }
    let query = if email_pattern().is_match(trimmed) {
        format!("\"{trimmed}\"")
    } else {
        let normalized = token_splitter().replace_all(trimmed, " ");
        if normalized.trim().is_empty() {
            return None;
        }
        format!("*{normalized}*")
    };
    Some(Query::QueryString {
        query,
        fields: fields.to_vec(),
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern compiles")
    })
}

/// Characters that end a free-text token
fn token_splitter() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-+@/;,\t\r ]|[\n]").expect("static pattern compiles"))
}

fn mint_token(scroll_id: Option<&str>) -> Option<String> {
    let raw = scroll_id?;
    let encoded = token::encode(TokenBackend::ElasticSearch, raw);
    (!encoded.is_empty()).then_some(encoded)
}

fn into_batches<D>(documents: Vec<D>, size: usize) -> Vec<Vec<D>> {
    let mut batches = Vec::new();
    let mut current = Vec::with_capacity(size.min(documents.len()));
    for document in documents {
        current.push(document);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

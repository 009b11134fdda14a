use serde::{Deserialize, Serialize};

/// Settings for the search repository
///
/// The physical index list is resolved by the caller (index naming and
/// environment prefixing happen outside this crate). More than one entry
/// makes the target composite: queries are deduplicated by document id
/// across indices before windowing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Physical indices the repository queries, in precedence order
    pub indices: Vec<String>,
    /// How many times a failed request is attempted before giving up
    pub retry_count: usize,
    /// Page size used when the caller does not ask for a specific limit
    pub page_size: usize,
    /// Scroll context lifetime handed to the backend, e.g. "1m"
    pub scroll_lifetime: String,
    /// Transport-level timeout; enforced by the backend client, not here
    pub request_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            indices: Vec::new(),
            retry_count: 3,
            page_size: 2000,
            scroll_lifetime: "1m".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl SearchSettings {
    /// Create settings for the given physical indices
    pub fn new(indices: Vec<String>) -> Self {
        Self {
            indices,
            ..Default::default()
        }
    }

    /// Set the retry count
    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the default page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the scroll lifetime
    pub fn with_scroll_lifetime(mut self, lifetime: impl Into<String>) -> Self {
        self.scroll_lifetime = lifetime.into();
        self
    }

    /// Whether the target spans more than one physical index
    pub fn is_composite(&self) -> bool {
        self.indices.len() > 1
    }

    /// The comma-joined index expression sent to the backend
    pub fn index_expression(&self) -> String {
        self.indices.join(",")
    }
}

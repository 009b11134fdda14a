//! Search backend abstraction
//!
//! The repository speaks to the cluster only through this trait, carrying
//! pre-rendered request bodies. Tests swap in an in-memory mock; a
//! production implementation wraps an HTTP client.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{KrillError, Result};
use crate::query::aggregation::{DEDUP_AGGREGATION, TOP_HITS_AGGREGATION};
use crate::query::{Query, SortSpec};

/// One outgoing search request
#[derive(Clone, Debug)]
pub struct SearchRequest {
    /// Comma-joined index expression
    pub index: String,
    pub query: Option<Query>,
    pub size: usize,
    pub from: usize,
    pub sort: Option<SortSpec>,
    /// Pre-rendered `aggs` section, when the dedup pipeline is in play
    pub aggregations: Option<serde_json::Value>,
    /// Scroll lifetime; presence opens a scroll context
    pub scroll: Option<String>,
}

impl SearchRequest {
    /// Render the request body sent over the wire
    pub fn body(&self) -> serde_json::Value {
        let mut body = json!({ "size": self.size, "from": self.from });
        if let Some(query) = &self.query {
            body["query"] = query.to_dsl();
        }
        if let Some(sort) = &self.sort {
            body["sort"] = json!([sort.to_dsl()]);
        }
        if let Some(aggregations) = &self.aggregations {
            body["aggs"] = aggregations.clone();
        }
        body
    }
}

/// One outgoing count request
#[derive(Clone, Debug)]
pub struct CountRequest {
    pub index: String,
    pub query: Option<Query>,
}

impl CountRequest {
    pub fn body(&self) -> serde_json::Value {
        match &self.query {
            Some(query) => json!({ "query": query.to_dsl() }),
            None => json!({ "query": { "match_all": {} } }),
        }
    }
}

/// A single hit as returned by the backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
}

/// Backend response to a search or scroll call
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(rename = "_scroll_id", skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub aggregations: serde_json::Value,
}

impl SearchResponse {
    /// Deserialize the direct hits into documents
    pub fn documents<D: DeserializeOwned>(&self) -> Result<Vec<D>> {
        self.hits
            .iter()
            .map(|hit| serde_json::from_value(hit.source.clone()).map_err(KrillError::from))
            .collect()
    }

    /// Pull one document per dedup bucket out of the aggregation section
    pub fn aggregated_documents<D: DeserializeOwned>(&self) -> Result<Vec<D>> {
        let mut documents = Vec::new();
        for bucket in self.dedup_buckets() {
            let top = &bucket[TOP_HITS_AGGREGATION]["hits"]["hits"][0]["_source"];
            documents.push(serde_json::from_value(top.clone())?);
        }
        Ok(documents)
    }

    /// Number of dedup buckets, i.e. distinct logical documents
    pub fn aggregated_count(&self) -> usize {
        self.dedup_buckets().len()
    }

    fn dedup_buckets(&self) -> Vec<serde_json::Value> {
        self.aggregations[DEDUP_AGGREGATION][DEDUP_AGGREGATION]["buckets"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }
}

/// Transport to the search cluster
///
/// Implementations map transport failures to [`KrillError::Backend`] or
/// [`KrillError::Http`]; the repository owns retries on top.
pub trait SearchBackend: Send + Sync {
    /// Execute a search request
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchResponse>> + Send;

    /// Execute a count request
    fn count(&self, request: &CountRequest) -> impl Future<Output = Result<u64>> + Send;

    /// Fetch a document source by id; `None` when the id does not exist
    fn get(
        &self,
        index: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>>> + Send;

    /// Continue a previously opened scroll context
    fn scroll(
        &self,
        scroll_id: &str,
        lifetime: &str,
    ) -> impl Future<Output = Result<SearchResponse>> + Send;

    /// Create a document, failing if the id already exists
    fn create(
        &self,
        index: &str,
        id: &str,
        document: serde_json::Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Index a batch of documents, overwriting existing ids
    fn bulk_index(
        &self,
        index: &str,
        documents: Vec<(String, serde_json::Value)>,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SortOrder, SortSpec};

    #[test]
    fn test_search_request_body() {
        let request = SearchRequest {
            index: "accounts".to_string(),
            query: Some(Query::term("name.keyword", "Bob")),
            size: 10,
            from: 20,
            sort: Some(SortSpec::new("created").with_order(SortOrder::Descending)),
            aggregations: None,
            scroll: None,
        };
        let body = request.body();
        assert_eq!(body["size"], 10);
        assert_eq!(body["from"], 20);
        assert_eq!(body["query"]["term"]["name.keyword"]["value"], "Bob");
        assert_eq!(body["sort"][0]["created"]["order"], "desc");
        assert!(body.get("aggs").is_none());
    }

    #[test]
    fn test_count_request_defaults_to_match_all() {
        let request = CountRequest {
            index: "accounts".to_string(),
            query: None,
        };
        assert_eq!(request.body(), json!({ "query": { "match_all": {} } }));
    }

    #[test]
    fn test_response_documents() {
        let response = SearchResponse {
            hits: vec![Hit {
                id: "a-1".to_string(),
                index: "accounts".to_string(),
                source: json!({ "value": 7 }),
            }],
            scroll_id: None,
            aggregations: serde_json::Value::Null,
        };
        #[derive(Deserialize)]
        struct Doc {
            value: i64,
        }
        let docs: Vec<Doc> = response.documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].value, 7);
    }

    #[test]
    fn test_aggregated_documents_and_count() {
        let response = SearchResponse {
            hits: Vec::new(),
            scroll_id: None,
            aggregations: json!({
                DEDUP_AGGREGATION: {
                    DEDUP_AGGREGATION: {
                        "buckets": [
                            { TOP_HITS_AGGREGATION: { "hits": { "hits": [
                                { "_source": { "value": 1 } }
                            ] } } },
                            { TOP_HITS_AGGREGATION: { "hits": { "hits": [
                                { "_source": { "value": 2 } }
                            ] } } }
                        ]
                    }
                }
            }),
        };
        #[derive(Deserialize)]
        struct Doc {
            value: i64,
        }
        let docs: Vec<Doc> = response.aggregated_documents().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(response.aggregated_count(), 2);
    }
}

//! Deduplicating paging aggregation
//!
//! Composite (multi-index) targets can hold several physical copies of one
//! logical document. Paging then runs through an aggregation pipeline
//! instead of size/from: a filter aggregation applies the compiled query, a
//! terms aggregation groups copies by `_id`, a single top hit per bucket
//! picks the most authoritative copy, and a bucket-sort stage re-orders and
//! windows the buckets by the sort key.

use serde_json::json;

use crate::models::Window;
use crate::query::dsl::{Query, SortOrder, SortSpec};

/// Outer filter and inner terms aggregation name
pub const DEDUP_AGGREGATION: &str = "duplicateCount";
/// Per-bucket top-hits aggregation name
pub const TOP_HITS_AGGREGATION: &str = "duplicateDocuments";
/// Sort-key extraction aggregation name
pub const ORDER_AGGREGATION: &str = "order";
/// Windowing stage name
pub const BUCKET_SORT_AGGREGATION: &str = "result_bucket_sort";

/// Default window size when the caller passes a zero limit
pub const WINDOW_CEILING: usize = 500;

/// Bucket capacity for the dedup terms aggregation; effectively unbounded
const UNBOUNDED_BUCKETS: i32 = i32::MAX;

/// A built dedup/paging aggregation, ready for wire rendering
#[derive(Clone, Debug, PartialEq)]
pub struct DedupAggregation {
    window: Window,
    sort: Option<SortSpec>,
    query: Option<Query>,
    needs_source: bool,
}

impl DedupAggregation {
    /// Assemble the pipeline
    ///
    /// Without a sort key the windowing stage is omitted entirely: the
    /// bucket order is undefined, so offset/limit over it would page
    /// through garbage. Windowed dedup requires a sort.
    pub fn build(
        window: Window,
        sort: Option<SortSpec>,
        query: Option<Query>,
        needs_source: bool,
    ) -> Self {
        Self {
            window,
            sort,
            query,
            needs_source,
        }
    }

    /// Render into the engine's wire form for the `aggs` request section
    pub fn to_dsl(&self) -> serde_json::Value {
        let filter = match &self.query {
            Some(query) => query.to_dsl(),
            None => json!({ "match_all": {} }),
        };

        let mut top_hits = json!({
            "size": 1,
            "sort": [ { "_index": { "order": "desc" } } ]
        });
        if !self.needs_source {
            top_hits["_source"] = json!({ "includes": ["_id"] });
        }

        let mut buckets = json!({
            TOP_HITS_AGGREGATION: { "top_hits": top_hits }
        });
        if let Some(sort) = &self.sort {
            let order = sort.order.unwrap_or(SortOrder::Ascending);
            let limit = if self.window.limit == 0 {
                WINDOW_CEILING
            } else {
                self.window.limit
            };
            buckets[ORDER_AGGREGATION] = json!({ "max": { "field": sort.field } });
            buckets[BUCKET_SORT_AGGREGATION] = json!({
                "bucket_sort": {
                    "sort": [ { ORDER_AGGREGATION: { "order": order.key() } } ],
                    "from": self.window.offset,
                    "size": limit
                }
            });
        }

        json!({
            DEDUP_AGGREGATION: {
                "filter": filter,
                "aggs": {
                    DEDUP_AGGREGATION: {
                        "terms": {
                            "field": "_id",
                            "size": UNBOUNDED_BUCKETS,
                            "shard_size": UNBOUNDED_BUCKETS
                        },
                        "aggs": buckets
                    }
                }
            }
        })
    }
}

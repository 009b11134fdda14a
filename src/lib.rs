//! krill: predicate-to-search-DSL compilation and execution
//!
//! Callers describe document queries as boolean predicate trees over their
//! own types. The compiler validates and partially evaluates the tree, then
//! lowers it into the search engine's query DSL; the repository executes
//! the result with retries, dedup-aware paging over composite index sets,
//! and continuation tokens.
//!
//! ```
//! use krill::expr::Expr;
//! use krill::query;
//! use krill::schema::{DocumentSchema, FieldKind};
//!
//! let schema = DocumentSchema::builder()
//!     .field("name", FieldKind::Str)
//!     .field("age", FieldKind::Int)
//!     .build();
//!
//! let predicate = Expr::parameter("x")
//!     .member("Name")
//!     .eq(Expr::constant("Bob"))
//!     .and(Expr::parameter("x").member("Age").gt(Expr::constant(21)));
//!
//! let compiled = query::compile(&predicate, &schema).unwrap();
//! let body = compiled.to_dsl();
//! assert_eq!(body["bool"]["must"][0]["term"]["name.keyword"]["value"], "Bob");
//! ```

pub mod config;
pub mod error;
pub mod expr;
pub mod models;
pub mod query;
pub mod repository;
pub mod schema;

pub use config::SearchSettings;
pub use error::{KrillError, Result};
pub use expr::Expr;
pub use models::{BatchOutcome, Page, RelatedDocument, Window};
pub use query::{DedupAggregation, Query, SortOrder, SortSpec};
pub use repository::{Repository, SearchBackend};
pub use schema::{DocumentSchema, FieldKind, Searchable};

/// Version of the krill library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

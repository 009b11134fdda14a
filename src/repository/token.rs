//! Continuation tokens
//!
//! A page's continuation token is the raw backend token tagged with the
//! store it belongs to: `es;<token>` for the search engine, `db;<token>`
//! for the legacy document store. Tokens minted before tagging existed
//! carry no delimiter and decode as legacy.

use crate::error::{KrillError, Result};

const DELIMITER: char = ';';

/// The store a continuation token belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenBackend {
    /// Legacy document store
    DocumentDb,
    ElasticSearch,
}

impl TokenBackend {
    fn prefix(self) -> &'static str {
        match self {
            TokenBackend::DocumentDb => "db",
            TokenBackend::ElasticSearch => "es",
        }
    }
}

/// Tag a raw backend token; an empty token stays empty (terminal page)
pub fn encode(backend: TokenBackend, raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    format!("{}{}{}", backend.prefix(), DELIMITER, raw)
}

/// Split a tagged token into its backend and raw parts
pub fn decode(token: &str) -> Result<(TokenBackend, String)> {
    if token.is_empty() {
        return Err(KrillError::InvalidToken("empty token".to_string()));
    }
    let segments: Vec<&str> = token.split(DELIMITER).collect();
    match segments.as_slice() {
        // Delimiter-less tokens predate tagging and came from the legacy store.
        [raw] => Ok((TokenBackend::DocumentDb, (*raw).to_string())),
        [prefix, raw] => match *prefix {
            "db" => Ok((TokenBackend::DocumentDb, (*raw).to_string())),
            "es" => Ok((TokenBackend::ElasticSearch, (*raw).to_string())),
            other => Err(KrillError::InvalidToken(format!(
                "unknown backend prefix '{other}'"
            ))),
        },
        _ => Err(KrillError::InvalidToken(format!(
            "expected at most one '{DELIMITER}' delimiter, got: {token}"
        ))),
    }
}

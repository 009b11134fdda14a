//! Related-document equality translation
//!
//! A related-document reference compares by identity: type and id must both
//! match. A null comparison tests for absence of the reference field.

use crate::error::{KrillError, Result};
use crate::expr::{Expr, Value};
use crate::models::RelatedDocument;
use crate::query::dsl::Query;
use crate::query::field;
use crate::schema::DocumentSchema;

/// Translate `member == related` or `member == null`
pub fn translate(member: &Expr, constant: &Value, schema: &DocumentSchema) -> Result<Query> {
    match constant {
        Value::Null => Ok(Query::not_exists(field::resolve_path(member, schema)?)),
        Value::Related(reference) => identity(member, reference, schema),
        other => Err(KrillError::UnsupportedOperands {
            left: member.to_string(),
            right: other.to_string(),
        }),
    }
}

fn identity(member: &Expr, reference: &RelatedDocument, schema: &DocumentSchema) -> Result<Query> {
    let type_field = field::resolve_related(member, "documentType", schema)?;
    let id_field = field::resolve_related(member, "id", schema)?;
    Ok(Query::term(type_field, reference.document_type.clone())
        .and(Query::term(id_field, reference.id.clone())))
}

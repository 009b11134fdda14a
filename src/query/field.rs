//! Field-name resolution
//!
//! Maps a member-access chain to the wire field name: drops the lambda
//! parameter, lower-camel-cases every dotted segment, strips an
//! optional-unwrap step, and decides whether the query should target the
//! non-analyzed `.keyword` sibling. Resolution is a pure function of the
//! chain and the static schema; it never touches runtime data.

use crate::error::{KrillError, Result};
use crate::expr::{Expr, UnaryOp};
use crate::schema::{DocumentSchema, FieldKind};

/// Outcome of field resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedField {
    /// Dotted lower-camel-cased path, including any `.keyword` suffix
    pub name: String,
    pub is_keyword: bool,
}

const KEYWORD_SUFFIX: &str = "keyword";

/// Resolve a member chain for equality-style use
///
/// In `to_lower` (case-insensitive) mode the string-kind keyword rule is
/// replaced by a narrow heuristic: `.keyword` is appended only when the
/// member name contains "email". Wire-visible behavior; do not broaden it.
pub fn resolve(expr: &Expr, schema: &DocumentSchema, to_lower: bool) -> Result<ResolvedField> {
    let raw = segments(expr)?;
    let (path, leaf_raw, kind) = lookup(expr, schema, &raw)?;
    let is_keyword = if to_lower {
        leaf_raw.to_lowercase().contains("email")
    } else {
        kind.map_or(false, FieldKind::is_keyword)
    };
    Ok(finish(path, is_keyword))
}

/// Resolve a member chain to its bare path, with no keyword decision
///
/// Range comparisons and related-document existence checks query the field
/// itself, never the `.keyword` sibling.
pub fn resolve_path(expr: &Expr, schema: &DocumentSchema) -> Result<String> {
    let raw = segments(expr)?;
    let (path, _, _) = lookup(expr, schema, &raw)?;
    Ok(path)
}

/// Resolve the "any element of a nested collection matches" case
///
/// Concatenates the collection-root path and the inner lambda's member
/// path, then applies the same casing and keyword rules against the
/// combined path. With no inner member, resolves the bare collection
/// (collection-of-primitives element, or an existence check target).
pub fn resolve_any(
    collection: &Expr,
    inner: Option<&Expr>,
    schema: &DocumentSchema,
) -> Result<ResolvedField> {
    let mut raw = segments(collection)?;
    match inner {
        Some(inner_member) => {
            raw.extend(segments(inner_member)?);
            let (path, _, kind) = lookup(inner_member, schema, &raw)?;
            Ok(finish(path, kind.map_or(false, FieldKind::is_keyword)))
        }
        None => {
            let (path, _, kind) = lookup(collection, schema, &raw)?;
            Ok(finish(path, kind.map_or(false, FieldKind::is_keyword)))
        }
    }
}

/// Resolve a sub-field of a related-document reference
///
/// The `id` sub-field is unconditionally queried through `.keyword`.
pub fn resolve_related(expr: &Expr, sub_field: &str, schema: &DocumentSchema) -> Result<String> {
    let base = resolve_path(expr, schema)?;
    let mut name = format!("{base}.{sub_field}");
    if sub_field == "id" {
        name.push('.');
        name.push_str(KEYWORD_SUFFIX);
    }
    Ok(name)
}

/// Collect raw member names root-to-leaf, dropping the lambda parameter
/// and any conversion wrappers
fn segments(expr: &Expr) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Member { base, name } => {
                names.push(name.clone());
                current = base;
            }
            Expr::Unary {
                op: UnaryOp::Convert,
                operand,
            } => current = operand,
            Expr::Parameter(_) => break,
            other => {
                return Err(KrillError::FieldResolution {
                    expression: expr.to_string(),
                    reason: format!(
                        "member chain must be rooted at the predicate parameter, found {}",
                        other.kind()
                    ),
                })
            }
        }
    }
    if names.is_empty() {
        return Err(KrillError::FieldResolution {
            expression: expr.to_string(),
            reason: "expected at least one member access".to_string(),
        });
    }
    names.reverse();
    Ok(names)
}

/// Camel and join the chain, strip an optional-unwrap step, and look the
/// path up in the schema
///
/// Returns the resolved path, the raw leaf member name (pre-strip, for the
/// email heuristic) and the field kind when the schema knows the path.
fn lookup(
    expr: &Expr,
    schema: &DocumentSchema,
    raw: &[String],
) -> Result<(String, String, Option<FieldKind>)> {
    let cameled: Vec<String> = raw.iter().map(|s| camel(s)).collect();
    let path = cameled.join(".");
    let leaf_raw = raw.last().expect("segments is non-empty").clone();

    if let Some(meta) = schema.field(&path) {
        ensure_parents_traversable(expr, schema, &cameled, cameled.len() - 1)?;
        return Ok((path, leaf_raw, Some(meta.kind)));
    }

    // Accessing `.value` on an optional field resolves against the wrapped
    // field, not a literal "value" property.
    if cameled.len() > 1 && cameled.last().map(String::as_str) == Some("value") {
        let parent = cameled[..cameled.len() - 1].join(".");
        if let Some(meta) = schema.field(&parent) {
            let leaf = raw[raw.len() - 2].clone();
            return Ok((parent, leaf, Some(meta.kind)));
        }
    }

    // Weekday is the one allow-listed member of a date value.
    if cameled.len() > 1 && cameled.last().map(String::as_str) == Some("dayOfWeek") {
        let parent = cameled[..cameled.len() - 1].join(".");
        if schema.field(&parent).map(|m| m.kind) == Some(FieldKind::Date) {
            return Ok((path, leaf_raw, None));
        }
    }

    // Diagnose member access into a primitive distinctly from a field the
    // schema simply does not know.
    if cameled.len() > 1 {
        let parent = cameled[..cameled.len() - 1].join(".");
        if let Some(meta) = schema.field(&parent) {
            if meta.kind.is_terminal() {
                return Err(KrillError::FieldResolution {
                    expression: expr.to_string(),
                    reason: format!(
                        "most likely you are trying to access a primitive's member; \
                         '{parent}' is not traversable"
                    ),
                });
            }
        }
    }

    Err(KrillError::FieldResolution {
        expression: expr.to_string(),
        reason: format!("unknown field path '{path}'"),
    })
}

/// Every intermediate segment must name a traversable field
fn ensure_parents_traversable(
    expr: &Expr,
    schema: &DocumentSchema,
    cameled: &[String],
    leaf_index: usize,
) -> Result<()> {
    for end in 1..leaf_index {
        let parent = cameled[..end].join(".");
        if let Some(meta) = schema.field(&parent) {
            if meta.kind.is_terminal() {
                return Err(KrillError::FieldResolution {
                    expression: expr.to_string(),
                    reason: format!(
                        "most likely you are trying to access a primitive's member; \
                         '{parent}' is not traversable"
                    ),
                });
            }
        }
    }
    Ok(())
}

fn finish(path: String, is_keyword: bool) -> ResolvedField {
    let name = if is_keyword {
        format!("{path}.{KEYWORD_SUFFIX}")
    } else {
        path.clone()
    };
    ResolvedField { name, is_keyword }
}

/// Lowercase the first character of one dotted segment
fn camel(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::schema::{DocumentSchema, FieldKind};

    fn account_schema() -> DocumentSchema {
        DocumentSchema::builder()
            .field("id", FieldKind::Str)
            .field("name", FieldKind::Str)
            .field("email", FieldKind::Str)
            .field("age", FieldKind::Int)
            .field("created", FieldKind::Date)
            .field("status", FieldKind::StrEnum)
            .field("tags", FieldKind::StrList)
            .field("owner", FieldKind::Str)
            .field("deleted", FieldKind::Bool)
            .field("profile", FieldKind::Object)
            .field("profile.displayName", FieldKind::Str)
            .field("phones", FieldKind::Collection)
            .field("phones.number", FieldKind::Str)
            .field("phones.extension", FieldKind::Int)
            .field("parent", FieldKind::Related)
            .build()
    }

    fn member(path: &[&str]) -> Expr {
        let mut expr = Expr::parameter("x");
        for segment in path {
            expr = expr.member(*segment);
        }
        expr
    }

    #[test]
    fn test_string_field_gets_keyword() {
        let resolved = resolve(&member(&["Name"]), &account_schema(), false).unwrap();
        assert_eq!(resolved.name, "name.keyword");
        assert!(resolved.is_keyword);
    }

    #[test]
    fn test_numeric_field_stays_plain() {
        let resolved = resolve(&member(&["Age"]), &account_schema(), false).unwrap();
        assert_eq!(resolved.name, "age");
        assert!(!resolved.is_keyword);
    }

    #[test]
    fn test_string_enum_and_list_get_keyword() {
        let schema = account_schema();
        assert_eq!(
            resolve(&member(&["Status"]), &schema, false).unwrap().name,
            "status.keyword"
        );
        assert_eq!(
            resolve(&member(&["Tags"]), &schema, false).unwrap().name,
            "tags.keyword"
        );
    }

    #[test]
    fn test_nested_path_camel_cased() {
        let resolved = resolve(&member(&["Profile", "DisplayName"]), &account_schema(), false)
            .unwrap();
        assert_eq!(resolved.name, "profile.displayName.keyword");
    }

    #[test]
    fn test_optional_unwrap_stripped() {
        let resolved = resolve(&member(&["Created", "Value"]), &account_schema(), false).unwrap();
        assert_eq!(resolved.name, "created");
    }

    #[test]
    fn test_weekday_allowed_on_date() {
        let resolved =
            resolve(&member(&["Created", "DayOfWeek"]), &account_schema(), false).unwrap();
        assert_eq!(resolved.name, "created.dayOfWeek");
        assert!(!resolved.is_keyword);
    }

    #[test]
    fn test_primitive_member_rejected() {
        let err = resolve(&member(&["Name", "Length"]), &account_schema(), false).unwrap_err();
        match err {
            KrillError::FieldResolution { reason, .. } => {
                assert!(reason.contains("primitive"), "reason was: {reason}");
            }
            other => panic!("expected FieldResolution, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = resolve(&member(&["Nickname"]), &account_schema(), false).unwrap_err();
        assert!(matches!(err, KrillError::FieldResolution { .. }));
    }

    #[test]
    fn test_to_lower_email_heuristic() {
        let schema = account_schema();
        let email = resolve(&member(&["Email"]), &schema, true).unwrap();
        assert_eq!(email.name, "email.keyword");

        // to_lower on a non-email string drops the keyword suffix
        let name = resolve(&member(&["Name"]), &schema, true).unwrap();
        assert_eq!(name.name, "name");
        assert!(!name.is_keyword);
    }

    #[test]
    fn test_resolve_path_never_keyword() {
        let path = resolve_path(&member(&["Name"]), &account_schema()).unwrap();
        assert_eq!(path, "name");
    }

    #[test]
    fn test_resolve_any_concatenates() {
        let collection = member(&["Phones"]);
        let inner = Expr::parameter("p").member("Number");
        let resolved = resolve_any(&collection, Some(&inner), &account_schema()).unwrap();
        assert_eq!(resolved.name, "phones.number.keyword");
    }

    #[test]
    fn test_resolve_any_bare_collection() {
        let collection = member(&["Tags"]);
        let resolved = resolve_any(&collection, None, &account_schema()).unwrap();
        assert_eq!(resolved.name, "tags.keyword");
    }

    #[test]
    fn test_resolve_related_sub_fields() {
        let schema = account_schema();
        let parent = member(&["Parent"]);
        assert_eq!(
            resolve_related(&parent, "documentType", &schema).unwrap(),
            "parent.documentType"
        );
        assert_eq!(
            resolve_related(&parent, "id", &schema).unwrap(),
            "parent.id.keyword"
        );
    }

    #[test]
    fn test_convert_wrappers_ignored() {
        let expr = Expr::parameter("x").member("Age").convert();
        let resolved = resolve(&expr, &account_schema(), false).unwrap();
        assert_eq!(resolved.name, "age");
    }
}

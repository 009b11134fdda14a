//! Static field metadata for document types
//!
//! The compiler never inspects runtime data: every field-resolution decision
//! (keyword sub-fields, full-text discovery, primitive-member guards) is a
//! pure function of this table, built once per document type.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Static type of a document field, as it appears on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Analyzed text with a non-analyzed `.keyword` sibling
    Str,
    /// List of strings; queried through the `.keyword` sibling
    StrList,
    /// Enumeration serialized by variant name; queried through `.keyword`
    StrEnum,
    Bool,
    Int,
    Float,
    Date,
    /// Inline `{documentType, id}` reference to another document
    Related,
    /// Nested object; member access continues into its fields
    Object,
    /// Collection of nested objects, addressed through `any` predicates
    Collection,
}

impl FieldKind {
    /// Whether equality against this field targets the `.keyword` sibling
    pub fn is_keyword(self) -> bool {
        matches!(self, FieldKind::Str | FieldKind::StrList | FieldKind::StrEnum)
    }

    /// Whether member access can continue past a field of this kind
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            FieldKind::Object | FieldKind::Collection | FieldKind::Related | FieldKind::Date
        )
    }
}

/// Metadata for one resolvable field path
#[derive(Clone, Debug)]
pub struct FieldMeta {
    pub kind: FieldKind,
    /// Participates in free-text search
    pub full_text: bool,
    /// System-only; excluded from free-text search
    pub internal: bool,
}

impl FieldMeta {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            full_text: false,
            internal: false,
        }
    }
}

/// Field-metadata table for a document type, keyed by dotted
/// lower-camel-cased path matching the wire property naming
#[derive(Clone, Debug, Default)]
pub struct DocumentSchema {
    fields: BTreeMap<String, FieldMeta>,
}

impl DocumentSchema {
    /// Start building a schema
    pub fn builder() -> DocumentSchemaBuilder {
        DocumentSchemaBuilder {
            schema: DocumentSchema::default(),
        }
    }

    /// Look up metadata for a dotted field path
    pub fn field(&self, path: &str) -> Option<&FieldMeta> {
        self.fields.get(path)
    }

    /// Paths tagged for free-text search, in declaration order
    pub fn full_text_paths(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, meta)| meta.full_text && !meta.internal)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

/// Builder for [`DocumentSchema`]
pub struct DocumentSchemaBuilder {
    schema: DocumentSchema,
}

impl DocumentSchemaBuilder {
    /// Declare a field
    pub fn field(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        self.schema
            .fields
            .insert(path.into(), FieldMeta::new(kind));
        self
    }

    /// Declare a field that participates in free-text search
    pub fn full_text_field(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        let mut meta = FieldMeta::new(kind);
        meta.full_text = true;
        self.schema.fields.insert(path.into(), meta);
        self
    }

    /// Declare a system-only field, hidden from free-text search
    pub fn internal_field(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        let mut meta = FieldMeta::new(kind);
        meta.internal = true;
        self.schema.fields.insert(path.into(), meta);
        self
    }

    pub fn build(self) -> DocumentSchema {
        self.schema
    }
}

/// A document type queryable through the repository
///
/// The contract with the type is deliberately thin: which members exist and
/// their static kinds (via the schema), an id, and a soft-delete flag. The
/// `deleted` field must be declared in the schema as [`FieldKind::Bool`].
pub trait Searchable: Serialize + DeserializeOwned {
    /// Static field-metadata table for this type
    fn schema() -> DocumentSchema;

    /// Logical document id, shared across physical indices
    fn id(&self) -> &str;

    /// Wire name of the soft-delete flag
    fn deleted_field() -> &'static str {
        "deleted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> DocumentSchema {
        DocumentSchema::builder()
            .field("id", FieldKind::Str)
            .full_text_field("name", FieldKind::Str)
            .full_text_field("email", FieldKind::Str)
            .field("age", FieldKind::Int)
            .internal_field("revision", FieldKind::Int)
            .build()
    }

    #[test]
    fn test_field_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.field("age").unwrap().kind, FieldKind::Int);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_full_text_paths_exclude_internal() {
        let schema = sample_schema();
        let paths = schema.full_text_paths();
        assert_eq!(paths, vec!["email".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_keyword_kinds() {
        assert!(FieldKind::Str.is_keyword());
        assert!(FieldKind::StrList.is_keyword());
        assert!(FieldKind::StrEnum.is_keyword());
        assert!(!FieldKind::Int.is_keyword());
        assert!(!FieldKind::Date.is_keyword());
    }
}

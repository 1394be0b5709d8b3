//! Typed `OpenAPI` v3 document model.
//!
//! Only the parts the compiler reads are modeled; unknown keys are ignored.
//! Schemas are classified into [`SchemaKind`] at load time so the compiler
//! dispatches with a single `match`.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml_ng::Value;

use crate::error::Result;

/// Prefix of local schema references.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
/// Prefix of local parameter references.
pub const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";
/// Prefix of local request body references.
pub const REQUEST_BODY_REF_PREFIX: &str = "#/components/requestBodies/";
/// Prefix of local response references.
pub const RESPONSE_REF_PREFIX: &str = "#/components/responses/";

/// Media type whose schema is compiled for request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A parsed `OpenAPI` document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    /// `openapi` version string (e.g., `3.0.3`).
    pub openapi: String,
    /// Document metadata.
    pub info: Info,
    /// Path templates to path items, sorted by path.
    pub paths: BTreeMap<String, PathItem>,
    /// Reusable definitions.
    pub components: Components,
}

impl Document {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`](crate::Error::Yaml) if the input is not a valid document.
    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(input)?)
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the input is not a valid document.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a document from disk; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }
}

/// The `info` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Info {
    /// API title; the default package name is derived from it.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// API version.
    pub version: String,
}

/// The `components` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Components {
    /// Named schemas, sorted by key.
    pub schemas: BTreeMap<String, SchemaOrRef>,
    /// Named parameters.
    pub parameters: BTreeMap<String, RefOr<Parameter>>,
    /// Named request bodies.
    #[serde(rename = "requestBodies")]
    pub request_bodies: BTreeMap<String, RefOr<RequestBody>>,
    /// Named responses.
    pub responses: BTreeMap<String, RefOr<Response>>,
}

/// Either a `$ref` or an inline value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// `{"$ref": "..."}`; sibling keys are ignored.
    Ref {
        /// The reference string.
        #[serde(rename = "$ref")]
        reference: String,
    },
    /// An inline definition.
    Item(T),
}

/// A schema node: `$ref` or inline schema.
pub type SchemaOrRef = RefOr<Schema>;

/// An inline schema, classified by shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawSchema")]
pub struct Schema {
    /// `title`; overrides the name hint of the compiled message or enum.
    pub title: Option<String>,
    /// `description`; becomes a leading comment.
    pub description: Option<String>,
    /// `deprecated`.
    pub deprecated: bool,
    /// `nullable` (3.0) or a `"null"` member in a 3.1 type list.
    pub nullable: bool,
    /// Raw `x-propertyOrder` value, validated at compile time.
    pub property_order: Option<Value>,
    /// The schema's shape.
    pub kind: SchemaKind,
}

/// One case per schema shape, in dispatch order.
#[derive(Debug, Clone, Default)]
pub enum SchemaKind {
    /// Object whose `additionalProperties` is a schema.
    Map(Box<SchemaOrRef>),
    /// `enum` literals in document order.
    Enum(Vec<Value>),
    /// `oneOf` alternatives.
    OneOf(Vec<SchemaOrRef>),
    /// `anyOf` alternatives, compiled like `oneOf`.
    AnyOf(Vec<SchemaOrRef>),
    /// `allOf` variants plus the node's own object members.
    AllOf {
        /// Merged variants.
        variants: Vec<SchemaOrRef>,
        /// Own properties, merged after the variants.
        properties: Vec<(String, SchemaOrRef)>,
        /// Own required property names.
        required: Vec<String>,
    },
    /// `type: boolean`.
    Boolean,
    /// `type: integer`.
    Integer {
        /// `format` (e.g., `int64`).
        format: Option<String>,
    },
    /// `type: number`.
    Number {
        /// `format` (e.g., `float`).
        format: Option<String>,
    },
    /// `type: string`.
    String {
        /// `format` (e.g., `byte`).
        format: Option<String>,
    },
    /// `type: array`.
    Array {
        /// Item schema; `None` when absent.
        items: Option<Box<SchemaOrRef>>,
    },
    /// `type: object`, or a schema with `properties` and no type.
    Object {
        /// Properties in document order.
        properties: Vec<(String, SchemaOrRef)>,
        /// Required property names.
        required: Vec<String>,
    },
    /// Nothing recognizable (free-form `{}`).
    #[default]
    Any,
}

impl Schema {
    /// `true` for shapes that compile to a message with named members.
    #[must_use]
    pub fn is_object_like(&self) -> bool {
        matches!(
            self.kind,
            SchemaKind::Object { .. } | SchemaKind::AllOf { .. }
        )
    }
}

/// The `parameter` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Location: `path`, `query`, `header` or `cookie`.
    #[serde(rename = "in")]
    pub location: String,
    /// Free-form description.
    pub description: Option<String>,
    /// `required`.
    pub required: bool,
    /// `deprecated`.
    pub deprecated: bool,
    /// Value schema.
    pub schema: Option<SchemaOrRef>,
}

/// The `requestBody` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    /// Free-form description.
    pub description: Option<String>,
    /// Media types to payload definitions.
    pub content: BTreeMap<String, MediaType>,
    /// `required`.
    pub required: bool,
}

impl RequestBody {
    /// Schema of the `application/json` payload, if any.
    #[must_use]
    pub fn json_schema(&self) -> Option<&SchemaOrRef> {
        self.content
            .get(JSON_MEDIA_TYPE)
            .and_then(|m| m.schema.as_ref())
    }
}

/// The `response` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Response {
    /// Free-form description.
    pub description: Option<String>,
    /// Media types to payload definitions.
    pub content: BTreeMap<String, MediaType>,
}

impl Response {
    /// Schema of the `application/json` payload, if any.
    #[must_use]
    pub fn json_schema(&self) -> Option<&SchemaOrRef> {
        self.content
            .get(JSON_MEDIA_TYPE)
            .and_then(|m| m.schema.as_ref())
    }
}

/// The `mediaType` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaType {
    /// Payload schema.
    pub schema: Option<SchemaOrRef>,
}

/// HTTP verbs in the order operations are visited.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// The `pathItem` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathItem {
    /// Summary shared by all operations.
    pub summary: Option<String>,
    /// Description shared by all operations.
    pub description: Option<String>,
    /// Parameters shared by all operations.
    pub parameters: Vec<RefOr<Parameter>>,
    /// `GET` operation.
    pub get: Option<Operation>,
    /// `PUT` operation.
    pub put: Option<Operation>,
    /// `POST` operation.
    pub post: Option<Operation>,
    /// `DELETE` operation.
    pub delete: Option<Operation>,
    /// `OPTIONS` operation.
    pub options: Option<Operation>,
    /// `HEAD` operation.
    pub head: Option<Operation>,
    /// `PATCH` operation.
    pub patch: Option<Operation>,
    /// `TRACE` operation.
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Look up the operation for a lower-case verb.
    #[must_use]
    pub fn operation(&self, verb: &str) -> Option<&Operation> {
        match verb {
            "get" => self.get.as_ref(),
            "put" => self.put.as_ref(),
            "post" => self.post.as_ref(),
            "delete" => self.delete.as_ref(),
            "options" => self.options.as_ref(),
            "head" => self.head.as_ref(),
            "patch" => self.patch.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }

    /// Declared operations in [`HTTP_METHODS`] order.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        HTTP_METHODS
            .iter()
            .filter_map(|&verb| self.operation(verb).map(|op| (verb, op)))
    }
}

/// The `operation` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Operation {
    /// `operationId`.
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// `deprecated`.
    pub deprecated: bool,
    /// Operation-level parameters.
    pub parameters: Vec<RefOr<Parameter>>,
    /// Request body.
    #[serde(rename = "requestBody")]
    pub request_body: Option<RefOr<RequestBody>>,
    /// Status code (or `default`) to response, in document order.
    #[serde(deserialize_with = "ordered_map")]
    pub responses: Vec<(String, RefOr<Response>)>,
}

impl Operation {
    /// The response declared for `status`.
    #[must_use]
    pub fn response(&self, status: &str) -> Option<&RefOr<Response>> {
        self.responses
            .iter()
            .find(|(code, _)| code == status)
            .map(|(_, response)| response)
    }
}

/// Strip a local reference prefix and unescape the JSON pointer segment.
///
/// Returns `None` for references into other sections or other documents.
#[must_use]
pub fn ref_name<'r>(reference: &'r str, prefix: &str) -> Option<std::borrow::Cow<'r, str>> {
    let name = reference.strip_prefix(prefix)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    if name.contains('~') {
        Some(name.replace("~1", "/").replace("~0", "~").into())
    } else {
        Some(name.into())
    }
}

// --- Raw schema -------------------------------------------------------------

/// Literal schema keys before classification.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSchema {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    schema_type: Option<Value>,
    format: Option<String>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    #[serde(rename = "oneOf")]
    one_of: Option<Vec<SchemaOrRef>>,
    #[serde(rename = "anyOf")]
    any_of: Option<Vec<SchemaOrRef>>,
    #[serde(rename = "allOf")]
    all_of: Option<Vec<SchemaOrRef>>,
    items: Option<Box<SchemaOrRef>>,
    #[serde(deserialize_with = "ordered_map")]
    properties: Vec<(String, SchemaOrRef)>,
    required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    additional_properties: Option<AdditionalProperties>,
    deprecated: bool,
    nullable: bool,
    #[serde(rename = "x-propertyOrder")]
    property_order: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
#[allow(dead_code)]
enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaOrRef>),
}

impl From<RawSchema> for Schema {
    fn from(raw: RawSchema) -> Self {
        let (type_name, null_in_type) = primary_type(raw.schema_type.as_ref());
        let has_properties = !raw.properties.is_empty();

        let kind = if let Some(AdditionalProperties::Schema(value)) = raw.additional_properties {
            SchemaKind::Map(value)
        } else if let Some(values) = raw.enum_values {
            SchemaKind::Enum(values)
        } else if let Some(variants) = raw.one_of {
            SchemaKind::OneOf(variants)
        } else if let Some(variants) = raw.any_of {
            SchemaKind::AnyOf(variants)
        } else if let Some(variants) = raw.all_of {
            SchemaKind::AllOf {
                variants,
                properties: raw.properties,
                required: raw.required,
            }
        } else {
            match type_name.as_deref() {
                Some("boolean") => SchemaKind::Boolean,
                Some("integer") => SchemaKind::Integer { format: raw.format },
                Some("number") => SchemaKind::Number { format: raw.format },
                Some("string") => SchemaKind::String { format: raw.format },
                Some("array") => SchemaKind::Array { items: raw.items },
                Some("object") => SchemaKind::Object {
                    properties: raw.properties,
                    required: raw.required,
                },
                None if has_properties => SchemaKind::Object {
                    properties: raw.properties,
                    required: raw.required,
                },
                _ => SchemaKind::Any,
            }
        };

        Self {
            title: raw.title,
            description: raw.description,
            deprecated: raw.deprecated,
            nullable: raw.nullable || null_in_type,
            property_order: raw.property_order,
            kind,
        }
    }
}

/// Resolve `type: string` or 3.1 `type: [string, "null"]` to the non-null type.
fn primary_type(value: Option<&Value>) -> (Option<String>, bool) {
    match value {
        Some(Value::String(s)) => (Some(s.clone()), false),
        Some(Value::Sequence(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            let primary = names.into_iter().find(|t| *t != "null").map(String::from);
            (primary, nullable)
        }
        _ => (None, false),
    }
}

// --- Ordered maps -------------------------------------------------------------

/// Map key that accepts strings and integers (YAML `200:` keys).
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = MapKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// Deserialize a mapping into `(key, value)` pairs, keeping document order.
fn ordered_map<'de, D, T>(deserializer: D) -> std::result::Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((MapKey(key), value)) = map.next_entry::<MapKey, T>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn schema(yaml: &str) -> Schema {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn classifies_primitives() {
        assert!(matches!(schema("type: boolean").kind, SchemaKind::Boolean));
        assert!(matches!(
            schema("type: integer\nformat: int64").kind,
            SchemaKind::Integer { format: Some(f) } if f == "int64"
        ));
        assert!(matches!(
            schema("type: string").kind,
            SchemaKind::String { format: None }
        ));
        assert!(matches!(schema("{}").kind, SchemaKind::Any));
    }

    #[test]
    fn properties_keep_document_order() {
        let s = schema(indoc! {"
            type: object
            required: [zeta]
            properties:
              zeta: {type: string}
              alpha: {type: integer}
              mid: {$ref: '#/components/schemas/Mid'}
        "});
        let SchemaKind::Object {
            properties,
            required,
        } = s.kind
        else {
            panic!("expected object");
        };
        let names: Vec<&str> = properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(required, ["zeta"]);
        assert!(matches!(&properties[2].1, RefOr::Ref { reference } if reference.ends_with("/Mid")));
    }

    #[test]
    fn classification_precedence() {
        let s = schema("type: object\nadditionalProperties: {type: string}");
        assert!(matches!(s.kind, SchemaKind::Map(_)));

        let s = schema("type: object\nadditionalProperties: true\nproperties: {a: {type: string}}");
        assert!(matches!(s.kind, SchemaKind::Object { .. }));

        let s = schema("type: string\nenum: [a, b]");
        assert!(matches!(s.kind, SchemaKind::Enum(ref v) if v.len() == 2));

        let s = schema("allOf: [{$ref: '#/components/schemas/Base'}]\nproperties: {x: {type: string}}");
        assert!(matches!(s.kind, SchemaKind::AllOf { ref properties, .. } if properties.len() == 1));

        let s = schema("properties: {x: {type: string}}");
        assert!(matches!(s.kind, SchemaKind::Object { .. }));
    }

    #[test]
    fn type_list_with_null_is_nullable() {
        let s = schema("type: [string, 'null']");
        assert!(s.nullable);
        assert!(matches!(s.kind, SchemaKind::String { .. }));
    }

    #[test]
    fn integer_status_keys_are_accepted() {
        let op: Operation = serde_yaml_ng::from_str(indoc! {"
            responses:
              200:
                description: ok
              default:
                description: error
        "})
        .unwrap();
        assert!(op.response("200").is_some());
        assert!(op.response("default").is_some());
        assert!(op.response("404").is_none());
    }

    #[test]
    fn operations_follow_verb_order() {
        let item: PathItem = serde_yaml_ng::from_str(indoc! {"
            post: {}
            get: {}
            delete: {}
        "})
        .unwrap();
        let verbs: Vec<&str> = item.operations().map(|(verb, _)| verb).collect();
        assert_eq!(verbs, ["get", "post", "delete"]);
    }

    #[test]
    fn ref_names() {
        assert_eq!(
            ref_name("#/components/schemas/Pet", SCHEMA_REF_PREFIX).as_deref(),
            Some("Pet")
        );
        assert_eq!(
            ref_name("#/components/schemas/a~1b", SCHEMA_REF_PREFIX).as_deref(),
            Some("a/b")
        );
        assert!(ref_name("other.yaml#/components/schemas/Pet", SCHEMA_REF_PREFIX).is_none());
        assert!(ref_name("#/components/parameters/Id", SCHEMA_REF_PREFIX).is_none());
    }

    #[test]
    fn json_documents_parse() {
        let doc = Document::from_json(
            r#"{"openapi":"3.0.0","info":{"title":"Pets","version":"1"},
                "components":{"schemas":{"Pet":{"type":"object",
                "properties":{"b":{"type":"string"},"a":{"type":"string"}}}}}}"#,
        )
        .unwrap();
        let RefOr::Item(pet) = &doc.components.schemas["Pet"] else {
            panic!("expected inline schema");
        };
        let SchemaKind::Object { properties, .. } = &pet.kind else {
            panic!("expected object");
        };
        assert_eq!(properties[0].0, "b");
        assert_eq!(doc.info.title, "Pets");
    }
}

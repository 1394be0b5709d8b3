//! Recursive schema translation.
//!
//! Every `compile_*` function returns `Option<MessageBuilder>`: `None` (or an
//! empty message) means the schema contributes nothing and callers drop it.
//! Enums come back wrapped in a field-less carrier message so the caller
//! decides where the enum lives.

use serde_yaml_ng::Value;
use tracing::{debug, warn};

use crate::builder::{EnumBuilder, FieldBuilder, MessageBuilder, WrappedField};
use crate::descriptor::field_descriptor_proto::Type;
use crate::error::{Error, Result};
use crate::openapi::{RefOr, Schema, SchemaKind, SchemaOrRef};

use super::components::request_body_marker;
use super::{non_empty, Compiler, Resolved, WRAPPERS_PROTO};

/// Extension controlling field order.
const PROPERTY_ORDER: &str = "x-propertyOrder";

impl<'a> Compiler<'a> {
    /// Compile a schema node under `hint`, expanding a `$ref` in place.
    pub(super) fn compile_schema_ref(
        &mut self,
        hint: &str,
        node: &'a SchemaOrRef,
    ) -> Result<Option<MessageBuilder>> {
        match node {
            RefOr::Item(schema) => self.compile_schema(hint, schema),
            RefOr::Ref { reference } => {
                let (key, target) = self.lookup_schema(reference)?;
                self.enter(&key)?;
                let compiled = self.compile_schema_ref(hint, target);
                self.leave();
                compiled
            }
        }
    }

    /// Compile an inline schema. `title` overrides `hint` as the message name.
    pub(super) fn compile_schema(
        &mut self,
        hint: &str,
        schema: &'a Schema,
    ) -> Result<Option<MessageBuilder>> {
        let name = self
            .names
            .normalize_message_name(schema.title.as_deref().unwrap_or(hint));

        let mut compiled = match &schema.kind {
            SchemaKind::Map(value) => self.scoped("additionalProperties", |c| {
                c.compile_schema_ref(&name, value)
            })?,
            SchemaKind::Enum(values) => Some(self.compile_enum(&name, schema, values)),
            SchemaKind::OneOf(variants) => Some(self.compile_union(&name, schema, variants, "oneOf")?),
            SchemaKind::AnyOf(variants) => {
                debug!(schema = %self.context(), "anyOf compiled as oneOf");
                Some(self.compile_union(&name, schema, variants, "anyOf")?)
            }
            SchemaKind::AllOf {
                variants,
                properties,
                required,
            } => Some(self.compile_all_of(&name, schema, variants, properties, required)?),
            SchemaKind::Boolean
            | SchemaKind::Integer { .. }
            | SchemaKind::Number { .. }
            | SchemaKind::String { .. } => Some(self.compile_primitive(&name, schema)?),
            SchemaKind::Array { items } => self.compile_array(&name, schema, items.as_deref())?,
            SchemaKind::Object {
                properties,
                required,
            } => Some(self.compile_object(&name, schema, properties, required)?),
            SchemaKind::Any => None,
        };

        if let (Some(message), Some(order)) = (compiled.as_mut(), schema.property_order.as_ref()) {
            self.apply_property_order(message, order)?;
        }
        Ok(compiled)
    }

    fn compile_enum(&self, name: &str, schema: &Schema, values: &[Value]) -> MessageBuilder {
        let prefix = self.names.normalize_enum_value_name(name);
        let mut enumeration = EnumBuilder::new(name);
        enumeration.set_comment(schema.description.as_deref());
        enumeration.add_value(format!("{prefix}_UNSPECIFIED"));

        for value in values {
            let Some(literal) = enum_literal(value) else {
                warn!(schema = %self.context(), "skipping non-scalar enum literal");
                continue;
            };
            let mut normalized = self.names.normalize_enum_value_name(&literal);
            if normalized.is_empty() {
                normalized = "EMPTY".to_string();
            }
            let value_name = if self.config.prefix_enum_values {
                format!("{prefix}_{}", normalized.trim_start_matches('_'))
            } else {
                normalized
            };
            if enumeration.add_value(value_name.as_str()) {
                continue;
            }
            let renamed = (2..)
                .map(|n| format!("{value_name}_{n}"))
                .find(|candidate| enumeration.add_value(candidate.as_str()));
            warn!(
                schema = %self.context(),
                value = %value_name,
                renamed = renamed.as_deref().unwrap_or_default(),
                "duplicate enum value renamed"
            );
        }

        let mut carrier = MessageBuilder::new(name);
        carrier.add_nested_enum(enumeration);
        carrier
    }

    /// `oneOf` / `anyOf`: one oneof group holding a field per non-empty variant.
    fn compile_union(
        &mut self,
        name: &str,
        schema: &Schema,
        variants: &'a [SchemaOrRef],
        label: &str,
    ) -> Result<MessageBuilder> {
        let mut message = MessageBuilder::new(name);
        message.set_comment(schema.description.as_deref());
        let group = message.add_oneof(self.names.normalize_field_name(name));

        for (i, variant) in variants.iter().enumerate() {
            let field = self.scoped(format!("{label}[{i}]"), |c| {
                c.union_member(&mut message, name, i, variant)
            })?;
            if let Some(field) = field {
                let field_name = field.name().to_string();
                if !message.add_field(field.in_oneof(group)) {
                    warn!(schema = %self.context(), field = %field_name, "skipping duplicate oneof variant");
                }
            }
        }
        Ok(message)
    }

    fn union_member(
        &mut self,
        parent: &mut MessageBuilder,
        base: &str,
        index: usize,
        variant: &'a SchemaOrRef,
    ) -> Result<Option<FieldBuilder>> {
        match variant {
            RefOr::Ref { reference } => {
                let resolved = self.resolve_schema_ref(reference)?;
                Ok(self.referenced_field(None, &resolved))
            }
            RefOr::Item(schema) => {
                let fallback = format!("{base}_{}", index + 1);
                let hint = schema.title.as_deref().unwrap_or(&fallback);
                let Some(child) = non_empty(self.compile_schema(hint, schema)?) else {
                    return Ok(None);
                };
                let field_name = self.names.normalize_field_name(child.name());
                self.embed(parent, field_name, child, false).map(Some)
            }
        }
    }

    /// `allOf`: merge object-like variants first-wins, then own properties.
    fn compile_all_of(
        &mut self,
        name: &str,
        schema: &Schema,
        variants: &'a [SchemaOrRef],
        properties: &'a [(String, SchemaOrRef)],
        required: &[String],
    ) -> Result<MessageBuilder> {
        let mut message = MessageBuilder::new(name);
        message.set_comment(schema.description.as_deref());
        for (i, variant) in variants.iter().enumerate() {
            self.scoped(format!("allOf[{i}]"), |c| c.merge_variant(&mut message, variant))?;
        }
        self.add_properties(&mut message, properties, required)?;
        Ok(message)
    }

    fn merge_variant(&mut self, message: &mut MessageBuilder, variant: &'a SchemaOrRef) -> Result<()> {
        match variant {
            RefOr::Ref { reference } => {
                let (key, target) = self.lookup_schema(reference)?;
                self.enter(&key)?;
                let merged = self.merge_variant(message, target);
                self.leave();
                merged
            }
            RefOr::Item(schema) => {
                if !schema.is_object_like() {
                    warn!(schema = %self.context(), "skipping allOf variant that is not an object");
                    return Ok(());
                }
                let hint = message.name().to_string();
                if let Some(child) = self.compile_schema(&hint, schema)? {
                    message.merge(child);
                }
                Ok(())
            }
        }
    }

    /// Single-field wrapper holding a scalar.
    fn compile_primitive(&self, name: &str, schema: &Schema) -> Result<MessageBuilder> {
        let field_type = scalar_type(&schema.kind).ok_or_else(|| Error::MissingFieldType {
            schema: self.context(),
        })?;
        let mut message = MessageBuilder::wrapper(name);
        message.set_comment(schema.description.as_deref());
        message.add_field(FieldBuilder::new(
            self.names.normalize_field_name(name),
            field_type,
        ));
        Ok(message)
    }

    /// Single-field wrapper holding a repeated item.
    fn compile_array(
        &mut self,
        name: &str,
        schema: &Schema,
        items: Option<&'a SchemaOrRef>,
    ) -> Result<Option<MessageBuilder>> {
        let Some(items) = items else {
            debug!(schema = %self.context(), "array without items");
            return Ok(None);
        };
        let mut message = MessageBuilder::wrapper(name);
        message.set_comment(schema.description.as_deref());
        let field_name = self.names.normalize_field_name(name);

        let field = self.scoped("items", |c| c.array_item(&mut message, name, field_name, items))?;
        if let Some(field) = field {
            message.add_field(field.repeated());
        }
        Ok(Some(message))
    }

    fn array_item(
        &mut self,
        parent: &mut MessageBuilder,
        name: &str,
        field_name: String,
        items: &'a SchemaOrRef,
    ) -> Result<Option<FieldBuilder>> {
        match items {
            RefOr::Ref { reference } => {
                let resolved = self.resolve_schema_ref(reference)?;
                Ok(self.referenced_field(Some(field_name), &resolved))
            }
            RefOr::Item(schema) => {
                let fallback = format!("{name}Item");
                let hint = schema.title.as_deref().unwrap_or(&fallback);
                let Some(child) = non_empty(self.compile_schema(hint, schema)?) else {
                    return Ok(None);
                };
                self.embed(parent, field_name, child, false).map(Some)
            }
        }
    }

    fn compile_object(
        &mut self,
        name: &str,
        schema: &Schema,
        properties: &'a [(String, SchemaOrRef)],
        required: &[String],
    ) -> Result<MessageBuilder> {
        let mut message = MessageBuilder::new(name);
        message.set_comment(schema.description.as_deref());
        self.add_properties(&mut message, properties, required)?;
        Ok(message)
    }

    pub(super) fn add_properties(
        &mut self,
        message: &mut MessageBuilder,
        properties: &'a [(String, SchemaOrRef)],
        required: &[String],
    ) -> Result<()> {
        for (name, property) in properties {
            let is_required = required.iter().any(|r| r == name);
            self.scoped(format!("properties.{name}"), |c| {
                c.add_property(message, name, property, is_required, None)
            })?;
        }
        Ok(())
    }

    /// Add one named member (property, parameter or body) to `parent`.
    ///
    /// `doc` overrides the schema description as the field comment.
    pub(super) fn add_property(
        &mut self,
        parent: &mut MessageBuilder,
        name: &str,
        property: &'a SchemaOrRef,
        required: bool,
        doc: Option<&str>,
    ) -> Result<()> {
        let field_name = self.names.normalize_field_name(name);
        let field = match property {
            RefOr::Ref { reference } => {
                let resolved = self.resolve_schema_ref(reference)?;
                self.referenced_field(Some(field_name), &resolved)
                    .map(|f| f.with_comment(doc))
            }
            RefOr::Item(schema) => {
                let hint = self.names.normalize_message_name(name);
                let Some(child) = non_empty(self.compile_schema(&hint, schema)?) else {
                    debug!(schema = %self.context(), "skipping empty property");
                    return Ok(());
                };
                let field = self.embed(parent, field_name, child, true)?;
                Some(
                    self.apply_presence(field, schema, required)
                        .with_comment(doc.or(schema.description.as_deref())),
                )
            }
        };

        if let Some(field) = field {
            let field_name = field.name().to_string();
            if !parent.add_field(field) {
                warn!(schema = %self.context(), field = %field_name, "skipping duplicate field");
            }
        }
        Ok(())
    }

    /// Attach a compiled child to `parent` and return the field that references it.
    ///
    /// Wrappers collapse into their single field (hoisting its nested types)
    /// unless that field is repeated and `allow_repeated` is false. Enum
    /// carriers become enum fields. Anything else is nested, except that a
    /// child named like a registered component of the same kind references
    /// that component instead.
    fn embed(
        &mut self,
        parent: &mut MessageBuilder,
        field_name: String,
        child: MessageBuilder,
        allow_repeated: bool,
    ) -> Result<FieldBuilder> {
        let child = match child.into_enum() {
            Ok(mut enumeration) => {
                let Some(name) = self.nested_name(parent, enumeration.name(), true)? else {
                    return Ok(FieldBuilder::enumeration(field_name, enumeration.name()));
                };
                enumeration.set_name(name.as_str());
                parent.add_nested_enum(enumeration);
                return Ok(FieldBuilder::enumeration(field_name, name));
            }
            Err(child) => child,
        };

        let collapsible = allow_repeated || !child.fields().iter().any(FieldBuilder::is_repeated);
        let mut child = if collapsible {
            match child.into_wrapped() {
                Ok(WrappedField {
                    field,
                    nested_messages,
                    nested_enums,
                }) => {
                    for nested in nested_messages {
                        parent.add_nested_message(nested);
                    }
                    for nested in nested_enums {
                        parent.add_nested_enum(nested);
                    }
                    return Ok(field.renamed(field_name));
                }
                Err(child) => child,
            }
        } else {
            child
        };

        let Some(name) = self.nested_name(parent, child.name(), false)? else {
            return Ok(FieldBuilder::message(field_name, child.name()));
        };
        child.set_name(name.as_str());
        parent.add_nested_message(child);
        Ok(FieldBuilder::message(field_name, name))
    }

    /// Name to nest an inline type under, or `None` to reference the
    /// top-level component of the same name and kind.
    ///
    /// When the component has the other kind, the inline type is nested under
    /// a fresh name so neither shadows the other.
    fn nested_name(&mut self, parent: &MessageBuilder, name: &str, is_enum: bool) -> Result<Option<String>> {
        if !self.file.has_component(name) {
            return Ok(Some(name.to_string()));
        }
        match self.component_type(name)? {
            Some(Resolved::Enum(_)) if is_enum => Ok(None),
            Some(Resolved::Message(_)) if !is_enum => Ok(None),
            Some(_) => {
                let renamed = self.unique_nested_name(parent, name, if is_enum { "Enum" } else { "Message" });
                warn!(
                    schema = %self.context(),
                    component = name,
                    renamed = %renamed,
                    "inline type named like a component of another kind"
                );
                Ok(Some(renamed))
            }
            None => Ok(Some(name.to_string())),
        }
    }

    /// The top-level type a registered component name stands for, compiling
    /// the component if needed. `None` when no top-level type carries `name`.
    fn component_type(&mut self, name: &str) -> Result<Option<Resolved>> {
        let doc = self.doc;
        let names = &self.names;
        let schema = doc
            .components
            .schemas
            .iter()
            .find(|(key, _)| names.normalize_message_name(key) == name);
        let body = doc
            .components
            .request_bodies
            .iter()
            .find(|(key, _)| names.normalize_message_name(key) == name);

        let resolved = if let Some((key, schema)) = schema {
            if self.in_progress.contains(key) {
                // Inline types are only embedded while compiling a message.
                Resolved::Message(name.to_string())
            } else {
                self.emit_component(key, schema)?
            }
        } else if let Some((key, body)) = body {
            if self.in_progress.contains(&request_body_marker(key)) {
                Resolved::Message(name.to_string())
            } else {
                self.emit_request_body(key, body)?
            }
        } else {
            return Ok(None);
        };

        let declared = matches!(&resolved, Resolved::Message(n) | Resolved::Enum(n) if n == name);
        Ok(declared.then_some(resolved))
    }

    /// `<name><suffix>`, numbered until it clashes with no component, top-level
    /// type or type already nested in `parent`.
    fn unique_nested_name(&self, parent: &MessageBuilder, name: &str, suffix: &str) -> String {
        let taken = |candidate: &str| {
            self.file.has_component(candidate) || self.file.has_type(candidate) || parent.has_nested(candidate)
        };
        let base = format!("{name}{suffix}");
        let mut candidate = base.clone();
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{base}{n}");
            n += 1;
        }
        candidate
    }

    /// Field referencing an emitted component; `None` for empty components.
    fn referenced_field(&self, field_name: Option<String>, resolved: &Resolved) -> Option<FieldBuilder> {
        let (type_name, is_enum) = match resolved {
            Resolved::Message(name) => (name, false),
            Resolved::Enum(name) => (name, true),
            Resolved::Empty => return None,
        };
        let field_name = field_name.unwrap_or_else(|| self.names.normalize_field_name(type_name));
        Some(if is_enum {
            FieldBuilder::enumeration(field_name, type_name.as_str())
        } else {
            FieldBuilder::message(field_name, type_name.as_str())
        })
    }

    /// Presence for not-required scalars: a wrapper type or proto3 `optional`.
    fn apply_presence(&mut self, mut field: FieldBuilder, schema: &Schema, required: bool) -> FieldBuilder {
        if required || field.is_repeated() || !field.is_scalar() {
            return field;
        }
        if self.config.wrap_primitives {
            if let Some(wrapper) = wrapper_type(field.field_type()) {
                self.file.add_dependency(WRAPPERS_PROTO);
                field.set_type(Type::Message, Some(wrapper.to_string()));
                return field;
            }
        }
        if schema.nullable {
            return field.optional();
        }
        field
    }

    fn apply_property_order(&self, message: &mut MessageBuilder, order: &Value) -> Result<()> {
        let invalid = || Error::InvalidExtension {
            schema: self.context(),
            extension: PROPERTY_ORDER.to_string(),
            reason: "expected a list of property names".to_string(),
        };
        let Value::Sequence(entries) = order else {
            return Err(invalid());
        };
        let names = entries
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(|name| self.names.normalize_field_name(name))
                    .ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>>>()?;
        message.sort_fields(&names);
        Ok(())
    }
}

/// Scalar type for a primitive schema, by `format`.
fn scalar_type(kind: &SchemaKind) -> Option<Type> {
    Some(match kind {
        SchemaKind::Boolean => Type::Bool,
        SchemaKind::Integer { format } => match format.as_deref() {
            Some("int64") => Type::Int64,
            _ => Type::Int32,
        },
        SchemaKind::Number { format } => match format.as_deref() {
            None | Some("double") => Type::Double,
            Some("int64" | "long" | "integer" | "int32") => Type::Int64,
            Some(_) => Type::Float,
        },
        SchemaKind::String { format } => match format.as_deref() {
            Some("byte") => Type::Bytes,
            _ => Type::String,
        },
        _ => return None,
    })
}

/// `google.protobuf` wrapper message for a scalar type.
fn wrapper_type(field_type: Type) -> Option<&'static str> {
    Some(match field_type {
        Type::Double => "google.protobuf.DoubleValue",
        Type::Float => "google.protobuf.FloatValue",
        Type::Int64 => "google.protobuf.Int64Value",
        Type::Uint64 => "google.protobuf.UInt64Value",
        Type::Int32 => "google.protobuf.Int32Value",
        Type::Uint32 => "google.protobuf.UInt32Value",
        Type::Bool => "google.protobuf.BoolValue",
        Type::String => "google.protobuf.StringValue",
        Type::Bytes => "google.protobuf.BytesValue",
        _ => return None,
    })
}

/// Text of an enum literal; `None` for `null` and structured values.
fn enum_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            let text = n.to_string();
            Some(match text.strip_prefix('-') {
                Some(magnitude) => format!("neg_{magnitude}"),
                None => text,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types_by_format() {
        let integer = |f: Option<&str>| SchemaKind::Integer {
            format: f.map(String::from),
        };
        let number = |f: Option<&str>| SchemaKind::Number {
            format: f.map(String::from),
        };
        let string = |f: Option<&str>| SchemaKind::String {
            format: f.map(String::from),
        };

        assert_eq!(scalar_type(&integer(Some("int64"))), Some(Type::Int64));
        assert_eq!(scalar_type(&integer(Some("int32"))), Some(Type::Int32));
        assert_eq!(scalar_type(&integer(None)), Some(Type::Int32));
        assert_eq!(scalar_type(&number(None)), Some(Type::Double));
        assert_eq!(scalar_type(&number(Some("double"))), Some(Type::Double));
        assert_eq!(scalar_type(&number(Some("float"))), Some(Type::Float));
        assert_eq!(scalar_type(&number(Some("long"))), Some(Type::Int64));
        assert_eq!(scalar_type(&string(Some("byte"))), Some(Type::Bytes));
        assert_eq!(scalar_type(&string(Some("date-time"))), Some(Type::String));
        assert_eq!(scalar_type(&SchemaKind::Boolean), Some(Type::Bool));
        assert_eq!(scalar_type(&SchemaKind::Any), None);
    }

    #[test]
    fn wrapper_types() {
        assert_eq!(wrapper_type(Type::String), Some("google.protobuf.StringValue"));
        assert_eq!(wrapper_type(Type::Int64), Some("google.protobuf.Int64Value"));
        assert_eq!(wrapper_type(Type::Message), None);
    }

    #[test]
    fn enum_literals() {
        let parse = |yaml: &str| enum_literal(&serde_yaml_ng::from_str(yaml).unwrap());
        assert_eq!(parse("active").as_deref(), Some("active"));
        assert_eq!(parse("true").as_deref(), Some("true"));
        assert_eq!(parse("42").as_deref(), Some("42"));
        assert_eq!(parse("-1").as_deref(), Some("neg_1"));
        assert_eq!(parse("1.5").as_deref(), Some("1.5"));
        assert_eq!(parse("null"), None);
    }
}

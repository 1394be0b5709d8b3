use std::collections::HashSet;

use crate::descriptor::field_descriptor_proto::{Label, Type};
use crate::descriptor::{DescriptorProto, FieldDescriptorProto, Location, OneofDescriptorProto};

use super::{child_path, path, push_comment, EnumBuilder};

/// One message field under construction.
///
/// The number is assigned when the field is accepted by
/// [`MessageBuilder::add_field`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBuilder {
    name: String,
    number: i32,
    field_type: Type,
    type_name: Option<String>,
    repeated: bool,
    proto3_optional: bool,
    oneof_index: Option<i32>,
    comment: Option<String>,
}

impl FieldBuilder {
    /// A scalar field (or any type, with [`with_type_name`](Self::with_type_name)).
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: Type) -> Self {
        Self {
            name: name.into(),
            number: 0,
            field_type,
            type_name: None,
            repeated: false,
            proto3_optional: false,
            oneof_index: None,
            comment: None,
        }
    }

    /// A field referencing a message type by (relative or absolute) name.
    #[must_use]
    pub fn message(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, Type::Message).with_type_name(type_name)
    }

    /// A field referencing an enum type by name.
    #[must_use]
    pub fn enumeration(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, Type::Enum).with_type_name(type_name)
    }

    /// Set the referenced type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set the leading comment.
    #[must_use]
    pub fn with_comment(mut self, comment: Option<&str>) -> Self {
        self.comment = comment.map(str::to_string);
        self
    }

    /// Mark as `repeated`.
    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Mark as proto3 `optional` (explicit presence).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.proto3_optional = true;
        self
    }

    /// Place the field in the oneof group `index`.
    #[must_use]
    pub fn in_oneof(mut self, index: i32) -> Self {
        self.oneof_index = Some(index);
        self
    }

    /// The same field under a new name, unnumbered and outside any oneof.
    #[must_use]
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: 0,
            oneof_index: None,
            ..self
        }
    }

    /// Replace the field type, keeping name and labels.
    pub fn set_type(&mut self, field_type: Type, type_name: Option<String>) {
        self.field_type = field_type;
        self.type_name = type_name;
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field number, `0` until accepted by a message.
    #[must_use]
    pub fn number(&self) -> i32 {
        self.number
    }

    /// Protobuf type.
    #[must_use]
    pub fn field_type(&self) -> Type {
        self.field_type
    }

    /// Referenced type name for message and enum fields.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// `true` when labelled `repeated`.
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    /// `true` when marked proto3 `optional`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.proto3_optional
    }

    /// Oneof group index, if any.
    #[must_use]
    pub fn oneof_index(&self) -> Option<i32> {
        self.oneof_index
    }

    /// `true` for every type except messages, enums and groups.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self.field_type, Type::Message | Type::Enum | Type::Group)
    }

    fn build(self, synthetic_oneof: Option<i32>) -> FieldDescriptorProto {
        let label = if self.repeated {
            Label::Repeated
        } else {
            Label::Optional
        };
        FieldDescriptorProto {
            name: Some(self.name),
            number: Some(self.number),
            label: Some(label as i32),
            r#type: Some(self.field_type as i32),
            type_name: self.type_name,
            oneof_index: self.oneof_index.or(synthetic_oneof),
            proto3_optional: synthetic_oneof.map(|_| true),
            ..Default::default()
        }
    }
}

/// The single field and nested types released by [`MessageBuilder::into_wrapped`].
#[derive(Debug)]
pub struct WrappedField {
    /// The wrapped field.
    pub field: FieldBuilder,
    /// Nested messages the field may reference.
    pub nested_messages: Vec<MessageBuilder>,
    /// Nested enums the field may reference.
    pub nested_enums: Vec<EnumBuilder>,
}

/// A message under construction.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    name: String,
    comment: Option<String>,
    fields: Vec<FieldBuilder>,
    nested_messages: Vec<MessageBuilder>,
    nested_enums: Vec<EnumBuilder>,
    oneofs: Vec<String>,
    field_names: HashSet<String>,
    nested_names: HashSet<String>,
    wrapper: bool,
}

impl MessageBuilder {
    /// An empty message.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An empty message that exists only to hold a single value.
    ///
    /// When embedded in a parent, a wrapper with one field collapses into
    /// that field (see [`is_wrapper`](Self::is_wrapper)).
    #[must_use]
    pub fn wrapper(name: impl Into<String>) -> Self {
        Self {
            wrapper: true,
            ..Self::new(name)
        }
    }

    /// Message name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the message. Fields referencing its nested types are unaffected.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Leading comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Set the leading comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// Fields in number order.
    #[must_use]
    pub fn fields(&self) -> &[FieldBuilder] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldBuilder> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Nested messages in insertion order.
    #[must_use]
    pub fn nested_messages(&self) -> &[MessageBuilder] {
        &self.nested_messages
    }

    /// Nested enums in insertion order.
    #[must_use]
    pub fn nested_enums(&self) -> &[EnumBuilder] {
        &self.nested_enums
    }

    /// `true` if a nested message or enum named `name` exists.
    #[must_use]
    pub fn has_nested(&self, name: &str) -> bool {
        self.nested_names.contains(name)
    }

    /// Oneof group names in index order.
    #[must_use]
    pub fn oneofs(&self) -> &[String] {
        &self.oneofs
    }

    /// Append a field and assign it the next number.
    ///
    /// Returns `false` (and drops the field) if the name is already taken.
    pub fn add_field(&mut self, mut field: FieldBuilder) -> bool {
        if !self.field_names.insert(field.name.clone()) {
            return false;
        }
        field.number = field_number(self.fields.len());
        self.fields.push(field);
        true
    }

    /// Nest a message; a second message with the same name is ignored.
    pub fn add_nested_message(&mut self, nested: MessageBuilder) -> bool {
        if !self.nested_names.insert(nested.name.clone()) {
            return false;
        }
        self.nested_messages.push(nested);
        true
    }

    /// Nest an enum; a second type with the same name is ignored.
    pub fn add_nested_enum(&mut self, nested: EnumBuilder) -> bool {
        if !self.nested_names.insert(nested.name().to_string()) {
            return false;
        }
        self.nested_enums.push(nested);
        true
    }

    /// Declare a oneof group and return its index.
    pub fn add_oneof(&mut self, name: impl Into<String>) -> i32 {
        self.oneofs.push(name.into());
        index(self.oneofs.len() - 1)
    }

    /// Reorder fields so the names in `order` come first, in that order.
    ///
    /// Fields not named keep their relative order after the named ones.
    /// Numbers are reassigned 1..N.
    pub fn sort_fields<S: AsRef<str>>(&mut self, order: &[S]) {
        let mut remaining = std::mem::take(&mut self.fields);
        let mut sorted = Vec::with_capacity(remaining.len());
        for name in order {
            if let Some(pos) = remaining.iter().position(|f| f.name == name.as_ref()) {
                sorted.push(remaining.remove(pos));
            }
        }
        sorted.append(&mut remaining);
        for (i, field) in sorted.iter_mut().enumerate() {
            field.number = field_number(i);
        }
        self.fields = sorted;
    }

    /// Merge another message's members into this one; existing names win.
    pub fn merge(&mut self, other: MessageBuilder) {
        let offset = index(self.oneofs.len());
        self.oneofs.extend(other.oneofs);
        for mut field in other.fields {
            field.oneof_index = field.oneof_index.map(|i| i + offset);
            self.add_field(field);
        }
        for nested in other.nested_messages {
            self.add_nested_message(nested);
        }
        for nested in other.nested_enums {
            self.add_nested_enum(nested);
        }
    }

    /// `true` with no fields, nested messages or nested enums.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.nested_messages.is_empty() && self.nested_enums.is_empty()
    }

    /// `true` for a single-value wrapper holding exactly one plain field.
    #[must_use]
    pub fn is_wrapper(&self) -> bool {
        self.wrapper && self.fields.len() == 1 && self.oneofs.is_empty()
    }

    /// The type a field referencing this message would take.
    ///
    /// One field: that field's type. No fields and a single nested enum:
    /// `ENUM`. Anything else: `MESSAGE`.
    #[must_use]
    pub fn field_type(&self) -> Type {
        match self.fields.as_slice() {
            [only] => only.field_type,
            [] if self.nested_enums.len() == 1 && self.nested_messages.is_empty() => Type::Enum,
            _ => Type::Message,
        }
    }

    /// Take out the single nested enum of a field-less enum carrier.
    ///
    /// # Errors
    ///
    /// Returns the message unchanged when it is not an enum carrier.
    pub fn into_enum(mut self) -> Result<EnumBuilder, Self> {
        if self.fields.is_empty() && self.nested_messages.is_empty() && self.nested_enums.len() == 1
        {
            if let Some(nested) = self.nested_enums.pop() {
                return Ok(nested);
            }
        }
        Err(self)
    }

    /// Take apart a wrapper (see [`is_wrapper`](Self::is_wrapper)).
    ///
    /// # Errors
    ///
    /// Returns the message unchanged when it is not a wrapper.
    pub fn into_wrapped(mut self) -> Result<WrappedField, Self> {
        if !self.is_wrapper() {
            return Err(self);
        }
        match self.fields.pop() {
            Some(field) => Ok(WrappedField {
                field,
                nested_messages: self.nested_messages,
                nested_enums: self.nested_enums,
            }),
            None => Err(self),
        }
    }

    pub(crate) fn locations(&self, at: &[i32], out: &mut Vec<Location>) {
        push_comment(out, at, self.comment.as_deref());
        for (i, field) in self.fields.iter().enumerate() {
            push_comment(
                out,
                &child_path(at, path::MESSAGE_FIELD, i),
                field.comment.as_deref(),
            );
        }
        for (i, nested) in self.nested_messages.iter().enumerate() {
            nested.locations(&child_path(at, path::MESSAGE_NESTED, i), out);
        }
        for (i, nested) in self.nested_enums.iter().enumerate() {
            nested.locations(&child_path(at, path::MESSAGE_ENUM, i), out);
        }
    }

    /// Freeze into a descriptor.
    ///
    /// proto3 `optional` fields get the synthetic oneofs `protoc` would
    /// generate, declared after the real ones.
    #[must_use]
    pub fn build(self) -> DescriptorProto {
        let mut oneof_decl: Vec<OneofDescriptorProto> = self
            .oneofs
            .into_iter()
            .map(|name| OneofDescriptorProto {
                name: Some(name),
                options: None,
            })
            .collect();

        let mut field = Vec::with_capacity(self.fields.len());
        for f in self.fields {
            let synthetic = if f.proto3_optional && f.oneof_index.is_none() && !f.repeated {
                oneof_decl.push(OneofDescriptorProto {
                    name: Some(format!("_{}", f.name)),
                    options: None,
                });
                Some(index(oneof_decl.len() - 1))
            } else {
                None
            };
            field.push(f.build(synthetic));
        }

        DescriptorProto {
            name: Some(self.name),
            field,
            nested_type: self
                .nested_messages
                .into_iter()
                .map(MessageBuilder::build)
                .collect(),
            enum_type: self
                .nested_enums
                .into_iter()
                .map(EnumBuilder::build)
                .collect(),
            oneof_decl,
            ..Default::default()
        }
    }
}

fn index(i: usize) -> i32 {
    i32::try_from(i).unwrap_or(i32::MAX)
}

/// Field numbers start at 1.
fn field_number(i: usize) -> i32 {
    index(i).saturating_add(1)
}

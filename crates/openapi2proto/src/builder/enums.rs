use std::collections::HashSet;

use crate::descriptor::{EnumDescriptorProto, EnumValueDescriptorProto, Location};

use super::push_comment;

/// An enum under construction. Values are numbered in insertion order from 0.
#[derive(Debug, Clone, Default)]
pub struct EnumBuilder {
    name: String,
    comment: Option<String>,
    values: Vec<(String, i32)>,
    value_names: HashSet<String>,
}

impl EnumBuilder {
    /// An enum with no values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Enum name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the enum.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set the leading comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// Append a value numbered after the previous one.
    ///
    /// Returns `false` if the name is already taken.
    pub fn add_value(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if !self.value_names.insert(name.clone()) {
            return false;
        }
        let number = i32::try_from(self.values.len()).unwrap_or(i32::MAX);
        self.values.push((name, number));
        true
    }

    /// `(name, number)` pairs in declaration order.
    #[must_use]
    pub fn values(&self) -> &[(String, i32)] {
        &self.values
    }

    pub(crate) fn locations(&self, at: &[i32], out: &mut Vec<Location>) {
        push_comment(out, at, self.comment.as_deref());
    }

    /// Freeze into a descriptor.
    #[must_use]
    pub fn build(self) -> EnumDescriptorProto {
        EnumDescriptorProto {
            name: Some(self.name),
            value: self
                .values
                .into_iter()
                .map(|(name, number)| EnumValueDescriptorProto {
                    name: Some(name),
                    number: Some(number),
                    options: None,
                })
                .collect(),
            ..Default::default()
        }
    }
}

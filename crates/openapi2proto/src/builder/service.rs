use std::collections::HashSet;

use crate::descriptor::{HttpRule, Location, MethodDescriptorProto, MethodOptions, ServiceDescriptorProto};

use super::{child_path, path, push_comment};

/// One RPC under construction.
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    input_type: String,
    output_type: String,
    comment: Option<String>,
    deprecated: bool,
    http: Option<HttpRule>,
}

impl MethodBuilder {
    /// A unary method from `input_type` to `output_type` (relative or absolute names).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        input_type: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            output_type: output_type.into(),
            comment: None,
            deprecated: false,
            http: None,
        }
    }

    /// Set the leading comment.
    #[must_use]
    pub fn with_comment(mut self, comment: Option<&str>) -> Self {
        self.comment = comment.map(str::to_string);
        self
    }

    /// Set `option deprecated = true`.
    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Attach a `google.api.http` rule.
    #[must_use]
    pub fn with_http(mut self, rule: HttpRule) -> Self {
        self.http = Some(rule);
        self
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request type name.
    #[must_use]
    pub fn input_type(&self) -> &str {
        &self.input_type
    }

    /// Response type name.
    #[must_use]
    pub fn output_type(&self) -> &str {
        &self.output_type
    }

    fn build(self) -> MethodDescriptorProto {
        let options = (self.deprecated || self.http.is_some()).then(|| MethodOptions {
            deprecated: self.deprecated.then_some(true),
            http: self.http,
        });
        MethodDescriptorProto {
            name: Some(self.name),
            input_type: Some(self.input_type),
            output_type: Some(self.output_type),
            options,
            client_streaming: None,
            server_streaming: None,
        }
    }
}

/// A service under construction; methods are de-duplicated by name.
#[derive(Debug, Clone, Default)]
pub struct ServiceBuilder {
    name: String,
    comment: Option<String>,
    methods: Vec<MethodBuilder>,
    method_names: HashSet<String>,
}

impl ServiceBuilder {
    /// A service with no methods.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the leading comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// Append a method; returns `false` if the name is already taken.
    pub fn add_method(&mut self, method: MethodBuilder) -> bool {
        if !self.method_names.insert(method.name.clone()) {
            return false;
        }
        self.methods.push(method);
        true
    }

    /// `true` if a method named `name` was added.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.method_names.contains(name)
    }

    /// Methods in insertion order.
    #[must_use]
    pub fn methods(&self) -> &[MethodBuilder] {
        &self.methods
    }

    /// `true` without methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub(crate) fn locations(&self, at: &[i32], out: &mut Vec<Location>) {
        push_comment(out, at, self.comment.as_deref());
        for (i, method) in self.methods.iter().enumerate() {
            push_comment(
                out,
                &child_path(at, path::SERVICE_METHOD, i),
                method.comment.as_deref(),
            );
        }
    }

    /// Freeze into a descriptor.
    #[must_use]
    pub fn build(self) -> ServiceDescriptorProto {
        ServiceDescriptorProto {
            name: Some(self.name),
            method: self.methods.into_iter().map(MethodBuilder::build).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_are_deduplicated() {
        let mut svc = ServiceBuilder::new("PetsService");
        assert!(svc.add_method(MethodBuilder::new("GetPets", "GetPetsRequest", "GetPetsResponse")));
        assert!(!svc.add_method(MethodBuilder::new("GetPets", "Other", "Other")));
        assert_eq!(svc.methods().len(), 1);
        assert_eq!(svc.methods()[0].input_type(), "GetPetsRequest");
    }

    #[test]
    fn options_only_when_needed() {
        let mut svc = ServiceBuilder::new("PetsService");
        svc.add_method(MethodBuilder::new("A", "In", "Out"));
        svc.add_method(MethodBuilder::new("B", "In", "Out").deprecated(true));
        svc.add_method(
            MethodBuilder::new("C", "In", "Out").with_http(HttpRule::for_operation("get", "/c", "")),
        );
        let built = svc.build();

        assert!(built.method[0].options.is_none());
        let b = built.method[1].options.as_ref().unwrap();
        assert_eq!(b.deprecated, Some(true));
        assert!(b.http.is_none());
        let c = built.method[2].options.as_ref().unwrap();
        assert_eq!(c.deprecated, None);
        assert!(c.http.is_some());
    }
}

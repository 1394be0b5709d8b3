//! Protobuf file descriptor types with `google.api.http` extension support.
//!
//! Standard [`prost_types::MethodOptions`] has no field for the
//! `google.api.http` extension (field 72295728), so a descriptor set built
//! from it cannot carry REST annotations. These custom types wrap the
//! standard message, field and enum descriptors and add the extension on
//! methods.
//!
//! Encoded output is wire-compatible with `google/protobuf/descriptor.proto`.

pub use prost_types::source_code_info::Location;
pub use prost_types::{
    field_descriptor_proto, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
    FieldDescriptorProto, OneofDescriptorProto, SourceCodeInfo,
};

#[allow(clippy::all, clippy::pedantic, clippy::nursery, missing_docs)]
mod types {
    use prost::Message;

    /// A set of file descriptors, as emitted by `protoc --descriptor_set_out`.
    #[derive(Clone, PartialEq, Message)]
    pub struct FileDescriptorSet {
        #[prost(message, repeated, tag = "1")]
        pub file: Vec<FileDescriptorProto>,
    }

    /// One `.proto` file.
    #[derive(Clone, PartialEq, Message)]
    pub struct FileDescriptorProto {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub package: Option<String>,
        /// Imported file names (e.g., `google/protobuf/empty.proto`).
        #[prost(string, repeated, tag = "3")]
        pub dependency: Vec<String>,
        #[prost(message, repeated, tag = "4")]
        pub message_type: Vec<prost_types::DescriptorProto>,
        #[prost(message, repeated, tag = "5")]
        pub enum_type: Vec<prost_types::EnumDescriptorProto>,
        #[prost(message, repeated, tag = "6")]
        pub service: Vec<ServiceDescriptorProto>,
        #[prost(message, repeated, tag = "7")]
        pub extension: Vec<prost_types::FieldDescriptorProto>,
        /// Leading comments keyed by descriptor path.
        #[prost(message, optional, tag = "9")]
        pub source_code_info: Option<prost_types::SourceCodeInfo>,
        /// `"proto2"`, `"proto3"` or empty.
        #[prost(string, optional, tag = "12")]
        pub syntax: Option<String>,
    }

    /// An RPC service.
    #[derive(Clone, PartialEq, Message)]
    pub struct ServiceDescriptorProto {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        #[prost(message, repeated, tag = "2")]
        pub method: Vec<MethodDescriptorProto>,
    }

    /// A single RPC method.
    #[derive(Clone, PartialEq, Message)]
    pub struct MethodDescriptorProto {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        /// Fully-qualified input type (e.g., `.petstore.GetPetsRequest`).
        #[prost(string, optional, tag = "2")]
        pub input_type: Option<String>,
        /// Fully-qualified output type.
        #[prost(string, optional, tag = "3")]
        pub output_type: Option<String>,
        #[prost(message, optional, tag = "4")]
        pub options: Option<MethodOptions>,
        #[prost(bool, optional, tag = "5")]
        pub client_streaming: Option<bool>,
        #[prost(bool, optional, tag = "6")]
        pub server_streaming: Option<bool>,
    }

    /// Method options with the `google.api.http` extension (field 72295728).
    #[derive(Clone, PartialEq, Message)]
    pub struct MethodOptions {
        #[prost(bool, optional, tag = "33")]
        pub deprecated: Option<bool>,
        #[prost(message, optional, tag = "72295728")]
        pub http: Option<HttpRule>,
    }

    /// [`google.api.HttpRule`] — defines REST mapping for an RPC.
    #[derive(Clone, PartialEq, Message)]
    pub struct HttpRule {
        #[prost(oneof = "HttpPattern", tags = "2, 3, 4, 5, 6, 8")]
        pub pattern: Option<HttpPattern>,
        #[prost(string, tag = "7")]
        pub body: String,
    }

    /// The verb and path template of an [`HttpRule`].
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum HttpPattern {
        #[prost(string, tag = "2")]
        Get(String),
        #[prost(string, tag = "3")]
        Put(String),
        #[prost(string, tag = "4")]
        Post(String),
        #[prost(string, tag = "5")]
        Delete(String),
        #[prost(string, tag = "6")]
        Patch(String),
        /// Verbs without a dedicated pattern (`HEAD`, `OPTIONS`, `TRACE`).
        #[prost(message, tag = "8")]
        Custom(CustomHttpPattern),
    }

    /// [`google.api.CustomHttpPattern`].
    #[derive(Clone, PartialEq, Message)]
    pub struct CustomHttpPattern {
        #[prost(string, tag = "1")]
        pub kind: String,
        #[prost(string, tag = "2")]
        pub path: String,
    }
}

pub use types::*;

impl HttpRule {
    /// Build a rule for an `OpenAPI` operation verb and path template.
    ///
    /// `body` is `"*"` when the request carries a body, empty otherwise.
    #[must_use]
    pub fn for_operation(verb: &str, path: &str, body: &str) -> Self {
        let path = path.to_string();
        let pattern = match verb.to_ascii_lowercase().as_str() {
            "get" => HttpPattern::Get(path),
            "put" => HttpPattern::Put(path),
            "post" => HttpPattern::Post(path),
            "delete" => HttpPattern::Delete(path),
            "patch" => HttpPattern::Patch(path),
            _ => HttpPattern::Custom(CustomHttpPattern {
                kind: verb.to_ascii_uppercase(),
                path,
            }),
        };
        Self {
            pattern: Some(pattern),
            body: body.to_string(),
        }
    }
}

/// Extract `(http_method, path)` from a method's `google.api.http` annotation.
///
/// Custom patterns report their `kind` verbatim.
#[must_use]
pub fn extract_http_pattern(method: &MethodDescriptorProto) -> Option<(&str, &str)> {
    let pattern = method
        .options
        .as_ref()
        .and_then(|o| o.http.as_ref())
        .and_then(|h| h.pattern.as_ref())?;

    Some(match pattern {
        HttpPattern::Get(p) => ("get", p.as_str()),
        HttpPattern::Put(p) => ("put", p.as_str()),
        HttpPattern::Post(p) => ("post", p.as_str()),
        HttpPattern::Delete(p) => ("delete", p.as_str()),
        HttpPattern::Patch(p) => ("patch", p.as_str()),
        HttpPattern::Custom(c) => (c.kind.as_str(), c.path.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use prost::Message as _;

    use super::field_descriptor_proto::{Label, Type};
    use super::*;

    fn method_with_rule(rule: HttpRule) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some("TestMethod".to_string()),
            input_type: Some(".test.v1.Request".to_string()),
            output_type: Some(".test.v1.Response".to_string()),
            options: Some(MethodOptions {
                deprecated: None,
                http: Some(rule),
            }),
            client_streaming: None,
            server_streaming: None,
        }
    }

    #[test]
    fn extract_get_pattern() {
        let method = method_with_rule(HttpRule::for_operation("get", "/v1/items", ""));
        let (http_method, path) = extract_http_pattern(&method).unwrap();
        assert_eq!(http_method, "get");
        assert_eq!(path, "/v1/items");
    }

    #[test]
    fn extract_post_pattern_keeps_body() {
        let method = method_with_rule(HttpRule::for_operation("POST", "/v1/items", "*"));
        let (http_method, path) = extract_http_pattern(&method).unwrap();
        assert_eq!(http_method, "post");
        assert_eq!(path, "/v1/items");
        let rule = method.options.unwrap().http.unwrap();
        assert_eq!(rule.body, "*");
    }

    #[test]
    fn extract_delete_pattern() {
        let method = method_with_rule(HttpRule::for_operation("delete", "/v1/items/{id}", ""));
        let (http_method, path) = extract_http_pattern(&method).unwrap();
        assert_eq!(http_method, "delete");
        assert_eq!(path, "/v1/items/{id}");
    }

    #[test]
    fn head_uses_custom_pattern() {
        let rule = HttpRule::for_operation("head", "/v1/items", "");
        assert_eq!(
            rule.pattern,
            Some(HttpPattern::Custom(CustomHttpPattern {
                kind: "HEAD".to_string(),
                path: "/v1/items".to_string(),
            }))
        );
        let method = method_with_rule(rule);
        assert_eq!(extract_http_pattern(&method), Some(("HEAD", "/v1/items")));
    }

    #[test]
    fn returns_none_without_options() {
        let method = MethodDescriptorProto {
            name: Some("NoOptions".to_string()),
            input_type: Some(".test.v1.Request".to_string()),
            output_type: Some(".test.v1.Response".to_string()),
            options: None,
            client_streaming: None,
            server_streaming: None,
        };
        assert!(extract_http_pattern(&method).is_none());
    }

    #[test]
    fn returns_none_without_pattern() {
        let method = method_with_rule(HttpRule {
            pattern: None,
            body: "*".to_string(),
        });
        assert!(extract_http_pattern(&method).is_none());
    }

    /// Round-trip: encode → decode a `FileDescriptorSet` with HTTP annotations.
    #[test]
    fn descriptor_round_trip() {
        let original = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("test.proto".to_string()),
                package: Some("test.v1".to_string()),
                dependency: vec!["google/api/annotations.proto".to_string()],
                message_type: vec![DescriptorProto {
                    name: Some("Req".to_string()),
                    field: vec![FieldDescriptorProto {
                        name: Some("name".to_string()),
                        number: Some(1),
                        label: Some(Label::Optional as i32),
                        r#type: Some(Type::String as i32),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                enum_type: vec![],
                service: vec![ServiceDescriptorProto {
                    name: Some("Svc".to_string()),
                    method: vec![method_with_rule(HttpRule::for_operation(
                        "post", "/v1/test", "*",
                    ))],
                }],
                extension: vec![],
                source_code_info: Some(SourceCodeInfo {
                    location: vec![Location {
                        path: vec![4, 0],
                        span: vec![0, 0, 0],
                        leading_comments: Some(" Request.\n".to_string()),
                        ..Default::default()
                    }],
                }),
                syntax: Some("proto3".to_string()),
            }],
        };

        let bytes = original.encode_to_vec();
        let decoded = FileDescriptorSet::decode(bytes.as_slice()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn http_rule_survives_standard_decoding_as_unknown() {
        let method = method_with_rule(HttpRule::for_operation("get", "/v1/items", ""));
        let bytes = method.encode_to_vec();
        let standard = prost_types::MethodDescriptorProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(standard.name(), "TestMethod");
        assert_eq!(standard.input_type(), ".test.v1.Request");
    }
}

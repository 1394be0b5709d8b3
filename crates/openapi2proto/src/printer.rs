//! Render a [`FileDescriptorProto`] as `.proto` source.
//!
//! Leading comments come from `SourceCodeInfo`. Type references are printed
//! relative to the file's package.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::descriptor::field_descriptor_proto::{Label, Type};
use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto, HttpPattern,
    HttpRule, MethodDescriptorProto, ServiceDescriptorProto,
};

const INDENT: &str = "  ";

/// Print `file` as proto3 source text.
///
/// ```
/// use openapi2proto::{compile, print_file, CompileConfig, Document};
///
/// let doc = Document::from_yaml(
///     "openapi: 3.0.3\ninfo: { title: pets, version: '' }\npaths: {}\n",
/// )?;
/// let text = print_file(&compile(&doc, &CompileConfig::new())?);
/// assert_eq!(text, "syntax = \"proto3\";\n\npackage pets;\n");
/// # Ok::<(), openapi2proto::Error>(())
/// ```
#[must_use]
pub fn print_file(file: &FileDescriptorProto) -> String {
    let mut printer = Printer::new(file);
    printer.file(file);
    printer.out
}

struct Printer<'f> {
    out: String,
    comments: HashMap<&'f [i32], &'f str>,
    package_prefix: String,
    depth: usize,
}

impl<'f> Printer<'f> {
    fn new(file: &'f FileDescriptorProto) -> Self {
        let comments = file
            .source_code_info
            .iter()
            .flat_map(|info| &info.location)
            .filter_map(|loc| Some((loc.path.as_slice(), loc.leading_comments.as_deref()?)))
            .collect();
        let package_prefix = match file.package() {
            "" => ".".to_string(),
            package => format!(".{package}."),
        };
        Self {
            out: String::new(),
            comments,
            package_prefix,
            depth: 0,
        }
    }

    fn file(&mut self, file: &FileDescriptorProto) {
        let syntax = Some(file.syntax()).filter(|s| !s.is_empty()).unwrap_or("proto3");
        self.line(&format!("syntax = \"{syntax}\";"));

        if !file.package().is_empty() {
            self.blank();
            self.comment(&[2]);
            self.line(&format!("package {};", file.package()));
        }

        if !file.dependency.is_empty() {
            self.blank();
            for dependency in &file.dependency {
                self.line(&format!("import \"{}\";", escape(dependency)));
            }
        }

        for (i, enumeration) in file.enum_type.iter().enumerate() {
            self.blank();
            self.enumeration(&path(&[], 5, i), enumeration);
        }
        for (i, message) in file.message_type.iter().enumerate() {
            self.blank();
            self.message(&path(&[], 4, i), message);
        }
        for (i, service) in file.service.iter().enumerate() {
            self.blank();
            self.service(&path(&[], 6, i), service);
        }
    }

    fn message(&mut self, at: &[i32], message: &DescriptorProto) {
        self.comment(at);
        self.line(&format!("message {} {{", message.name()));
        self.depth += 1;

        let mut first = true;
        for (i, nested) in message.enum_type.iter().enumerate() {
            self.separate(&mut first);
            self.enumeration(&path(at, 4, i), nested);
        }
        for (i, nested) in message.nested_type.iter().enumerate() {
            self.separate(&mut first);
            self.message(&path(at, 3, i), nested);
        }

        let mut printed_oneofs = Vec::new();
        for (i, field) in message.field.iter().enumerate() {
            if i == 0 {
                self.separate(&mut first);
            }
            match real_oneof(field) {
                Some(group) if printed_oneofs.contains(&group) => {}
                Some(group) => {
                    printed_oneofs.push(group);
                    self.oneof(at, message, group);
                }
                None => self.field(&path(at, 2, i), field),
            }
        }

        self.depth -= 1;
        self.line("}");
    }

    /// A oneof block holding every member of `group`, printed where its first member sits.
    fn oneof(&mut self, at: &[i32], message: &DescriptorProto, group: i32) {
        let name = usize::try_from(group)
            .ok()
            .and_then(|g| message.oneof_decl.get(g))
            .map_or("", |o| o.name());
        self.line(&format!("oneof {name} {{"));
        self.depth += 1;
        for (i, field) in message.field.iter().enumerate() {
            if real_oneof(field) == Some(group) {
                self.field(&path(at, 2, i), field);
            }
        }
        self.depth -= 1;
        self.line("}");
    }

    fn field(&mut self, at: &[i32], field: &FieldDescriptorProto) {
        self.comment(at);
        let label = if field.label() == Label::Repeated {
            "repeated "
        } else if field.proto3_optional() {
            "optional "
        } else {
            ""
        };
        let field_type = self.type_name(field);
        self.line(&format!(
            "{label}{field_type} {} = {};",
            field.name(),
            field.number()
        ));
    }

    fn enumeration(&mut self, at: &[i32], enumeration: &EnumDescriptorProto) {
        self.comment(at);
        self.line(&format!("enum {} {{", enumeration.name()));
        self.depth += 1;
        for (i, value) in enumeration.value.iter().enumerate() {
            self.comment(&path(at, 2, i));
            self.line(&format!("{} = {};", value.name(), value.number()));
        }
        self.depth -= 1;
        self.line("}");
    }

    fn service(&mut self, at: &[i32], service: &ServiceDescriptorProto) {
        self.comment(at);
        self.line(&format!("service {} {{", service.name()));
        self.depth += 1;
        for (i, method) in service.method.iter().enumerate() {
            self.method(&path(at, 2, i), method);
        }
        self.depth -= 1;
        self.line("}");
    }

    fn method(&mut self, at: &[i32], method: &MethodDescriptorProto) {
        self.comment(at);
        let signature = format!(
            "rpc {}({}) returns ({})",
            method.name.as_deref().unwrap_or_default(),
            self.relative(method.input_type.as_deref().unwrap_or_default()),
            self.relative(method.output_type.as_deref().unwrap_or_default()),
        );

        let deprecated = method
            .options
            .as_ref()
            .and_then(|o| o.deprecated)
            .unwrap_or(false);
        let http = method.options.as_ref().and_then(|o| o.http.as_ref());
        if !deprecated && http.is_none() {
            self.line(&format!("{signature};"));
            return;
        }

        self.line(&format!("{signature} {{"));
        self.depth += 1;
        if deprecated {
            self.line("option deprecated = true;");
        }
        if let Some(rule) = http {
            self.http_rule(rule);
        }
        self.depth -= 1;
        self.line("}");
    }

    fn http_rule(&mut self, rule: &HttpRule) {
        self.line("option (google.api.http) = {");
        self.depth += 1;
        match &rule.pattern {
            Some(HttpPattern::Get(p)) => self.line(&format!("get: \"{}\"", escape(p))),
            Some(HttpPattern::Put(p)) => self.line(&format!("put: \"{}\"", escape(p))),
            Some(HttpPattern::Post(p)) => self.line(&format!("post: \"{}\"", escape(p))),
            Some(HttpPattern::Delete(p)) => self.line(&format!("delete: \"{}\"", escape(p))),
            Some(HttpPattern::Patch(p)) => self.line(&format!("patch: \"{}\"", escape(p))),
            Some(HttpPattern::Custom(c)) => self.line(&format!(
                "custom: {{ kind: \"{}\" path: \"{}\" }}",
                escape(&c.kind),
                escape(&c.path)
            )),
            None => {}
        }
        if !rule.body.is_empty() {
            self.line(&format!("body: \"{}\"", escape(&rule.body)));
        }
        self.depth -= 1;
        self.line("};");
    }

    /// Printed type of a field: scalar keyword or package-relative type name.
    fn type_name(&self, field: &FieldDescriptorProto) -> String {
        match field.r#type() {
            Type::Message | Type::Enum | Type::Group => self.relative(field.type_name()),
            scalar => scalar
                .as_str_name()
                .trim_start_matches("TYPE_")
                .to_ascii_lowercase(),
        }
    }

    fn relative(&self, name: &str) -> String {
        name.strip_prefix(self.package_prefix.as_str())
            .or_else(|| name.strip_prefix('.'))
            .unwrap_or(name)
            .to_string()
    }

    fn comment(&mut self, at: &[i32]) {
        let Some(text) = self.comments.get(at).copied() else {
            return;
        };
        for line in text.lines() {
            self.line(&format!("//{line}"));
        }
    }

    fn separate(&mut self, first: &mut bool) {
        if !std::mem::take(first) {
            self.blank();
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        let _ = writeln!(self.out, "{text}");
    }
}

/// Index of a declared (non-synthetic) oneof the field belongs to.
fn real_oneof(field: &FieldDescriptorProto) -> Option<i32> {
    if field.proto3_optional() {
        None
    } else {
        field.oneof_index
    }
}

fn path(parent: &[i32], tag: i32, index: usize) -> Vec<i32> {
    let mut path = parent.to_vec();
    path.push(tag);
    path.push(i32::try_from(index).unwrap_or(i32::MAX));
    path
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

use std::collections::{BTreeSet, HashSet};

use crate::descriptor::{DescriptorProto, FileDescriptorProto, SourceCodeInfo};

use super::{child_path, path, push_comment, EnumBuilder, MessageBuilder, ServiceBuilder};

/// Syntax string written to every file.
const SYNTAX: &str = "proto3";

#[derive(Debug, Clone)]
enum TopLevelMessage {
    Built(MessageBuilder),
    Prebuilt(DescriptorProto),
}

/// Owner of every top-level registry for one `.proto` file.
///
/// Messages keep first-seen order; enums, services and dependencies are
/// sorted on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct FileBuilder {
    name: String,
    package: String,
    package_comment: Option<String>,
    messages: Vec<TopLevelMessage>,
    enums: Vec<EnumBuilder>,
    type_names: HashSet<String>,
    services: Vec<ServiceBuilder>,
    dependencies: BTreeSet<String>,
    components: HashSet<String>,
}

impl FileBuilder {
    /// An empty file.
    #[must_use]
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            ..Self::default()
        }
    }

    /// Package name.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Set the comment printed above the `package` statement.
    pub fn set_package_comment(&mut self, comment: Option<&str>) {
        self.package_comment = comment.map(str::to_string);
    }

    /// Add a top-level message; returns `false` if the name is already declared.
    pub fn add_message(&mut self, message: MessageBuilder) -> bool {
        if !self.type_names.insert(message.name().to_string()) {
            return false;
        }
        self.messages.push(TopLevelMessage::Built(message));
        true
    }

    /// Add an already-built top-level message.
    pub fn add_descriptor(&mut self, message: DescriptorProto) -> bool {
        if !self.type_names.insert(message.name().to_string()) {
            return false;
        }
        self.messages.push(TopLevelMessage::Prebuilt(message));
        true
    }

    /// Add a top-level enum; returns `false` if the name is already declared.
    pub fn add_enum(&mut self, enumeration: EnumBuilder) -> bool {
        if !self.type_names.insert(enumeration.name().to_string()) {
            return false;
        }
        self.enums.push(enumeration);
        true
    }

    /// `true` if a top-level message or enum named `name` was added.
    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.type_names.contains(name)
    }

    /// Add a service; returns `false` if one with the same name exists.
    pub fn set_service(&mut self, service: ServiceBuilder) -> bool {
        if self.services.iter().any(|s| s.name() == service.name()) {
            return false;
        }
        self.services.push(service);
        true
    }

    /// Import a file (e.g., `google/protobuf/empty.proto`).
    pub fn add_dependency(&mut self, dependency: impl Into<String>) -> bool {
        self.dependencies.insert(dependency.into())
    }

    /// Register a name that will be emitted as a top-level component.
    pub fn add_component(&mut self, name: impl Into<String>) {
        self.components.insert(name.into());
    }

    /// `true` if `name` was registered with [`add_component`](Self::add_component).
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains(name)
    }

    /// Freeze into a `FileDescriptorProto`.
    ///
    /// Relative type names are linked to fully-qualified names the way
    /// `protoc` resolves them: innermost enclosing scope first, then outward
    /// to the package. Names that resolve nowhere are made absolute as written.
    #[must_use]
    pub fn build(mut self) -> FileDescriptorProto {
        self.enums.sort_by(|a, b| a.name().cmp(b.name()));
        self.services.sort_by(|a, b| a.name().cmp(b.name()));

        let mut locations = Vec::new();
        push_comment(
            &mut locations,
            &[path::FILE_PACKAGE],
            self.package_comment.as_deref(),
        );
        for (i, message) in self.messages.iter().enumerate() {
            if let TopLevelMessage::Built(message) = message {
                message.locations(&child_path(&[], path::FILE_MESSAGE, i), &mut locations);
            }
        }
        for (i, enumeration) in self.enums.iter().enumerate() {
            enumeration.locations(&child_path(&[], path::FILE_ENUM, i), &mut locations);
        }
        for (i, service) in self.services.iter().enumerate() {
            service.locations(&child_path(&[], path::FILE_SERVICE, i), &mut locations);
        }

        let mut file = FileDescriptorProto {
            name: Some(self.name),
            package: (!self.package.is_empty()).then_some(self.package),
            dependency: self.dependencies.into_iter().collect(),
            message_type: self
                .messages
                .into_iter()
                .map(|m| match m {
                    TopLevelMessage::Built(m) => m.build(),
                    TopLevelMessage::Prebuilt(m) => m,
                })
                .collect(),
            enum_type: self.enums.into_iter().map(EnumBuilder::build).collect(),
            service: self.services.into_iter().map(ServiceBuilder::build).collect(),
            extension: Vec::new(),
            source_code_info: (!locations.is_empty()).then_some(SourceCodeInfo {
                location: locations,
            }),
            syntax: Some(SYNTAX.to_string()),
        };
        link_type_names(&mut file);
        file
    }
}

/// Rewrite every `type_name`, `input_type` and `output_type` to `.pkg.Path` form.
fn link_type_names(file: &mut FileDescriptorProto) {
    let root = match file.package.as_deref() {
        Some(pkg) if !pkg.is_empty() => format!(".{pkg}"),
        _ => String::new(),
    };

    let mut known = HashSet::new();
    for message in &file.message_type {
        collect_names(&root, message, &mut known);
    }
    for enumeration in &file.enum_type {
        known.insert(format!("{root}.{}", enumeration.name()));
    }

    for message in &mut file.message_type {
        link_message(&root, message, &known);
    }
    for service in &mut file.service {
        for method in &mut service.method {
            for name in [&mut method.input_type, &mut method.output_type] {
                if let Some(name) = name.as_mut() {
                    *name = resolve(name, &root, &known);
                }
            }
        }
    }
}

fn collect_names(scope: &str, message: &DescriptorProto, known: &mut HashSet<String>) {
    let full = format!("{scope}.{}", message.name());
    for enumeration in &message.enum_type {
        known.insert(format!("{full}.{}", enumeration.name()));
    }
    for nested in &message.nested_type {
        collect_names(&full, nested, known);
    }
    known.insert(full);
}

fn link_message(parent: &str, message: &mut DescriptorProto, known: &HashSet<String>) {
    let scope = format!("{parent}.{}", message.name());
    for field in &mut message.field {
        if let Some(name) = field.type_name.as_mut() {
            *name = resolve(name, &scope, known);
        }
    }
    for nested in &mut message.nested_type {
        link_message(&scope, nested, known);
    }
}

/// Resolve `name` from `scope` outward; unresolved names get a leading dot.
fn resolve(name: &str, scope: &str, known: &HashSet<String>) -> String {
    if name.starts_with('.') {
        return name.to_string();
    }
    let mut scope = scope;
    loop {
        let candidate = format!("{scope}.{name}");
        if known.contains(&candidate) {
            return candidate;
        }
        match scope.rfind('.') {
            Some(pos) => scope = &scope[..pos],
            None => break,
        }
    }
    format!(".{name}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::{FieldBuilder, MethodBuilder};
    use crate::descriptor::field_descriptor_proto::Type;

    #[test]
    fn top_level_types_are_deduplicated() {
        let mut file = FileBuilder::new("pets.proto", "pets");
        assert!(file.add_message(MessageBuilder::new("Pet")));
        assert!(!file.add_message(MessageBuilder::new("Pet")));
        assert!(!file.add_enum(EnumBuilder::new("Pet")));
        assert!(file.add_enum(EnumBuilder::new("Status")));
        assert!(file.has_type("Status"));
        assert!(file.add_dependency("google/protobuf/empty.proto"));
        assert!(!file.add_dependency("google/protobuf/empty.proto"));
    }

    #[test]
    fn build_sorts_enums_and_dependencies() {
        let mut file = FileBuilder::new("pets.proto", "pets");
        file.add_enum(EnumBuilder::new("Zeta"));
        file.add_enum(EnumBuilder::new("Alpha"));
        file.add_message(MessageBuilder::new("Zoo"));
        file.add_message(MessageBuilder::new("Ant"));
        file.add_dependency("google/protobuf/wrappers.proto");
        file.add_dependency("google/api/annotations.proto");
        let built = file.build();

        let enums: Vec<&str> = built.enum_type.iter().map(|e| e.name()).collect();
        assert_eq!(enums, ["Alpha", "Zeta"]);
        let messages: Vec<&str> = built.message_type.iter().map(|m| m.name()).collect();
        assert_eq!(messages, ["Zoo", "Ant"]);
        assert_eq!(
            built.dependency,
            ["google/api/annotations.proto", "google/protobuf/wrappers.proto"]
        );
        assert_eq!(built.syntax.as_deref(), Some("proto3"));
    }

    #[test]
    fn type_names_resolve_innermost_first() {
        let mut inner = MessageBuilder::new("Owner");
        inner.add_field(FieldBuilder::message("pet", "Pet"));

        let mut pet = MessageBuilder::new("Pet");
        pet.add_field(FieldBuilder::message("owner", "Owner"));
        pet.add_field(FieldBuilder::enumeration("status", "Status"));
        pet.add_field(FieldBuilder::message("any", "google.protobuf.Any"));
        pet.add_nested_message(inner);

        let mut file = FileBuilder::new("pets.proto", "pets.v1");
        file.add_message(pet);
        file.add_enum(EnumBuilder::new("Status"));
        let built = file.build();

        let pet = &built.message_type[0];
        let types: Vec<&str> = pet.field.iter().map(|f| f.type_name()).collect();
        assert_eq!(
            types,
            [".pets.v1.Pet.Owner", ".pets.v1.Status", ".google.protobuf.Any"]
        );
        assert_eq!(pet.nested_type[0].field[0].type_name(), ".pets.v1.Pet");
    }

    #[test]
    fn method_types_are_linked() {
        let mut svc = ServiceBuilder::new("PetsService");
        svc.add_method(MethodBuilder::new(
            "GetPets",
            "GetPetsRequest",
            "google.protobuf.Empty",
        ));
        let mut file = FileBuilder::new("pets.proto", "pets");
        file.add_message(MessageBuilder::new("GetPetsRequest"));
        file.set_service(svc);
        let built = file.build();

        let method = &built.service[0].method[0];
        assert_eq!(method.input_type.as_deref(), Some(".pets.GetPetsRequest"));
        assert_eq!(method.output_type.as_deref(), Some(".google.protobuf.Empty"));
    }

    #[test]
    fn source_code_info_paths() {
        let mut pet = MessageBuilder::new("Pet");
        pet.set_comment(Some("A pet."));
        pet.add_field(FieldBuilder::new("id", Type::Int64));
        pet.add_field(FieldBuilder::new("name", Type::String).with_comment(Some("Display name.")));
        let mut status = EnumBuilder::new("Status");
        status.set_comment(Some("Lifecycle."));

        let mut file = FileBuilder::new("pets.proto", "pets");
        file.set_package_comment(Some("Pet store."));
        file.add_message(pet);
        file.add_enum(status);
        let built = file.build();

        let locations: Vec<(Vec<i32>, &str)> = built
            .source_code_info
            .as_ref()
            .unwrap()
            .location
            .iter()
            .map(|l| (l.path.clone(), l.leading_comments()))
            .collect();
        assert_eq!(
            locations,
            [
                (vec![2], " Pet store.\n"),
                (vec![4, 0], " A pet.\n"),
                (vec![4, 0, 2, 1], " Display name.\n"),
                (vec![5, 0], " Lifecycle.\n"),
            ]
        );
    }

    #[test]
    fn empty_package_links_from_root() {
        let mut msg = MessageBuilder::new("A");
        msg.add_field(FieldBuilder::message("b", "B"));
        let mut file = FileBuilder::new("a.proto", "");
        file.add_message(msg);
        file.add_message(MessageBuilder::new("B"));
        let built = file.build();
        assert!(built.package.is_none());
        assert_eq!(built.message_type[0].field[0].type_name(), ".B");
    }
}

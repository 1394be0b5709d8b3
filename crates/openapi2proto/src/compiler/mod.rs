//! `OpenAPI` → protobuf compilation.
//!
//! Runs in passes over one [`FileBuilder`]:
//! - [`components`] — pre-registers every component name, then compiles
//!   `components.schemas` and `components.requestBodies` in sorted order
//! - [`paths`] — one RPC per operation with synthesized request/response messages
//! - [`schema`] — the recursive schema translation both passes share
//!
//! Component references are memoized: each component is compiled once,
//! emitted at top level, and referenced by name afterwards.

mod components;
mod paths;
mod schema;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::builder::{FileBuilder, MessageBuilder};
use crate::descriptor::{DescriptorProto, FileDescriptorProto, FileDescriptorSet};
use crate::error::{Error, Result};
use crate::naming::NameNormalizer;
use crate::openapi::{ref_name, Document, Info, RefOr, SchemaOrRef, SCHEMA_REF_PREFIX};

/// Package used when neither the config nor `info.title` provides one.
pub const DEFAULT_PACKAGE: &str = "openapi";

const EMPTY_TYPE: &str = "google.protobuf.Empty";
const EMPTY_PROTO: &str = "google/protobuf/empty.proto";
const WRAPPERS_PROTO: &str = "google/protobuf/wrappers.proto";
const ANNOTATIONS_PROTO: &str = "google/api/annotations.proto";

/// Configuration for the compiler.
///
/// Construct with [`CompileConfig::new`] and configure via
/// [`with_project_config`](Self::with_project_config) (file-based) or
/// individual builder methods (programmatic).
///
/// # Example
///
/// ```
/// use openapi2proto::CompileConfig;
///
/// let config = CompileConfig::new()
///     .package_name("petstore.v1")
///     .use_annotation(true)
///     .acronyms(&["NFT", "IDs"]);
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CompileConfig {
    /// Package override; derived from `info.title` when `None`.
    package_name: Option<String>,

    /// Attach `google.api.http` rules to methods.
    use_annotation: bool,

    /// Skip the service pass.
    skip_rpc: bool,

    /// Skip deprecated operations.
    skip_deprecated_rpc: bool,

    /// Prefix enum values with the enum name.
    prefix_enum_values: bool,

    /// Emit not-required scalars as `google.protobuf.*Value`.
    wrap_primitives: bool,

    /// Acronym spellings preserved in message names.
    acronyms: Vec<String>,

    /// Pre-built messages emitted before any compiled message.
    additional_messages: Vec<DescriptorProto>,

    /// Extra imports.
    dependencies: Vec<String>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileConfig {
    /// Create a config with default settings (enum prefixes on, everything else off).
    #[must_use]
    pub fn new() -> Self {
        Self {
            package_name: None,
            use_annotation: false,
            skip_rpc: false,
            skip_deprecated_rpc: false,
            prefix_enum_values: true,
            wrap_primitives: false,
            acronyms: Vec::new(),
            additional_messages: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Apply settings from a [`ProjectConfig`](crate::ProjectConfig).
    ///
    /// Builder methods called after this override config values.
    #[must_use]
    pub fn with_project_config(mut self, project: &crate::ProjectConfig) -> Self {
        if project.package.is_some() {
            self.package_name.clone_from(&project.package);
        }
        self.acronyms.clone_from(&project.acronyms);
        self.use_annotation = project.use_annotation;
        self.skip_rpc = project.skip_rpc;
        self.skip_deprecated_rpc = project.skip_deprecated_rpc;
        self.prefix_enum_values = project.prefix_enum_values;
        self.wrap_primitives = project.wrap_primitives;
        self.dependencies.clone_from(&project.dependencies);
        self
    }

    /// Set the package name.
    #[must_use]
    pub fn package_name(mut self, package: &str) -> Self {
        self.package_name = Some(package.to_string());
        self
    }

    /// Enable or disable `google.api.http` annotations.
    #[must_use]
    pub fn use_annotation(mut self, enabled: bool) -> Self {
        self.use_annotation = enabled;
        self
    }

    /// Enable or disable the service pass.
    #[must_use]
    pub fn skip_rpc(mut self, skip: bool) -> Self {
        self.skip_rpc = skip;
        self
    }

    /// Enable or disable skipping of deprecated operations.
    #[must_use]
    pub fn skip_deprecated_rpc(mut self, skip: bool) -> Self {
        self.skip_deprecated_rpc = skip;
        self
    }

    /// Enable or disable enum value prefixes.
    #[must_use]
    pub fn prefix_enum_values(mut self, enabled: bool) -> Self {
        self.prefix_enum_values = enabled;
        self
    }

    /// Enable or disable well-known wrapper types for optional scalars.
    #[must_use]
    pub fn wrap_primitives(mut self, enabled: bool) -> Self {
        self.wrap_primitives = enabled;
        self
    }

    /// Set the acronym table.
    #[must_use]
    pub fn acronyms(mut self, acronyms: &[&str]) -> Self {
        self.acronyms = acronyms.iter().map(|&s| s.to_string()).collect();
        self
    }

    /// Add a pre-built message emitted ahead of compiled ones.
    #[must_use]
    pub fn additional_message(mut self, message: DescriptorProto) -> Self {
        self.additional_messages.push(message);
        self
    }

    /// Add an import.
    #[must_use]
    pub fn dependency(mut self, dependency: &str) -> Self {
        self.dependencies.push(dependency.to_string());
        self
    }
}

/// Compile an `OpenAPI` document into a single protobuf file descriptor.
///
/// # Errors
///
/// Returns [`Error::UnresolvedRef`] for dangling references,
/// [`Error::CycleDetected`] for self-referencing components, and
/// [`Error::InvalidExtension`] for a malformed `x-propertyOrder`.
pub fn compile(doc: &Document, config: &CompileConfig) -> Result<FileDescriptorProto> {
    let package = package_name(doc, config);
    let file_name = format!("{}.proto", last_segment(&package));
    let mut file = FileBuilder::new(file_name, package);
    file.set_package_comment(package_comment(&doc.info).as_deref());
    for dependency in &config.dependencies {
        file.add_dependency(dependency.as_str());
    }
    for message in &config.additional_messages {
        file.add_descriptor(message.clone());
    }

    let mut compiler = Compiler::new(doc, config, file);
    compiler.compile_components()?;
    if config.skip_rpc {
        debug!("service pass skipped");
    } else {
        compiler.compile_paths()?;
    }
    Ok(compiler.file.build())
}

/// [`compile`], wrapped in a `FileDescriptorSet` ready for `prost` encoding.
///
/// # Errors
///
/// Same as [`compile`].
pub fn compile_to_set(doc: &Document, config: &CompileConfig) -> Result<FileDescriptorSet> {
    Ok(FileDescriptorSet {
        file: vec![compile(doc, config)?],
    })
}

/// Configured package, else the normalized title, else [`DEFAULT_PACKAGE`].
fn package_name(doc: &Document, config: &CompileConfig) -> String {
    if let Some(package) = config.package_name.as_deref().filter(|p| !p.is_empty()) {
        return package.to_string();
    }
    let derived = NameNormalizer::default().normalize_field_name(&doc.info.title);
    if derived.is_empty() {
        DEFAULT_PACKAGE.to_string()
    } else {
        derived
    }
}

fn last_segment(package: &str) -> &str {
    package.rsplit('.').next().unwrap_or(package)
}

fn package_comment(info: &Info) -> Option<String> {
    let mut comment = info.description.as_deref().unwrap_or_default().trim().to_string();
    if !info.version.is_empty() {
        if !comment.is_empty() {
            comment.push_str("\n\n");
        }
        comment.push_str("Version: ");
        comment.push_str(&info.version);
    }
    (!comment.is_empty()).then_some(comment)
}

/// How a component reference is used by a referencing field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    /// A top-level message.
    Message(String),
    /// A top-level enum.
    Enum(String),
    /// The component compiled to nothing; references are dropped.
    Empty,
}

/// Single owner of compilation state; every pass borrows it mutably.
struct Compiler<'a> {
    doc: &'a Document,
    config: &'a CompileConfig,
    names: NameNormalizer,
    file: FileBuilder,
    /// Component key → emitted result.
    resolved: HashMap<String, Resolved>,
    /// Request body key → emitted result.
    bodies: HashMap<String, Resolved>,
    /// Component keys currently being compiled, outermost first.
    in_progress: Vec<String>,
    /// Breadcrumb for error context.
    scope: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn new(doc: &'a Document, config: &'a CompileConfig, file: FileBuilder) -> Self {
        Self {
            doc,
            config,
            names: NameNormalizer::new(&config.acronyms),
            file,
            resolved: HashMap::new(),
            bodies: HashMap::new(),
            in_progress: Vec::new(),
            scope: Vec::new(),
        }
    }

    fn context(&self) -> String {
        if self.scope.is_empty() {
            "document root".to_string()
        } else {
            self.scope.join(".")
        }
    }

    fn unresolved(&self, reference: &str) -> Error {
        Error::UnresolvedRef {
            reference: reference.to_string(),
            context: self.context(),
        }
    }

    /// Run `f` with `segment` appended to the breadcrumb.
    fn scoped<T>(
        &mut self,
        segment: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scope.push(segment.into());
        let result = f(self);
        self.scope.pop();
        result
    }

    /// Run `f` with the breadcrumb replaced by `root`.
    fn rooted<T>(&mut self, root: &[&str], f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let root = root.iter().map(|s| (*s).to_string()).collect();
        let saved = std::mem::replace(&mut self.scope, root);
        let result = f(self);
        self.scope = saved;
        result
    }

    /// Mark a component as being compiled, failing if it already is.
    fn enter(&mut self, key: &str) -> Result<()> {
        if self.in_progress.iter().any(|k| k == key) {
            let mut chain = self.in_progress.clone();
            chain.push(key.to_string());
            return Err(Error::CycleDetected {
                name: key.to_string(),
                chain: chain.join(" -> "),
            });
        }
        self.in_progress.push(key.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        self.in_progress.pop();
    }

    /// Find the component a `#/components/schemas/...` reference names.
    fn lookup_schema(&self, reference: &str) -> Result<(String, &'a SchemaOrRef)> {
        let doc = self.doc;
        let key = ref_name(reference, SCHEMA_REF_PREFIX).ok_or_else(|| self.unresolved(reference))?;
        let target = doc
            .components
            .schemas
            .get(key.as_ref())
            .ok_or_else(|| self.unresolved(reference))?;
        Ok((key.into_owned(), target))
    }

    /// Follow `$ref` chains inside one components section.
    fn resolve_indirect<T>(
        &self,
        node: &'a RefOr<T>,
        prefix: &str,
        section: &'a BTreeMap<String, RefOr<T>>,
    ) -> Result<&'a T> {
        let mut node = node;
        let mut seen: Vec<String> = Vec::new();
        loop {
            match node {
                RefOr::Item(item) => return Ok(item),
                RefOr::Ref { reference } => {
                    let key = ref_name(reference, prefix).ok_or_else(|| self.unresolved(reference))?;
                    if seen.iter().any(|k| *k == key) {
                        let name = key.into_owned();
                        seen.push(name.clone());
                        return Err(Error::CycleDetected {
                            name,
                            chain: seen.join(" -> "),
                        });
                    }
                    node = section
                        .get(key.as_ref())
                        .ok_or_else(|| self.unresolved(reference))?;
                    seen.push(key.into_owned());
                }
            }
        }
    }

    /// Compile a schema reference once and return how to reference it.
    fn resolve_schema_ref(&mut self, reference: &str) -> Result<Resolved> {
        let (key, target) = self.lookup_schema(reference)?;
        self.emit_component(&key, target)
    }

    /// Compile `components.schemas.<key>` (memoized) and emit it at top level.
    fn emit_component(&mut self, key: &str, schema: &'a SchemaOrRef) -> Result<Resolved> {
        if let Some(resolved) = self.resolved.get(key) {
            return Ok(resolved.clone());
        }
        self.enter(key)?;
        let hint = self.names.normalize_message_name(key);
        let compiled = self.rooted(&["components", "schemas", key], |c| {
            c.compile_schema_ref(&hint, schema)
        });
        self.leave();

        let resolved = self.emit_top_level(compiled?);
        self.resolved.insert(key.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Place a compiled component: enums and messages at top level, empties nowhere.
    fn emit_top_level(&mut self, compiled: Option<MessageBuilder>) -> Resolved {
        let Some(message) = non_empty(compiled) else {
            return Resolved::Empty;
        };
        match message.into_enum() {
            Ok(enumeration) => {
                let name = enumeration.name().to_string();
                if self.file.add_enum(enumeration) {
                    debug!(name = %name, "emitted enum");
                }
                Resolved::Enum(name)
            }
            Err(message) => {
                let name = message.name().to_string();
                if self.file.add_message(message) {
                    debug!(name = %name, "emitted message");
                }
                Resolved::Message(name)
            }
        }
    }

    /// Type name for an empty request or response.
    fn empty_type(&mut self) -> String {
        self.file.add_dependency(EMPTY_PROTO);
        EMPTY_TYPE.to_string()
    }
}

/// The compiled result, unless it is missing or empty and must not be emitted or referenced.
fn non_empty(message: Option<MessageBuilder>) -> Option<MessageBuilder> {
    message.filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str) -> Document {
        Document {
            info: Info {
                title: title.to_string(),
                ..Info::default()
            },
            ..Document::default()
        }
    }

    #[test]
    fn package_defaults() {
        let config = CompileConfig::new();
        assert_eq!(package_name(&doc("Pet Store"), &config), "pet_store");
        assert_eq!(package_name(&doc(""), &config), DEFAULT_PACKAGE);
        let config = config.package_name("pets.v1");
        assert_eq!(package_name(&doc("Pet Store"), &config), "pets.v1");
    }

    #[test]
    fn file_name_uses_last_package_segment() {
        assert_eq!(last_segment("pets.v1"), "v1");
        assert_eq!(last_segment("pets"), "pets");
    }

    #[test]
    fn package_comment_combines_description_and_version() {
        let info = Info {
            title: "Pets".to_string(),
            description: Some("Pet store API.".to_string()),
            version: "1.0.0".to_string(),
        };
        assert_eq!(
            package_comment(&info).as_deref(),
            Some("Pet store API.\n\nVersion: 1.0.0")
        );
        assert!(package_comment(&Info::default()).is_none());
    }

    #[test]
    fn project_config_overrides_defaults() {
        let project: crate::ProjectConfig =
            serde_yaml_ng::from_str("package: pets\nuse_annotation: true\nacronyms: [NFT]").unwrap();
        let config = CompileConfig::new().with_project_config(&project).skip_rpc(true);
        assert_eq!(config.package_name.as_deref(), Some("pets"));
        assert!(config.use_annotation);
        assert!(config.skip_rpc);
        assert!(config.prefix_enum_values);
        assert_eq!(config.acronyms, ["NFT"]);
    }

    #[test]
    fn empty_results_are_dropped() {
        assert!(non_empty(None).is_none());
        assert!(non_empty(Some(MessageBuilder::new("Empty"))).is_none());
        let mut msg = MessageBuilder::new("Value");
        msg.add_nested_message(MessageBuilder::new("Inner"));
        assert!(non_empty(Some(msg)).is_some());
    }
}

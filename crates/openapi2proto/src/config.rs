//! Project-level compiler configuration loaded from YAML.
//!
//! Externalizes project-specific knobs (package name, acronyms, toggles,
//! extra imports) so they live next to the `OpenAPI` document instead of
//! being repeated on every CLI invocation.
//!
//! # File format
//!
//! ```yaml
//! # api/openapi2proto.yaml
//! package: petstore.v1
//!
//! # Spellings kept verbatim inside message names.
//! acronyms: [NFT, DID, IDs]
//!
//! # Emit google.api.http rules on every RPC.
//! use_annotation: true
//!
//! skip_rpc: false
//! skip_deprecated_rpc: true
//!
//! # Prefix enum values with the enum name (default true).
//! prefix_enum_values: true
//!
//! # Optional scalars become google.protobuf.*Value wrappers.
//! wrap_primitives: false
//!
//! # Extra imports.
//! dependencies:
//!   - google/protobuf/any.proto
//! ```

use std::path::Path;

use serde::Deserialize;

/// Project-level compiler config.
///
/// Loaded from a YAML file via [`ProjectConfig::load`], then applied to a
/// [`CompileConfig`](crate::CompileConfig) via
/// [`CompileConfig::with_project_config`](crate::CompileConfig::with_project_config).
#[derive(Debug, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProjectConfig {
    /// Package override (e.g., `petstore.v1`). Derived from `info.title` when unset.
    pub package: Option<String>,

    /// Acronym spellings preserved in message names.
    pub acronyms: Vec<String>,

    /// Attach `google.api.http` rules to generated methods.
    pub use_annotation: bool,

    /// Skip the service pass entirely.
    pub skip_rpc: bool,

    /// Skip operations marked `deprecated: true`.
    pub skip_deprecated_rpc: bool,

    /// Prefix enum values with the enum name.
    pub prefix_enum_values: bool,

    /// Emit not-required scalars as `google.protobuf.*Value` wrappers.
    pub wrap_primitives: bool,

    /// Extra imports added to the generated file.
    pub dependencies: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            package: None,
            acronyms: Vec::new(),
            use_annotation: false,
            skip_rpc: false,
            skip_deprecated_rpc: false,
            prefix_enum_values: true,
            wrap_primitives: false,
            dependencies: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_defaults() {
        let config: ProjectConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert!(config.package.is_none());
        assert!(config.acronyms.is_empty());
        assert!(!config.use_annotation);
        assert!(!config.skip_rpc);
        assert!(config.prefix_enum_values);
        assert!(!config.wrap_primitives);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn deserialize_full() {
        let yaml = r"
package: petstore.v1
acronyms: [NFT, IDs]
use_annotation: true
skip_deprecated_rpc: true
prefix_enum_values: false
dependencies:
  - google/protobuf/any.proto
";
        let config: ProjectConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.package.as_deref(), Some("petstore.v1"));
        assert_eq!(config.acronyms, vec!["NFT", "IDs"]);
        assert!(config.use_annotation);
        assert!(config.skip_deprecated_rpc);
        assert!(!config.prefix_enum_values);
        assert_eq!(config.dependencies, vec!["google/protobuf/any.proto"]);
        // Unset toggles keep defaults
        assert!(!config.skip_rpc);
        assert!(!config.wrap_primitives);
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join("openapi2proto-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "package: pets\nskip_rpc: true\n").unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.package.as_deref(), Some("pets"));
        assert!(config.skip_rpc);
        // Defaults still apply
        assert!(config.prefix_enum_values);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_nonexistent_file_returns_error() {
        let result = ProjectConfig::load(Path::new("/nonexistent/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_yaml_returns_error() {
        let dir = std::env::temp_dir().join("openapi2proto-config-test-invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        std::fs::write(&path, "acronyms: [[[invalid").unwrap();

        let result = ProjectConfig::load(&path);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}

//! Typed error enum for the `openapi2proto` library API.
//!
//! Library consumers can match on specific variants. The CLI (`main.rs`)
//! converts these to `anyhow::Error` at the binary boundary for richer
//! context messages.

/// Errors produced by `openapi2proto` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File I/O failure (reading config or `OpenAPI` documents).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A `$ref` points at a component that does not exist, or outside the document.
    ///
    /// Only local references of the form `#/components/<section>/<name>` are supported.
    #[error("unresolved reference '{reference}' at {context}")]
    UnresolvedRef {
        /// The `$ref` value as written in the document.
        reference: String,
        /// Location in the document where the reference was followed.
        context: String,
    },

    /// A component references itself, directly or through other components.
    #[error("reference cycle through component '{name}': {chain}")]
    CycleDetected {
        /// The component that was revisited.
        name: String,
        /// The chain of components being compiled, joined with ` -> `.
        chain: String,
    },

    /// A primitive schema could not be mapped to a protobuf scalar type.
    #[error("no protobuf field type for primitive schema at {schema}")]
    MissingFieldType {
        /// Location of the offending schema.
        schema: String,
    },

    /// A vendor extension has the wrong shape.
    #[error("invalid {extension} at {schema}: {reason}")]
    InvalidExtension {
        /// Location of the schema carrying the extension.
        schema: String,
        /// Extension key (e.g., `x-propertyOrder`).
        extension: String,
        /// What was expected.
        reason: String,
    },
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time assertion that `Error` is `Send + Sync`.
    /// Required for use across thread boundaries.
    const _: () = {
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    };

    #[test]
    fn unresolved_ref_message_names_location() {
        let err = Error::UnresolvedRef {
            reference: "#/components/schemas/Missing".to_string(),
            context: "components.schemas.Pet.properties.owner".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unresolved reference '#/components/schemas/Missing' at \
             components.schemas.Pet.properties.owner"
        );
    }

    #[test]
    fn cycle_message_includes_chain() {
        let err = Error::CycleDetected {
            name: "Node".to_string(),
            chain: "Node -> Edge -> Node".to_string(),
        };
        assert!(err.to_string().contains("Node -> Edge -> Node"));
    }
}

//! Components pass.

use tracing::debug;

use crate::error::Result;
use crate::openapi::{RefOr, RequestBody, REQUEST_BODY_REF_PREFIX};

use super::{Compiler, Resolved};

impl<'a> Compiler<'a> {
    /// Register every component name, then compile schemas and request bodies in key order.
    pub(super) fn compile_components(&mut self) -> Result<()> {
        let doc = self.doc;
        let components = &doc.components;

        for key in components.schemas.keys().chain(components.request_bodies.keys()) {
            let name = self.names.normalize_message_name(key);
            self.file.add_component(name);
        }

        for (key, schema) in &components.schemas {
            if self.emit_component(key, schema)? == Resolved::Empty {
                debug!(component = %key, "skipping empty schema");
            }
        }

        for (key, body) in &components.request_bodies {
            if self.emit_request_body(key, body)? == Resolved::Empty {
                debug!(component = %key, "skipping empty request body");
            }
        }
        Ok(())
    }

    /// Compile `components.requestBodies.<key>` (memoized) and return what it emitted.
    ///
    /// A body whose schema is a `$ref` emits nothing of its own and resolves
    /// to the referenced schema component.
    pub(super) fn emit_request_body(&mut self, key: &str, body: &'a RefOr<RequestBody>) -> Result<Resolved> {
        if let Some(resolved) = self.bodies.get(key) {
            return Ok(resolved.clone());
        }
        let marker = request_body_marker(key);
        self.enter(&marker)?;
        let compiled = self.rooted(&["components", "requestBodies", key], |c| {
            c.compile_request_body(key, body)
        });
        self.leave();

        let resolved = compiled?;
        self.bodies.insert(key.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn compile_request_body(&mut self, key: &str, body: &'a RefOr<RequestBody>) -> Result<Resolved> {
        let doc = self.doc;
        let body = self.resolve_indirect(
            body,
            REQUEST_BODY_REF_PREFIX,
            &doc.components.request_bodies,
        )?;
        let Some(schema) = body.json_schema() else {
            debug!(component = %key, "request body without a JSON schema");
            return Ok(Resolved::Empty);
        };

        match schema {
            RefOr::Ref { reference } => self.resolve_schema_ref(reference),
            RefOr::Item(schema) => {
                let name = self.names.normalize_message_name(key);
                let mut compiled = self.compile_schema(&name, schema)?;
                if let Some(message) = compiled.as_mut() {
                    if message.comment().is_none() {
                        message.set_comment(body.description.as_deref());
                    }
                }
                Ok(self.emit_top_level(compiled))
            }
        }
    }
}

/// Key under which a request body sits in the in-progress chain.
pub(super) fn request_body_marker(key: &str) -> String {
    format!("requestBodies.{key}")
}

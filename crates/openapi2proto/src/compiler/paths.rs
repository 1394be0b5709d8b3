//! Paths pass: one service, one RPC per operation.

use tracing::{debug, warn};

use crate::builder::{MessageBuilder, MethodBuilder, ServiceBuilder};
use crate::descriptor::HttpRule;
use crate::error::Result;
use crate::naming::NameNormalizer;
use crate::openapi::{
    Operation, Parameter, PathItem, RefOr, SchemaOrRef, PARAMETER_REF_PREFIX,
    REQUEST_BODY_REF_PREFIX, RESPONSE_REF_PREFIX,
};

use super::{last_segment, Compiler, ANNOTATIONS_PROTO};

/// Status whose response becomes the RPC output.
const SUCCESS_STATUS: &str = "200";

/// Field holding a request body that is not an object.
const BODY_FIELD: &str = "body";

/// Field holding a response that is not an object.
const RESULT_FIELD: &str = "result";

impl<'a> Compiler<'a> {
    pub(super) fn compile_paths(&mut self) -> Result<()> {
        let doc = self.doc;
        let service_name = format!(
            "{}Service",
            self.names.normalize_message_name(last_segment(self.file.package()))
        );
        let mut service = ServiceBuilder::new(service_name);

        for (path, item) in &doc.paths {
            let base = method_base_name(&self.names, path);
            for (verb, operation) in item.operations() {
                if operation.deprecated && self.config.skip_deprecated_rpc {
                    debug!(path = %path, verb, "skipping deprecated operation");
                    continue;
                }
                let name = format!("{}{base}", self.names.normalize_message_name(verb));
                if service.has_method(&name) {
                    warn!(path = %path, verb, method = %name, "skipping duplicate method");
                    continue;
                }
                let method = self.rooted(&["paths", path.as_str(), verb], |c| {
                    c.compile_operation(&name, path, verb, item, operation)
                })?;
                service.add_method(method);
            }
        }

        if service.is_empty() {
            debug!("no operations; service omitted");
        } else {
            self.file.set_service(service);
        }
        Ok(())
    }

    fn compile_operation(
        &mut self,
        name: &str,
        path: &str,
        verb: &str,
        item: &'a PathItem,
        operation: &'a Operation,
    ) -> Result<MethodBuilder> {
        let doc = self.doc;

        let mut request = MessageBuilder::new(format!("{name}Request"));
        let overridden = |p: &Parameter| {
            operation.parameters.iter().any(|op| match op {
                RefOr::Item(op) => op.name == p.name && op.location == p.location,
                RefOr::Ref { .. } => false,
            })
        };
        for parameter in &item.parameters {
            let parameter = self.resolve_indirect(
                parameter,
                PARAMETER_REF_PREFIX,
                &doc.components.parameters,
            )?;
            if !overridden(parameter) {
                self.add_parameter(&mut request, parameter)?;
            }
        }
        for parameter in &operation.parameters {
            let parameter = self.resolve_indirect(
                parameter,
                PARAMETER_REF_PREFIX,
                &doc.components.parameters,
            )?;
            self.add_parameter(&mut request, parameter)?;
        }

        let mut has_body = false;
        if let Some(body) = &operation.request_body {
            let body = self.resolve_indirect(
                body,
                REQUEST_BODY_REF_PREFIX,
                &doc.components.request_bodies,
            )?;
            if let Some(schema) = body.json_schema() {
                has_body = true;
                self.scoped("requestBody", |c| {
                    c.attach_payload(&mut request, BODY_FIELD, schema, body.required)
                })?;
            }
        }

        let mut response = MessageBuilder::new(format!("{name}Response"));
        if let Some(node) = operation.response(SUCCESS_STATUS) {
            let node = self.resolve_indirect(node, RESPONSE_REF_PREFIX, &doc.components.responses)?;
            response.set_comment(node.description.as_deref());
            if let Some(schema) = node.json_schema() {
                self.scoped(format!("responses.{SUCCESS_STATUS}"), |c| {
                    c.attach_payload(&mut response, RESULT_FIELD, schema, true)
                })?;
            }
        }

        let input = self.emit_operation_message(request);
        let output = self.emit_operation_message(response);
        let comment = doc_comment(operation.summary.as_deref(), operation.description.as_deref())
            .or_else(|| doc_comment(item.summary.as_deref(), item.description.as_deref()));
        let mut method = MethodBuilder::new(name, input, output)
            .with_comment(comment.as_deref())
            .deprecated(operation.deprecated);

        if self.config.use_annotation {
            self.file.add_dependency(ANNOTATIONS_PROTO);
            let body = if has_body { "*" } else { "" };
            method = method.with_http(HttpRule::for_operation(verb, path, body));
        }
        Ok(method)
    }

    /// Parameters in `path` and `query` become fields; headers and cookies are skipped.
    fn add_parameter(&mut self, request: &mut MessageBuilder, parameter: &'a Parameter) -> Result<()> {
        let location = parameter.location.as_str();
        if !matches!(location, "path" | "query") {
            debug!(parameter = %parameter.name, location, "skipping parameter");
            return Ok(());
        }
        let Some(schema) = &parameter.schema else {
            warn!(schema = %self.context(), parameter = %parameter.name, "parameter without schema");
            return Ok(());
        };
        let required = parameter.required || location == "path";
        self.scoped(format!("parameters.{}", parameter.name), |c| {
            c.add_property(
                request,
                &parameter.name,
                schema,
                required,
                parameter.description.as_deref(),
            )
        })
    }

    /// Object payloads merge into `message`; anything else becomes the single `field`.
    fn attach_payload(
        &mut self,
        message: &mut MessageBuilder,
        field: &str,
        schema: &'a SchemaOrRef,
        required: bool,
    ) -> Result<()> {
        match schema {
            RefOr::Item(inline) if inline.is_object_like() => {
                let hint = message.name().to_string();
                if let Some(compiled) = self.compile_schema(&hint, inline)? {
                    if message.comment().is_none() {
                        message.set_comment(compiled.comment());
                    }
                    message.merge(compiled);
                }
                Ok(())
            }
            _ => self.add_property(message, field, schema, required, None),
        }
    }

    /// Emit a request or response; empty ones become `google.protobuf.Empty`.
    fn emit_operation_message(&mut self, message: MessageBuilder) -> String {
        if message.is_empty() {
            return self.empty_type();
        }
        let name = message.name().to_string();
        if !self.file.add_message(message) {
            warn!(message = %name, "name already declared; reusing the existing type");
        }
        name
    }
}

/// `/users/{id}/posts` → `Users`; segments from the first template on are dropped.
fn method_base_name(names: &NameNormalizer, path: &str) -> String {
    let prefix = path.find("/{").map_or(path, |at| &path[..at]);
    prefix
        .split('/')
        .map(|segment| names.normalize_message_name(segment))
        .collect()
}

/// Summary and description, separated by a blank line.
fn doc_comment(summary: Option<&str>, description: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [summary, description]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_stops_at_first_template() {
        let names = NameNormalizer::default();
        assert_eq!(method_base_name(&names, "/users"), "Users");
        assert_eq!(method_base_name(&names, "/users/{id}"), "Users");
        assert_eq!(method_base_name(&names, "/users/{id}/posts"), "Users");
        assert_eq!(method_base_name(&names, "/v2/nft-categories"), "V2NftCategories");
        assert_eq!(method_base_name(&names, "/"), "");
    }

    #[test]
    fn base_name_applies_acronyms() {
        let names = NameNormalizer::new(["NFT"]);
        assert_eq!(method_base_name(&names, "/v2/nft-categories"), "V2NFTCategories");
    }

    #[test]
    fn comment_joins_summary_and_description() {
        assert_eq!(
            doc_comment(Some("List users."), Some("Paged.")).as_deref(),
            Some("List users.\n\nPaged.")
        );
        assert_eq!(doc_comment(None, Some(" Paged. ")).as_deref(), Some("Paged."));
        assert!(doc_comment(None, Some("  ")).is_none());
    }
}

//! Protobuf descriptor wire types for the openapi2proto compiler.
//!
//! This crate provides custom [`prost::Message`] types that carry the
//! `google.api.http` extension (field 72295728) and the method `deprecated`
//! option, which standard `prost_types::MethodOptions` cannot represent.
//! Message, field and enum descriptors are the standard `prost_types` ones.
//!
//! The `openapi2proto` crate builds these descriptors from `OpenAPI`
//! documents. You should not need to depend on this crate directly.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod descriptor;

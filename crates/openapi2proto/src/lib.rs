#![allow(clippy::doc_markdown)] // README uses "OpenAPI" proper noun throughout
#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
mod compiler;
mod config;
mod error;
mod naming;
pub mod openapi;
mod printer;

pub use openapi2proto_core::descriptor;

pub use compiler::{compile, compile_to_set, CompileConfig, DEFAULT_PACKAGE};
pub use config::ProjectConfig;
pub use error::{Error, Result};
pub use naming::NameNormalizer;
pub use openapi::Document;
pub use printer::print_file;

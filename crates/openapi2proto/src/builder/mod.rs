//! Mutable descriptor builders.
//!
//! Builders accumulate messages, fields, enums and methods while the
//! compiler walks a document, then [`FileBuilder::build`] freezes them into
//! an immutable [`FileDescriptorProto`](crate::descriptor::FileDescriptorProto).
//!
//! Invariants kept here rather than in the compiler:
//! - field names are unique per message and numbered densely from 1;
//! - nested and top-level types are de-duplicated by name, first wins;
//! - comments are collected for `SourceCodeInfo`.

mod enums;
mod file;
mod message;
mod service;

pub use enums::EnumBuilder;
pub use file::FileBuilder;
pub use message::{FieldBuilder, MessageBuilder, WrappedField};
pub use service::{MethodBuilder, ServiceBuilder};

use crate::descriptor::Location;

/// Descriptor-path tags from `google/protobuf/descriptor.proto`.
pub(crate) mod path {
    pub const FILE_PACKAGE: i32 = 2;
    pub const FILE_MESSAGE: i32 = 4;
    pub const FILE_ENUM: i32 = 5;
    pub const FILE_SERVICE: i32 = 6;
    pub const MESSAGE_FIELD: i32 = 2;
    pub const MESSAGE_NESTED: i32 = 3;
    pub const MESSAGE_ENUM: i32 = 4;
    pub const SERVICE_METHOD: i32 = 2;
}

/// Push a leading-comment location for `path` when `comment` has text.
pub(crate) fn push_comment(out: &mut Vec<Location>, path: &[i32], comment: Option<&str>) {
    let Some(text) = comment.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    let leading = text.lines().fold(String::new(), |mut acc, line| {
        let line = line.trim_end();
        if !line.is_empty() {
            acc.push(' ');
            acc.push_str(line);
        }
        acc.push('\n');
        acc
    });
    out.push(Location {
        path: path.to_vec(),
        span: vec![0, 0, 0],
        leading_comments: Some(leading),
        ..Default::default()
    });
}

/// `path` extended with `tag` and `index`.
pub(crate) fn child_path(path: &[i32], tag: i32, index: usize) -> Vec<i32> {
    let mut child = Vec::with_capacity(path.len() + 2);
    child.extend_from_slice(path);
    child.push(tag);
    child.push(i32::try_from(index).unwrap_or(i32::MAX));
    child
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_prefixed_per_line() {
        let mut out = Vec::new();
        push_comment(&mut out, &[4, 0], Some("A pet.\n\nOwned by a user.\n"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, [4, 0]);
        assert_eq!(
            out[0].leading_comments.as_deref(),
            Some(" A pet.\n\n Owned by a user.\n")
        );
    }

    #[test]
    fn blank_comments_are_dropped() {
        let mut out = Vec::new();
        push_comment(&mut out, &[4, 0], Some("   "));
        push_comment(&mut out, &[4, 1], None);
        assert!(out.is_empty());
    }

    #[test]
    fn child_paths_extend_parent() {
        assert_eq!(child_path(&[4, 1], path::MESSAGE_FIELD, 3), [4, 1, 2, 3]);
    }
}

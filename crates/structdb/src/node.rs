// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type tree nodes.
//!
//! The database treats a node as an opaque value: it only needs equality, a
//! content hash and a self-contained binary form. [`TypeNode`] captures that
//! contract; [`FieldTypeNode`] is the field-layout tree used by default.
//!
//! # Wire format (FieldTypeNode)
//!
//! ```text
//! type_name\0 | field_name\0 | size (4) | index (4) | is_array (4)
//! | version (4) | flags (4) | child_count (4) | child[0] | child[1] | ...
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::format::{read_count, read_string_null, write_count, write_string_null, DbEndian, FormatError};

/// Deepest tree accepted when decoding, guards against corrupt input.
pub const MAX_NODE_DEPTH: usize = 64;

/// Structural type description stored in the database.
pub trait TypeNode: Clone + Eq + Hash {
    /// Self-described name of the type at the root of the tree.
    fn type_name(&self) -> &str;

    /// Decode one node from `r`.
    fn read<R: Read>(r: &mut R) -> Result<Self, FormatError>;

    /// Encode this node to `w`.
    fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError>;

    /// Hash over the node contents, used to spot diverging descriptions.
    fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

// ---------------------------------------------------------------------------
// FieldTypeNode
// ---------------------------------------------------------------------------

/// One field of a serialized type, with its nested fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FieldTypeNode {
    /// Type of this field (e.g. "Transform", "int", "vector").
    pub type_name: String,
    /// Field name ("Base" for the root).
    pub field_name: String,
    /// Serialized byte size, -1 when variable.
    pub size: i32,
    /// Position of the field in the flattened tree.
    pub index: i32,
    pub is_array: bool,
    /// Per-field layout version.
    pub version: i32,
    /// Meta flags (alignment and similar).
    pub flags: i32,
    pub children: Vec<FieldTypeNode>,
}

impl FieldTypeNode {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            size: -1,
            version: 1,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn with_child(mut self, child: FieldTypeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(FieldTypeNode::node_count).sum::<usize>()
    }

    fn read_at_depth<R: Read>(r: &mut R, depth: usize) -> Result<Self, FormatError> {
        if depth > MAX_NODE_DEPTH {
            return Err(FormatError::TooDeep(MAX_NODE_DEPTH));
        }

        let type_name = read_string_null(r)?;
        let field_name = read_string_null(r)?;
        let size = r.read_i32::<DbEndian>()?;
        let index = r.read_i32::<DbEndian>()?;
        let is_array = r.read_i32::<DbEndian>()? != 0;
        let version = r.read_i32::<DbEndian>()?;
        let flags = r.read_i32::<DbEndian>()?;

        let child_count = read_count(r, "children")?;
        let mut children = Vec::with_capacity(child_count.min(256));
        for _ in 0..child_count {
            children.push(Self::read_at_depth(r, depth + 1)?);
        }

        Ok(Self {
            type_name,
            field_name,
            size,
            index,
            is_array,
            version,
            flags,
            children,
        })
    }

    fn fmt_at_depth(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{} {}", "", self.type_name, self.field_name, indent = depth * 2)?;
        if self.size >= 0 {
            write!(f, " (size {})", self.size)?;
        }
        if self.is_array {
            write!(f, " [array]")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.fmt_at_depth(f, depth + 1)?;
        }
        Ok(())
    }
}

impl TypeNode for FieldTypeNode {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn read<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        Self::read_at_depth(r, 0)
    }

    fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        write_string_null(w, &self.type_name)?;
        write_string_null(w, &self.field_name)?;
        w.write_i32::<DbEndian>(self.size)?;
        w.write_i32::<DbEndian>(self.index)?;
        w.write_i32::<DbEndian>(i32::from(self.is_array))?;
        w.write_i32::<DbEndian>(self.version)?;
        w.write_i32::<DbEndian>(self.flags)?;
        write_count(w, self.children.len())?;
        for child in &self.children {
            child.write(w)?;
        }
        Ok(())
    }
}

impl fmt::Display for FieldTypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at_depth(f, 0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

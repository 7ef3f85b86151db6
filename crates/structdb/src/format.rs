// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary database format.
//!
//! # Layout
//!
//! ```text
//! +---------------------------------------------------------+
//! | format version (4)                                      |
//! +---------------------------------------------------------+
//! | node count N1 (4) | node[0] ... node[N1-1]              |
//! |   deduplicated value table, nodes in TypeNode wire form |
//! +---------------------------------------------------------+
//! | version count N2 (4) | "5.4.2f1\0" ... (N2 strings)     |
//! |   deduplicated version table                            |
//! +---------------------------------------------------------+
//! | mapping count N3 (4)                                    |
//! | (node index (4), type id (4), version index (4)) * N3   |
//! +---------------------------------------------------------+
//! ```
//!
//! All integers are signed 32-bit big-endian. A file is always written in
//! full; there is no append path.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::node::TypeNode;
use crate::version::{TypeKey, Version, VersionError};

/// Byte order of every integer in the database file.
pub type DbEndian = BigEndian;

/// Current database format version.
pub const FORMAT_VERSION: i32 = 1;

/// File name used when no explicit path is configured.
pub const DEFAULT_FILE_NAME: &str = "structdb.dat";

/// Longest null-terminated string accepted when decoding.
pub const MAX_STRING_LEN: usize = 64 * 1024;

// Counts come from the file; never trust them for preallocation.
const PREALLOC_LIMIT: usize = 4096;

/// Database format errors.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: i32, got: i32 },

    #[error("Negative {table} count: {count}")]
    NegativeCount { table: &'static str, count: i32 },

    #[error("Too many {table} entries to encode: {count}")]
    TooLarge { table: &'static str, count: usize },

    #[error("Index {index} out of range for {table} table of size {len}")]
    IndexOutOfRange {
        table: &'static str,
        index: i32,
        len: usize,
    },

    #[error("Invalid string: {0}")]
    InvalidString(String),

    #[error("Invalid version: {0}")]
    Version(#[from] VersionError),

    #[error("Type tree nested deeper than {0} levels")]
    TooDeep(usize),
}

// ---------------------------------------------------------------------------
// Primitive helpers
// ---------------------------------------------------------------------------

/// Read a 32-bit table count, rejecting negative values.
pub fn read_count<R: Read>(r: &mut R, table: &'static str) -> Result<usize, FormatError> {
    let count = r.read_i32::<DbEndian>()?;
    usize::try_from(count).map_err(|_| FormatError::NegativeCount { table, count })
}

/// Write a 32-bit table count.
pub fn write_count<W: Write>(w: &mut W, count: usize) -> Result<(), FormatError> {
    let value = i32::try_from(count).map_err(|_| FormatError::TooLarge {
        table: "table",
        count,
    })?;
    w.write_i32::<DbEndian>(value)?;
    Ok(())
}

/// Read a null-terminated UTF-8 string.
pub fn read_string_null<R: Read>(r: &mut R) -> Result<String, FormatError> {
    let mut bytes = Vec::new();
    loop {
        let b = r.read_u8()?;
        if b == 0 {
            break;
        }
        if bytes.len() >= MAX_STRING_LEN {
            return Err(FormatError::InvalidString(format!(
                "string exceeds {} bytes without terminator",
                MAX_STRING_LEN
            )));
        }
        bytes.push(b);
    }
    String::from_utf8(bytes).map_err(|e| FormatError::InvalidString(e.to_string()))
}

/// Write `s` followed by a NUL byte.
pub fn write_string_null<W: Write>(w: &mut W, s: &str) -> Result<(), FormatError> {
    if s.as_bytes().contains(&0) {
        return Err(FormatError::InvalidString(format!(
            "{:?} contains a NUL byte",
            s
        )));
    }
    w.write_all(s.as_bytes())?;
    w.write_u8(0)?;
    Ok(())
}

fn lookup<'a, T>(table: &'a [T], index: i32, name: &'static str) -> Result<&'a T, FormatError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .ok_or(FormatError::IndexOutOfRange {
            table: name,
            index,
            len: table.len(),
        })
}

// ---------------------------------------------------------------------------
// Deduplicated tables
// ---------------------------------------------------------------------------

/// Value and version tables for a set of entries, each value stored once.
///
/// Entries are visited in key order so that the same mapping always
/// produces the same file.
pub struct Tables<'a, N> {
    pub nodes: Vec<&'a N>,
    pub versions: Vec<&'a Version>,
    /// (node index, type id, version index), one per entry.
    pub mappings: Vec<(i32, i32, i32)>,
}

impl<'a, N: TypeNode> Tables<'a, N> {
    pub fn build(entries: &'a HashMap<TypeKey, N>) -> Result<Self, FormatError> {
        let mut keys: Vec<&TypeKey> = entries.keys().collect();
        keys.sort();

        let mut nodes = Vec::new();
        let mut versions = Vec::new();
        let mut node_index: HashMap<&N, i32> = HashMap::new();
        let mut version_index: HashMap<&Version, i32> = HashMap::new();
        let mut mappings = Vec::with_capacity(keys.len());

        for key in keys {
            let node = &entries[key];

            let ni = match node_index.get(node) {
                Some(&i) => i,
                None => {
                    let i = table_index(nodes.len(), "node")?;
                    nodes.push(node);
                    node_index.insert(node, i);
                    i
                }
            };

            let vi = match version_index.get(&key.version) {
                Some(&i) => i,
                None => {
                    let i = table_index(versions.len(), "version")?;
                    versions.push(&key.version);
                    version_index.insert(&key.version, i);
                    i
                }
            };

            mappings.push((ni, key.type_id, vi));
        }

        Ok(Self {
            nodes,
            versions,
            mappings,
        })
    }
}

fn table_index(len: usize, table: &'static str) -> Result<i32, FormatError> {
    i32::try_from(len).map_err(|_| FormatError::TooLarge { table, count: len })
}

// ---------------------------------------------------------------------------
// Read / write
// ---------------------------------------------------------------------------

/// Decode a full database.
///
/// Any out-of-range table index aborts the whole read.
pub fn read_database<N: TypeNode, R: Read>(r: &mut R) -> Result<HashMap<TypeKey, N>, FormatError> {
    let version = r.read_i32::<DbEndian>()?;
    if version != FORMAT_VERSION {
        return Err(FormatError::VersionMismatch {
            expected: FORMAT_VERSION,
            got: version,
        });
    }

    let node_count = read_count(r, "node")?;
    let mut nodes = Vec::with_capacity(node_count.min(PREALLOC_LIMIT));
    for _ in 0..node_count {
        nodes.push(N::read(r)?);
    }

    let version_count = read_count(r, "version")?;
    let mut versions = Vec::with_capacity(version_count.min(PREALLOC_LIMIT));
    for _ in 0..version_count {
        versions.push(Version::parse(&read_string_null(r)?)?);
    }

    let mapping_count = read_count(r, "mapping")?;
    let mut entries = HashMap::with_capacity(mapping_count.min(PREALLOC_LIMIT));
    for _ in 0..mapping_count {
        let node_index = r.read_i32::<DbEndian>()?;
        let type_id = r.read_i32::<DbEndian>()?;
        let version_index = r.read_i32::<DbEndian>()?;

        let node = lookup(&nodes, node_index, "node")?;
        let version = lookup(&versions, version_index, "version")?;
        entries.insert(TypeKey::new(type_id, version.clone()), node.clone());
    }

    Ok(entries)
}

/// Encode a full database.
pub fn write_database<N: TypeNode, W: Write>(
    w: &mut W,
    entries: &HashMap<TypeKey, N>,
) -> Result<(), FormatError> {
    let tables = Tables::build(entries)?;

    w.write_i32::<DbEndian>(FORMAT_VERSION)?;

    write_count(w, tables.nodes.len())?;
    for node in &tables.nodes {
        node.write(w)?;
    }

    write_count(w, tables.versions.len())?;
    for version in &tables.versions {
        write_string_null(w, &version.to_string())?;
    }

    write_count(w, tables.mappings.len())?;
    for &(node_index, type_id, version_index) in &tables.mappings {
        w.write_i32::<DbEndian>(node_index)?;
        w.write_i32::<DbEndian>(type_id)?;
        w.write_i32::<DbEndian>(version_index)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

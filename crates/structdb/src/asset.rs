// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container view consumed by the database.
//!
//! Parsing the container itself happens elsewhere; the database only needs
//! the producer version, the object records and the per-container type tree.

use std::collections::{BTreeSet, HashMap};

use crate::node::FieldTypeNode;
use crate::version::Version;

/// One serialized object in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Object identifier within the container.
    pub path_id: i64,
    /// Type identifier of the object.
    pub type_id: i32,
}

impl ObjectRecord {
    pub fn new(path_id: i64, type_id: i32) -> Self {
        Self { path_id, type_id }
    }
}

/// Read/write view of a container's type information.
pub trait TypeContainer<N> {
    /// Version of the program that produced the container, if known.
    fn version(&self) -> Option<&Version>;

    fn objects(&self) -> &[ObjectRecord];

    /// Type trees embedded in (or filled into) the container.
    fn type_tree(&self) -> &HashMap<i32, N>;

    fn type_tree_mut(&mut self) -> &mut HashMap<i32, N>;

    /// Distinct type identifiers referenced by the object records, sorted.
    fn type_ids(&self) -> BTreeSet<i32> {
        self.objects().iter().map(|o| o.type_id).collect()
    }
}

/// Plain in-memory container.
#[derive(Debug, Clone)]
pub struct Asset<N = FieldTypeNode> {
    pub version: Option<Version>,
    pub objects: Vec<ObjectRecord>,
    pub type_tree: HashMap<i32, N>,
}

impl<N> Asset<N> {
    pub fn new(version: Option<Version>) -> Self {
        Self {
            version,
            objects: Vec::new(),
            type_tree: HashMap::new(),
        }
    }

    /// Append an object record with the next free path id.
    pub fn with_object(mut self, type_id: i32) -> Self {
        let path_id = self.objects.len() as i64 + 1;
        self.objects.push(ObjectRecord::new(path_id, type_id));
        self
    }

    pub fn with_type(mut self, type_id: i32, node: N) -> Self {
        self.type_tree.insert(type_id, node);
        self
    }
}

impl<N> TypeContainer<N> for Asset<N> {
    fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    fn objects(&self) -> &[ObjectRecord] {
        &self.objects
    }

    fn type_tree(&self) -> &HashMap<i32, N> {
        &self.type_tree
    }

    fn type_tree_mut(&mut self) -> &mut HashMap<i32, N> {
        &mut self.type_tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_are_sorted_and_distinct() {
        let asset: Asset = Asset::new(None)
            .with_object(114)
            .with_object(1)
            .with_object(4)
            .with_object(1)
            .with_object(114);

        let ids: Vec<i32> = asset.type_ids().into_iter().collect();
        assert_eq!(ids, vec![1, 4, 114]);
        assert_eq!(asset.objects()[4].path_id, 5);
    }
}

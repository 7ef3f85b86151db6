// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The type database.
//!
//! Maps `(type id, version)` to the type tree last observed for it. Callers
//! use [`TypeDatabase::fill`] to give containers without embedded type trees
//! the best known layout, and [`TypeDatabase::learn`] to harvest trees from
//! containers that carry them. [`TypeDatabase::flush_if_dirty`] rewrites the
//! file when something new was learned.
//!
//! The database is not synchronized; wrap it in a lock if it has to be
//! shared between threads.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::asset::TypeContainer;
use crate::class_id::{ClassIdTable, TypeNameResolver};
use crate::config::DatabaseConfig;
use crate::format::{read_database, write_database, FormatError, Tables};
use crate::matcher::{self, MatchQuality, NodeMatch};
use crate::node::{FieldTypeNode, TypeNode};
use crate::version::{TypeKey, Version};

/// Outcome of [`TypeDatabase::flush_if_dirty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing new since the last flush, no write performed.
    Clean,
    /// File rewritten; carries the number of entries learned since the last flush.
    Written(usize),
    /// Write failed; pending entries stay pending.
    Failed,
}

/// Table sizes of the current mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseStats {
    pub entries: usize,
    pub distinct_nodes: usize,
    pub distinct_versions: usize,
    pub type_ids: usize,
}

/// Persistent `(type id, version) -> type tree` store.
pub struct TypeDatabase<N = FieldTypeNode> {
    config: DatabaseConfig,
    nodes: HashMap<TypeKey, N>,
    learned: usize,
    names: Box<dyn TypeNameResolver + Send + Sync>,
}

impl<N: TypeNode> TypeDatabase<N> {
    /// Create an empty database that will be saved to `config.path`.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
            learned: 0,
            names: Box::new(ClassIdTable::builtin()),
        }
    }

    /// Open the database described by `config`.
    ///
    /// Never fails: a missing file, a format version mismatch or a corrupt
    /// table is logged and yields an empty database.
    pub fn open(config: DatabaseConfig) -> Self {
        info!("Loading type database");

        let source = if config.path.exists() {
            Some(config.path.clone())
        } else {
            config.fallback_path.clone().filter(|p| p.exists())
        };

        let mut db = Self::new(config);
        let Some(path) = source else {
            warn!(
                "Type database not found at {}, starting empty",
                db.config.path.display()
            );
            return db;
        };

        match read_file(&path) {
            Ok(nodes) => {
                info!("Loaded {} type(s) from {}", nodes.len(), path.display());
                db.nodes = nodes;
            }
            Err(e) => {
                error!("Can't read type database {}: {}", path.display(), e);
            }
        }
        db
    }

    /// Load `path`, surfacing any error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let mut db = Self::new(DatabaseConfig::at(path));
        db.nodes = read_file(path)?;
        Ok(db)
    }

    /// Replace the type name resolver used when learning.
    pub fn with_names(mut self, names: impl TypeNameResolver + Send + Sync + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Entries learned since the last successful flush.
    pub fn learned(&self) -> usize {
        self.learned
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Read-only view of the whole mapping.
    pub fn entries(&self) -> &HashMap<TypeKey, N> {
        &self.nodes
    }

    /// Distinct type identifiers, sorted.
    pub fn type_ids(&self) -> BTreeSet<i32> {
        self.nodes.keys().map(|k| k.type_id).collect()
    }

    /// Versions stored for `type_id`, sorted.
    pub fn versions_for(&self, type_id: i32) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self
            .nodes
            .keys()
            .filter(|k| k.type_id == type_id)
            .map(|k| &k.version)
            .collect();
        versions.sort();
        versions
    }

    pub fn stats(&self) -> Result<DatabaseStats, FormatError> {
        let tables = Tables::build(&self.nodes)?;
        Ok(DatabaseStats {
            entries: self.nodes.len(),
            distinct_nodes: tables.nodes.len(),
            distinct_versions: tables.versions.len(),
            type_ids: self.type_ids().len(),
        })
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Find the best entry for `type_id` at `version`, with its match quality.
    pub fn find_node(&self, type_id: i32, version: &Version, strict: bool) -> Option<NodeMatch<'_, N>> {
        matcher::find(&self.nodes, type_id, version, strict)
    }

    /// Find the best entry for `type_id` at `version`.
    ///
    /// Degraded matches are returned but reported.
    pub fn get_node(&self, type_id: i32, version: &Version, strict: bool) -> Option<&N> {
        let found = self.find_node(type_id, version, strict)?;
        match found.quality {
            MatchQuality::Exact => {}
            MatchQuality::SameMinor => {
                debug!(
                    "Close match for type {} (required: {}, available: {})",
                    type_id, version, found.version
                );
            }
            MatchQuality::SameMajor => {
                warn!(
                    "Imprecise match for type {} (required: {}, available: {})",
                    type_id, version, found.version
                );
            }
            MatchQuality::AnyVersion => {
                warn!(
                    "Bad match for type {} (required: {}, available: {})",
                    type_id, version, found.version
                );
            }
        }
        Some(found.node)
    }

    /// Store `node` under `(type_id, version)`, replacing any previous entry.
    pub fn add_node(&mut self, type_id: i32, version: Version, node: N) -> Option<N> {
        self.nodes.insert(TypeKey::new(type_id, version), node)
    }

    // -----------------------------------------------------------------------
    // Fill / learn
    // -----------------------------------------------------------------------

    /// Fill the container's type tree from the database.
    ///
    /// Identifiers without any stored entry are left alone. Returns the number
    /// of identifiers filled.
    pub fn fill<C: TypeContainer<N>>(&self, container: &mut C) -> usize {
        let Some(version) = container.version().cloned() else {
            warn!("Container version unknown, can't fill type tree");
            return 0;
        };

        let mut filled = 0;
        for type_id in container.type_ids() {
            if let Some(node) = self.get_node(type_id, &version, false) {
                container.type_tree_mut().insert(type_id, node.clone());
                filled += 1;
            } else {
                debug!("No type tree for type {} at {}", type_id, version);
            }
        }
        filled
    }

    /// Merge the container's embedded type trees into the database.
    ///
    /// Existing entries are never overwritten; a diverging tree for a known
    /// key is only reported. Returns the number of new entries.
    pub fn learn<C: TypeContainer<N>>(&mut self, container: &C) -> usize {
        let type_tree = container.type_tree();
        if type_tree.is_empty() {
            warn!("Empty type tree, nothing to learn");
            return 0;
        }

        let Some(version) = container.version() else {
            warn!("Container version unknown, can't learn type tree");
            return 0;
        };

        let mut learned_new = 0;
        for type_id in container.type_ids() {
            let Some(observed) = type_tree.get(&type_id) else {
                continue;
            };

            let class_name = self.names.name_for_id(type_id).map(str::to_owned);
            let stored_hash = self
                .get_node(type_id, version, true)
                .map(TypeNode::content_hash);

            match stored_hash {
                None => {
                    info!(
                        "New: {} ({})",
                        type_id,
                        class_name.as_deref().unwrap_or("unknown")
                    );
                    self.add_node(type_id, version.clone(), observed.clone());
                    learned_new += 1;
                }
                Some(stored) => {
                    let seen = observed.content_hash();
                    if seen != stored {
                        warn!(
                            "Database hash mismatch for {} ({} at {}): {:#x} != {:#x}",
                            observed.type_name(),
                            type_id,
                            version,
                            seen,
                            stored
                        );
                    }
                }
            }

            if class_name.is_none() {
                warn!(
                    "Unknown type id {}, suggested name: {}",
                    type_id,
                    observed.type_name()
                );
            }
        }

        self.learned += learned_new;
        learned_new
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Rewrite the database file with the full current mapping.
    pub fn save(&self) -> Result<(), FormatError> {
        let path = &self.config.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if self.config.atomic_save {
            let temp_path = self.config.temp_path();
            if let Err(e) = self.write_to(&temp_path) {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
            fs::rename(&temp_path, path)?;
        } else {
            self.write_to(path)?;
        }

        debug!("Wrote {} type(s) to {}", self.nodes.len(), path.display());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), FormatError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        write_database(&mut writer, &self.nodes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Save if anything was learned since the last successful flush.
    pub fn flush_if_dirty(&mut self) -> FlushOutcome {
        if self.learned == 0 {
            return FlushOutcome::Clean;
        }

        info!("Adding {} new type(s) to database", self.learned);
        match self.save() {
            Ok(()) => {
                let written = self.learned;
                self.learned = 0;
                FlushOutcome::Written(written)
            }
            Err(e) => {
                error!(
                    "Can't write type database {}: {}",
                    self.config.path.display(),
                    e
                );
                FlushOutcome::Failed
            }
        }
    }
}

fn read_file<N: TypeNode>(path: &Path) -> Result<HashMap<TypeKey, N>, FormatError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_database(&mut reader)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use tempfile::tempdir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn node(name: &str) -> FieldTypeNode {
        FieldTypeNode::new(name, "Base")
    }

    fn db_in(dir: &Path) -> TypeDatabase {
        TypeDatabase::new(DatabaseConfig::at(dir.join("structdb.dat")))
    }

    #[test]
    fn add_node_later_call_wins() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());
        assert!(db.add_node(1, v("5.0.0"), node("A")).is_none());
        assert_eq!(db.add_node(1, v("5.0.0"), node("B")), Some(node("A")));
        assert_eq!(db.len(), 1);
        assert_eq!(db.get_node(1, &v("5.0.0"), true), Some(&node("B")));
        assert_eq!(db.learned(), 0);
    }

    #[test]
    fn open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let db: TypeDatabase = TypeDatabase::open(DatabaseConfig::at(dir.path().join("nope.dat")));
        assert!(db.is_empty());
    }

    #[test]
    fn open_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("structdb.dat");
        fs::write(&path, [0u8, 0, 0, 9, 1, 2, 3]).unwrap();

        let db: TypeDatabase = TypeDatabase::open(DatabaseConfig::at(&path));
        assert!(db.is_empty());
        assert!(matches!(
            TypeDatabase::<FieldTypeNode>::load_from(&path),
            Err(FormatError::VersionMismatch { got: 9, .. })
        ));
    }

    #[test]
    fn open_uses_fallback_when_primary_missing() {
        let dir = tempdir().unwrap();
        let seed_path = dir.path().join("seed.dat");
        let mut seed = TypeDatabase::new(DatabaseConfig::at(&seed_path));
        seed.add_node(4, v("5.0.0f4"), node("Transform"));
        seed.save().unwrap();

        let primary = dir.path().join("structdb.dat");
        let config = DatabaseConfig::builder()
            .path(&primary)
            .fallback_path(&seed_path)
            .build();
        let mut db: TypeDatabase = TypeDatabase::open(config);
        assert_eq!(db.len(), 1);

        // saving goes to the primary path, the seed is untouched
        db.add_node(1, v("5.0.0f4"), node("GameObject"));
        db.save().unwrap();
        assert!(primary.exists());
        assert_eq!(TypeDatabase::<FieldTypeNode>::load_from(&seed_path).unwrap().len(), 1);
        assert_eq!(TypeDatabase::<FieldTypeNode>::load_from(&primary).unwrap().len(), 2);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());
        db.add_node(1, v("4.6.1p3"), node("GameObject"));
        db.add_node(1, v("5.0.0f4"), node("GameObject"));
        db.add_node(4, v("5.0.0f4"), node("Transform"));
        db.save().unwrap();

        assert!(!db.config().temp_path().exists());

        let loaded: TypeDatabase = TypeDatabase::open(db.config().clone());
        assert_eq!(loaded.entries(), db.entries());
        assert_eq!(loaded.versions_for(1), vec![&v("4.6.1p3"), &v("5.0.0f4")]);
        assert_eq!(loaded.type_ids().into_iter().collect::<Vec<_>>(), vec![1, 4]);

        let stats = loaded.stats().unwrap();
        assert_eq!(
            stats,
            DatabaseStats {
                entries: 3,
                distinct_nodes: 2,
                distinct_versions: 2,
                type_ids: 2,
            }
        );
    }

    #[test]
    fn in_place_save_without_temp_file() {
        let dir = tempdir().unwrap();
        let config = DatabaseConfig::builder()
            .path(dir.path().join("nested").join("structdb.dat"))
            .atomic_save(false)
            .build();
        let mut db = TypeDatabase::new(config);
        db.add_node(1, v("5.0.0"), node("GameObject"));
        db.save().unwrap();

        let loaded: TypeDatabase = TypeDatabase::open(db.config().clone());
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn fill_without_version_is_noop() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());
        db.add_node(1, v("5.0.0"), node("GameObject"));

        let mut asset: Asset = Asset::new(None).with_object(1);
        assert_eq!(db.fill(&mut asset), 0);
        assert!(asset.type_tree.is_empty());
    }

    #[test]
    fn fill_uses_fallback_matches() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());
        db.add_node(1, v("5.0.0"), node("GameObject"));
        db.add_node(4, v("4.2.0"), node("Transform"));

        let mut asset: Asset = Asset::new(Some(v("5.3.1")))
            .with_object(1)
            .with_object(4)
            .with_object(4)
            .with_object(28);
        assert_eq!(db.fill(&mut asset), 2);
        assert_eq!(asset.type_tree[&1], node("GameObject"));
        assert_eq!(asset.type_tree[&4], node("Transform"));
        assert!(!asset.type_tree.contains_key(&28));
    }

    #[test]
    fn learn_early_exits() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());

        let empty_tree: Asset = Asset::new(Some(v("5.0.0"))).with_object(1);
        assert_eq!(db.learn(&empty_tree), 0);

        let no_version = Asset::new(None).with_object(1).with_type(1, node("GameObject"));
        assert_eq!(db.learn(&no_version), 0);
        assert!(db.is_empty());
        assert_eq!(db.learned(), 0);
    }

    #[test]
    fn learn_skips_types_without_objects_or_trees() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());

        // type 4 has a tree but no object, type 28 has an object but no tree
        let asset = Asset::new(Some(v("5.0.0")))
            .with_object(1)
            .with_object(28)
            .with_type(1, node("GameObject"))
            .with_type(4, node("Transform"));
        assert_eq!(db.learn(&asset), 1);
        assert_eq!(db.type_ids().into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn learn_counts_and_flush_resets() {
        let dir = tempdir().unwrap();
        let mut db = db_in(dir.path());
        assert_eq!(db.flush_if_dirty(), FlushOutcome::Clean);
        assert!(!db.config().path.exists());

        let asset = Asset::new(Some(v("5.0.0")))
            .with_object(1)
            .with_object(4)
            .with_type(1, node("GameObject"))
            .with_type(4, node("Transform"));
        assert_eq!(db.learn(&asset), 2);
        assert_eq!(db.learned(), 2);
        assert_eq!(db.learn(&asset), 0);
        assert_eq!(db.learned(), 2);

        assert_eq!(db.flush_if_dirty(), FlushOutcome::Written(2));
        assert_eq!(db.learned(), 0);
        assert!(db.config().path.exists());
        assert_eq!(db.flush_if_dirty(), FlushOutcome::Clean);
    }

    #[test]
    fn failed_flush_keeps_pending_count() {
        let dir = tempdir().unwrap();
        // a directory in place of the file makes the rename fail
        let blocked = dir.path().join("structdb.dat");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), b"x").unwrap();

        let mut db: TypeDatabase = TypeDatabase::new(DatabaseConfig::at(&blocked));
        let asset = Asset::new(Some(v("5.0.0")))
            .with_object(1)
            .with_type(1, node("GameObject"));
        assert_eq!(db.learn(&asset), 1);

        assert_eq!(db.flush_if_dirty(), FlushOutcome::Failed);
        assert_eq!(db.learned(), 1);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn learn_uses_custom_names() {
        let dir = tempdir().unwrap();
        let mut names = ClassIdTable::new();
        names.insert(9001, "CustomThing");
        let mut db = db_in(dir.path()).with_names(names);

        let asset = Asset::new(Some(v("2019.4.1f1")))
            .with_object(9001)
            .with_type(9001, node("CustomThing"));
        assert_eq!(db.learn(&asset), 1);
    }
}

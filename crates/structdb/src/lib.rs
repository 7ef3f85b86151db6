// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Versioned type tree database.
//!
//! Serialized containers do not always embed the layout of the objects they
//! hold. This crate keeps a persistent map from `(type id, producer version)`
//! to the type tree observed for it, fills the gaps in containers that lack
//! trees, and learns new trees from containers that carry them.
//!
//! # Features
//!
//! - **Best-effort lookup**: exact version, then same `major.minor`, then
//!   same `major`, then any stored version, with degraded matches reported
//! - **Learning**: merge embedded trees, never overwriting known entries,
//!   reporting hash mismatches and unknown type ids
//! - **Persistence**: compact binary file with deduplicated node and version
//!   tables, rewritten in full (atomically by default)
//!
//! # Quick Start
//!
//! ```no_run
//! use structdb::{Asset, DatabaseConfig, TypeDatabase, Version};
//!
//! let mut db: TypeDatabase = TypeDatabase::open(DatabaseConfig::default());
//! let mut asset: Asset = Asset::new(Some(Version::parse("5.4.2f1").unwrap())).with_object(1);
//! db.fill(&mut asset);
//! db.learn(&asset);
//! db.flush_if_dirty();
//! ```

pub mod asset;
pub mod class_id;
pub mod config;
pub mod database;
pub mod format;
pub mod matcher;
pub mod node;
pub mod version;

pub use asset::{Asset, ObjectRecord, TypeContainer};
pub use class_id::{ClassIdTable, TypeNameResolver};
pub use config::{DatabaseConfig, DatabaseConfigBuilder};
pub use database::{DatabaseStats, FlushOutcome, TypeDatabase};
pub use format::{FormatError, DEFAULT_FILE_NAME, FORMAT_VERSION};
pub use matcher::{MatchQuality, NodeMatch};
pub use node::{FieldTypeNode, TypeNode};
pub use version::{TypeKey, Version, VersionError};

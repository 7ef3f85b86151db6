// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! structdb - Inspect a type tree database.
//!
//! Usage:
//!   structdb --db structdb.dat info
//!   structdb --db structdb.dat list --type-id 114 --json
//!   structdb --db structdb.dat lookup 4 5.4.2f1 --tree

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use structdb::{
    config::default_path, ClassIdTable, FieldTypeNode, TypeDatabase, TypeNameResolver, TypeNode,
    Version, FORMAT_VERSION,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "structdb")]
#[command(about = "Inspect a versioned type tree database")]
#[command(version)]
struct Args {
    /// Database file (default: structdb.dat next to this program)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show table sizes
    Info,
    /// List stored keys
    List {
        /// Only show entries for this type id
        #[arg(long)]
        type_id: Option<i32>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Look up a type tree, falling back to other versions
    Lookup {
        /// Type id
        type_id: i32,

        /// Requested version (e.g. 5.4.2f1)
        version: String,

        /// Only accept an exact version match
        #[arg(long)]
        strict: bool,

        /// Print the type tree
        #[arg(long)]
        tree: bool,
    },
}

#[derive(Serialize)]
struct ListEntry<'a> {
    type_id: i32,
    class_name: Option<&'a str>,
    version: &'a Version,
    type_name: &'a str,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .init();

    let path = args.db.unwrap_or_else(default_path);
    let db: TypeDatabase<FieldTypeNode> = TypeDatabase::load_from(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!("Loaded {} type(s) from {}", db.len(), path.display());

    let names = ClassIdTable::builtin();

    match args.command {
        Commands::Info => {
            let stats = db.stats()?;
            println!("File:           {}", path.display());
            println!("Format version: {}", FORMAT_VERSION);
            println!("Entries:        {}", stats.entries);
            println!("Unique nodes:   {}", stats.distinct_nodes);
            println!("Versions:       {}", stats.distinct_versions);
            println!("Type ids:       {}", stats.type_ids);
        }
        Commands::List { type_id, json } => {
            let mut keys: Vec<_> = db
                .entries()
                .iter()
                .filter(|(k, _)| type_id.map_or(true, |id| k.type_id == id))
                .collect();
            keys.sort_by(|a, b| a.0.cmp(b.0));

            let rows: Vec<ListEntry<'_>> = keys
                .into_iter()
                .map(|(key, node)| ListEntry {
                    type_id: key.type_id,
                    class_name: names.name_for_id(key.type_id),
                    version: &key.version,
                    type_name: node.type_name(),
                })
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!(
                        "{:>6}  {:<24} {:<16} {}",
                        row.type_id,
                        row.class_name.unwrap_or("?"),
                        row.version,
                        row.type_name
                    );
                }
            }
        }
        Commands::Lookup {
            type_id,
            version,
            strict,
            tree,
        } => {
            let version = Version::parse(&version)?;
            match db.find_node(type_id, &version, strict) {
                Some(found) => {
                    println!(
                        "{} ({}) {}: {} match, stored at {}",
                        type_id,
                        names.name_for_id(type_id).unwrap_or("?"),
                        version,
                        found.quality,
                        found.version
                    );
                    if tree {
                        print!("{}", found.node);
                    }
                }
                None => {
                    println!("{} {}: no match", type_id, version);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Producer versions and the composite database key.
//!
//! A [`Version`] is the revision tag of the program that wrote a container,
//! e.g. `5.4.2f1` or `2017.1.0b3`. Only `major` and `minor` take part in
//! fallback matching; the trailing components only matter for exact keys.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,

    #[error("invalid {part} component in version {input:?}")]
    InvalidNumber { part: &'static str, input: String },

    #[error("missing minor component in version {0:?}")]
    MissingMinor(String),

    #[error("empty trailing component in version {0:?}")]
    EmptyComponent(String),

    #[error("version {0:?} contains a NUL byte")]
    ContainsNul(String),
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Parsed `major.minor[.component]*` version tag. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    rest: Vec<String>,
}

impl Version {
    /// Build a version without trailing components.
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            rest: Vec::new(),
        }
    }

    /// Parse a version string such as `"4.6.1p3"`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        if trimmed.contains('\0') {
            return Err(VersionError::ContainsNul(input.to_string()));
        }

        let mut parts = trimmed.split('.');
        let major = parse_number(parts.next(), "major", input)?;
        let minor = match parts.next() {
            Some(part) => parse_number(Some(part), "minor", input)?,
            None => return Err(VersionError::MissingMinor(input.to_string())),
        };

        let mut rest = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(VersionError::EmptyComponent(input.to_string()));
            }
            rest.push(part.to_string());
        }

        Ok(Self { major, minor, rest })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Components after `major.minor`, verbatim.
    pub fn trailing(&self) -> &[String] {
        &self.rest
    }

    /// True if both versions share `major` and `minor`.
    pub fn same_minor(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// True if both versions share `major`.
    pub fn same_major(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

fn parse_number(part: Option<&str>, name: &'static str, input: &str) -> Result<u32, VersionError> {
    part.and_then(|p| p.parse::<u32>().ok())
        .ok_or_else(|| VersionError::InvalidNumber {
            part: name,
            input: input.to_string(),
        })
}

/// Split a trailing component into its numeric prefix and the remainder,
/// so that `"10f1"` sorts after `"2f1"`.
fn natural_key(component: &str) -> (Option<u64>, &str) {
    let split = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    let (digits, suffix) = component.split_at(split);
    (digits.parse::<u64>().ok(), suffix)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then_with(|| {
                let natural = self.rest.iter().map(|c| natural_key(c));
                natural.cmp(other.rest.iter().map(|c| natural_key(c)))
            })
            .then_with(|| self.rest.cmp(&other.rest))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        for part in &self.rest {
            write!(f, ".{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// TypeKey
// ---------------------------------------------------------------------------

/// Database key: a type identifier paired with the producer version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    pub type_id: i32,
    pub version: Version,
}

impl TypeKey {
    pub fn new(type_id: i32, version: Version) -> Self {
        Self { type_id, version }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.type_id, self.version)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

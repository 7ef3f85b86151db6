// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Best-effort version matching.
//!
//! Schema revisions of one type are usually close enough to reuse when the
//! exact producer version is missing, so a lookup degrades through tiers
//! instead of failing:
//!
//! | Quality      | Stored version vs requested       |
//! |--------------|-----------------------------------|
//! | `Exact`      | identical                         |
//! | `SameMinor`  | same major and minor              |
//! | `SameMajor`  | same major, different minor       |
//! | `AnyVersion` | anything stored for the type id   |
//!
//! Within a tier the highest stored version wins, so the result never
//! depends on map iteration order.

use std::collections::HashMap;
use std::fmt;

use crate::version::{TypeKey, Version};

/// How closely a stored entry matches the requested version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    Exact,
    SameMinor,
    SameMajor,
    AnyVersion,
}

impl MatchQuality {
    /// True when the caller should be told that precision was lost.
    pub fn is_degraded(self) -> bool {
        matches!(self, MatchQuality::SameMajor | MatchQuality::AnyVersion)
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchQuality::Exact => "exact",
            MatchQuality::SameMinor => "same minor",
            MatchQuality::SameMajor => "same major",
            MatchQuality::AnyVersion => "any version",
        };
        f.write_str(s)
    }
}

/// Result of a lookup: the node plus where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMatch<'a, N> {
    pub node: &'a N,
    /// Version of the stored entry that was picked.
    pub version: &'a Version,
    pub quality: MatchQuality,
}

/// Best candidate seen so far in one fallback tier.
struct Slot<'a, N> {
    best: Option<(&'a Version, &'a N)>,
}

impl<'a, N> Slot<'a, N> {
    fn new() -> Self {
        Self { best: None }
    }

    fn offer(&mut self, version: &'a Version, node: &'a N) {
        match self.best {
            Some((current, _)) if current >= version => {}
            _ => self.best = Some((version, node)),
        }
    }
}

/// Look up `type_id` at `version`.
///
/// An exact key always wins. With `strict` set nothing else is considered;
/// otherwise a single pass over the entries of `type_id` fills the fallback
/// tiers and the best non-empty tier is returned.
pub fn find<'a, N>(
    entries: &'a HashMap<TypeKey, N>,
    type_id: i32,
    version: &Version,
    strict: bool,
) -> Option<NodeMatch<'a, N>> {
    let key = TypeKey::new(type_id, version.clone());
    if let Some((stored, node)) = entries.get_key_value(&key) {
        return Some(NodeMatch {
            node,
            version: &stored.version,
            quality: MatchQuality::Exact,
        });
    }

    if strict {
        return None;
    }

    let mut same_minor = Slot::new();
    let mut same_major = Slot::new();
    let mut any = Slot::new();

    for (key, node) in entries.iter().filter(|(k, _)| k.type_id == type_id) {
        let stored = &key.version;
        if stored.same_minor(version) {
            same_minor.offer(stored, node);
        } else if stored.same_major(version) {
            same_major.offer(stored, node);
        } else {
            any.offer(stored, node);
        }
    }

    [
        (same_minor, MatchQuality::SameMinor),
        (same_major, MatchQuality::SameMajor),
        (any, MatchQuality::AnyVersion),
    ]
    .into_iter()
    .find_map(|(slot, quality)| {
        slot.best.map(|(version, node)| NodeMatch {
            node,
            version,
            quality,
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn entries(items: &[(i32, &str, &'static str)]) -> HashMap<TypeKey, &'static str> {
        items
            .iter()
            .map(|&(id, ver, node)| (TypeKey::new(id, v(ver)), node))
            .collect()
    }

    #[test]
    fn exact_match_ignores_strict() {
        let map = entries(&[(7, "2.5", "a"), (7, "2.0", "b")]);
        for strict in [false, true] {
            let m = find(&map, 7, &v("2.5"), strict).unwrap();
            assert_eq!(*m.node, "a");
            assert_eq!(m.quality, MatchQuality::Exact);
        }
    }

    #[test]
    fn strict_disables_fallback() {
        let map = entries(&[(7, "2.5", "a")]);
        assert!(find(&map, 7, &v("2.9"), true).is_none());
        assert!(find(&map, 7, &v("2.9"), false).is_some());
    }

    #[test]
    fn tiers_are_ordered() {
        let map = entries(&[(7, "2.0", "two-oh"), (7, "2.5", "two-five"), (7, "3.1", "three-one")]);

        let m = find(&map, 7, &v("2.9"), false).unwrap();
        assert_eq!(m.quality, MatchQuality::SameMajor);
        assert_eq!(*m.node, "two-five");
        assert_eq!(m.version, &v("2.5"));

        let m = find(&map, 7, &v("9.0"), false).unwrap();
        assert_eq!(m.quality, MatchQuality::AnyVersion);
        assert_eq!(*m.node, "three-one");

        let m = find(&map, 7, &v("3.1.2f1"), false).unwrap();
        assert_eq!(m.quality, MatchQuality::SameMinor);
        assert_eq!(*m.node, "three-one");
    }

    #[test]
    fn same_minor_prefers_highest_patch() {
        let map = entries(&[(7, "5.4.1f1", "old"), (7, "5.4.10f1", "new"), (7, "5.4.2f1", "mid")]);
        let m = find(&map, 7, &v("5.4.0f3"), false).unwrap();
        assert_eq!(m.quality, MatchQuality::SameMinor);
        assert_eq!(*m.node, "new");
    }

    #[test]
    fn other_type_ids_are_ignored() {
        let map = entries(&[(8, "2.5", "other")]);
        assert!(find(&map, 7, &v("2.5"), false).is_none());
    }

    #[test]
    fn empty_map_finds_nothing() {
        let map: HashMap<TypeKey, &str> = HashMap::new();
        assert!(find(&map, 1, &v("1.0"), false).is_none());
    }

    #[test]
    fn degraded_qualities() {
        assert!(!MatchQuality::Exact.is_degraded());
        assert!(!MatchQuality::SameMinor.is_degraded());
        assert!(MatchQuality::SameMajor.is_degraded());
        assert!(MatchQuality::AnyVersion.is_degraded());
        assert_eq!(MatchQuality::SameMajor.to_string(), "same major");
    }
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Absolute, slash-delimited address of a node inside a stage.
///
/// Examples:
/// - `/` (the pseudo-root)
/// - `/World`
/// - `/World/Cube`
///
/// Every segment must be an identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodePathError {
    #[error("node path must not be empty")]
    Empty,
    #[error("node path must be absolute (start with '/')")]
    NotAbsolute,
    #[error("node path must not contain empty segments")]
    EmptySegment,
    #[error("invalid node name {0:?}")]
    InvalidSegment(String),
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier regex"))
}

pub fn is_identifier(segment: &str) -> bool {
    identifier_regex().is_match(segment)
}

/// Turns an arbitrary label (a file stem, a display name) into a valid node name.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>();
    if out.is_empty() {
        return "_".to_owned();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

impl NodePath {
    pub fn root() -> Self {
        Self { value: "/".to_owned() }
    }

    pub fn parse(input: &str) -> Result<Self, NodePathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(NodePathError::Empty);
        }
        if !input.starts_with('/') {
            return Err(NodePathError::NotAbsolute);
        }
        if input == "/" {
            return Ok(Self::root());
        }
        let body = input.strip_suffix('/').unwrap_or(input);
        for segment in body[1..].split('/') {
            if segment.is_empty() {
                return Err(NodePathError::EmptySegment);
            }
            if !is_identifier(segment) {
                return Err(NodePathError::InvalidSegment(segment.to_owned()));
            }
        }
        Ok(Self { value: body.to_owned() })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_root(&self) -> bool {
        self.value == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.value.split('/').filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment; empty for the pseudo-root.
    pub fn name(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or("")
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.value.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self { value: self.value[..idx].to_owned() }),
            None => None,
        }
    }

    pub fn child(&self, name: &str) -> Result<Self, NodePathError> {
        if !is_identifier(name) {
            return Err(NodePathError::InvalidSegment(name.to_owned()));
        }
        let value =
            if self.is_root() { format!("/{name}") } else { format!("{}/{name}", self.value) };
        Ok(Self { value })
    }

    /// Ancestors from the outermost root node down to (and including) `self`.
    /// The pseudo-root is not included.
    pub fn lineage(&self) -> Vec<Self> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = String::new();
        for segment in self.segments() {
            current.push('/');
            current.push_str(segment);
            out.push(Self { value: current.clone() });
        }
        out
    }

    pub fn has_prefix(&self, prefix: &Self) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.value == prefix.value
            || (self.value.starts_with(&prefix.value)
                && self.value.as_bytes().get(prefix.value.len()) == Some(&b'/'))
    }

    /// Re-roots `self` from `from` onto `to` (`/A/B/C` with `/A` → `/X` gives `/X/B/C`).
    pub fn replace_prefix(&self, from: &Self, to: &Self) -> Option<Self> {
        if !self.has_prefix(from) {
            return None;
        }
        let rest = if from.is_root() { &self.value[..] } else { &self.value[from.value.len()..] };
        if rest.is_empty() || rest == "/" {
            return Some(to.clone());
        }
        if to.is_root() {
            return Some(Self { value: rest.to_owned() });
        }
        Some(Self { value: format!("{}{rest}", to.value) })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for NodePath {
    type Err = NodePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn np(value: &str) -> NodePath {
        NodePath::parse(value).expect("node path")
    }

    #[rstest]
    #[case("", NodePathError::Empty)]
    #[case("World/Cube", NodePathError::NotAbsolute)]
    #[case("/World//Cube", NodePathError::EmptySegment)]
    #[case("/World/1Cube", NodePathError::InvalidSegment("1Cube".to_owned()))]
    #[case("/World/Cu be", NodePathError::InvalidSegment("Cu be".to_owned()))]
    fn parse_rejects_malformed_paths(#[case] input: &str, #[case] expected: NodePathError) {
        assert_eq!(NodePath::parse(input), Err(expected));
    }

    #[test]
    fn parse_trims_and_drops_trailing_slash() {
        assert_eq!(np("  /World/Cube/ ").as_str(), "/World/Cube");
        assert!(np("/").is_root());
    }

    #[test]
    fn parent_and_child_navigate() {
        let cube = np("/World/Cube");
        assert_eq!(cube.parent(), Some(np("/World")));
        assert_eq!(np("/World").parent(), Some(NodePath::root()));
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(NodePath::root().child("World").expect("child"), np("/World"));
        assert_eq!(cube.name(), "Cube");
        assert!(cube.child("bad name").is_err());
    }

    #[test]
    fn lineage_lists_outermost_first() {
        let lineage = np("/A/B/C").lineage();
        assert_eq!(lineage, vec![np("/A"), np("/A/B"), np("/A/B/C")]);
        assert!(NodePath::root().lineage().is_empty());
    }

    #[test]
    fn prefix_checks_respect_segment_boundaries() {
        assert!(np("/World/Cube").has_prefix(&np("/World")));
        assert!(!np("/WorldX/Cube").has_prefix(&np("/World")));
        assert!(np("/World").has_prefix(&NodePath::root()));
    }

    #[test]
    fn replace_prefix_reroots() {
        let mapped = np("/Mop/Geom/Handle").replace_prefix(&np("/Mop"), &np("/Assets/Mop"));
        assert_eq!(mapped, Some(np("/Assets/Mop/Geom/Handle")));
        let from_root = np("/Geom").replace_prefix(&NodePath::root(), &np("/Assets/Mop"));
        assert_eq!(from_root, Some(np("/Assets/Mop/Geom")));
    }

    #[rstest]
    #[case("scene assembly", "scene_assembly")]
    #[case("3dmodel", "_3dmodel")]
    #[case("", "_")]
    #[case("Mop-v2", "Mop_v2")]
    fn sanitize_identifier_produces_valid_names(#[case] raw: &str, #[case] expected: &str) {
        let sanitized = sanitize_identifier(raw);
        assert_eq!(sanitized, expected);
        assert!(is_identifier(&sanitized));
    }
}

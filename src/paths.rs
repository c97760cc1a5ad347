// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turns caller-supplied path strings into absolute, lexically normalized paths. Absolute
//! input without `~` or `$` is only trimmed.
//!
//! Resolution never touches the filesystem: a path that does not exist is only discovered
//! when the engine tries to open it.

use std::collections::BTreeMap;
use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path must not be empty")]
    Empty,
    #[error("unknown environment variable ${name}")]
    UnknownVariable { name: String },
}

impl From<PathError> for GatewayError {
    fn from(err: PathError) -> Self {
        let message = format!("invalid path: {err}");
        match err {
            PathError::Empty => GatewayError::invalid_params(message),
            PathError::UnknownVariable { name } => {
                GatewayError::invalid_params(message).with_detail("variable", name)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    base_dir: Option<PathBuf>,
    home: Option<String>,
    vars: BTreeMap<String, String>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative inputs join onto `base_dir` instead of the process working directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Variables consulted before the process environment.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        if !has_tokens(trimmed) && Path::new(trimmed).is_absolute() {
            return Ok(PathBuf::from(trimmed));
        }

        let expanded = shellexpand::full_with_context(
            trimmed,
            || self.home_dir(),
            |name: &str| -> Result<Option<String>, PathError> {
                match self.lookup(name) {
                    Some(value) => Ok(Some(value)),
                    None => Err(PathError::UnknownVariable { name: name.to_owned() }),
                }
            },
        )
        .map_err(|err| err.cause)?;

        let candidate = PathBuf::from(expanded.as_ref());
        let absolute =
            if candidate.is_absolute() { candidate } else { self.base_dir().join(candidate) };
        Ok(normalize_lexically(&absolute))
    }

    fn home_dir(&self) -> Option<String> {
        self.home
            .clone()
            .or_else(|| env::var("HOME").ok())
            .or_else(|| env::var("USERPROFILE").ok())
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned().or_else(|| env::var(name).ok())
    }
}

fn has_tokens(raw: &str) -> bool {
    raw.starts_with('~') || raw.contains('$')
}

/// Drops `.` components and folds `..` into its parent; `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

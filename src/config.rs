// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::json_stage::WriteDurability;
use crate::model::Axis;

/// Host-tunable gateway behavior. Every field has a default, so an empty TOML file is valid.
///
/// ```toml
/// base_dir = "/srv/scenes"
/// save_by_default = true
/// assembly_up_axis = "Z"
/// assembly_flatten = true
/// bounds_fallback = true
/// write_durability = "durable"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base for relative paths; the process working directory when unset.
    pub base_dir: Option<PathBuf>,
    /// Whether stateless mutations save when the caller does not pass `save`.
    pub save_by_default: bool,
    pub assembly_up_axis: Axis,
    pub assembly_flatten: bool,
    /// Re-derive world bounds from local boxes that come back centered on the origin.
    pub bounds_fallback: bool,
    pub write_durability: WriteDurability,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            save_by_default: true,
            assembly_up_axis: Axis::Z,
            assembly_flatten: true,
            bounds_fallback: true,
            write_durability: WriteDurability::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl GatewayConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

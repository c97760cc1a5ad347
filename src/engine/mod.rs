// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scene-graph engine capability.
//!
//! The gateway never parses stage files itself. Everything it needs from a scene-description
//! library goes through [`Engine`] (open/create by path) and [`Document`] (one open stage).
//! [`json_stage::JsonStageEngine`] is the bundled implementation.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Axis, BBox, NodePath, Specifier, TimeCode, XformOp};

pub mod json_stage;

pub use json_stage::JsonStageEngine;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("stage file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("stage file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed stage document {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
    #[error("prim not found: {node}")]
    NodeNotFound { node: NodePath },
    #[error("attribute not found: {node}.{attr}")]
    AttributeNotFound { node: NodePath, attr: String },
    #[error("variant {set}={variant} not found on {node}")]
    VariantNotFound { node: NodePath, set: String, variant: String },
    #[error("reference cycle through {}", path.display())]
    ReferenceCycle { path: PathBuf },
    /// The engine refused an otherwise well-formed request.
    #[error("{0}")]
    Rejected(String),
}

/// Stage-level options applied when a new document is created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CreateOptions {
    pub up_axis: Option<Axis>,
    pub meters_per_unit: Option<f64>,
}

/// A reference arc: `asset_path` as authored (relative to the referencing layer or absolute),
/// `prim_path` selecting a node inside the asset (`None` binds the asset's default node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub asset_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prim_path: Option<NodePath>,
}

impl Reference {
    pub fn new(asset_path: impl Into<String>, prim_path: Option<NodePath>) -> Self {
        Self { asset_path: asset_path.into(), prim_path }
    }
}

/// What a single variant contributes to its node while selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantContent {
    pub references: Vec<Reference>,
    pub xform_ops: Option<Vec<XformOp>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantSetInfo {
    pub variants: Vec<String>,
    pub selection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub path: NodePath,
    pub type_name: Option<String>,
    pub specifier: Specifier,
    pub attributes: Vec<String>,
    pub relationships: Vec<String>,
    pub has_references: bool,
    pub variant_sets: Vec<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub identifier: PathBuf,
    pub layers: Vec<PathBuf>,
    pub root_prims: Vec<NodePath>,
    pub up_axis: Axis,
    pub meters_per_unit: f64,
    pub default_prim: Option<NodePath>,
    pub start_time_code: f64,
    pub end_time_code: f64,
}

/// Opens and creates documents by path.
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self, path: &Path) -> Result<Box<dyn Document>, EngineError>;

    /// A new, unsaved document bound to `path`. Nothing is written until `save`, which
    /// replaces any file at `path`; callers that must not clobber check `exists` first.
    fn create(&self, path: &Path, options: CreateOptions)
        -> Result<Box<dyn Document>, EngineError>;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// One open stage. Queries see the composed scene; mutations author into the root layer.
pub trait Document: Send {
    fn identifier(&self) -> &Path;

    fn save(&mut self) -> Result<(), EngineError>;

    /// Writes the stage to `path` without rebinding this handle. `flatten` inlines all
    /// composition arcs into one self-contained layer.
    fn export(&self, path: &Path, flatten: bool) -> Result<(), EngineError>;

    /// Writes one archive at `path` holding the root layer first and every layer it
    /// references after it. Returns the entry names in archive order.
    fn package(&self, path: &Path) -> Result<Vec<String>, EngineError>;

    fn summary(&self) -> Result<StageSummary, EngineError>;

    fn up_axis(&self) -> Axis;
    fn set_up_axis(&mut self, axis: Axis);
    fn meters_per_unit(&self) -> f64;
    fn set_meters_per_unit(&mut self, meters_per_unit: f64);
    fn default_prim(&self) -> Option<NodePath>;
    fn set_default_prim(&mut self, node: &NodePath) -> Result<(), EngineError>;

    /// Composed root-level nodes.
    fn root_nodes(&self) -> Result<Vec<NodePath>, EngineError>;
    fn children(&self, node: &NodePath) -> Result<Vec<NodePath>, EngineError>;
    fn node_exists(&self, node: &NodePath) -> bool;
    fn node_info(&self, node: &NodePath) -> Result<NodeInfo, EngineError>;
    /// Every composed node, parents before children.
    fn traverse(&self) -> Result<Vec<NodePath>, EngineError>;

    /// Defines (or re-specifies) a node; missing ancestors are defined untyped.
    fn define_node(
        &mut self,
        node: &NodePath,
        type_name: Option<&str>,
        specifier: Specifier,
    ) -> Result<(), EngineError>;
    fn remove_node(&mut self, node: &NodePath) -> Result<(), EngineError>;

    /// `None` when the attribute has neither an authored value nor a schema fallback.
    fn attribute(
        &self,
        node: &NodePath,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<Value>, EngineError>;
    fn set_attribute(
        &mut self,
        node: &NodePath,
        name: &str,
        value: Value,
        time: TimeCode,
    ) -> Result<(), EngineError>;

    /// `None` when no relationship of that name is authored.
    fn relationship_targets(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<Vec<NodePath>>, EngineError>;
    fn set_relationship_targets(
        &mut self,
        node: &NodePath,
        name: &str,
        targets: Vec<NodePath>,
    ) -> Result<(), EngineError>;

    /// The op stack authored in the root layer for `node` (empty if none).
    fn authored_xform_ops(&self, node: &NodePath) -> Result<Vec<XformOp>, EngineError>;
    /// The op stack after composition (local opinion, else variant, else references).
    fn composed_xform_ops(&self, node: &NodePath) -> Result<Vec<XformOp>, EngineError>;
    fn set_xform_ops(&mut self, node: &NodePath, ops: Vec<XformOp>) -> Result<(), EngineError>;

    /// Bounding box of the subtree's geometry; `None` when it holds no geometry.
    fn compute_bounds(&self, node: &NodePath, time: TimeCode)
        -> Result<Option<BBox>, EngineError>;

    fn references(&self, node: &NodePath) -> Result<Vec<Reference>, EngineError>;
    /// Returns `false` when an identical reference is already authored.
    fn add_reference(&mut self, node: &NodePath, reference: Reference)
        -> Result<bool, EngineError>;
    fn asset_resolves(&self, asset_path: &str) -> bool;

    fn variant_sets(
        &self,
        node: &NodePath,
    ) -> Result<BTreeMap<String, VariantSetInfo>, EngineError>;
    /// Creates `variant` or replaces everything it held with `content`.
    fn author_variant(
        &mut self,
        node: &NodePath,
        set: &str,
        variant: &str,
        content: VariantContent,
    ) -> Result<(), EngineError>;
    /// What the root layer authors for `variant`; `None` when it authors nothing.
    fn variant_content(
        &self,
        node: &NodePath,
        set: &str,
        variant: &str,
    ) -> Result<Option<VariantContent>, EngineError>;
    fn remove_variant(&mut self, node: &NodePath, set: &str, variant: &str)
        -> Result<(), EngineError>;
    /// Rejected unless the variant exists and has authored content.
    fn set_variant_selection(
        &mut self,
        node: &NodePath,
        set: &str,
        variant: &str,
    ) -> Result<(), EngineError>;
}

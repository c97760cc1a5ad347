// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Multi-asset reference assembly.
//!
//! `compose_assembly` is ensure-shaped: running it again with the same request finds every
//! container, target node and reference already in place and adds nothing. All arguments and
//! every source asset are checked before the output stage is opened; the output is saved only
//! once every asset has been composed. Flattened asset copies written by a call that then
//! fails are removed again.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::coerce::InternalPath;
use crate::engine::{CreateOptions, Document, Engine, Reference};
use crate::error::GatewayError;
use crate::model::{is_identifier, sanitize_identifier, Axis, NodePath, Specifier, XformOp};

use super::variants::reference_prim;
use super::xform::{apply_transform, TransformRequest};

/// Corrective rotation for content authored under a different up-axis.
pub const UP_AXIS_CORRECTION: XformOp = XformOp::Rotate([-90.0, 0.0, 0.0]);

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub asset_path: PathBuf,
    pub name: Option<String>,
    pub internal_path: InternalPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyRequest {
    pub output_path: PathBuf,
    pub assets: Vec<AssetRequest>,
    pub container_root: Option<NodePath>,
    pub flatten: bool,
    pub up_axis: Axis,
    pub set_default_prim: bool,
    pub clear_existing: bool,
    pub skip_if_exists: bool,
}

impl AssemblyRequest {
    pub fn new(output_path: impl Into<PathBuf>, assets: Vec<AssetRequest>) -> Self {
        Self {
            output_path: output_path.into(),
            assets,
            container_root: None,
            flatten: true,
            up_axis: Axis::Z,
            set_default_prim: true,
            clear_existing: false,
            skip_if_exists: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub output_path: PathBuf,
    pub container_root: NodePath,
    pub created_nodes: Vec<NodePath>,
    pub referenced: Vec<NodePath>,
    pub skipped: Vec<NodePath>,
}

/// One validated asset, with its source stage kept open for flattening.
struct PlannedAsset {
    name: String,
    target: NodePath,
    prim: Option<NodePath>,
    source: Box<dyn Document>,
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn default_container(output: &Path) -> Result<NodePath, GatewayError> {
    NodePath::root()
        .child(&sanitize_identifier(&file_stem(output)))
        .map_err(|err| GatewayError::invalid_key("container_root", err.to_string()))
}

fn plan(
    engine: &dyn Engine,
    request: &AssemblyRequest,
    container: &NodePath,
) -> Result<Vec<PlannedAsset>, GatewayError> {
    if request.assets.is_empty() {
        return Err(GatewayError::invalid_key("assets", "at least one asset is required"));
    }
    if request.set_default_prim && container.depth() != 1 {
        return Err(GatewayError::invalid_key(
            "container_root",
            format!("container_root must be a root-level prim to be the default prim: {container}"),
        ));
    }

    let mut names = BTreeSet::new();
    let mut planned = Vec::with_capacity(request.assets.len());
    for (index, asset) in request.assets.iter().enumerate() {
        let key = |field: &str| format!("assets[{index}].{field}");
        if !engine.exists(&asset.asset_path) {
            return Err(GatewayError::not_found(format!(
                "asset not found: {}",
                asset.asset_path.display()
            ))
            .with_detail("key", key("asset_path"))
            .with_detail("asset_path", asset.asset_path.display().to_string()));
        }

        let name = match &asset.name {
            Some(name) => name.clone(),
            None => sanitize_identifier(&file_stem(&asset.asset_path)),
        };
        if !is_identifier(&name) {
            return Err(GatewayError::invalid_key(
                key("name"),
                format!("invalid asset name: {name:?}"),
            ));
        }
        if !names.insert(name.clone()) {
            return Err(GatewayError::invalid_key(
                key("name"),
                format!("duplicate asset name: {name}"),
            ));
        }
        let target = container
            .child(&name)
            .map_err(|err| GatewayError::invalid_key(key("name"), err.to_string()))?;

        let source = engine
            .open(&asset.asset_path)
            .map_err(|err| GatewayError::open_failed(&asset.asset_path, &err))?;
        if let InternalPath::Node(node) = &asset.internal_path {
            if !source.node_exists(node) {
                return Err(GatewayError::not_found(format!(
                    "internal_path {node} not found in {}",
                    asset.asset_path.display()
                ))
                .with_detail("key", key("internal_path"))
                .with_detail("prim_path", node.as_str()));
            }
        }

        planned.push(PlannedAsset {
            name,
            target,
            prim: reference_prim(&asset.internal_path),
            source,
        });
    }
    Ok(planned)
}

/// Where the flattened copy of an asset lands: next to the output, `<name>.flat.<ext>`.
fn flattened_path(output: &Path, name: &str) -> PathBuf {
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_owned());
    let dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
    dir.join(format!("{name}.flat.{ext}"))
}

/// Flattened copies one call created; removed on drop unless the call commits.
#[derive(Default)]
struct FlatCopies {
    created: Vec<PathBuf>,
    committed: bool,
}

impl FlatCopies {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for FlatCopies {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.created {
            if let Err(err) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %err, "could not remove flattened copy");
            }
        }
    }
}

pub fn compose_assembly(
    engine: &dyn Engine,
    request: &AssemblyRequest,
) -> Result<AssemblyReport, GatewayError> {
    let output = request.output_path.as_path();
    let container = match &request.container_root {
        Some(root) => root.clone(),
        None => default_container(output)?,
    };
    let planned = plan(engine, request, &container)?;

    let mut doc = if engine.exists(output) {
        engine.open(output)
    } else {
        let options = CreateOptions { up_axis: Some(request.up_axis), meters_per_unit: None };
        engine.create(output, options)
    }
    .map_err(|err| GatewayError::open_failed(output, &err))?;

    let mut report = AssemblyReport {
        output_path: output.to_path_buf(),
        container_root: container.clone(),
        created_nodes: Vec::new(),
        referenced: Vec::new(),
        skipped: Vec::new(),
    };

    if request.clear_existing {
        for root in doc.root_nodes()? {
            doc.remove_node(&root)?;
        }
    }
    if !container.is_root() && !doc.node_exists(&container) {
        doc.define_node(&container, Some("Xform"), Specifier::Def)?;
        report.created_nodes.push(container.clone());
    }

    let mut flat_copies = FlatCopies::default();
    for asset in &planned {
        let asset_ref = if request.flatten {
            let flat = flattened_path(output, &asset.name);
            let existed = engine.exists(&flat);
            if !(request.skip_if_exists && existed) {
                asset
                    .source
                    .export(&flat, true)
                    .map_err(|err| GatewayError::export_failed(&flat, &err))?;
                if !existed {
                    flat_copies.created.push(flat.clone());
                }
            }
            flat.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default()
        } else {
            asset.source.identifier().display().to_string()
        };
        let reference = Reference::new(asset_ref, asset.prim.clone());

        if request.skip_if_exists
            && doc.node_exists(&asset.target)
            && doc.references(&asset.target)?.contains(&reference)
        {
            tracing::debug!(prim_path = %asset.target, "asset already composed; skipping");
            report.skipped.push(asset.target.clone());
            continue;
        }

        if !doc.node_exists(&asset.target) {
            doc.define_node(&asset.target, Some("Xform"), Specifier::Def)?;
            report.created_nodes.push(asset.target.clone());
        }
        if doc.add_reference(&asset.target, reference)? {
            report.referenced.push(asset.target.clone());
        }
        if request.flatten && asset.source.up_axis() != request.up_axis {
            let correction = TransformRequest::Ops(vec![UP_AXIS_CORRECTION]);
            apply_transform(doc.as_mut(), &asset.target, correction)?;
        }
    }

    doc.set_up_axis(request.up_axis);
    if request.set_default_prim {
        doc.set_default_prim(&container)?;
    }
    doc.save().map_err(|err| GatewayError::save_failed(output, &err))?;
    flat_copies.commit();

    tracing::info!(
        output = %output.display(),
        container_root = %container,
        created = report.created_nodes.len(),
        referenced = report.referenced.len(),
        skipped = report.skipped.len(),
        "assembly composed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests;

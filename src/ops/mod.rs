// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Stage operations behind the tool surface.
//!
//! Every operation takes an already open document and canonical, typed arguments. Whether the
//! document came from a session or a transient stateless handle, and whether it is saved
//! afterwards, is decided by the caller.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::coerce::InternalPath;
use crate::engine::{Document, Reference};
use crate::envelope::ItemStatus;
use crate::error::GatewayError;
use crate::model::{NodePath, Specifier, TimeCode};

pub mod assembly;
pub mod bounds;
pub mod cameras;
pub mod materials;
pub mod variants;
pub mod xform;

pub use assembly::{compose_assembly, AssemblyReport, AssemblyRequest, AssetRequest};
pub use bounds::{compute_bounds, BoundsReport};
pub use cameras::{CameraParams, CameraReport};
pub use materials::MaterialBinding;
pub use variants::{author_variants, VariantAuthoring, VariantRequest};
pub use xform::{apply_transform, get_xform, TransformRequest, XformReport};

pub const DEFAULT_LIST_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeValue {
    pub prim_path: NodePath,
    pub attr: String,
    pub value: Value,
    pub time: TimeCode,
}

/// One entry of a batch attribute write.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdate {
    pub prim_path: NodePath,
    pub attr: String,
    pub value: Value,
    pub time: TimeCode,
}

/// One entry of a batch reference request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceUpdate {
    pub prim_path: NodePath,
    pub asset_path: String,
    pub internal_path: InternalPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemStatus>,
    pub applied: usize,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<Result<(), GatewayError>>) -> Self {
        let applied = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let items = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| ItemStatus::from_outcome(index, outcome))
            .collect();
        Self { items, applied }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimCreated {
    pub prim_path: NodePath,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimDeleted {
    pub prim_path: NodePath,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub output_path: PathBuf,
    pub flattened: bool,
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub output_path: PathBuf,
    /// Archive entries, root layer first; empty when skipped.
    pub layers: Vec<String>,
    pub skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingDefaultPrim,
    UnresolvedReference,
    DanglingRelationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prim_path: Option<NodePath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub issues: Vec<Issue>,
}

fn require_prim(doc: &dyn Document, node: &NodePath) -> Result<(), GatewayError> {
    if node.is_root() || !doc.node_exists(node) {
        return Err(GatewayError::node_not_found(node));
    }
    Ok(())
}

/// Node paths under `root` down to `depth` levels, parents first.
///
/// A concrete `root` is listed itself (level 0); the pseudo-root is not, so its children sit
/// at level 1. `type_filter` restricts the output but not the descent.
pub fn list_prims(
    doc: &dyn Document,
    root: &NodePath,
    depth: usize,
    type_filter: Option<&str>,
) -> Result<Vec<NodePath>, GatewayError> {
    if !root.is_root() {
        require_prim(doc, root)?;
    }
    let mut stack: Vec<(NodePath, usize)> = if root.is_root() {
        doc.root_nodes()?.into_iter().rev().map(|node| (node, 1)).collect()
    } else {
        vec![(root.clone(), 0)]
    };

    let mut out = Vec::new();
    while let Some((node, level)) = stack.pop() {
        if level > depth {
            continue;
        }
        let keep = match type_filter {
            None => true,
            Some(wanted) => doc.node_info(&node)?.type_name.as_deref() == Some(wanted),
        };
        if level < depth {
            let children = doc.children(&node)?;
            stack.extend(children.into_iter().rev().map(|child| (child, level + 1)));
        }
        if keep {
            out.push(node);
        }
    }
    Ok(out)
}

pub fn get_attribute(
    doc: &dyn Document,
    node: &NodePath,
    attr: &str,
    time: TimeCode,
) -> Result<AttributeValue, GatewayError> {
    require_prim(doc, node)?;
    let value = doc.attribute(node, attr, time)?.ok_or_else(|| {
        GatewayError::not_found(format!("attribute not found: {node}.{attr}"))
            .with_detail("prim_path", node.as_str())
            .with_detail("attr", attr)
    })?;
    Ok(AttributeValue { prim_path: node.clone(), attr: attr.to_owned(), value, time })
}

/// Writes `value`, creating the attribute when the node does not author it yet.
pub fn set_attribute(
    doc: &mut dyn Document,
    node: &NodePath,
    attr: &str,
    value: Value,
    time: TimeCode,
) -> Result<AttributeValue, GatewayError> {
    require_prim(doc, node)?;
    doc.set_attribute(node, attr, value.clone(), time)?;
    Ok(AttributeValue { prim_path: node.clone(), attr: attr.to_owned(), value, time })
}

/// Applies each update independently; failed items are reported, not fatal.
pub fn batch_set_attributes(
    doc: &mut dyn Document,
    items: Vec<Result<AttributeUpdate, GatewayError>>,
) -> BatchReport {
    let outcomes = items
        .into_iter()
        .map(|item| {
            let update = item?;
            set_attribute(&mut *doc, &update.prim_path, &update.attr, update.value, update.time)
                .map(|_| ())
        })
        .collect();
    BatchReport::from_outcomes(outcomes)
}

pub fn create_prim(
    doc: &mut dyn Document,
    node: &NodePath,
    type_name: Option<&str>,
    specifier: Specifier,
) -> Result<PrimCreated, GatewayError> {
    if node.is_root() {
        return Err(GatewayError::invalid_key("prim_path", "cannot create the pseudo-root"));
    }
    let existed = doc.node_exists(node);
    doc.define_node(node, type_name, specifier)?;
    Ok(PrimCreated { prim_path: node.clone(), created: !existed })
}

pub fn delete_prim(doc: &mut dyn Document, node: &NodePath) -> Result<PrimDeleted, GatewayError> {
    require_prim(doc, node)?;
    doc.remove_node(node)?;
    Ok(PrimDeleted { prim_path: node.clone(), deleted: true })
}

pub fn set_default_prim(doc: &mut dyn Document, node: &NodePath) -> Result<NodePath, GatewayError> {
    require_prim(doc, node)?;
    doc.set_default_prim(node)?;
    Ok(node.clone())
}

/// Writes the stage to `output`, optionally flattened. With `skip_if_exists` an existing
/// output is left alone.
pub fn export(
    doc: &dyn Document,
    output: &Path,
    flatten: bool,
    skip_if_exists: bool,
) -> Result<ExportReport, GatewayError> {
    if skip_if_exists && output.exists() {
        tracing::debug!(output = %output.display(), "export target exists; skipping");
        let output_path = output.to_path_buf();
        return Ok(ExportReport { output_path, flattened: flatten, skipped: true });
    }
    doc.export(output, flatten).map_err(|err| GatewayError::export_failed(output, &err))?;
    Ok(ExportReport { output_path: output.to_path_buf(), flattened: flatten, skipped: false })
}

/// Packages the stage and every layer it references into one archive at `output`.
pub fn export_package(
    doc: &dyn Document,
    output: &Path,
    skip_if_exists: bool,
) -> Result<PackageReport, GatewayError> {
    let output_path = output.to_path_buf();
    if skip_if_exists && output.exists() {
        tracing::debug!(output = %output.display(), "package exists; skipping");
        return Ok(PackageReport { output_path, layers: Vec::new(), skipped: true });
    }
    let layers = doc.package(output).map_err(|err| GatewayError::export_failed(output, &err))?;
    tracing::info!(output = %output.display(), layers = layers.len(), "stage packaged");
    Ok(PackageReport { output_path, layers, skipped: false })
}

/// Authoring problems a consumer of the stage would trip over.
pub fn validate(doc: &dyn Document) -> Result<ValidationReport, GatewayError> {
    let mut issues = Vec::new();
    let roots = doc.root_nodes()?;

    match doc.default_prim() {
        None if !roots.is_empty() => issues.push(Issue {
            code: IssueCode::MissingDefaultPrim,
            message: "stage has root prims but no default prim".to_owned(),
            prim_path: None,
        }),
        Some(default) if !doc.node_exists(&default) => issues.push(Issue {
            code: IssueCode::MissingDefaultPrim,
            message: format!("default prim {default} does not exist"),
            prim_path: Some(default),
        }),
        _ => {}
    }

    for node in doc.traverse()? {
        for reference in doc.references(&node)? {
            if !doc.asset_resolves(&reference.asset_path) {
                issues.push(Issue {
                    code: IssueCode::UnresolvedReference,
                    message: format!("referenced asset not found: {}", reference.asset_path),
                    prim_path: Some(node.clone()),
                });
            }
        }
        for rel in doc.node_info(&node)?.relationships {
            let targets = doc.relationship_targets(&node, &rel)?.unwrap_or_default();
            for target in targets.iter().filter(|target| !doc.node_exists(target)) {
                issues.push(Issue {
                    code: IssueCode::DanglingRelationship,
                    message: format!("{node}.{rel} targets missing prim {target}"),
                    prim_path: Some(node.clone()),
                });
            }
        }
    }
    Ok(ValidationReport { ok: issues.is_empty(), issues })
}

fn add_reference(doc: &mut dyn Document, update: ReferenceUpdate) -> Result<(), GatewayError> {
    if update.prim_path.is_root() {
        return Err(GatewayError::invalid_key("prim_path", "cannot reference onto the pseudo-root"));
    }
    if !doc.asset_resolves(&update.asset_path) {
        return Err(GatewayError::not_found(format!("asset not found: {}", update.asset_path))
            .with_detail("asset_path", update.asset_path.as_str()));
    }
    if !doc.node_exists(&update.prim_path) {
        doc.define_node(&update.prim_path, Some("Xform"), Specifier::Def)?;
    }
    let prim = variants::reference_prim(&update.internal_path);
    doc.add_reference(&update.prim_path, Reference::new(update.asset_path, prim))?;
    Ok(())
}

/// Adds each reference independently, defining missing target prims as `Xform`.
pub fn add_references(
    doc: &mut dyn Document,
    items: Vec<Result<ReferenceUpdate, GatewayError>>,
) -> BatchReport {
    let outcomes = items.into_iter().map(|item| add_reference(&mut *doc, item?)).collect();
    BatchReport::from_outcomes(outcomes)
}

#[cfg(test)]
mod tests;

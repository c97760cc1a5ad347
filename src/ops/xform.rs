// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Transform op stacks: reading, merging and writing them back.
//!
//! Only the addressed node's own root-layer stack is ever written. When the node's transform
//! comes from a referenced asset, op kinds the request does not name are carried over from the
//! composed stack so inherited scale keeps applying under a new local translate or rotate.

use serde::Serialize;

use crate::engine::Document;
use crate::error::GatewayError;
use crate::model::{local_matrix, Matrix4, NodePath, XformOp, XformOpKind};

#[derive(Debug, Clone, PartialEq)]
pub enum TransformRequest {
    Ops(Vec<XformOp>),
    Matrix(Matrix4),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XformReport {
    pub prim_path: NodePath,
    pub ops: Vec<XformOp>,
    pub local_matrix: Matrix4,
    pub world_matrix: Matrix4,
}

/// Merges `requested` into the node's `authored` stack.
///
/// A requested op replaces the first authored op of the same kind in place, otherwise it is
/// appended in request order. Authored matrix ops are dropped. Kinds that only `inherited`
/// carries (and the request does not name) are appended last with their inherited values.
pub fn merge_ops(authored: &[XformOp], inherited: &[XformOp], requested: &[XformOp]) -> Vec<XformOp> {
    let mut stack: Vec<XformOp> =
        authored.iter().filter(|op| op.kind() != XformOpKind::Matrix).copied().collect();

    for op in requested {
        match stack.iter_mut().find(|existing| existing.kind() == op.kind()) {
            Some(slot) => *slot = *op,
            None => stack.push(*op),
        }
    }

    for op in inherited {
        let kind = op.kind();
        if kind != XformOpKind::Matrix && !stack.iter().any(|existing| existing.kind() == kind) {
            stack.push(*op);
        }
    }
    stack
}

/// World transform of `node`: its composed local matrix times every ancestor's.
pub fn world_matrix(doc: &dyn Document, node: &NodePath) -> Result<Matrix4, GatewayError> {
    let mut world = Matrix4::identity();
    for ancestor in node.lineage() {
        let local = local_matrix(&doc.composed_xform_ops(&ancestor)?);
        world = local.mul(&world);
    }
    Ok(world)
}

pub fn get_xform(doc: &dyn Document, node: &NodePath) -> Result<XformReport, GatewayError> {
    if !doc.node_exists(node) || node.is_root() {
        return Err(GatewayError::node_not_found(node));
    }
    let ops = doc.composed_xform_ops(node)?;
    Ok(XformReport {
        prim_path: node.clone(),
        local_matrix: local_matrix(&ops),
        world_matrix: world_matrix(doc, node)?,
        ops,
    })
}

/// Writes `request` onto `node`'s op stack and reports the resulting transforms.
pub fn apply_transform(
    doc: &mut dyn Document,
    node: &NodePath,
    request: TransformRequest,
) -> Result<XformReport, GatewayError> {
    if !doc.node_exists(node) || node.is_root() {
        return Err(GatewayError::node_not_found(node));
    }
    let stack = match request {
        TransformRequest::Matrix(matrix) => vec![XformOp::Matrix(matrix)],
        TransformRequest::Ops(requested) => {
            if requested.is_empty() {
                return Err(GatewayError::invalid_key("ops", "ops must not be empty"));
            }
            let authored = doc.authored_xform_ops(node)?;
            let inherited = doc.composed_xform_ops(node)?;
            merge_ops(&authored, &inherited, &requested)
        }
    };
    doc.set_xform_ops(node, stack)?;
    get_xform(doc, node)
}

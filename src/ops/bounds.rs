// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! World-space bounding boxes.

use serde::Serialize;

use crate::engine::Document;
use crate::error::GatewayError;
use crate::model::{NodePath, TimeCode, Vec3};

use super::xform::world_matrix;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundsReport {
    pub prim_path: NodePath,
    pub min: Option<Vec3>,
    pub max: Option<Vec3>,
    pub empty: bool,
}

impl BoundsReport {
    fn empty(node: &NodePath) -> Self {
        Self { prim_path: node.clone(), min: None, max: None, empty: true }
    }
}

/// Bounds of `node`'s subtree in world space.
///
/// Some engines answer hierarchy queries in the node's local frame. With `fallback` on, a box
/// centered on the origin under a non-identity world matrix is taken to be local and its
/// corners are pushed through that matrix.
pub fn compute_bounds(
    doc: &dyn Document,
    node: &NodePath,
    time: TimeCode,
    fallback: bool,
) -> Result<BoundsReport, GatewayError> {
    if !node.is_root() && !doc.node_exists(node) {
        return Err(GatewayError::node_not_found(node));
    }
    let Some(mut bbox) = doc.compute_bounds(node, time)? else {
        return Ok(BoundsReport::empty(node));
    };

    if fallback && !node.is_root() {
        let world = world_matrix(doc, node)?;
        if !world.is_identity() && bbox.is_centered_on_origin() {
            tracing::warn!(prim_path = %node, "bounds look local; applying world transform");
            bbox = bbox.transformed(&world);
        }
    }

    Ok(BoundsReport { prim_path: node.clone(), min: Some(bbox.min), max: Some(bbox.max), empty: false })
}

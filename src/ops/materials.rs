// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Serialize;

use crate::engine::Document;
use crate::error::GatewayError;
use crate::model::NodePath;

pub const MATERIAL_TYPE: &str = "Material";
pub const BINDING_REL: &str = "material:binding";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialBinding {
    pub prim_path: NodePath,
    /// The effective material, possibly bound on an ancestor.
    pub material_path: Option<NodePath>,
    /// Whether `prim_path` itself authors a binding relationship.
    pub binding_rel_exists: bool,
    pub binding_targets: Vec<NodePath>,
}

fn require_node(doc: &dyn Document, node: &NodePath) -> Result<(), GatewayError> {
    if node.is_root() || !doc.node_exists(node) {
        return Err(GatewayError::node_not_found(node));
    }
    Ok(())
}

fn is_material(doc: &dyn Document, node: &NodePath) -> Result<bool, GatewayError> {
    Ok(doc.node_info(node)?.type_name.as_deref() == Some(MATERIAL_TYPE))
}

pub fn list_materials(doc: &dyn Document) -> Result<Vec<NodePath>, GatewayError> {
    let mut out = Vec::new();
    for node in doc.traverse()? {
        if is_material(doc, &node)? {
            out.push(node);
        }
    }
    Ok(out)
}

pub fn bind_material(
    doc: &mut dyn Document,
    node: &NodePath,
    material: &NodePath,
) -> Result<(), GatewayError> {
    require_node(doc, node)?;
    require_node(doc, material)?;
    if !is_material(doc, material)? {
        return Err(GatewayError::invalid_key("material_path", format!("not a Material: {material}"))
            .with_detail("material_path", material.as_str()));
    }
    doc.set_relationship_targets(node, BINDING_REL, vec![material.clone()])?;
    Ok(())
}

/// Clears the node's direct binding. The relationship stays authored with no targets.
pub fn unbind_material(doc: &mut dyn Document, node: &NodePath) -> Result<(), GatewayError> {
    require_node(doc, node)?;
    doc.set_relationship_targets(node, BINDING_REL, Vec::new())?;
    Ok(())
}

pub fn material_binding(doc: &dyn Document, node: &NodePath) -> Result<MaterialBinding, GatewayError> {
    require_node(doc, node)?;
    let direct = doc.relationship_targets(node, BINDING_REL)?;

    let mut material_path = None;
    for ancestor in node.lineage().iter().rev() {
        let targets = doc.relationship_targets(ancestor, BINDING_REL)?.unwrap_or_default();
        if let Some(target) = targets.into_iter().find(|t| doc.node_exists(t)) {
            material_path = Some(target);
            break;
        }
    }

    Ok(MaterialBinding {
        prim_path: node.clone(),
        material_path,
        binding_rel_exists: direct.is_some(),
        binding_targets: direct.unwrap_or_default(),
    })
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Variant sets: listing, switching and one-shot authoring of a whole set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::coerce::InternalPath;
use crate::engine::{Document, Reference, VariantContent, VariantSetInfo};
use crate::error::GatewayError;
use crate::model::{is_identifier, NodePath, Specifier, XformOp};

/// One variant of an authoring request, already coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRequest {
    pub name: String,
    pub asset_reference: String,
    pub internal_path: InternalPath,
    pub transform: Option<Vec<XformOp>>,
}

impl VariantRequest {
    fn reference(&self) -> Reference {
        Reference::new(self.asset_reference.clone(), reference_prim(&self.internal_path))
    }
}

/// The reference selector for an internal path: `None` binds the asset's default prim.
pub fn reference_prim(internal_path: &InternalPath) -> Option<NodePath> {
    match internal_path {
        InternalPath::AssetDefault => None,
        InternalPath::Root => Some(NodePath::root()),
        InternalPath::Node(node) => Some(node.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantListing {
    pub prim_path: NodePath,
    pub variant_sets: BTreeMap<String, VariantSetInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSelection {
    pub prim_path: NodePath,
    pub set_name: String,
    pub selection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantAuthoring {
    pub prim_path: NodePath,
    pub set_name: String,
    pub variant_names: Vec<String>,
    pub selected: Option<String>,
}

pub fn list_variants(doc: &dyn Document, node: &NodePath) -> Result<VariantListing, GatewayError> {
    if node.is_root() || !doc.node_exists(node) {
        return Err(GatewayError::node_not_found(node));
    }
    Ok(VariantListing { prim_path: node.clone(), variant_sets: doc.variant_sets(node)? })
}

pub fn set_variant(
    doc: &mut dyn Document,
    node: &NodePath,
    set_name: &str,
    variant: &str,
) -> Result<VariantSelection, GatewayError> {
    if node.is_root() || !doc.node_exists(node) {
        return Err(GatewayError::node_not_found(node));
    }
    doc.set_variant_selection(node, set_name, variant)?;
    Ok(VariantSelection {
        prim_path: node.clone(),
        set_name: set_name.to_owned(),
        selection: variant.to_owned(),
    })
}

fn validate(
    doc: &dyn Document,
    set_name: &str,
    variants: &[VariantRequest],
) -> Result<(), GatewayError> {
    if !is_identifier(set_name) {
        return Err(GatewayError::invalid_key(
            "set_name",
            format!("invalid variant set name: {set_name:?}"),
        ));
    }
    if variants.is_empty() {
        return Err(GatewayError::invalid_key("variants", "at least one variant is required"));
    }
    let mut seen = BTreeSet::new();
    for (index, variant) in variants.iter().enumerate() {
        if !is_identifier(&variant.name) {
            return Err(GatewayError::invalid_key(
                format!("variants[{index}].name"),
                format!("invalid variant name: {:?}", variant.name),
            ));
        }
        if !seen.insert(variant.name.as_str()) {
            return Err(GatewayError::invalid_key(
                format!("variants[{index}].name"),
                format!("duplicate variant name: {}", variant.name),
            ));
        }
        if !doc.asset_resolves(&variant.asset_reference) {
            return Err(GatewayError::not_found(format!(
                "referenced asset not found: {}",
                variant.asset_reference
            ))
            .with_detail("key", format!("variants[{index}].asset_reference"))
            .with_detail("asset_reference", variant.asset_reference.as_str()));
        }
    }
    Ok(())
}

/// Authors every variant of `variants` under `set_name` on `node`, then applies `select`.
///
/// A listed variant that already exists has its content replaced. Nothing is touched until
/// every argument has been checked, and the set is authored as a unit: if the engine fails
/// partway, replaced variants get their previous content back, variants created by this call
/// are removed, and a node this call defined is removed with them.
pub fn author_variants(
    doc: &mut dyn Document,
    node: &NodePath,
    set_name: &str,
    variants: &[VariantRequest],
    select: Option<&str>,
) -> Result<VariantAuthoring, GatewayError> {
    if node.is_root() {
        return Err(GatewayError::invalid_key("prim_path", "variants cannot live on the pseudo-root"));
    }
    validate(doc, set_name, variants)?;

    let node_existed = doc.node_exists(node);
    let existing: Vec<String> = if node_existed {
        doc.variant_sets(node)?.remove(set_name).map(|info| info.variants).unwrap_or_default()
    } else {
        Vec::new()
    };
    if let Some(select) = select {
        let known = variants.iter().any(|v| v.name == select) || existing.iter().any(|v| v == select);
        if !known {
            return Err(GatewayError::not_found(format!(
                "variant {select:?} is neither authored nor present in set {set_name}"
            ))
            .with_detail("select", select)
            .with_detail("set_name", set_name));
        }
    }

    // Outermost ancestor this call brings into existence, removed again on rollback.
    let first_new = node.lineage().into_iter().find(|ancestor| !doc.node_exists(ancestor));
    if !node_existed {
        doc.define_node(node, Some("Xform"), Specifier::Def)?;
    }

    let mut touched: Vec<Touched<'_>> = Vec::new();
    let outcome = (|| -> Result<(), GatewayError> {
        for variant in variants {
            let previous = if node_existed {
                doc.variant_content(node, set_name, &variant.name)?
            } else {
                None
            };
            touched.push(Touched { name: &variant.name, previous });
            let content = VariantContent {
                references: vec![variant.reference()],
                xform_ops: variant.transform.clone(),
            };
            doc.author_variant(node, set_name, &variant.name, content)?;
        }
        if let Some(select) = select {
            doc.set_variant_selection(node, set_name, select)?;
        }
        Ok(())
    })();

    if let Err(err) = outcome {
        rollback(doc, node, set_name, touched, first_new.as_ref());
        return Err(err);
    }

    let selected = doc.variant_sets(node)?.remove(set_name).and_then(|info| info.selection);
    tracing::debug!(prim_path = %node, set_name, variants = variants.len(), "variant set authored");
    Ok(VariantAuthoring {
        prim_path: node.clone(),
        set_name: set_name.to_owned(),
        variant_names: variants.iter().map(|v| v.name.clone()).collect(),
        selected,
    })
}

/// A variant written by one `author_variants` call and the root-layer content it replaced.
struct Touched<'a> {
    name: &'a str,
    previous: Option<VariantContent>,
}

fn rollback(
    doc: &mut dyn Document,
    node: &NodePath,
    set_name: &str,
    touched: Vec<Touched<'_>>,
    first_new: Option<&NodePath>,
) {
    if let Some(defined) = first_new {
        if let Err(err) = doc.remove_node(defined) {
            tracing::warn!(prim_path = %defined, error = %err, "rollback could not remove node");
        }
        return;
    }
    for Touched { name, previous } in touched.into_iter().rev() {
        let restored = match previous {
            Some(content) => doc.author_variant(node, set_name, name, content),
            None => doc.remove_variant(node, set_name, name),
        };
        if let Err(err) = restored {
            tracing::warn!(
                prim_path = %node,
                set_name,
                variant = name,
                error = %err,
                "rollback could not restore variant"
            );
        }
    }
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::engine::{EngineError, Reference, VariantSetInfo};
use crate::model::{local_matrix, Matrix4, NodePath, Specifier, XformOp};
use crate::paths::normalize_lexically;

use super::{persist, AttrSpec, LayerFile, NodeSpec};

const MAX_REFERENCE_DEPTH: usize = 32;

/// One node of the composed scene, with opinions from every contributing layer resolved.
#[derive(Debug, Clone, Default)]
pub(super) struct ComposedNode {
    pub(super) type_name: Option<String>,
    pub(super) specifier: Option<Specifier>,
    pub(super) attributes: BTreeMap<String, AttrSpec>,
    pub(super) relationships: BTreeMap<String, Vec<NodePath>>,
    pub(super) xform_ops: Option<Vec<XformOp>>,
    pub(super) has_references: bool,
    pub(super) variant_sets: BTreeMap<String, VariantSetInfo>,
}

impl ComposedNode {
    fn from_spec(spec: &NodeSpec) -> Self {
        let variant_sets = spec
            .variant_sets
            .iter()
            .map(|(name, variants)| {
                let info = VariantSetInfo {
                    variants: variants.keys().cloned().collect(),
                    selection: spec.variant_selection.get(name).cloned(),
                };
                (name.clone(), info)
            })
            .collect();
        Self {
            type_name: spec.type_name.clone(),
            specifier: Some(spec.specifier),
            attributes: spec.attributes.clone(),
            relationships: spec.relationships.clone(),
            xform_ops: spec.xform_ops.clone(),
            has_references: !spec.references.is_empty(),
            variant_sets,
        }
    }

    /// Applies `stronger` on top of `self`.
    fn overlay(&mut self, stronger: ComposedNode) {
        if stronger.type_name.is_some() {
            self.type_name = stronger.type_name;
        }
        self.specifier = match (self.specifier, stronger.specifier) {
            (Some(weaker), Some(Specifier::Over)) => Some(weaker),
            (weaker, None) => weaker,
            (_, stronger) => stronger,
        };
        self.attributes.extend(stronger.attributes);
        self.relationships.extend(stronger.relationships);
        if stronger.xform_ops.is_some() {
            self.xform_ops = stronger.xform_ops;
        }
        self.has_references |= stronger.has_references;
        for (name, info) in stronger.variant_sets {
            let entry = self.variant_sets.entry(name).or_default();
            for variant in info.variants {
                if !entry.variants.contains(&variant) {
                    entry.variants.push(variant);
                }
            }
            entry.variants.sort();
            if info.selection.is_some() {
                entry.selection = info.selection;
            }
        }
    }

    /// Moves relationship targets from the referenced namespace into the referencing one.
    fn remapped(mut self, from: &NodePath, to: &NodePath) -> Self {
        for targets in self.relationships.values_mut() {
            for target in targets.iter_mut() {
                if let Some(mapped) = target.replace_prefix(from, to) {
                    *target = mapped;
                }
            }
        }
        self
    }
}

#[derive(Debug, Default)]
pub(super) struct Composed {
    nodes: BTreeMap<NodePath, ComposedNode>,
}

impl Composed {
    pub(super) fn node(&self, path: &NodePath) -> Option<&ComposedNode> {
        self.nodes.get(path)
    }

    pub(super) fn contains(&self, path: &NodePath) -> bool {
        path.is_root() || self.nodes.contains_key(path)
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (&NodePath, &ComposedNode)> {
        self.nodes.iter()
    }

    pub(super) fn children(&self, parent: &NodePath) -> Vec<NodePath> {
        self.nodes.keys().filter(|path| path.parent().as_ref() == Some(parent)).cloned().collect()
    }

    fn local_matrix(&self, path: &NodePath) -> Matrix4 {
        self.nodes
            .get(path)
            .and_then(|node| node.xform_ops.as_deref())
            .map(local_matrix)
            .unwrap_or_default()
    }

    pub(super) fn world_matrix(&self, path: &NodePath) -> Matrix4 {
        path.lineage()
            .iter()
            .fold(Matrix4::identity(), |parent_world, node| self.local_matrix(node).mul(&parent_world))
    }

    /// Transform from `path`'s frame into `ancestor`'s own (pre-transform) frame.
    pub(super) fn relative_matrix(&self, path: &NodePath, ancestor: &NodePath) -> Matrix4 {
        path.lineage()
            .iter()
            .filter(|node| node.depth() > ancestor.depth())
            .fold(Matrix4::identity(), |acc, node| self.local_matrix(node).mul(&acc))
    }
}

pub(super) fn resolve_asset(layer_dir: &Path, asset_path: &str) -> PathBuf {
    let asset = Path::new(asset_path);
    if asset.is_absolute() {
        normalize_lexically(asset)
    } else {
        normalize_lexically(&layer_dir.join(asset))
    }
}

fn dir_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

pub(super) fn compose_stage(layer: &LayerFile, layer_path: &Path) -> Result<Composed, EngineError> {
    let mut composer = Composer { stack: vec![normalize_lexically(layer_path)] };
    let nodes = composer.compose_layer(layer, &dir_of(layer_path))?;
    Ok(Composed { nodes })
}

struct Composer {
    /// Layers currently being composed, outermost first.
    stack: Vec<PathBuf>,
}

type NodeMap = BTreeMap<NodePath, ComposedNode>;

impl Composer {
    fn compose_layer(&mut self, layer: &LayerFile, dir: &Path) -> Result<NodeMap, EngineError> {
        let mut out = NodeMap::new();
        for root in layer.root_specs() {
            self.compose_subtree(layer, dir, root, &mut out)?;
        }
        Ok(out)
    }

    fn compose_subtree(
        &mut self,
        layer: &LayerFile,
        dir: &Path,
        node: &NodePath,
        out: &mut NodeMap,
    ) -> Result<(), EngineError> {
        if let Some(spec) = layer.nodes.get(node) {
            for reference in spec.references.iter().rev() {
                self.compose_reference(dir, reference, node, out)?;
            }
            for (set, selection) in &spec.variant_selection {
                let Some(variant) = spec.variant_sets.get(set).and_then(|v| v.get(selection))
                else {
                    continue;
                };
                for reference in variant.references.iter().rev() {
                    self.compose_reference(dir, reference, node, out)?;
                }
                if let Some(ops) = &variant.xform_ops {
                    out.entry(node.clone()).or_default().xform_ops = Some(ops.clone());
                }
            }
            out.entry(node.clone()).or_default().overlay(ComposedNode::from_spec(spec));
        }

        let children: Vec<NodePath> = layer.child_specs(node).cloned().collect();
        for child in &children {
            self.compose_subtree(layer, dir, child, out)?;
        }
        Ok(())
    }

    fn compose_reference(
        &mut self,
        dir: &Path,
        reference: &Reference,
        target: &NodePath,
        out: &mut NodeMap,
    ) -> Result<(), EngineError> {
        let asset = resolve_asset(dir, &reference.asset_path);
        if self.stack.contains(&asset) || self.stack.len() >= MAX_REFERENCE_DEPTH {
            return Err(EngineError::ReferenceCycle { path: asset });
        }
        out.entry(target.clone()).or_default().has_references = true;

        let layer = match persist::read_layer(&asset) {
            Ok(layer) => layer,
            Err(err) => {
                tracing::trace!(asset = %asset.display(), error = %err, "reference does not resolve");
                return Ok(());
            }
        };
        let source = reference
            .prim_path
            .clone()
            .or_else(|| layer.default_prim.clone())
            .unwrap_or_else(NodePath::root);

        self.stack.push(asset.clone());
        let composed = self.compose_layer(&layer, &dir_of(&asset));
        self.stack.pop();

        for (path, node) in composed? {
            let Some(mapped) = path.replace_prefix(&source, target) else {
                continue;
            };
            out.entry(mapped).or_default().overlay(node.remapped(&source, target));
        }
        Ok(())
    }
}

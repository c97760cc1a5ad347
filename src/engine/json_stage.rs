// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pure-Rust engine that keeps each stage as one JSON layer file.
//!
//! A layer is a flat map from node path to node spec. Specs carry a specifier, an optional
//! type, attributes (default value plus time samples), relationships, references, an op stack
//! and variant sets. Queries run against the composed view: local opinions are strongest,
//! then the selected variants, then references (resolved relative to the layer's directory).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::model::{Axis, BBox, NodePath, Specifier, TimeCode, Vec3, XformOp};

use super::{
    CreateOptions, Document, Engine, EngineError, NodeInfo, Reference, StageSummary,
    VariantContent, VariantSetInfo,
};

mod compose;
mod package;
mod persist;

use compose::{Composed, ComposedNode};
pub use persist::WriteDurability;

const LAYER_VERSION: u32 = 1;

/// Which frame `compute_bounds` reports in.
///
/// `World` is the normal behavior. `Local` reproduces engines that hand back the subtree box
/// in the queried node's own frame, which the bounds resolver has to correct for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSpace {
    #[default]
    World,
    Local,
}

#[derive(Debug, Default, Clone)]
pub struct JsonStageEngine {
    durability: WriteDurability,
    bounds_space: BoundsSpace,
}

impl JsonStageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new().with_durability(config.write_durability)
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_bounds_space(mut self, bounds_space: BoundsSpace) -> Self {
        self.bounds_space = bounds_space;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }
}

impl Engine for JsonStageEngine {
    fn name(&self) -> &str {
        "json-stage"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Document>, EngineError> {
        let layer = persist::read_layer(path)?;
        Ok(Box::new(JsonStageDocument {
            path: path.to_path_buf(),
            layer,
            durability: self.durability,
            bounds_space: self.bounds_space,
        }))
    }

    fn create(
        &self,
        path: &Path,
        options: CreateOptions,
    ) -> Result<Box<dyn Document>, EngineError> {
        let mut layer = LayerFile::default();
        if let Some(axis) = options.up_axis {
            layer.up_axis = axis;
        }
        if let Some(meters_per_unit) = options.meters_per_unit {
            layer.meters_per_unit = meters_per_unit;
        }
        Ok(Box::new(JsonStageDocument {
            path: path.to_path_buf(),
            layer,
            durability: self.durability,
            bounds_space: self.bounds_space,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LayerFile {
    version: u32,
    up_axis: Axis,
    meters_per_unit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_prim: Option<NodePath>,
    start_time_code: f64,
    end_time_code: f64,
    nodes: BTreeMap<NodePath, NodeSpec>,
}

impl Default for LayerFile {
    fn default() -> Self {
        Self {
            version: LAYER_VERSION,
            up_axis: Axis::Y,
            meters_per_unit: 0.01,
            default_prim: None,
            start_time_code: 0.0,
            end_time_code: 0.0,
            nodes: BTreeMap::new(),
        }
    }
}

impl LayerFile {
    fn root_specs(&self) -> impl Iterator<Item = &NodePath> {
        self.nodes.keys().filter(|path| path.depth() == 1)
    }

    fn child_specs<'a>(&'a self, parent: &'a NodePath) -> impl Iterator<Item = &'a NodePath> {
        self.nodes.keys().filter(move |path| path.parent().as_ref() == Some(parent))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct NodeSpec {
    specifier: Specifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, AttrSpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    relationships: BTreeMap<String, Vec<NodePath>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xform_ops: Option<Vec<XformOp>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    variant_sets: BTreeMap<String, BTreeMap<String, VariantSpec>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    variant_selection: BTreeMap<String, String>,
}

impl NodeSpec {
    fn over() -> Self {
        Self { specifier: Specifier::Over, ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AttrSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    time_samples: Vec<(f64, Value)>,
}

impl AttrSpec {
    /// Default time reads the default value only; a numeric time holds the latest sample at
    /// or before it (the first sample before the range) and falls back to the default.
    fn value_at(&self, time: TimeCode) -> Option<&Value> {
        match time {
            TimeCode::Default => self.default.as_ref(),
            TimeCode::At(t) => {
                if self.time_samples.is_empty() {
                    return self.default.as_ref();
                }
                self.time_samples
                    .iter()
                    .take_while(|(sample, _)| *sample <= t)
                    .last()
                    .or_else(|| self.time_samples.first())
                    .map(|(_, value)| value)
            }
        }
    }

    fn set(&mut self, value: Value, time: TimeCode) {
        match time {
            TimeCode::Default => self.default = Some(value),
            TimeCode::At(t) => {
                match self.time_samples.iter().position(|(sample, _)| *sample >= t) {
                    Some(idx) if self.time_samples[idx].0 == t => self.time_samples[idx].1 = value,
                    Some(idx) => self.time_samples.insert(idx, (t, value)),
                    None => self.time_samples.push((t, value)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct VariantSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xform_ops: Option<Vec<XformOp>>,
}

impl VariantSpec {
    fn has_content(&self) -> bool {
        !self.references.is_empty() || self.xform_ops.is_some()
    }
}

/// Built-in attributes (and their fallback values) of the schema types the engine knows.
fn schema_attributes(type_name: &str) -> Vec<(&'static str, Value)> {
    match type_name {
        "Cube" => vec![("size", json!(2.0))],
        "Sphere" => vec![("radius", json!(1.0))],
        "Cylinder" | "Cone" => {
            vec![("radius", json!(1.0)), ("height", json!(2.0)), ("axis", json!("Z"))]
        }
        "Capsule" => vec![("radius", json!(0.5)), ("height", json!(1.0)), ("axis", json!("Z"))],
        "Camera" => vec![
            ("focalLength", json!(50.0)),
            ("horizontalAperture", json!(20.955)),
            ("verticalAperture", json!(15.2908)),
            ("clippingRange", json!([1.0, 1_000_000.0])),
            ("projection", json!("perspective")),
        ],
        _ => Vec::new(),
    }
}

fn schema_fallback(type_name: Option<&str>, attr: &str) -> Option<Value> {
    schema_attributes(type_name?).into_iter().find(|(name, _)| *name == attr).map(|(_, v)| v)
}

pub(crate) struct JsonStageDocument {
    path: PathBuf,
    layer: LayerFile,
    durability: WriteDurability,
    bounds_space: BoundsSpace,
}

impl JsonStageDocument {
    fn layer_dir(&self) -> PathBuf {
        self.path.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    fn compose(&self) -> Result<Composed, EngineError> {
        compose::compose_stage(&self.layer, &self.path)
    }

    fn composed_node<'a>(
        composed: &'a Composed,
        node: &NodePath,
    ) -> Result<&'a ComposedNode, EngineError> {
        composed.node(node).ok_or_else(|| EngineError::NodeNotFound { node: node.clone() })
    }

    /// The root-layer spec for `node`, creating `over` specs for it and any ancestor that only
    /// exists through composition.
    fn spec_mut(&mut self, node: &NodePath) -> Result<&mut NodeSpec, EngineError> {
        if !self.layer.nodes.contains_key(node) {
            let composed = self.compose()?;
            if !composed.contains(node) {
                return Err(EngineError::NodeNotFound { node: node.clone() });
            }
            for ancestor in node.lineage() {
                self.layer.nodes.entry(ancestor).or_insert_with(NodeSpec::over);
            }
        }
        self.layer
            .nodes
            .get_mut(node)
            .ok_or_else(|| EngineError::NodeNotFound { node: node.clone() })
    }

    fn write_layer(&self, path: &Path, layer: &LayerFile) -> Result<(), EngineError> {
        persist::write_layer(path, layer, self.durability)
    }

    /// Copy of the root layer whose relative asset paths still resolve from `target_dir`.
    fn rebased_layer(&self, target_dir: &Path) -> LayerFile {
        let mut layer = self.layer.clone();
        let source_dir = self.layer_dir();
        if source_dir == target_dir {
            return layer;
        }
        let rebase = |reference: &mut Reference| {
            if Path::new(&reference.asset_path).is_relative() {
                let absolute = crate::paths::normalize_lexically(
                    &source_dir.join(&reference.asset_path),
                );
                reference.asset_path = absolute.to_string_lossy().into_owned();
            }
        };
        for spec in layer.nodes.values_mut() {
            spec.references.iter_mut().for_each(rebase);
            for variants in spec.variant_sets.values_mut() {
                for variant in variants.values_mut() {
                    variant.references.iter_mut().for_each(rebase);
                }
            }
        }
        layer
    }

    fn flattened_layer(&self) -> Result<LayerFile, EngineError> {
        let composed = self.compose()?;
        let nodes = composed
            .iter()
            .map(|(path, node)| {
                let spec = NodeSpec {
                    specifier: node.specifier.unwrap_or_default(),
                    type_name: node.type_name.clone(),
                    attributes: node.attributes.clone(),
                    relationships: node.relationships.clone(),
                    xform_ops: node.xform_ops.clone(),
                    ..NodeSpec::default()
                };
                (path.clone(), spec)
            })
            .collect();
        Ok(LayerFile { nodes, ..self.layer.clone() })
    }
}

fn geometry_extent(node: &ComposedNode, time: TimeCode) -> Option<BBox> {
    let attr = |name: &str| {
        node.attributes
            .get(name)
            .and_then(|spec| spec.value_at(time))
            .cloned()
            .or_else(|| schema_fallback(node.type_name.as_deref(), name))
    };
    let number = |name: &str| attr(name).and_then(|v| v.as_f64());

    if let Some(extent) = attr("extent").as_ref().and_then(points_extent) {
        return Some(extent);
    }

    match node.type_name.as_deref()? {
        "Cube" => {
            let half = number("size")? * 0.5;
            Some(BBox::from_corners([-half; 3], [half; 3]))
        }
        "Sphere" => {
            let r = number("radius")?;
            Some(BBox::from_corners([-r; 3], [r; 3]))
        }
        kind @ ("Cylinder" | "Cone" | "Capsule") => {
            let r = number("radius")?;
            let mut half_height = number("height")? * 0.5;
            if kind == "Capsule" {
                half_height += r;
            }
            let axis = match attr("axis").as_ref().and_then(Value::as_str) {
                Some("X") => 0,
                Some("Y") => 1,
                _ => 2,
            };
            let mut max: Vec3 = [r; 3];
            max[axis] = half_height;
            Some(BBox::from_corners([-max[0], -max[1], -max[2]], max))
        }
        "Mesh" | "Points" | "BasisCurves" => attr("points").as_ref().and_then(points_extent),
        _ => None,
    }
}

fn points_extent(value: &Value) -> Option<BBox> {
    let mut points = value.as_array()?.iter().map(crate::model::vec3_from_value);
    let first = points.next()??;
    points.try_fold(BBox::from_corners(first, first), |acc, p| {
        p.map(|p| acc.union(&BBox::from_corners(p, p)))
    })
}

impl Document for JsonStageDocument {
    fn identifier(&self) -> &Path {
        &self.path
    }

    fn save(&mut self) -> Result<(), EngineError> {
        self.write_layer(&self.path, &self.layer)
    }

    fn export(&self, path: &Path, flatten: bool) -> Result<(), EngineError> {
        let target_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let layer = if flatten { self.flattened_layer()? } else { self.rebased_layer(&target_dir) };
        self.write_layer(path, &layer)
    }

    fn package(&self, path: &Path) -> Result<Vec<String>, EngineError> {
        package::write_package(&self.layer, &self.path, path, self.durability)
    }

    fn summary(&self) -> Result<StageSummary, EngineError> {
        Ok(StageSummary {
            identifier: self.path.clone(),
            layers: vec![self.path.clone()],
            root_prims: self.root_nodes()?,
            up_axis: self.layer.up_axis,
            meters_per_unit: self.layer.meters_per_unit,
            default_prim: self.layer.default_prim.clone(),
            start_time_code: self.layer.start_time_code,
            end_time_code: self.layer.end_time_code,
        })
    }

    fn up_axis(&self) -> Axis {
        self.layer.up_axis
    }

    fn set_up_axis(&mut self, axis: Axis) {
        self.layer.up_axis = axis;
    }

    fn meters_per_unit(&self) -> f64 {
        self.layer.meters_per_unit
    }

    fn set_meters_per_unit(&mut self, meters_per_unit: f64) {
        self.layer.meters_per_unit = meters_per_unit;
    }

    fn default_prim(&self) -> Option<NodePath> {
        self.layer.default_prim.clone()
    }

    fn set_default_prim(&mut self, node: &NodePath) -> Result<(), EngineError> {
        if node.depth() != 1 {
            return Err(EngineError::Rejected(format!(
                "default prim must be a root-level prim, got {node}"
            )));
        }
        if !self.node_exists(node) {
            return Err(EngineError::NodeNotFound { node: node.clone() });
        }
        self.layer.default_prim = Some(node.clone());
        Ok(())
    }

    fn root_nodes(&self) -> Result<Vec<NodePath>, EngineError> {
        self.children(&NodePath::root())
    }

    fn children(&self, node: &NodePath) -> Result<Vec<NodePath>, EngineError> {
        let composed = self.compose()?;
        if !node.is_root() && !composed.contains(node) {
            return Err(EngineError::NodeNotFound { node: node.clone() });
        }
        Ok(composed.children(node))
    }

    fn node_exists(&self, node: &NodePath) -> bool {
        if node.is_root() || self.layer.nodes.contains_key(node) {
            return true;
        }
        self.compose().map(|composed| composed.contains(node)).unwrap_or(false)
    }

    fn node_info(&self, node: &NodePath) -> Result<NodeInfo, EngineError> {
        let composed = self.compose()?;
        let info = Self::composed_node(&composed, node)?;
        let mut attributes: Vec<String> = info.attributes.keys().cloned().collect();
        if let Some(type_name) = info.type_name.as_deref() {
            for (name, _) in schema_attributes(type_name) {
                if !attributes.iter().any(|existing| existing == name) {
                    attributes.push(name.to_owned());
                }
            }
        }
        attributes.sort();
        Ok(NodeInfo {
            path: node.clone(),
            type_name: info.type_name.clone(),
            specifier: info.specifier.unwrap_or_default(),
            attributes,
            relationships: info.relationships.keys().cloned().collect(),
            has_references: info.has_references,
            variant_sets: info.variant_sets.keys().cloned().collect(),
            children: composed.children(node).iter().map(|c| c.name().to_owned()).collect(),
        })
    }

    fn traverse(&self) -> Result<Vec<NodePath>, EngineError> {
        let composed = self.compose()?;
        let mut out = Vec::new();
        let mut stack: Vec<NodePath> = composed.children(&NodePath::root());
        stack.reverse();
        while let Some(node) = stack.pop() {
            let mut children = composed.children(&node);
            children.reverse();
            stack.extend(children);
            out.push(node);
        }
        Ok(out)
    }

    fn define_node(
        &mut self,
        node: &NodePath,
        type_name: Option<&str>,
        specifier: Specifier,
    ) -> Result<(), EngineError> {
        if node.is_root() {
            return Err(EngineError::Rejected("cannot define the pseudo-root".to_owned()));
        }
        let composed = self.compose()?;
        if let Some(parent) = node.parent() {
            for ancestor in parent.lineage() {
                if self.layer.nodes.contains_key(&ancestor) {
                    continue;
                }
                let spec = if composed.contains(&ancestor) {
                    NodeSpec::over()
                } else {
                    NodeSpec::default()
                };
                self.layer.nodes.insert(ancestor, spec);
            }
        }

        let exists = composed.contains(node);
        let spec = self.layer.nodes.entry(node.clone()).or_insert_with(|| NodeSpec {
            specifier: if exists { Specifier::Over } else { specifier },
            ..NodeSpec::default()
        });
        match specifier {
            Specifier::Def | Specifier::Class => spec.specifier = specifier,
            Specifier::Over => {}
        }
        if let Some(type_name) = type_name.filter(|t| !t.is_empty()) {
            spec.type_name = Some(type_name.to_owned());
        }
        Ok(())
    }

    fn remove_node(&mut self, node: &NodePath) -> Result<(), EngineError> {
        if !self.layer.nodes.contains_key(node) {
            if self.node_exists(node) {
                return Err(EngineError::Rejected(format!(
                    "{node} is not authored in this stage's root layer"
                )));
            }
            return Err(EngineError::NodeNotFound { node: node.clone() });
        }
        self.layer.nodes.retain(|path, _| !path.has_prefix(node));
        Ok(())
    }

    fn attribute(
        &self,
        node: &NodePath,
        name: &str,
        time: TimeCode,
    ) -> Result<Option<Value>, EngineError> {
        let composed = self.compose()?;
        let info = Self::composed_node(&composed, node)?;
        Ok(info
            .attributes
            .get(name)
            .and_then(|spec| spec.value_at(time))
            .cloned()
            .or_else(|| schema_fallback(info.type_name.as_deref(), name)))
    }

    fn set_attribute(
        &mut self,
        node: &NodePath,
        name: &str,
        value: Value,
        time: TimeCode,
    ) -> Result<(), EngineError> {
        let spec = self.spec_mut(node)?;
        spec.attributes.entry(name.to_owned()).or_default().set(value, time);
        Ok(())
    }

    fn relationship_targets(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<Vec<NodePath>>, EngineError> {
        let composed = self.compose()?;
        Ok(Self::composed_node(&composed, node)?.relationships.get(name).cloned())
    }

    fn set_relationship_targets(
        &mut self,
        node: &NodePath,
        name: &str,
        targets: Vec<NodePath>,
    ) -> Result<(), EngineError> {
        self.spec_mut(node)?.relationships.insert(name.to_owned(), targets);
        Ok(())
    }

    fn authored_xform_ops(&self, node: &NodePath) -> Result<Vec<XformOp>, EngineError> {
        if let Some(spec) = self.layer.nodes.get(node) {
            return Ok(spec.xform_ops.clone().unwrap_or_default());
        }
        if self.node_exists(node) {
            return Ok(Vec::new());
        }
        Err(EngineError::NodeNotFound { node: node.clone() })
    }

    fn composed_xform_ops(&self, node: &NodePath) -> Result<Vec<XformOp>, EngineError> {
        let composed = self.compose()?;
        Ok(Self::composed_node(&composed, node)?.xform_ops.clone().unwrap_or_default())
    }

    fn set_xform_ops(&mut self, node: &NodePath, ops: Vec<XformOp>) -> Result<(), EngineError> {
        let untyped = {
            let composed = self.compose()?;
            Self::composed_node(&composed, node)?.type_name.is_none()
        };
        let spec = self.spec_mut(node)?;
        if untyped && spec.type_name.is_none() {
            spec.type_name = Some("Xform".to_owned());
        }
        spec.xform_ops = Some(ops);
        Ok(())
    }

    fn compute_bounds(
        &self,
        node: &NodePath,
        time: TimeCode,
    ) -> Result<Option<BBox>, EngineError> {
        let composed = self.compose()?;
        if !composed.contains(node) {
            return Err(EngineError::NodeNotFound { node: node.clone() });
        }

        let mut bounds: Option<BBox> = None;
        for (path, info) in composed.iter().filter(|(path, _)| path.has_prefix(node)) {
            let Some(extent) = geometry_extent(info, time) else {
                continue;
            };
            let frame = match self.bounds_space {
                BoundsSpace::World => composed.world_matrix(path),
                BoundsSpace::Local => composed.relative_matrix(path, node),
            };
            let placed = extent.transformed(&frame);
            bounds = Some(match bounds {
                Some(acc) => acc.union(&placed),
                None => placed,
            });
        }
        Ok(bounds)
    }

    fn references(&self, node: &NodePath) -> Result<Vec<Reference>, EngineError> {
        if let Some(spec) = self.layer.nodes.get(node) {
            return Ok(spec.references.clone());
        }
        if self.node_exists(node) {
            return Ok(Vec::new());
        }
        Err(EngineError::NodeNotFound { node: node.clone() })
    }

    fn add_reference(
        &mut self,
        node: &NodePath,
        reference: Reference,
    ) -> Result<bool, EngineError> {
        let spec = self.spec_mut(node)?;
        if spec.references.contains(&reference) {
            return Ok(false);
        }
        spec.references.push(reference);
        Ok(true)
    }

    fn asset_resolves(&self, asset_path: &str) -> bool {
        compose::resolve_asset(&self.layer_dir(), asset_path).is_file()
    }

    fn variant_sets(
        &self,
        node: &NodePath,
    ) -> Result<BTreeMap<String, VariantSetInfo>, EngineError> {
        let composed = self.compose()?;
        Ok(Self::composed_node(&composed, node)?.variant_sets.clone())
    }

    fn author_variant(
        &mut self,
        node: &NodePath,
        set: &str,
        variant: &str,
        content: VariantContent,
    ) -> Result<(), EngineError> {
        let spec = self.spec_mut(node)?;
        spec.variant_sets.entry(set.to_owned()).or_default().insert(
            variant.to_owned(),
            VariantSpec { references: content.references, xform_ops: content.xform_ops },
        );
        Ok(())
    }

    fn variant_content(
        &self,
        node: &NodePath,
        set: &str,
        variant: &str,
    ) -> Result<Option<VariantContent>, EngineError> {
        if !self.node_exists(node) {
            return Err(EngineError::NodeNotFound { node: node.clone() });
        }
        Ok(self
            .layer
            .nodes
            .get(node)
            .and_then(|spec| spec.variant_sets.get(set))
            .and_then(|variants| variants.get(variant))
            .map(|authored| VariantContent {
                references: authored.references.clone(),
                xform_ops: authored.xform_ops.clone(),
            }))
    }

    fn remove_variant(
        &mut self,
        node: &NodePath,
        set: &str,
        variant: &str,
    ) -> Result<(), EngineError> {
        let not_found = || EngineError::VariantNotFound {
            node: node.clone(),
            set: set.to_owned(),
            variant: variant.to_owned(),
        };
        let spec = self.layer.nodes.get_mut(node).ok_or_else(not_found)?;
        let variants = spec.variant_sets.get_mut(set).ok_or_else(not_found)?;
        variants.remove(variant).ok_or_else(not_found)?;
        if variants.is_empty() {
            spec.variant_sets.remove(set);
        }
        if spec.variant_selection.get(set).map(String::as_str) == Some(variant) {
            spec.variant_selection.remove(set);
        }
        Ok(())
    }

    fn set_variant_selection(
        &mut self,
        node: &NodePath,
        set: &str,
        variant: &str,
    ) -> Result<(), EngineError> {
        if !self.node_exists(node) {
            return Err(EngineError::NodeNotFound { node: node.clone() });
        }
        let populated = self
            .layer
            .nodes
            .get(node)
            .and_then(|spec| spec.variant_sets.get(set))
            .and_then(|variants| variants.get(variant))
            .is_some_and(VariantSpec::has_content);
        if !populated {
            return Err(EngineError::Rejected(format!(
                "variant {set}={variant} on {node} has no authored content; author it first"
            )));
        }
        self.spec_mut(node)?.variant_selection.insert(set.to_owned(), variant.to_owned());
        Ok(())
    }
}

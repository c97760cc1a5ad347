// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Argument normalization for tool calls.
//!
//! Callers send loosely shaped JSON: keys in any case or spacing, wrapper objects, tuple-ish
//! strings, bare records where arrays belong. [`coerce`] turns all of that into an [`ArgBag`]
//! holding only canonical snake_case keys and canonical value shapes, or rejects it with
//! `invalid_params` naming the offending key. Nothing downstream of this module looks at raw
//! caller input.

use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::model::{
    matrix_from_value, Axis, Matrix4, NodePath, Specifier, TimeCode, XformOp, XformOpKind,
};

/// Canonical name of the display-color primvar.
pub const DISPLAY_COLOR: &str = "primvars:displayColor";

const WRAPPER_KEYS: &[&str] = &["values", "arguments", "args", "input"];

/// Canonical keys and the fingerprints that alias to them.
const KEY_ALIASES: &[(&str, &[&str])] = &[
    ("path", &["filepath", "file", "stagepath"]),
    ("stage_id", &["stageid", "sessionid", "handle"]),
    ("prim_path", &["primpath", "prim", "node", "nodepath"]),
    ("attr", &["attribute", "attrname", "attributename"]),
    ("value", &[]),
    ("time", &["timecode", "frame"]),
    ("root", &["rootpath"]),
    ("depth", &["maxdepth"]),
    ("type_filter", &["typefilter", "primtype"]),
    ("type_name", &["typename"]),
    ("specifier", &[]),
    ("output_path", &["outputpath", "output", "outpath", "destination"]),
    ("flatten", &[]),
    ("ops", &["xformops", "operations"]),
    ("matrix", &["xformmatrix", "transformmatrix"]),
    ("items", &["updates", "changes"]),
    ("save", &[]),
    ("up_axis", &["upaxis"]),
    ("meters_per_unit", &["metersperunit"]),
    ("material_path", &["materialpath", "material"]),
    ("camera_path", &["camerapath", "camera"]),
    ("params", &["parameters", "settings"]),
    ("set_name", &["setname", "set", "variantset", "variantsetname"]),
    ("selection", &["variant", "variantname"]),
    ("variants", &[]),
    ("select", &["selectvariant"]),
    ("assets", &[]),
    ("container_root", &["containerroot", "container"]),
    ("set_default_prim", &["setdefaultprim"]),
    ("clear_existing", &["clearexisting"]),
    ("skip_if_exists", &["skipifexists"]),
    ("asset_path", &["assetpath", "asset"]),
    ("internal_path", &["internalpath"]),
    ("name", &[]),
    ("asset_reference", &["assetreference", "reference"]),
    ("transform", &["xform"]),
    ("focal_length", &["focallength"]),
    ("horizontal_aperture", &["horizontalaperture"]),
    ("vertical_aperture", &["verticalaperture"]),
    ("clipping_range", &["clippingrange"]),
    ("projection", &[]),
];

const BOOL_KEYS: &[&str] =
    &["flatten", "save", "set_default_prim", "clear_existing", "skip_if_exists"];

/// Where a mapping sits in the request; nested records remap a few keys differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Top,
    Item,
    Asset,
    Variant,
    Params,
}

fn fingerprint(key: &str) -> String {
    key.chars().filter(|c| !matches!(c, '_' | ' ' | '-')).flat_map(char::to_lowercase).collect()
}

fn is_canonical(key: &str) -> bool {
    KEY_ALIASES.iter().any(|(canonical, _)| *canonical == key)
}

fn canonical_key(tool: &str, scope: Scope, raw: &str) -> Option<&'static str> {
    let fp = fingerprint(raw);
    let base = KEY_ALIASES
        .iter()
        .find(|(canonical, aliases)| fingerprint(canonical) == fp || aliases.contains(&fp.as_str()))
        .map(|(canonical, _)| *canonical);

    match (scope, fp.as_str(), base) {
        (Scope::Top, "type", _) if tool.starts_with("list_prims") => Some("type_filter"),
        (Scope::Top, "type", _) if tool.starts_with("create_prim") => Some("type_name"),
        (Scope::Top, "references", _) if tool.starts_with("add_references") => Some("items"),
        (Scope::Top, _, Some("items")) if tool.starts_with("set_xform") => Some("ops"),
        (Scope::Asset, "path", _) => Some("asset_path"),
        (Scope::Variant, "path" | "assetpath" | "asset", _) => Some("asset_reference"),
        (Scope::Variant, _, Some("selection")) => Some("name"),
        (Scope::Variant, _, Some("ops")) => Some("transform"),
        _ => base,
    }
}

/// Normalized tool arguments: canonical keys, canonical shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgBag {
    tool: String,
    args: Map<String, Value>,
}

/// Three-state `internal_path` of a reference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalPath {
    /// Omitted: bind the asset's default prim.
    AssetDefault,
    /// `null` or `""`: bind the asset root with no selector.
    Root,
    Node(NodePath),
}

/// Normalizes raw tool arguments for `tool` (its canonical snake_case name).
pub fn coerce(tool: &str, raw: Value) -> Result<ArgBag, GatewayError> {
    let top = top_level_object(raw)?;

    let mut flat = Map::new();
    let mut wrapped = Vec::new();
    for (key, value) in top {
        let is_wrapper = WRAPPER_KEYS.contains(&fingerprint(&key).as_str());
        match value {
            Value::Object(inner) if is_wrapper => wrapped.push(inner),
            value => {
                flat.insert(key, value);
            }
        }
    }

    let mut args = alias_keys(tool, Scope::Top, flat);
    for inner in wrapped {
        for (key, value) in alias_keys(tool, Scope::Top, inner) {
            args.entry(key).or_insert(value);
        }
    }

    let args = normalize_values(tool, Scope::Top, "", args)?;
    Ok(ArgBag { tool: tool.to_owned(), args })
}

fn top_level_object(raw: Value) -> Result<Map<String, Value>, GatewayError> {
    match raw {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(items) if items.iter().all(Value::is_object) => {
            let mut merged = Map::new();
            for item in items {
                if let Value::Object(map) = item {
                    merged.extend(map);
                }
            }
            Ok(merged)
        }
        other => Err(GatewayError::invalid_params(format!(
            "tool arguments must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Renames keys to their canonical form. An exact canonical key beats an alias of it.
fn alias_keys(tool: &str, scope: Scope, map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut aliased = Vec::new();
    for (key, value) in map {
        match canonical_key(tool, scope, &key) {
            Some(canonical) if canonical == key && is_canonical(&key) => {
                out.insert(key, value);
            }
            Some(canonical) => aliased.push((canonical.to_owned(), value)),
            None => {
                out.insert(key, value);
            }
        }
    }
    for (key, value) in aliased {
        out.entry(key).or_insert(value);
    }
    out
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_index_keyed(value: &Value) -> bool {
    matches!(value, Value::Object(map)
        if !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok()))
}

fn is_tuple_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| {
        let s = s.trim();
        (s.starts_with('(') && s.ends_with(')')) || (s.starts_with('[') && s.ends_with(']'))
    })
}

/// Rejects tuple-like encodings where an array is expected.
fn expect_array<'a>(key: &str, value: &'a Value) -> Result<&'a Vec<Value>, GatewayError> {
    match value {
        Value::Array(items) => Ok(items),
        v if is_tuple_string(v) => Err(GatewayError::invalid_key(
            key,
            format!("'{key}' must be a JSON array, not a tuple-like string"),
        )),
        v if is_index_keyed(v) => Err(GatewayError::invalid_key(
            key,
            format!("'{key}' must be a JSON array, not an index-keyed object"),
        )),
        v => Err(GatewayError::invalid_key(
            key,
            format!("'{key}' must be a JSON array, got {}", json_kind(v)),
        )),
    }
}

fn normalize_values(
    tool: &str,
    scope: Scope,
    prefix: &str,
    mut args: Map<String, Value>,
) -> Result<Map<String, Value>, GatewayError> {
    let key_of = |key: &str| format!("{prefix}{key}");

    if let Some(Value::String(attr)) = args.get("attr") {
        if matches!(fingerprint(attr).as_str(), "displaycolor" | "color") {
            args.insert("attr".to_owned(), Value::from(DISPLAY_COLOR));
        }
    }

    let color_attr = args.get("attr").and_then(Value::as_str) == Some(DISPLAY_COLOR);
    if let Some(value) = args.get_mut("value") {
        if color_attr {
            *value = color_value(&key_of("value"), value)?;
        } else if is_index_keyed(value) {
            return Err(GatewayError::invalid_key(
                key_of("value"),
                "value must be a JSON array, not an index-keyed object",
            ));
        }
    }

    for key in BOOL_KEYS {
        match args.get(*key) {
            Some(Value::Null) => {
                args.remove(*key);
            }
            Some(value) => {
                let flag = parse_flag(value).ok_or_else(|| {
                    GatewayError::invalid_key(key_of(key), format!("'{key}' must be a boolean"))
                })?;
                args.insert((*key).to_owned(), Value::Bool(flag));
            }
            None => {}
        }
    }

    if let Some(value) = args.remove("time") {
        if !value.is_null() {
            let time = TimeCode::from_value(&value).ok_or_else(|| {
                GatewayError::invalid_key(
                    key_of("time"),
                    "time must be \"default\", a number, or a numeric string",
                )
            })?;
            args.insert("time".to_owned(), time.to_value());
        }
    }

    if let Some(value) = args.remove("depth") {
        if !value.is_null() {
            let depth = parse_count(&value).ok_or_else(|| {
                GatewayError::invalid_key(key_of("depth"), "depth must be a non-negative integer")
            })?;
            args.insert("depth".to_owned(), Value::from(depth));
        }
    }

    if let Some(value) = args.remove("up_axis") {
        if !value.is_null() {
            let axis = value.as_str().and_then(|s| s.parse::<Axis>().ok()).ok_or_else(|| {
                GatewayError::invalid_key(key_of("up_axis"), "up_axis must be \"Y\" or \"Z\"")
            })?;
            args.insert("up_axis".to_owned(), Value::from(axis.as_str()));
        }
    }

    let ops_key = if scope == Scope::Variant { "transform" } else { "ops" };
    if let Some(value) = args.remove(ops_key) {
        if !value.is_null() {
            let ops = parse_ops(&key_of(ops_key), &value)?;
            let encoded = serde_json::to_value(ops)
                .map_err(|err| GatewayError::internal(format!("encode ops: {err}")))?;
            args.insert(ops_key.to_owned(), encoded);
        }
    }

    if let Some(value) = args.remove("matrix") {
        if !value.is_null() {
            let key = key_of("matrix");
            expect_array(&key, &value)?;
            let matrix = matrix_from_value(&value).ok_or_else(|| {
                GatewayError::invalid_key(&key, "matrix requires a 4x4 numeric array")
            })?;
            let encoded = serde_json::to_value(matrix)
                .map_err(|err| GatewayError::internal(format!("encode matrix: {err}")))?;
            args.insert("matrix".to_owned(), encoded);
        }
    }

    if scope == Scope::Params {
        if let Some(value) = args.get("clipping_range") {
            let key = key_of("clipping_range");
            let items = expect_array(&key, value)?;
            if items.len() != 2 || !items.iter().all(Value::is_number) {
                return Err(GatewayError::invalid_key(key, "clipping_range requires [near, far]"));
            }
        }
    }

    if scope == Scope::Top {
        nest_list(tool, Scope::Item, "items", &mut args)?;
        nest_list(tool, Scope::Asset, "assets", &mut args)?;
        nest_list(tool, Scope::Variant, "variants", &mut args)?;
        if let Some(value) = args.remove("params") {
            let Value::Object(map) = value else {
                return Err(GatewayError::invalid_key("params", "params must be an object"));
            };
            let map = alias_keys(tool, Scope::Params, map);
            let map = normalize_values(tool, Scope::Params, "params.", map)?;
            args.insert("params".to_owned(), Value::Object(map));
        }
    }

    Ok(args)
}

/// Normalizes every record of a nested list. Asset lists also accept bare path strings.
fn nest_list(
    tool: &str,
    scope: Scope,
    key: &str,
    args: &mut Map<String, Value>,
) -> Result<(), GatewayError> {
    let Some(value) = args.remove(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let items = expect_array(key, &value)?;
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_key = format!("{key}[{index}]");
        let map = match item {
            Value::Object(map) => map.clone(),
            Value::String(path) if scope == Scope::Asset => {
                let mut map = Map::new();
                map.insert("asset_path".to_owned(), Value::from(path.as_str()));
                map
            }
            other => {
                return Err(GatewayError::invalid_key(
                    item_key,
                    format!("{key} entries must be objects, got {}", json_kind(other)),
                ));
            }
        };
        let map = alias_keys(tool, scope, map);
        let map = normalize_values(tool, scope, &format!("{item_key}."), map)?;
        out.push(Value::Object(map));
    }
    args.insert(key.to_owned(), Value::Array(out));
    Ok(())
}

/// Canonical display-color shape: a list of `[r, g, b]` triples. Idempotent.
fn color_value(key: &str, value: &Value) -> Result<Value, GatewayError> {
    let items = expect_array(key, value)?;
    let is_triple = |v: &Value| {
        v.as_array().is_some_and(|c| c.len() == 3 && c.iter().all(Value::is_number))
    };
    if items.len() == 3 && items.iter().all(Value::is_number) {
        return Ok(Value::Array(vec![value.clone()]));
    }
    if !items.is_empty() && items.iter().all(is_triple) {
        return Ok(value.clone());
    }
    Err(GatewayError::invalid_key(key, "color values must be [r, g, b] or [[r, g, b], ...]"))
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => match n.as_i64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses an ops array of `{op, value}` records into typed ops.
fn parse_ops(key: &str, value: &Value) -> Result<Vec<XformOp>, GatewayError> {
    if value.is_object() && !is_index_keyed(value) {
        return Err(GatewayError::invalid_key(
            key,
            format!("'{key}' must be an array of {{op, value}} records, not a single record"),
        ));
    }
    let items = expect_array(key, value)?;
    let mut ops = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_key = format!("{key}[{index}]");
        let Some(record) = item.as_object() else {
            return Err(GatewayError::invalid_key(
                &item_key,
                format!("each op must be an {{op, value}} record, got {}", json_kind(item)),
            ));
        };
        let record: Map<String, Value> = record
            .iter()
            .map(|(k, v)| {
                let k = match fingerprint(k).as_str() {
                    "op" | "type" | "kind" => "op".to_owned(),
                    "value" | "values" => "value".to_owned(),
                    _ => k.clone(),
                };
                (k, v.clone())
            })
            .collect();

        let op_key = format!("{item_key}.op");
        let name = record
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::invalid_key(&op_key, "op name is required"))?;
        let kind = XformOpKind::parse_lenient(name).ok_or_else(|| {
            GatewayError::invalid_key(&op_key, format!("unknown transform op '{name}'"))
                .with_detail("op", name)
        })?;

        let value_key = format!("{item_key}.value");
        let raw = record
            .get("value")
            .ok_or_else(|| GatewayError::missing_key(&value_key))?;
        expect_array(&value_key, raw)?;
        let op = XformOp::from_value(kind, raw)
            .map_err(|err| GatewayError::invalid_key(&value_key, err.to_string()))?;
        ops.push(op);
    }
    Ok(ops)
}

impl ArgBag {
    pub fn new(tool: impl Into<String>, args: Map<String, Value>) -> Self {
        Self { tool: tool.into(), args }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.args
    }

    /// The raw value of `key`; `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.args.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn require(&self, key: &str) -> Result<&Value, GatewayError> {
        self.get(key).ok_or_else(|| GatewayError::missing_key(key))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, GatewayError> {
        self.opt_str(key)?.ok_or_else(|| GatewayError::missing_key(key))
    }

    /// A non-blank string, or `None` when absent.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, GatewayError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(GatewayError::invalid_key(key, format!("'{key}' must not be empty")))
            }
            Some(Value::String(s)) => Ok(Some(s.trim())),
            Some(other) => Err(GatewayError::invalid_key(
                key,
                format!("'{key}' must be a string, got {}", json_kind(other)),
            )),
        }
    }

    pub fn require_node_path(&self, key: &str) -> Result<NodePath, GatewayError> {
        self.opt_node_path(key)?.ok_or_else(|| GatewayError::missing_key(key))
    }

    pub fn opt_node_path(&self, key: &str) -> Result<Option<NodePath>, GatewayError> {
        self.opt_str(key)?
            .map(|raw| {
                NodePath::parse(raw).map_err(|err| {
                    GatewayError::invalid_key(key, format!("invalid {key}: {err}"))
                        .with_detail("value", raw)
                })
            })
            .transpose()
    }

    /// First present node path among `keys`, reported under the first key when missing.
    pub fn node_path_any(&self, keys: &[&str]) -> Result<NodePath, GatewayError> {
        for key in keys {
            if let Some(path) = self.opt_node_path(key)? {
                return Ok(path);
            }
        }
        Err(GatewayError::missing_key(keys.first().copied().unwrap_or("prim_path")))
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn opt_flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn depth(&self) -> Option<usize> {
        self.get("depth").and_then(Value::as_u64).map(|d| d as usize)
    }

    pub fn time(&self) -> TimeCode {
        self.get("time").and_then(TimeCode::from_value).unwrap_or_default()
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, GatewayError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                GatewayError::invalid_key(key, format!("'{key}' must be a number"))
            }),
        }
    }

    pub fn up_axis(&self) -> Option<Axis> {
        self.get("up_axis").and_then(Value::as_str).and_then(|s| s.parse().ok())
    }

    pub fn specifier(&self) -> Result<Specifier, GatewayError> {
        match self.opt_str("specifier")? {
            None => Ok(Specifier::default()),
            Some(raw) => raw.parse().map_err(|_| {
                GatewayError::invalid_key("specifier", "specifier must be def, over, or class")
            }),
        }
    }

    /// Transform ops under `key` (`ops`, or `transform` inside a variant record).
    pub fn ops_at(&self, key: &str) -> Result<Option<Vec<XformOp>>, GatewayError> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|err| GatewayError::invalid_key(key, err.to_string()))
            })
            .transpose()
    }

    pub fn ops(&self) -> Result<Option<Vec<XformOp>>, GatewayError> {
        self.ops_at("ops")
    }

    pub fn matrix(&self) -> Option<Matrix4> {
        self.get("matrix").and_then(matrix_from_value)
    }

    pub fn internal_path(&self) -> Result<InternalPath, GatewayError> {
        match self.args.get("internal_path") {
            None => Ok(InternalPath::AssetDefault),
            Some(Value::Null) => Ok(InternalPath::Root),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(InternalPath::Root),
            Some(_) => self.require_node_path("internal_path").map(InternalPath::Node),
        }
    }

    /// Records of a nested list (`items`, `assets`, `variants`), each as its own bag.
    pub fn records(&self, key: &str) -> Vec<ArgBag> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|map| ArgBag::new(self.tool.clone(), map.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A nested object (`params`) as its own bag; empty when absent.
    pub fn nested(&self, key: &str) -> ArgBag {
        let map = self.get(key).and_then(Value::as_object).cloned().unwrap_or_default();
        ArgBag::new(self.tool.clone(), map)
    }
}

#[cfg(test)]
mod tests;

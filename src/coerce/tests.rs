// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::*;
use rstest::rstest;
use serde_json::json;

fn bag(tool: &str, raw: Value) -> ArgBag {
    coerce(tool, raw).expect("coerce")
}

fn rejected_key(tool: &str, raw: Value) -> String {
    let err = coerce(tool, raw).expect_err("should be rejected");
    assert_eq!(err.code(), "invalid_params");
    err.details()
        .and_then(|d| d.get("key").and_then(Value::as_str).map(str::to_owned))
        .expect("details.key")
}

#[rstest]
#[case("Path")]
#[case("path")]
#[case("PATH")]
#[case("file_path")]
fn path_aliases_resolve(#[case] key: &str) {
    let args = bag("summarize_file", json!({ key: "/tmp/a.json" }));
    assert_eq!(args.require_str("path").expect("path"), "/tmp/a.json");
}

#[rstest]
#[case("Stage Id")]
#[case("stageId")]
#[case("stage-id")]
#[case("StageID")]
fn stage_id_aliases_resolve(#[case] key: &str) {
    let args = bag("get_stage_summary", json!({ key: "abc123" }));
    assert_eq!(args.require_str("stage_id").expect("stage_id"), "abc123");
}

#[test]
fn exact_canonical_key_beats_alias() {
    let args = bag("get_prim_info_in_file", json!({"primPath": "/A", "prim_path": "/B"}));
    assert_eq!(args.require_str("prim_path").expect("prim_path"), "/B");
}

#[test]
fn wrapper_is_unwrapped_and_flat_keys_win() {
    let args = bag(
        "get_attribute_value_in_file",
        json!({"path": "/flat.json", "values": {"path": "/wrapped.json", "attr": "size"}}),
    );
    assert_eq!(args.require_str("path").expect("path"), "/flat.json");
    assert_eq!(args.require_str("attr").expect("attr"), "size");
    assert!(!args.as_map().contains_key("values"));
}

#[rstest]
#[case("arguments")]
#[case("args")]
#[case("input")]
fn other_wrappers_are_unwrapped(#[case] wrapper: &str) {
    let args = bag("summarize_file", json!({ wrapper: {"Path": "/x.json"} }));
    assert_eq!(args.require_str("path").expect("path"), "/x.json");
}

#[test]
fn top_level_arrays_and_null_are_accepted() {
    let single = bag("summarize_file", json!([{"path": "/a.json"}]));
    assert_eq!(single.require_str("path").expect("path"), "/a.json");

    let merged = bag("get_prim_info_in_file", json!([{"path": "/a.json"}, {"prim_path": "/W"}]));
    assert_eq!(merged.require_str("prim_path").expect("prim"), "/W");

    assert!(bag("list_open_stages", Value::Null).as_map().is_empty());
    assert!(coerce("summarize_file", json!("just a string")).is_err());
    assert!(coerce("summarize_file", json!([1, 2])).is_err());
}

#[rstest]
#[case("displayColor")]
#[case("color")]
#[case("display_color")]
fn display_color_names_alias(#[case] attr: &str) {
    let args = bag("set_attribute_value_in_file", json!({"attr": attr, "value": [1, 0, 0]}));
    assert_eq!(args.require_str("attr").expect("attr"), DISPLAY_COLOR);
    assert_eq!(args.get("value"), Some(&json!([[1, 0, 0]])));
}

#[test]
fn color_shaping_is_idempotent() {
    let raw = json!({"attr": "displayColor", "value": [0.2, 0.4, 0.6]});
    let once = bag("set_attribute_value_in_file", raw);
    let twice = bag("set_attribute_value_in_file", Value::Object(once.as_map().clone()));
    assert_eq!(once, twice);
    assert_eq!(twice.get("value"), Some(&json!([[0.2, 0.4, 0.6]])));
}

#[test]
fn non_color_sequences_are_left_alone() {
    let args = bag("set_attribute_value_in_file", json!({"attr": "extent", "value": [1, 2, 3]}));
    assert_eq!(args.get("value"), Some(&json!([1, 2, 3])));
}

#[rstest]
#[case(json!({"attr": "displayColor", "value": "(1, 0, 0)"}), "value")]
#[case(json!({"attr": "color", "value": {"0": 1, "1": 0, "2": 0}}), "value")]
#[case(json!({"attr": "size", "value": {"0": 1}}), "value")]
fn tuple_like_values_name_the_key(#[case] raw: Value, #[case] key: &str) {
    assert_eq!(rejected_key("set_attribute_value_in_file", raw), key);
}

#[test]
fn batch_items_are_aliased_and_shaped() {
    let args = bag(
        "batch_set_attributes_in_file",
        json!({"updates": [
            {"primPath": "/W/A", "attribute": "displayColor", "value": [1, 1, 0]},
            {"prim_path": "/W/B", "attr": "size", "value": 2.0},
        ]}),
    );
    let items = args.records("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].require_str("prim_path").expect("prim"), "/W/A");
    assert_eq!(items[0].require_str("attr").expect("attr"), DISPLAY_COLOR);
    assert_eq!(items[0].get("value"), Some(&json!([[1, 1, 0]])));
    assert_eq!(items[1].get("value"), Some(&json!(2.0)));
}

#[test]
fn batch_item_errors_are_indexed() {
    let raw = json!({"items": [
        {"prim_path": "/W/A", "attr": "size", "value": 1},
        {"prim_path": "/W/B", "attr": "color", "value": "(1,1,1)"},
    ]});
    assert_eq!(rejected_key("batch_set_attributes_in_file", raw), "items[1].value");
}

#[test]
fn ops_parse_into_typed_records() {
    let args = bag(
        "set_xform_in_file",
        json!({"ops": [
            {"op": "t", "value": [2, 0, 0]},
            {"op": "rotateXYZ", "value": [0, 90, 0]},
        ]}),
    );
    let ops = args.ops().expect("ops").expect("present");
    assert_eq!(ops, vec![XformOp::Translate([2.0, 0.0, 0.0]), XformOp::Rotate([0.0, 90.0, 0.0])]);
    assert_eq!(
        args.get("ops"),
        Some(&json!([
            {"op": "translate", "value": [2.0, 0.0, 0.0]},
            {"op": "rotate", "value": [0.0, 90.0, 0.0]},
        ]))
    );
}

#[test]
fn set_xform_accepts_items_as_ops() {
    let args = bag("set_xform", json!({"items": [{"op": "scale", "value": [2, 2, 2]}]}));
    assert_eq!(args.ops().expect("ops"), Some(vec![XformOp::Scale([2.0, 2.0, 2.0])]));
}

#[rstest]
#[case(json!({"ops": {"op": "translate", "value": [1, 2, 3]}}), "ops")]
#[case(json!({"ops": "[(translate, 1, 2, 3)]"}), "ops")]
#[case(json!({"ops": [{"op": "translate", "value": [1, 2]}]}), "ops[0].value")]
#[case(json!({"ops": [{"op": "translate", "value": "(1, 2, 3)"}]}), "ops[0].value")]
#[case(json!({"ops": [{"op": "scale", "value": {"0": 1, "1": 1, "2": 1}}]}), "ops[0].value")]
#[case(json!({"ops": [{"op": "shear", "value": [1, 2, 3]}]}), "ops[0].op")]
#[case(json!({"ops": [{"op": "translate", "value": [0, 0, 0]}, 5]}), "ops[1]")]
#[case(json!({"ops": [{"op": "s", "value": ["0.5", 0.5, 0.5]}]}), "ops[0].value")]
#[case(json!({"matrix": [[1, 0, 0, 0], [0, 1, 0, 0]]}), "matrix")]
#[case(json!({"matrix": "((1,0,0,0),(0,1,0,0),(0,0,1,0),(0,0,0,1))"}), "matrix")]
fn malformed_transforms_are_rejected(#[case] raw: Value, #[case] key: &str) {
    assert_eq!(rejected_key("set_xform_in_file", raw), key);
}

#[test]
fn matrix_is_validated_and_kept() {
    let offset = json!([[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [5, 0, 0, 1]]);
    let args = bag("set_xform_in_file", json!({"matrix": offset}));
    let matrix = args.matrix().expect("matrix");
    assert_eq!(matrix.translation_part(), [5.0, 0.0, 0.0]);
}

#[rstest]
#[case(json!("default"), TimeCode::Default)]
#[case(json!(24), TimeCode::At(24.0))]
#[case(json!("12.5"), TimeCode::At(12.5))]
#[case(Value::Null, TimeCode::Default)]
fn time_forms_are_accepted(#[case] raw: Value, #[case] expected: TimeCode) {
    let args = bag("get_attribute_value_in_file", json!({ "time": raw }));
    assert_eq!(args.time(), expected);
}

#[test]
fn bad_time_is_rejected() {
    assert_eq!(rejected_key("get_attribute_value_in_file", json!({"time": "later"})), "time");
}

#[rstest]
#[case(json!(true), true)]
#[case(json!("false"), false)]
#[case(json!("YES"), true)]
#[case(json!(0), false)]
fn flags_accept_loose_booleans(#[case] raw: Value, #[case] expected: bool) {
    let args = bag("export_usd_file", json!({ "skipIfExists": raw }));
    assert_eq!(args.opt_flag("skip_if_exists"), Some(expected));
}

#[test]
fn type_alias_depends_on_tool() {
    let listed = bag("list_prims_in_file", json!({"type": "Mesh"}));
    assert_eq!(listed.require_str("type_filter").expect("filter"), "Mesh");
    let created = bag("create_prim_in_file", json!({"type": "Cube"}));
    assert_eq!(created.require_str("type_name").expect("type"), "Cube");
}

#[test]
fn depth_accepts_numeric_strings() {
    assert_eq!(bag("list_prims", json!({"depth": "2"})).depth(), Some(2));
    assert_eq!(rejected_key("list_prims", json!({"depth": -1})), "depth");
}

#[test]
fn assets_accept_strings_and_three_state_internal_path() {
    let args = bag(
        "compose_referenced_assembly",
        json!({"assets": [
            "props/mop.json",
            {"path": "props/broom.json", "internalPath": null},
            {"asset": "props/pail.json", "internal_path": "/Pail/Geo"},
        ]}),
    );
    let assets = args.records("assets");
    assert_eq!(assets[0].require_str("asset_path").expect("asset"), "props/mop.json");
    assert_eq!(assets[0].internal_path().expect("ip"), InternalPath::AssetDefault);
    assert_eq!(assets[1].require_str("asset_path").expect("asset"), "props/broom.json");
    assert_eq!(assets[1].internal_path().expect("ip"), InternalPath::Root);
    assert_eq!(
        assets[2].internal_path().expect("ip"),
        InternalPath::Node(NodePath::parse("/Pail/Geo").expect("path"))
    );
}

#[test]
fn variant_records_are_aliased() {
    let args = bag(
        "author_variants_in_file",
        json!({
            "variantSet": "model",
            "variants": [
                {"variant": "mop", "assetPath": "mop.json", "ops": [{"op": "s", "value": [2, 2, 2]}]},
                {"name": "broom", "asset_reference": "broom.json"},
            ],
        }),
    );
    assert_eq!(args.require_str("set_name").expect("set"), "model");
    let variants = args.records("variants");
    assert_eq!(variants[0].require_str("name").expect("name"), "mop");
    assert_eq!(variants[0].require_str("asset_reference").expect("ref"), "mop.json");
    assert_eq!(
        variants[0].ops_at("transform").expect("transform"),
        Some(vec![XformOp::Scale([2.0, 2.0, 2.0])])
    );
    assert_eq!(variants[1].ops_at("transform").expect("transform"), None);
}

#[test]
fn variant_transform_errors_are_indexed() {
    let raw = json!({"variants": [
        {"name": "a", "asset_reference": "a.json", "transform": [{"op": "t", "value": "(1,2,3)"}]},
    ]});
    assert_eq!(rejected_key("author_variants", raw), "variants[0].transform[0].value");
}

#[test]
fn camera_params_are_aliased_and_checked() {
    let args = bag(
        "set_camera_in_file",
        json!({"camera": "/Cam", "params": {"focalLength": 35, "clippingRange": [0.1, 500]}}),
    );
    assert_eq!(args.require_str("camera_path").expect("camera"), "/Cam");
    let params = args.nested("params");
    assert_eq!(params.opt_f64("focal_length").expect("focal"), Some(35.0));

    let raw = json!({"params": {"clipping_range": "(0.1, 500)"}});
    assert_eq!(rejected_key("set_camera_in_file", raw), "params.clipping_range");
}

#[test]
fn node_paths_are_validated_on_access() {
    let args = bag("get_prim_info_in_file", json!({"prim_path": "World/Cube"}));
    let err = args.require_node_path("prim_path").expect_err("relative path");
    assert_eq!(err.details().and_then(|d| d.get("key").cloned()), Some(json!("prim_path")));

    let err = bag("get_prim_info_in_file", json!({})).require_node_path("prim_path")
        .expect_err("missing");
    assert_eq!(err.code(), "invalid_params");
}

#[test]
fn up_axis_is_normalized() {
    assert_eq!(bag("create_stage", json!({"upAxis": "y"})).up_axis(), Some(Axis::Y));
    assert_eq!(rejected_key("create_stage", json!({"up_axis": "X"})), "up_axis");
}

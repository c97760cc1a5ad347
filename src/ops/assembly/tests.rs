// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::*;
use crate::engine::JsonStageEngine;
use crate::model::TimeCode;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

fn np(value: &str) -> NodePath {
    NodePath::parse(value).expect("node path")
}

fn write_asset(dir: &Path, file: &str, root: &str, up_axis: Axis) -> PathBuf {
    let path = dir.join(file);
    let engine = JsonStageEngine::new();
    let mut doc = engine
        .create(&path, CreateOptions { up_axis: Some(up_axis), meters_per_unit: None })
        .expect("create asset");
    let root = np(root);
    let geom = root.child("Geom").expect("child");
    doc.define_node(&root, Some("Xform"), Specifier::Def).expect("define root");
    doc.set_xform_ops(&root, vec![XformOp::Scale([0.3, 0.3, 0.3])]).expect("scale");
    doc.define_node(&geom, Some("Cube"), Specifier::Def).expect("define geom");
    doc.set_attribute(&geom, "size", json!(1.0), TimeCode::Default).expect("size");
    doc.set_default_prim(&root).expect("default prim");
    doc.save().expect("save asset");
    path
}

struct Assets {
    dir: TempDir,
    mop: PathBuf,
    broom: PathBuf,
}

#[fixture]
fn assets() -> Assets {
    let dir = tempfile::tempdir().expect("tempdir");
    let mop = write_asset(dir.path(), "mop.json", "/Mop", Axis::Y);
    let broom = write_asset(dir.path(), "broom-v2.json", "/Broom", Axis::Z);
    Assets { dir, mop, broom }
}

fn asset(path: &Path) -> AssetRequest {
    AssetRequest { asset_path: path.to_path_buf(), name: None, internal_path: InternalPath::AssetDefault }
}

fn request(assets: &Assets) -> AssemblyRequest {
    AssemblyRequest::new(
        assets.dir.path().join("room set.json"),
        vec![asset(&assets.mop), asset(&assets.broom)],
    )
}

#[rstest]
fn composes_under_a_derived_container(assets: Assets) {
    let engine = JsonStageEngine::new();
    let report = compose_assembly(&engine, &request(&assets)).expect("compose");

    assert_eq!(report.container_root, np("/room_set"));
    assert_eq!(
        report.created_nodes,
        vec![np("/room_set"), np("/room_set/mop"), np("/room_set/broom_v2")]
    );
    assert_eq!(report.referenced, vec![np("/room_set/mop"), np("/room_set/broom_v2")]);
    assert!(report.skipped.is_empty());
    assert!(assets.dir.path().join("mop.flat.json").is_file());
    assert!(assets.dir.path().join("broom_v2.flat.json").is_file());

    let out = engine.open(&report.output_path).expect("open output");
    assert_eq!(out.default_prim(), Some(np("/room_set")));
    assert_eq!(out.up_axis(), Axis::Z);
    assert!(out.node_exists(&np("/room_set/mop/Geom")));
    assert_eq!(
        out.references(&np("/room_set/mop")).expect("refs"),
        vec![Reference::new("mop.flat.json", None)]
    );
}

#[rstest]
fn rerun_with_skip_if_exists_adds_nothing(assets: Assets) {
    let engine = JsonStageEngine::new();
    let req = request(&assets);
    compose_assembly(&engine, &req).expect("first");
    let before = engine.open(&req.output_path).expect("open").traverse().expect("traverse");

    let second = compose_assembly(&engine, &req).expect("second");
    assert!(second.created_nodes.is_empty());
    assert!(second.referenced.is_empty());
    assert_eq!(second.skipped, vec![np("/room_set/mop"), np("/room_set/broom_v2")]);
    let after = engine.open(&req.output_path).expect("open").traverse().expect("traverse");
    assert_eq!(before, after);
}

#[rstest]
fn rerun_without_skip_still_adds_no_duplicates(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.skip_if_exists = false;
    compose_assembly(&engine, &req).expect("first");
    let second = compose_assembly(&engine, &req).expect("second");
    assert!(second.created_nodes.is_empty());
    assert!(second.referenced.is_empty());

    let out = engine.open(&req.output_path).expect("open");
    assert_eq!(out.references(&np("/room_set/mop")).expect("refs").len(), 1);
    let ops = out.authored_xform_ops(&np("/room_set/mop")).expect("ops");
    assert_eq!(ops.iter().filter(|op| **op == UP_AXIS_CORRECTION).count(), 1);
}

#[rstest]
fn up_axis_mismatch_gets_corrective_rotation(assets: Assets) {
    let engine = JsonStageEngine::new();
    let report = compose_assembly(&engine, &request(&assets)).expect("compose");
    let out = engine.open(&report.output_path).expect("open");

    let mop_ops = out.authored_xform_ops(&np("/room_set/mop")).expect("mop ops");
    assert_eq!(mop_ops.first(), Some(&UP_AXIS_CORRECTION));
    assert!(mop_ops.contains(&XformOp::Scale([0.3, 0.3, 0.3])), "inherited scale kept");
    let broom_ops = out.authored_xform_ops(&np("/room_set/broom_v2")).expect("broom ops");
    assert!(broom_ops.is_empty(), "matching up-axis needs no correction");
}

#[rstest]
fn unflattened_assembly_references_sources_directly(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.flatten = false;
    let report = compose_assembly(&engine, &req).expect("compose");
    let out = engine.open(&report.output_path).expect("open");

    let refs = out.references(&np("/room_set/mop")).expect("refs");
    assert_eq!(refs, vec![Reference::new(assets.mop.display().to_string(), None)]);
    assert!(out.authored_xform_ops(&np("/room_set/mop")).expect("ops").is_empty());
    assert!(!assets.dir.path().join("mop.flat.json").exists());
}

#[rstest]
#[case::asset_default(InternalPath::AssetDefault, None)]
#[case::root(InternalPath::Root, Some(NodePath::root()))]
#[case::node(InternalPath::Node(np("/Mop/Geom")), Some(np("/Mop/Geom")))]
fn internal_path_selects_the_reference_target(
    assets: Assets,
    #[case] internal_path: InternalPath,
    #[case] expected: Option<NodePath>,
) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.flatten = false;
    req.assets = vec![AssetRequest { internal_path, ..asset(&assets.mop) }];
    let report = compose_assembly(&engine, &req).expect("compose");

    let out = engine.open(&report.output_path).expect("open");
    let refs = out.references(&np("/room_set/mop")).expect("refs");
    assert_eq!(refs[0].prim_path, expected);
}

#[rstest]
fn clear_existing_removes_other_roots(assets: Assets) {
    let engine = JsonStageEngine::new();
    let req = request(&assets);
    let mut seeded = engine.create(&req.output_path, CreateOptions::default()).expect("seed");
    seeded.define_node(&np("/Leftover"), Some("Cube"), Specifier::Def).expect("define");
    seeded.save().expect("save seed");

    compose_assembly(&engine, &req).expect("keep");
    assert!(engine.open(&req.output_path).expect("open").node_exists(&np("/Leftover")));

    let cleared = AssemblyRequest { clear_existing: true, ..req.clone() };
    compose_assembly(&engine, &cleared).expect("clear");
    let out = engine.open(&req.output_path).expect("open");
    assert_eq!(out.root_nodes().expect("roots"), vec![np("/room_set")]);
}

#[rstest]
fn missing_asset_fails_before_the_output_exists(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.assets.push(asset(&assets.dir.path().join("bucket.json")));
    let err = compose_assembly(&engine, &req).expect_err("missing asset");
    assert_eq!(err.code(), "not_found");
    assert_eq!(err.details().expect("details")["key"], "assets[2].asset_path");
    assert!(!req.output_path.exists());
}

#[rstest]
fn failed_save_removes_the_flattened_copies_it_wrote(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    // A directory where the output layer should go makes the final save fail.
    req.output_path = assets.dir.path().join("room.json");
    std::fs::create_dir(&req.output_path).expect("blocking dir");
    let kept = assets.dir.path().join("broom_v2.flat.json");
    std::fs::write(&kept, "{}").expect("pre-existing copy");

    let err = compose_assembly(&engine, &req).expect_err("save fails");
    assert_eq!(err.code(), "save_failed");
    assert!(!assets.dir.path().join("mop.flat.json").exists());
    assert!(kept.is_file());
}

#[rstest]
fn duplicate_names_are_rejected(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.assets[1].name = Some("mop".to_owned());
    let err = compose_assembly(&engine, &req).expect_err("duplicate");
    assert_eq!(err.code(), "invalid_params");
    assert_eq!(err.details().expect("details")["key"], "assets[1].name");
}

#[rstest]
fn nested_container_cannot_be_the_default_prim(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.container_root = Some(np("/World/Props"));
    let err = compose_assembly(&engine, &req).expect_err("nested default prim");
    assert_eq!(err.details().expect("details")["key"], "container_root");

    req.set_default_prim = false;
    let report = compose_assembly(&engine, &req).expect("nested container");
    assert_eq!(report.referenced[0], np("/World/Props/mop"));
}

#[rstest]
fn unknown_internal_path_is_not_found(assets: Assets) {
    let engine = JsonStageEngine::new();
    let mut req = request(&assets);
    req.assets[0].internal_path = InternalPath::Node(np("/Mop/Nope"));
    let err = compose_assembly(&engine, &req).expect_err("missing internal path");
    assert_eq!(err.code(), "not_found");
    assert!(!req.output_path.exists());
}

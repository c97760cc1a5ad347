// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::*;
use crate::engine::{CreateOptions, Engine, JsonStageEngine};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

fn np(value: &str) -> NodePath {
    NodePath::parse(value).expect("node path")
}

#[fixture]
fn dir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

/// `/World` with a cube, a sphere under `/World/Props`, and a material.
fn scene(dir: &TempDir) -> Box<dyn Document> {
    let engine = JsonStageEngine::new();
    let mut doc =
        engine.create(&dir.path().join("scene.json"), CreateOptions::default()).expect("create");
    doc.define_node(&np("/World"), Some("Xform"), Specifier::Def).expect("world");
    doc.define_node(&np("/World/Cube"), Some("Cube"), Specifier::Def).expect("cube");
    doc.define_node(&np("/World/Props/Ball"), Some("Sphere"), Specifier::Def).expect("ball");
    doc.define_node(&np("/Looks/Red"), Some("Material"), Specifier::Def).expect("material");
    doc
}

#[rstest]
#[case::default_depth_lists_roots(NodePath::root(), 1, vec!["/Looks", "/World"])]
#[case::root_prim_is_included(np("/World"), 1, vec!["/World", "/World/Cube", "/World/Props"])]
#[case::zero_depth_is_just_the_root(np("/World"), 0, vec!["/World"])]
#[case::deep(np("/World"), 5, vec!["/World", "/World/Cube", "/World/Props", "/World/Props/Ball"])]
fn list_prims_honors_depth(
    dir: TempDir,
    #[case] root: NodePath,
    #[case] depth: usize,
    #[case] expected: Vec<&str>,
) {
    let doc = scene(&dir);
    let listed = list_prims(doc.as_ref(), &root, depth, None).expect("list");
    let expected: Vec<NodePath> = expected.into_iter().map(np).collect();
    assert_eq!(listed, expected);
}

#[rstest]
fn type_filter_keeps_descending(dir: TempDir) {
    let doc = scene(&dir);
    let spheres = list_prims(doc.as_ref(), &NodePath::root(), 10, Some("Sphere")).expect("list");
    assert_eq!(spheres, vec![np("/World/Props/Ball")]);
}

#[rstest]
fn list_prims_on_missing_root_is_not_found(dir: TempDir) {
    let doc = scene(&dir);
    let err = list_prims(doc.as_ref(), &np("/Nope"), 1, None).expect_err("missing");
    assert_eq!(err.code(), "not_found");
}

#[rstest]
fn attributes_read_back_with_fallbacks_and_missing(dir: TempDir) {
    let mut doc = scene(&dir);
    let cube = np("/World/Cube");
    let size = |doc: &dyn Document| {
        get_attribute(doc, &cube, "size", TimeCode::Default).expect("size").value
    };
    assert_eq!(size(doc.as_ref()), json!(2.0));

    set_attribute(doc.as_mut(), &cube, "size", json!(1.5), TimeCode::Default).expect("set");
    assert_eq!(size(doc.as_ref()), json!(1.5));

    let err =
        get_attribute(doc.as_ref(), &cube, "mass", TimeCode::Default).expect_err("missing attr");
    assert_eq!(err.code(), "not_found");
    assert_eq!(err.details(), Some(json!({"prim_path": "/World/Cube", "attr": "mass"})));
}

#[rstest]
fn batch_reports_each_item(dir: TempDir) {
    let mut doc = scene(&dir);
    let update = |path: &str, attr: &str, value: Value| -> Result<AttributeUpdate, GatewayError> {
        Ok(AttributeUpdate {
            prim_path: np(path),
            attr: attr.to_owned(),
            value,
            time: TimeCode::Default,
        })
    };
    let report = batch_set_attributes(
        doc.as_mut(),
        vec![
            update("/World/Cube", "size", json!(3.0)),
            update("/World/Missing", "size", json!(1.0)),
            Err(GatewayError::invalid_key("items[2].value", "bad value")),
            update("/World/Props/Ball", "radius", json!(0.25)),
        ],
    );

    assert_eq!(report.applied, 2);
    let flags: Vec<bool> = report.items.iter().map(|item| item.ok).collect();
    assert_eq!(flags, vec![true, false, false, true]);
    assert_eq!(report.items[1].error.as_ref().map(|e| e.code.as_str()), Some("not_found"));
    assert_eq!(report.items[2].error.as_ref().map(|e| e.code.as_str()), Some("invalid_params"));
    let radius = doc.attribute(&np("/World/Props/Ball"), "radius", TimeCode::Default).expect("radius");
    assert_eq!(radius, Some(json!(0.25)));
}

#[rstest]
fn create_and_delete_prims(dir: TempDir) {
    let mut doc = scene(&dir);
    let light = np("/World/Light");
    assert!(create_prim(doc.as_mut(), &light, Some("SphereLight"), Specifier::Def).expect("create").created);
    assert!(!create_prim(doc.as_mut(), &light, None, Specifier::Def).expect("again").created);
    assert_eq!(doc.node_info(&light).expect("info").type_name.as_deref(), Some("SphereLight"));

    assert!(delete_prim(doc.as_mut(), &light).expect("delete").deleted);
    assert_eq!(delete_prim(doc.as_mut(), &light).expect_err("gone").code(), "not_found");
}

#[rstest]
fn default_prim_must_exist_and_be_root_level(dir: TempDir) {
    let mut doc = scene(&dir);
    assert_eq!(set_default_prim(doc.as_mut(), &np("/World")).expect("set"), np("/World"));
    assert_eq!(set_default_prim(doc.as_mut(), &np("/Nope")).expect_err("missing").code(), "not_found");
    let err = set_default_prim(doc.as_mut(), &np("/World/Cube")).expect_err("nested");
    assert_eq!(err.code(), "invalid_params");
}

#[rstest]
fn export_skips_existing_targets(dir: TempDir) {
    let doc = scene(&dir);
    let target = dir.path().join("out.json");
    let first = export(doc.as_ref(), &target, true, true).expect("export");
    assert!(!first.skipped);
    assert!(target.is_file());

    let second = export(doc.as_ref(), &target, true, true).expect("skip");
    assert!(second.skipped);
    assert!(!export(doc.as_ref(), &target, false, false).expect("overwrite").skipped);
}

#[rstest]
fn package_holds_the_root_layer_then_its_references(dir: TempDir) {
    let engine = JsonStageEngine::new();
    let mut chair = engine.create(&dir.path().join("props/chair.json"), CreateOptions::default()).expect("chair");
    chair.define_node(&np("/Chair"), Some("Cube"), Specifier::Def).expect("define chair");
    chair.set_default_prim(&np("/Chair")).expect("default");
    chair.save().expect("save chair");

    let mut doc = scene(&dir);
    doc.add_reference(&np("/World/Props"), Reference::new("props/chair.json", None)).expect("ref");
    doc.add_reference(&np("/World/Cube"), Reference::new("gone.json", None)).expect("dangling");

    let target = dir.path().join("out/scene.pkg");
    let report = export_package(doc.as_ref(), &target, false).expect("package");
    assert_eq!(report.layers, vec!["scene.json", "chair.json"]);

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&target).expect("open")).expect("zip");
    assert_eq!(archive.len(), 2);
    let mut names = Vec::new();
    for index in 0..archive.len() {
        let entry = archive.by_index(index).expect("entry");
        assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
        assert_eq!(entry.data_start() % 64, 0, "{} is not aligned", entry.name());
        names.push(entry.name().to_owned());
    }
    assert_eq!(names, report.layers);

    let mut root = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("scene.json").expect("root"), &mut root)
        .expect("read root");
    let root: Value = serde_json::from_str(&root).expect("json");
    assert_eq!(root["nodes"]["/World/Props"]["references"][0]["asset_path"], "chair.json");
    assert_eq!(root["nodes"]["/World/Cube"]["references"][0]["asset_path"], "gone.json");

    let skipped = export_package(doc.as_ref(), &target, true).expect("skip");
    assert!(skipped.skipped);
    assert!(skipped.layers.is_empty());
}

#[rstest]
fn validate_reports_authoring_problems(dir: TempDir) {
    let mut doc = scene(&dir);
    doc.set_relationship_targets(&np("/World/Cube"), "material:binding", vec![np("/Looks/Blue")])
        .expect("dangling");
    doc.add_reference(&np("/World/Props"), Reference::new("missing.json", None)).expect("reference");

    let report = validate(doc.as_ref()).expect("validate");
    assert!(!report.ok);
    let codes: Vec<IssueCode> = report.issues.iter().map(|issue| issue.code).collect();
    assert_eq!(
        codes,
        vec![
            IssueCode::MissingDefaultPrim,
            IssueCode::DanglingRelationship,
            IssueCode::UnresolvedReference,
        ]
    );
}

#[rstest]
fn clean_stage_validates(dir: TempDir) {
    let mut doc = scene(&dir);
    doc.set_default_prim(&np("/World")).expect("default");
    let report = validate(doc.as_ref()).expect("validate");
    assert!(report.ok, "{:?}", report.issues);
}

#[rstest]
fn add_references_defines_targets_and_reports_per_item(dir: TempDir) {
    let engine = JsonStageEngine::new();
    let mut asset = engine.create(&dir.path().join("chair.json"), CreateOptions::default()).expect("asset");
    asset.define_node(&np("/Chair"), Some("Cube"), Specifier::Def).expect("chair");
    asset.set_default_prim(&np("/Chair")).expect("default");
    asset.save().expect("save asset");

    let mut doc = scene(&dir);
    let item = |prim: &str, asset: &str| -> Result<ReferenceUpdate, GatewayError> {
        Ok(ReferenceUpdate {
            prim_path: np(prim),
            asset_path: asset.to_owned(),
            internal_path: InternalPath::AssetDefault,
        })
    };
    let report = add_references(
        doc.as_mut(),
        vec![item("/World/Chair_1", "chair.json"), item("/World/Chair_2", "sofa.json")],
    );
    assert_eq!(report.applied, 1);
    assert!(report.items[0].ok);
    assert_eq!(report.items[1].error.as_ref().map(|e| e.code.as_str()), Some("not_found"));
    let chair = doc.node_info(&np("/World/Chair_1")).expect("info");
    assert!(chair.has_references);
    assert_eq!(chair.type_name.as_deref(), Some("Xform"));
    assert!(!doc.node_exists(&np("/World/Chair_2")));
}

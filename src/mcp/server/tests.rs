// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::*;

fn args(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => ToolArguments(map),
        other => panic!("tool arguments must be an object: {other}"),
    }
}

fn server(dir: &tempfile::TempDir) -> StagehandMcp {
    StagehandMcp::with_config(GatewayConfig::default().with_base_dir(dir.path()))
}

#[test]
fn tools_advertise_descriptions_and_schemas() {
    let tools = StagehandMcp::tool_router().list_all();
    assert_eq!(tools.len(), TOOLS.len());

    let mut seen_names = BTreeSet::new();
    for tool in tools {
        let name = tool.name.to_string();
        assert!(seen_names.insert(name.clone()), "duplicate tool name: {name}");
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()), "non-alphanumeric: {name}");
        assert!(
            tool.description.as_deref().is_some_and(|desc| !desc.trim().is_empty()),
            "{name} has no description"
        );
        assert_eq!(
            tool.input_schema.get("type").and_then(|v| v.as_str()),
            Some("object"),
            "{name} input schema"
        );
        let output = tool.output_schema.as_ref().expect("output schema");
        assert_eq!(output.get("type").and_then(|v| v.as_str()), Some("object"), "{name}");
    }

    let expected: BTreeSet<String> = TOOLS
        .iter()
        .filter_map(|spec| spec.aliases.first().map(|alias| (*alias).to_owned()))
        .collect();
    assert_eq!(seen_names, expected);
}

#[test]
fn server_info_enables_tools() {
    let dir = tempfile::tempdir().expect("tempdir");
    let info = server(&dir).get_info();
    assert!(info.capabilities.tools.is_some());
    let instructions = info.instructions.expect("instructions");
    assert!(instructions.contains("composeReferencedAssembly"));
}

#[tokio::test]
async fn session_tools_share_one_gateway() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server(&dir);

    let Json(created) =
        server.create_stage(Parameters(args(json!({ "path": "cube.json" })))).await.expect("create");
    assert!(created.ok, "{:?}", created.error);
    let token = created.result.expect("result")["stage_id"].clone();

    let Json(prim) = server
        .create_prim(Parameters(args(json!({
            "stageId": token,
            "primPath": "/World/Cube",
            "type": "Cube"
        }))))
        .await
        .expect("createPrim");
    assert!(prim.ok, "{:?}", prim.error);

    let Json(listed) =
        server.list_open_stages(Parameters(ToolArguments::default())).await.expect("listStages");
    let stages = listed.result.expect("result")["stages"].clone();
    assert_eq!(stages.as_array().map(Vec::len), Some(1));
    assert_eq!(stages[0]["dirty"], true);
    assert_eq!(server.gateway().sessions().len(), 1);
}

#[tokio::test]
async fn failures_arrive_as_error_envelopes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server(&dir);

    let Json(missing) = server
        .get_xform(Parameters(args(json!({ "stage_id": "ffffffffffff", "prim_path": "/World" }))))
        .await
        .expect("getXform");
    assert_eq!(missing.error_code(), Some("stage_not_found"));

    let Json(bad_ops) = server
        .set_xform_in_file(Parameters(args(json!({
            "path": "scene.json",
            "prim_path": "/World",
            "ops": { "op": "translate", "value": [1, 0, 0] }
        }))))
        .await
        .expect("setXformFile");
    assert_eq!(bad_ops.error_code(), Some("invalid_params"));
    let details = bad_ops.error.and_then(|error| error.details).expect("details");
    assert_eq!(details["key"], "ops");
}

#[tokio::test]
async fn file_tools_round_trip_through_the_server() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server(&dir);

    let Json(created) = server
        .create_prim_in_file(Parameters(args(json!({
            "path": "scene.json",
            "prim_path": "/World/Cube",
            "type": "Cube"
        }))))
        .await
        .expect("createPrimFile");
    assert!(created.ok, "{:?}", created.error);
    assert!(dir.path().join("scene.json").is_file());

    let Json(summary) = server
        .summarize_file(Parameters(args(json!({ "path": "scene.json" }))))
        .await
        .expect("summarizeFile");
    let result = summary.result.expect("result");
    assert_eq!(result["root_prims"], json!(["/World"]));
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::{json, Value};
use stagehand::{Gateway, GatewayConfig};

fn call(gateway: &Gateway, tool: &str, args: Value) -> Value {
    let envelope = gateway.call(tool, args);
    assert!(envelope.ok, "{tool} failed: {:?}", envelope.error);
    envelope.result.expect("result")
}

#[test]
fn authored_session_survives_save_and_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = GatewayConfig::from_toml_str(&format!(
        "base_dir = {:?}\nwrite_durability = \"durable\"\n",
        dir.path().display().to_string()
    ))
    .expect("config");
    let gateway = Gateway::with_json_engine(config);

    let created = call(&gateway, "createStage", json!({ "path": "shot.json", "upAxis": "Z" }));
    let token = created["stage_id"].as_str().expect("token").to_owned();

    call(&gateway, "createPrim", json!({ "stage_id": token, "prim_path": "/Shot", "type": "Xform" }));
    call(
        &gateway,
        "setXform",
        json!({
            "stage_id": token,
            "prim_path": "/Shot",
            "ops": [{ "op": "translate", "value": [1, 2, 3] }]
        }),
    );
    call(&gateway, "save", json!({ "stage_id": token }));
    let closed = call(&gateway, "close", json!({ "stage_id": token }));
    assert_eq!(closed["dirty"], false);
    assert!(gateway.sessions().is_empty());

    let reopened = call(&gateway, "open", json!({ "path": "shot.json" }));
    let token = reopened["stage_id"].as_str().expect("token").to_owned();
    let summary = call(&gateway, "stageSummary", json!({ "stage_id": token }));
    assert_eq!(summary["up_axis"], "Z");
    assert_eq!(summary["root_prims"], json!(["/Shot"]));

    let xform = call(&gateway, "getXform", json!({ "stage_id": token, "prim_path": "/Shot" }));
    assert_eq!(xform["world_matrix"][3], json!([1.0, 2.0, 3.0, 1.0]));
}

#[test]
fn stateless_tools_never_register_sessions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gateway = Gateway::with_json_engine(GatewayConfig::default().with_base_dir(dir.path()));

    call(&gateway, "createPrimFile", json!({ "path": "prop.json", "prim_path": "/Prop" }));
    let listed = call(&gateway, "listPrimsFile", json!({ "path": "prop.json" }));
    assert_eq!(listed["prims"], json!(["/Prop"]));
    assert!(gateway.sessions().is_empty());
}

#[test]
fn missing_engine_is_reported_per_call() {
    let gateway = Gateway::without_engine(GatewayConfig::default());
    let envelope = gateway.call("summarizeFile", json!({ "path": "anything.json" }));
    assert_eq!(envelope.error_code(), Some("missing_engine"));
    assert_eq!(envelope.to_value()["ok"], false);
}

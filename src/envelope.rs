// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The only response shape a tool call produces.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// `{ok: true, result}` or `{ok: false, error: {code, message, details?}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Envelope {
    pub fn success(result: Value) -> Self {
        Self { ok: true, result: Some(result), error: None }
    }

    pub fn failure(err: &GatewayError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: err.code().to_owned(),
                message: err.to_string(),
                details: err.details(),
            }),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Result<Value, GatewayError>> for Envelope {
    fn from(outcome: Result<Value, GatewayError>) -> Self {
        match outcome {
            Ok(result) => Self::success(result),
            Err(err) => Self::failure(&err),
        }
    }
}

/// Per-item outcome inside a batch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub index: usize,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ItemStatus {
    pub fn from_outcome(index: usize, outcome: Result<(), GatewayError>) -> Self {
        match outcome {
            Ok(()) => Self { index, ok: true, error: None },
            Err(err) => Self { index, ok: false, error: Envelope::failure(&err).error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_error() {
        let envelope = Envelope::success(json!({"stage_id": "abc"}));
        assert_eq!(envelope.to_value(), json!({"ok": true, "result": {"stage_id": "abc"}}));
    }

    #[test]
    fn failure_omits_result_and_empty_details() {
        let envelope = Envelope::failure(&GatewayError::invalid_params("'path' is required"));
        assert_eq!(
            envelope.to_value(),
            json!({"ok": false, "error": {"code": "invalid_params", "message": "'path' is required"}})
        );
    }

    #[test]
    fn stage_not_found_reports_token() {
        let envelope = Envelope::from(Err::<Value, _>(GatewayError::stage_not_found("deadbeef")));
        assert_eq!(envelope.error_code(), Some("stage_not_found"));
        assert_eq!(envelope.error.and_then(|e| e.details), Some(json!({"stage_id": "deadbeef"})));
    }

    #[test]
    fn item_status_keeps_index_and_code() {
        let status = ItemStatus::from_outcome(2, Err(GatewayError::not_found("prim not found")));
        let encoded = serde_json::to_value(&status).expect("encode");
        assert_eq!(encoded["index"], json!(2));
        assert_eq!(encoded["ok"], json!(false));
        assert_eq!(encoded["error"]["code"], json!("not_found"));
        let ok = serde_json::to_value(ItemStatus::from_outcome(0, Ok(()))).expect("encode");
        assert_eq!(ok, json!({"index": 0, "ok": true}));
    }
}

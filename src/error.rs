// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::Path;

use serde_json::{Map, Value};

use crate::engine::EngineError;
use crate::model::NodePath;

pub type Details = Map<String, Value>;

/// Every failure a tool call can report. `code()` is the stable wire identifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("scene engine is not available in this host")]
    MissingEngine,
    #[error("{message}")]
    InvalidParams { message: String, details: Details },
    #[error("unknown stage_id: {stage_id}")]
    StageNotFound { stage_id: String },
    #[error("{message}")]
    NotFound { message: String, details: Details },
    #[error("failed to open stage {path}: {reason}")]
    OpenFailed { path: String, reason: String },
    #[error("failed to save stage {path}: {reason}")]
    SaveFailed { path: String, reason: String },
    #[error("failed to export stage to {path}: {reason}")]
    ExportFailed { path: String, reason: String },
    #[error("{message}")]
    Internal { message: String, details: Details },
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingEngine => "missing_engine",
            Self::InvalidParams { .. } => "invalid_params",
            Self::StageNotFound { .. } => "stage_not_found",
            Self::NotFound { .. } => "not_found",
            Self::OpenFailed { .. } => "open_failed",
            Self::SaveFailed { .. } => "save_failed",
            Self::ExportFailed { .. } => "export_failed",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams { message: message.into(), details: Details::new() }
    }

    /// Invalid argument attributed to one (possibly nested) key, e.g. `ops[1].value`.
    pub fn invalid_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::invalid_params(message).with_detail("key", key.into())
    }

    pub fn missing_key(key: &str) -> Self {
        Self::invalid_key(key, format!("'{key}' is required"))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into(), details: Details::new() }
    }

    pub fn node_not_found(node: &NodePath) -> Self {
        Self::not_found(format!("prim not found: {node}")).with_detail("prim_path", node.as_str())
    }

    pub fn stage_not_found(stage_id: impl Into<String>) -> Self {
        Self::StageNotFound { stage_id: stage_id.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), details: Details::new() }
    }

    pub fn open_failed(path: &Path, err: &EngineError) -> Self {
        tracing::warn!(path = %path.display(), error = %err, "engine failed to open stage");
        Self::OpenFailed { path: path.display().to_string(), reason: err.to_string() }
    }

    pub fn save_failed(path: &Path, err: &EngineError) -> Self {
        tracing::warn!(path = %path.display(), error = %err, "engine failed to save stage");
        Self::SaveFailed { path: path.display().to_string(), reason: err.to_string() }
    }

    pub fn export_failed(path: &Path, err: &EngineError) -> Self {
        tracing::warn!(path = %path.display(), error = %err, "engine failed to export stage");
        Self::ExportFailed { path: path.display().to_string(), reason: err.to_string() }
    }

    /// Attaches a diagnostic field. Variants with fixed fields already carry theirs.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        match &mut self {
            Self::InvalidParams { details, .. }
            | Self::NotFound { details, .. }
            | Self::Internal { details, .. } => {
                details.insert(key.to_owned(), value.into());
            }
            _ => {}
        }
        self
    }

    pub fn details(&self) -> Option<Value> {
        let details = match self {
            Self::MissingEngine => return None,
            Self::InvalidParams { details, .. }
            | Self::NotFound { details, .. }
            | Self::Internal { details, .. } => details.clone(),
            Self::StageNotFound { stage_id } => {
                let mut map = Details::new();
                map.insert("stage_id".to_owned(), Value::from(stage_id.as_str()));
                map
            }
            Self::OpenFailed { path, reason }
            | Self::SaveFailed { path, reason }
            | Self::ExportFailed { path, reason } => {
                let mut map = Details::new();
                map.insert("path".to_owned(), Value::from(path.as_str()));
                map.insert("reason".to_owned(), Value::from(reason.as_str()));
                map
            }
        };
        (!details.is_empty()).then_some(Value::Object(details))
    }
}

impl From<EngineError> for GatewayError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NodeNotFound { node } => Self::node_not_found(&node),
            EngineError::AttributeNotFound { node, attr } => {
                Self::not_found(format!("attribute not found: {node}.{attr}"))
                    .with_detail("prim_path", node.as_str())
                    .with_detail("attr", attr)
            }
            EngineError::VariantNotFound { node, set, variant } => {
                Self::not_found(format!("variant {set}={variant} not found on {node}"))
                    .with_detail("prim_path", node.as_str())
                    .with_detail("set_name", set)
                    .with_detail("variant", variant)
            }
            EngineError::Rejected(message) => Self::invalid_params(message),
            other => {
                tracing::warn!(error = %other, "engine call failed");
                Self::internal(other.to_string())
            }
        }
    }
}

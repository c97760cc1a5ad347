// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::math::{Matrix4, Vec3};

/// One entry of a node's transform op stack.
///
/// Wire shape: `{"op": "translate", "value": [x, y, z]}`; rotation values are degrees about
/// X, Y, Z applied in that order; `matrix` carries a 4×4 row-major array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum XformOp {
    Translate(Vec3),
    Rotate(Vec3),
    Scale(Vec3),
    Matrix(Matrix4),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XformOpKind {
    Translate,
    Rotate,
    Scale,
    Matrix,
}

impl XformOpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
            Self::Matrix => "matrix",
        }
    }

    /// Accepts the canonical names plus the spellings callers commonly send
    /// (`t`, `rotateXYZ`, `xformOp:scale`, `transform`, ...).
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let name = lowered.strip_prefix("xformop:").unwrap_or(&lowered);
        match name {
            "translate" | "t" | "translation" => Some(Self::Translate),
            "rotate" | "r" | "rotatexyz" | "rotation" => Some(Self::Rotate),
            "scale" | "s" => Some(Self::Scale),
            "matrix" | "transform" | "m" => Some(Self::Matrix),
            _ => None,
        }
    }
}

impl fmt::Display for XformOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XformOpError {
    #[error("{kind} requires exactly 3 numbers")]
    ExpectedVec3 { kind: XformOpKind },
    #[error("matrix requires a 4x4 numeric array")]
    ExpectedMatrix,
}

impl XformOp {
    pub fn kind(&self) -> XformOpKind {
        match self {
            Self::Translate(_) => XformOpKind::Translate,
            Self::Rotate(_) => XformOpKind::Rotate,
            Self::Scale(_) => XformOpKind::Scale,
            Self::Matrix(_) => XformOpKind::Matrix,
        }
    }

    /// Builds an op from a kind and an untyped value, enforcing arity.
    pub fn from_value(kind: XformOpKind, value: &Value) -> Result<Self, XformOpError> {
        match kind {
            XformOpKind::Translate => vec3_from_value(value).map(Self::Translate),
            XformOpKind::Rotate => vec3_from_value(value).map(Self::Rotate),
            XformOpKind::Scale => vec3_from_value(value).map(Self::Scale),
            XformOpKind::Matrix => matrix_from_value(value).map(Self::Matrix),
        }
        .ok_or(match kind {
            XformOpKind::Matrix => XformOpError::ExpectedMatrix,
            kind => XformOpError::ExpectedVec3 { kind },
        })
    }

    pub fn matrix(&self) -> Matrix4 {
        match self {
            Self::Translate(v) => Matrix4::translation(*v),
            Self::Rotate(v) => Matrix4::rotation_xyz(*v),
            Self::Scale(v) => Matrix4::scale(*v),
            Self::Matrix(m) => *m,
        }
    }
}

pub fn vec3_from_value(value: &Value) -> Option<Vec3> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    Some([items[0].as_f64()?, items[1].as_f64()?, items[2].as_f64()?])
}

pub fn matrix_from_value(value: &Value) -> Option<Matrix4> {
    let rows = value.as_array()?;
    if rows.len() != 4 {
        return None;
    }
    let mut out = [[0.0; 4]; 4];
    for (r, row) in rows.iter().enumerate() {
        let cells = row.as_array()?;
        if cells.len() != 4 {
            return None;
        }
        for (c, cell) in cells.iter().enumerate() {
            out[r][c] = cell.as_f64()?;
        }
    }
    Some(Matrix4::from_rows(out))
}

/// Local transform of an op stack: the last listed op applies to points first.
pub fn local_matrix(ops: &[XformOp]) -> Matrix4 {
    ops.iter().rev().fold(Matrix4::identity(), |acc, op| acc.mul(&op.matrix()))
}

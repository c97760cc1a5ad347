// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Minimal 3-D math for transform composition and bounds.
//!
//! Matrices use the row-vector convention of scene-description stages: a point transforms as
//! `p · M`, translation lives in the last row, and `A · B` applies `A` first.

use serde::{Deserialize, Serialize};

pub type Vec3 = [f64; 3];

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix4 {
    rows: [[f64; 4]; 4],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4 {
    pub fn identity() -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { rows }
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.rows
    }

    pub fn translation(offset: Vec3) -> Self {
        let mut m = Self::identity();
        m.rows[3][0] = offset[0];
        m.rows[3][1] = offset[1];
        m.rows[3][2] = offset[2];
        m
    }

    pub fn scale(factors: Vec3) -> Self {
        let mut m = Self::identity();
        m.rows[0][0] = factors[0];
        m.rows[1][1] = factors[1];
        m.rows[2][2] = factors[2];
        m
    }

    pub fn rotation_x(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let mut m = Self::identity();
        m.rows[1][1] = c;
        m.rows[1][2] = s;
        m.rows[2][1] = -s;
        m.rows[2][2] = c;
        m
    }

    pub fn rotation_y(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let mut m = Self::identity();
        m.rows[0][0] = c;
        m.rows[0][2] = -s;
        m.rows[2][0] = s;
        m.rows[2][2] = c;
        m
    }

    pub fn rotation_z(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let mut m = Self::identity();
        m.rows[0][0] = c;
        m.rows[0][1] = s;
        m.rows[1][0] = -s;
        m.rows[1][1] = c;
        m
    }

    /// Rotation about X, then Y, then Z (angles in degrees).
    pub fn rotation_xyz(degrees: Vec3) -> Self {
        Self::rotation_x(degrees[0])
            .mul(&Self::rotation_y(degrees[1]))
            .mul(&Self::rotation_z(degrees[2]))
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.rows[r][k] * rhs.rows[k][c]).sum();
            }
        }
        Self { rows }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.rows;
        let mut out = [0.0; 3];
        for (c, slot) in out.iter_mut().enumerate() {
            *slot = p[0] * m[0][c] + p[1] * m[1][c] + p[2] * m[2][c] + m[3][c];
        }
        let w = p[0] * m[0][3] + p[1] * m[1][3] + p[2] * m[2][3] + m[3][3];
        if (w - 1.0).abs() > EPSILON && w.abs() > EPSILON {
            for slot in &mut out {
                *slot /= w;
            }
        }
        out
    }

    pub fn translation_part(&self) -> Vec3 {
        [self.rows[3][0], self.rows[3][1], self.rows[3][2]]
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::identity())
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        self.rows
            .iter()
            .flatten()
            .zip(other.rows.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= 1e-6)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox {
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            [lo[0], lo[1], lo[2]],
            [hi[0], lo[1], lo[2]],
            [lo[0], hi[1], lo[2]],
            [hi[0], hi[1], lo[2]],
            [lo[0], lo[1], hi[2]],
            [hi[0], lo[1], hi[2]],
            [lo[0], hi[1], hi[2]],
            [hi[0], hi[1], hi[2]],
        ]
    }

    /// Axis-aligned box enclosing all eight corners after `matrix`.
    pub fn transformed(&self, matrix: &Matrix4) -> Self {
        let corners = self.corners();
        let first = matrix.transform_point(corners[0]);
        let mut out = Self { min: first, max: first };
        for corner in &corners[1..] {
            let p = matrix.transform_point(*corner);
            out = out.union(&Self { min: p, max: p });
        }
        out
    }

    pub fn center(&self) -> Vec3 {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    pub fn is_centered_on_origin(&self) -> bool {
        self.center().iter().all(|c| c.abs() <= 1e-6)
    }
}

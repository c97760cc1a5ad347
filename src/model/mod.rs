// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Shared model types: node paths, session tokens, transform ops and the small amount of
//! 3-D math needed to compose them.

pub mod ids;
pub mod math;
pub mod node_path;
pub mod value;
pub mod xform;

pub use ids::{Id, IdError, SessionToken};
pub use math::{BBox, Matrix4, Vec3};
pub use node_path::{is_identifier, sanitize_identifier, NodePath, NodePathError};
pub use value::{Axis, Specifier, TimeCode};
pub use xform::{
    local_matrix, matrix_from_value, vec3_from_value, XformOp, XformOpError, XformOpKind,
};

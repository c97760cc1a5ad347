// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Serialize;
use serde_json::{json, Value};

use crate::engine::Document;
use crate::error::GatewayError;
use crate::model::{NodePath, Specifier, TimeCode};

pub const CAMERA_TYPE: &str = "Camera";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraReport {
    pub camera_path: NodePath,
    pub focal_length: Option<Value>,
    pub horizontal_aperture: Option<Value>,
    pub vertical_aperture: Option<Value>,
    pub clipping_range: Option<Value>,
    pub projection: Option<Value>,
}

/// Camera parameters to author; `None` leaves the attribute alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraParams {
    pub focal_length: Option<f64>,
    pub horizontal_aperture: Option<f64>,
    pub vertical_aperture: Option<f64>,
    pub clipping_range: Option<[f64; 2]>,
    pub projection: Option<String>,
}

impl CameraParams {
    fn attributes(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        if let Some(v) = self.focal_length {
            out.push(("focalLength", json!(v)));
        }
        if let Some(v) = self.horizontal_aperture {
            out.push(("horizontalAperture", json!(v)));
        }
        if let Some(v) = self.vertical_aperture {
            out.push(("verticalAperture", json!(v)));
        }
        if let Some(v) = self.clipping_range {
            out.push(("clippingRange", json!(v)));
        }
        if let Some(v) = &self.projection {
            out.push(("projection", json!(v)));
        }
        out
    }
}

fn is_camera(doc: &dyn Document, node: &NodePath) -> Result<bool, GatewayError> {
    Ok(doc.node_info(node)?.type_name.as_deref() == Some(CAMERA_TYPE))
}

pub fn list_cameras(doc: &dyn Document) -> Result<Vec<NodePath>, GatewayError> {
    let mut out = Vec::new();
    for node in doc.traverse()? {
        if is_camera(doc, &node)? {
            out.push(node);
        }
    }
    Ok(out)
}

pub fn get_camera(doc: &dyn Document, camera: &NodePath) -> Result<CameraReport, GatewayError> {
    if camera.is_root() || !doc.node_exists(camera) {
        return Err(GatewayError::node_not_found(camera).with_detail("camera_path", camera.as_str()));
    }
    if !is_camera(doc, camera)? {
        return Err(GatewayError::invalid_key("camera_path", format!("not a Camera: {camera}")));
    }
    let read = |name: &str| doc.attribute(camera, name, TimeCode::Default);
    Ok(CameraReport {
        camera_path: camera.clone(),
        focal_length: read("focalLength")?,
        horizontal_aperture: read("horizontalAperture")?,
        vertical_aperture: read("verticalAperture")?,
        clipping_range: read("clippingRange")?,
        projection: read("projection")?,
    })
}

/// Authors `params` on `camera`, defining the camera first when it does not exist.
pub fn set_camera(
    doc: &mut dyn Document,
    camera: &NodePath,
    params: &CameraParams,
) -> Result<CameraReport, GatewayError> {
    if camera.is_root() {
        return Err(GatewayError::invalid_key("camera_path", "camera_path must name a prim"));
    }
    if let Some([near, far]) = params.clipping_range {
        if !(near > 0.0 && far > near) {
            return Err(GatewayError::invalid_key(
                "params.clipping_range",
                "clipping_range must satisfy 0 < near < far",
            ));
        }
    }
    if !doc.node_exists(camera) {
        doc.define_node(camera, Some(CAMERA_TYPE), Specifier::Def)?;
    } else if !is_camera(doc, camera)? {
        return Err(GatewayError::invalid_key("camera_path", format!("not a Camera: {camera}")));
    }
    for (name, value) in params.attributes() {
        doc.set_attribute(camera, name, value, TimeCode::Default)?;
    }
    get_camera(doc, camera)
}

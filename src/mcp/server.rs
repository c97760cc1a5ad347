// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler};

use crate::config::GatewayConfig;
use crate::envelope::Envelope;
use crate::gateway::{Gateway, TOOLS};

use super::types::ToolArguments;

#[derive(Clone)]
pub struct StagehandMcp {
    gateway: Arc<Gateway>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl StagehandMcp {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway, tool_router: Self::tool_router() }
    }

    /// A server over the bundled JSON stage engine.
    pub fn with_config(config: GatewayConfig) -> Self {
        Self::new(Arc::new(Gateway::with_json_engine(config)))
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Runs the call on the blocking pool; stage I/O never stalls the async runtime.
    async fn dispatch(
        &self,
        tool: &'static str,
        args: ToolArguments,
    ) -> Result<Json<Envelope>, ErrorData> {
        let gateway = Arc::clone(&self.gateway);
        let envelope = tokio::task::spawn_blocking(move || gateway.call(tool, args.into_value()))
            .await
            .map_err(|err| {
                ErrorData::internal_error(format!("{tool} did not complete: {err}"), None)
            })?;
        Ok(Json(envelope))
    }

    /// Open a stage file as a session.
    #[tool(name = "open")]
    async fn open_stage(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("open_stage", args).await
    }

    /// Create a new stage as a session.
    #[tool(name = "create")]
    async fn create_stage(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("create_stage", args).await
    }

    /// Close a session without saving.
    #[tool(name = "close")]
    async fn close_stage(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("close_stage", args).await
    }

    /// List open sessions.
    #[tool(name = "listStages")]
    async fn list_open_stages(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_open_stages", args).await
    }

    /// Save a session in place or export it.
    #[tool(name = "save")]
    async fn save_stage(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("save_stage", args).await
    }

    /// Summarize a session's stage.
    #[tool(name = "stageSummary")]
    async fn get_stage_summary(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_stage_summary", args).await
    }

    /// List prims under a root.
    #[tool(name = "listPrims")]
    async fn list_prims(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_prims", args).await
    }

    /// Describe one prim.
    #[tool(name = "primInfo")]
    async fn get_prim_info(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_prim_info", args).await
    }

    /// Read an attribute.
    #[tool(name = "getAttr")]
    async fn get_attribute_value(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_attribute_value", args).await
    }

    /// Write an attribute.
    #[tool(name = "setAttr")]
    async fn set_attribute_value(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_attribute_value", args).await
    }

    /// Define a prim.
    #[tool(name = "createPrim")]
    async fn create_prim(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("create_prim", args).await
    }

    /// Remove a prim.
    #[tool(name = "deletePrim")]
    async fn delete_prim(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("delete_prim", args).await
    }

    /// Read a prim's transform.
    #[tool(name = "getXform")]
    async fn get_xform(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_xform", args).await
    }

    /// Apply transform ops or a matrix.
    #[tool(name = "setXform")]
    async fn set_xform(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_xform", args).await
    }

    /// World-space bounds of a prim.
    #[tool(name = "getBounds")]
    async fn get_bounds(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_bounds", args).await
    }

    /// List variant sets.
    #[tool(name = "listVariants")]
    async fn list_variants(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_variants", args).await
    }

    /// Switch a variant selection.
    #[tool(name = "setVariant")]
    async fn set_variant(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_variant", args).await
    }

    /// Author a variant set of references.
    #[tool(name = "authorVariants")]
    async fn author_variants(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("author_variants", args).await
    }

    /// Summarize a stage file.
    #[tool(name = "summarizeFile")]
    async fn summarize_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("summarize_file", args).await
    }

    /// List prims in a stage file.
    #[tool(name = "listPrimsFile")]
    async fn list_prims_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_prims_in_file", args).await
    }

    /// Describe one prim in a stage file.
    #[tool(name = "primInfoFile")]
    async fn get_prim_info_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_prim_info_in_file", args).await
    }

    /// Read an attribute from a stage file.
    #[tool(name = "getAttrFile")]
    async fn get_attribute_value_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_attribute_value_in_file", args).await
    }

    /// Write an attribute in a stage file.
    #[tool(name = "setAttrFile")]
    async fn set_attribute_value_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_attribute_value_in_file", args).await
    }

    /// Write several attributes with one save.
    #[tool(name = "setAttrsFile")]
    async fn batch_set_attributes_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("batch_set_attributes_in_file", args).await
    }

    /// Define a prim, creating the file if needed.
    #[tool(name = "createPrimFile")]
    async fn create_prim_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("create_prim_in_file", args).await
    }

    /// Remove a prim from a stage file.
    #[tool(name = "deletePrimFile")]
    async fn delete_prim_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("delete_prim_in_file", args).await
    }

    /// Read a prim's transform from a stage file.
    #[tool(name = "getXformFile")]
    async fn get_xform_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_xform_in_file", args).await
    }

    /// Apply transform ops or a matrix in a stage file.
    #[tool(name = "setXformFile")]
    async fn set_xform_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_xform_in_file", args).await
    }

    /// World-space bounds of a prim in a stage file.
    #[tool(name = "getBoundsFile")]
    async fn get_bounds_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_bounds_in_file", args).await
    }

    /// List variant sets in a stage file.
    #[tool(name = "listVariantsFile")]
    async fn list_variants_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_variants_in_file", args).await
    }

    /// Switch a variant selection in a stage file.
    #[tool(name = "setVariantFile")]
    async fn set_variant_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_variant_in_file", args).await
    }

    /// Author a variant set of references in a stage file.
    #[tool(name = "authorVariantsFile")]
    async fn author_variants_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("author_variants_in_file", args).await
    }

    /// List materials.
    #[tool(name = "listMaterialsFile")]
    async fn list_materials_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_materials_in_file", args).await
    }

    /// Bind a material to a prim.
    #[tool(name = "bindMaterialFile")]
    async fn bind_material_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("bind_material_in_file", args).await
    }

    /// Clear a prim's material binding.
    #[tool(name = "unbindMaterialFile")]
    async fn unbind_material_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("unbind_material_in_file", args).await
    }

    /// Resolve a prim's bound material.
    #[tool(name = "getMaterialBindingFile")]
    async fn get_material_binding_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_material_binding_in_file", args).await
    }

    /// List cameras.
    #[tool(name = "listCamerasFile")]
    async fn list_cameras_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("list_cameras_in_file", args).await
    }

    /// Read camera parameters.
    #[tool(name = "getCameraFile")]
    async fn get_camera_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("get_camera_in_file", args).await
    }

    /// Author camera parameters.
    #[tool(name = "setCameraFile")]
    async fn set_camera_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_camera_in_file", args).await
    }

    /// Export a stage file's root layer, or a flattened copy.
    #[tool(name = "exportUsdFile")]
    async fn export_usd_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("export_usd_file", args).await
    }

    /// Package a stage file and the layers it references into one archive.
    #[tool(name = "exportUsdzFile")]
    async fn export_usdz_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("export_usdz_file", args).await
    }

    /// Report authoring problems.
    #[tool(name = "validateStageFile")]
    async fn validate_stage_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("validate_stage_file", args).await
    }

    /// Add several references with one save.
    #[tool(name = "addReferencesBatchInFile")]
    async fn add_references_batch_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("add_references_batch_in_file", args).await
    }

    /// Set the default prim.
    #[tool(name = "setDefaultPrimFile")]
    async fn set_default_prim_in_file(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("set_default_prim_in_file", args).await
    }

    /// Reference several assets under one container stage.
    #[tool(name = "composeReferencedAssembly")]
    async fn compose_referenced_assembly(
        &self,
        Parameters(args): Parameters<ToolArguments>,
    ) -> Result<Json<Envelope>, ErrorData> {
        self.dispatch("compose_referenced_assembly", args).await
    }
}

#[tool_handler]
impl ServerHandler for StagehandMcp {
    fn get_info(&self) -> ServerInfo {
        let names: Vec<&str> =
            TOOLS.iter().filter_map(|spec| spec.aliases.first().copied()).collect();
        ServerInfo {
            instructions: Some(format!(
                "Stagehand scene-stage gateway. Every tool answers {{ok, result}} or \
                 {{ok: false, error: {{code, message, details}}}}. Session tools take a stage_id \
                 from `open`/`create`; *File tools take a stage `path`. Tools: {}",
                names.join(", ")
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests;

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tool table and dispatcher.
//!
//! [`Gateway::call`] is the single entry point: it resolves a tool name (canonical, camelCase or
//! short alias), coerces the raw arguments, runs the operation against a session or a transient
//! file handle, and always answers with an [`Envelope`]. A panic inside an operation is caught
//! here and reported as `internal_error`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};

use crate::coerce::{coerce, ArgBag};
use crate::config::GatewayConfig;
use crate::engine::{CreateOptions, Document, Engine, JsonStageEngine};
use crate::envelope::Envelope;
use crate::error::GatewayError;
use crate::model::NodePath;
use crate::ops::{
    self, cameras, materials, variants, xform, AssemblyRequest, AssetRequest, AttributeUpdate,
    CameraParams, ReferenceUpdate, TransformRequest, VariantRequest, DEFAULT_LIST_DEPTH,
};
use crate::paths::PathResolver;
use crate::session::{Access, OpenMode, SessionRegistry};
use crate::stateless::{run_stateless, OpenPolicy, SaveMode};

use Addressing::{File, Session};
use Operation as Op;

/// How a tool finds its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// `stage_id` of an open session.
    Session,
    /// `path` of a stage file, opened for this call only.
    File,
    /// Registry-level or self-contained tools.
    None,
}

/// The operation behind a tool; session and file variants share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    OpenStage,
    CreateStage,
    CloseStage,
    ListStages,
    SaveStage,
    Summary,
    ListPrims,
    PrimInfo,
    GetAttribute,
    SetAttribute,
    BatchSetAttributes,
    CreatePrim,
    DeletePrim,
    GetXform,
    SetXform,
    GetBounds,
    ListVariants,
    SetVariant,
    AuthorVariants,
    ListMaterials,
    BindMaterial,
    UnbindMaterial,
    MaterialBinding,
    ListCameras,
    GetCamera,
    SetCamera,
    Export,
    ExportPackage,
    Validate,
    AddReferences,
    SetDefaultPrim,
    ComposeAssembly,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Canonical snake_case name.
    pub name: &'static str,
    /// Short names; the first one is the alphanumeric name exposed over MCP.
    pub aliases: &'static [&'static str],
    pub operation: Operation,
    pub addressing: Addressing,
    pub description: &'static str,
}

const fn tool(
    name: &'static str,
    aliases: &'static [&'static str],
    operation: Operation,
    addressing: Addressing,
    description: &'static str,
) -> ToolSpec {
    ToolSpec { name, aliases, operation, addressing, description }
}

pub const TOOLS: &[ToolSpec] = &[
    tool("open_stage", &["open"], Op::OpenStage, Addressing::None, "Open a stage file as a session."),
    tool("create_stage", &["create"], Op::CreateStage, Addressing::None, "Create a new stage as a session."),
    tool("close_stage", &["close"], Op::CloseStage, Session, "Close a session without saving."),
    tool("list_open_stages", &["listStages"], Op::ListStages, Addressing::None, "List open sessions."),
    tool("save_stage", &["save"], Op::SaveStage, Session, "Save a session in place or export it."),
    tool("get_stage_summary", &["stageSummary"], Op::Summary, Session, "Summarize a session's stage."),
    tool("list_prims", &["listPrims"], Op::ListPrims, Session, "List prims under a root."),
    tool("get_prim_info", &["primInfo"], Op::PrimInfo, Session, "Describe one prim."),
    tool("get_attribute_value", &["getAttr"], Op::GetAttribute, Session, "Read an attribute."),
    tool("set_attribute_value", &["setAttr"], Op::SetAttribute, Session, "Write an attribute."),
    tool("create_prim", &["createPrim"], Op::CreatePrim, Session, "Define a prim."),
    tool("delete_prim", &["deletePrim"], Op::DeletePrim, Session, "Remove a prim."),
    tool("get_xform", &["getXform"], Op::GetXform, Session, "Read a prim's transform."),
    tool("set_xform", &["setXform"], Op::SetXform, Session, "Apply transform ops or a matrix."),
    tool("get_bounds", &["getBounds"], Op::GetBounds, Session, "World-space bounds of a prim."),
    tool("list_variants", &["listVariants"], Op::ListVariants, Session, "List variant sets."),
    tool("set_variant", &["setVariant"], Op::SetVariant, Session, "Switch a variant selection."),
    tool("author_variants", &["authorVariants"], Op::AuthorVariants, Session, "Author a variant set of references."),
    tool("summarize_file", &["summarizeFile"], Op::Summary, File, "Summarize a stage file."),
    tool("list_prims_in_file", &["listPrimsFile"], Op::ListPrims, File, "List prims in a stage file."),
    tool("get_prim_info_in_file", &["primInfoFile"], Op::PrimInfo, File, "Describe one prim in a stage file."),
    tool("get_attribute_value_in_file", &["getAttrFile"], Op::GetAttribute, File, "Read an attribute from a stage file."),
    tool("set_attribute_value_in_file", &["setAttrFile"], Op::SetAttribute, File, "Write an attribute in a stage file."),
    tool(
        "batch_set_attributes_in_file",
        &["setAttrsFile", "batchSetAttrsFile"],
        Op::BatchSetAttributes,
        File,
        "Write several attributes with one save.",
    ),
    tool("create_prim_in_file", &["createPrimFile"], Op::CreatePrim, File, "Define a prim, creating the file if needed."),
    tool("delete_prim_in_file", &["deletePrimFile"], Op::DeletePrim, File, "Remove a prim from a stage file."),
    tool("get_xform_in_file", &["getXformFile"], Op::GetXform, File, "Read a prim's transform from a stage file."),
    tool("set_xform_in_file", &["setXformFile"], Op::SetXform, File, "Apply transform ops or a matrix in a stage file."),
    tool("get_bounds_in_file", &["getBoundsFile"], Op::GetBounds, File, "World-space bounds of a prim in a stage file."),
    tool("list_variants_in_file", &["listVariantsFile"], Op::ListVariants, File, "List variant sets in a stage file."),
    tool("set_variant_in_file", &["setVariantFile"], Op::SetVariant, File, "Switch a variant selection in a stage file."),
    tool(
        "author_variants_in_file",
        &["authorVariantsFile"],
        Op::AuthorVariants,
        File,
        "Author a variant set of references in a stage file.",
    ),
    tool("list_materials_in_file", &["listMaterialsFile"], Op::ListMaterials, File, "List materials."),
    tool("bind_material_in_file", &["bindMaterialFile"], Op::BindMaterial, File, "Bind a material to a prim."),
    tool("unbind_material_in_file", &["unbindMaterialFile"], Op::UnbindMaterial, File, "Clear a prim's material binding."),
    tool(
        "get_material_binding_in_file",
        &["getMaterialBindingFile"],
        Op::MaterialBinding,
        File,
        "Resolve a prim's bound material.",
    ),
    tool("list_cameras_in_file", &["listCamerasFile"], Op::ListCameras, File, "List cameras."),
    tool("get_camera_in_file", &["getCameraFile"], Op::GetCamera, File, "Read camera parameters."),
    tool("set_camera_in_file", &["setCameraFile"], Op::SetCamera, File, "Author camera parameters."),
    tool("export_usd_file", &["exportUsdFile"], Op::Export, File, "Export a stage file's root layer, or a flattened copy."),
    tool(
        "export_usdz_file",
        &["exportUsdzFile"],
        Op::ExportPackage,
        File,
        "Package a stage file and the layers it references into one archive.",
    ),
    tool("validate_stage_file", &["validateStageFile"], Op::Validate, File, "Report authoring problems."),
    tool(
        "add_references_batch_in_file",
        &["addReferencesBatchInFile"],
        Op::AddReferences,
        File,
        "Add several references with one save.",
    ),
    tool("set_default_prim_in_file", &["setDefaultPrimFile"], Op::SetDefaultPrim, File, "Set the default prim."),
    tool(
        "compose_referenced_assembly",
        &["composeReferencedAssembly"],
        Op::ComposeAssembly,
        Addressing::None,
        "Reference several assets under one container stage.",
    ),
];

fn fingerprint(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, '_' | '-' | '.' | ' ')).flat_map(char::to_lowercase).collect()
}

/// Looks a tool up by canonical name, short alias, or any case/underscore variant of either.
pub fn resolve_tool(raw: &str) -> Option<&'static ToolSpec> {
    let raw = raw.trim();
    if let Some(spec) = TOOLS.iter().find(|spec| spec.name == raw || spec.aliases.contains(&raw)) {
        return Some(spec);
    }
    let fp = fingerprint(raw);
    TOOLS.iter().find(|spec| {
        fingerprint(spec.name) == fp || spec.aliases.iter().any(|alias| fingerprint(alias) == fp)
    })
}

fn to_result<T: Serialize>(value: T) -> Result<Value, GatewayError> {
    serde_json::to_value(value)
        .map_err(|err| GatewayError::internal(format!("encode result: {err}")))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_owned()
    }
}

/// Owns the engine, the session registry and the path policy for one tool surface.
pub struct Gateway {
    engine: Option<Arc<dyn Engine>>,
    sessions: SessionRegistry,
    resolver: PathResolver,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(engine: Arc<dyn Engine>, config: GatewayConfig) -> Self {
        Self::build(Some(engine), config)
    }

    /// A gateway over the bundled JSON stage engine.
    pub fn with_json_engine(config: GatewayConfig) -> Self {
        let engine = JsonStageEngine::from_config(&config);
        Self::build(Some(Arc::new(engine)), config)
    }

    /// A gateway whose host has no scene engine; stage tools fail `missing_engine`.
    pub fn without_engine(config: GatewayConfig) -> Self {
        Self::build(None, config)
    }

    fn build(engine: Option<Arc<dyn Engine>>, config: GatewayConfig) -> Self {
        let mut resolver = PathResolver::new();
        if let Some(base_dir) = &config.base_dir {
            resolver = resolver.with_base_dir(base_dir);
        }
        Self { engine, sessions: SessionRegistry::new(), resolver, config }
    }

    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Runs one tool call. Never panics and never returns anything but an envelope.
    pub fn call(&self, tool: &str, args: Value) -> Envelope {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(tool, args)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(tool, panic = %message, "tool call panicked");
                Err(GatewayError::internal(format!("operation panicked: {message}")))
            });
        tracing::debug!(
            tool,
            ok = outcome.is_ok(),
            code = outcome.as_ref().err().map(GatewayError::code),
            elapsed_us = started.elapsed().as_micros() as u64,
            "tool call"
        );
        Envelope::from(outcome)
    }

    fn dispatch(&self, tool: &str, raw: Value) -> Result<Value, GatewayError> {
        let spec = resolve_tool(tool).ok_or_else(|| {
            GatewayError::invalid_params(format!("unknown tool: {tool}")).with_detail("tool", tool)
        })?;
        let bag = coerce(spec.name, raw)?;
        let call = Call { gateway: self, spec, bag: &bag };
        call.run()
    }

    fn engine(&self) -> Result<&dyn Engine, GatewayError> {
        self.engine.as_deref().ok_or(GatewayError::MissingEngine)
    }

    fn resolve_path(&self, key: &str, raw: &str) -> Result<PathBuf, GatewayError> {
        self.resolver
            .resolve(raw)
            .map_err(|err| GatewayError::from(err).with_detail("key", key))
    }

    /// Reference targets stay relative to the referencing stage unless they carry an
    /// absolute path, `~` or an environment variable.
    fn asset_reference(&self, key: &str, raw: &str) -> Result<String, GatewayError> {
        let raw = raw.trim();
        if raw.starts_with('~') || raw.contains('$') || Path::new(raw).is_absolute() {
            Ok(self.resolve_path(key, raw)?.display().to_string())
        } else {
            Ok(raw.to_owned())
        }
    }
}

/// One dispatched call: the resolved tool and its canonical arguments.
struct Call<'a> {
    gateway: &'a Gateway,
    spec: &'static ToolSpec,
    bag: &'a ArgBag,
}

impl Call<'_> {
    fn path(&self, key: &str) -> Result<PathBuf, GatewayError> {
        self.gateway.resolve_path(key, self.bag.require_str(key)?)
    }

    fn opt_path(&self, key: &str) -> Result<Option<PathBuf>, GatewayError> {
        self.bag.opt_str(key)?.map(|raw| self.gateway.resolve_path(key, raw)).transpose()
    }

    fn prim_path(&self) -> Result<NodePath, GatewayError> {
        self.bag.require_node_path("prim_path")
    }

    fn create_options(&self) -> Result<CreateOptions, GatewayError> {
        Ok(CreateOptions {
            up_axis: self.bag.up_axis(),
            meters_per_unit: self.bag.opt_f64("meters_per_unit")?,
        })
    }

    /// Runs a read-only operation on the addressed document.
    fn read<R: Serialize>(
        &self,
        f: impl FnOnce(&dyn Document) -> Result<R, GatewayError>,
    ) -> Result<Value, GatewayError> {
        match self.spec.addressing {
            Addressing::Session => {
                let token = self.bag.require_str("stage_id")?;
                to_result(self.gateway.sessions.with_session(token, Access::Read, |doc| f(doc))?)
            }
            _ => {
                let path = self.path("path")?;
                let engine = self.gateway.engine()?;
                let out = run_stateless(engine, &path, OpenPolicy::Existing, SaveMode::Discard, |doc| {
                    f(doc)
                })?;
                to_result(out)
            }
        }
    }

    /// Runs a mutating operation. File-addressed calls save per `save`/`output_path` and
    /// report where the result was written.
    fn write<R: Serialize>(
        &self,
        create_semantic: bool,
        f: impl FnOnce(&mut dyn Document) -> Result<R, GatewayError>,
    ) -> Result<Value, GatewayError> {
        match self.spec.addressing {
            Addressing::Session => {
                let token = self.bag.require_str("stage_id")?;
                to_result(self.gateway.sessions.with_session(token, Access::Mutate, f)?)
            }
            _ => {
                let path = self.path("path")?;
                let output = self.opt_path("output_path")?;
                let open = if create_semantic {
                    OpenPolicy::OpenOrCreate(self.create_options()?)
                } else {
                    OpenPolicy::Existing
                };
                let save = SaveMode::from_request(
                    self.bag.opt_flag("save"),
                    output,
                    self.gateway.config.save_by_default,
                );
                let engine = self.gateway.engine()?;
                let out = run_stateless(engine, &path, open, save.clone(), f)?;

                let mut value = to_result(out)?;
                let written = match &save {
                    SaveMode::Discard => None,
                    SaveMode::InPlace => Some(path.display().to_string()),
                    SaveMode::To(output) => Some(output.display().to_string()),
                };
                if let Value::Object(map) = &mut value {
                    map.insert("saved".to_owned(), Value::Bool(written.is_some()));
                    map.insert("output_path".to_owned(), json!(written));
                }
                Ok(value)
            }
        }
    }

    fn run(&self) -> Result<Value, GatewayError> {
        let bag = self.bag;
        match self.spec.operation {
            Op::OpenStage => self.open_session(OpenMode::Existing),
            Op::CreateStage => self.open_session(OpenMode::Create(self.create_options()?)),
            Op::CloseStage => {
                let summary = self.gateway.sessions.close(bag.require_str("stage_id")?)?;
                let mut value = to_result(summary)?;
                if let Value::Object(map) = &mut value {
                    map.insert("closed".to_owned(), Value::Bool(true));
                }
                Ok(value)
            }
            Op::ListStages => Ok(json!({ "stages": self.gateway.sessions.list() })),
            Op::SaveStage => self.save_session(),
            Op::Summary => self.read(|doc| Ok(doc.summary()?)),
            Op::ListPrims => {
                let root = bag.opt_node_path("root")?.unwrap_or_else(NodePath::root);
                let depth = bag.depth().unwrap_or(DEFAULT_LIST_DEPTH);
                let type_filter = bag.opt_str("type_filter")?;
                self.read(|doc| {
                    let prims = ops::list_prims(doc, &root, depth, type_filter)?;
                    Ok(json!({ "root": root, "depth": depth, "prims": prims }))
                })
            }
            Op::PrimInfo => {
                let node = self.prim_path()?;
                self.read(|doc| {
                    if node.is_root() || !doc.node_exists(&node) {
                        return Err(GatewayError::node_not_found(&node));
                    }
                    Ok(doc.node_info(&node)?)
                })
            }
            Op::GetAttribute => {
                let node = self.prim_path()?;
                let attr = bag.require_str("attr")?;
                let time = bag.time();
                self.read(|doc| ops::get_attribute(doc, &node, attr, time))
            }
            Op::SetAttribute => {
                let node = self.prim_path()?;
                let attr = bag.require_str("attr")?;
                let value = bag.require("value")?.clone();
                let time = bag.time();
                self.write(false, |doc| ops::set_attribute(doc, &node, attr, value, time))
            }
            Op::BatchSetAttributes => {
                bag.require("items")?;
                let items: Vec<_> = bag
                    .records("items")
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.attribute_update(index, item))
                    .collect();
                self.write(false, |doc| Ok(ops::batch_set_attributes(doc, items)))
            }
            Op::CreatePrim => {
                let node = self.prim_path()?;
                let type_name = bag.opt_str("type_name")?;
                let specifier = bag.specifier()?;
                self.write(true, |doc| ops::create_prim(doc, &node, type_name, specifier))
            }
            Op::DeletePrim => {
                let node = self.prim_path()?;
                self.write(false, |doc| ops::delete_prim(doc, &node))
            }
            Op::GetXform => {
                let node = self.prim_path()?;
                self.read(|doc| xform::get_xform(doc, &node))
            }
            Op::SetXform => {
                let node = self.prim_path()?;
                let request = self.transform_request()?;
                self.write(false, |doc| xform::apply_transform(doc, &node, request))
            }
            Op::GetBounds => {
                let node = bag.opt_node_path("prim_path")?.unwrap_or_else(NodePath::root);
                let time = bag.time();
                let fallback = self.gateway.config.bounds_fallback;
                self.read(|doc| ops::compute_bounds(doc, &node, time, fallback))
            }
            Op::ListVariants => {
                let node = self.prim_path()?;
                self.read(|doc| variants::list_variants(doc, &node))
            }
            Op::SetVariant => {
                let node = self.prim_path()?;
                let set_name = bag.require_str("set_name")?;
                let selection = bag.require_str("selection")?;
                self.write(false, |doc| variants::set_variant(doc, &node, set_name, selection))
            }
            Op::AuthorVariants => {
                let node = self.prim_path()?;
                let set_name = bag.require_str("set_name")?;
                let requests = self.variant_requests()?;
                let select = bag.opt_str("select")?;
                self.write(false, |doc| {
                    ops::author_variants(doc, &node, set_name, &requests, select)
                })
            }
            Op::ListMaterials => {
                self.read(|doc| Ok(json!({ "materials": materials::list_materials(doc)? })))
            }
            Op::BindMaterial => {
                let node = self.prim_path()?;
                let material = bag.require_node_path("material_path")?;
                self.write(false, |doc| {
                    materials::bind_material(doc, &node, &material)?;
                    materials::material_binding(doc, &node)
                })
            }
            Op::UnbindMaterial => {
                let node = self.prim_path()?;
                self.write(false, |doc| {
                    materials::unbind_material(doc, &node)?;
                    materials::material_binding(doc, &node)
                })
            }
            Op::MaterialBinding => {
                let node = self.prim_path()?;
                self.read(|doc| materials::material_binding(doc, &node))
            }
            Op::ListCameras => {
                self.read(|doc| Ok(json!({ "cameras": cameras::list_cameras(doc)? })))
            }
            Op::GetCamera => {
                let camera = bag.node_path_any(&["camera_path", "prim_path"])?;
                self.read(|doc| cameras::get_camera(doc, &camera))
            }
            Op::SetCamera => {
                let camera = bag.node_path_any(&["camera_path", "prim_path"])?;
                let params = self.camera_params()?;
                self.write(false, |doc| cameras::set_camera(doc, &camera, &params))
            }
            Op::Export => {
                let output = self.path("output_path")?;
                let flatten = bag.flag("flatten", false);
                let skip_if_exists = bag.flag("skip_if_exists", false);
                self.read(|doc| ops::export(doc, &output, flatten, skip_if_exists))
            }
            Op::ExportPackage => {
                let output = self.path("output_path")?;
                let skip_if_exists = bag.flag("skip_if_exists", false);
                self.read(|doc| ops::export_package(doc, &output, skip_if_exists))
            }
            Op::Validate => self.read(ops::validate),
            Op::AddReferences => {
                bag.require("items")?;
                let items: Vec<_> = bag
                    .records("items")
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.reference_update(index, item))
                    .collect();
                self.write(false, |doc| Ok(ops::add_references(doc, items)))
            }
            Op::SetDefaultPrim => {
                let node = self.prim_path()?;
                self.write(false, |doc| {
                    let prim_path = ops::set_default_prim(doc, &node)?;
                    Ok(json!({ "default_prim": prim_path }))
                })
            }
            Op::ComposeAssembly => {
                let request = self.assembly_request()?;
                let engine = self.gateway.engine()?;
                to_result(ops::compose_assembly(engine, &request)?)
            }
        }
    }

    fn open_session(&self, mode: OpenMode) -> Result<Value, GatewayError> {
        let path = self.path("path")?;
        let engine = self.gateway.engine()?;
        let token = self.gateway.sessions.open(engine, &path, mode)?;
        let created = matches!(mode, OpenMode::Create(_));
        Ok(json!({ "stage_id": token, "path": path, "created": created }))
    }

    /// In place unless `output_path` is given; an export leaves the session dirty.
    fn save_session(&self) -> Result<Value, GatewayError> {
        let token = self.bag.require_str("stage_id")?;
        let sessions = &self.gateway.sessions;
        match self.opt_path("output_path")? {
            Some(output) => {
                let flatten = self.bag.flag("flatten", false);
                sessions.with_session(token, Access::Read, |doc| {
                    doc.export(&output, flatten)
                        .map_err(|err| GatewayError::export_failed(&output, &err))
                })?;
                tracing::info!(stage_id = token, output = %output.display(), flatten, "session exported");
                Ok(json!({
                    "stage_id": token,
                    "output_path": output,
                    "flattened": flatten,
                    "in_place": false,
                }))
            }
            None => {
                let path = sessions.with_session(token, Access::Save, |doc| {
                    let path = doc.identifier().to_path_buf();
                    doc.save().map_err(|err| GatewayError::save_failed(&path, &err))?;
                    Ok(path)
                })?;
                tracing::info!(stage_id = token, path = %path.display(), "session saved");
                Ok(json!({
                    "stage_id": token,
                    "output_path": path,
                    "flattened": false,
                    "in_place": true,
                }))
            }
        }
    }

    fn transform_request(&self) -> Result<TransformRequest, GatewayError> {
        match (self.bag.ops()?, self.bag.matrix()) {
            (Some(_), Some(_)) => Err(GatewayError::invalid_key(
                "matrix",
                "pass either ops or matrix, not both",
            )),
            (Some(ops), None) => Ok(TransformRequest::Ops(ops)),
            (None, Some(matrix)) => Ok(TransformRequest::Matrix(matrix)),
            (None, None) => Err(GatewayError::missing_key("ops")),
        }
    }

    fn attribute_update(
        &self,
        index: usize,
        item: &ArgBag,
    ) -> Result<AttributeUpdate, GatewayError> {
        let parsed = (|| -> Result<AttributeUpdate, GatewayError> {
            Ok(AttributeUpdate {
                prim_path: item.require_node_path("prim_path")?,
                attr: item.require_str("attr")?.to_owned(),
                value: item.require("value")?.clone(),
                time: if item.contains("time") { item.time() } else { self.bag.time() },
            })
        })();
        parsed.map_err(|err| err.with_detail("index", index))
    }

    fn reference_update(
        &self,
        index: usize,
        item: &ArgBag,
    ) -> Result<ReferenceUpdate, GatewayError> {
        let parsed = (|| -> Result<ReferenceUpdate, GatewayError> {
            let key = format!("items[{index}].asset_path");
            Ok(ReferenceUpdate {
                prim_path: item.require_node_path("prim_path")?,
                asset_path: self.gateway.asset_reference(&key, item.require_str("asset_path")?)?,
                internal_path: item.internal_path()?,
            })
        })();
        parsed.map_err(|err| err.with_detail("index", index))
    }

    fn variant_requests(&self) -> Result<Vec<VariantRequest>, GatewayError> {
        self.bag.require("variants")?;
        self.bag
            .records("variants")
            .iter()
            .enumerate()
            .map(|(index, item)| -> Result<VariantRequest, GatewayError> {
                let key = format!("variants[{index}].asset_reference");
                Ok(VariantRequest {
                    name: item.require_str("name")?.to_owned(),
                    asset_reference: self
                        .gateway
                        .asset_reference(&key, item.require_str("asset_reference")?)?,
                    internal_path: item.internal_path()?,
                    transform: item.ops_at("transform")?,
                })
            })
            .collect()
    }

    /// Camera parameters from `params`, falling back to top-level keys.
    fn camera_params(&self) -> Result<CameraParams, GatewayError> {
        let nested = self.bag.nested("params");
        let pick = |key: &str| if nested.contains(key) { &nested } else { self.bag };
        let number = |key: &str| pick(key).opt_f64(key);

        let clipping_range = match pick("clipping_range").get("clipping_range") {
            None => None,
            Some(value) => {
                let pair = value
                    .as_array()
                    .filter(|items| items.len() == 2)
                    .and_then(|items| Some([items[0].as_f64()?, items[1].as_f64()?]))
                    .ok_or_else(|| {
                        GatewayError::invalid_key(
                            "params.clipping_range",
                            "clipping_range requires [near, far]",
                        )
                    })?;
                Some(pair)
            }
        };
        Ok(CameraParams {
            focal_length: number("focal_length")?,
            horizontal_aperture: number("horizontal_aperture")?,
            vertical_aperture: number("vertical_aperture")?,
            clipping_range,
            projection: pick("projection").opt_str("projection")?.map(str::to_owned),
        })
    }

    fn assembly_request(&self) -> Result<AssemblyRequest, GatewayError> {
        let bag = self.bag;
        let config = &self.gateway.config;
        let output_path = self.path("output_path")?;
        bag.require("assets")?;
        let assets = bag
            .records("assets")
            .iter()
            .enumerate()
            .map(|(index, item)| -> Result<AssetRequest, GatewayError> {
                let key = format!("assets[{index}].asset_path");
                Ok(AssetRequest {
                    asset_path: self
                        .gateway
                        .resolve_path(&key, item.require_str("asset_path")?)?,
                    name: item.opt_str("name")?.map(str::to_owned),
                    internal_path: item.internal_path()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut request = AssemblyRequest::new(output_path, assets);
        request.container_root = bag.opt_node_path("container_root")?;
        request.flatten = bag.flag("flatten", config.assembly_flatten);
        request.up_axis = bag.up_axis().unwrap_or(config.assembly_up_axis);
        request.set_default_prim = bag.flag("set_default_prim", true);
        request.clear_existing = bag.flag("clear_existing", false);
        request.skip_if_exists = bag.flag("skip_if_exists", true);
        Ok(request)
    }
}

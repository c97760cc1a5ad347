// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One-shot, file-addressed operations: open, run, optionally save, release.
//!
//! Nothing here is shared between calls. Two concurrent calls on one file each get their own
//! handle and the later save wins; callers that need atomicity across calls use a session.

use std::path::{Path, PathBuf};

use crate::engine::{CreateOptions, Document, Engine};
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenPolicy {
    /// The file must exist.
    Existing,
    /// Create-semantic operations: a missing file starts as a new, empty stage.
    OpenOrCreate(CreateOptions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
    Discard,
    InPlace,
    To(PathBuf),
}

impl SaveMode {
    /// `save` defaults to `default` (true for mutating operations); `output_path` redirects it.
    pub fn from_request(save: Option<bool>, output: Option<PathBuf>, default: bool) -> Self {
        match (save.unwrap_or(default), output) {
            (false, _) => Self::Discard,
            (true, Some(output)) => Self::To(output),
            (true, None) => Self::InPlace,
        }
    }
}

/// A document handle scoped to one call; released on drop whatever the outcome.
struct TransientDocument {
    document: Box<dyn Document>,
}

impl Drop for TransientDocument {
    fn drop(&mut self) {
        tracing::trace!(path = %self.document.identifier().display(), "transient stage released");
    }
}

/// Runs `f` against a transient handle for `path`, saving per `save` only if `f` succeeds.
pub fn run_stateless<R>(
    engine: &dyn Engine,
    path: &Path,
    open: OpenPolicy,
    save: SaveMode,
    f: impl FnOnce(&mut dyn Document) -> Result<R, GatewayError>,
) -> Result<R, GatewayError> {
    let document = match open {
        OpenPolicy::OpenOrCreate(options) if !engine.exists(path) => engine.create(path, options),
        _ => engine.open(path),
    }
    .map_err(|err| GatewayError::open_failed(path, &err))?;
    let mut handle = TransientDocument { document };

    let out = f(handle.document.as_mut())?;

    match save {
        SaveMode::Discard => {}
        SaveMode::InPlace => {
            handle.document.save().map_err(|err| GatewayError::save_failed(path, &err))?;
        }
        SaveMode::To(output) => {
            handle
                .document
                .export(&output, false)
                .map_err(|err| GatewayError::save_failed(&output, &err))?;
        }
    }
    Ok(out)
}

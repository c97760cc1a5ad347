// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

use super::{LayerFile, LAYER_VERSION};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteDurability {
    /// Writes a temp file and renames it into place; no fsync.
    #[default]
    Fast,

    /// Additionally flushes the file and its directory to stable storage where the platform
    /// allows it.
    Durable,
}

pub(super) fn read_layer(path: &Path) -> Result<LayerFile, EngineError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(EngineError::FileNotFound { path: path.to_path_buf() })
        }
        Err(source) => return Err(EngineError::Io { path: path.to_path_buf(), source }),
    };
    let layer: LayerFile = serde_json::from_slice(&raw).map_err(|err| EngineError::Malformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if layer.version != LAYER_VERSION {
        return Err(EngineError::Malformed {
            path: path.to_path_buf(),
            message: format!("unsupported layer version {}", layer.version),
        });
    }
    Ok(layer)
}

pub(super) fn write_layer(
    path: &Path,
    layer: &LayerFile,
    durability: WriteDurability,
) -> Result<(), EngineError> {
    let mut contents = serde_json::to_vec_pretty(layer).map_err(|err| EngineError::Malformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    contents.push(b'\n');
    write_atomic(path, &contents, durability)
        .map_err(|source| EngineError::Io { path: path.to_path_buf(), source })
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

/// Temp file in the target directory, then rename over the destination.
pub(super) fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| io::Error::other("path has no parent"))?;
    let file_name = path.file_name().ok_or_else(|| io::Error::other("path has no file name"))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
    }

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path = parent.join(format!(".stagehand.tmp.{}.{nanos}", file_name.to_string_lossy()));

    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(&tmp_path)?;
    let written = file.write_all(contents).and_then(|()| {
        if durability == WriteDurability::Durable {
            file.sync_all()
        } else {
            Ok(())
        }
    });
    drop(file);
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(err) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            fs::File::open(parent)?.sync_all()?;
        }
    }
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Single-file packages: an uncompressed zip whose first entry is the stage's root layer,
//! followed by every layer it references. Entries sit side by side at the archive root and
//! their references are relinked to the entry names. Data is 64-byte aligned so readers can
//! map entries in place.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::engine::{EngineError, Reference};
use crate::paths::normalize_lexically;

use super::compose::resolve_asset;
use super::persist::{self, WriteDurability};
use super::LayerFile;

const ENTRY_ALIGNMENT: u16 = 64;

struct Entry {
    name: String,
    source: PathBuf,
    layer: LayerFile,
}

/// Archive names handed out so far, keyed by the normalized source path.
#[derive(Default)]
struct Names {
    by_source: BTreeMap<PathBuf, String>,
    taken: BTreeSet<String>,
}

impl Names {
    fn assign(&mut self, source: &Path) -> String {
        if let Some(name) = self.by_source.get(source) {
            return name.clone();
        }
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "layer.json".to_owned());
        let mut name = file_name.clone();
        let mut counter = 1;
        while self.taken.contains(&name) {
            name = format!("{counter}_{file_name}");
            counter += 1;
        }
        self.taken.insert(name.clone());
        self.by_source.insert(source.to_path_buf(), name.clone());
        name
    }
}

fn references_mut(layer: &mut LayerFile) -> impl Iterator<Item = &mut Reference> {
    layer.nodes.values_mut().flat_map(|spec| {
        let variant_refs = spec
            .variant_sets
            .values_mut()
            .flat_map(|variants| variants.values_mut())
            .flat_map(|variant| variant.references.iter_mut());
        spec.references.iter_mut().chain(variant_refs)
    })
}

/// Collects `root` and its reachable layers, relinking references to archive names.
/// Assets that do not resolve keep their authored path.
fn collect(root: &LayerFile, root_path: &Path) -> Vec<Entry> {
    let mut names = Names::default();
    let root_source = normalize_lexically(root_path);
    let mut queue = VecDeque::from([Entry {
        name: names.assign(&root_source),
        source: root_source,
        layer: root.clone(),
    }]);
    let mut entries = Vec::new();

    while let Some(mut entry) = queue.pop_front() {
        let dir = entry.source.parent().map(Path::to_path_buf).unwrap_or_default();
        for reference in references_mut(&mut entry.layer) {
            let source = resolve_asset(&dir, &reference.asset_path);
            if !names.by_source.contains_key(&source) {
                match persist::read_layer(&source) {
                    Ok(layer) => {
                        let name = names.assign(&source);
                        queue.push_back(Entry { name, source: source.clone(), layer });
                    }
                    Err(err) => {
                        tracing::warn!(
                            asset = %reference.asset_path,
                            error = %err,
                            "unresolved reference left out of package"
                        );
                        continue;
                    }
                }
            }
            reference.asset_path = names.assign(&source);
        }
        entries.push(entry);
    }
    entries
}

fn archive(entries: &[Entry]) -> Result<Vec<u8>, zip::result::ZipError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .with_alignment(ENTRY_ALIGNMENT);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        let mut contents = serde_json::to_vec_pretty(&entry.layer)
            .map_err(|err| zip::result::ZipError::Io(io::Error::other(err)))?;
        contents.push(b'\n');
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&contents)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Writes the package for `root` to `path`; returns the entry names, root layer first.
pub(super) fn write_package(
    root: &LayerFile,
    root_path: &Path,
    path: &Path,
    durability: WriteDurability,
) -> Result<Vec<String>, EngineError> {
    let entries = collect(root, root_path);
    let bytes = archive(&entries).map_err(|err| EngineError::Io {
        path: path.to_path_buf(),
        source: io::Error::other(err),
    })?;
    persist::write_atomic(path, &bytes, durability)
        .map_err(|source| EngineError::Io { path: path.to_path_buf(), source })?;
    Ok(entries.into_iter().map(|entry| entry.name).collect())
}

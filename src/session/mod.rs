// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Token-addressed open stages.
//!
//! Each session owns one document handle behind its own mutex; the token map only hands out
//! `Arc`s to those slots, so calls on different tokens never wait on each other and the map
//! shard is released before the caller's closure runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::engine::{CreateOptions, Document, Engine, EngineError};
use crate::error::GatewayError;
use crate::model::SessionToken;

/// How `open` obtains the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenMode {
    Existing,
    Create(CreateOptions),
}

/// What a `with_session` call does to the session's dirty flag on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Mutate,
    /// In-place save: clears `dirty`.
    Save,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub stage_id: SessionToken,
    pub identifier: PathBuf,
    pub dirty: bool,
    pub created_at_ms: u64,
}

struct SessionState {
    document: Box<dyn Document>,
    dirty: bool,
}

struct SessionSlot {
    identifier: PathBuf,
    created_at_ms: u64,
    seq: u64,
    state: Mutex<SessionState>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionToken, Arc<SessionSlot>>,
    next_seq: AtomicU64,
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Opens (or creates) `path` through `engine` and registers it under a fresh token.
    /// Creating over an existing file is refused. A created document counts as dirty until
    /// it is saved.
    pub fn open(
        &self,
        engine: &dyn Engine,
        path: &Path,
        mode: OpenMode,
    ) -> Result<SessionToken, GatewayError> {
        let (document, dirty) = match mode {
            OpenMode::Existing => {
                (engine.open(path).map_err(|err| GatewayError::open_failed(path, &err))?, false)
            }
            OpenMode::Create(_) if engine.exists(path) => {
                let err = EngineError::AlreadyExists { path: path.to_path_buf() };
                return Err(GatewayError::open_failed(path, &err));
            }
            OpenMode::Create(options) => (
                engine.create(path, options).map_err(|err| GatewayError::open_failed(path, &err))?,
                true,
            ),
        };
        Ok(self.register(document, dirty))
    }

    /// Registers an already open document.
    pub fn register(&self, document: Box<dyn Document>, dirty: bool) -> SessionToken {
        let identifier = document.identifier().to_path_buf();
        let slot = Arc::new(SessionSlot {
            identifier: identifier.clone(),
            created_at_ms: now_ms(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(SessionState { document, dirty }),
        });
        loop {
            let token = SessionToken::generate();
            if let Entry::Vacant(vacant) = self.sessions.entry(token.clone()) {
                vacant.insert(slot);
                tracing::info!(stage_id = %token, path = %identifier.display(), "session opened");
                return token;
            }
        }
    }

    /// Drops the session's handle without saving.
    pub fn close(&self, token: &str) -> Result<SessionSummary, GatewayError> {
        let (token, slot) =
            self.sessions.remove(token).ok_or_else(|| GatewayError::stage_not_found(token))?;
        let dirty = slot.state.lock().dirty;
        tracing::info!(stage_id = %token, dirty, "session closed");
        Ok(SessionSummary {
            stage_id: token,
            identifier: slot.identifier.clone(),
            dirty,
            created_at_ms: slot.created_at_ms,
        })
    }

    /// Snapshot of every open session, oldest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let slots: Vec<(SessionToken, Arc<SessionSlot>)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        let mut rows: Vec<(u64, SessionSummary)> = slots
            .into_iter()
            .map(|(token, slot)| {
                let summary = SessionSummary {
                    stage_id: token,
                    identifier: slot.identifier.clone(),
                    dirty: slot.state.lock().dirty,
                    created_at_ms: slot.created_at_ms,
                };
                (slot.seq, summary)
            })
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Runs `f` on the session's document while holding that session's lock.
    ///
    /// Calls on one token are serialized; the dirty flag is updated only when `f` succeeds.
    pub fn with_session<R>(
        &self,
        token: &str,
        access: Access,
        f: impl FnOnce(&mut dyn Document) -> Result<R, GatewayError>,
    ) -> Result<R, GatewayError> {
        let slot = self
            .sessions
            .get(token)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GatewayError::stage_not_found(token))?;

        let mut state = slot.state.lock();
        let out = f(state.document.as_mut())?;
        match access {
            Access::Read => {}
            Access::Mutate => state.dirty = true,
            Access::Save => state.dirty = false,
        }
        Ok(out)
    }

    pub fn is_dirty(&self, token: &str) -> Result<bool, GatewayError> {
        let slot = self
            .sessions
            .get(token)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GatewayError::stage_not_found(token))?;
        let dirty = slot.state.lock().dirty;
        Ok(dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::JsonStageEngine;
    use crate::model::{NodePath, Specifier, TimeCode};
    use serde_json::json;
    use std::thread;

    fn np(value: &str) -> NodePath {
        NodePath::parse(value).expect("node path")
    }

    fn saved_stage(dir: &Path) -> PathBuf {
        let engine = JsonStageEngine::new();
        let path = dir.join("scene.json");
        let mut doc = engine.create(&path, CreateOptions::default()).expect("create");
        doc.define_node(&np("/World/Cube"), Some("Cube"), Specifier::Def).expect("define");
        doc.save().expect("save");
        path
    }

    #[test]
    fn unknown_tokens_are_stage_not_found() {
        let registry = SessionRegistry::new();
        let err = registry.with_session("nope", Access::Read, |_| Ok(())).expect_err("missing");
        assert_eq!(err.code(), "stage_not_found");
        assert_eq!(registry.close("nope").expect_err("missing").code(), "stage_not_found");
        assert!(registry.is_empty());
    }

    #[test]
    fn create_refuses_an_existing_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = saved_stage(dir.path());
        let before = std::fs::read(&path).expect("read");
        let registry = SessionRegistry::new();

        let err = registry
            .open(&JsonStageEngine::new(), &path, OpenMode::Create(CreateOptions::default()))
            .expect_err("exists");
        assert_eq!(err.code(), "open_failed");
        assert!(registry.is_empty());
        assert_eq!(std::fs::read(&path).expect("read"), before);
    }

    #[test]
    fn dirty_tracks_mutations_and_in_place_saves() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = saved_stage(dir.path());
        let registry = SessionRegistry::new();
        let token = registry
            .open(&JsonStageEngine::new(), &path, OpenMode::Existing)
            .expect("open");
        assert!(!registry.is_dirty(token.as_str()).expect("dirty"));

        registry
            .with_session(token.as_str(), Access::Mutate, |doc| {
                doc.set_attribute(&np("/World/Cube"), "size", json!(3.0), TimeCode::Default)?;
                Ok(())
            })
            .expect("mutate");
        assert!(registry.is_dirty(token.as_str()).expect("dirty"));

        let failed: Result<(), _> = registry.with_session(token.as_str(), Access::Save, |_| {
            Err(GatewayError::internal("boom"))
        });
        assert!(failed.is_err());
        assert!(registry.is_dirty(token.as_str()).expect("dirty"), "failed save keeps dirty");

        registry
            .with_session(token.as_str(), Access::Save, |doc| {
                doc.save().map_err(|err| GatewayError::save_failed(&path, &err))
            })
            .expect("save");
        assert!(!registry.is_dirty(token.as_str()).expect("dirty"));
    }

    #[test]
    fn sessions_on_one_file_are_independent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = saved_stage(dir.path());
        let engine = JsonStageEngine::new();
        let registry = SessionRegistry::new();
        let a = registry.open(&engine, &path, OpenMode::Existing).expect("open a");
        let b = registry.open(&engine, &path, OpenMode::Existing).expect("open b");
        assert_ne!(a, b);

        registry
            .with_session(a.as_str(), Access::Mutate, |doc| {
                doc.set_attribute(&np("/World/Cube"), "size", json!(9.0), TimeCode::Default)?;
                Ok(())
            })
            .expect("mutate a");
        let seen_by_b = registry
            .with_session(b.as_str(), Access::Read, |doc| {
                Ok(doc.attribute(&np("/World/Cube"), "size", TimeCode::Default)?)
            })
            .expect("read b");
        assert_eq!(seen_by_b, Some(json!(2.0)));
        assert!(!registry.is_dirty(b.as_str()).expect("dirty"));
    }

    #[test]
    fn list_is_ordered_by_creation_and_close_removes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = saved_stage(dir.path());
        let engine = JsonStageEngine::new();
        let registry = SessionRegistry::new();
        let first = registry.open(&engine, &path, OpenMode::Existing).expect("first");
        let second = registry
            .open(&engine, &dir.path().join("new.json"), OpenMode::Create(CreateOptions::default()))
            .expect("second");

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].stage_id, first);
        assert_eq!(listed[1].stage_id, second);
        assert!(listed[1].dirty, "created stages start dirty");
        assert_eq!(second.as_str().len(), 12);
        assert!(second.as_str().chars().all(|c| c.is_ascii_hexdigit()));

        let closed = registry.close(first.as_str()).expect("close");
        assert_eq!(closed.identifier, path);
        assert_eq!(registry.len(), 1);
        assert!(!dir.path().join("new.json").exists(), "close never saves");
    }

    #[test]
    fn same_token_calls_are_serialized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = saved_stage(dir.path());
        let registry = Arc::new(SessionRegistry::new());
        let token = registry.open(&JsonStageEngine::new(), &path, OpenMode::Existing).expect("open");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let token = token.clone();
                thread::spawn(move || {
                    registry
                        .with_session(token.as_str(), Access::Mutate, |doc| {
                            let node = np("/World/Cube");
                            let current = doc
                                .attribute(&node, "counter", TimeCode::Default)?
                                .and_then(|v| v.as_i64())
                                .unwrap_or(0);
                            doc.set_attribute(&node, "counter", json!(current + 1), TimeCode::Default)?;
                            Ok(())
                        })
                        .expect("increment");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        let counter = registry
            .with_session(token.as_str(), Access::Read, |doc| {
                Ok(doc.attribute(&np("/World/Cube"), "counter", TimeCode::Default)?)
            })
            .expect("read");
        assert_eq!(counter, Some(json!(8)));
    }
}

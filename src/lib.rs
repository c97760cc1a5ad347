// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Stagehand: a tool-call gateway for scene-description stages.
//!
//! Loosely shaped JSON tool calls come in through [`gateway::Gateway::call`] (or the MCP
//! surface in [`mcp`]), are normalized by [`coerce`], run against either a token-addressed
//! session ([`session`]) or a one-shot file handle ([`stateless`]), and always come back as an
//! [`envelope::Envelope`]. The scene engine itself sits behind the [`engine`] capability traits.

pub mod coerce;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod mcp;
pub mod model;
pub mod ops;
pub mod paths;
pub mod session;
pub mod stateless;

pub use config::GatewayConfig;
pub use envelope::Envelope;
pub use error::GatewayError;
pub use gateway::Gateway;

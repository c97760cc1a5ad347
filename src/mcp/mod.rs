// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! Every gateway tool is exposed under its alphanumeric alias. Arguments pass through as a
//! free-form JSON object and the result is the gateway envelope, so MCP clients see exactly
//! the `{ok, result|error}` contract. Transport selection is left to the host.

mod server;
mod types;

pub use server::StagehandMcp;
pub use types::ToolArguments;

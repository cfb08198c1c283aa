// Copyright 2025 SpecHub (https://github.com/spechub)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Model Context Protocol (MCP) bridge
//!
//! Exposes the registry to AI agents as a session-oriented tool interface.
//! JSON-RPC 2.0 over HTTP POST, with an SSE push channel and an explicit
//! session-teardown exchange, all keyed by the `Mcp-Session-Id` header.
//!
//! The tool surface mirrors the registry operations one-to-one:
//! `list_services`, `get_service_spec`, `get_all_endpoints`,
//! `search_endpoints`, and the generic `call_api` proxy.

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tool;
pub mod tools;

pub use handlers::McpHandler;
pub use protocol::*;
pub use server::{McpServer, McpServerState, SESSION_HEADER};
pub use session::{McpSession, SessionTable};
pub use tool::{McpTool, RegistrationError, ToolError, ToolRegistry};

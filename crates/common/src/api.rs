//! DTOs returned by the monitoring server's machine endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registered monitoring agent as reported by the server.
///
/// The console never mutates a machine; it only mirrors server state. Fields
/// the console does not interpret are kept in `extra` so they survive a
/// serialize round trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Server-assigned identifier (>= 1).
    pub id: i64,
    /// Address the agent listens on.
    #[serde(default)]
    pub address: String,
    /// Port the agent listens on.
    #[serde(default)]
    pub agent_port: u16,
    /// Host name reported by the agent.
    #[serde(default)]
    pub hostname: String,
    /// Whether the machine was admitted to report.
    #[serde(default)]
    pub authorized: bool,
    /// Agent software version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    /// Last time the server successfully contacted the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visited_at: Option<DateTime<Utc>>,
    /// Last communication error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Remaining descriptive fields, opaque to the console.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of machines plus the total matching the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MachinePage {
    /// Machines on this page, in server sort order.
    #[serde(default)]
    pub items: Vec<Machine>,
    /// Number of machines matching the query across all pages.
    #[serde(default)]
    pub total: u64,
}

/// Agent installation token response (fetch and regenerate).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerTokenResponse {
    /// Plaintext token used by new agents to register.
    pub token: String,
}

/// Error payload returned by the server for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    /// Human-readable reason.
    pub message: String,
}

//! Managed-server states and operations.

use serde::Serialize;
use strum_macros::{Display, EnumString};

/// Observable state of a managed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ServerState {
    Stopped,
    Running,
    /// Running but not accepting new work.
    Suspended,
}

/// A lifecycle operation against one managed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    Start,
    Stop,
    Restart,
    Reload,
    Suspend,
    Resume,
}

/// The result of a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub from: ServerState,
    pub to: ServerState,
}

/// Status of one managed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub name: String,
    pub state: ServerState,
    /// A configuration change cannot take effect until the server restarts.
    pub restart_required: bool,
    /// A configuration change cannot take effect until the server reloads.
    pub reload_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn operations_parse_from_kebab_case() {
        assert_eq!(Operation::from_str("start").unwrap(), Operation::Start);
        assert_eq!(Operation::from_str("resume").unwrap(), Operation::Resume);
        assert!(Operation::from_str("explode").is_err());
    }

    #[test]
    fn states_display_in_kebab_case() {
        assert_eq!(ServerState::Stopped.to_string(), "stopped");
        assert_eq!(ServerState::Suspended.to_string(), "suspended");
    }
}

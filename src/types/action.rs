use std::fmt;

use serde::{Deserialize, Serialize};

/// Action names a single deployment operation. The same names appear in
/// capability token claims, job rows, and route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Info,
    Status,
    Logs,
    Pull,
    Clone,
    Build,
    Start,
    Stop,
    Restart,
    Reset,
    Destroy,
    Update,
    Webhook,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Info => "info",
            Action::Status => "status",
            Action::Logs => "logs",
            Action::Pull => "pull",
            Action::Clone => "clone",
            Action::Build => "build",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Reset => "reset",
            Action::Destroy => "destroy",
            Action::Update => "update",
            Action::Webhook => "webhook",
        }
    }

    pub fn parse(s: &str) -> Option<Action> {
        match s {
            "info" => Some(Action::Info),
            "status" => Some(Action::Status),
            "logs" => Some(Action::Logs),
            "pull" => Some(Action::Pull),
            "clone" => Some(Action::Clone),
            "build" => Some(Action::Build),
            "start" => Some(Action::Start),
            "stop" => Some(Action::Stop),
            "restart" => Some(Action::Restart),
            "reset" => Some(Action::Reset),
            "destroy" => Some(Action::Destroy),
            "update" => Some(Action::Update),
            "webhook" => Some(Action::Webhook),
            _ => None,
        }
    }

    /// Actions embedded in a short-lived operator access token.
    #[must_use]
    pub const fn access_set() -> &'static [Action] {
        &[
            Action::Info,
            Action::Logs,
            Action::Status,
            Action::Pull,
            Action::Clone,
            Action::Build,
            Action::Update,
            Action::Start,
            Action::Stop,
            Action::Restart,
            Action::Reset,
            Action::Destroy,
        ]
    }

    /// Actions embedded in a long-lived general automation token.
    #[must_use]
    pub const fn general_set() -> &'static [Action] {
        &[
            Action::Logs,
            Action::Status,
            Action::Pull,
            Action::Update,
            Action::Start,
            Action::Stop,
            Action::Restart,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use crate::catalog::CommandKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Closed,
    Opening,
    Offline,
    Initializing,
    Online,
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Closed => "Closed",
            Self::Opening => "Opening",
            Self::Offline => "Offline",
            Self::Initializing => "Initializing",
            Self::Online => "Online",
            Self::Closing => "Closing",
        };
        f.write_str(s)
    }
}

/// Why the scheduler resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Timeout,
    ReplyReceived,
}

/// Liveness transitions driven by the outcome of a reply-required command.
///
/// Open/close transitions are handled directly by the session.
pub fn transition_after(
    state: ConnectionState,
    completed: CommandKind,
    cause: Resume,
) -> Option<ConnectionState> {
    use ConnectionState::{Initializing, Offline, Online};
    match (state, completed, cause) {
        (Offline, CommandKind::Poll, Resume::ReplyReceived) => Some(Initializing),
        (Initializing, CommandKind::WeightImmediate, Resume::ReplyReceived) => Some(Online),
        (Initializing, CommandKind::WeightImmediate, Resume::Timeout) => Some(Offline),
        (Online, _, Resume::Timeout) => Some(Offline),
        _ => None,
    }
}

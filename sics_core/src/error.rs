use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SicsError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("transport disconnected: {0}")]
    Disconnected(String),
    #[error("port failed to open: {0}")]
    OpenFailed(String),
    #[error("invalid command: {0}")]
    Command(#[from] CommandError),
    #[error("invalid state: {0}")]
    State(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("engine stopped")]
    EngineStopped,
}

/// Rejections from the command builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command text is empty")]
    Empty,
    #[error("forbidden character {ch:?} in command text")]
    ForbiddenChar { ch: char },
    #[error("{name} takes {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{0} needs arguments and cannot be sent by name")]
    NotInstantiable(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

use crate::catalog::{CommandDescriptor, CommandKind};
use crate::reply::leading_token;
use std::time::Duration;

/// One instantiated command: its descriptor plus the rendered line
/// (without terminator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    descriptor: CommandDescriptor,
    line: String,
}

impl Command {
    pub(crate) fn new(descriptor: CommandDescriptor, line: String) -> Self {
        Self { descriptor, line }
    }

    pub fn kind(&self) -> CommandKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn timeout(&self) -> Duration {
        self.descriptor.timeout
    }

    pub fn response_required(&self) -> bool {
        self.descriptor.response_required
    }

    pub fn pause_after_response(&self) -> Duration {
        self.descriptor.pause_after_response
    }

    /// Same command with its wait overridden.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.timeout = timeout;
        self
    }

    /// Bytes to put on the wire; empty for the idle placeholder.
    pub fn wire(&self) -> Vec<u8> {
        if self.line.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.line.len() + 2);
        out.extend_from_slice(self.line.as_bytes());
        out.extend_from_slice(b"\r\n");
        out
    }

    /// Leading token a reply to this command starts with.
    ///
    /// Raw lines are matched by their own first word, with the same `SI`/`@`
    /// special cases as the catalog.
    pub fn expected_reply(&self) -> Option<&str> {
        if let Some(tok) = self.kind().reply_token() {
            return Some(tok);
        }
        if self.kind() != CommandKind::Raw {
            return None;
        }
        let line = self.line.trim_start();
        if line.starts_with('@') {
            return Some("I4");
        }
        match leading_token(line) {
            Some("SI") => Some("S"),
            other => other,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line.is_empty() {
            write!(f, "<{}>", self.kind())
        } else {
            f.write_str(&self.line)
        }
    }
}

//! Incremental CR/LF line framer for the MT-SICS serial link.
//!
//! Bytes arrive in arbitrary chunks; `next_line` yields each complete line
//! without its terminator. A line that grows past `MAX_LINE` without a
//! terminator is dropped and the framer resynchronizes on the next LF.

/// Longest line kept (MT-SICS replies are well below this).
pub const MAX_LINE: usize = 1024;

#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(128),
            discarding: false,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Extract the next complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                if self.buf.len() > MAX_LINE {
                    tracing::warn!(len = self.buf.len(), "inbound line too long, discarding");
                    self.buf.clear();
                    self.discarding = true;
                }
                return None;
            };
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.discarding {
                // tail of an oversized line
                self.discarding = false;
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }

    /// Bytes buffered but not yet terminated.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

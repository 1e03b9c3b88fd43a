use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Access mode an open file was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(&self) -> bool {
        !matches!(self, AccessMode::WriteOnly)
    }

    pub fn can_write(&self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

/// A session bound to one scull device.
#[derive(Debug)]
pub struct OpenFile {
    pub id: SessionId,
    pub minor: u32,
    pub mode: AccessMode,
    /// File position used by [`crate::read_to_end`] and [`crate::write_all`].
    pub pos: u64,
    pub opened_at: DateTime<Utc>,
}

impl OpenFile {
    pub(crate) fn new(minor: u32, mode: AccessMode) -> Self {
        Self {
            id: SessionId::new(),
            minor,
            mode,
            pos: 0,
            opened_at: Utc::now(),
        }
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_permissions() {
        assert!(AccessMode::ReadOnly.can_read());
        assert!(!AccessMode::ReadOnly.can_write());
        assert!(!AccessMode::WriteOnly.can_read());
        assert!(AccessMode::ReadWrite.can_read() && AccessMode::ReadWrite.can_write());
    }
}

//! In-memory scull storage engine.
//!
//! A [`DeviceStore`] maps a linear byte offset onto a chain of [`Segment`]s,
//! each holding `qset` lazily allocated blocks of `quantum` bytes. Storage is
//! grown on write and released wholesale by [`DeviceStore::trim`].

mod config;
mod segment;
mod store;

pub use config::{Geometry, Position, StoreConfig, DEFAULT_QSET, DEFAULT_QUANTUM};
pub use segment::{Block, Segment};
pub use store::DeviceStore;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub size: u64,
    pub quantum: usize,
    pub qset: usize,
    pub segments: usize,
    pub allocated_blocks: usize,
    pub allocated_bytes: u64,
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    #[error("Copy fault: {0}")]
    CopyFault(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Offset overflow at position {0}")]
    OffsetOverflow(u64),

    #[error("Store is not empty: {0} bytes held")]
    NotEmpty(u64),
}

impl From<std::collections::TryReserveError> for StorageError {
    fn from(err: std::collections::TryReserveError) -> Self {
        StorageError::AllocationFailure(err.to_string())
    }
}

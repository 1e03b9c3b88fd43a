use serde::{Deserialize, Serialize};

use crate::{Result, StorageError};

pub const DEFAULT_QUANTUM: usize = 4000;
pub const DEFAULT_QSET: usize = 1000;

/// Dimensions a store is created with and returns to on every trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bytes per block.
    pub quantum: usize,
    /// Blocks per segment.
    pub qset: usize,
    /// Ceiling on bytes held in blocks; 0 means unlimited.
    pub max_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            qset: DEFAULT_QSET,
            max_bytes: 0,
        }
    }
}

impl StoreConfig {
    pub fn new(quantum: usize, qset: usize) -> Self {
        Self {
            quantum,
            qset,
            max_bytes: 0,
        }
    }

    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.quantum, self.qset)
    }
}

/// Validated quantum/qset pair used for offset decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    quantum: usize,
    qset: usize,
    span: u64,
}

/// Where a byte offset lands: segment index, block slot within the segment
/// and byte offset within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub segment: usize,
    pub slot: usize,
    pub offset: usize,
}

impl Geometry {
    pub fn new(quantum: usize, qset: usize) -> Result<Self> {
        if quantum == 0 || qset == 0 {
            return Err(StorageError::InvalidConfig(format!(
                "quantum and qset must be non-zero (quantum={}, qset={})",
                quantum, qset
            )));
        }

        let span = (quantum as u64)
            .checked_mul(qset as u64)
            .filter(|span| usize::try_from(*span).is_ok())
            .ok_or_else(|| {
                StorageError::InvalidConfig(format!(
                    "segment span overflows: {} x {}",
                    quantum, qset
                ))
            })?;

        Ok(Self { quantum, qset, span })
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    pub fn qset(&self) -> usize {
        self.qset
    }

    /// Bytes addressed by one segment.
    pub fn span(&self) -> u64 {
        self.span
    }

    pub fn locate(&self, pos: u64) -> Result<Position> {
        let segment =
            usize::try_from(pos / self.span).map_err(|_| StorageError::OffsetOverflow(pos))?;
        // rest < span, and span fits usize
        let rest = (pos % self.span) as usize;

        Ok(Position {
            segment,
            slot: rest / self.quantum,
            offset: rest % self.quantum,
        })
    }
}

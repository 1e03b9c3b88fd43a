use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::config::{Geometry, StoreConfig};
use crate::segment::Segment;
use crate::{Result, StorageError, StoreStats};

/// Backing memory of one scull device.
///
/// The chain of segments is an indexed vector: segment `n` covers bytes
/// `[n * quantum * qset, (n + 1) * quantum * qset)`. The store performs no
/// locking of its own; callers serialize access (the device layer holds one
/// lock per store for the whole of each operation).
#[derive(Debug)]
pub struct DeviceStore {
    defaults: StoreConfig,
    default_geometry: Geometry,
    geometry: Geometry,
    segments: Vec<Segment>,
    size: u64,
    allocated_blocks: usize,
}

impl DeviceStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let geometry = config.geometry()?;

        Ok(Self {
            defaults: config,
            default_geometry: geometry,
            geometry,
            segments: Vec::new(),
            size: 0,
            allocated_blocks: 0,
        })
    }

    /// Logical size: one past the highest byte ever written.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn quantum(&self) -> usize {
        self.geometry.quantum()
    }

    pub fn qset(&self) -> usize {
        self.geometry.qset()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_blocks as u64 * self.geometry.quantum() as u64
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            size: self.size,
            quantum: self.geometry.quantum(),
            qset: self.geometry.qset(),
            segments: self.segments.len(),
            allocated_blocks: self.allocated_blocks,
            allocated_bytes: self.allocated_bytes(),
        }
    }

    /// Looks up segment `index` without growing the chain.
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Returns segment `index`, creating it and every segment before it.
    ///
    /// Room for the missing segments is reserved before any is created, so a
    /// failure leaves the chain exactly as it was.
    pub fn follow(&mut self, index: usize) -> Result<&mut Segment> {
        let len = self.segments.len();
        if index >= len {
            let missing = index - len + 1;
            self.segments.try_reserve(missing).inspect_err(|err| {
                warn!(index, missing, "failed to grow segment chain: {}", err);
            })?;
            self.segments.resize_with(index + 1, Segment::new);
        }

        Ok(&mut self.segments[index])
    }

    /// Releases every block and segment, zeroes the size and restores the
    /// configured quantum and qset. Safe to call on an empty store.
    pub fn trim(&mut self) {
        let mut released = 0;
        for segment in self.segments.iter_mut() {
            released += segment.release();
        }
        let segments = self.segments.len();
        self.segments = Vec::new();

        self.size = 0;
        self.allocated_blocks = 0;
        self.geometry = self.default_geometry;

        debug!(segments, blocks = released, "store trimmed");
    }

    /// Changes quantum and qset. Only allowed while the store holds no
    /// segments; trim puts the configured values back.
    pub fn set_geometry(&mut self, quantum: usize, qset: usize) -> Result<()> {
        if !self.is_empty() {
            return Err(StorageError::NotEmpty(self.size));
        }
        self.geometry = Geometry::new(quantum, qset)?;
        Ok(())
    }

    /// Copies up to `count` bytes at `*pos` into `out`, never crossing a block
    /// boundary. Returns 0 at or past the logical size and when the block
    /// holding `*pos` was never allocated.
    pub fn read<W: Write + ?Sized>(&self, pos: &mut u64, count: usize, out: &mut W) -> Result<usize> {
        if *pos >= self.size {
            return Ok(0);
        }

        let at = self.geometry.locate(*pos)?;
        let block = match self.segment(at.segment).and_then(|s| s.block(at.slot)) {
            Some(block) => block,
            None => {
                debug!(pos = *pos, segment = at.segment, slot = at.slot, "read hit a hole");
                return Ok(0);
            }
        };

        let count = (count as u64).min(self.size - *pos) as usize;
        let count = count.min(self.geometry.quantum() - at.offset);

        out.write_all(&block.as_slice()[at.offset..at.offset + count])
            .map_err(|err| {
                warn!(pos = *pos, count, "failed to copy to reader: {}", err);
                StorageError::CopyFault(err)
            })?;

        *pos += count as u64;
        Ok(count)
    }

    /// Reads into `buf` starting at `pos`, subject to the same clamping as
    /// [`DeviceStore::read`].
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let mut cursor = pos;
        let count = buf.len();
        let mut dst = buf;
        self.read(&mut cursor, count, &mut dst)
    }

    /// Stores up to `count` bytes from `input` at `*pos`, allocating the
    /// segment, slot array and block as needed. At most the remainder of the
    /// current block is written; callers re-issue the rest.
    ///
    /// Allocations made before a copy fault are kept.
    pub fn write<R: Read + ?Sized>(
        &mut self,
        pos: &mut u64,
        count: usize,
        input: &mut R,
    ) -> Result<usize> {
        if count == 0 {
            return Ok(0);
        }

        let at = self.geometry.locate(*pos)?;
        let quantum = self.geometry.quantum();
        let qset = self.geometry.qset();
        let count = count.min(quantum - at.offset);
        let end = pos
            .checked_add(count as u64)
            .ok_or(StorageError::OffsetOverflow(*pos))?;

        let max_bytes = self.defaults.max_bytes;
        if max_bytes > 0 {
            let present = self
                .segment(at.segment)
                .and_then(|s| s.block(at.slot))
                .is_some();
            let held = self.allocated_bytes();
            if !present && held + (quantum as u64) > max_bytes {
                warn!(held, quantum, max_bytes, "memory ceiling reached");
                return Err(StorageError::AllocationFailure(format!(
                    "memory ceiling reached: {} + {} > {}",
                    held, quantum, max_bytes
                )));
            }
        }

        let segment = self.follow(at.segment)?;
        let allocated = segment
            .ensure_block(at.slot, qset, quantum)
            .inspect_err(|err| warn!(pos = *pos, "failed to allocate block: {}", err))?;
        let block = segment.block_mut(at.slot).ok_or_else(|| {
            StorageError::AllocationFailure(format!("block {} missing after allocation", at.slot))
        })?;

        let copied = input.read_exact(&mut block.as_mut_slice()[at.offset..at.offset + count]);
        if allocated {
            self.allocated_blocks += 1;
        }
        copied.map_err(|err| {
            warn!(pos = *pos, count, "failed to copy from writer: {}", err);
            StorageError::CopyFault(err)
        })?;

        *pos = end;
        if self.size < end {
            self.size = end;
        }
        Ok(count)
    }

    pub fn write_at(&mut self, pos: u64, data: &[u8]) -> Result<usize> {
        let mut cursor = pos;
        let mut src = data;
        self.write(&mut cursor, data.len(), &mut src)
    }
}

impl Drop for DeviceStore {
    fn drop(&mut self) {
        self.trim();
    }
}

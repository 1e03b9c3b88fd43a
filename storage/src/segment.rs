use crate::{Result, StorageError};

/// One quantum of device memory.
#[derive(Debug)]
pub struct Block {
    data: Box<[u8]>,
}

impl Block {
    /// Allocates a zero-filled block of `quantum` bytes.
    pub fn allocate(quantum: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(quantum)?;
        data.resize(quantum, 0);

        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// A quantum set: `qset` block slots, the slot array itself allocated on
/// first write.
#[derive(Debug, Default)]
pub struct Segment {
    blocks: Option<Vec<Option<Block>>>,
}

impl Segment {
    pub fn new() -> Self {
        Self { blocks: None }
    }

    pub fn has_blocks(&self) -> bool {
        self.blocks.is_some()
    }

    pub fn block(&self, slot: usize) -> Option<&Block> {
        self.blocks.as_ref()?.get(slot)?.as_ref()
    }

    pub fn block_mut(&mut self, slot: usize) -> Option<&mut Block> {
        self.blocks.as_mut()?.get_mut(slot)?.as_mut()
    }

    /// Makes sure the block at `slot` exists, allocating the slot array and
    /// the block as needed. Returns whether a new block was allocated. The
    /// slot array is kept if the block allocation fails.
    pub fn ensure_block(&mut self, slot: usize, qset: usize, quantum: usize) -> Result<bool> {
        if self.blocks.is_none() {
            let mut slots = Vec::new();
            slots.try_reserve_exact(qset)?;
            slots.resize_with(qset, || None);
            self.blocks = Some(slots);
        }

        let entry = self
            .blocks
            .as_mut()
            .and_then(|slots| slots.get_mut(slot))
            .ok_or_else(|| {
                StorageError::InvalidConfig(format!(
                    "slot {} outside quantum set of {}",
                    slot, qset
                ))
            })?;

        if entry.is_some() {
            return Ok(false);
        }
        *entry = Some(Block::allocate(quantum)?);
        Ok(true)
    }

    pub fn allocated_blocks(&self) -> usize {
        self.blocks
            .as_ref()
            .map(|slots| slots.iter().filter(|slot| slot.is_some()).count())
            .unwrap_or(0)
    }

    /// Frees every block, then the slot array. Returns the number of blocks
    /// released.
    pub fn release(&mut self) -> usize {
        let Some(mut slots) = self.blocks.take() else {
            return 0;
        };

        let mut released = 0;
        for slot in slots.iter_mut() {
            if slot.take().is_some() {
                released += 1;
            }
        }
        released
    }
}

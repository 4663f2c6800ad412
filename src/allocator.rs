pub mod memory;
pub mod stats;

use memory::{Allocation, MemoryBlock, Owner};
use stats::Stats;

use thiserror::Error;
use log::*;

/// Reasons an allocator operation can fail. None of them is
/// fatal: the block list is left untouched and the caller
/// decides how to report the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// No free block is large enough for the request.
    #[error("no free block can hold {requested} units (largest free block: {largest})")]
    NoFit { requested: u64, largest: u64 },
    /// No block is currently owned by the process.
    #[error("no process found with name: {0}")]
    UnknownProcess(String),
    /// The request itself is malformed (zero size, empty
    /// process name, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

pub type Result<T> = std::result::Result<T, AllocError>;

/// First-Fit allocator over a single contiguous address space
/// `[0, total_memory)`.
///
/// The space is described by an ordered list of blocks that
/// partitions it exactly: blocks are sorted by offset, never
/// overlap, leave no gap and their sizes add up to the total
/// memory. Two free blocks are never adjacent, since they are
/// merged as soon as a release makes them neighbours.
///
/// A process may own several blocks at the same time; a
/// release only frees the first of them (in address order).
#[derive(Debug)]
pub struct Allocator {
    /// Size of the managed address space.
    total_memory: u64,
    /// Blocks the address space is made of, by ascending
    /// offset.
    blocks: Vec<MemoryBlock>,
    /// Number of requests that were placed.
    successful_allocations: u64,
    /// Number of requests that found no block large enough.
    failed_allocations: u64,
}

impl Allocator {
    pub fn new(total_memory: u64) -> Result<Self> {
        debug!("Allocator::new({total_memory})");

        if total_memory == 0 {
            return Err(AllocError::InvalidRequest("total memory must be positive"));
        }

        // At first the whole space is available, so the list
        // holds a single free block covering all of it.
        Ok(Self {
            total_memory,
            blocks: vec![MemoryBlock::free(0, total_memory)],
            successful_allocations: 0,
            failed_allocations: 0,
        })
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    /// Blocks of the address space, by ascending offset.
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    pub fn successful_allocations(&self) -> u64 {
        self.successful_allocations
    }

    pub fn failed_allocations(&self) -> u64 {
        self.failed_allocations
    }

    /// Allocate `size` units to `process`, in the first free
    /// block (lowest offset) that is large enough.
    ///
    /// On success, the block is split if it is larger than the
    /// request, and the offset of the allocation is returned.
    /// If no block fits, the failure is counted and
    /// `AllocError::NoFit` is returned. Zero-sized requests and
    /// empty process names are rejected with
    /// `AllocError::InvalidRequest` without being counted.
    pub fn allocate(&mut self, process: &str, size: u64) -> Result<Allocation> {
        trace!("Allocator::allocate({process}, {size})");

        if size == 0 {
            return Err(AllocError::InvalidRequest("requested size must be positive"));
        }
        if process.is_empty() {
            return Err(AllocError::InvalidRequest("process name must not be empty"));
        }

        let index = match self.first_fit(size) {
            Some(index) => index,
            None => {
                self.failed_allocations += 1;
                let largest = self.largest_free_block();
                debug!("No free block for {process} ({size}), largest is {largest}");

                return Err(AllocError::NoFit { requested: size, largest });
            }
        };

        // If the block is larger than the request, split it
        // in two parts: the allocated one keeps the start of
        // the block, and the remaining space becomes a new
        // free block right after it. On an exact fit, the
        // block is simply handed over.
        let block = &mut self.blocks[index];
        let start = block.start;
        if block.size > size {
            let remainder = MemoryBlock::free(start + size, block.size - size);
            block.size = size;

            trace!(
                "Splitting block at {start:#x}: {size} allocated, {} left at {:#x}",
                remainder.size,
                remainder.start,
            );
            self.blocks.insert(index + 1, remainder);
        }
        self.blocks[index].owner = Owner::Process(process.to_string());
        self.successful_allocations += 1;

        #[cfg(debug_assertions)]
        self.check_integrity();

        trace!("Allocator::allocate({process}, {size}) -> {start:#x}");
        Ok(Allocation { start, size })
    }

    /// Release the first block owned by `process` and merge it
    /// with its free neighbours.
    ///
    /// Returns the resulting free block, which may span the
    /// previous and next blocks as well.
    pub fn deallocate(&mut self, process: &str) -> Result<MemoryBlock> {
        trace!("Allocator::deallocate({process})");

        if process.is_empty() {
            return Err(AllocError::InvalidRequest("process name must not be empty"));
        }

        let mut index = self.blocks
            .iter()
            .position(|block| block.is_owned_by(process))
            .ok_or_else(|| AllocError::UnknownProcess(process.to_string()))?;
        self.blocks[index].owner = Owner::Free;

        // Merge with the previous block first: the freed block
        // then lives at the index of its predecessor, and that
        // is the block the next one gets merged into. This way
        // a block surrounded by free blocks collapses with both
        // in a single release.
        if index > 0 && self.blocks[index - 1].is_free() {
            self.merge_blocks(index - 1, index);
            index -= 1;
        }
        if index + 1 < self.blocks.len() && self.blocks[index + 1].is_free() {
            self.merge_blocks(index, index + 1);
        }

        #[cfg(debug_assertions)]
        self.check_integrity();

        let freed = self.blocks[index].clone();
        trace!(
            "Allocator::deallocate({process}) -> [{:#x}, {:#x}]",
            freed.start,
            freed.end(),
        );
        Ok(freed)
    }

    /// Usage statistics over the current state. This has no
    /// side effect.
    pub fn statistics(&self) -> Stats {
        Stats::collect(
            &self.blocks,
            self.total_memory,
            self.successful_allocations,
            self.failed_allocations,
        )
    }

    /// Index of the first free block that can hold `size`.
    fn first_fit(&self, size: u64) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.is_free() && block.size >= size)
    }

    fn largest_free_block(&self) -> u64 {
        self.blocks
            .iter()
            .filter(|block| block.is_free())
            .map(|block| block.size)
            .max()
            .unwrap_or(0)
    }

    fn merge_blocks(&mut self, left: usize, right: usize) {
        debug_assert_eq!(left + 1, right);

        // The right block is removed from the list and its
        // space is given to the left one, which keeps its
        // start offset.
        let block_right = self.blocks.remove(right);
        let block_left = &mut self.blocks[left];
        trace!(
            "Merging blocks at {:#x} ({}) and {:#x} ({})",
            block_left.start,
            block_left.size,
            block_right.start,
            block_right.size,
        );
        block_left.size += block_right.size;
    }

    /// Assert that the block list is valid:
    ///
    /// 1. The first block starts at 0 and every block starts
    ///    right after the previous one (no gap, no overlap).
    ///
    /// 2. No block is empty.
    ///
    /// 3. The blocks end exactly at `total_memory`.
    ///
    /// 4. No two neighbouring blocks are both free.
    #[cfg(any(test, debug_assertions))]
    fn check_integrity(&self) {
        let mut expected_start = 0;
        let mut prev_free = false;

        for block in &self.blocks {
            // (1)
            assert_eq!(block.start, expected_start, "gap or overlap at {block:?}");

            // (2)
            assert!(block.size > 0, "empty block {block:?}");

            // (4)
            assert!(
                !(prev_free && block.is_free()),
                "adjacent free blocks at {:#x}",
                block.start,
            );

            expected_start = block.start + block.size;
            prev_free = block.is_free();
        }

        // (3)
        assert_eq!(expected_start, self.total_memory);
    }
}

use super::memory::MemoryBlock;

/// Snapshot of the allocator usage, as reported at the end of
/// a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    /// Size of the whole address space.
    pub total_memory: u64,
    /// Sum of the sizes of all owned blocks.
    pub allocated_memory: u64,
    /// Sum of the sizes of all free blocks.
    pub free_memory: u64,
    /// Number of owned blocks.
    pub num_processes: usize,
    /// Number of free blocks.
    pub num_free_blocks: usize,
    /// Size of the largest free block, 0 if there is none.
    pub largest_free_block: u64,
    /// Share of the address space that is allocated, in
    /// percent.
    pub allocated_percent: f64,
    /// Share of the address space that is free, in percent.
    pub free_percent: f64,
    /// Share of the free memory that lies outside of the
    /// largest free block, in percent.
    pub external_fragmentation: f64,
    pub successful_allocations: u64,
    pub failed_allocations: u64,
}

impl Stats {
    pub(super) fn collect(
        blocks: &[MemoryBlock],
        total_memory: u64,
        successful_allocations: u64,
        failed_allocations: u64,
    ) -> Self {
        let mut allocated_memory = 0;
        let mut free_memory = 0;
        let mut num_processes = 0;
        let mut num_free_blocks = 0;
        let mut largest_free_block = 0;

        // A single pass over the list is enough to gather
        // every sum and count.
        for block in blocks {
            if block.is_free() {
                free_memory += block.size;
                num_free_blocks += 1;
                largest_free_block = largest_free_block.max(block.size);
            } else {
                allocated_memory += block.size;
                num_processes += 1;
            }
        }

        let allocated_percent = percent(allocated_memory, total_memory);
        let free_percent = percent(free_memory, total_memory);

        // External fragmentation is the part of the free memory
        // that cannot serve a request as large as the largest
        // free block, that is everything but that block.
        let external_fragmentation = if free_memory > 0 {
            percent(free_memory - largest_free_block, free_memory)
        } else {
            0.0
        };

        Self {
            total_memory,
            allocated_memory,
            free_memory,
            num_processes,
            num_free_blocks,
            largest_free_block,
            allocated_percent,
            free_percent,
            external_fragmentation,
            successful_allocations,
            failed_allocations,
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }

    part as f64 * 100.0 / whole as f64
}

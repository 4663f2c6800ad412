use std::fmt;

use crate::allocator::{memory::MemoryBlock, Allocator};

const SEPARATOR: &str = "========================================";

/// Text report of the memory state: the table of blocks
/// followed by the usage statistics.
pub struct Report<'a> {
    allocator: &'a Allocator,
}

impl<'a> Report<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self { allocator }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Final Memory State")?;
        writeln!(f, "{SEPARATOR}")?;

        for (index, block) in self.allocator.blocks().iter().enumerate() {
            write_block(f, index + 1, block)?;
        }

        let stats = self.allocator.statistics();

        writeln!(f)?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Memory Statistics")?;
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Total Memory:           {} KB", stats.total_memory)?;
        writeln!(
            f,
            "Allocated Memory:       {} KB ({:.2}%)",
            stats.allocated_memory, stats.allocated_percent,
        )?;
        writeln!(
            f,
            "Free Memory:            {} KB ({:.2}%)",
            stats.free_memory, stats.free_percent,
        )?;
        writeln!(f, "Number of Processes:    {}", stats.num_processes)?;
        writeln!(f, "Number of Free Blocks:  {}", stats.num_free_blocks)?;
        writeln!(f, "Largest Free Block:     {} KB", stats.largest_free_block)?;
        writeln!(f, "External Fragmentation: {:.2}%", stats.external_fragmentation)?;

        writeln!(f)?;
        writeln!(f, "Successful Allocations: {}", stats.successful_allocations)?;
        writeln!(f, "Failed Allocations:     {}", stats.failed_allocations)?;
        writeln!(f, "{SEPARATOR}")
    }
}

fn write_block(f: &mut fmt::Formatter, number: usize, block: &MemoryBlock) -> fmt::Result {
    // The owner column is aligned for end offsets of up to 9
    // digits, with at least one space for longer ones.
    let end = block.end().to_string();
    let padding = " ".repeat(10usize.saturating_sub(end.len()).max(1));
    let allocated = if block.is_free() { "" } else { " - ALLOCATED" };

    writeln!(
        f,
        "Block {number}: [{}-{end}]{padding}{} ({} KB){allocated}",
        block.start, block.owner, block.size,
    )
}

use std::fmt;

/// Who a memory block belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owner {
    /// The block is not currently allocated.
    Free,
    /// The block is held by the process with the given name.
    Process(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Owner::Free => write!(f, "FREE"),
            Owner::Process(name) => write!(f, "{name}"),
        }
    }
}

/// Contiguous portion of the address space. Blocks never
/// overlap, and together they cover the whole space managed
/// by the allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryBlock {
    /// Offset of the first unit of the block.
    pub start: u64,
    /// Size of the block. Always positive.
    pub size: u64,
    /// Owner of the block, if any.
    pub owner: Owner,
}

impl MemoryBlock {
    pub fn free(start: u64, size: u64) -> Self {
        Self {
            start,
            size,
            owner: Owner::Free,
        }
    }

    /// Offset of the last unit of the block (inclusive).
    pub fn end(&self) -> u64 {
        self.start + self.size - 1
    }

    pub fn is_free(&self) -> bool {
        self.owner == Owner::Free
    }

    /// Name of the owning process, or `None` for a free block.
    pub fn process(&self) -> Option<&str> {
        match &self.owner {
            Owner::Free => None,
            Owner::Process(name) => Some(name),
        }
    }

    pub fn is_owned_by(&self, process: &str) -> bool {
        self.process() == Some(process)
    }
}

/// Successful placement of a request within the address
/// space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// Offset at which the block was placed.
    pub start: u64,
    /// Size of the allocated block.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_inclusive() {
        let block = MemoryBlock::free(100, 50);
        assert_eq!(block.end(), 149);

        let single = MemoryBlock::free(7, 1);
        assert_eq!(single.end(), 7);
    }

    #[test]
    fn ownership() {
        let mut block = MemoryBlock::free(0, 10);
        assert!(block.is_free());
        assert_eq!(block.process(), None);
        assert!(!block.is_owned_by("P1"));

        block.owner = Owner::Process("P1".to_string());
        assert!(!block.is_free());
        assert_eq!(block.process(), Some("P1"));
        assert!(block.is_owned_by("P1"));
        assert!(!block.is_owned_by("P2"));
    }

    #[test]
    fn owner_display() {
        assert_eq!(Owner::Free.to_string(), "FREE");
        assert_eq!(Owner::Process("P7".to_string()).to_string(), "P7");
    }
}

use std::fmt;

/// Opaque reference to an allocated block.
///
/// Handles are issued by `Arena::allocate` and stay valid until the block is freed.
/// Once the block is freed (and possibly merged into a neighbor), the handle goes stale:
/// `Arena::get` returns `None` for it and `Arena::free` treats it as a no-op.
///
/// A handle also records the arena that issued it, and is never resolved by another arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    pub(crate) arena: u64,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}
impl BlockHandle {
    pub(crate) fn new(arena: u64, index: usize, generation: u32) -> Self {
        BlockHandle {
            arena,
            index: index as u32,
            generation,
        }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}
impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BlockHandle(arena={}, index={}, gen={})",
            self.arena, self.index, self.generation
        )
    }
}

/// Read-only view of a block in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Position of the block within the arena.
    pub offset: u64,

    /// Length of the block (always positive).
    pub size: u64,

    /// Whether the block is allocated.
    pub allocated: bool,
}
impl BlockDescriptor {
    /// Creates a new `BlockDescriptor` instance.
    pub fn new(offset: u64, size: u64, allocated: bool) -> Self {
        BlockDescriptor {
            offset,
            size,
            allocated,
        }
    }

    /// Returns the (exclusive) end position of the block.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Returns `true` if the block is free.
    pub fn is_free(&self) -> bool {
        !self.allocated
    }
}
impl fmt::Display for BlockDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = if self.allocated { "ALLOCATED" } else { "FREE" };
        write!(
            f,
            "Block(offset={}, size={}, {})",
            self.offset, self.size, status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_works() {
        let b = BlockDescriptor::new(30, 50, true);
        assert_eq!(b.end(), 80);
        assert!(!b.is_free());
        assert_eq!(b.to_string(), "Block(offset=30, size=50, ALLOCATED)");

        let b = BlockDescriptor::new(80, 20, false);
        assert!(b.is_free());
        assert_eq!(b.to_string(), "Block(offset=80, size=20, FREE)");
    }

    #[test]
    fn handle_works() {
        let h = BlockHandle::new(1, 3, 7);
        assert_eq!(h.index(), 3);
        assert_eq!(h.generation, 7);
        assert_eq!(h.to_string(), "BlockHandle(arena=1, index=3, gen=7)");
        assert_ne!(h, BlockHandle::new(1, 3, 8));
        assert_ne!(h, BlockHandle::new(2, 3, 7));
    }
}

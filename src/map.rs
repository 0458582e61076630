//! Memory map rendering.
use std::fmt;

use crate::arena::{Arena, BlockDescriptor};

/// Table view of the blocks of an arena.
///
/// # Examples
///
/// ```
/// use fitsim::arena::{Arena, Policy};
/// use fitsim::map::MemoryMap;
///
/// let mut arena = Arena::new(100, Policy::FirstFit).unwrap();
/// arena.allocate(30).unwrap();
///
/// let map = MemoryMap::new(&arena).to_string();
/// assert!(map.contains("0          30         TRUE"));
/// assert!(map.contains("30         70         FALSE"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryMap {
    blocks: Vec<BlockDescriptor>,
    cursor_offset: Option<u64>,
}
impl MemoryMap {
    /// Takes a snapshot of `arena`.
    pub fn new(arena: &Arena) -> Self {
        MemoryMap {
            blocks: arena.snapshot(),
            cursor_offset: arena.cursor_offset(),
        }
    }

    /// Returns the blocks of the map.
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }
}
impl fmt::Display for MemoryMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Memory Map:")?;
        writeln!(f, "{:<10} {:<10} {}", "Offset", "Size", "Allocated")?;
        writeln!(f, "{}", "-".repeat(35))?;
        for b in &self.blocks {
            let status = if b.allocated { "TRUE" } else { "FALSE" };
            writeln!(f, "{:<10} {:<10} {}", b.offset, b.size, status)?;
        }
        if let Some(offset) = self.cursor_offset {
            writeln!(f)?;
            writeln!(f, "Next Fit Pointer at offset: {}", offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;
    use crate::arena::Policy;

    #[test]
    fn it_works() -> TestResult {
        let mut arena = track!(Arena::new(100, Policy::FirstFit))?;
        let a = track!(arena.allocate(30))?.unwrap();
        track!(arena.allocate(50))?;
        arena.free(a);

        let expected = "\
Memory Map:
Offset     Size       Allocated
-----------------------------------
0          30         FALSE
30         50         TRUE
80         20         FALSE
";
        assert_eq!(MemoryMap::new(&arena).to_string(), expected);
        Ok(())
    }

    #[test]
    fn next_fit_shows_cursor() -> TestResult {
        let mut arena = track!(Arena::new(100, Policy::NextFit))?;
        track!(arena.allocate(30))?;
        track!(arena.allocate(20))?;

        let map = MemoryMap::new(&arena);
        assert_eq!(map.blocks().len(), 3);
        assert!(map
            .to_string()
            .ends_with("\nNext Fit Pointer at offset: 30\n"));
        Ok(())
    }
}

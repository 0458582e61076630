//! Contiguous memory arena.
//!
//! An [Arena] manages a fixed-size, contiguous address space as an ordered ledger of blocks.
//! Every block is either free or allocated, and the ledger always satisfies the following:
//!
//! - the blocks cover the whole arena without gaps or overlaps, in ascending offset order
//! - no block is empty
//! - no two adjacent blocks are both free
//!
//! Allocation requests are served by one of the four placement [Policy] variants.
//! A chosen free block is split when it is larger than the request,
//! and freed blocks are coalesced with their free neighbors.
//!
//! [Arena]: ./struct.Arena.html
//! [Policy]: ./enum.Policy.html
use slog::Logger;
use uuid::Uuid;

pub use self::block::{BlockDescriptor, BlockHandle};
pub use self::builder::ArenaBuilder;
pub use self::policy::Policy;

use self::ledger::Ledger;
use crate::metrics::ArenaMetrics;
use crate::{ErrorKind, Result};

mod block;
mod builder;
mod ledger;
mod policy;

/// Contiguous memory arena.
///
/// An arena is not synchronized internally;
/// wrap it in a lock if it has to be shared between threads.
#[derive(Debug)]
pub struct Arena {
    ledger: Ledger,
    policy: Policy,
    cursor: usize,
    total_size: u64,
    uuid: Uuid,
    metrics: ArenaMetrics,
    logger: Logger,
}
impl Arena {
    /// Makes an arena of `total_size` units with the default settings except for `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidSize` if `total_size` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use fitsim::arena::{Arena, BlockDescriptor, Policy};
    ///
    /// let mut arena = Arena::new(100, Policy::FirstFit).unwrap();
    /// let handle = arena.allocate(30).unwrap().unwrap();
    /// assert_eq!(arena.get(handle), Some(BlockDescriptor::new(0, 30, true)));
    ///
    /// arena.free(handle);
    /// assert_eq!(arena.snapshot(), vec![BlockDescriptor::new(0, 100, false)]);
    /// ```
    pub fn new(total_size: u64, policy: Policy) -> Result<Self> {
        track!(ArenaBuilder::new().policy(policy).finish(total_size))
    }

    /// Makes an arena whose policy is given by its tag (e.g., `"best_fit"`).
    ///
    /// # Errors
    ///
    /// - `ErrorKind::InvalidPolicy`: `policy` is not a known tag
    /// - `ErrorKind::InvalidSize`: `total_size` is zero
    pub fn with_policy_name(total_size: u64, policy: &str) -> Result<Self> {
        let policy = track!(policy.parse::<Policy>())?;
        track!(Self::new(total_size, policy))
    }

    /// Allocates a block of `size` units.
    ///
    /// `Ok(None)` is returned if no free block is large enough.
    /// The ledger is left unchanged in that case.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidInput` if `size` is zero.
    pub fn allocate(&mut self, size: u64) -> Result<Option<BlockHandle>> {
        track_assert!(size > 0, ErrorKind::InvalidInput, "Zero sized request");

        let index = match self.policy.find(&self.ledger, size, self.cursor) {
            None => {
                debug!(self.logger, "No space"; "size" => size);
                self.metrics.nospace_failures.increment();
                return Ok(None);
            }
            Some(index) => index,
        };
        if self.policy == Policy::NextFit {
            self.cursor = index;
        }

        let (offset, old_size) = {
            let b = self.ledger.get(index).expect("Never fails");
            (b.offset, b.size)
        };
        if old_size > size {
            debug!(self.logger, "Split block";
                   "offset" => offset, "size" => old_size, "request" => size);
            self.metrics.splits.increment();
        }
        let index = self.ledger.split(index, size);
        debug!(self.logger, "Allocated"; "offset" => offset, "size" => size);
        self.metrics.count_allocation(size);
        Ok(Some(self.ledger.handle(index)))
    }

    /// Frees the block referred by `handle` and coalesces it with its free neighbors.
    ///
    /// Returns the resulting (possibly merged) free block.
    ///
    /// If `handle` is stale (the block was already freed) or does not belong to this arena,
    /// nothing happens and `None` is returned.
    pub fn free(&mut self, handle: BlockHandle) -> Option<BlockDescriptor> {
        let index = match self.ledger.resolve(handle) {
            Some(index) if self.ledger.get(index).map_or(false, |b| b.allocated) => index,
            _ => {
                debug!(self.logger, "Nothing to free"; "handle" => handle.to_string());
                self.metrics.invalid_releases.increment();
                return None;
            }
        };

        let (offset, size) = {
            let b = self.ledger.get(index).expect("Never fails");
            (b.offset, b.size)
        };
        let merged = self.ledger.release(index);
        if !self.ledger.is_live(self.cursor) {
            self.cursor = merged.index;
        }
        self.metrics.count_releasion(size);
        self.metrics.merges.add_u64(merged.absorbed as u64);

        let block = self.ledger.get(merged.index).expect("Never fails").descriptor();
        debug!(self.logger, "Freed";
               "offset" => offset, "size" => size,
               "merged_offset" => block.offset, "merged_size" => block.size);
        Some(block)
    }

    /// Returns the block referred by `handle`, if it is still allocated.
    pub fn get(&self, handle: BlockHandle) -> Option<BlockDescriptor> {
        self.ledger
            .resolve(handle)
            .and_then(|index| self.ledger.get(index))
            .map(|b| b.descriptor())
    }

    /// Returns all the blocks in ascending offset order.
    pub fn snapshot(&self) -> Vec<BlockDescriptor> {
        self.blocks().collect()
    }

    /// Returns an iterator over the blocks in ascending offset order.
    pub fn blocks<'a>(&'a self) -> impl 'a + Iterator<Item = BlockDescriptor> {
        self.ledger.iter().map(|(_, b)| b.descriptor())
    }

    /// Returns the offset of the block where the next search starts.
    ///
    /// This is `None` unless the policy is `Policy::NextFit`.
    pub fn cursor_offset(&self) -> Option<u64> {
        if self.policy == Policy::NextFit {
            self.ledger.get(self.cursor).map(|b| b.offset)
        } else {
            None
        }
    }

    /// Returns the placement policy.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Returns the size of the arena.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Returns the UUID of the arena instance.
    pub fn instance_uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the metrics of the arena.
    pub fn metrics(&self) -> &ArenaMetrics {
        &self.metrics
    }

    /// Returns the usage statistics of the arena.
    pub fn stats(&self) -> ArenaStats {
        let mut stats = ArenaStats {
            total_size: self.total_size,
            used_size: 0,
            free_size: 0,
            blocks: 0,
            free_blocks: 0,
            largest_free_block: 0,
        };
        for b in self.blocks() {
            stats.blocks += 1;
            if b.allocated {
                stats.used_size += b.size;
            } else {
                stats.free_size += b.size;
                stats.free_blocks += 1;
                stats.largest_free_block = stats.largest_free_block.max(b.size);
            }
        }
        stats
    }

    /// Verifies the consistency of the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InconsistentState` if the blocks do not tile
    /// the arena exactly, if a block is empty, if two adjacent blocks are both free,
    /// or if the forward and backward links between neighbors disagree.
    pub fn check_invariants(&self) -> Result<()> {
        let mut end = 0;
        let mut prev_free = false;
        let mut prev_index = None;
        let mut count = 0;
        for (index, block) in self.ledger.iter() {
            let b = block.descriptor();
            track_assert!(b.size > 0, ErrorKind::InconsistentState, "Empty block: {}", b);
            track_assert_eq!(b.offset, end, ErrorKind::InconsistentState, "Gap or overlap: {}", b);
            track_assert!(
                !(prev_free && b.is_free()),
                ErrorKind::InconsistentState,
                "Uncoalesced free block: {}",
                b
            );
            track_assert_eq!(
                block.prev,
                prev_index,
                ErrorKind::InconsistentState,
                "Broken back link: {}",
                b
            );
            end = b.end();
            prev_free = b.is_free();
            prev_index = Some(index);
            count += 1;
        }
        track_assert_eq!(end, self.total_size, ErrorKind::InconsistentState);
        track_assert_eq!(count, self.ledger.len(), ErrorKind::InconsistentState);
        track_assert!(
            self.ledger.is_live(self.cursor),
            ErrorKind::InconsistentState,
            "Dangling cursor: {}",
            self.cursor
        );
        Ok(())
    }
}

/// Usage statistics of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Size of the arena.
    pub total_size: u64,

    /// Sum of the sizes of the allocated blocks.
    pub used_size: u64,

    /// Sum of the sizes of the free blocks.
    pub free_size: u64,

    /// Number of blocks.
    pub blocks: usize,

    /// Number of free blocks.
    pub free_blocks: usize,

    /// Size of the largest free block (`0` if there is none).
    pub largest_free_block: u64,
}

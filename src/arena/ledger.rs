//! Block ledger.
//!
//! The ledger is an index-linked slab: every block lives in a slot of `slots`,
//! and neighbors are addressed by slot index.
//! Walking `next` from `head` visits the blocks in ascending offset order.
//!
//! Each slot carries a generation counter, which is bumped whenever the block stored in it
//! is released or absorbed by a neighbor. A `BlockHandle` resolves only while
//! its generation matches that of the slot.
//! Every ledger also gets a process-wide unique id, so handles issued by one ledger
//! never resolve in another.
use std::sync::atomic::{AtomicU64, Ordering};

use super::block::{BlockDescriptor, BlockHandle};

static NEXT_LEDGER_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct Block {
    pub offset: u64,
    pub size: u64,
    pub allocated: bool,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}
impl Block {
    pub fn fits(&self, size: u64) -> bool {
        !self.allocated && self.size >= size
    }

    pub fn descriptor(&self) -> BlockDescriptor {
        BlockDescriptor::new(self.offset, self.size, self.allocated)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    block: Option<Block>,
}

/// Result of releasing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merged {
    /// Slot index of the surviving free block.
    pub index: usize,

    /// Number of blocks absorbed into the survivor.
    pub absorbed: usize,
}

#[derive(Debug)]
pub struct Ledger {
    id: u64,
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    head: usize,
    len: usize,
}
impl Ledger {
    /// Makes a ledger consisting of a single free block of `total_size`.
    ///
    /// `total_size` must be positive.
    pub fn new(total_size: u64) -> Self {
        debug_assert!(total_size > 0);
        let head = Block {
            offset: 0,
            size: total_size,
            allocated: false,
            prev: None,
            next: None,
        };
        Ledger {
            id: NEXT_LEDGER_ID.fetch_add(1, Ordering::Relaxed),
            slots: vec![Slot {
                generation: 0,
                block: Some(head),
            }],
            vacant: Vec::new(),
            head: 0,
            len: 1,
        }
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.slots.get(index).and_then(|s| s.block.as_ref())
    }

    pub fn is_live(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn handle(&self, index: usize) -> BlockHandle {
        BlockHandle::new(self.id, index, self.slots[index].generation)
    }

    /// Resolves `handle` to a slot index, if it still refers to a live block.
    pub fn resolve(&self, handle: BlockHandle) -> Option<usize> {
        if handle.arena != self.id {
            return None;
        }
        let slot = self.slots.get(handle.index())?;
        if slot.generation == handle.generation && slot.block.is_some() {
            Some(handle.index())
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.slots.get_mut(index).and_then(|s| s.block.as_mut())
    }

    pub fn next_of(&self, index: usize) -> Option<usize> {
        self.block(index).next
    }

    /// Iterates over `(slot index, block)` pairs in offset order.
    pub fn iter(&self) -> Iter {
        Iter {
            ledger: self,
            current: Some(self.head),
        }
    }

    /// Carves `size` units out of the front of the free block at `index` and marks it allocated.
    ///
    /// If the block is larger than `size`, the remainder becomes a new free block placed right after it.
    /// Returns `index`, which now refers to the allocated block.
    ///
    /// # Panics
    ///
    /// Panics if the block is allocated or smaller than `size`.
    pub fn split(&mut self, index: usize, size: u64) -> usize {
        let (offset, old_size, next) = {
            let b = self.block(index);
            assert!(b.fits(size), "{:?}, size={}", b, size);
            (b.offset, b.size, b.next)
        };

        if old_size > size {
            let remainder = self.insert(Block {
                offset: offset + size,
                size: old_size - size,
                allocated: false,
                prev: Some(index),
                next,
            });
            if let Some(next) = next {
                self.block_mut(next).prev = Some(remainder);
            }
            let b = self.block_mut(index);
            b.next = Some(remainder);
            b.size = size;
        }
        self.block_mut(index).allocated = true;
        index
    }

    /// Marks the allocated block at `index` free and coalesces it with its free neighbors.
    ///
    /// # Panics
    ///
    /// Panics if the block is not allocated.
    pub fn release(&mut self, index: usize) -> Merged {
        assert!(self.block(index).allocated, "{:?}", self.block(index));
        self.block_mut(index).allocated = false;
        self.bump_generation(index);

        let mut current = index;
        let mut absorbed = 0;

        // forward
        while let Some(next) = self.free_neighbor(self.block(current).next) {
            let (size, next_next) = {
                let b = self.block(next);
                (b.size, b.next)
            };
            self.block_mut(current).size += size;
            self.unlink(current, next, next_next);
            absorbed += 1;
        }

        // backward
        while let Some(prev) = self.free_neighbor(self.block(current).prev) {
            let (size, next) = {
                let b = self.block(current);
                (b.size, b.next)
            };
            self.block_mut(prev).size += size;
            self.unlink(prev, current, next);
            absorbed += 1;
            current = prev;
        }

        Merged {
            index: current,
            absorbed,
        }
    }

    fn free_neighbor(&self, neighbor: Option<usize>) -> Option<usize> {
        neighbor.filter(|&i| !self.block(i).allocated)
    }

    // Removes `victim` which sits between `survivor` and `next`.
    fn unlink(&mut self, survivor: usize, victim: usize, next: Option<usize>) {
        self.block_mut(survivor).next = next;
        if let Some(next) = next {
            self.block_mut(next).prev = Some(survivor);
        }
        self.vacate(victim);
    }

    fn insert(&mut self, block: Block) -> usize {
        self.len += 1;
        if let Some(index) = self.vacant.pop() {
            debug_assert!(self.slots[index].block.is_none());
            self.slots[index].block = Some(block);
            index
        } else {
            self.slots.push(Slot {
                generation: 0,
                block: Some(block),
            });
            self.slots.len() - 1
        }
    }

    fn vacate(&mut self, index: usize) {
        debug_assert_ne!(index, self.head);
        self.len -= 1;
        self.slots[index].block = None;
        self.bump_generation(index);
        self.vacant.push(index);
    }

    fn bump_generation(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
    }

    fn block(&self, index: usize) -> &Block {
        self.slots[index].block.as_ref().expect("Never fails")
    }

    fn block_mut(&mut self, index: usize) -> &mut Block {
        self.slots[index].block.as_mut().expect("Never fails")
    }
}

#[derive(Debug)]
pub struct Iter<'a> {
    ledger: &'a Ledger,
    current: Option<usize>,
}
impl<'a> Iterator for Iter<'a> {
    type Item = (usize, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current?;
        let block = self.ledger.block(index);
        self.current = block.next;
        Some((index, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(ledger: &Ledger) -> Vec<(u64, u64, bool)> {
        ledger
            .iter()
            .map(|(_, b)| (b.offset, b.size, b.allocated))
            .collect()
    }

    #[test]
    fn split_works() {
        let mut ledger = Ledger::new(100);
        let a = ledger.split(ledger.head(), 30);
        assert_eq!(a, 0);
        assert_eq!(layout(&ledger), [(0, 30, true), (30, 70, false)]);
        assert_eq!(ledger.len(), 2);

        // exact fit does not add a block
        let rest = ledger.next_of(a).unwrap();
        ledger.split(rest, 70);
        assert_eq!(layout(&ledger), [(0, 30, true), (30, 70, true)]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    #[should_panic]
    fn split_too_large() {
        let mut ledger = Ledger::new(10);
        ledger.split(0, 11);
    }

    #[test]
    fn release_merges_both_sides() {
        let mut ledger = Ledger::new(100);
        let a = ledger.split(0, 10);
        let b = ledger.split(ledger.next_of(a).unwrap(), 20);
        let c = ledger.split(ledger.next_of(b).unwrap(), 30);
        assert_eq!(ledger.len(), 4);

        let merged = ledger.release(a);
        assert_eq!(merged, Merged { index: a, absorbed: 0 });
        let merged = ledger.release(c);
        assert_eq!(merged, Merged { index: c, absorbed: 1 });
        assert_eq!(
            layout(&ledger),
            [(0, 10, false), (10, 20, true), (30, 70, false)]
        );

        let merged = ledger.release(b);
        assert_eq!(merged, Merged { index: a, absorbed: 2 });
        assert_eq!(layout(&ledger), [(0, 100, false)]);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_live(b));
        assert!(!ledger.is_live(c));
    }

    #[test]
    fn vacant_slots_are_reused_with_new_generation() {
        let mut ledger = Ledger::new(100);
        let a = ledger.split(0, 10);
        let b = ledger.split(ledger.next_of(a).unwrap(), 10);
        let stale = ledger.handle(b);
        ledger.release(b); // absorbs the tail remainder
        ledger.release(a); // absorbs `b`
        assert_eq!(ledger.resolve(stale), None);

        let a = ledger.split(0, 10);
        let b = ledger.split(ledger.next_of(a).unwrap(), 10);
        assert_eq!(ledger.resolve(stale), None);
        assert_eq!(ledger.resolve(ledger.handle(b)), Some(b));
    }

    #[test]
    fn foreign_handle_does_not_resolve() {
        let mut mine = Ledger::new(100);
        let mut other = Ledger::new(100);
        let a = mine.split(mine.head(), 30);
        let b = other.split(other.head(), 10);
        assert_eq!((a, b), (0, 0));

        let foreign = other.handle(b);
        assert_eq!((foreign.index(), foreign.generation), (0, 0));
        assert_eq!(mine.resolve(foreign), None);
        assert_eq!(mine.resolve(mine.handle(a)), Some(a));
    }

    #[test]
    fn released_handle_goes_stale_even_without_merge() {
        let mut ledger = Ledger::new(100);
        let a = ledger.split(0, 10);
        let b = ledger.split(ledger.next_of(a).unwrap(), 10);
        let _c = ledger.split(ledger.next_of(b).unwrap(), 80);

        let handle = ledger.handle(b);
        ledger.release(b);
        assert_eq!(ledger.resolve(handle), None);

        // the same slot is reused for a new allocation
        ledger.split(b, 10);
        assert_eq!(ledger.resolve(handle), None);
        assert_eq!(ledger.resolve(ledger.handle(b)), Some(b));
    }
}

use std::fmt;
use std::str::FromStr;
use trackable::error::ErrorKindExt;

use super::ledger::Ledger;
use crate::{Error, ErrorKind, Result};

/// Placement policy, i.e., the strategy used to pick a free block for a request.
///
/// All policies scan the ledger linearly in offset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Picks the first free block that is large enough.
    FirstFit,

    /// Like `FirstFit`, but starts scanning at the block of the previous successful search
    /// and wraps around to the head of the arena.
    NextFit,

    /// Picks the smallest free block that is large enough.
    ///
    /// Ties are broken by the lowest offset.
    BestFit,

    /// Picks the largest free block that is large enough.
    ///
    /// Ties are broken by the lowest offset.
    WorstFit,
}
impl Policy {
    /// All the policies.
    pub const ALL: [Policy; 4] = [
        Policy::FirstFit,
        Policy::NextFit,
        Policy::BestFit,
        Policy::WorstFit,
    ];

    /// Returns the tag of the policy (e.g., `"first_fit"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Policy::FirstFit => "first_fit",
            Policy::NextFit => "next_fit",
            Policy::BestFit => "best_fit",
            Policy::WorstFit => "worst_fit",
        }
    }

    /// Searches `ledger` for a free block of at least `size` units.
    ///
    /// `cursor` is the slot index where a `NextFit` search starts; other policies ignore it.
    pub(crate) fn find(self, ledger: &Ledger, size: u64, cursor: usize) -> Option<usize> {
        match self {
            Policy::FirstFit => first_fit(ledger, size),
            Policy::NextFit => next_fit(ledger, size, cursor),
            Policy::BestFit => best_fit(ledger, size),
            Policy::WorstFit => worst_fit(ledger, size),
        }
    }
}
impl Default for Policy {
    fn default() -> Self {
        Policy::FirstFit
    }
}
impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for Policy {
    type Err = Error;

    /// Parses a policy tag.
    ///
    /// Matching is case-insensitive, and `-` may be used in place of `_`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidPolicy` if the tag is unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use fitsim::ErrorKind;
    /// use fitsim::arena::Policy;
    ///
    /// assert_eq!("best_fit".parse::<Policy>().ok(), Some(Policy::BestFit));
    /// assert_eq!("Next-Fit".parse::<Policy>().ok(), Some(Policy::NextFit));
    /// assert_eq!("buddy".parse::<Policy>().err().map(|e| *e.kind()),
    ///            Some(ErrorKind::InvalidPolicy));
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase().replace('-', "_");
        match tag.as_str() {
            "first_fit" => Ok(Policy::FirstFit),
            "next_fit" => Ok(Policy::NextFit),
            "best_fit" => Ok(Policy::BestFit),
            "worst_fit" => Ok(Policy::WorstFit),
            _ => Err(ErrorKind::InvalidPolicy
                .cause(format!("Unknown policy: {:?}", s))
                .into()),
        }
    }
}

fn first_fit(ledger: &Ledger, size: u64) -> Option<usize> {
    ledger
        .iter()
        .find(|(_, b)| b.fits(size))
        .map(|(index, _)| index)
}

fn next_fit(ledger: &Ledger, size: u64, cursor: usize) -> Option<usize> {
    // from the cursor (inclusive) to the tail
    let mut current = Some(cursor);
    while let Some(index) = current {
        let block = ledger.get(index)?;
        if block.fits(size) {
            return Some(index);
        }
        current = block.next;
    }

    // from the head up to the cursor (exclusive)
    ledger
        .iter()
        .take_while(|&(index, _)| index != cursor)
        .find(|(_, b)| b.fits(size))
        .map(|(index, _)| index)
}

fn best_fit(ledger: &Ledger, size: u64) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, block) in ledger.iter().filter(|(_, b)| b.fits(size)) {
        if best.map_or(true, |(_, best_size)| block.size < best_size) {
            best = Some((index, block.size));
        }
    }
    best.map(|(index, _)| index)
}

fn worst_fit(ledger: &Ledger, size: u64) -> Option<usize> {
    let mut worst: Option<(usize, u64)> = None;
    for (index, block) in ledger.iter().filter(|(_, b)| b.fits(size)) {
        if worst.map_or(true, |(_, worst_size)| block.size > worst_size) {
            worst = Some((index, block.size));
        }
    }
    worst.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    // [free 50][allocated 10][free 20][allocated 10][free 80]
    fn fragmented() -> Ledger {
        let mut ledger = Ledger::new(170);
        let a = ledger.split(ledger.head(), 50);
        let s = ledger.split(ledger.next_of(a).unwrap(), 10);
        let b = ledger.split(ledger.next_of(s).unwrap(), 20);
        ledger.split(ledger.next_of(b).unwrap(), 10);
        ledger.release(a);
        ledger.release(b);
        ledger
    }

    fn offset(ledger: &Ledger, index: Option<usize>) -> Option<u64> {
        index.and_then(|i| ledger.get(i)).map(|b| b.offset)
    }

    #[test]
    fn selection_works() {
        let ledger = fragmented();
        let layout = ledger
            .iter()
            .map(|(_, b)| (b.offset, b.size, b.allocated))
            .collect::<Vec<_>>();
        assert_eq!(
            layout,
            [
                (0, 50, false),
                (50, 10, true),
                (60, 20, false),
                (80, 10, true),
                (90, 80, false)
            ]
        );

        let head = ledger.head();
        assert_eq!(offset(&ledger, Policy::FirstFit.find(&ledger, 15, head)), Some(0));
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 15, head)), Some(0));
        assert_eq!(offset(&ledger, Policy::BestFit.find(&ledger, 15, head)), Some(60));
        assert_eq!(offset(&ledger, Policy::WorstFit.find(&ledger, 15, head)), Some(90));

        assert_eq!(offset(&ledger, Policy::FirstFit.find(&ledger, 60, head)), Some(90));
        assert_eq!(offset(&ledger, Policy::BestFit.find(&ledger, 50, head)), Some(0));
        for &policy in &Policy::ALL {
            assert_eq!(policy.find(&ledger, 81, head), None);
        }
    }

    #[test]
    fn ties_go_to_the_lowest_offset() {
        // [free 20][allocated 10][free 20][allocated 10][free 20]
        let mut ledger = Ledger::new(80);
        let a = ledger.split(ledger.head(), 20);
        let s = ledger.split(ledger.next_of(a).unwrap(), 10);
        let b = ledger.split(ledger.next_of(s).unwrap(), 20);
        ledger.split(ledger.next_of(b).unwrap(), 10);
        ledger.release(a);
        ledger.release(b);

        let head = ledger.head();
        assert_eq!(offset(&ledger, Policy::BestFit.find(&ledger, 5, head)), Some(0));
        assert_eq!(offset(&ledger, Policy::WorstFit.find(&ledger, 5, head)), Some(0));
    }

    #[test]
    fn next_fit_starts_at_the_cursor() {
        let ledger = fragmented();
        let indices = ledger.iter().map(|(i, _)| i).collect::<Vec<_>>();

        let cursor = indices[2];
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 15, cursor)), Some(60));
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 30, cursor)), Some(90));

        let cursor = indices[1];
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 15, cursor)), Some(60));
    }

    #[test]
    fn next_fit_wraps_around() {
        // [free 50][allocated 10][free 20][allocated 90]
        let mut ledger = Ledger::new(170);
        let a = ledger.split(ledger.head(), 50);
        let s = ledger.split(ledger.next_of(a).unwrap(), 10);
        let b = ledger.split(ledger.next_of(s).unwrap(), 20);
        let tail = ledger.split(ledger.next_of(b).unwrap(), 90);
        ledger.release(a);
        ledger.release(b);

        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 30, tail)), Some(0));
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 30, b)), Some(0));
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 15, b)), Some(60));
        assert_eq!(Policy::NextFit.find(&ledger, 60, s), None);
        assert_eq!(Policy::NextFit.find(&ledger, 60, tail), None);
    }

    #[test]
    fn next_fit_cursor_is_the_only_fit() {
        let ledger = fragmented();
        let indices = ledger.iter().map(|(i, _)| i).collect::<Vec<_>>();
        let cursor = indices[4];
        assert_eq!(offset(&ledger, Policy::NextFit.find(&ledger, 80, cursor)), Some(90));
    }

    #[test]
    fn parse_works() {
        for &policy in &Policy::ALL {
            assert_eq!(policy.to_string().parse::<Policy>().ok(), Some(policy));
        }
        assert_eq!(" WORST_FIT ".parse::<Policy>().ok(), Some(Policy::WorstFit));
        assert_eq!(
            "".parse::<Policy>().err().map(|e| *e.kind()),
            Some(ErrorKind::InvalidPolicy)
        );
        assert_eq!(
            "firstfit".parse::<Policy>().err().map(|e| *e.kind()),
            Some(ErrorKind::InvalidPolicy)
        );
    }
}

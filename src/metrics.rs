//! Metrics for [Prometheus][prometheus].
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, MetricBuilder};

use crate::arena::Policy;

/// Metrics of an arena.
#[derive(Debug, Clone)]
pub struct ArenaMetrics {
    pub(crate) allocated_blocks: Counter,
    pub(crate) allocated_units: Counter,
    pub(crate) released_blocks: Counter,
    pub(crate) released_units: Counter,
    pub(crate) nospace_failures: Counter,
    pub(crate) invalid_releases: Counter,
    pub(crate) splits: Counter,
    pub(crate) merges: Counter,
    pub(crate) policy: Policy,
    pub(crate) total_size: u64,
}
impl ArenaMetrics {
    /// Number of successful allocations.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_allocated_blocks_total { policy="..." } <COUNTER>
    /// ```
    pub fn allocated_blocks(&self) -> u64 {
        self.allocated_blocks.value() as u64
    }

    /// Number of units handed out so far.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_allocated_units_total { policy="..." } <COUNTER>
    /// ```
    pub fn allocated_units(&self) -> u64 {
        self.allocated_units.value() as u64
    }

    /// Number of blocks freed.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_released_blocks_total { policy="..." } <COUNTER>
    /// ```
    pub fn released_blocks(&self) -> u64 {
        self.released_blocks.value() as u64
    }

    /// Number of units returned so far.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_released_units_total { policy="..." } <COUNTER>
    /// ```
    pub fn released_units(&self) -> u64 {
        self.released_units.value() as u64
    }

    /// Number of allocation failures caused by no available block.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_nospace_failures_total { policy="..." } <COUNTER>
    /// ```
    pub fn nospace_failures(&self) -> u64 {
        self.nospace_failures.value() as u64
    }

    /// Number of `free` calls with a stale or already-free handle.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_invalid_releases_total { policy="..." } <COUNTER>
    /// ```
    pub fn invalid_releases(&self) -> u64 {
        self.invalid_releases.value() as u64
    }

    /// Number of free blocks split by allocations.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_splits_total { policy="..." } <COUNTER>
    /// ```
    pub fn splits(&self) -> u64 {
        self.splits.value() as u64
    }

    /// Number of blocks absorbed by coalescing.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_merges_total { policy="..." } <COUNTER>
    /// ```
    pub fn merges(&self) -> u64 {
        self.merges.value() as u64
    }

    /// Units currently allocated.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// fitsim_arena_allocated_units_total - fitsim_arena_released_units_total
    /// ```
    pub fn usage_units(&self) -> u64 {
        // NOTE: reading in the other order may underflow
        let dec = self.released_units();
        let inc = self.allocated_units();
        inc - dec
    }

    /// Size of the arena.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Placement policy of the arena.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub(crate) fn new(builder: &MetricBuilder, total_size: u64, policy: Policy) -> Self {
        let mut builder = builder.clone();
        builder.namespace("fitsim").subsystem("arena");
        ArenaMetrics {
            allocated_blocks: builder
                .counter("allocated_blocks_total")
                .help("Number of allocated blocks")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            allocated_units: builder
                .counter("allocated_units_total")
                .help("Number of allocated units")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            released_blocks: builder
                .counter("released_blocks_total")
                .help("Number of released blocks")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            released_units: builder
                .counter("released_units_total")
                .help("Number of released units")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            nospace_failures: builder
                .counter("nospace_failures_total")
                .help("Number of allocation failures caused by no available space")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            invalid_releases: builder
                .counter("invalid_releases_total")
                .help("Number of releases of stale or already free blocks")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            splits: builder
                .counter("splits_total")
                .help("Number of split free blocks")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            merges: builder
                .counter("merges_total")
                .help("Number of blocks absorbed by coalescing")
                .label("policy", policy.as_str())
                .finish()
                .expect("Never fails"),
            policy,
            total_size,
        }
    }

    pub(crate) fn count_allocation(&self, size: u64) {
        self.allocated_blocks.increment();
        self.allocated_units.add_u64(size);
    }

    pub(crate) fn count_releasion(&self, size: u64) {
        self.released_blocks.increment();
        self.released_units.add_u64(size);
    }
}

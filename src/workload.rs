//! Process workloads driven against an arena.
//!
//! A [Workload] is a list of named processes with their memory demands,
//! either given explicitly or drawn at random by a [WorkloadBuilder].
//! A [Simulation] places the processes into an arena one by one and keeps track of
//! which block belongs to which process, so that processes can be freed by index later.
//!
//! Sizes are expressed in MB.
//!
//! [Workload]: ./struct.Workload.html
//! [WorkloadBuilder]: ./struct.WorkloadBuilder.html
//! [Simulation]: ./struct.Simulation.html
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slog::{Discard, Logger};
use std::cmp;
use std::fmt;

use crate::arena::{Arena, BlockDescriptor, BlockHandle};
use crate::map::MemoryMap;
use crate::{ErrorKind, Result};

/// A process requesting a contiguous block of memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    /// Name of the process.
    pub name: String,

    /// Requested size.
    pub size: u64,
}
impl Process {
    /// Makes a new `Process` instance named after its position in a workload (e.g., `"Process 3"`).
    pub fn new(index: usize, size: u64) -> Self {
        Process {
            name: format!("Process {}", index),
            size,
        }
    }
}

/// Ordered list of processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    processes: Vec<Process>,
}
impl Workload {
    /// Makes a workload from explicit sizes.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidInput` if any size is zero.
    pub fn from_sizes<I>(sizes: I) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut processes = Vec::new();
        for (i, size) in sizes.into_iter().enumerate() {
            track_assert!(size > 0, ErrorKind::InvalidInput, "Process {}: zero size", i);
            processes.push(Process::new(i, size));
        }
        Ok(Workload { processes })
    }

    /// Returns the processes.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Returns the number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` if the workload has no processes.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Builder of random `Workload`s.
#[derive(Debug, Clone)]
pub struct WorkloadBuilder {
    processes: usize,
    min_size: u64,
    max_size: Option<u64>,
    seed: Option<u64>,
}
impl WorkloadBuilder {
    /// Default minimum size of a process.
    pub const DEFAULT_MIN_SIZE: u64 = 10;

    /// Makes a new `WorkloadBuilder` instance with the default settings.
    pub fn new() -> Self {
        WorkloadBuilder {
            processes: 10,
            min_size: Self::DEFAULT_MIN_SIZE,
            max_size: None,
            seed: None,
        }
    }

    /// Sets the number of processes to generate.
    ///
    /// The default value is `10`.
    pub fn processes(&mut self, n: usize) -> &mut Self {
        self.processes = n;
        self
    }

    /// Sets the minimum size of a process.
    ///
    /// The default value is `WorkloadBuilder::DEFAULT_MIN_SIZE`.
    pub fn min_size(&mut self, size: u64) -> &mut Self {
        self.min_size = size;
        self
    }

    /// Sets the maximum size of a process.
    ///
    /// By default, a quarter of the arena size is used.
    /// The maximum is raised to the minimum size if it falls below it.
    pub fn max_size(&mut self, size: u64) -> &mut Self {
        self.max_size = Some(size);
        self
    }

    /// Sets the seed of the random number generator.
    ///
    /// Workloads generated with the same seed and settings are identical.
    /// If this method is not called, the generator is seeded from the OS.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Generates a workload for an arena of `total_size`.
    ///
    /// Each process size is drawn uniformly from `[min_size, max_size]`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidInput` if the minimum size is zero.
    pub fn generate(&self, total_size: u64) -> Result<Workload> {
        track_assert!(self.min_size > 0, ErrorKind::InvalidInput);
        let max_size = cmp::max(self.max_size.unwrap_or(total_size / 4), self.min_size);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let processes = (0..self.processes)
            .map(|i| Process::new(i, rng.gen_range(self.min_size..=max_size)))
            .collect();
        Ok(Workload { processes })
    }
}
impl Default for WorkloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of placing a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The process was placed at `offset`.
    Allocated {
        /// Offset of the allocated block.
        offset: u64,
    },

    /// No free block was large enough.
    Failed,
}

/// Result of freeing a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The block of the process was freed; the resulting (merged) free block is attached.
    Freed(BlockDescriptor),

    /// The process has already been freed.
    AlreadyFree,

    /// There is no such process, or it was never allocated.
    Unknown,
}

#[derive(Debug)]
struct Entry {
    process: Process,
    handle: Option<BlockHandle>,
}

/// Placement of processes into an arena.
#[derive(Debug)]
pub struct Simulation {
    arena: Arena,
    entries: Vec<Entry>,
    logger: Logger,
}
impl Simulation {
    /// Makes a new `Simulation` instance working on `arena`.
    pub fn new(arena: Arena) -> Self {
        Simulation {
            arena,
            entries: Vec::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// Sets the logger.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Places every process of `workload` in order.
    pub fn run(&mut self, workload: &Workload) -> Result<SimulationReport> {
        let mut report = SimulationReport::default();
        for process in workload.processes() {
            let outcome = track!(self.allocate(process.clone()))?;
            report.entries.push((process.clone(), outcome));
        }
        info!(self.logger, "Workload placed";
              "processes" => workload.len(), "failures" => report.failures());
        Ok(report)
    }

    /// Places a single process.
    ///
    /// The process can later be freed by its index, which is the number of processes
    /// submitted before it.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidInput` if the process size is zero.
    pub fn allocate(&mut self, process: Process) -> Result<Outcome> {
        let handle = track!(self.arena.allocate(process.size))?;
        let outcome = match handle.and_then(|h| self.arena.get(h)) {
            Some(block) => Outcome::Allocated {
                offset: block.offset,
            },
            None => Outcome::Failed,
        };
        debug!(self.logger, "Process placed";
               "process" => &process.name, "size" => process.size, "outcome" => format!("{:?}", outcome));
        self.entries.push(Entry { process, handle });
        Ok(outcome)
    }

    /// Frees the process at `index`.
    ///
    /// `index` is the submission index of the process, counting the processes whose
    /// placement failed too. Such processes keep their index and report `Release::Unknown`,
    /// so the indices of placed processes do not shift. Use `Simulation::allocated` to list
    /// the indices that can be freed.
    pub fn free(&mut self, index: usize) -> Release {
        let handle = match self.entries.get(index).and_then(|e| e.handle) {
            None => return Release::Unknown,
            Some(handle) => handle,
        };
        match self.arena.free(handle) {
            Some(block) => {
                debug!(self.logger, "Process freed"; "process" => &self.entries[index].process.name);
                Release::Freed(block)
            }
            None => Release::AlreadyFree,
        }
    }

    /// Returns the processes currently holding a block, with their indices.
    pub fn allocated(&self) -> Vec<(usize, &Process, BlockDescriptor)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                e.handle
                    .and_then(|h| self.arena.get(h))
                    .map(|b| (i, &e.process, b))
            })
            .collect()
    }

    /// Returns the memory map of the arena.
    pub fn memory_map(&self) -> MemoryMap {
        MemoryMap::new(&self.arena)
    }

    /// Returns a reference to the arena.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Takes the arena out of the simulation.
    pub fn into_arena(self) -> Arena {
        self.arena
    }
}

/// Per-process outcomes of `Simulation::run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    entries: Vec<(Process, Outcome)>,
}
impl SimulationReport {
    /// Returns the outcomes in submission order.
    pub fn entries(&self) -> &[(Process, Outcome)] {
        &self.entries
    }

    /// Returns the number of processes that could not be placed.
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| *o == Outcome::Failed)
            .count()
    }
}
impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (process, outcome) in &self.entries {
            match *outcome {
                Outcome::Allocated { offset } => writeln!(
                    f,
                    "✓ {}: Allocated {} MB at offset {}",
                    process.name, process.size, offset
                )?,
                Outcome::Failed => writeln!(
                    f,
                    "✗ {}: FAILED to allocate {} MB (insufficient memory)",
                    process.name, process.size
                )?,
            }
        }
        Ok(())
    }
}

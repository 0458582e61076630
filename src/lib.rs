//! Contiguous memory allocation simulator.
//!
//! `fitsim` models how an operating system satisfies allocation requests against
//! a fixed-size, contiguous address space (an *arena*).
//!
//! # Features
//!
//! - Four placement policies: first-fit, next-fit, best-fit and worst-fit
//! - Free blocks are split on allocation and coalesced with their free neighbors on release
//! - Allocated blocks are referred by generation-checked handles, so stale handles are detected
//! - Running out of space is a normal outcome (`Ok(None)`), not an error
//! - Random workloads and memory map rendering for driving and observing simulations
//!
//! # Module dependencies
//!
//! ```text
//! workload => map => arena
//! ```
//!
//! - [arena] module:
//!   - provides the [Arena] struct, i.e., the block ledger and the placement policies
//! - [map] module:
//!   - renders the blocks of an arena as a table
//! - [workload] module:
//!   - generates process workloads and places them into an arena
//!
//! # Examples
//!
//! ```
//! use fitsim::arena::{Arena, BlockDescriptor, Policy};
//!
//! let mut arena = Arena::new(100, Policy::FirstFit).unwrap();
//! let first = arena.allocate(30).unwrap().unwrap();
//! let second = arena.allocate(50).unwrap().unwrap();
//!
//! arena.free(first);
//! assert_eq!(arena.snapshot(), vec![
//!     BlockDescriptor::new(0, 30, false),
//!     BlockDescriptor::new(30, 50, true),
//!     BlockDescriptor::new(80, 20, false),
//! ]);
//!
//! arena.free(second);
//! assert_eq!(arena.snapshot(), vec![BlockDescriptor::new(0, 100, false)]);
//! ```
//!
//! [arena]: ./arena/index.html
//! [Arena]: ./arena/struct.Arena.html
//! [map]: ./map/index.html
//! [workload]: ./workload/index.html
#![warn(missing_docs)]
extern crate prometrics;
extern crate rand;
#[macro_use]
extern crate trackable;
extern crate uuid;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};

pub mod arena;
pub mod map;
pub mod metrics;
pub mod workload;

mod error;

/// Crate-specific `Result` type.
pub type Result<T> = std::result::Result<T, Error>;

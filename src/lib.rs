//! # Resource-constrained project scheduling
//! This crate is dedicated to the **Resource-Constrained Project Scheduling Problem** (RCPSP),
//! denoted `PS|prec|C_max`.
//!
//! ## Assumptions
//!  - Tasks are non-preemptive and have integral, non-negative durations
//!  - Resources are renewable: each has a constant capacity available in every time unit
//!  - Precedences are *finish-to-start*: an edge `a -> b` requires `e[a] <= s[b]`
//!  - The objective is to **minimize the maximum completion time** (makespan)
//!
//! ## Components
//!
//! ### Precedence graph
//! The task precedence relation is given as a [`PrecedenceGraph`](prec::PrecedenceGraph). It
//! produces a deterministic topological order (ties broken by ascending task index) and rejects
//! cycles with [`Error::CycleDetected`].
//!
//! ### Schedule evaluator
//! [`cpm::forward_pass`] computes start times, end times and the makespan of a task processing
//! order. Evaluated on the topological order this is the *Critical Path Method* (CPM) earliest
//! schedule, which is completed by [`cpm::critical_path`] with latest start times and slack.
//!
//! ### Resource validator
//! [`resource::validate`] accumulates the per-time-unit demand of a schedule and reports the
//! earliest time unit (and resource) whose capacity is exceeded.
//!
//! ### Genetic optimizer
//! [`ga::GeneticOptimizer`] evolves a population of task orderings using the schedule evaluator
//! as the fitness function and returns the best ordering found.
//!
//! ## Example
//! ```
//! # extern crate rcpsp;
//! use rcpsp::{Instance, Resource, Task};
//!
//! // A -> B, A -> C
//! let tasks = vec![
//!     Task::new(1, 2u32, vec![1]),
//!     Task::new(2, 3, vec![1]),
//!     Task::new(3, 1, vec![1]),
//! ];
//! let resources = vec![Resource::new("R1", 2)];
//! let instance = Instance::new(tasks, resources, [(0, 1), (0, 2)]).expect("DAG");
//!
//! let schedule = instance.earliest_schedule();
//! assert_eq!(schedule.s, vec![0, 2, 2]);
//! assert_eq!(schedule.c, 5);
//!
//! let feasibility = instance.validate(&schedule).expect("known resources");
//! assert!(feasibility.is_valid());
//! ```
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::iter::Sum;

use num_traits::{PrimInt, Unsigned};

pub mod cpm;
pub mod error;
pub mod ga;
pub mod loader;
pub mod model;
pub mod prec;
pub mod resource;

pub use error::{Error, Result};
pub use model::{Instance, Resource, Task};

/// Time domain of durations, start times and makespans.
///
/// Any unsigned primitive integer qualifies, e.g. `u8`, `u32` or `u64`.
pub trait Time: PrimInt + Unsigned + Hash + Sum + Default + Debug + Display {}

impl<T> Time for T where T: PrimInt + Unsigned + Hash + Sum + Default + Debug + Display {}

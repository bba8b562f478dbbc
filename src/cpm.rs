//! # Schedule evaluation
//! Precedence-aware forward scheduling of tasks with unlimited resources, i.e. the
//! *Critical Path Method* (CPM) for `PS∞|prec|C_max`.
//!
//! The central piece is [`forward_pass`] which is a pure function of a task processing order, the
//! processing times and the precedence relation. It serves both as the CPM baseline scheduler
//! (when given a topological order) and as the fitness function of the genetic optimizer (when
//! given an arbitrary task ordering).
use std::cmp::max;

use crate::prec::PrecedenceGraph;
use crate::{Instance, Time};

use itertools::Itertools;

/// Task start and end times with corresponding makespan value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schedule<T> {
    /// the starting time `s[j]` for each task `j`
    pub s: Vec<T>,
    /// the completion time `e[j] = s[j] + p[j]` for each task `j`
    pub e: Vec<T>,
    /// maximum completion time (a.k.a the **makespan**)
    pub c: T,
}

impl<T: Time> Schedule<T> {
    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    /// List all precedence edges `(a, b)` of `prec` which this schedule violates, i.e. for which
    /// `e[a] > s[b]`.
    pub fn precedence_violations(&self, prec: &PrecedenceGraph) -> Vec<(usize, usize)> {
        prec.edges()
            .into_iter()
            .filter(|&(a, b)| match (self.e.get(a), self.s.get(b)) {
                (Some(e), Some(s)) => e > s,
                _ => false,
            })
            .collect()
    }

    /// Check that `e[a] <= s[b]` holds for every precedence `a -> b`.
    pub fn is_precedence_feasible(&self, prec: &PrecedenceGraph) -> bool {
        self.precedence_violations(prec).is_empty()
    }

    /// Generate a Gantt chart view of the schedule: `(task, start, end)` triples ordered by start
    /// time (ties by task).
    pub fn gantt(&self) -> Vec<(usize, T, T)> {
        self.s
            .iter()
            .zip(self.e.iter())
            .enumerate()
            .map(|(j, (&s, &e))| (j, s, e))
            .sorted_by_key(|&(j, s, _)| (s, j))
            .collect()
    }
}

/// Forward pass scheduling of tasks processed in given `order`.
///
/// ## Input
///  - `order` of task processing (not necessarily a topological order)
///  - the processing time `p[j]` of task `j`
///  - precedence relation `prec` whose node `j` corresponds to task `j`
///
/// ## Output
/// The resulting [Schedule] consists of the following parts:
///  - the starting time `s[j]` for each task `j`
///  - the completion time `e[j]` for each task `j`
///  - the makespan `c`
///
/// ## Description
/// All start times are initialized to zero. Tasks are then processed in given order and the
/// completion time of the current task is folded into the start time of each immediate successor
/// (`s[k] = max(s[k], s[j] + p[j])`).
///
/// If `order` is a topological order of `prec`, the resulting schedule is the earliest start
/// schedule and satisfies all precedences. Otherwise the precedences might be violated because
/// a successor could have propagated its completion time before being delayed by a predecessor.
/// Tasks missing from `order` keep the start time accumulated from processed predecessors and
/// tasks listed repeatedly are simply processed again.
///
/// Runs in `O(n + m)` worst-case time where `n` is the number of tasks and `m` the number of
/// precedences.
///
/// ## Panics
/// If `order` contains a task outside of `0..p.len()` or if `prec` has more tasks than `p`.
/// Completion times are computed with plain addition, so the sum of all `p` must fit into `T`
/// (which [`Instance`] guarantees).
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// use rcpsp::cpm::{self, Schedule};
/// use rcpsp::prec::PrecedenceGraph;
///
/// // A -> B, A -> C
/// let prec = PrecedenceGraph::from_edges(3, [(0, 1), (0, 2)]).expect("known tasks");
/// let p: &[u8] = &[2, 3, 1];
///
/// let schedule = cpm::forward_pass(&[0, 1, 2], p, &prec);
///
/// assert_eq!(schedule, Schedule { s: vec![0, 2, 2], e: vec![2, 5, 3], c: 5 });
/// ```
pub fn forward_pass<T: Time>(order: &[usize], p: &[T], prec: &PrecedenceGraph) -> Schedule<T> {
    let mut s = vec![T::zero(); p.len()];

    for &j in order {
        let e = s[j] + p[j];
        for k in prec.successor_iter(j) {
            s[k] = max(s[k], e);
        }
    }

    let e = s.iter().zip(p).map(|(&s, &p)| s + p).collect_vec();
    let c = e.iter().copied().max().unwrap_or_else(T::zero);

    Schedule { s, e, c }
}

/// Result of the Critical Path Method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalPath<T> {
    /// earliest start schedule
    pub schedule: Schedule<T>,
    /// the latest starting time `ls[j]` of task `j` which does not delay the makespan
    pub ls: Vec<T>,
    /// total slack (float) `ls[j] - s[j]` of task `j`
    pub slack: Vec<T>,
}

impl<T: Time> CriticalPath<T> {
    /// Tasks with zero slack in ascending order.
    pub fn critical_tasks(&self) -> Vec<usize> {
        self.slack
            .iter()
            .positions(|slack| slack.is_zero())
            .collect()
    }
}

/// Critical Path Method for given instance.
///
/// The forward pass in topological order yields the earliest start schedule. A backward pass in
/// reversed topological order then computes the latest start times
/// `ls[j] = min(c, min_{j -> k} ls[k]) - p[j]` and slack `ls[j] - s[j]`.
///
/// Resource constraints are relaxed (CPM assumes unlimited resources).
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// use rcpsp::{cpm, Instance, Task};
///
/// let tasks = vec![Task::new(1, 2u32, vec![]), Task::new(2, 3, vec![]), Task::new(3, 1, vec![])];
/// let instance = Instance::new(tasks, vec![], [(0, 1), (0, 2)]).expect("DAG");
///
/// let cp = cpm::critical_path(&instance);
/// assert_eq!(cp.slack, vec![0, 0, 2]);
/// assert_eq!(cp.critical_tasks(), vec![0, 1]);
/// ```
pub fn critical_path<T: Time>(instance: &Instance<T>) -> CriticalPath<T> {
    let schedule = instance.earliest_schedule();
    let p = instance.durations();
    let c = schedule.c;

    let mut ls = vec![T::zero(); p.len()];

    // successors have their latest start computed before their predecessors
    for &j in instance.topological_order().iter().rev() {
        let lf = instance
            .prec()
            .successor_iter(j)
            .map(|k| ls[k])
            .min()
            .unwrap_or(c);
        ls[j] = lf - p[j];
    }

    let slack = ls
        .iter()
        .zip(schedule.s.iter())
        .map(|(&ls, &s)| ls - s)
        .collect();

    CriticalPath {
        schedule,
        ls,
        slack,
    }
}

//! # Task precedence relation
//! Precedences are *finish-to-start* relations between tasks: an edge `a -> b` registers that task
//! `b` cannot start before task `a` finishes.
//!
//! The relation is stored as a directed graph whose node with index `j` corresponds to task `j`.
//! The graph itself happily stores cycles; these are detected by
//! [`PrecedenceGraph::topological_order`] which is the point where an infeasible instance gets
//! rejected.
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::{Error, Result};

use daggy::petgraph::graph::DiGraph;
use daggy::petgraph::visit::EdgeRef;
use daggy::petgraph::Direction;
use daggy::NodeIndex;
use fixedbitset::FixedBitSet;
use itertools::Itertools;
use rand::Rng;

/// Directed graph of *must-finish-before* relations between tasks `0..n`.
#[derive(Debug, Clone, Default)]
pub struct PrecedenceGraph {
    graph: DiGraph<(), ()>,
}

impl PrecedenceGraph {
    /// Create an empty graph without any tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with `n` tasks and no precedences.
    pub fn with_tasks(n: usize) -> Self {
        let mut graph = DiGraph::with_capacity(n, n);
        for _ in 0..n {
            graph.add_node(());
        }
        Self { graph }
    }

    /// Create a graph with `n` tasks and given `(from, to)` precedences.
    ///
    /// ## Example
    /// ```
    /// # extern crate rcpsp;
    /// use rcpsp::prec::PrecedenceGraph;
    ///
    /// let prec = PrecedenceGraph::from_edges(3, [(0, 1), (0, 2)]).expect("known tasks");
    /// assert_eq!(prec.successors(0), vec![1, 2]);
    /// assert_eq!(prec.topological_order(), Ok(vec![0, 1, 2]));
    /// ```
    pub fn from_edges<I>(n: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut prec = Self::with_tasks(n);
        for (from, to) in edges {
            prec.add_edge(from, to)?;
        }
        Ok(prec)
    }

    /// Add new task without precedences and return its index.
    pub fn add_task(&mut self) -> usize {
        self.graph.add_node(()).index()
    }

    /// Number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of (distinct) precedence edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Register that task `to` depends on task `from` finishing.
    ///
    /// Returns `true` iff the edge was not present before, adding an existing edge is a no-op.
    /// Self-loops are accepted here and reported as a cycle by
    /// [`topological_order`](Self::topological_order).
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<bool> {
        let a = self.node(from)?;
        let b = self.node(to)?;

        if self.graph.find_edge(a, b).is_some() {
            return Ok(false);
        }

        self.graph.add_edge(a, b, ());
        Ok(true)
    }

    /// Check whether there is a direct edge `from -> to`.
    pub fn contains_edge(&self, from: usize, to: usize) -> bool {
        match (self.node(from), self.node(to)) {
            (Ok(a), Ok(b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Immediate successors of `task` in ascending order.
    pub fn successors(&self, task: usize) -> Vec<usize> {
        self.neighbors(task, Direction::Outgoing).sorted().collect()
    }

    /// Immediate predecessors of `task` in ascending order.
    pub fn predecessors(&self, task: usize) -> Vec<usize> {
        self.neighbors(task, Direction::Incoming).sorted().collect()
    }

    /// All precedence edges `(from, to)` in ascending order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .sorted()
            .collect()
    }

    /// Unordered immediate successors of `task` (empty for unknown tasks).
    #[inline]
    pub(crate) fn successor_iter(&self, task: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors(task, Direction::Outgoing)
    }

    /// Compute a topological order of all tasks using Kahn's algorithm.
    ///
    /// Whenever more than one task is ready to be processed, the one with the smallest index is
    /// taken first which makes the resulting order unique.
    ///
    /// Runs in `O((n + m) * log(n))` time where `n` is the number of tasks and `m` the number of
    /// precedences.
    ///
    /// ## Errors
    /// Fails with [`Error::CycleDetected`] if the precedence relation contains a cycle.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let n = self.task_count();
        let mut in_degree = self.in_degrees();

        let mut ready = (0..n)
            .filter(|&j| in_degree[j] == 0)
            .map(Reverse)
            .collect::<BinaryHeap<_>>();

        let mut order = Vec::with_capacity(n);

        while let Some(Reverse(j)) = ready.pop() {
            order.push(j);
            for k in self.successor_iter(j) {
                in_degree[k] -= 1;
                if in_degree[k] == 0 {
                    ready.push(Reverse(k));
                }
            }
        }

        self.check_complete(&order, &in_degree)?;
        Ok(order)
    }

    /// Generate a random topological order by repeatedly selecting a uniformly random task among
    /// those whose predecessors have all been selected already.
    ///
    /// ## Errors
    /// Fails with [`Error::CycleDetected`] if the precedence relation contains a cycle.
    pub fn random_topological_order<R>(&self, rng: &mut R) -> Result<Vec<usize>>
    where
        R: Rng + ?Sized,
    {
        let n = self.task_count();
        let mut in_degree = self.in_degrees();

        let mut ready = (0..n).filter(|&j| in_degree[j] == 0).collect_vec();
        let mut order = Vec::with_capacity(n);

        while !ready.is_empty() {
            let j = ready.swap_remove(rng.gen_range(0..ready.len()));
            order.push(j);
            for k in self.successor_iter(j) {
                in_degree[k] -= 1;
                if in_degree[k] == 0 {
                    ready.push(k);
                }
            }
        }

        self.check_complete(&order, &in_degree)?;
        Ok(order)
    }

    /// Check that `order` is a permutation of all tasks in which every task appears only after
    /// all its predecessors.
    pub fn is_linear_extension(&self, order: &[usize]) -> bool {
        let n = self.task_count();
        if order.len() != n {
            return false;
        }

        let mut seen = FixedBitSet::with_capacity(n);

        for &j in order {
            if j >= n || seen.contains(j) {
                return false;
            }
            if !self
                .neighbors(j, Direction::Incoming)
                .all(|i| seen.contains(i))
            {
                return false;
            }
            seen.insert(j);
        }

        true
    }

    fn node(&self, task: usize) -> Result<NodeIndex> {
        if task < self.task_count() {
            Ok(NodeIndex::new(task))
        } else {
            Err(Error::UnknownTask(task))
        }
    }

    #[inline]
    fn neighbors(&self, task: usize, dir: Direction) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors_directed(NodeIndex::new(task), dir)
            .map(|n| n.index())
    }

    fn in_degrees(&self) -> Vec<usize> {
        (0..self.task_count())
            .map(|j| self.neighbors(j, Direction::Incoming).count())
            .collect()
    }

    // Tasks left with a positive in-degree after Kahn's algorithm lie on a cycle or behind one.
    fn check_complete(&self, order: &[usize], in_degree: &[usize]) -> Result<()> {
        if order.len() == self.task_count() {
            return Ok(());
        }
        match in_degree.iter().position(|&d| d > 0) {
            Some(task) => Err(Error::CycleDetected { task }),
            None => Ok(()),
        }
    }
}

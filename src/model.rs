//! Problem instance: tasks, renewable resources and their precedence relation.
use num_traits::CheckedAdd;

use crate::cpm::{forward_pass, Schedule};
use crate::prec::PrecedenceGraph;
use crate::resource::{Feasibility, ResourceProfile};
use crate::{Error, Result, Time};

/// A non-preemptive task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task<T> {
    /// identifier of the task in the source instance, used for reporting only
    pub label: u32,
    /// processing time of the task
    pub duration: T,
    /// `demand[i]` is the number of units of resource `i` the task occupies while it runs
    pub demand: Vec<u32>,
}

impl<T: Time> Task<T> {
    pub fn new(label: u32, duration: T, demand: Vec<u32>) -> Self {
        Self {
            label,
            duration,
            demand,
        }
    }
}

/// A renewable resource with constant capacity available in every time unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub capacity: u32,
}

impl Resource {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// Immutable RCPSP instance.
///
/// Tasks are identified by their index (order of arrival) in `0..n`. Construction guarantees
/// that the precedence relation is acyclic and caches its deterministic topological order.
#[derive(Debug, Clone)]
pub struct Instance<T> {
    tasks: Vec<Task<T>>,
    resources: Vec<Resource>,
    prec: PrecedenceGraph,
    /// processing times `p[j]`, kept separately for the evaluator
    p: Vec<T>,
    order: Vec<usize>,
}

impl<T: Time> Instance<T> {
    /// Build new instance from tasks, resources and `(from, to)` precedence edges.
    ///
    /// ## Errors
    ///  - [`Error::InvalidCapacity`] if any resource has zero capacity
    ///  - [`Error::UnknownTask`] if an edge references a task outside of `0..tasks.len()`
    ///  - [`Error::CycleDetected`] if the precedence relation is not a DAG
    ///  - [`Error::TimeOverflow`] if the sum of all durations does not fit into `T`
    pub fn new<I>(tasks: Vec<Task<T>>, resources: Vec<Resource>, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let prec = PrecedenceGraph::from_edges(tasks.len(), edges)?;
        Self::with_precedences(tasks, resources, prec)
    }

    /// Build new instance from an already constructed precedence graph.
    ///
    /// The graph is extended with isolated tasks if it has fewer tasks than given.
    pub fn with_precedences(
        tasks: Vec<Task<T>>,
        resources: Vec<Resource>,
        mut prec: PrecedenceGraph,
    ) -> Result<Self> {
        if let Some(resource) = resources.iter().position(|r| r.capacity == 0) {
            return Err(Error::InvalidCapacity { resource });
        }

        if prec.task_count() > tasks.len() {
            return Err(Error::UnknownTask(tasks.len()));
        }
        while prec.task_count() < tasks.len() {
            prec.add_task();
        }

        // every start and completion time is bounded by the total duration
        tasks
            .iter()
            .try_fold(T::zero(), |total, t| total.checked_add(&t.duration))
            .ok_or(Error::TimeOverflow)?;

        let order = prec.topological_order()?;
        let p = tasks.iter().map(|t| t.duration).collect();

        Ok(Self {
            tasks,
            resources,
            prec,
            p,
            order,
        })
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task<T>] {
        &self.tasks
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn prec(&self) -> &PrecedenceGraph {
        &self.prec
    }

    /// Processing times `p[j]` of all tasks `j`.
    pub fn durations(&self) -> &[T] {
        &self.p
    }

    /// Capacities of all resources in declaration order.
    pub fn capacities(&self) -> Vec<u32> {
        self.resources.iter().map(|r| r.capacity).collect()
    }

    /// Deterministic topological order of tasks (ties broken by ascending task index).
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Compute the schedule induced by processing tasks in given `order`.
    ///
    /// The order does not have to respect precedences; see [`forward_pass`] for the semantics.
    ///
    /// ## Errors
    /// Fails with [`Error::UnknownTask`] if `order` contains a task outside of `0..n`.
    pub fn evaluate(&self, order: &[usize]) -> Result<Schedule<T>> {
        match order.iter().find(|&&j| j >= self.len()) {
            Some(&j) => Err(Error::UnknownTask(j)),
            None => Ok(forward_pass(order, &self.p, &self.prec)),
        }
    }

    /// Makespan of the schedule induced by `order` which must only contain known tasks.
    #[inline]
    pub(crate) fn makespan(&self, order: &[usize]) -> T {
        forward_pass(order, &self.p, &self.prec).c
    }

    /// Earliest start schedule (CPM forward pass in topological order), ignoring resources.
    pub fn earliest_schedule(&self) -> Schedule<T> {
        forward_pass(&self.order, &self.p, &self.prec)
    }

    /// Cumulative resource usage of a schedule of this instance.
    ///
    /// ## Errors
    ///  - [`Error::ScheduleLength`] if the schedule does not have a start time for each task
    ///  - [`Error::UnknownResource`] if a task demands more resource types than declared
    pub fn profile(&self, schedule: &Schedule<T>) -> Result<ResourceProfile<T>> {
        let demands = self
            .tasks
            .iter()
            .map(|t| t.demand.as_slice())
            .collect::<Vec<_>>();
        ResourceProfile::build(&schedule.s, &self.p, &demands, self.resources.len())
    }

    /// Check a schedule of this instance against resource capacities.
    ///
    /// ## Errors
    /// Same as [`Instance::profile`].
    pub fn validate(&self, schedule: &Schedule<T>) -> Result<Feasibility<T>> {
        Ok(self.profile(schedule)?.check(&self.capacities()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn tasks(p: &[u32]) -> Vec<Task<u32>> {
        p.iter()
            .enumerate()
            .map(|(j, &p)| Task::new(j as u32 + 1, p, vec![1]))
            .collect()
    }

    #[test]
    fn caches_topological_order() {
        let instance = Instance::new(tasks(&[1, 1, 1]), vec![Resource::new("R1", 1)], [(2, 0)])
            .expect("valid instance");
        assert_eq!(instance.topological_order(), &[1, 2, 0]);
        assert_eq!(instance.durations(), &[1, 1, 1]);
        assert_eq!(instance.capacities(), vec![1]);
        assert_eq!(instance.len(), 3);
        assert!(!instance.is_empty());
    }

    #[rstest]
    #[case::cycle(&[(0, 1), (1, 0)], Error::CycleDetected { task: 0 })]
    #[case::unknown(&[(0, 3)], Error::UnknownTask(3))]
    fn invalid_precedences(#[case] edges: &[(usize, usize)], #[case] expected: Error) {
        let result = Instance::new(tasks(&[1, 2]), vec![], edges.iter().copied());
        assert_eq!(result.err(), Some(expected));
    }

    #[test]
    fn zero_capacity() {
        let resources = vec![Resource::new("R1", 3), Resource::new("R2", 0)];
        let result = Instance::new(tasks(&[1]), resources, []);
        assert_eq!(result.err(), Some(Error::InvalidCapacity { resource: 1 }));
    }

    #[test]
    fn graph_is_extended_to_all_tasks() {
        let prec = PrecedenceGraph::from_edges(2, [(0, 1)]).expect("known tasks");
        let instance =
            Instance::with_precedences(tasks(&[1, 1, 1]), vec![], prec).expect("valid instance");
        assert_eq!(instance.prec().task_count(), 3);
        assert_eq!(instance.topological_order(), &[0, 1, 2]);

        let prec = PrecedenceGraph::with_tasks(4);
        let result = Instance::with_precedences(tasks(&[1, 1, 1]), vec![], prec);
        assert_eq!(result.err(), Some(Error::UnknownTask(3)));
    }

    #[rstest]
    #[case::fits(&[200, 55], Ok(255))]
    #[case::overflows(&[200, 100], Err(Error::TimeOverflow))]
    fn total_duration_fits_time_type(#[case] p: &[u8], #[case] expected: Result<u8>) {
        let tasks = p.iter().map(|&p| Task::new(1, p, vec![])).collect();
        let instance = Instance::new(tasks, vec![], [(0, 1)]);
        assert_eq!(instance.map(|i| i.earliest_schedule().c), expected);
    }

    #[test]
    fn validate_requires_complete_schedule() {
        let tasks = vec![Task::new(1, 1u32, vec![2]), Task::new(2, 1, vec![2])];
        let instance = Instance::new(tasks, vec![Resource::new("R1", 2)], []).expect("valid");

        for s in [vec![0], vec![]] {
            let found = s.len();
            let schedule = Schedule {
                e: s.iter().map(|&s| s + 1).collect(),
                c: 1,
                s,
            };
            assert_eq!(
                instance.validate(&schedule),
                Err(Error::ScheduleLength { expected: 2, found })
            );
        }

        let overlap = instance.evaluate(&[0, 1]).expect("known tasks");
        assert!(!instance.validate(&overlap).expect("complete").is_valid());
        assert_eq!(instance.profile(&overlap).expect("complete").peak(), vec![4]);
    }

    #[test]
    fn evaluate_unknown_task() {
        let instance = Instance::new(tasks(&[1, 2]), vec![], []).expect("valid instance");
        assert_eq!(instance.evaluate(&[0, 2]), Err(Error::UnknownTask(2)));
        assert_eq!(instance.evaluate(&[1, 0]).map(|s| s.c), Ok(2));
    }
}

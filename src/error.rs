use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building an [`Instance`](crate::Instance) or checking a schedule against
/// it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The precedence relation is not a DAG. `task` is the smallest task that lies on a cycle or
    /// can only be reached through one.
    #[error("precedence cycle reached at task {task}")]
    CycleDetected { task: usize },
    /// A task demands a resource type which has no declared capacity.
    #[error("task {task} demands resource {resource} which has no declared capacity")]
    UnknownResource { task: usize, resource: usize },
    /// A task index outside of the instance.
    #[error("unknown task {0}")]
    UnknownTask(usize),
    /// Resource capacities must be positive.
    #[error("resource {resource} has zero capacity")]
    InvalidCapacity { resource: usize },
    /// Start times, durations and demand vectors must cover the same tasks.
    #[error("schedule covers {found} tasks but the instance has {expected}")]
    ScheduleLength { expected: usize, found: usize },
    /// Task completion times do not fit into the time type.
    #[error("total duration of all tasks overflows the time type")]
    TimeOverflow,
}

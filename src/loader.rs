//! Loader of PSPLIB-like instance files with three sections:
//!
//! ```text
//! #Precedence relations
//! jobnr.  #modes  #successors  successors
//!    1      1         2          2  3
//! ...
//! #Duration and resources
//! jobnr.  mode  duration  R1  R2
//!    1      1      0       0   0
//! ...
//! #Resource availability
//! R1 3
//! R2 3
//! ```
//!
//! Blank lines, comments (`#`), separator lines (`***`, `---`) and non-numeric header lines of
//! the first two sections are skipped. Jobs become tasks in order of their appearance in the
//! duration section and keep their job number as a label.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use crate::{Error, Instance, Resource, Task};

pub type LoadResult<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing section `{0}`")]
    MissingSection(&'static str),
    #[error("malformed line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("line {line}: job {job} has unknown successor {successor}")]
    UnknownSuccessor { line: usize, job: u32, successor: u32 },
    #[error("line {line}: job {job} has no duration and resources")]
    MissingDuration { line: usize, job: u32 },
    #[error("line {line}: job {job} is listed more than once")]
    DuplicateJob { line: usize, job: u32 },
    #[error("invalid instance: {0}")]
    Instance(#[from] Error),
}

impl LoadError {
    fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Precedence,
    Duration,
    Availability,
}

impl Section {
    const ALL: [Section; 3] = [Self::Precedence, Self::Duration, Self::Availability];

    fn header(self) -> &'static str {
        match self {
            Self::Precedence => "#Precedence relations",
            Self::Duration => "#Duration and resources",
            Self::Availability => "#Resource availability",
        }
    }

    fn parse(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| line.starts_with(s.header()))
    }
}

/// Load an instance from file at given `path`.
pub fn load(path: impl AsRef<Path>) -> LoadResult<Instance<u32>> {
    let path = path.as_ref();
    debug!("loading instance from {}", path.display());
    let file = File::open(path)?;
    parse(BufReader::new(file))
}

/// Parse an instance from given reader.
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// let text = "\
/// #Precedence relations
/// 1 1 1 2
/// 2 1 0
/// #Duration and resources
/// 1 1 2 1
/// 2 1 3 1
/// #Resource availability
/// R1 1
/// ";
///
/// let instance = rcpsp::loader::parse(text.as_bytes()).expect("valid instance");
/// assert_eq!(instance.len(), 2);
/// assert_eq!(instance.earliest_schedule().c, 5);
/// ```
pub fn parse<R: BufRead>(reader: R) -> LoadResult<Instance<u32>> {
    let mut section = None;
    let mut seen = [false; 3];

    let mut successors: Vec<(usize, u32, Vec<u32>)> = Vec::new();
    let mut tasks: Vec<Task<u32>> = Vec::new();
    let mut index: HashMap<u32, usize> = HashMap::new();
    let mut resources = Vec::new();

    for (k, line) in reader.lines().enumerate() {
        let line = line?;
        let number = k + 1;
        let line = line.trim();

        if let Some(s) = Section::parse(line) {
            seen[s as usize] = true;
            section = Some(s);
            continue;
        }

        if is_skipped(line) {
            continue;
        }

        match section {
            None => {}
            Some(Section::Precedence | Section::Duration) if !starts_with_integer(line) => {}
            Some(Section::Precedence) => {
                let fields = integers(line, number)?;
                if fields.len() < 3 {
                    return Err(LoadError::malformed(
                        number,
                        "expected job number, mode count and successor count",
                    ));
                }

                let (job, count, succ) = (fields[0], fields[2] as usize, &fields[3..]);
                if succ.len() != count {
                    return Err(LoadError::malformed(
                        number,
                        format!("expected {} successors, found {}", count, succ.len()),
                    ));
                }
                if successors.iter().any(|(_, j, _)| *j == job) {
                    return Err(LoadError::DuplicateJob { line: number, job });
                }
                successors.push((number, job, succ.to_vec()));
            }
            Some(Section::Duration) => {
                let fields = integers(line, number)?;
                if fields.len() < 3 {
                    return Err(LoadError::malformed(
                        number,
                        "expected job number, mode and duration",
                    ));
                }

                let job = fields[0];
                if index.insert(job, tasks.len()).is_some() {
                    return Err(LoadError::DuplicateJob { line: number, job });
                }
                tasks.push(Task::new(job, fields[2], fields[3..].to_vec()));
            }
            Some(Section::Availability) => {
                let fields = line.split_whitespace().collect::<Vec<_>>();
                match fields[..] {
                    [name, capacity] => {
                        let capacity = integer(capacity, number)?;
                        resources.push(Resource::new(name, capacity));
                    }
                    _ => {
                        return Err(LoadError::malformed(
                            number,
                            "expected resource name and capacity",
                        ))
                    }
                }
            }
        }
    }

    if let Some(s) = Section::ALL.into_iter().find(|&s| !seen[s as usize]) {
        return Err(LoadError::MissingSection(s.header()));
    }

    let mut edges = Vec::new();
    for (line, job, succ) in successors {
        let from = *index
            .get(&job)
            .ok_or(LoadError::MissingDuration { line, job })?;
        for successor in succ {
            let to = *index.get(&successor).ok_or(LoadError::UnknownSuccessor {
                line,
                job,
                successor,
            })?;
            edges.push((from, to));
        }
    }

    let instance = Instance::new(tasks, resources, edges)?;
    info!(
        "loaded instance with {} tasks, {} precedences and {} resources",
        instance.len(),
        instance.prec().edge_count(),
        instance.resources().len()
    );
    Ok(instance)
}

fn is_skipped(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.chars().all(|c| c == '*' || c == '-')
}

fn starts_with_integer(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .map_or(false, |token| token.parse::<u32>().is_ok())
}

fn integer(token: &str, line: usize) -> LoadResult<u32> {
    token
        .parse()
        .map_err(|_| LoadError::malformed(line, format!("invalid integer `{}`", token)))
}

fn integers(line: &str, number: usize) -> LoadResult<Vec<u32>> {
    line.split_whitespace()
        .map(|token| integer(token, number))
        .collect()
}

//! # Renewable resource validation
//! A schedule is *resource feasible* if in every time unit `t` and for every resource `i` the
//! total demand of tasks running at `t` (i.e. `s[j] <= t < s[j] + p[j]`) does not exceed the
//! capacity of `i`.
//!
//! Validation builds a [`ResourceProfile`] (cumulative demand per time unit) and compares it with
//! the capacities in ascending order of time units and resource indices, reporting only the first
//! violation found.
use std::collections::BTreeMap;

use num_traits::CheckedAdd;

use crate::{Error, Result, Time};

/// Outcome of a resource validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility<T> {
    /// No resource is ever over-committed.
    Feasible,
    /// The earliest over-commitment found.
    OverCommitted {
        /// first violating time unit
        time: T,
        /// smallest violating resource at `time`
        resource: usize,
        /// cumulative demand of `resource` at `time`
        demand: u64,
        /// capacity of `resource`
        capacity: u32,
    },
}

impl<T: Copy> Feasibility<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Feasible)
    }

    /// The first violating time unit, if any.
    pub fn first_violation(&self) -> Option<T> {
        match self {
            Self::Feasible => None,
            Self::OverCommitted { time, .. } => Some(*time),
        }
    }
}

impl<T: Copy> From<Feasibility<T>> for (bool, Option<T>) {
    fn from(f: Feasibility<T>) -> Self {
        (f.is_valid(), f.first_violation())
    }
}

/// Cumulative resource demand per time unit.
///
/// Only busy time units (with at least one running task) are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProfile<T> {
    usage: BTreeMap<T, Vec<u64>>,
    num_resources: usize,
}

impl<T: Time> ResourceProfile<T> {
    /// Accumulate `demands[j]` of each task `j` over time units `s[j]..s[j] + p[j]`.
    ///
    /// Demand vectors shorter than `num_resources` are padded with zeros.
    ///
    /// ## Errors
    ///  - [`Error::ScheduleLength`] if `s` or `demands` do not have one entry per task of `p`
    ///  - [`Error::UnknownResource`] if some task demands a resource with index
    ///    `>= num_resources`, regardless of the task's duration
    ///  - [`Error::TimeOverflow`] if some `s[j] + p[j]` does not fit into `T`
    pub fn build<D>(s: &[T], p: &[T], demands: &[D], num_resources: usize) -> Result<Self>
    where
        D: AsRef<[u32]>,
    {
        if let Some(found) = [s.len(), demands.len()].into_iter().find(|&l| l != p.len()) {
            return Err(Error::ScheduleLength {
                expected: p.len(),
                found,
            });
        }

        let mut usage: BTreeMap<T, Vec<u64>> = BTreeMap::new();

        for (task, ((&s, &p), demand)) in s.iter().zip(p).zip(demands).enumerate() {
            let demand = demand.as_ref();

            if demand.len() > num_resources {
                return Err(Error::UnknownResource {
                    task,
                    resource: num_resources,
                });
            }

            let mut t = s;
            let end = s.checked_add(&p).ok_or(Error::TimeOverflow)?;
            while t < end {
                let slot = usage
                    .entry(t)
                    .or_insert_with(|| vec![0; num_resources]);
                for (acc, &d) in slot.iter_mut().zip(demand) {
                    *acc += u64::from(d);
                }
                t = t + T::one();
            }
        }

        Ok(Self {
            usage,
            num_resources,
        })
    }

    pub fn num_resources(&self) -> usize {
        self.num_resources
    }

    /// Cumulative demand at time unit `t` (`None` if no task runs at `t`), e.g. for plotting a
    /// resource usage chart.
    pub fn usage_at(&self, t: T) -> Option<&[u64]> {
        self.usage.get(&t).map(Vec::as_slice)
    }

    /// Iterate over busy time units and their cumulative demand in ascending order of time.
    pub fn iter(&self) -> impl Iterator<Item = (T, &[u64])> + '_ {
        self.usage.iter().map(|(&t, u)| (t, u.as_slice()))
    }

    /// Maximum demand of each resource over the whole horizon.
    pub fn peak(&self) -> Vec<u64> {
        self.usage
            .values()
            .fold(vec![0; self.num_resources], |mut peak, usage| {
                for (p, &u) in peak.iter_mut().zip(usage) {
                    *p = (*p).max(u);
                }
                peak
            })
    }

    /// Compare the profile against `capacities`, time units first then resource indices.
    pub fn check(&self, capacities: &[u32]) -> Feasibility<T> {
        for (&time, usage) in self.usage.iter() {
            for (resource, (&demand, &capacity)) in usage.iter().zip(capacities).enumerate() {
                if demand > u64::from(capacity) {
                    return Feasibility::OverCommitted {
                        time,
                        resource,
                        demand,
                        capacity,
                    };
                }
            }
        }
        Feasibility::Feasible
    }
}

/// Validate resource feasibility of a schedule.
///
/// ## Input
///  - the starting time `s[j]` of task `j`
///  - the processing time `p[j]` of task `j`
///  - the resource demand vector `demands[j]` of task `j`
///  - the capacity `capacities[i]` of resource `i`
///
/// ## Errors
/// Fails with [`Error::UnknownResource`] if a demand vector is longer than `capacities` and with
/// [`Error::ScheduleLength`] if the inputs do not cover the same tasks.
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// use rcpsp::resource::{self, Feasibility};
///
/// // two tasks demanding 2 units each, both running in time unit 0
/// let s: &[u8] = &[0, 0];
/// let p: &[u8] = &[1, 1];
/// let demands = [vec![2], vec![2]];
///
/// let feasibility = resource::validate(s, p, &demands, &[2]).expect("known resources");
///
/// assert_eq!(feasibility.first_violation(), Some(0));
/// assert_eq!(
///     feasibility,
///     Feasibility::OverCommitted { time: 0, resource: 0, demand: 4, capacity: 2 }
/// );
/// ```
pub fn validate<T, D>(s: &[T], p: &[T], demands: &[D], capacities: &[u32]) -> Result<Feasibility<T>>
where
    T: Time,
    D: AsRef<[u32]>,
{
    let profile = ResourceProfile::build(s, p, demands, capacities.len())?;
    Ok(profile.check(capacities))
}

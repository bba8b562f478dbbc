//! # Genetic optimizer
//! Population-based search over task processing orders which minimizes the makespan computed by
//! [`forward_pass`](crate::cpm::forward_pass). The fitness signal is the makespan only, resource
//! feasibility is not taken into account.
//!
//! Each generation
//!  1. evaluates and sorts the population ascending by makespan,
//!  2. keeps the `elite_count` best members unchanged,
//!  3. crosses the `i`-th best with the `i`-th worst member for `i < population_size / 2`,
//!  4. replaces the population with the elites and the (possibly mutated) children truncated to
//!     (or padded with fresh members up to) the population size.
//!
//! The search runs for a fixed number of generations (or until an optional time limit passes)
//! and never fails: candidates are not required to be permutations nor linear extensions of the
//! precedence relation.
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, info, trace, warn};
use num_traits::ToPrimitive;
use rand::prelude::*;

use crate::cpm::Schedule;
use crate::{Instance, Result, Time};

pub mod crossover;
pub mod mutation;

pub use crossover::Crossover;
pub use mutation::{Mutate, Mutation, Mutator};

/// Strategy for generating members of the initial population (and fresh members filling up a
/// short generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Initialization {
    /// Uniformly random permutation of all tasks.
    #[default]
    Shuffle,
    /// Uniformly random choice among ready tasks, i.e. a random linear extension of the
    /// precedence relation.
    Topological,
}

/// Parameters of the genetic optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct GaConfig {
    /// number of members in each generation (`0` is treated as `1`)
    pub population_size: usize,
    /// number of generations to evolve
    pub generations: usize,
    /// number of best members retained unconditionally (capped at the population size)
    pub elite_count: usize,
    pub crossover: Crossover,
    pub mutation: Mutation,
    /// probability of mutating a child, clamped into `[0, 1]`
    pub mutation_rate: f64,
    pub initialization: Initialization,
    /// seed of the random number generator, drawn from system entropy if unset
    pub seed: Option<u64>,
    /// wall-clock limit checked between generations
    pub time_limit: Option<Duration>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            elite_count: 10,
            crossover: Crossover::default(),
            mutation: Mutation::default(),
            mutation_rate: 0.,
            initialization: Initialization::default(),
            seed: None,
            time_limit: None,
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_elite_count(mut self, elite_count: usize) -> Self {
        self.elite_count = elite_count;
        self
    }

    pub fn with_crossover(mut self, crossover: Crossover) -> Self {
        self.crossover = crossover;
        self
    }

    pub fn with_mutation(mut self, mutation: Mutation, rate: f64) -> Self {
        self.mutation = mutation;
        self.mutation_rate = rate;
        self
    }

    pub fn with_initialization(mut self, initialization: Initialization) -> Self {
        self.initialization = initialization;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// Statistics collected during a run of the genetic optimizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats<T> {
    /// number of evolved generations
    pub generations: usize,
    /// total number of makespan evaluations
    pub evaluations: u64,
    /// number of crossover children which were not permutations of all tasks
    pub invalid_children: u64,
    /// best known makespan after each generation (non-increasing)
    pub history: Vec<T>,
    /// elapsed time since the optimization started
    pub elapsed: Duration,
    /// true iff the run was stopped by the time limit
    pub timed_out: bool,
}

/// Best task ordering found by the genetic optimizer.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// best task processing order (not necessarily a permutation)
    pub order: Vec<usize>,
    /// makespan of the schedule induced by `order`
    pub makespan: T,
    pub stats: Stats<T>,
}

impl<T: Time> Outcome<T> {
    /// Schedule induced by the best ordering on given instance.
    pub fn schedule(&self, instance: &Instance<T>) -> Result<Schedule<T>> {
        instance.evaluate(&self.order)
    }
}

type Ranked<T> = Vec<(Vec<usize>, T)>;

/// Genetic algorithm minimizing the makespan over task orderings.
///
/// ## Example
/// ```
/// # extern crate rcpsp;
/// use rcpsp::ga::{Crossover, GaConfig, GeneticOptimizer};
/// use rcpsp::{Instance, Task};
///
/// // A -> B, A -> C
/// let tasks = vec![Task::new(1, 2u32, vec![]), Task::new(2, 3, vec![]), Task::new(3, 1, vec![])];
/// let instance = Instance::new(tasks, vec![], [(0, 1), (0, 2)]).expect("DAG");
///
/// let config = GaConfig::default()
///     .with_crossover(Crossover::PartiallyMapped)
///     .with_seed(42);
/// let outcome = GeneticOptimizer::new(config).run(&instance);
///
/// assert_eq!(outcome.makespan, 5);
/// assert_eq!(outcome.stats.generations, 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeneticOptimizer {
    config: GaConfig,
}

impl GeneticOptimizer {
    pub fn new(config: GaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Run the optimizer with a generator seeded from the configuration.
    pub fn run<T: Time>(&self, instance: &Instance<T>) -> Outcome<T> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(instance, &mut rng)
    }

    /// Run the optimizer drawing all random decisions from `rng`.
    pub fn run_with_rng<T, R>(&self, instance: &Instance<T>, rng: &mut R) -> Outcome<T>
    where
        T: Time,
        R: Rng + ?Sized,
    {
        let start = Instant::now();

        let size = self.config.population_size.max(1);
        let elite = self.config.elite_count.min(size);
        let mutator = Mutator::new(self.config.mutation, self.config.mutation_rate);

        let mut stats = Stats::default();
        let mut best: Option<(Vec<usize>, T)> = None;

        let mut population = (0..size).map(|_| self.member(instance, rng)).collect_vec();

        for generation in 0..self.config.generations {
            if generation > 0 {
                if let Some(limit) = self.config.time_limit {
                    if start.elapsed() >= limit {
                        warn!(
                            "time limit of {:?} reached after {} generations",
                            limit, generation
                        );
                        stats.timed_out = true;
                        break;
                    }
                }
            }

            let ranked = rank(instance, population, &mut stats);
            update_best(&ranked, &mut best);

            if let Some((_, c)) = &best {
                stats.history.push(*c);
                debug!(
                    "generation {}: best {} | mean {:.2} | worst {}",
                    generation,
                    c,
                    mean(&ranked),
                    ranked.last().map(|(_, c)| *c).unwrap_or_else(T::zero)
                );
            }
            stats.generations += 1;

            population = self.breed(instance, &ranked, size, elite, &mutator, rng, &mut stats);
        }

        if best.is_none() {
            let ranked = rank(instance, population, &mut stats);
            update_best(&ranked, &mut best);
        }

        let (order, makespan) = best.unwrap_or_default();
        stats.elapsed = start.elapsed();

        info!(
            "GA finished: makespan {} after {} generations ({} evaluations, {} invalid children) in {:?}",
            makespan,
            stats.generations,
            stats.evaluations,
            stats.invalid_children,
            stats.elapsed
        );

        Outcome {
            order,
            makespan,
            stats,
        }
    }

    /// Generate next generation from a population ranked by makespan.
    #[allow(clippy::too_many_arguments)]
    fn breed<T, R>(
        &self,
        instance: &Instance<T>,
        ranked: &[(Vec<usize>, T)],
        size: usize,
        elite: usize,
        mutator: &Mutator,
        rng: &mut R,
        stats: &mut Stats<T>,
    ) -> Vec<Vec<usize>>
    where
        T: Time,
        R: Rng + ?Sized,
    {
        let n = ranked.len();
        let mut next = Vec::with_capacity(elite + n);

        next.extend(ranked.iter().take(elite).map(|(order, _)| order.clone()));

        for i in 0..n / 2 {
            let (c1, c2) = self
                .config
                .crossover
                .apply(&ranked[i].0, &ranked[n - i - 1].0, rng);

            for mut child in [c1, c2] {
                mutator.mutate(&mut child[..], rng);
                if !crossover::is_permutation(&child, instance.len()) {
                    stats.invalid_children += 1;
                }
                next.push(child);
            }
        }

        next.truncate(size);
        while next.len() < size {
            next.push(self.member(instance, rng));
        }

        next
    }

    /// Fresh population member.
    fn member<T, R>(&self, instance: &Instance<T>, rng: &mut R) -> Vec<usize>
    where
        T: Time,
        R: Rng + ?Sized,
    {
        match self.config.initialization {
            Initialization::Shuffle => {
                let mut order = (0..instance.len()).collect_vec();
                order.shuffle(rng);
                order
            }
            // instances are acyclic so this never falls back
            Initialization::Topological => instance
                .prec()
                .random_topological_order(rng)
                .unwrap_or_else(|_| instance.topological_order().to_vec()),
        }
    }
}

/// Evaluate and stably sort the population ascending by makespan.
fn rank<T: Time>(
    instance: &Instance<T>,
    population: Vec<Vec<usize>>,
    stats: &mut Stats<T>,
) -> Ranked<T> {
    let mut ranked = population
        .into_iter()
        .map(|order| {
            let c = instance.makespan(&order);
            trace!("evaluated {:?}: makespan {}", order, c);
            (order, c)
        })
        .collect_vec();

    stats.evaluations += ranked.len() as u64;
    ranked.sort_by_key(|(_, c)| *c);
    ranked
}

/// Replace the best known ordering iff the ranked population contains a strictly better one.
fn update_best<T: Time>(ranked: &[(Vec<usize>, T)], best: &mut Option<(Vec<usize>, T)>) {
    if let Some((order, c)) = ranked.first() {
        if best.as_ref().map_or(true, |(_, best_c)| c < best_c) {
            *best = Some((order.clone(), *c));
        }
    }
}

fn mean<T: Time>(ranked: &[(Vec<usize>, T)]) -> f64 {
    if ranked.is_empty() {
        return 0.;
    }
    let total: f64 = ranked.iter().filter_map(|(_, c)| c.to_f64()).sum();
    total / ranked.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Task;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::*;

    fn instance(p: &[u32], edges: &[(usize, usize)]) -> Instance<u32> {
        let tasks = p
            .iter()
            .enumerate()
            .map(|(j, &p)| Task::new(j as u32 + 1, p, vec![1]))
            .collect();
        Instance::new(tasks, vec![], edges.iter().copied()).expect("DAG")
    }

    fn fork() -> Instance<u32> {
        instance(&[2, 3, 1], &[(0, 1), (0, 2)])
    }

    fn layered() -> Instance<u32> {
        instance(
            &[3, 2, 4, 1, 5, 2, 3, 1, 2, 4],
            &[
                (0, 3),
                (1, 3),
                (2, 4),
                (3, 5),
                (4, 5),
                (5, 6),
                (6, 7),
                (6, 8),
                (7, 9),
                (8, 9),
            ],
        )
    }

    fn ranked() -> Ranked<u32> {
        vec![
            (vec![0, 1, 2, 3], 4),
            (vec![1, 0, 3, 2], 5),
            (vec![2, 3, 0, 1], 5),
            (vec![3, 2, 1, 0], 6),
            (vec![1, 2, 3, 0], 7),
            (vec![3, 0, 1, 2], 9),
        ]
    }

    #[rstest]
    #[case::elites_and_truncation(6, 2, 2)]
    #[case::all_pairs(6, 0, 3)]
    #[case::padded(9, 2, 3)]
    fn breed_keeps_elites_and_pairs_best_with_worst(
        #[case] size: usize,
        #[case] elite: usize,
        #[case] pairs: usize,
    ) {
        let instance = instance(&[1, 1, 1, 1], &[]);
        let optimizer = GeneticOptimizer::default();
        let mutator = Mutator::new(Mutation::Swap, 0.);
        let ranked = ranked();
        let n = ranked.len();

        let mut rng = StdRng::seed_from_u64(17);
        let mut stats = Stats::default();
        let next = optimizer.breed(&instance, &ranked, size, elite, &mutator, &mut rng, &mut stats);

        assert_eq!(next.len(), size);

        for (member, (order, _)) in next.iter().zip(&ranked).take(elite) {
            assert_eq!(member, order);
        }

        for i in 0..pairs {
            let (p1, p2) = (&ranked[i].0, &ranked[n - i - 1].0);
            let children = (next[elite + 2 * i].clone(), next[elite + 2 * i + 1].clone());
            assert!(
                (0..=4).any(|k| crossover::single_point(p1, p2, k) == children),
                "{:?} is not a child pair of {:?} x {:?}",
                children,
                p1,
                p2
            );
        }

        for member in &next[elite + 2 * pairs..] {
            assert!(crossover::is_permutation(member, 4));
        }
    }

    #[test]
    fn default_config() {
        let config = GaConfig::default();
        assert_eq!(config.population_size, 50);
        assert_eq!(config.generations, 100);
        assert_eq!(config.elite_count, 10);
        assert_eq!(config.crossover, Crossover::SinglePoint);
        assert_eq!(config.mutation_rate, 0.);
        assert_eq!(config.initialization, Initialization::Shuffle);
        assert_eq!(config.seed, None);
        assert_eq!(config.time_limit, None);
    }

    #[test]
    fn empty_instance() {
        let instance = instance(&[], &[]);
        let outcome = GeneticOptimizer::new(GaConfig::default().with_seed(1)).run(&instance);

        assert!(outcome.order.is_empty());
        assert_eq!(outcome.makespan, 0);
        assert_eq!(outcome.stats.invalid_children, 0);
    }

    #[test]
    fn zero_population_is_one_member() {
        let config = GaConfig::default()
            .with_population_size(0)
            .with_generations(5)
            .with_seed(1);
        let outcome = GeneticOptimizer::new(config).run(&fork());

        assert_eq!(outcome.stats.evaluations, 5);
        assert!(crossover::is_permutation(&outcome.order, 3));
        assert_eq!(outcome.makespan, 5);
    }

    #[test]
    fn zero_generations_evaluate_initial_population() {
        let config = GaConfig::default()
            .with_population_size(7)
            .with_generations(0)
            .with_seed(1);
        let outcome = GeneticOptimizer::new(config).run(&layered());

        assert_eq!(outcome.stats.generations, 0);
        assert_eq!(outcome.stats.evaluations, 7);
        assert!(outcome.stats.history.is_empty());
        assert!(crossover::is_permutation(&outcome.order, 10));
    }

    #[rstest]
    #[case(Crossover::SinglePoint)]
    #[case(Crossover::PartiallyMapped)]
    #[case(Crossover::Order)]
    fn history_is_non_increasing(#[case] crossover: Crossover) {
        let config = GaConfig::default()
            .with_crossover(crossover)
            .with_mutation(Mutation::Insert, 0.3)
            .with_seed(7);
        let outcome = GeneticOptimizer::new(config).run(&layered());

        let history = &outcome.stats.history;
        assert_eq!(history.len(), 100);
        assert!(history.windows(2).all(|w| w[0] >= w[1]), "{:?}", history);
        assert_eq!(history.last(), Some(&outcome.makespan));
        assert_eq!(outcome.stats.evaluations, 100 * 50);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = GaConfig::default()
            .with_generations(20)
            .with_mutation(Mutation::Swap, 0.5)
            .with_seed(11);
        let a = GeneticOptimizer::new(config.clone()).run(&layered());
        let b = GeneticOptimizer::new(config).run(&layered());

        assert_eq!(a.order, b.order);
        assert_eq!(a.makespan, b.makespan);
        assert_eq!(a.stats.history, b.stats.history);
        assert_eq!(a.stats.invalid_children, b.stats.invalid_children);
    }

    #[rstest]
    #[case(Crossover::PartiallyMapped, Mutation::Swap)]
    #[case(Crossover::Order, Mutation::Insert)]
    fn order_preserving_runs(#[case] crossover: Crossover, #[case] mutation: Mutation) {
        let config = GaConfig::default()
            .with_generations(30)
            .with_crossover(crossover)
            .with_mutation(mutation, 0.2)
            .with_seed(5);
        let outcome = GeneticOptimizer::new(config).run(&layered());

        assert_eq!(outcome.stats.invalid_children, 0);
        assert!(crossover::is_permutation(&outcome.order, 10));

        let schedule = outcome.schedule(&layered()).expect("known tasks");
        assert_eq!(schedule.c, outcome.makespan);
    }

    #[test]
    fn single_point_produces_invalid_children() {
        let config = GaConfig::default().with_generations(10).with_seed(5);
        let outcome = GeneticOptimizer::new(config).run(&layered());
        assert!(outcome.stats.invalid_children > 0);
    }

    #[test]
    fn topological_seeding() {
        let instance = layered();
        let config = GaConfig::default()
            .with_generations(0)
            .with_initialization(Initialization::Topological)
            .with_seed(3);
        let outcome = GeneticOptimizer::new(config).run(&instance);

        assert!(instance.prec().is_linear_extension(&outcome.order));
        assert_eq!(outcome.makespan, instance.earliest_schedule().c);
    }

    #[test]
    fn time_limit_stops_between_generations() {
        let config = GaConfig::default()
            .with_time_limit(Duration::ZERO)
            .with_seed(3);
        let outcome = GeneticOptimizer::new(config).run(&layered());

        assert!(outcome.stats.timed_out);
        assert_eq!(outcome.stats.generations, 1);
        assert_eq!(outcome.stats.history.len(), 1);
    }

    #[test]
    fn permutations_of_fork_have_cpm_makespan() {
        let config = GaConfig::default()
            .with_crossover(Crossover::Order)
            .with_seed(9);
        let outcome = GeneticOptimizer::new(config).run(&fork());
        assert_eq!(outcome.makespan, 5);
    }
}

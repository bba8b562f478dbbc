use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use itertools::Itertools;
use log::{info, LevelFilter};

use rcpsp::cpm::{self, Schedule};
use rcpsp::ga::{Crossover, GaConfig, GeneticOptimizer, Initialization, Mutation};
use rcpsp::loader::{self, LoadResult};
use rcpsp::resource::Feasibility;
use rcpsp::Instance;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The instance to schedule. Must contain the `#Precedence relations`, `#Duration and
    /// resources` and `#Resource availability` sections.
    instance_path: PathBuf,

    /// Number of generations of the genetic optimizer
    #[arg(short = 'g', long, default_value_t = 100)]
    generations: usize,

    /// Number of orderings in each generation
    #[arg(short = 'n', long, default_value_t = 50)]
    population_size: usize,

    /// Number of best orderings retained in each generation
    #[arg(short = 'e', long, default_value_t = 10)]
    elite_count: usize,

    #[arg(short = 'c', long, value_enum, default_value_t = CrossoverArg::SinglePoint)]
    crossover: CrossoverArg,

    #[arg(long, value_enum, default_value_t = MutationArg::Swap)]
    mutation: MutationArg,

    /// Probability of mutating each child
    #[arg(short = 'm', long, default_value_t = 0.0)]
    mutation_rate: f64,

    /// Seed the population with random topological orders instead of random permutations
    #[arg(long)]
    topological_seeding: bool,

    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Time limit of the genetic optimizer in seconds
    #[arg(short = 't', long = "time-limit")]
    time_limit: Option<u64>,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CrossoverArg {
    SinglePoint,
    PartiallyMapped,
    Order,
}

impl From<CrossoverArg> for Crossover {
    fn from(arg: CrossoverArg) -> Self {
        match arg {
            CrossoverArg::SinglePoint => Self::SinglePoint,
            CrossoverArg::PartiallyMapped => Self::PartiallyMapped,
            CrossoverArg::Order => Self::Order,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MutationArg {
    Swap,
    Insert,
}

impl From<MutationArg> for Mutation {
    fn from(arg: MutationArg) -> Self {
        match arg {
            MutationArg::Swap => Self::Swap,
            MutationArg::Insert => Self::Insert,
        }
    }
}

impl Args {
    fn config(&self) -> GaConfig {
        let initialization = if self.topological_seeding {
            Initialization::Topological
        } else {
            Initialization::Shuffle
        };

        let mut config = GaConfig::default()
            .with_population_size(self.population_size)
            .with_generations(self.generations)
            .with_elite_count(self.elite_count)
            .with_crossover(self.crossover.into())
            .with_mutation(self.mutation.into(), self.mutation_rate)
            .with_initialization(initialization);

        config.seed = self.seed;
        config.time_limit = self.time_limit.map(Duration::from_secs);
        config
    }
}

pub fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            println!("Execution failed, error: {e}");
            std::process::exit(1);
        }
    }
}

fn run() -> LoadResult<()> {
    let args = Args::parse();

    let level_filter = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(level_filter)
        .target(env_logger::Target::Stdout)
        .init();
    info!("Logging successfully configured");

    let instance = loader::load(&args.instance_path)?;
    println!(
        "Instance {}: {} tasks, {} resources",
        args.instance_path.display(),
        instance.len(),
        instance.resources().len()
    );

    let cp = cpm::critical_path(&instance);
    info!("CPM makespan {}", cp.schedule.c);

    println!("\n== CPM baseline ==");
    print_schedule(&instance, &cp.schedule, Some(cp.slack.as_slice()));
    println!("makespan: {}", cp.schedule.c);
    println!(
        "critical tasks: {}",
        cp.critical_tasks()
            .into_iter()
            .map(|j| instance.tasks()[j].label)
            .join(" ")
    );
    report(&instance, &instance.validate(&cp.schedule)?);
    println!(
        "peak usage: {}",
        instance
            .resources()
            .iter()
            .zip(instance.profile(&cp.schedule)?.peak())
            .map(|(r, peak)| format!("{} {}/{}", r.name, peak, r.capacity))
            .join(" ")
    );

    let optimizer = GeneticOptimizer::new(args.config());
    let outcome = optimizer.run(&instance);

    println!("\n== Genetic optimizer ==");
    println!(
        "best order: {}",
        outcome
            .order
            .iter()
            .filter_map(|&j| instance.tasks().get(j))
            .map(|t| t.label)
            .join(" ")
    );
    println!("makespan: {}", outcome.makespan);
    println!(
        "generations: {}, evaluations: {}, invalid children: {}, elapsed: {:?}{}",
        outcome.stats.generations,
        outcome.stats.evaluations,
        outcome.stats.invalid_children,
        outcome.stats.elapsed,
        if outcome.stats.timed_out {
            " (time limit reached)"
        } else {
            ""
        }
    );

    let schedule = outcome.schedule(&instance)?;
    print_schedule(&instance, &schedule, None);

    let violations = schedule.precedence_violations(instance.prec());
    if !violations.is_empty() {
        println!(
            "precedence violations: {}",
            violations
                .iter()
                .map(|&(a, b)| format!(
                    "{}->{}",
                    instance.tasks()[a].label,
                    instance.tasks()[b].label
                ))
                .join(" ")
        );
    }
    report(&instance, &instance.validate(&schedule)?);

    Ok(())
}

fn print_schedule(instance: &Instance<u32>, schedule: &Schedule<u32>, slack: Option<&[u32]>) {
    println!(
        "{:>6} {:>6} {:>6} {:>6}{}",
        "task",
        "start",
        "end",
        "dur",
        if slack.is_some() { "  slack" } else { "" }
    );
    for (j, s, e) in schedule.gantt() {
        let task = &instance.tasks()[j];
        match slack.and_then(|slack| slack.get(j)) {
            Some(slack) => println!(
                "{:>6} {:>6} {:>6} {:>6} {:>6}",
                task.label, s, e, task.duration, slack
            ),
            None => println!("{:>6} {:>6} {:>6} {:>6}", task.label, s, e, task.duration),
        }
    }
}

fn report(instance: &Instance<u32>, feasibility: &Feasibility<u32>) {
    match *feasibility {
        Feasibility::Feasible => println!("resources: valid"),
        Feasibility::OverCommitted {
            time,
            resource,
            demand,
            capacity,
        } => println!(
            "resources: conflict at time {} ({} demands {} of {})",
            time,
            instance
                .resources()
                .get(resource)
                .map_or("?", |r| r.name.as_str()),
            demand,
            capacity
        ),
    }
}

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rcpsp::cpm;
use rcpsp::prec::PrecedenceGraph;
use rcpsp::resource::{self, Feasibility};
use rcpsp::{Error, Instance, Resource, Task};

/// Random DAG on `n` tasks whose index order is not necessarily a topological order.
fn random_instance(rng: &mut StdRng, n: usize) -> Instance<u32> {
    let tasks = (0..n)
        .map(|j| Task::new(j as u32, rng.gen_range(0..10), vec![rng.gen_range(0..3)]))
        .collect();

    let mut rank = (0..n).collect::<Vec<_>>();
    rank.shuffle(rng);

    let mut edges = Vec::new();
    for a in 0..n {
        for b in a + 1..n {
            if rng.gen_bool(0.2) {
                edges.push((rank[a], rank[b]));
            }
        }
    }

    Instance::new(tasks, vec![Resource::new("R1", 3)], edges).expect("DAG")
}

#[test]
fn fork_scenario() {
    // A(2) -> B(3), A -> C(1)
    let tasks = vec![
        Task::new(1, 2u32, vec![1]),
        Task::new(2, 3, vec![1]),
        Task::new(3, 1, vec![1]),
    ];
    let instance = Instance::new(tasks, vec![Resource::new("R1", 2)], [(0, 1), (0, 2)])
        .expect("DAG");

    let schedule = instance.evaluate(&[0, 1, 2]).expect("known tasks");

    assert_eq!(schedule.s, vec![0, 2, 2]);
    assert_eq!(schedule.e, vec![2, 5, 3]);
    assert_eq!(schedule.c, 5);
    assert_eq!(schedule, instance.earliest_schedule());
}

#[test]
fn overlap_scenario() {
    let s: &[u32] = &[0, 0];
    let p: &[u32] = &[1, 1];
    let demands = [vec![2], vec![2]];

    let (valid, time): (bool, Option<u32>) = resource::validate(s, p, &demands, &[2])
        .expect("known resources")
        .into();

    assert!(!valid);
    assert_eq!(time, Some(0));
}

#[test]
fn single_task_scenario() {
    let tasks = vec![Task::new(1, 5u32, vec![2])];
    let instance = Instance::new(tasks, vec![Resource::new("R1", 3)], []).expect("DAG");

    let schedule = instance.earliest_schedule();
    let feasibility = instance.validate(&schedule).expect("known resources");

    assert_eq!(schedule.c, 5);
    assert_eq!(feasibility, Feasibility::Feasible);
    assert_eq!(feasibility.first_violation(), None);
}

#[test]
fn topological_order_respects_all_predecessors() {
    let mut rng = StdRng::seed_from_u64(42);

    for n in [0, 1, 5, 20, 50] {
        let instance = random_instance(&mut rng, n);
        let order = instance.topological_order();

        assert!(instance.prec().is_linear_extension(order));

        let mut position = vec![0; n];
        for (k, &j) in order.iter().enumerate() {
            position[j] = k;
        }
        for (a, b) in instance.prec().edges() {
            assert!(position[a] < position[b], "{} -> {} in {:?}", a, b, order);
        }
    }
}

#[test]
fn earliest_schedule_satisfies_precedences() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let instance = random_instance(&mut rng, 30);
        let schedule = instance.earliest_schedule();

        assert!(schedule.is_precedence_feasible(instance.prec()));
        for (j, (&s, &e)) in schedule.s.iter().zip(&schedule.e).enumerate() {
            assert_eq!(e, s + instance.durations()[j]);
        }
        assert_eq!(schedule.c, schedule.e.iter().copied().max().unwrap_or(0));
    }
}

#[test]
fn random_linear_extensions_give_earliest_schedule() {
    let mut rng = StdRng::seed_from_u64(11);
    let instance = random_instance(&mut rng, 25);
    let earliest = instance.earliest_schedule();

    for _ in 0..20 {
        let order = instance
            .prec()
            .random_topological_order(&mut rng)
            .expect("DAG");
        assert_eq!(instance.evaluate(&order).expect("known tasks"), earliest);
    }
}

#[test]
fn evaluation_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(3);
    let instance = random_instance(&mut rng, 15);
    let order = (0..15).rev().collect::<Vec<_>>();

    let first = instance.evaluate(&order).expect("known tasks");
    let second = instance.evaluate(&order).expect("known tasks");
    assert_eq!(first, second);
}

#[test]
fn critical_tasks_span_the_makespan() {
    let mut rng = StdRng::seed_from_u64(5);
    let instance = random_instance(&mut rng, 30);
    let cp = cpm::critical_path(&instance);

    assert!(cp.ls.iter().zip(&cp.schedule.s).all(|(ls, s)| ls >= s));

    let critical = cp.critical_tasks();
    assert!(!critical.is_empty());
    assert!(critical
        .iter()
        .any(|&j| cp.schedule.e[j] == cp.schedule.c));
}

#[test]
fn cycles_are_rejected() {
    let tasks = (0..4).map(|j| Task::new(j, 1u32, vec![])).collect();
    let result = Instance::new(tasks, vec![], [(0, 1), (1, 2), (2, 3), (3, 1)]);
    assert_eq!(result.err(), Some(Error::CycleDetected { task: 1 }));

    let prec = PrecedenceGraph::from_edges(2, [(0, 1), (1, 0)]).expect("known tasks");
    assert_eq!(prec.topological_order(), Err(Error::CycleDetected { task: 0 }));
}

#[test]
fn validator_matches_definition() {
    let mut rng = StdRng::seed_from_u64(17);

    for _ in 0..50 {
        let instance = random_instance(&mut rng, 12);
        let schedule = instance.earliest_schedule();
        let feasibility = instance.validate(&schedule).expect("known resources");

        // brute force over the horizon
        let mut first = None;
        for t in 0..schedule.c {
            let demand: u32 = instance
                .tasks()
                .iter()
                .zip(&schedule.s)
                .filter(|(task, &s)| s <= t && t < s + task.duration)
                .map(|(task, _)| task.demand[0])
                .sum();
            if demand > 3 {
                first = Some(t);
                break;
            }
        }

        assert_eq!(feasibility.is_valid(), first.is_none());
        assert_eq!(feasibility.first_violation(), first);
    }
}

//! Multi-rank runs over an in-process group.

use std::thread;

mod common;

use common::CorruptingAccelerator;
use vecadd::prelude::*;

fn config() -> BenchConfig {
    BenchConfig::default()
        .with_elements(8192)
        .with_backend(Backend::Cpu)
}

#[test]
fn test_four_ranks_report_group_maxima() {
    let handles: Vec<_> = ThreadGroup::members(4)
        .into_iter()
        .map(|member| {
            thread::spawn(move || {
                let rank = member.context().rank;
                let config = config().with_input(InputSource::Seeded(rank as u64));
                vecadd::run(config, &member).map(|e| (rank, e.outcome))
            })
        })
        .collect();

    let outcomes: Vec<(usize, RunOutcome)> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("rank failed"))
        .collect();

    let max_kernel = outcomes
        .iter()
        .map(|(_, o)| o.local.kernel_ms)
        .fold(f32::NEG_INFINITY, f32::max);
    let max_wall = outcomes
        .iter()
        .map(|(_, o)| o.local.wall_seconds)
        .fold(f64::NEG_INFINITY, f64::max);

    for (rank, outcome) in &outcomes {
        assert!(outcome.verification.passed);
        assert_eq!(outcome.context.size, 4);
        match outcome.group {
            Some(group) => {
                assert_eq!(*rank, 0);
                assert_eq!(group.max_kernel_ms, max_kernel);
                assert_eq!(group.max_wall_seconds, max_wall);
                assert!(group.max_kernel_ms >= outcome.local.kernel_ms);
                assert!(group.max_wall_seconds >= outcome.local.wall_seconds);
            }
            None => assert_ne!(*rank, 0),
        }
    }
}

/// A rank that fails verification exits before the reductions; its peers see
/// the departure instead of blocking.
#[test]
fn test_failing_rank_skips_reductions() {
    let mut members = ThreadGroup::members(2);
    let faulty = members.pop().unwrap();
    let coordinator = members.pop().unwrap();

    let failing = thread::spawn(move || {
        let accelerator = CorruptingAccelerator(CpuAccelerator::new());
        Benchmark::new(config(), &accelerator, &faulty)?.run()
    });
    let healthy = thread::spawn(move || {
        let accelerator = CpuAccelerator::new();
        Benchmark::new(config(), &accelerator, &coordinator)?.run()
    });

    let failed = failing.join().unwrap().unwrap_err();
    match &failed {
        BenchError::Verification { rank, .. } => assert_eq!(*rank, 1),
        other => panic!("expected verification failure, got {}", other),
    }
    assert_eq!(failed.exit_code(), 1);
    assert!(failed.to_string().starts_with("In rank 1: Test failed!"));

    let err = healthy.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        BenchError::Group(GroupError::PeerDeparted { rank: 1 })
    ));
    assert_eq!(err.exit_code(), 4);
}

/// Non-coordinators get no aggregated figures.
#[test]
fn test_only_coordinator_holds_results() {
    let handles: Vec<_> = ThreadGroup::members(3)
        .into_iter()
        .map(|member| {
            thread::spawn(move || {
                let accelerator = CpuAccelerator::new();
                let outcome = Benchmark::new(config(), &accelerator, &member)
                    .unwrap()
                    .run()
                    .unwrap();
                (member.context().is_coordinator(), outcome.group.is_some())
            })
        })
        .collect();

    for handle in handles {
        let (coordinator, has_group) = handle.join().unwrap();
        assert_eq!(coordinator, has_group);
    }
}

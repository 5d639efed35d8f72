//! Integration tests for the RMSA strategies
//!
//! These drive full allocation attempts against small networks and
//! check the decision engine's observable behavior.

#![allow(clippy::float_cmp)]

use eonsim_core::{
    Demand, DemandAllocationResult, Direction, Modulation, ModulationCatalogue, Network, NodeId,
    VOLUME_BUCKETS,
};
use eonsim_rl::{QTable, RmsaStrategy, StateKey, StrategyConfig};

fn flat_catalogue(
    reaches: [f64; Modulation::COUNT],
    slots: [usize; Modulation::COUNT],
) -> ModulationCatalogue {
    ModulationCatalogue::new(
        reaches.iter().map(|&r| [r; VOLUME_BUCKETS]).collect(),
        slots.iter().map(|&s| [s; VOLUME_BUCKETS]).collect(),
    )
}

fn two_node_network(length: f64, slots: usize, cat: ModulationCatalogue) -> Network {
    let mut b = Network::builder();
    let a = b.add_node("a", 4);
    let c = b.add_node("b", 4);
    b.add_link(a, c, length);
    b.slots_per_core(slots);
    b.catalogue(cat);
    b.build().unwrap()
}

fn triangle_network(slots: usize, cat: ModulationCatalogue) -> Network {
    let mut b = Network::builder();
    let a = b.add_node("a", 4);
    let c = b.add_node("b", 4);
    let d = b.add_node("c", 4);
    b.add_link(a, d, 100.0);
    b.add_link(a, c, 80.0);
    b.add_link(c, d, 80.0);
    b.slots_per_core(slots);
    b.catalogue(cat);
    b.build().unwrap()
}

#[test]
fn test_single_feasible_format_chosen_regardless_of_epsilon() {
    // one-span path of length 80 at bucket 0; only BPSK (reach 100)
    // covers it
    let cat = flat_catalogue([100.0, 50.0, 50.0, 50.0, 50.0, 50.0], [4, 2, 2, 2, 2, 2]);

    for epsilon in [0.0, 0.3, 1.0] {
        let mut net = two_node_network(80.0, 16, cat.clone());
        let config = StrategyConfig {
            epsilon,
            ..StrategyConfig::ql()
        };
        let mut strategy = RmsaStrategy::new("QL", &net, config, 11);
        let mut demand = Demand::new(NodeId(0), NodeId(1), 10.0, 5);

        let result = strategy.allocate_demand(&mut demand, &mut net).unwrap();
        match result {
            DemandAllocationResult::Success { working, .. } => {
                assert_eq!(working.part_count(), 1);
                assert_eq!(working.parts()[0].modulation(), Some(Modulation::Bpsk));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}

#[test]
fn test_committed_spans_respect_reach() {
    let mut net = triangle_network(64, ModulationCatalogue::standard());
    let mut strategy = RmsaStrategy::ql(&net, 17);

    for _ in 0..30 {
        let mut demand = Demand::new(NodeId(0), NodeId(2), 100.0, 1_000_000);
        let v = demand.volume_bucket();
        if let DemandAllocationResult::Success { working, .. } =
            strategy.allocate_demand(&mut demand, &mut net).unwrap()
        {
            for part in working.parts() {
                let m = part.modulation().unwrap();
                assert!(part.length() < net.catalogue().reach(m, v));
            }
        }
    }
}

#[test]
fn test_all_candidates_blocked_yields_no_spectrum_and_negative_updates() {
    let cat = flat_catalogue([100.0, 50.0, 50.0, 50.0, 50.0, 50.0], [4, 4, 4, 4, 4, 4]);
    let mut net = two_node_network(80.0, 4, cat);

    // saturate the only link in the working direction
    let link = net.link_between(NodeId(0), NodeId(1)).unwrap();
    net.link_mut(link)
        .unwrap()
        .reserve(0, Direction::Up, 0, 4)
        .unwrap();

    let mut strategy = RmsaStrategy::ql(&net, 23);
    let mut demand = Demand::new(NodeId(0), NodeId(1), 10.0, 5);
    let result = strategy.allocate_demand(&mut demand, &mut net).unwrap();

    assert!(matches!(result, DemandAllocationResult::NoSpectrum));
    assert!(demand.working_path().is_none());

    // every attempted span got a negative-reward update
    let key = StateKey {
        link,
        volume: 0,
        usage: QTable::usage_bucket(1.0),
        modulation: Modulation::Bpsk,
    };
    assert!(strategy.qtable().get(key) < 0.0);
}

#[test]
fn test_unrealizable_route_yields_no_regenerators() {
    // the single hop exceeds every format's reach
    let cat = flat_catalogue([100.0, 50.0, 50.0, 50.0, 50.0, 50.0], [4, 2, 2, 2, 2, 2]);
    let mut net = two_node_network(500.0, 16, cat);
    let mut strategy = RmsaStrategy::ql(&net, 29);
    let mut demand = Demand::new(NodeId(0), NodeId(1), 10.0, 5);

    let result = strategy.allocate_demand(&mut demand, &mut net).unwrap();
    assert!(matches!(result, DemandAllocationResult::NoRegenerators));
}

#[test]
fn test_backup_failure_keeps_working_allocation() {
    // two disjoint routes exist; the detour is too long for any format,
    // so the backup can never be provisioned
    let cat = flat_catalogue([120.0, 50.0, 50.0, 50.0, 50.0, 50.0], [2, 2, 2, 2, 2, 2]);
    let mut net = triangle_network(16, cat);
    let mut strategy = RmsaStrategy::new(
        "QL",
        &net,
        StrategyConfig {
            epsilon: 1.0,
            ..StrategyConfig::ql()
        },
        31,
    );
    // regenerator-free detour is impossible: 80 + 80 needs a
    // regenerator, but give the middle node none
    net.node_mut(NodeId(1)).unwrap().try_occupy_regenerators(4);

    let mut demand = Demand::new(NodeId(0), NodeId(2), 10.0, 5).with_backup(10.0);
    let result = strategy.allocate_demand(&mut demand, &mut net).unwrap();

    match result {
        DemandAllocationResult::Success { working, backup } => {
            assert_eq!(working.parts()[0].nodes(), [NodeId(0), NodeId(2)]);
            assert!(backup.is_none());
        }
        other => panic!("expected success without backup, got {other:?}"),
    }
    assert!(demand.working_path().is_some());
    assert!(demand.backup_path().is_none());
}

#[test]
fn test_backup_uses_disjoint_route_and_squeezed_volume() {
    let cat = flat_catalogue(
        [1000.0, 500.0, 250.0, 130.0, 60.0, 30.0],
        [8, 6, 4, 3, 2, 1],
    );
    let mut net = triangle_network(32, cat);
    let mut strategy = RmsaStrategy::new(
        "QL",
        &net,
        StrategyConfig {
            epsilon: 1.0,
            ..StrategyConfig::ql()
        },
        37,
    );

    let mut demand = Demand::new(NodeId(0), NodeId(2), 40.0, 5).with_backup(20.0);
    let result = strategy.allocate_demand(&mut demand, &mut net).unwrap();

    match result {
        DemandAllocationResult::Success { working, backup } => {
            let backup = backup.expect("backup expected");
            let working_links: Vec<_> = working
                .parts()
                .iter()
                .flat_map(|p| p.reserved().iter().map(|r| r.link))
                .collect();
            let disjoint = backup
                .parts()
                .iter()
                .flat_map(|p| p.reserved().iter())
                .all(|r| !working_links.contains(&r.link));
            assert!(disjoint, "backup must not share links with working");

            // squeezed volume 20 -> bucket 1; backup spans sized for it
            let backup_count = backup.parts()[0].reserved()[0].count;
            let m = backup.parts()[0].modulation().unwrap();
            assert_eq!(backup_count, net.catalogue().slots(m, 1));
        }
        other => panic!("expected success with backup, got {other:?}"),
    }
}

#[test]
fn test_identical_runs_are_deterministic() {
    let build = || triangle_network(32, ModulationCatalogue::standard());

    let run = |seed: u64| {
        let mut net = build();
        let mut strategy = RmsaStrategy::ql(&net, seed);
        let mut outcomes = Vec::new();
        for i in 0..40 {
            let (s, d) = if i % 2 == 0 {
                (NodeId(0), NodeId(2))
            } else {
                (NodeId(1), NodeId(0))
            };
            let mut demand = Demand::new(s, d, f64::from(10 * (i % 8 + 1)), 1_000_000);
            let result = strategy.allocate_demand(&mut demand, &mut net).unwrap();
            outcomes.push(result.is_success());
        }
        (outcomes, strategy.qtable().clone())
    };

    let (outcomes_a, table_a) = run(99);
    let (outcomes_b, table_b) = run(99);
    assert_eq!(outcomes_a, outcomes_b);
    assert_eq!(table_a, table_b);

    let (outcomes_c, _) = run(100);
    // different seed is allowed to differ; identical is unlikely but
    // not an error, so only check the run completed
    assert_eq!(outcomes_c.len(), outcomes_a.len());
}

#[test]
fn test_learning_cap_freezes_table() {
    let cat = flat_catalogue([1000.0, 500.0, 250.0, 130.0, 60.0, 30.0], [4, 3, 3, 2, 2, 1]);
    let mut net = two_node_network(80.0, 64, cat);
    let config = StrategyConfig {
        learning_cap: Some(2),
        ..StrategyConfig::ql()
    };
    let mut strategy = RmsaStrategy::new("QL", &net, config, 41);

    for _ in 0..2 {
        let mut demand = Demand::new(NodeId(0), NodeId(1), 10.0, 5);
        strategy.allocate_demand(&mut demand, &mut net).unwrap();
    }
    let frozen = strategy.qtable().clone();

    for _ in 0..5 {
        let mut demand = Demand::new(NodeId(0), NodeId(1), 10.0, 5);
        strategy.allocate_demand(&mut demand, &mut net).unwrap();
    }
    assert_eq!(*strategy.qtable(), frozen);
}

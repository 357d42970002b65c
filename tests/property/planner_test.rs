// tests/property/planner_test.rs

//! Properties of the reshard planner and the rebalance arithmetic.

use proptest::prelude::*;
use redis_trib::core::node::{ClusterNode, NodeFlags};
use redis_trib::core::rebalance::{assign_weights, candidates, compute_balances, correct_rounding};
use redis_trib::core::reshard::compute_reshard_table;
use redis_trib::core::topology::Topology;
use std::collections::HashSet;

fn topo_from_slot_sets(sets: &[Vec<u16>]) -> Topology {
    let mut topo = Topology::new();
    for (i, slots) in sets.iter().enumerate() {
        let mut node = ClusterNode::new(&format!("127.0.0.1:{}", 7000 + i)).unwrap();
        node.info.id = format!("{i:040x}");
        node.info.flags = NodeFlags::MASTER;
        for &slot in slots {
            node.add_slots_range(slot, slot);
        }
        topo.add_node(node);
    }
    topo
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn reshard_table_is_exact_and_duplicate_free(
        sets in prop::collection::vec(
            prop::collection::btree_set(0u16..16384, 0..200),
            1..6
        ),
        num_slots in 1usize..400,
    ) {
        let sets: Vec<Vec<u16>> = sets
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        let topo = topo_from_slot_sets(&sets);
        let sources: Vec<usize> = (0..sets.len()).collect();
        let donor_total: usize = sets.iter().map(Vec::len).sum();

        let table = compute_reshard_table(&topo, &sources, num_slots);

        // The plan is exactly as long as requested, saturating at what the
        // donors own in total.
        prop_assert_eq!(table.len(), num_slots.min(donor_total));

        // No movement is planned twice and every slot belongs to its donor.
        let mut seen = HashSet::new();
        for entry in &table {
            prop_assert!(seen.insert((entry.source, entry.slot)));
            prop_assert!(topo.node(entry.source).slots.contains_key(&entry.slot));
        }
    }

    #[test]
    fn reshard_table_takes_each_donor_slots_ascending(
        sets in prop::collection::vec(
            prop::collection::btree_set(0u16..16384, 1..100),
            1..5
        ),
        num_slots in 1usize..200,
    ) {
        let sets: Vec<Vec<u16>> = sets
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        let topo = topo_from_slot_sets(&sets);
        let sources: Vec<usize> = (0..sets.len()).collect();

        let table = compute_reshard_table(&topo, &sources, num_slots);

        let mut last_per_donor: Vec<Option<u16>> = vec![None; sets.len()];
        for entry in &table {
            if let Some(prev) = last_per_donor[entry.source] {
                prop_assert!(entry.slot > prev);
            }
            last_per_donor[entry.source] = Some(entry.slot);
        }
    }

    #[test]
    fn rebalance_rounding_balances_donors_and_receivers(
        cuts in prop::collection::btree_set(1u32..16384, 1..7),
        weights in prop::collection::vec(1u32..5, 8),
    ) {
        // Cut the full slot space into contiguous ranges so the node slot
        // counts always sum to 16384, the state of any healthy cluster.
        let mut boundaries: Vec<u32> = vec![0];
        boundaries.extend(cuts.iter().copied());
        boundaries.push(16384);
        let sets: Vec<Vec<u16>> = boundaries
            .windows(2)
            .map(|w| (w[0] as u16..w[1] as u16).collect())
            .collect();
        let mut topo = topo_from_slot_sets(&sets);
        let overrides: Vec<(String, u32)> = weights
            .iter()
            .take(sets.len())
            .enumerate()
            .map(|(i, &w)| (format!("{i:040x}"), w))
            .collect();
        assign_weights(&mut topo, &overrides).unwrap();

        let cands = candidates(&topo, true);
        compute_balances(&mut topo, &cands, 0);
        correct_rounding(&mut topo, &cands);

        let total: i64 = cands.iter().map(|&i| topo.node(i).balance).sum();
        let has_receiver = cands.iter().any(|&i| topo.node(i).balance < 0);
        // Donors and receivers cancel exactly, except in the degenerate case
        // where nobody is below its expected share and there is nothing to
        // receive in the first place.
        prop_assert!(total == 0 || !has_receiver);
    }
}

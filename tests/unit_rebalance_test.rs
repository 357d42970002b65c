use redis_trib::core::node::{ClusterNode, NodeFlags};
use redis_trib::core::rebalance::{
    assign_weights, candidates, compute_balances, correct_rounding, parse_weight_arg,
};
use redis_trib::core::topology::Topology;

fn master(addr: &str, id: &str, ranges: &[(u16, u16)]) -> ClusterNode {
    let mut node = ClusterNode::new(addr).unwrap();
    node.info.id = id.to_string();
    node.info.flags = NodeFlags::MASTER;
    for &(first, last) in ranges {
        node.add_slots_range(first, last);
    }
    node
}

fn balanced_three() -> Topology {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[(0, 5460)]));
    topo.add_node(master("127.0.0.1:7001", "bbb1", &[(5461, 10922)]));
    topo.add_node(master("127.0.0.1:7002", "ccc2", &[(10923, 16383)]));
    topo
}

#[tokio::test]
async fn test_parse_weight_arg() {
    assert_eq!(
        parse_weight_arg("aaa0=2").unwrap(),
        ("aaa0".to_string(), 2)
    );
    assert!(parse_weight_arg("aaa0").is_err());
    assert!(parse_weight_arg("aaa0=two").is_err());
    assert!(parse_weight_arg("aaa0=-1").is_err());
}

#[tokio::test]
async fn test_assign_weights_resolves_prefixes_and_rejects_unknown() {
    let mut topo = balanced_three();
    assign_weights(&mut topo, &[("bbb".to_string(), 3)]).unwrap();
    assert_eq!(topo.node(1).weight, 3);
    assert_eq!(topo.node(0).weight, 1);
    assert!(assign_weights(&mut topo, &[("zzz".to_string(), 2)]).is_err());
}

#[tokio::test]
async fn test_candidates_skip_empty_masters_by_default() {
    let mut topo = balanced_three();
    topo.add_node(master("127.0.0.1:7003", "ddd3", &[]));
    assert_eq!(candidates(&topo, false), vec![0, 1, 2]);
    assert_eq!(candidates(&topo, true), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_weighted_expected_shares() {
    // Weights 1,1,2 over an evenly loaded cluster: expected counts are
    // 4096/4096/8192 and the heavy node must receive ~2731 slots.
    let mut topo = balanced_three();
    assign_weights(&mut topo, &[("ccc2".to_string(), 2)]).unwrap();
    let cands = candidates(&topo, false);
    let over = compute_balances(&mut topo, &cands, 0);
    assert!(over);
    assert_eq!(topo.node(0).balance, 5461 - 4096);
    assert_eq!(topo.node(1).balance, 5462 - 4096);
    assert_eq!(topo.node(2).balance, 5461 - 8192);
    correct_rounding(&mut topo, &cands);
    let total: i64 = cands.iter().map(|&i| topo.node(i).balance).sum();
    assert_eq!(total, 0);
    // Donors together owe exactly what the receiver is missing.
    assert_eq!(topo.node(0).balance + topo.node(1).balance, 2731);
    assert_eq!(topo.node(2).balance, -2731);
}

#[tokio::test]
async fn test_converged_cluster_is_within_threshold() {
    // Slot counts 5461/5462/5461 against an expected 5461 are well within
    // the default 2% threshold: a second rebalance run moves nothing.
    let mut topo = balanced_three();
    assign_weights(&mut topo, &[]).unwrap();
    let cands = candidates(&topo, false);
    assert!(!compute_balances(&mut topo, &cands, 2));
}

#[tokio::test]
async fn test_zero_threshold_flags_off_by_one() {
    let mut topo = balanced_three();
    assign_weights(&mut topo, &[]).unwrap();
    let cands = candidates(&topo, false);
    // expected = floor(16384/3) = 5461; the node holding 5462 deviates.
    assert!(compute_balances(&mut topo, &cands, 0));
}

#[tokio::test]
async fn test_empty_master_triggers_rebalance_when_included() {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[(0, 8191)]));
    topo.add_node(master("127.0.0.1:7001", "bbb1", &[(8192, 16383)]));
    topo.add_node(master("127.0.0.1:7002", "ccc2", &[]));
    assign_weights(&mut topo, &[]).unwrap();

    let cands = candidates(&topo, true);
    assert_eq!(cands, vec![0, 1, 2]);
    let over = compute_balances(&mut topo, &cands, 2);
    assert!(over);
    // The empty master expects floor(16384/3) slots and must receive them.
    assert_eq!(topo.node(2).balance, -5461);
    correct_rounding(&mut topo, &cands);
    let total: i64 = cands.iter().map(|&i| topo.node(i).balance).sum();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_rounding_correction_pushes_excess_to_receivers() {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[(0, 16383)]));
    topo.add_node(master("127.0.0.1:7001", "bbb1", &[]));
    topo.add_node(master("127.0.0.1:7002", "ccc2", &[]));
    assign_weights(&mut topo, &[]).unwrap();
    let cands = candidates(&topo, true);
    compute_balances(&mut topo, &cands, 2);
    // floor(16384/3)*3 = 16383: one slot of rounding excess.
    let before: i64 = cands.iter().map(|&i| topo.node(i).balance).sum();
    assert_eq!(before, 1);
    correct_rounding(&mut topo, &cands);
    let after: i64 = cands.iter().map(|&i| topo.node(i).balance).sum();
    assert_eq!(after, 0);
}

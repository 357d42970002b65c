use redis_trib::core::node::{ClusterNode, NodeFlags};
use redis_trib::core::reshard::{SourceSpec, compute_reshard_table, resolve_sources};
use redis_trib::core::topology::Topology;
use std::collections::HashSet;

fn master(addr: &str, id: &str, ranges: &[(u16, u16)]) -> ClusterNode {
    let mut node = ClusterNode::new(addr).unwrap();
    node.info.id = id.to_string();
    node.info.flags = NodeFlags::MASTER;
    for &(first, last) in ranges {
        node.add_slots_range(first, last);
    }
    node
}

fn slave(addr: &str, id: &str, master_id: &str) -> ClusterNode {
    let mut node = ClusterNode::new(addr).unwrap();
    node.info.id = id.to_string();
    node.info.flags = NodeFlags::SLAVE;
    node.info.replicate_of = master_id.to_string();
    node
}

fn three_masters() -> Topology {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[(0, 5460)]));
    topo.add_node(master("127.0.0.1:7001", "bbb1", &[(5461, 10922)]));
    topo.add_node(master("127.0.0.1:7002", "ccc2", &[(10923, 16383)]));
    topo
}

#[tokio::test]
async fn test_single_source_takes_lowest_slots_first() {
    let topo = three_masters();
    let table = compute_reshard_table(&topo, &[0], 100);
    assert_eq!(table.len(), 100);
    for (i, entry) in table.iter().enumerate() {
        assert_eq!(entry.source, 0);
        assert_eq!(entry.slot, i as u16);
    }
}

#[tokio::test]
async fn test_plan_is_proportional_and_exact() {
    let topo = three_masters();
    let table = compute_reshard_table(&topo, &[0, 1, 2], 3000);
    assert_eq!(table.len(), 3000);

    // No duplicated movement, and every slot belongs to its donor.
    let mut seen = HashSet::new();
    for entry in &table {
        assert!(seen.insert(entry.slot));
        assert!(topo.node(entry.source).slots.contains_key(&entry.slot));
    }

    // Every donor contributes roughly a third.
    for src in 0..3 {
        let share = table.iter().filter(|e| e.source == src).count();
        assert!((999..=1002).contains(&share), "share was {share}");
    }
}

#[tokio::test]
async fn test_biggest_donor_absorbs_remainder() {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[(0, 99)]));
    topo.add_node(master("127.0.0.1:7001", "bbb1", &[(100, 399)]));
    // 7 slots out of 400: the bigger donor (300 slots) rounds up.
    let table = compute_reshard_table(&topo, &[0, 1], 7);
    assert_eq!(table.len(), 7);
    let from_big = table.iter().filter(|e| e.source == 1).count();
    let from_small = table.iter().filter(|e| e.source == 0).count();
    assert_eq!(from_big, 6); // ceil(7 * 300/400) = 6
    assert_eq!(from_small, 1); // floor(7 * 100/400) = 1
}

#[tokio::test]
async fn test_plan_saturates_at_donor_capacity() {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[(10, 14)]));
    let table = compute_reshard_table(&topo, &[0], 100);
    assert_eq!(table.len(), 5);
    let slots: Vec<u16> = table.iter().map(|e| e.slot).collect();
    assert_eq!(slots, vec![10, 11, 12, 13, 14]);
}

#[tokio::test]
async fn test_empty_sources_produce_empty_plan() {
    let mut topo = Topology::new();
    topo.add_node(master("127.0.0.1:7000", "aaa0", &[]));
    assert!(compute_reshard_table(&topo, &[0], 10).is_empty());
    assert!(compute_reshard_table(&topo, &[], 10).is_empty());
}

#[tokio::test]
async fn test_source_spec_parsing() {
    assert_eq!(SourceSpec::parse("all"), SourceSpec::All);
    assert_eq!(SourceSpec::parse("aaa0, all"), SourceSpec::All);
    assert_eq!(
        SourceSpec::parse("aaa0, bbb1"),
        SourceSpec::Ids(vec!["aaa0".to_string(), "bbb1".to_string()])
    );
}

#[tokio::test]
async fn test_resolve_sources_all_excludes_target_and_slaves() {
    let mut topo = three_masters();
    topo.add_node(slave("127.0.0.1:7003", "ddd3", "aaa0"));
    let sources = resolve_sources(&topo, &SourceSpec::All, 1).unwrap();
    assert_eq!(sources, vec![0, 2]);
}

#[tokio::test]
async fn test_resolve_sources_rejects_target_and_slaves() {
    let mut topo = three_masters();
    topo.add_node(slave("127.0.0.1:7003", "ddd3", "aaa0"));
    let spec = SourceSpec::Ids(vec!["bbb1".to_string()]);
    assert!(resolve_sources(&topo, &spec, 1).is_err());
    let spec = SourceSpec::Ids(vec!["ddd3".to_string()]);
    assert!(resolve_sources(&topo, &spec, 1).is_err());
    let spec = SourceSpec::Ids(vec!["nope".to_string()]);
    assert!(resolve_sources(&topo, &spec, 1).is_err());
}

#[tokio::test]
async fn test_resolve_sources_accepts_id_prefixes() {
    let topo = three_masters();
    let spec = SourceSpec::Ids(vec!["aaa".to_string(), "ccc".to_string()]);
    assert_eq!(resolve_sources(&topo, &spec, 1).unwrap(), vec![0, 2]);
}

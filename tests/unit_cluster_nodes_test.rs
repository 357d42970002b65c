use redis_trib::core::node::{
    NodeFlags, config_signature, parse_addr, parse_cluster_nodes, parse_cluster_nodes_line,
    slots_to_ranges,
};

const ID_A: &str = "07c37dfeb235213a872192d90877d0cd55635b91";
const ID_B: &str = "67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1";
const ID_C: &str = "824fe116063bc5fcf9f4ffd895bc17aee7731ac3";

#[tokio::test]
async fn test_parse_master_line_with_ranges() {
    let line = format!("{ID_A} 127.0.0.1:7000 myself,master - 0 1426238317239 connected 0-5460 9000");
    let parsed = parse_cluster_nodes_line(&line).unwrap();
    assert_eq!(parsed.info.id, ID_A);
    assert_eq!(parsed.info.addr, "127.0.0.1:7000");
    assert!(parsed.info.flags.contains(NodeFlags::MYSELF));
    assert!(parsed.info.flags.contains(NodeFlags::MASTER));
    assert_eq!(parsed.info.replicate_of, "");
    assert_eq!(parsed.info.ping_sent, 0);
    assert_eq!(parsed.info.ping_recv, 1426238317239);
    assert_eq!(parsed.info.link_status, "connected");
    assert_eq!(parsed.slots.len(), 5462);
    assert_eq!(parsed.slots[0], 0);
    assert_eq!(parsed.slots[5460], 5460);
    assert_eq!(parsed.slots[5461], 9000);
    assert!(parsed.migrating.is_empty());
    assert!(parsed.importing.is_empty());
}

#[tokio::test]
async fn test_parse_slave_line() {
    let line =
        format!("{ID_B} 127.0.0.1:7003 slave {ID_A} 0 1426238316232 connected");
    let parsed = parse_cluster_nodes_line(&line).unwrap();
    assert!(parsed.info.flags.contains(NodeFlags::SLAVE));
    assert_eq!(parsed.info.replicate_of, ID_A);
    assert!(parsed.slots.is_empty());
}

#[tokio::test]
async fn test_parse_migrating_and_importing_markers() {
    let line = format!(
        "{ID_A} 127.0.0.1:7000 myself,master - 0 0 connected 0-99 [42->-{ID_B}] [93-<-{ID_C}]"
    );
    let parsed = parse_cluster_nodes_line(&line).unwrap();
    assert_eq!(parsed.migrating, vec![(42, ID_B.to_string())]);
    assert_eq!(parsed.importing, vec![(93, ID_C.to_string())]);
    // The transient markers never add to the owned slot set.
    assert_eq!(parsed.slots.len(), 100);
}

#[tokio::test]
async fn test_parse_strips_bus_port_suffix() {
    let line = format!("{ID_A} 10.0.0.1:6379@16379 master - 0 0 connected");
    let parsed = parse_cluster_nodes_line(&line).unwrap();
    assert_eq!(parsed.info.addr, "10.0.0.1:6379");
}

#[tokio::test]
async fn test_parse_rejects_malformed_lines() {
    assert!(parse_cluster_nodes_line("too few fields").is_err());
    let bad_slot = format!("{ID_A} 127.0.0.1:7000 master - 0 0 connected 99999");
    assert!(parse_cluster_nodes_line(&bad_slot).is_err());
    let bad_range = format!("{ID_A} 127.0.0.1:7000 master - 0 0 connected 100-50");
    assert!(parse_cluster_nodes_line(&bad_range).is_err());
    let bad_marker = format!("{ID_A} 127.0.0.1:7000 master - 0 0 connected [42-??-{ID_B}]");
    assert!(parse_cluster_nodes_line(&bad_marker).is_err());
}

#[tokio::test]
async fn test_parse_full_output_skips_blank_lines() {
    let output = format!(
        "{ID_A} 127.0.0.1:7000 myself,master - 0 0 connected 0-5460\n\
         {ID_B} 127.0.0.1:7001 master - 0 0 connected 5461-10922\n\n"
    );
    let parsed = parse_cluster_nodes(&output).unwrap();
    assert_eq!(parsed.len(), 2);
}

#[tokio::test]
async fn test_config_signature_ignores_transient_markers_and_order() {
    let a = format!(
        "{ID_A} 127.0.0.1:7000 myself,master - 0 0 connected 0-5460 [7->-{ID_B}]\n\
         {ID_B} 127.0.0.1:7001 master - 0 0 connected 5461-16383\n\
         {ID_C} 127.0.0.1:7002 slave {ID_A} 0 0 connected\n"
    );
    // Same topology seen from another node: different line order, different
    // transient markers, same owned slots.
    let b = format!(
        "{ID_B} 127.0.0.1:7001 myself,master - 0 0 connected 5461-16383 [7-<-{ID_A}]\n\
         {ID_A} 127.0.0.1:7000 master - 0 0 connected 0-5460\n"
    );
    assert_eq!(config_signature(&a), config_signature(&b));
    assert_eq!(
        config_signature(&a),
        format!("{ID_A}:0-5460|{ID_B}:5461-16383")
    );
}

#[tokio::test]
async fn test_config_signature_differs_on_ownership_change() {
    let a = format!("{ID_A} 127.0.0.1:7000 master - 0 0 connected 0-100\n");
    let b = format!("{ID_B} 127.0.0.1:7001 master - 0 0 connected 0-100\n");
    assert_ne!(config_signature(&a), config_signature(&b));
}

#[tokio::test]
async fn test_slots_to_ranges() {
    assert_eq!(slots_to_ranges(&[]), "");
    assert_eq!(slots_to_ranges(&[5]), "5");
    assert_eq!(slots_to_ranges(&[0, 1, 2, 3]), "0-3");
    assert_eq!(slots_to_ranges(&[0, 1, 5, 7, 8, 9]), "0-1,5,7-9");
    assert_eq!(slots_to_ranges(&[16382, 16383]), "16382-16383");
}

#[tokio::test]
async fn test_parse_addr() {
    assert_eq!(
        parse_addr("127.0.0.1:7000").unwrap(),
        ("127.0.0.1".to_string(), 7000)
    );
    assert!(parse_addr("127.0.0.1").is_err());
    assert!(parse_addr(":7000").is_err());
    assert!(parse_addr("host:notaport").is_err());
}

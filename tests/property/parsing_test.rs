// tests/property/parsing_test.rs

//! Properties of CLUSTER NODES parsing and the configuration signature.

use proptest::prelude::*;
use redis_trib::core::node::{
    config_signature, parse_cluster_nodes, parse_cluster_nodes_line, slots_to_ranges,
};

/// Renders one CLUSTER NODES line the way a node would, with canonical
/// merged range tokens.
fn render_line(id: &str, port: u16, slots: &[u16]) -> String {
    let mut line = format!("{id} 127.0.0.1:{port} master - 0 0 connected");
    let tokens = slots_to_ranges(slots);
    if !tokens.is_empty() {
        line.push(' ');
        line.push_str(&tokens.replace(',', " "));
    }
    line
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    #[test]
    fn slot_tokens_roundtrip_through_parsing(
        slots in prop::collection::btree_set(0u16..16384, 0..300),
    ) {
        let slots: Vec<u16> = slots.into_iter().collect();
        let line = render_line(&"ab".repeat(20), 7000, &slots);
        let parsed = parse_cluster_nodes_line(&line).unwrap();
        prop_assert_eq!(parsed.slots, slots);
    }

    #[test]
    fn signature_is_stable_under_reserialization(
        sets in prop::collection::vec(
            prop::collection::btree_set(0u16..16384, 0..100),
            1..5
        ),
    ) {
        let sets: Vec<Vec<u16>> = sets
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        let original: String = sets
            .iter()
            .enumerate()
            .map(|(i, slots)| render_line(&format!("{i:040x}"), 7000 + i as u16, slots) + "\n")
            .collect();

        // Parse the output, then rebuild it from the parsed model; the
        // canonical signature must not change.
        let parsed = parse_cluster_nodes(&original).unwrap();
        let rebuilt: String = parsed
            .iter()
            .enumerate()
            .map(|(i, line)| {
                render_line(&line.info.id, 7000 + i as u16, &line.slots) + "\n"
            })
            .collect();
        prop_assert_eq!(config_signature(&original), config_signature(&rebuilt));
    }

    #[test]
    fn signature_ignores_line_order(
        sets in prop::collection::vec(
            prop::collection::btree_set(0u16..16384, 1..100),
            2..5
        ),
    ) {
        let sets: Vec<Vec<u16>> = sets
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        let lines: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, slots)| render_line(&format!("{i:040x}"), 7000 + i as u16, slots))
            .collect();
        let forward = lines.join("\n");
        let reversed: Vec<String> = lines.iter().rev().cloned().collect();
        let backward = reversed.join("\n");
        prop_assert_eq!(config_signature(&forward), config_signature(&backward));
    }
}

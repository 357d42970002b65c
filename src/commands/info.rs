// src/commands/info.rs

use crate::core::TribError;
use crate::core::slot::NUM_SLOTS;
use crate::core::topology::Topology;
use tracing::info;

pub async fn run(addr: &str) -> anyhow::Result<()> {
    let mut topo = Topology::new();
    topo.load_from_seed(addr).await?;
    show_cluster_info(&mut topo).await?;
    Ok(())
}

/// Prints one line per master (keys, slots, replicas) and the totals.
async fn show_cluster_info(topo: &mut Topology) -> Result<(), TribError> {
    let mut masters = 0usize;
    let mut keys = 0i64;
    for idx in topo.indices() {
        if !topo.node(idx).is_master() {
            continue;
        }
        let dbsize = topo.node_mut(idx).dbsize().await?;
        let node = topo.node(idx);
        let id_prefix = node.info.id.get(..8).unwrap_or(&node.info.id);
        println!(
            "{} ({}...) -> {} keys | {} slots | {} slaves.",
            node,
            id_prefix,
            dbsize,
            node.slot_count(),
            node.replicas.len()
        );
        masters += 1;
        keys += dbsize;
    }
    info!("[OK] {keys} keys in {masters} masters.");
    println!(
        "{:.2} keys per slot on average.",
        keys as f64 / NUM_SLOTS as f64
    );
    Ok(())
}

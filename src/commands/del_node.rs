// src/commands/del_node.rs

use crate::core::topology::Topology;
use anyhow::bail;
use tracing::{error, info};

pub async fn run(addr: &str, node_id: &str) -> anyhow::Result<()> {
    let node_id = node_id.to_lowercase();
    info!(">>> Removing node {} from cluster {}", node_id, addr);
    let mut topo = Topology::new();
    topo.load_from_seed(addr).await?;

    let doomed = topo.resolve_node(&node_id)?;
    if topo.node(doomed).slot_count() > 0 {
        bail!(
            "Node {} is not empty! Reshard data away and try again.",
            topo.node(doomed)
        );
    }
    let doomed_id = topo.node(doomed).info.id.clone();

    // Replicas of the doomed node are re-homed onto the least-loaded master.
    let new_master = topo
        .indices()
        .filter(|&i| i != doomed && topo.node(i).is_master())
        .min_by_key(|&i| topo.node(i).replicas.len());

    info!(">>> Sending CLUSTER FORGET messages to the cluster...");
    for idx in topo.indices() {
        if idx == doomed {
            continue;
        }
        let replicate_of = topo.node(idx).info.replicate_of.clone();
        if replicate_of.eq_ignore_ascii_case(&doomed_id)
            && let Some(master) = new_master
        {
            let master_id = topo.node(master).info.id.clone();
            info!(">>> {} as replica of {}", topo.node(idx), topo.node(master));
            if let Err(e) = topo.node_mut(idx).cluster_replicate(&master_id).await {
                error!("{e}");
            }
        }
        if let Err(e) = topo.node_mut(idx).cluster_forget(&doomed_id).await {
            error!("{e}");
        }
    }

    info!(">>> SHUTDOWN the node.");
    topo.node_mut(doomed).shutdown().await?;
    Ok(())
}

// src/commands/add_node.rs

use crate::core::check::check_cluster;
use crate::core::node::ClusterNode;
use crate::core::prompt::StdinPrompter;
use crate::core::topology::Topology;
use anyhow::{anyhow, bail};
use tracing::info;

pub async fn run(
    new_addr: &str,
    existing_addr: &str,
    slave: bool,
    master_id: Option<&str>,
) -> anyhow::Result<()> {
    info!(">>> Adding node {} to cluster {}", new_addr, existing_addr);
    let mut topo = Topology::new();
    topo.load_from_seed(existing_addr).await?;
    let mut prompter = StdinPrompter;
    check_cluster(&mut topo, &mut prompter, false).await?;

    // Resolve the master up front so a bad --master-id aborts before the new
    // node's configuration is touched.
    let master_idx = if slave {
        let idx = match master_id {
            Some(id) => {
                let idx = topo.resolve_node(id)?;
                if !topo.node(idx).is_master() {
                    bail!("Node {} is not a master.", id);
                }
                idx
            }
            None => {
                let idx = topo
                    .master_with_least_replicas()
                    .ok_or_else(|| anyhow!("no master available in the cluster"))?;
                info!("Automatically selected master {}", topo.node(idx));
                idx
            }
        };
        Some(idx)
    } else {
        None
    };

    let mut new_node = ClusterNode::new(new_addr)?;
    new_node.client.connect().await?;
    new_node.assert_cluster().await?;
    new_node.load_info(false).await?;
    new_node.assert_empty().await?;

    let master_id = master_idx.map(|i| topo.node(i).info.id.clone());
    let master_addr = master_idx.map(|i| topo.node(i).to_string());
    let new_idx = topo.add_node(new_node);

    info!(
        ">>> Send CLUSTER MEET to node {} to make it join the cluster.",
        topo.node(new_idx)
    );
    topo.node_mut(new_idx).cluster_add_node(existing_addr).await?;

    if let Some(master_id) = master_id {
        topo.wait_cluster_join().await?;
        info!(
            ">>> Configure node as replica of {}.",
            master_addr.expect("set together with master_id")
        );
        topo.node_mut(new_idx).cluster_replicate(&master_id).await?;
    }
    info!("[OK] New node added correctly.");
    Ok(())
}

// src/commands/create.rs

use crate::core::check::check_cluster;
use crate::core::create::{alloc_slots, assign_config_epochs, check_create_parameters, join_cluster};
use crate::core::node::ClusterNode;
use crate::core::prompt::{Prompter, StdinPrompter};
use crate::core::topology::Topology;
use anyhow::bail;
use std::time::Duration;
use tracing::info;

pub async fn run(addrs: &[String], replicas: usize) -> anyhow::Result<()> {
    let mut topo = Topology::new();
    topo.replicas_per_master = replicas;

    info!(">>> Creating cluster");
    for addr in addrs {
        let mut node = ClusterNode::new(addr)?;
        node.client.connect().await?;
        node.assert_cluster().await?;
        node.load_info(false).await?;
        node.assert_empty().await?;
        topo.add_node(node);
    }

    check_create_parameters(&topo)?;
    info!(
        ">>> Performing hash slots allocation on {} nodes...",
        topo.len()
    );
    alloc_slots(&mut topo)?;
    topo.show_nodes();

    let mut prompter = StdinPrompter;
    if !prompter.confirm("Can I set the above configuration?") {
        bail!("*** Aborting...");
    }

    topo.flush_nodes_config().await?;
    info!(">>> Nodes configuration updated");
    info!(">>> Assign a different config epoch to each node");
    assign_config_epochs(&mut topo).await;
    info!(">>> Sending CLUSTER MEET messages to join the cluster");
    join_cluster(&mut topo).await?;

    // Give the join a moment to start, otherwise the poll below would find
    // all the nodes agreeing about the config while they are still empty
    // isolated islands.
    tokio::time::sleep(Duration::from_secs(1)).await;
    topo.wait_cluster_join().await?;

    // A second flush lets the replicas announce themselves now that their
    // masters are known cluster-wide.
    topo.flush_nodes_config().await?;
    topo.populate_replicas_info();
    check_cluster(&mut topo, &mut prompter, false).await?;
    Ok(())
}

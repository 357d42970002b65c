// src/commands/set_timeout.rs

use crate::config::MIN_NODE_TIMEOUT;
use crate::core::topology::Topology;
use anyhow::{Context, bail};
use tracing::{error, info};

/// Applies cluster-node-timeout to every node, best effort: single-node
/// failures are tallied, never fatal.
pub async fn run(addr: &str, milliseconds: &str) -> anyhow::Result<()> {
    let millis: i64 = milliseconds
        .parse()
        .with_context(|| format!("the timeout is not a number: {milliseconds:?}"))?;
    if millis < MIN_NODE_TIMEOUT {
        bail!("Setting a node timeout of less than 100 milliseconds is a bad idea.");
    }

    let mut topo = Topology::new();
    topo.load_from_seed(addr).await?;

    let mut ok_count = 0usize;
    let mut err_count = 0usize;
    info!(">>> Reconfiguring node timeout in every cluster node...");
    for idx in topo.indices() {
        let node_addr = topo.node(idx).to_string();
        match topo
            .node_mut(idx)
            .config_set("cluster-node-timeout", &millis.to_string())
            .await
        {
            Err(e) => {
                error!("ERR setting node-timeout for {node_addr}: {e}");
                err_count += 1;
            }
            Ok(()) => match topo.node_mut(idx).config_rewrite().await {
                Err(e) => {
                    error!("ERR rewriting config for {node_addr}: {e}");
                    err_count += 1;
                }
                Ok(()) => {
                    info!("*** New timeout set for {node_addr}");
                    ok_count += 1;
                }
            },
        }
    }
    info!(">>> New node timeout set. {ok_count} OK, {err_count} ERR.");
    Ok(())
}

// src/commands/call.rs

use crate::core::topology::Topology;
use tracing::info;

/// Runs the user-supplied command on every node, printing each node's reply
/// or error. Never short-circuits.
pub async fn run(addr: &str, command: &[String]) -> anyhow::Result<()> {
    let mut topo = Topology::new();
    topo.load_from_seed(addr).await?;

    let cmd = command[0].to_uppercase();
    let mut parts: Vec<&str> = vec![&cmd];
    parts.extend(command[1..].iter().map(String::as_str));
    info!(">>> Calling {} {}", cmd, command[1..].join(" "));

    for idx in topo.indices() {
        let node_addr = topo.node(idx).to_string();
        match topo.node_mut(idx).client.call_str(&parts).await {
            Ok(reply) => println!("{node_addr}: {}", reply.render()),
            Err(e) => println!("{node_addr}: {e}"),
        }
    }
    Ok(())
}

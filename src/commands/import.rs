// src/commands/import.rs

use crate::core::check::check_cluster;
use crate::core::node::ClusterNode;
use crate::core::prompt::StdinPrompter;
use crate::core::slot::key_to_slot;
use crate::core::topology::Topology;
use anyhow::{anyhow, bail};
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Imports every key of a standalone Redis instance into the cluster,
/// walking the source keyspace with SCAN and MIGRATE-ing each key to the
/// owner of its slot.
pub async fn run(addr: &str, from: &str, copy: bool, replace: bool) -> anyhow::Result<()> {
    info!(">>> Importing data from {} to cluster {}", from, addr);
    let mut topo = Topology::new();
    topo.load_from_seed(addr).await?;
    let mut prompter = StdinPrompter;
    check_cluster(&mut topo, &mut prompter, false).await?;

    info!(">>> Connecting to the source Redis instance");
    let mut source = ClusterNode::new(from)?;
    source.client.connect().await?;
    if source.assert_cluster().await.is_ok() {
        bail!("The source node should not be a cluster node.");
    }
    let dbsize = source.dbsize().await?;
    info!("*** Importing {} keys from DB 0", dbsize);

    // Slot -> owning node, resolved once up front.
    let mut slot_owner: HashMap<u16, usize> = HashMap::new();
    for idx in topo.indices() {
        for &slot in topo.node(idx).slots.keys() {
            slot_owner.insert(slot, idx);
        }
    }

    let timeout_ms = topo.timeout_ms;
    let mut cursor: u64 = 0;
    loop {
        let reply = source
            .client
            .call_str(&["SCAN", &cursor.to_string()])
            .await?;
        let mut items = reply
            .into_array()
            .filter(|items| items.len() == 2)
            .ok_or_else(|| anyhow!("unexpected SCAN reply shape"))?;
        let keys = items
            .pop()
            .and_then(|f| f.into_bulk_vec())
            .ok_or_else(|| anyhow!("unexpected SCAN reply shape"))?;
        cursor = items
            .pop()
            .and_then(|f| f.as_integer())
            .ok_or_else(|| anyhow!("unexpected SCAN cursor"))? as u64;

        for key in keys {
            let slot = key_to_slot(&key);
            let Some(&target) = slot_owner.get(&slot) else {
                warn!(
                    "*** No owner for slot {} of key {:?}, skipping",
                    slot,
                    String::from_utf8_lossy(&key)
                );
                continue;
            };
            let target_host = topo.node(target).host.clone();
            let target_port = topo.node(target).port;
            let target_addr = topo.node(target).to_string();
            let printable = String::from_utf8_lossy(&key).to_string();
            match source
                .migrate_key(&target_host, target_port, &key, timeout_ms, copy, replace)
                .await
            {
                Ok(()) => info!("Migrating {} to {}: OK", printable, target_addr),
                Err(e) => error!("Migrating {} to {}: {}", printable, target_addr, e),
            }
        }

        // A returned cursor of 0 means the scan wrapped around.
        if cursor == 0 {
            break;
        }
    }
    Ok(())
}

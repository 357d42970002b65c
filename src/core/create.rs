// src/core/create.rs

//! Bootstrap of a fresh cluster: master selection interleaved by host,
//! contiguous slot ranges, replica placement with host anti-affinity, and
//! the join choreography.

use crate::core::TribError;
use crate::core::slot::NUM_SLOTS;
use crate::core::topology::Topology;
use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::info;

/// A cluster needs at least three masters.
pub fn check_create_parameters(topo: &Topology) -> Result<usize, TribError> {
    let replicas = topo.replicas_per_master;
    let masters = topo.len() / (replicas + 1);
    if masters < 3 {
        return Err(TribError::Precondition(format!(
            "*** ERROR: Invalid configuration for cluster creation.\n\
             *** Redis Cluster requires at least 3 master nodes.\n\
             *** This is not possible with {} nodes and {} replicas per node.\n\
             *** At least {} nodes are required.",
            topo.len(),
            replicas,
            3 * (replicas + 1)
        )));
    }
    Ok(masters)
}

/// Orders all nodes by drawing one node per host in turn, so that
/// consecutive entries land on different hosts as much as possible. Masters
/// are then the leading entries of the result.
pub fn interleave_by_host(topo: &Topology) -> Vec<usize> {
    // Different IPs most likely mean different physical machines; spreading
    // masters and replicas across them limits correlated failures.
    let mut hosts: IndexMap<String, VecDeque<usize>> = IndexMap::new();
    for idx in topo.indices() {
        hosts
            .entry(topo.node(idx).host.clone())
            .or_default()
            .push_back(idx);
    }
    let mut interleaved = Vec::with_capacity(topo.len());
    loop {
        let mut drained = true;
        for bucket in hosts.values_mut() {
            if let Some(idx) = bucket.pop_front() {
                interleaved.push(idx);
                drained = false;
            }
        }
        if drained {
            break;
        }
    }
    interleaved
}

/// Picks masters, assigns contiguous slot ranges and places replicas. The
/// assignments stay local (dirty) until the configuration is flushed.
pub fn alloc_slots(topo: &mut Topology) -> Result<(), TribError> {
    let masters_num = topo.len() / (topo.replicas_per_master + 1);
    let interleaved = interleave_by_host(topo);
    let masters: Vec<usize> = interleaved[..masters_num].to_vec();
    let mut pool: Vec<usize> = interleaved[masters_num..].to_vec();

    info!("Using {masters_num} masters:");
    for &m in &masters {
        info!("  -> {}", topo.node(m));
    }

    // Walk a floating cursor so the 16384 slots split as evenly as the
    // master count allows; the final master absorbs any rounding remainder.
    let slots_per_node = NUM_SLOTS as f64 / masters_num as f64;
    let mut first: i64 = 0;
    let mut cursor: f64 = 0.0;
    for (i, &m) in masters.iter().enumerate() {
        let mut last = (cursor + slots_per_node - 1.0).round() as i64;
        if last > NUM_SLOTS as i64 - 1 || i == masters_num - 1 {
            last = NUM_SLOTS as i64 - 1;
        }
        if last < first {
            last = first;
        }
        topo.node_mut(m).add_slots_range(first as u16, last as u16);
        first = last + 1;
        cursor += slots_per_node;
    }

    // Replica placement runs twice: the first pass gives every master its
    // requested replicas, the second distributes whatever is left round-robin
    // so every provided node ends up used.
    for &m in &masters {
        let mut assigned = 0;
        while assigned < topo.replicas_per_master {
            let Some(replica) = take_replica(topo, &mut pool, m) else {
                break;
            };
            let master_id = topo.node(m).info.id.clone();
            topo.node_mut(replica).set_replicate(&master_id);
            assigned += 1;
            info!("Adding replica {} to {}", topo.node(replica), topo.node(m));
        }
    }
    while !pool.is_empty() {
        for &m in &masters {
            let Some(replica) = take_replica(topo, &mut pool, m) else {
                break;
            };
            let master_id = topo.node(m).info.id.clone();
            topo.node_mut(replica).set_replicate(&master_id);
            info!(
                "Adding extra replica {} to {}",
                topo.node(replica),
                topo.node(m)
            );
        }
    }
    Ok(())
}

/// Pops the first pool node on a host different from the master's; with no
/// such node, settles for the head of the pool.
fn take_replica(topo: &Topology, pool: &mut Vec<usize>, master: usize) -> Option<usize> {
    if pool.is_empty() {
        return None;
    }
    let pick = pool
        .iter()
        .position(|&c| topo.node(c).host != topo.node(master).host)
        .unwrap_or(0);
    Some(pool.remove(pick))
}

/// Hands every node a distinct, increasing config epoch so the first
/// ownership conflicts resolve deterministically. Best effort: a node that
/// already joined rejects the command.
pub async fn assign_config_epochs(topo: &mut Topology) {
    let mut epoch = 1u64;
    for idx in topo.indices() {
        if let Err(e) = topo.node_mut(idx).cluster_set_config_epoch(epoch).await {
            tracing::debug!("SET-CONFIG-EPOCH on {}: {e}", topo.node(idx));
        }
        epoch += 1;
    }
}

/// Sends CLUSTER MEET from every node to the first one.
pub async fn join_cluster(topo: &mut Topology) -> Result<(), TribError> {
    if topo.is_empty() {
        return Ok(());
    }
    let first_addr = topo.node(0).addr();
    for idx in 1..topo.len() {
        topo.node_mut(idx).cluster_add_node(&first_addr).await?;
    }
    Ok(())
}

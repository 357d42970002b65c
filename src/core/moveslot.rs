// src/core/moveslot.rs

//! Moves a single hash slot between two masters: the IMPORTING/MIGRATING
//! handshake, the batched key migration, and the final ownership broadcast.

use crate::config::MIGRATE_DEFAULT_PIPELINE;
use crate::core::TribError;
use crate::core::node::{SetSlotState, SlotState};
use crate::core::topology::Topology;
use std::io::Write;
use tracing::warn;

/// Options steering a slot move.
#[derive(Debug, Clone)]
pub struct MoveOpts {
    /// Skip the state transitions and only move data.
    pub cold: bool,
    /// Retry colliding keys with REPLACE instead of aborting.
    pub fix: bool,
    /// Mirror the move into the in-memory model.
    pub update: bool,
    /// Suppress the per-slot progress line.
    pub quiet: bool,
    /// Print one dot per migrated key.
    pub dots: bool,
    /// Keys per MIGRATE batch.
    pub pipeline: usize,
}

impl Default for MoveOpts {
    fn default() -> Self {
        Self {
            cold: false,
            fix: false,
            update: false,
            quiet: false,
            dots: false,
            pipeline: MIGRATE_DEFAULT_PIPELINE,
        }
    }
}

/// Moves `slot` from `source` to `target`.
///
/// Unless `cold`, the target is put in IMPORTING state strictly before the
/// source enters MIGRATING, so redirected clients always find a node willing
/// to accept them. After the data is drained, ownership is broadcast to
/// every master with SETSLOT NODE.
pub async fn move_slot(
    topo: &mut Topology,
    source: usize,
    target: usize,
    slot: u16,
    opts: &MoveOpts,
) -> Result<(), TribError> {
    let source_id = topo.node(source).info.id.clone();
    let target_id = topo.node(target).info.id.clone();
    let target_host = topo.node(target).host.clone();
    let target_port = topo.node(target).port;
    let timeout_ms = topo.timeout_ms;

    if !opts.quiet {
        print!(
            "Moving slot {} from {} to {}: ",
            slot,
            topo.node(source),
            topo.node(target)
        );
        let _ = std::io::stdout().flush();
    }

    if !opts.cold {
        topo.node_mut(target)
            .cluster_set_slot(slot, SetSlotState::Importing, Some(&source_id))
            .await?;
        topo.node_mut(source)
            .cluster_set_slot(slot, SetSlotState::Migrating, Some(&target_id))
            .await?;
    }

    loop {
        let keys = topo
            .node_mut(source)
            .cluster_get_keys_in_slot(slot, opts.pipeline)
            .await?;
        if keys.is_empty() {
            break;
        }
        let moved = topo
            .node_mut(source)
            .migrate_keys(&target_host, target_port, &keys, timeout_ms, false)
            .await;
        match moved {
            Ok(()) => {}
            Err(e) if opts.fix && e.is_redis_code("BUSYKEY") => {
                warn!("*** Target key exists. Replacing it for FIX.");
                topo.node_mut(source)
                    .migrate_keys(&target_host, target_port, &keys, timeout_ms, true)
                    .await?;
            }
            Err(e) => {
                if !opts.quiet {
                    println!();
                }
                return Err(e);
            }
        }
        if opts.dots {
            print!("{}", ".".repeat(keys.len()));
            let _ = std::io::stdout().flush();
        }
    }
    if !opts.quiet {
        println!();
    }

    // The cluster configuration is updated everywhere only once the data is
    // fully drained.
    if !opts.cold {
        for idx in topo.indices() {
            if topo.node(idx).is_slave() {
                continue;
            }
            topo.node_mut(idx)
                .cluster_set_slot(slot, SetSlotState::Node, Some(&target_id))
                .await?;
        }
    }

    if opts.update {
        let src = topo.node_mut(source);
        src.slots.remove(&slot);
        src.migrating.remove(&slot);
        let dst = topo.node_mut(target);
        dst.slots.insert(slot, SlotState::Assigned);
        dst.importing.remove(&slot);
    }

    Ok(())
}

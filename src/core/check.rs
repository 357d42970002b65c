// src/core/check.rs

//! The three cluster health checks: configuration agreement, open slots and
//! slot coverage. Findings accumulate on the topology; with `fix` enabled
//! each check hands its findings to the repairer.

use crate::core::TribError;
use crate::core::fix::{fix_open_slot, fix_slots_coverage};
use crate::core::prompt::Prompter;
use crate::core::slot::NUM_SLOTS;
use crate::core::topology::Topology;
use tracing::info;

/// Runs all health checks against the loaded topology.
pub async fn check_cluster(
    topo: &mut Topology,
    prompter: &mut dyn Prompter,
    quiet: bool,
) -> Result<(), TribError> {
    info!(
        ">>> Performing Cluster Check (using node {}).",
        topo.node(0)
    );
    if !quiet {
        topo.show_nodes();
    }
    check_config_consistency(topo).await;
    check_open_slots(topo).await?;
    check_slots_coverage(topo, prompter).await?;
    Ok(())
}

/// All nodes must agree on the slot -> owner mapping.
pub async fn check_config_consistency(topo: &mut Topology) {
    if topo.is_config_consistent().await {
        info!("[OK] All nodes agree about slots configuration.");
    } else {
        topo.cluster_error("Nodes don't agree about configuration!".to_string());
    }
}

/// No slot may be stuck in migrating or importing state.
pub async fn check_open_slots(topo: &mut Topology) -> Result<(), TribError> {
    info!(">>> Check for open slots...");
    let mut open_slots: Vec<u16> = Vec::new();
    for idx in topo.indices() {
        let node = topo.node(idx);
        let migrating: Vec<u16> = node.migrating.keys().copied().collect();
        let importing: Vec<u16> = node.importing.keys().copied().collect();
        let addr = node.to_string();
        if !migrating.is_empty() {
            topo.cluster_error(format!(
                "[WARN] Node {} has slots in migrating state ({}).",
                addr,
                join_slots(&migrating)
            ));
            open_slots.extend(&migrating);
        }
        if !importing.is_empty() {
            topo.cluster_error(format!(
                "[WARN] Node {} has slots in importing state ({}).",
                addr,
                join_slots(&importing)
            ));
            open_slots.extend(&importing);
        }
    }

    // De-duplicate preserving first-seen order.
    let mut seen = std::collections::BTreeSet::new();
    open_slots.retain(|slot| seen.insert(*slot));

    if !open_slots.is_empty() {
        println!(
            "[WARN] The following slots are open: {}",
            join_slots(&open_slots)
        );
    }
    if topo.fix {
        for slot in open_slots {
            fix_open_slot(topo, slot).await?;
        }
    }
    Ok(())
}

/// Every one of the 16384 slots must be served by some node.
pub async fn check_slots_coverage(
    topo: &mut Topology,
    prompter: &mut dyn Prompter,
) -> Result<(), TribError> {
    info!(">>> Check slots coverage...");
    let covered = topo.covered_slots();
    if covered.len() == NUM_SLOTS {
        info!("[OK] All {NUM_SLOTS} slots covered.");
        return Ok(());
    }
    let not_covered = topo.not_covered_slots();
    topo.cluster_error(format!(
        "Not all {NUM_SLOTS} slots are covered by nodes. Missing: {}",
        crate::core::node::slots_to_ranges(&not_covered)
    ));
    if topo.fix {
        fix_slots_coverage(topo, prompter).await?;
    }
    Ok(())
}

fn join_slots(slots: &[u16]) -> String {
    slots
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

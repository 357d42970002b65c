// src/core/fix.rs

//! Cluster repair: covering uncovered slots and resolving slots stuck in
//! migrating or importing state.

use crate::core::TribError;
use crate::core::moveslot::{MoveOpts, move_slot};
use crate::core::node::{SetSlotState, SlotState};
use crate::core::prompt::Prompter;
use crate::core::topology::Topology;
use rand::seq::SliceRandom;
use tracing::{info, warn};

/// Repairs slot coverage. Every uncovered slot is classified by how many
/// masters still hold keys for it: none (covered by a random master), one
/// (covered by the holder) or several (keys consolidated into the holder
/// with the most keys).
pub async fn fix_slots_coverage(
    topo: &mut Topology,
    prompter: &mut dyn Prompter,
) -> Result<(), TribError> {
    let not_covered = topo.not_covered_slots();
    if not_covered.is_empty() {
        return Ok(());
    }
    info!(">>> Fixing slots coverage...");
    println!(
        "List of not covered slots: {}",
        not_covered
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",")
    );

    let mut none: Vec<u16> = Vec::new();
    let mut single: Vec<(u16, usize)> = Vec::new();
    let mut multi: Vec<(u16, Vec<usize>)> = Vec::new();
    for &slot in &not_covered {
        let mut holders: Vec<usize> = Vec::new();
        for idx in topo.indices() {
            if topo.node(idx).is_slave() {
                continue;
            }
            let keys = topo.node_mut(idx).cluster_get_keys_in_slot(slot, 1).await?;
            if !keys.is_empty() {
                holders.push(idx);
            }
        }
        let names: Vec<String> = holders.iter().map(|&i| topo.node(i).to_string()).collect();
        println!(
            "Slot {} has keys in {} nodes: {}",
            slot,
            holders.len(),
            names.join(", ")
        );
        match holders.len() {
            0 => none.push(slot),
            1 => single.push((slot, holders[0])),
            _ => multi.push((slot, holders)),
        }
    }

    // Case 1: no node has keys; cover each slot with a random master.
    if !none.is_empty() {
        println!("The following uncovered slots have no keys across the cluster:");
        println!(
            "{}",
            none.iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        confirm_or_abort(prompter, "Fix these slots by covering with a random node?")?;
        let masters: Vec<usize> = topo
            .indices()
            .filter(|&i| topo.node(i).is_master())
            .collect();
        for slot in none {
            let &idx = masters
                .choose(&mut rand::thread_rng())
                .ok_or_else(|| TribError::Precondition("no master available".to_string()))?;
            info!(">>> Covering slot {} with {}", slot, topo.node(idx));
            topo.node_mut(idx).cluster_add_slots(&[slot]).await?;
            topo.node_mut(idx).slots.insert(slot, SlotState::Assigned);
        }
    }

    // Case 2: exactly one node has keys; that node takes the slot.
    if !single.is_empty() {
        println!("The following uncovered slots have keys in just one node:");
        println!(
            "{}",
            single
                .iter()
                .map(|(s, _)| s.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        confirm_or_abort(prompter, "Fix these slots by covering with those nodes?")?;
        for (slot, idx) in single {
            info!(">>> Covering slot {} with {}", slot, topo.node(idx));
            topo.node_mut(idx).cluster_add_slots(&[slot]).await?;
            topo.node_mut(idx).slots.insert(slot, SlotState::Assigned);
        }
    }

    // Case 3: several nodes have keys; consolidate into the biggest holder.
    if !multi.is_empty() {
        println!("The following uncovered slots have keys in multiple nodes:");
        println!(
            "{}",
            multi
                .iter()
                .map(|(s, _)| s.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        confirm_or_abort(prompter, "Fix these slots by moving keys into a single node?")?;
        for (slot, holders) in multi {
            let target = node_with_most_keys(topo, Some(&holders), slot)
                .await?
                .ok_or_else(|| {
                    TribError::Precondition(format!("no candidate owner for slot {slot}"))
                })?;
            info!(">>> Covering slot {} moving keys to {}", slot, topo.node(target));
            topo.node_mut(target).cluster_add_slots(&[slot]).await?;
            topo.node_mut(target)
                .slots
                .insert(slot, SlotState::Assigned);
            let target_id = topo.node(target).info.id.clone();
            for src in holders {
                if src == target {
                    continue;
                }
                // Put the source in importing state to avoid migration
                // redirects, then drain it data-plane only.
                topo.node_mut(src)
                    .cluster_set_slot(slot, SetSlotState::Importing, Some(&target_id))
                    .await?;
                let opts = MoveOpts {
                    cold: true,
                    fix: true,
                    ..Default::default()
                };
                move_slot(topo, src, target, slot, &opts).await?;
                topo.node_mut(src)
                    .cluster_set_slot(slot, SetSlotState::Stable, None)
                    .await?;
            }
        }
    }
    Ok(())
}

/// Repairs a slot left in migrating and/or importing state.
pub async fn fix_open_slot(topo: &mut Topology, slot: u16) -> Result<(), TribError> {
    info!(">>> Fixing open slot {slot}");

    let owners: Vec<usize> = topo
        .indices()
        .filter(|&i| !topo.node(i).is_slave() && topo.node(i).slots.contains_key(&slot))
        .collect();
    let mut owner: Option<usize> = if owners.len() == 1 {
        Some(owners[0])
    } else {
        None
    };

    let mut migrating: Vec<usize> = Vec::new();
    let mut importing: Vec<usize> = Vec::new();
    for idx in topo.indices() {
        if topo.node(idx).is_slave() {
            continue;
        }
        if topo.node(idx).migrating.contains_key(&slot) {
            migrating.push(idx);
        } else if topo.node(idx).importing.contains_key(&slot) {
            importing.push(idx);
        } else if owner != Some(idx)
            && topo.node_mut(idx).cluster_count_keys_in_slot(slot).await? > 0
        {
            // A node with keys but no claim behaves like an importer.
            warn!("*** Found keys about slot {} in node {}!", slot, topo.node(idx));
            importing.push(idx);
        }
    }
    info!(
        "Set as migrating in: {}",
        join_nodes(topo, &migrating)
    );
    info!(
        "Set as importing in: {}",
        join_nodes(topo, &importing)
    );

    // No owner at all: elect the node with the most keys and make its claim
    // authoritative with a fresh epoch.
    if owners.is_empty() {
        info!(">>> Nobody claims ownership, selecting an owner...");
        let elected = node_with_most_keys(topo, None, slot).await?.ok_or_else(|| {
            TribError::Precondition(format!(
                "[ERR] Can't select a slot owner for slot {slot}. Impossible to fix."
            ))
        })?;
        warn!("*** Configuring {} as the slot owner", topo.node(elected));
        topo.node_mut(elected)
            .cluster_set_slot(slot, SetSlotState::Stable, None)
            .await?;
        topo.node_mut(elected).cluster_add_slots(&[slot]).await?;
        topo.node_mut(elected)
            .slots
            .insert(slot, SlotState::Assigned);
        topo.node_mut(elected).cluster_bumpepoch().await?;
        topo.node_mut(elected).migrating.remove(&slot);
        topo.node_mut(elected).importing.remove(&slot);
        migrating.retain(|&i| i != elected);
        importing.retain(|&i| i != elected);
        owner = Some(elected);
    } else if owners.len() > 1 {
        // Several claimants: the one with the most keys wins, the others
        // drop their claim and become importers.
        let elected = node_with_most_keys(topo, Some(&owners), slot)
            .await?
            .ok_or_else(|| {
                TribError::Precondition(format!("no candidate owner for slot {slot}"))
            })?;
        let elected_id = topo.node(elected).info.id.clone();
        for idx in owners {
            if idx == elected {
                continue;
            }
            topo.node_mut(idx).cluster_del_slots(&[slot]).await?;
            topo.node_mut(idx).slots.remove(&slot);
            topo.node_mut(idx)
                .cluster_set_slot(slot, SetSlotState::Importing, Some(&elected_id))
                .await?;
            importing.retain(|&i| i != idx);
            importing.push(idx);
        }
        topo.node_mut(elected).cluster_bumpepoch().await?;
        owner = Some(elected);
    }

    if migrating.len() == 1 && importing.len() == 1 {
        // The trivial case: a single interrupted handshake. Keys flow back
        // to the owner and both ends are closed, so ownership never changes
        // hands under a repair.
        let owner = owner.ok_or_else(|| {
            TribError::Precondition(format!(
                "[ERR] Sorry, can't fix slot {slot}: open handshake but no owner."
            ))
        })?;
        info!(
            ">>> Moving the {} slot keys back to its owner {}",
            slot,
            topo.node(owner)
        );
        for idx in [migrating[0], importing[0]] {
            if idx == owner {
                continue;
            }
            let opts = MoveOpts {
                cold: true,
                fix: true,
                dots: true,
                ..Default::default()
            };
            move_slot(topo, idx, owner, slot, &opts).await?;
        }
        for idx in [migrating[0], importing[0]] {
            info!(">>> Setting {} as STABLE in {}", slot, topo.node(idx));
            topo.node_mut(idx)
                .cluster_set_slot(slot, SetSlotState::Stable, None)
                .await?;
            topo.node_mut(idx).migrating.remove(&slot);
            topo.node_mut(idx).importing.remove(&slot);
        }
    } else if migrating.is_empty() && !importing.is_empty() {
        let owner = owner.ok_or_else(|| {
            TribError::Precondition(format!(
                "[ERR] Sorry, can't fix slot {slot}: importing nodes but no owner."
            ))
        })?;
        info!(
            ">>> Moving all the {} slot keys to its owner {}",
            slot,
            topo.node(owner)
        );
        for idx in importing {
            if idx == owner {
                continue;
            }
            let opts = MoveOpts {
                cold: true,
                fix: true,
                dots: true,
                ..Default::default()
            };
            move_slot(topo, idx, owner, slot, &opts).await?;
            info!(">>> Setting {} as STABLE in {}", slot, topo.node(idx));
            topo.node_mut(idx)
                .cluster_set_slot(slot, SetSlotState::Stable, None)
                .await?;
            topo.node_mut(idx).importing.remove(&slot);
        }
    } else if migrating.len() == 1 && importing.is_empty() {
        let src = migrating[0];
        if topo.node_mut(src).cluster_count_keys_in_slot(slot).await? == 0 {
            // A half-opened migration with nothing left to move.
            topo.node_mut(src)
                .cluster_set_slot(slot, SetSlotState::Stable, None)
                .await?;
            topo.node_mut(src).migrating.remove(&slot);
        } else {
            return Err(unfixable(topo, slot, &migrating, &importing));
        }
    } else if !(migrating.is_empty() && importing.is_empty()) {
        return Err(unfixable(topo, slot, &migrating, &importing));
    }
    Ok(())
}

fn unfixable(topo: &Topology, slot: u16, migrating: &[usize], importing: &[usize]) -> TribError {
    TribError::Precondition(format!(
        "[ERR] Sorry, can't fix slot {slot} yet (work in progress). Slot is set as migrating in {}, as importing in {}.",
        join_nodes(topo, migrating),
        join_nodes(topo, importing),
    ))
}

fn join_nodes(topo: &Topology, indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| topo.node(i).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Among the candidates (all masters when `None`), the node holding the most
/// keys for the slot; ties go to the earliest candidate.
async fn node_with_most_keys(
    topo: &mut Topology,
    candidates: Option<&[usize]>,
    slot: u16,
) -> Result<Option<usize>, TribError> {
    let indices: Vec<usize> = match candidates {
        Some(list) => list.to_vec(),
        None => topo
            .indices()
            .filter(|&i| topo.node(i).is_master())
            .collect(),
    };
    let mut best: Option<usize> = None;
    let mut best_count = -1i64;
    for idx in indices {
        let count = topo.node_mut(idx).cluster_count_keys_in_slot(slot).await?;
        if count > best_count {
            best = Some(idx);
            best_count = count;
        }
    }
    Ok(best)
}

fn confirm_or_abort(prompter: &mut dyn Prompter, msg: &str) -> Result<(), TribError> {
    if prompter.confirm(msg) {
        Ok(())
    } else {
        Err(TribError::Precondition("*** Aborting...".to_string()))
    }
}

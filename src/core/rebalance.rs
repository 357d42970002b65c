// src/core/rebalance.rs

//! The rebalance engine: equalizes slot counts across masters according to
//! per-node weights, within a percentage threshold.

use crate::core::TribError;
use crate::core::moveslot::{MoveOpts, move_slot};
use crate::core::reshard::compute_reshard_table;
use crate::core::slot::NUM_SLOTS;
use crate::core::topology::Topology;
use std::io::Write;

/// Options of a rebalance run.
#[derive(Debug, Clone)]
pub struct RebalanceOpts {
    /// `id=W` overrides, resolved against the topology before any move.
    pub weights: Vec<(String, u32)>,
    /// Let masters without slots participate as receivers.
    pub use_empty_masters: bool,
    /// Tolerated imbalance, in percent.
    pub threshold: u32,
    /// Print the planned moves without performing them.
    pub simulate: bool,
    /// Keys per MIGRATE batch.
    pub pipeline: usize,
}

/// Parses one `--weight id=W` argument.
pub fn parse_weight_arg(arg: &str) -> Result<(String, u32), TribError> {
    let (id, weight) = arg.split_once('=').ok_or_else(|| {
        TribError::Precondition(format!("invalid weight {arg:?}, expected node_id=weight"))
    })?;
    let weight = weight.parse::<u32>().map_err(|_| {
        TribError::Precondition(format!("invalid weight {arg:?}, expected node_id=weight"))
    })?;
    Ok((id.to_string(), weight))
}

/// Resets all weights to 1 and applies the overrides; an unknown or
/// ambiguous id aborts before anything moved.
pub fn assign_weights(topo: &mut Topology, overrides: &[(String, u32)]) -> Result<(), TribError> {
    for idx in topo.indices() {
        topo.node_mut(idx).weight = 1;
    }
    for (id, weight) in overrides {
        let idx = topo.resolve_node(id)?;
        topo.node_mut(idx).weight = *weight;
    }
    Ok(())
}

/// The masters taking part in the rebalance. Empty masters only join when
/// explicitly requested.
pub fn candidates(topo: &Topology, use_empty_masters: bool) -> Vec<usize> {
    topo.indices()
        .filter(|&i| {
            let node = topo.node(i);
            node.is_master() && (use_empty_masters || node.slot_count() > 0)
        })
        .collect()
}

/// Computes every candidate's expected share and balance (positive: must
/// give slots, negative: must take). Returns true iff at least one node
/// deviates beyond the threshold.
pub fn compute_balances(topo: &mut Topology, cands: &[usize], threshold: u32) -> bool {
    let total_weight: u64 = cands.iter().map(|&i| topo.node(i).weight as u64).sum();
    if total_weight == 0 {
        return false;
    }
    let mut over_threshold = false;
    for &idx in cands {
        let node = topo.node_mut(idx);
        let expected =
            (NUM_SLOTS as f64 / total_weight as f64 * node.weight as f64).floor() as i64;
        let owned = node.slot_count() as i64;
        node.balance = owned - expected;
        if owned > 0 {
            let err_pct = (100.0 - 100.0 * expected as f64 / owned as f64).abs();
            if err_pct > threshold as f64 {
                over_threshold = true;
            }
        } else if expected > 0 {
            over_threshold = true;
        }
    }
    over_threshold
}

/// Because the expected shares round down, the balances can sum to a small
/// positive number; push the excess onto receivers so donors and receivers
/// cancel out exactly.
pub fn correct_rounding(topo: &mut Topology, cands: &[usize]) {
    let mut total_balance: i64 = cands.iter().map(|&i| topo.node(i).balance).sum();
    while total_balance > 0 {
        let mut progressed = false;
        for &idx in cands {
            if total_balance > 0 && topo.node(idx).balance < 0 {
                topo.node_mut(idx).balance -= 1;
                total_balance -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
}

/// Pairs donors with receivers and moves slots until every balance reaches
/// zero. Candidates are walked from the most negative balance (receivers)
/// and the most positive (donors) toward the middle.
pub async fn drive_rebalance(
    topo: &mut Topology,
    cands: &[usize],
    opts: &RebalanceOpts,
) -> Result<usize, TribError> {
    let mut sorted: Vec<usize> = cands.to_vec();
    sorted.sort_by_key(|&i| topo.node(i).balance);

    let mut moved_total = 0usize;
    let mut dst_idx = 0usize;
    let mut src_idx = sorted.len().saturating_sub(1);
    while dst_idx < src_idx {
        let dst = sorted[dst_idx];
        let src = sorted[src_idx];
        if topo.node(dst).balance >= 0 {
            // No receivers left.
            break;
        }
        let num_slots = std::cmp::min(
            topo.node(dst).balance.abs(),
            topo.node(src).balance.abs(),
        );
        if num_slots > 0 {
            println!(
                "Moving {} slots from {} to {}",
                num_slots,
                topo.node(src),
                topo.node(dst)
            );
            let table = compute_reshard_table(topo, &[src], num_slots as usize);
            if table.len() != num_slots as usize {
                return Err(TribError::Precondition(
                    "*** Assertion failed: Reshard table != number of slots".to_string(),
                ));
            }
            if opts.simulate {
                println!("{}", "#".repeat(table.len()));
            } else {
                for entry in &table {
                    let move_opts = MoveOpts {
                        quiet: true,
                        update: true,
                        pipeline: opts.pipeline,
                        ..Default::default()
                    };
                    move_slot(topo, entry.source, dst, entry.slot, &move_opts).await?;
                    print!("#");
                    let _ = std::io::stdout().flush();
                }
                println!();
            }
            moved_total += num_slots as usize;
        }

        topo.node_mut(dst).balance += num_slots;
        topo.node_mut(src).balance -= num_slots;
        if topo.node(dst).balance == 0 {
            dst_idx += 1;
        }
        if topo.node(src).balance == 0 {
            src_idx -= 1;
        }
    }
    Ok(moved_total)
}

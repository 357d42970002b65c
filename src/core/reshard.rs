// src/core/reshard.rs

//! The resharding planner: turns a weighted set of donors and a slot count
//! into an ordered slot-movement plan.

use crate::core::TribError;
use crate::core::topology::Topology;

/// The source set of a reshard: every master, or an explicit id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    All,
    Ids(Vec<String>),
}

impl SourceSpec {
    /// Parses the `--from` argument: comma-separated ids, where the literal
    /// token `all` selects every master.
    pub fn parse(from: &str) -> SourceSpec {
        let ids: Vec<String> = from
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if ids.iter().any(|id| id == "all") {
            SourceSpec::All
        } else {
            SourceSpec::Ids(ids)
        }
    }
}

/// One planned movement: take `slot` away from `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReshardEntry {
    pub source: usize,
    pub slot: u16,
}

/// Resolves a source spec against the topology. Explicit ids must name
/// masters distinct from the target; `All` selects every other master.
pub fn resolve_sources(
    topo: &Topology,
    spec: &SourceSpec,
    target: usize,
) -> Result<Vec<usize>, TribError> {
    match spec {
        SourceSpec::All => Ok(topo
            .indices()
            .filter(|&i| i != target && topo.node(i).is_master())
            .collect()),
        SourceSpec::Ids(ids) => {
            let mut sources = Vec::new();
            for id in ids {
                let idx = topo.resolve_node(id)?;
                if topo.node(idx).is_slave() {
                    return Err(TribError::Precondition(format!(
                        "*** The specified node {id} is not known or not a master, please retry."
                    )));
                }
                if idx == target {
                    return Err(TribError::Precondition(
                        "*** Target node is also listed among the source nodes!".to_string(),
                    ));
                }
                if !sources.contains(&idx) {
                    sources.push(idx);
                }
            }
            Ok(sources)
        }
    }
}

/// Computes the movement plan: `num_slots` slots drawn from `sources` in
/// proportion to how many each owns.
///
/// Donors are ordered biggest first, and the first donor rounds its share up
/// while the rest round down, so the division remainder always lands on the
/// biggest donor. Slots are taken in ascending numeric order from each
/// donor. When the donors own fewer than `num_slots` slots in total, the
/// plan saturates at that total.
pub fn compute_reshard_table(
    topo: &Topology,
    sources: &[usize],
    num_slots: usize,
) -> Vec<ReshardEntry> {
    let mut sorted: Vec<usize> = sources.to_vec();
    sorted.sort_by(|&a, &b| topo.node(b).slot_count().cmp(&topo.node(a).slot_count()));

    let source_tot_slots: usize = sorted.iter().map(|&i| topo.node(i).slot_count()).sum();
    if source_tot_slots == 0 {
        return Vec::new();
    }

    let mut table = Vec::new();
    let mut taken = vec![0usize; sorted.len()];
    for (i, &src) in sorted.iter().enumerate() {
        let share = num_slots as f64 / source_tot_slots as f64 * topo.node(src).slot_count() as f64;
        let share = if i == 0 {
            share.ceil() as usize
        } else {
            share.floor() as usize
        };
        for slot in topo.node(src).owned_slots().into_iter().take(share) {
            if table.len() >= num_slots {
                break;
            }
            table.push(ReshardEntry { source: src, slot });
            taken[i] += 1;
        }
    }

    // The floored shares can leave the plan short of the requested count;
    // draw the difference from the donors in order.
    'outer: for (i, &src) in sorted.iter().enumerate() {
        let slots = topo.node(src).owned_slots();
        while taken[i] < slots.len() {
            if table.len() >= num_slots {
                break 'outer;
            }
            table.push(ReshardEntry {
                source: src,
                slot: slots[taken[i]],
            });
            taken[i] += 1;
        }
    }
    table
}

/// Prints the plan the way the operator reviews it.
pub fn show_reshard_table(topo: &Topology, table: &[ReshardEntry]) {
    for entry in table {
        println!(
            "    Moving slot {} from {}",
            entry.slot,
            topo.node(entry.source).info.id
        );
    }
}

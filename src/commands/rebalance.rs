// src/commands/rebalance.rs

use crate::core::check::check_cluster;
use crate::core::prompt::StdinPrompter;
use crate::core::rebalance::{
    RebalanceOpts, assign_weights, candidates, compute_balances, correct_rounding,
    drive_rebalance, parse_weight_arg,
};
use crate::core::topology::Topology;
use anyhow::bail;
use tracing::info;

pub struct RebalanceArgs {
    pub addr: String,
    pub weights: Vec<String>,
    pub auto_weights: bool,
    pub use_empty_masters: bool,
    pub timeout: Option<u64>,
    pub simulate: bool,
    pub pipeline: usize,
    pub threshold: u32,
}

pub async fn run(args: RebalanceArgs) -> anyhow::Result<()> {
    let mut topo = Topology::new();
    if let Some(timeout) = args.timeout
        && timeout > 0
    {
        topo.timeout_ms = timeout;
    }
    // Node info must be loaded before the weight arguments can resolve.
    topo.load_from_seed(&args.addr).await?;

    let mut overrides = Vec::new();
    for arg in &args.weights {
        overrides.push(parse_weight_arg(arg)?);
    }
    // --auto-weights is accepted for compatibility; it keeps every weight at 1.
    let _ = args.auto_weights;
    assign_weights(&mut topo, &overrides)?;
    let cands = candidates(&topo, args.use_empty_masters);
    let total_weight: u64 = cands.iter().map(|&i| topo.node(i).weight as u64).sum();

    // Only proceed on a cluster that looks sane.
    let mut prompter = StdinPrompter;
    check_cluster(&mut topo, &mut prompter, true).await?;
    if !topo.errors.is_empty() {
        bail!("*** Please fix your cluster problems before rebalancing");
    }

    if !compute_balances(&mut topo, &cands, args.threshold) {
        info!(
            "*** No rebalancing needed! All nodes are within the {}% threshold.",
            args.threshold
        );
        return Ok(());
    }
    correct_rounding(&mut topo, &cands);
    info!(
        ">>> Rebalancing across {} nodes. Total weight = {}",
        cands.len(),
        total_weight
    );

    let opts = RebalanceOpts {
        weights: overrides,
        use_empty_masters: args.use_empty_masters,
        threshold: args.threshold,
        simulate: args.simulate,
        pipeline: args.pipeline,
    };
    drive_rebalance(&mut topo, &cands, &opts).await?;
    Ok(())
}

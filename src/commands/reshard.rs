// src/commands/reshard.rs

use crate::core::check::check_cluster;
use crate::core::moveslot::{MoveOpts, move_slot};
use crate::core::prompt::{Prompter, StdinPrompter};
use crate::core::reshard::{
    SourceSpec, compute_reshard_table, resolve_sources, show_reshard_table,
};
use crate::core::slot::NUM_SLOTS;
use crate::core::topology::Topology;
use anyhow::{bail, anyhow};
use tracing::warn;

pub struct ReshardArgs {
    pub addr: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub slots: Option<usize>,
    pub yes: bool,
    pub timeout: Option<u64>,
    pub pipeline: usize,
}

pub async fn run(args: ReshardArgs) -> anyhow::Result<()> {
    let mut topo = Topology::new();
    if let Some(timeout) = args.timeout
        && timeout > 0
    {
        topo.timeout_ms = timeout;
    }
    topo.load_from_seed(&args.addr).await?;
    let mut prompter = StdinPrompter;
    check_cluster(&mut topo, &mut prompter, false).await?;
    if !topo.errors.is_empty() {
        bail!("*** Please fix your cluster problems before resharding");
    }

    let num_slots = match args.slots {
        Some(n) if (1..=NUM_SLOTS).contains(&n) => n,
        Some(n) => bail!("invalid number of slots {n}, expected 1 to {NUM_SLOTS}"),
        None => prompter
            .ask_int(
                &format!("How many slots do you want to move (from 1 to {NUM_SLOTS})?"),
                1,
                NUM_SLOTS as i64,
            )
            .ok_or_else(|| anyhow!("no slot count given"))? as usize,
    };

    let target = match &args.to {
        Some(id) => {
            let idx = topo.resolve_node(id)?;
            if topo.node(idx).is_slave() {
                bail!("*** The specified node is not known or not a master, please retry.");
            }
            idx
        }
        None => loop {
            let line = prompter
                .ask_line("What is the receiving node ID?")
                .unwrap_or_default();
            if line.is_empty() {
                bail!("no target node given");
            }
            match topo.resolve_node(&line) {
                Ok(idx) if !topo.node(idx).is_slave() => break idx,
                _ => warn!("*** The specified node is not known or not a master, please retry."),
            }
        },
    };

    let spec = match &args.from {
        Some(from) => SourceSpec::parse(from),
        None => {
            let ids = prompter.ask_ids(
                "Please enter all the source node IDs.\n  \
                 Type 'all' to use all the nodes as source nodes for the hash slots.\n  \
                 Type 'done' once you entered all the source nodes IDs.",
            );
            if ids.is_empty() {
                bail!("*** No source nodes given, operation aborted");
            }
            if ids.len() == 1 && ids[0] == "all" {
                SourceSpec::All
            } else {
                SourceSpec::Ids(ids)
            }
        }
    };
    let sources = resolve_sources(&topo, &spec, target)?;
    if sources.is_empty() {
        bail!("*** No source nodes given, operation aborted");
    }

    println!("\nReady to move {num_slots} slots.");
    println!("  Source nodes:");
    for &src in &sources {
        println!("    {}", topo.node(src).info_string().replace('\n', "\n    "));
    }
    println!("  Destination node:");
    println!(
        "    {}",
        topo.node(target).info_string().replace('\n', "\n    ")
    );

    let table = compute_reshard_table(&topo, &sources, num_slots);
    println!("  Resharding plan:");
    show_reshard_table(&topo, &table);

    if !args.yes
        && !prompter.confirm("Do you want to proceed with the proposed reshard plan (yes/no)?")
    {
        bail!("*** Aborting...");
    }

    let opts = MoveOpts {
        dots: true,
        update: true,
        pipeline: args.pipeline,
        ..Default::default()
    };
    for entry in &table {
        move_slot(&mut topo, entry.source, target, entry.slot, &opts).await?;
    }
    Ok(())
}

// src/commands/check.rs

use crate::core::check::check_cluster;
use crate::core::prompt::StdinPrompter;
use crate::core::topology::Topology;

pub async fn run(addr: &str) -> anyhow::Result<()> {
    let mut topo = Topology::new();
    topo.load_from_seed(addr).await?;
    let mut prompter = StdinPrompter;
    check_cluster(&mut topo, &mut prompter, false).await?;
    Ok(())
}

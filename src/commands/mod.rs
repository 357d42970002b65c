// src/commands/mod.rs

//! One module per subcommand, wiring parsed arguments into the core
//! operations. Errors bubble up here and only `main` turns them into an
//! exit code.

pub mod add_node;
pub mod call;
pub mod check;
pub mod create;
pub mod del_node;
pub mod fix;
pub mod import;
pub mod info;
pub mod rebalance;
pub mod reshard;
pub mod set_timeout;

use crate::cli::Command;

pub async fn dispatch(command: Command) -> anyhow::Result<()> {
    match command {
        Command::AddNode {
            new_addr,
            existing_addr,
            slave,
            master_id,
        } => add_node::run(&new_addr, &existing_addr, slave, master_id.as_deref()).await,
        Command::Call { addr, command } => call::run(&addr, &command).await,
        Command::Check { addr } => check::run(&addr).await,
        Command::Create { addrs, replicas } => create::run(&addrs, replicas).await,
        Command::DelNode { addr, node_id } => del_node::run(&addr, &node_id).await,
        Command::Fix { addr, timeout } => fix::run(&addr, timeout).await,
        Command::Import {
            addr,
            from,
            copy,
            replace,
        } => import::run(&addr, &from, copy, replace).await,
        Command::Info { addr } => info::run(&addr).await,
        Command::Rebalance {
            addr,
            weights,
            auto_weights,
            use_empty_masters,
            timeout,
            simulate,
            pipeline,
            threshold,
        } => {
            rebalance::run(rebalance::RebalanceArgs {
                addr,
                weights,
                auto_weights,
                use_empty_masters,
                timeout,
                simulate,
                pipeline,
                threshold,
            })
            .await
        }
        Command::Reshard {
            addr,
            from,
            to,
            slots,
            yes,
            timeout,
            pipeline,
        } => {
            reshard::run(reshard::ReshardArgs {
                addr,
                from,
                to,
                slots,
                yes,
                timeout,
                pipeline,
            })
            .await
        }
        Command::SetTimeout { addr, milliseconds } => set_timeout::run(&addr, &milliseconds).await,
    }
}

// src/cli.rs

//! Command-line surface of the tool.

use crate::config::{MIGRATE_DEFAULT_PIPELINE, MIGRATE_DEFAULT_TIMEOUT, REBALANCE_DEFAULT_THRESHOLD};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const ABOUT: &str = "Redis Cluster command line utility.

For check, fix, reshard, del-node, set-timeout you can specify the host and port
of any working node in the cluster.";

#[derive(Debug, Parser)]
#[command(name = "redis-trib", version, about = ABOUT)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Enable debug output for logging.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Verbose output.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Set the log file path where internal debug information is written.
    #[arg(long, global = true, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Set the format used by logs.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a new node to an existing cluster.
    #[command(name = "add-node")]
    AddNode {
        /// Address of the node to add, as host:port.
        new_addr: String,
        /// Address of any working cluster member, as host:port.
        existing_addr: String,
        /// Join the new node as a replica.
        #[arg(long)]
        slave: bool,
        /// Master to replicate; defaults to the master with fewest replicas.
        #[arg(long = "master-id", value_name = "ID")]
        master_id: Option<String>,
    },

    /// Run a command on every cluster node.
    Call {
        addr: String,
        /// The command and its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Check the cluster for configuration consistency, open slots and slot coverage.
    Check { addr: String },

    /// Create a new cluster from empty cluster-enabled nodes.
    Create {
        /// Addresses of all participating nodes, as host:port.
        #[arg(required = true)]
        addrs: Vec<String>,
        /// Replicas for every master created.
        #[arg(short, long, default_value_t = 0)]
        replicas: usize,
    },

    /// Remove an empty node from the cluster and shut it down.
    #[command(name = "del-node")]
    DelNode { addr: String, node_id: String },

    /// Check the cluster and repair what is repairable.
    Fix {
        addr: String,
        /// MIGRATE timeout in milliseconds.
        #[arg(short, long, value_name = "MS", default_value_t = MIGRATE_DEFAULT_TIMEOUT)]
        timeout: u64,
    },

    /// Import every key of an external Redis instance into the cluster.
    Import {
        addr: String,
        /// Source instance, as host:port. Must not be a cluster node.
        #[arg(long, value_name = "host:port")]
        from: String,
        /// Keep the keys on the source.
        #[arg(long)]
        copy: bool,
        /// Overwrite keys that already exist on the destination.
        #[arg(long)]
        replace: bool,
    },

    /// Display a summary of the cluster state.
    Info { addr: String },

    /// Even out slot counts across masters according to their weights.
    Rebalance {
        addr: String,
        /// Per-node weight override, as node_id=weight. Repeatable.
        #[arg(long = "weight", value_name = "ID=W")]
        weights: Vec<String>,
        /// Accepted for compatibility; weights default to 1.
        #[arg(long)]
        auto_weights: bool,
        /// Let masters without slots take part as receivers.
        #[arg(long)]
        use_empty_masters: bool,
        /// MIGRATE timeout in milliseconds.
        #[arg(long, value_name = "MS")]
        timeout: Option<u64>,
        /// Show the planned moves without performing them.
        #[arg(long)]
        simulate: bool,
        /// Keys per MIGRATE batch.
        #[arg(long, default_value_t = MIGRATE_DEFAULT_PIPELINE)]
        pipeline: usize,
        /// Tolerated imbalance, in percent.
        #[arg(long, value_name = "PCT", default_value_t = REBALANCE_DEFAULT_THRESHOLD)]
        threshold: u32,
    },

    /// Move hash slots from a set of nodes to a single target node.
    Reshard {
        addr: String,
        /// Comma-separated source node ids, or "all". Prompted when absent.
        #[arg(long, value_name = "IDS")]
        from: Option<String>,
        /// Target node id. Prompted when absent.
        #[arg(long, value_name = "ID")]
        to: Option<String>,
        /// Number of slots to move. Prompted when absent.
        #[arg(long, value_name = "N")]
        slots: Option<usize>,
        /// Accept the proposed reshard plan without asking.
        #[arg(long)]
        yes: bool,
        /// MIGRATE timeout in milliseconds.
        #[arg(long, value_name = "MS")]
        timeout: Option<u64>,
        /// Keys per MIGRATE batch.
        #[arg(long, default_value_t = MIGRATE_DEFAULT_PIPELINE)]
        pipeline: usize,
    },

    /// Set cluster-node-timeout on every node.
    #[command(name = "set-timeout")]
    SetTimeout { addr: String, milliseconds: String },
}

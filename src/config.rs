// src/config.rs

//! Tool-wide defaults shared by the subcommands.

/// Default MIGRATE timeout in milliseconds.
pub const MIGRATE_DEFAULT_TIMEOUT: u64 = 60_000;

/// Default number of keys moved per MIGRATE batch.
pub const MIGRATE_DEFAULT_PIPELINE: usize = 10;

/// Default rebalance threshold, in percent.
pub const REBALANCE_DEFAULT_THRESHOLD: u32 = 2;

/// Smallest accepted cluster-node-timeout, in milliseconds.
pub const MIN_NODE_TIMEOUT: i64 = 100;

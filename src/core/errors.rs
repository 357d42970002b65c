// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::time::Duration;
use thiserror::Error;

/// The main error enum, representing all possible failures within the tool.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum TribError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("incomplete data in stream")]
    IncompleteData,

    #[error("protocol error: {0}")]
    Protocol(String),

    /// An error reply (`-...`) received from a Redis node, verbatim.
    #[error("{0}")]
    Redis(String),

    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    #[error("invalid address {0:?}, expected host:port")]
    InvalidAddr(String),

    #[error("failed to parse CLUSTER NODES line: {0}")]
    NodesParse(String),

    #[error("node {0} is not configured as a cluster node")]
    NotClusterNode(String),

    #[error("node {0} is not empty: either the node already knows other nodes or it contains some key in database 0")]
    NodeNotEmpty(String),

    #[error("no such node {0}")]
    UnknownNode(String),

    #[error("node id prefix {0:?} is ambiguous")]
    AmbiguousPrefix(String),

    #[error("cluster did not converge on a configuration within {0:?}")]
    ClusterJoinTimeout(Duration),

    #[error("{0}")]
    Precondition(String),
}

impl TribError {
    /// True iff this is a Redis error reply carrying the given error code
    /// (the first space-separated token, e.g. `BUSYKEY` or `MOVED`).
    pub fn is_redis_code(&self, code: &str) -> bool {
        match self {
            TribError::Redis(msg) => msg.split_whitespace().next() == Some(code),
            _ => false,
        }
    }
}

// src/core/topology.rs

//! The cluster topology as reconstructed from one seed node and the friends
//! it announces, plus the selection helpers the operations build on.

use crate::core::TribError;
use crate::core::node::{ClusterNode, NodeFlags};
use crate::core::slot::NUM_SLOTS;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

/// How long WaitClusterJoin keeps polling before giving up.
const JOIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const JOIN_MAX_POLLS: u32 = 60;

/// The set of known cluster nodes, in discovery order, together with the
/// options and accumulated findings of the running operation.
#[derive(Debug, Default)]
pub struct Topology {
    nodes: Vec<ClusterNode>,
    /// Findings accumulated by the health checks.
    pub errors: Vec<String>,
    /// When set, checks repair what they find instead of only reporting.
    pub fix: bool,
    /// MIGRATE timeout applied to slot movements.
    pub timeout_ms: u64,
    /// Replicas requested per master on create.
    pub replicas_per_master: usize,
}

impl Topology {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            errors: Vec::new(),
            fix: false,
            timeout_ms: crate::config::MIGRATE_DEFAULT_TIMEOUT,
            replicas_per_master: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, node: ClusterNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn node(&self, idx: usize) -> &ClusterNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut ClusterNode {
        &mut self.nodes[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterNode> {
        self.nodes.iter()
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.nodes.len()
    }

    /// Records a health-check finding.
    pub fn cluster_error(&mut self, err: String) {
        tracing::error!("{err}");
        self.errors.push(err);
    }

    /// Discovers the cluster from a seed address: loads the seed (fatally on
    /// failure), then every friend it announces (best effort), and finally
    /// rebuilds the replica back-references.
    pub async fn load_from_seed(&mut self, addr: &str) -> Result<(), TribError> {
        let mut seed = ClusterNode::new(addr)?;
        seed.client.connect().await?;
        seed.assert_cluster().await?;
        seed.load_info(true).await?;
        let friends = std::mem::take(&mut seed.friends);
        self.add_node(seed);

        for friend in friends {
            if friend
                .flags
                .intersects(NodeFlags::NOADDR | NodeFlags::DISCONNECTED | NodeFlags::FAIL)
            {
                continue;
            }
            let mut node = match ClusterNode::new(&friend.addr) {
                Ok(node) => node,
                Err(e) => {
                    warn!("*** skipping friend {}: {e}", friend.addr);
                    continue;
                }
            };
            if let Err(e) = node.client.connect().await {
                warn!("*** unable to connect to friend {}: {e}", friend.addr);
                continue;
            }
            if let Err(e) = node.load_info(false).await {
                warn!("*** unable to load info from friend {}: {e}", friend.addr);
                continue;
            }
            self.add_node(node);
        }

        self.populate_replicas_info();
        Ok(())
    }

    /// Rebuilds the master -> replicas back-reference index from the
    /// replicate field of every node. Never mutated during traversals.
    pub fn populate_replicas_info(&mut self) {
        for node in &mut self.nodes {
            node.replicas.clear();
        }
        for idx in 0..self.nodes.len() {
            let replicate_of = self.nodes[idx].info.replicate_of.clone();
            if replicate_of.is_empty() {
                continue;
            }
            match self.get_node_by_id(&replicate_of) {
                Some(master_idx) => self.nodes[master_idx].replicas.push(idx),
                None => warn!(
                    "*** {} claims to be slave of unknown node ID {}.",
                    self.nodes[idx], replicate_of
                ),
            }
        }
    }

    /// Exact (case-insensitive) node id lookup.
    pub fn get_node_by_id(&self, id: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.info.id.eq_ignore_ascii_case(id))
    }

    /// Unique prefix lookup; `None` when the prefix is unknown or ambiguous.
    pub fn get_node_by_prefix(&self, prefix: &str) -> Option<usize> {
        let prefix = prefix.to_lowercase();
        let mut matches = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.info.id.to_lowercase().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some((idx, _)), None) => Some(idx),
            _ => None,
        }
    }

    /// Resolves a full id or unique prefix, distinguishing unknown from
    /// ambiguous for error reporting.
    pub fn resolve_node(&self, id_or_prefix: &str) -> Result<usize, TribError> {
        if let Some(idx) = self.get_node_by_id(id_or_prefix) {
            return Ok(idx);
        }
        let prefix = id_or_prefix.to_lowercase();
        let matches: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.info.id.to_lowercase().starts_with(&prefix))
            .map(|(idx, _)| idx)
            .collect();
        match matches.as_slice() {
            [idx] => Ok(*idx),
            [] => Err(TribError::UnknownNode(id_or_prefix.to_string())),
            _ => Err(TribError::AmbiguousPrefix(id_or_prefix.to_string())),
        }
    }

    /// Among masters, the one with the fewest known replicas; ties go to the
    /// earliest-discovered node.
    pub fn master_with_least_replicas(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (idx, node) in self.nodes.iter().enumerate() {
            if !node.is_master() {
                continue;
            }
            match best {
                Some(b) if self.nodes[b].replicas.len() <= node.replicas.len() => {}
                _ => best = Some(idx),
            }
        }
        best
    }

    /// Union of all owned slots across the cluster.
    pub fn covered_slots(&self) -> BTreeSet<u16> {
        let mut covered = BTreeSet::new();
        for node in &self.nodes {
            covered.extend(node.slots.keys().copied());
        }
        covered
    }

    /// Every slot in [0, 16384) missing from the coverage union.
    pub fn not_covered_slots(&self) -> Vec<u16> {
        let covered = self.covered_slots();
        (0..NUM_SLOTS as u16)
            .filter(|slot| !covered.contains(slot))
            .collect()
    }

    /// Prints the description line of every node.
    pub fn show_nodes(&self) {
        for node in &self.nodes {
            println!("{}", node.info_string());
        }
    }

    /// Flushes pending configuration on every node.
    pub async fn flush_nodes_config(&mut self) -> Result<(), TribError> {
        for idx in 0..self.nodes.len() {
            self.nodes[idx].flush_node_config().await?;
        }
        Ok(())
    }

    /// True iff every node reports the same configuration signature. A node
    /// that cannot be queried counts as disagreement.
    pub async fn is_config_consistent(&mut self) -> bool {
        let mut signature: Option<String> = None;
        for idx in 0..self.nodes.len() {
            let sig = match self.nodes[idx].get_config_signature().await {
                Ok(sig) => sig,
                Err(e) => {
                    tracing::debug!("signature probe failed on {}: {e}", self.nodes[idx]);
                    return false;
                }
            };
            match &signature {
                None => signature = Some(sig),
                Some(first) if *first == sig => {}
                Some(_) => return false,
            }
        }
        true
    }

    /// Polls until all nodes agree about the configuration, bounded so a
    /// wedged join surfaces as an error instead of hanging forever.
    pub async fn wait_cluster_join(&mut self) -> Result<(), TribError> {
        info!("Waiting for the cluster to join");
        for _ in 0..JOIN_MAX_POLLS {
            if self.is_config_consistent().await {
                println!();
                return Ok(());
            }
            print!(".");
            use std::io::Write;
            let _ = std::io::stdout().flush();
            tokio::time::sleep(JOIN_POLL_INTERVAL).await;
        }
        println!();
        Err(TribError::ClusterJoinTimeout(
            JOIN_POLL_INTERVAL * JOIN_MAX_POLLS,
        ))
    }
}

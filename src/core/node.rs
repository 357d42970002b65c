// src/core/node.rs

//! Per-node state and operations: the parsed gossip view of one cluster
//! member, its pending local changes, and the administrative commands the
//! tool issues against it.

use crate::core::TribError;
use crate::core::client::{NodeClient, to_bulk_args};
use crate::core::protocol::RespFrame;
use bitflags::bitflags;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Number of fixed fields in a CLUSTER NODES line before the slot specs:
/// `id addr flags replicate ping_sent ping_recv link_status`.
const FIXED_FIELDS: usize = 7;

bitflags! {
    /// Flags reported for a node in CLUSTER NODES output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const MYSELF       = 1 << 0;
        const MASTER       = 1 << 1;
        const SLAVE        = 1 << 2;
        const FAIL         = 1 << 3;
        const NOADDR       = 1 << 4;
        const DISCONNECTED = 1 << 5;
        const HANDSHAKE    = 1 << 6;
    }
}

impl NodeFlags {
    /// Parses the comma-separated flags field. Unknown tokens are ignored.
    pub fn parse(field: &str) -> NodeFlags {
        let mut flags = NodeFlags::empty();
        for token in field.split(',') {
            match token {
                "myself" => flags |= NodeFlags::MYSELF,
                "master" => flags |= NodeFlags::MASTER,
                "slave" => flags |= NodeFlags::SLAVE,
                "fail" => flags |= NodeFlags::FAIL,
                "noaddr" => flags |= NodeFlags::NOADDR,
                "disconnected" => flags |= NodeFlags::DISCONNECTED,
                "handshake" => flags |= NodeFlags::HANDSHAKE,
                _ => {}
            }
        }
        flags
    }

    /// Renders the flags the way CLUSTER NODES spells them, without `myself`.
    pub fn to_display_string(self) -> String {
        let mut out = Vec::new();
        if self.contains(NodeFlags::MASTER) {
            out.push("master");
        }
        if self.contains(NodeFlags::SLAVE) {
            out.push("slave");
        }
        if self.contains(NodeFlags::FAIL) {
            out.push("fail");
        }
        if self.contains(NodeFlags::NOADDR) {
            out.push("noaddr");
        }
        if self.contains(NodeFlags::DISCONNECTED) {
            out.push("disconnected");
        }
        if self.contains(NodeFlags::HANDSHAKE) {
            out.push("handshake");
        }
        out.join(",")
    }
}

/// The local assignment state of an owned slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Locally assigned but not yet announced with ADDSLOTS.
    New,
    /// Announced and part of the node's served keyspace.
    Assigned,
}

/// The state argument of CLUSTER SETSLOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SetSlotState {
    Importing,
    Migrating,
    Stable,
    Node,
}

/// Identity and observed state of a node, as announced over gossip.
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    pub id: String,
    pub addr: String,
    pub flags: NodeFlags,
    /// Node id of the replicated master; empty for masters.
    pub replicate_of: String,
    pub ping_sent: i64,
    pub ping_recv: i64,
    pub link_status: String,
}

/// One fully parsed CLUSTER NODES line.
#[derive(Debug, Clone)]
pub struct ParsedNodeLine {
    pub info: NodeInfo,
    pub slots: Vec<u16>,
    pub migrating: Vec<(u16, String)>,
    pub importing: Vec<(u16, String)>,
}

/// Parses the full output of CLUSTER NODES.
pub fn parse_cluster_nodes(output: &str) -> Result<Vec<ParsedNodeLine>, TribError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_cluster_nodes_line)
        .collect()
}

/// Parses one CLUSTER NODES line:
/// `id addr flags replicate ping_sent ping_recv link_status [slot-spec...]`.
///
/// Slot specs are `N`, `A-B`, `[N-<-src]` (importing) or `[N->-dst]`
/// (migrating).
pub fn parse_cluster_nodes_line(line: &str) -> Result<ParsedNodeLine, TribError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < FIXED_FIELDS {
        return Err(TribError::NodesParse(line.to_string()));
    }

    // The address may carry a cluster bus suffix (`host:port@busport`).
    let addr = fields[1].split('@').next().unwrap_or(fields[1]).to_string();
    let replicate_of = if fields[3] == "-" {
        String::new()
    } else {
        fields[3].to_string()
    };
    let ping_sent = fields[4]
        .parse::<i64>()
        .map_err(|_| TribError::NodesParse(line.to_string()))?;
    let ping_recv = fields[5]
        .parse::<i64>()
        .map_err(|_| TribError::NodesParse(line.to_string()))?;

    let info = NodeInfo {
        id: fields[0].to_string(),
        addr,
        flags: NodeFlags::parse(fields[2]),
        replicate_of,
        ping_sent,
        ping_recv,
        link_status: fields[6].to_string(),
    };

    let mut slots = Vec::new();
    let mut migrating = Vec::new();
    let mut importing = Vec::new();
    for token in &fields[FIXED_FIELDS..] {
        if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            if let Some((slot, peer)) = inner.split_once("->-") {
                let slot = parse_slot(slot, line)?;
                migrating.push((slot, peer.to_string()));
            } else if let Some((slot, peer)) = inner.split_once("-<-") {
                let slot = parse_slot(slot, line)?;
                importing.push((slot, peer.to_string()));
            } else {
                return Err(TribError::NodesParse(line.to_string()));
            }
        } else if let Some((first, last)) = token.split_once('-') {
            let first = parse_slot(first, line)?;
            let last = parse_slot(last, line)?;
            if last < first {
                return Err(TribError::NodesParse(line.to_string()));
            }
            slots.extend(first..=last);
        } else {
            slots.push(parse_slot(token, line)?);
        }
    }

    Ok(ParsedNodeLine {
        info,
        slots,
        migrating,
        importing,
    })
}

fn parse_slot(token: &str, line: &str) -> Result<u16, TribError> {
    let slot = token
        .parse::<u16>()
        .map_err(|_| TribError::NodesParse(line.to_string()))?;
    if (slot as usize) < crate::core::slot::NUM_SLOTS {
        Ok(slot)
    } else {
        Err(TribError::NodesParse(line.to_string()))
    }
}

/// Derives the canonical configuration signature from CLUSTER NODES output.
///
/// For every node line with owned slots, the entry is `id:` followed by the
/// sorted slot tokens joined by commas, excluding transient `[...]` markers.
/// Entries are sorted and joined by `|`; two nodes agree on the cluster
/// configuration iff their signatures are byte-equal.
pub fn config_signature(nodes_output: &str) -> String {
    let mut entries: Vec<String> = Vec::new();
    for line in nodes_output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= FIXED_FIELDS {
            continue;
        }
        let mut tokens: Vec<&str> = fields[FIXED_FIELDS..]
            .iter()
            .copied()
            .filter(|t| !t.contains('['))
            .collect();
        if tokens.is_empty() {
            continue;
        }
        tokens.sort_unstable();
        entries.push(format!("{}:{}", fields[0], tokens.join(",")));
    }
    entries.sort_unstable();
    entries.join("|")
}

/// Renders a sorted slot list as the compact `A-B,C,D-E` range form.
pub fn slots_to_ranges(slots: &[u16]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < slots.len() {
        let start = slots[i];
        let mut end = start;
        while i + 1 < slots.len() && slots[i + 1] == end + 1 {
            end = slots[i + 1];
            i += 1;
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
        i += 1;
    }
    parts.join(",")
}

/// Splits a `host:port` address.
pub fn parse_addr(addr: &str) -> Result<(String, u16), TribError> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| TribError::InvalidAddr(addr.to_string()))?;
    if host.is_empty() {
        return Err(TribError::InvalidAddr(addr.to_string()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| TribError::InvalidAddr(addr.to_string()))?;
    Ok((host.to_string(), port))
}

/// One cluster member as modeled by the tool: the parsed gossip view plus
/// the connection used to administer it and any pending local changes.
#[derive(Debug)]
pub struct ClusterNode {
    pub host: String,
    pub port: u16,
    pub client: NodeClient,
    pub info: NodeInfo,
    /// Owned slots and whether each has been announced yet.
    pub slots: BTreeMap<u16, SlotState>,
    /// Slot -> destination node id.
    pub migrating: BTreeMap<u16, String>,
    /// Slot -> source node id.
    pub importing: BTreeMap<u16, String>,
    /// True iff local changes (ADDSLOTS or REPLICATE) still need flushing.
    pub dirty: bool,
    /// Other members announced by this node's CLUSTER NODES output.
    pub friends: Vec<NodeInfo>,
    /// Indices (into the topology) of nodes replicating this one.
    pub replicas: Vec<usize>,
    /// Rebalance weight; meaningful only while a rebalance runs.
    pub weight: u32,
    /// Rebalance balance; positive means the node must give slots away.
    pub balance: i64,
}

impl fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl ClusterNode {
    pub fn new(addr: &str) -> Result<Self, TribError> {
        let (host, port) = parse_addr(addr)?;
        Ok(Self {
            client: NodeClient::new(&host, port),
            host,
            port,
            info: NodeInfo::default(),
            slots: BTreeMap::new(),
            migrating: BTreeMap::new(),
            importing: BTreeMap::new(),
            dirty: false,
            friends: Vec::new(),
            replicas: Vec::new(),
            weight: 1,
            balance: 0,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_master(&self) -> bool {
        self.info.flags.contains(NodeFlags::MASTER)
    }

    pub fn is_slave(&self) -> bool {
        self.info.flags.contains(NodeFlags::SLAVE)
    }

    /// Owned slots in ascending order.
    pub fn owned_slots(&self) -> Vec<u16> {
        self.slots.keys().copied().collect()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Marks a contiguous slot range as locally assigned, pending ADDSLOTS.
    pub fn add_slots_range(&mut self, first: u16, last: u16) {
        for slot in first..=last {
            self.slots.insert(slot, SlotState::New);
        }
        self.dirty = true;
    }

    /// Points this node at a master, pending CLUSTER REPLICATE.
    pub fn set_replicate(&mut self, master_id: &str) {
        self.info.replicate_of = master_id.to_string();
        self.dirty = true;
    }

    /// The multi-line description printed by check, create and info.
    pub fn info_string(&self) -> String {
        let role = if self.is_slave() { "S" } else { "M" };
        let mut out = if !self.info.replicate_of.is_empty() && self.dirty {
            format!("S: {} {}", self.info.id, self)
        } else {
            format!(
                "{role}: {} {}\n   slots:{} ({} slots) {}",
                self.info.id,
                self,
                slots_to_ranges(&self.owned_slots()),
                self.slots.len(),
                (self.info.flags - NodeFlags::MYSELF).to_display_string(),
            )
        };
        if !self.info.replicate_of.is_empty() {
            out.push_str(&format!("\n   replicates {}", self.info.replicate_of));
        } else if self.is_master() && !self.replicas.is_empty() {
            out.push_str(&format!(
                "\n   {} additional replica(s)",
                self.replicas.len()
            ));
        }
        out
    }

    // --- Wire operations ---

    /// Reloads this node's view via CLUSTER NODES. The `myself` line becomes
    /// this node's own state; other lines are retained as friends when
    /// `fetch_friends` is set so the topology can materialize them.
    pub async fn load_info(&mut self, fetch_friends: bool) -> Result<(), TribError> {
        let output = self.cluster_nodes_raw().await?;
        self.friends.clear();
        for parsed in parse_cluster_nodes(&output)? {
            if parsed.info.flags.contains(NodeFlags::MYSELF) {
                self.info = parsed.info;
                self.slots = parsed
                    .slots
                    .into_iter()
                    .map(|s| (s, SlotState::Assigned))
                    .collect();
                self.migrating = parsed.migrating.into_iter().collect();
                self.importing = parsed.importing.into_iter().collect();
                self.dirty = false;
            } else if fetch_friends {
                self.friends.push(parsed.info);
            }
        }
        Ok(())
    }

    /// Verifies the instance runs in cluster mode (`cluster_enabled:1`).
    pub async fn assert_cluster(&mut self) -> Result<(), TribError> {
        let reply = self.client.call_str(&["INFO", "cluster"]).await?;
        let text = reply.as_text().unwrap_or_default();
        if text.lines().any(|l| l.trim() == "cluster_enabled:1") {
            Ok(())
        } else {
            Err(TribError::NotClusterNode(self.addr()))
        }
    }

    /// Verifies the node knows no peers and holds no keys, the required
    /// starting state before joining a cluster.
    pub async fn assert_empty(&mut self) -> Result<(), TribError> {
        let cluster_info = self
            .client
            .call_str(&["CLUSTER", "INFO"])
            .await?
            .as_text()
            .unwrap_or_default();
        let knows_nobody = cluster_info
            .lines()
            .any(|l| l.trim() == "cluster_known_nodes:1");
        let keyspace = self
            .client
            .call_str(&["INFO", "keyspace"])
            .await?
            .as_text()
            .unwrap_or_default();
        let has_keys = keyspace.lines().any(|l| l.starts_with("db0:"));
        if knows_nobody && !has_keys {
            Ok(())
        } else {
            Err(TribError::NodeNotEmpty(self.addr()))
        }
    }

    /// Fetches a fresh configuration signature for this node's view.
    pub async fn get_config_signature(&mut self) -> Result<String, TribError> {
        let output = self.cluster_nodes_raw().await?;
        Ok(config_signature(&output))
    }

    /// Drains pending local state to the node. A replica whose master is not
    /// yet known keeps its dirty flag for a later retry; slot announcements
    /// propagate errors.
    pub async fn flush_node_config(&mut self) -> Result<(), TribError> {
        if !self.dirty {
            return Ok(());
        }
        if !self.info.replicate_of.is_empty() {
            let master_id = self.info.replicate_of.clone();
            match self.cluster_replicate(&master_id).await {
                Ok(()) => self.dirty = false,
                Err(e) => {
                    // The master may not have joined this node's view yet.
                    debug!("REPLICATE on {} not applied yet: {}", self, e);
                }
            }
        } else {
            let new_slots: Vec<u16> = self
                .slots
                .iter()
                .filter(|(_, state)| **state == SlotState::New)
                .map(|(slot, _)| *slot)
                .collect();
            self.cluster_add_slots(&new_slots).await?;
            for slot in new_slots {
                self.slots.insert(slot, SlotState::Assigned);
            }
            self.dirty = false;
        }
        Ok(())
    }

    /// CLUSTER MEET toward an existing member.
    pub async fn cluster_add_node(&mut self, seed_addr: &str) -> Result<(), TribError> {
        let (host, port) = parse_addr(seed_addr)?;
        let reply = self
            .client
            .call_str(&["CLUSTER", "MEET", &host, &port.to_string()])
            .await?;
        expect_ok("CLUSTER MEET", reply)
    }

    pub async fn cluster_replicate(&mut self, master_id: &str) -> Result<(), TribError> {
        let reply = self
            .client
            .call_str(&["CLUSTER", "REPLICATE", master_id])
            .await?;
        expect_ok("CLUSTER REPLICATE", reply)
    }

    pub async fn cluster_forget(&mut self, node_id: &str) -> Result<(), TribError> {
        let reply = self.client.call_str(&["CLUSTER", "FORGET", node_id]).await?;
        expect_ok("CLUSTER FORGET", reply)
    }

    /// CLUSTER SETSLOT; IMPORTING/MIGRATING/NODE carry the peer node id.
    pub async fn cluster_set_slot(
        &mut self,
        slot: u16,
        state: SetSlotState,
        peer_id: Option<&str>,
    ) -> Result<(), TribError> {
        let slot_str = slot.to_string();
        let state_str = state.to_string();
        let mut args = vec!["CLUSTER", "SETSLOT", slot_str.as_str(), state_str.as_str()];
        if let Some(id) = peer_id {
            args.push(id);
        }
        let reply = self.client.call_str(&args).await?;
        expect_ok("CLUSTER SETSLOT", reply)
    }

    pub async fn cluster_count_keys_in_slot(&mut self, slot: u16) -> Result<i64, TribError> {
        let reply = self
            .client
            .call_str(&["CLUSTER", "COUNTKEYSINSLOT", &slot.to_string()])
            .await?;
        reply.as_integer().ok_or_else(|| TribError::UnexpectedReply {
            command: "CLUSTER COUNTKEYSINSLOT".to_string(),
            reply: reply.render(),
        })
    }

    pub async fn cluster_get_keys_in_slot(
        &mut self,
        slot: u16,
        count: usize,
    ) -> Result<Vec<Bytes>, TribError> {
        let reply = self
            .client
            .call_str(&[
                "CLUSTER",
                "GETKEYSINSLOT",
                &slot.to_string(),
                &count.to_string(),
            ])
            .await?;
        reply
            .clone()
            .into_bulk_vec()
            .ok_or_else(|| TribError::UnexpectedReply {
                command: "CLUSTER GETKEYSINSLOT".to_string(),
                reply: reply.render(),
            })
    }

    pub async fn cluster_bumpepoch(&mut self) -> Result<(), TribError> {
        self.client.call_str(&["CLUSTER", "BUMPEPOCH"]).await?;
        Ok(())
    }

    pub async fn cluster_add_slots(&mut self, slots: &[u16]) -> Result<(), TribError> {
        if slots.is_empty() {
            return Ok(());
        }
        let mut args = vec!["CLUSTER".to_string(), "ADDSLOTS".to_string()];
        args.extend(slots.iter().map(|s| s.to_string()));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let reply = self.client.call_str(&refs).await?;
        expect_ok("CLUSTER ADDSLOTS", reply)
    }

    pub async fn cluster_del_slots(&mut self, slots: &[u16]) -> Result<(), TribError> {
        if slots.is_empty() {
            return Ok(());
        }
        let mut args = vec!["CLUSTER".to_string(), "DELSLOTS".to_string()];
        args.extend(slots.iter().map(|s| s.to_string()));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let reply = self.client.call_str(&refs).await?;
        expect_ok("CLUSTER DELSLOTS", reply)
    }

    pub async fn cluster_set_config_epoch(&mut self, epoch: u64) -> Result<(), TribError> {
        let reply = self
            .client
            .call_str(&["CLUSTER", "SET-CONFIG-EPOCH", &epoch.to_string()])
            .await?;
        expect_ok("CLUSTER SET-CONFIG-EPOCH", reply)
    }

    /// SHUTDOWN never replies on success; the dropped connection is the ack.
    pub async fn shutdown(&mut self) -> Result<(), TribError> {
        match self.client.call_str(&["SHUTDOWN", "NOSAVE"]).await {
            Ok(_) => Ok(()),
            Err(TribError::ConnectionClosed) | Err(TribError::Io(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn dbsize(&mut self) -> Result<i64, TribError> {
        let reply = self.client.call_str(&["DBSIZE"]).await?;
        reply.as_integer().ok_or_else(|| TribError::UnexpectedReply {
            command: "DBSIZE".to_string(),
            reply: reply.render(),
        })
    }

    pub async fn config_set(&mut self, param: &str, value: &str) -> Result<(), TribError> {
        let reply = self.client.call_str(&["CONFIG", "SET", param, value]).await?;
        expect_ok("CONFIG SET", reply)
    }

    pub async fn config_rewrite(&mut self) -> Result<(), TribError> {
        let reply = self.client.call_str(&["CONFIG", "REWRITE"]).await?;
        expect_ok("CONFIG REWRITE", reply)
    }

    /// Batched MIGRATE of whole-slot key sets, used while moving a slot.
    pub async fn migrate_keys(
        &mut self,
        target_host: &str,
        target_port: u16,
        keys: &[Bytes],
        timeout_ms: u64,
        replace: bool,
    ) -> Result<(), TribError> {
        let mut args = to_bulk_args(&[
            "MIGRATE",
            target_host,
            &target_port.to_string(),
            "",
            "0",
            &timeout_ms.to_string(),
        ]);
        if replace {
            args.push(Bytes::from_static(b"REPLACE"));
        }
        args.push(Bytes::from_static(b"KEYS"));
        args.extend(keys.iter().cloned());
        let reply = self.client.call(args).await?;
        expect_ok_or_nokey("MIGRATE", reply)
    }

    /// Single-key MIGRATE, used by the cross-instance import.
    pub async fn migrate_key(
        &mut self,
        target_host: &str,
        target_port: u16,
        key: &Bytes,
        timeout_ms: u64,
        copy: bool,
        replace: bool,
    ) -> Result<(), TribError> {
        let mut args = to_bulk_args(&[
            "MIGRATE",
            target_host,
            &target_port.to_string(),
        ]);
        args.push(key.clone());
        args.extend(to_bulk_args(&["0", &timeout_ms.to_string()]));
        if copy {
            args.push(Bytes::from_static(b"COPY"));
        }
        if replace {
            args.push(Bytes::from_static(b"REPLACE"));
        }
        let reply = self.client.call(args).await?;
        expect_ok_or_nokey("MIGRATE", reply)
    }

    async fn cluster_nodes_raw(&mut self) -> Result<String, TribError> {
        let reply = self.client.call_str(&["CLUSTER", "NODES"]).await?;
        reply.as_text().ok_or_else(|| TribError::UnexpectedReply {
            command: "CLUSTER NODES".to_string(),
            reply: reply.render(),
        })
    }
}

fn expect_ok(command: &str, reply: RespFrame) -> Result<(), TribError> {
    if reply.is_ok() {
        Ok(())
    } else {
        Err(TribError::UnexpectedReply {
            command: command.to_string(),
            reply: reply.render(),
        })
    }
}

/// MIGRATE replies OK when the key moved and NOKEY when it vanished first;
/// both count as success for slot movement.
fn expect_ok_or_nokey(command: &str, reply: RespFrame) -> Result<(), TribError> {
    match &reply {
        RespFrame::SimpleString(s)
            if s.eq_ignore_ascii_case("OK") || s.eq_ignore_ascii_case("NOKEY") =>
        {
            Ok(())
        }
        _ => Err(TribError::UnexpectedReply {
            command: command.to_string(),
            reply: reply.render(),
        }),
    }
}

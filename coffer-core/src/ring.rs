use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Consistent-hash ring mapping object keys to storage node ids.
///
/// Each physical node owns `virtual_nodes` positions on a 32-bit ring.
/// A lookup hashes the key onto the ring and walks clockwise from there,
/// collecting distinct node ids, so membership changes only move the keys
/// adjacent to the affected virtual positions.
pub struct HashRing {
    state: RwLock<RingState>,
    virtual_nodes: usize,
}

#[derive(Default)]
struct RingState {
    nodes: BTreeSet<String>,
    /// (position, node id) pairs sorted by position then id. Position
    /// collisions between virtual keys are kept; scanning is by index.
    entries: Vec<(u32, String)>,
}

impl HashRing {
    pub fn new(virtual_nodes: usize) -> Self {
        Self {
            state: RwLock::new(RingState::default()),
            virtual_nodes: virtual_nodes.max(1),
        }
    }

    /// Insert a physical node and its virtual positions. No-op if the node
    /// is already on the ring.
    pub fn add_node(&self, node_id: &str) {
        let mut state = self.state.write();
        if !state.nodes.insert(node_id.to_string()) {
            return;
        }
        for i in 0..self.virtual_nodes {
            let position = hash_key(&format!("{}:{}", node_id, i));
            state.entries.push((position, node_id.to_string()));
        }
        state.entries.sort_unstable();
    }

    /// Remove a physical node and all of its virtual positions. No-op if
    /// the node is not on the ring.
    pub fn remove_node(&self, node_id: &str) {
        let mut state = self.state.write();
        if !state.nodes.remove(node_id) {
            return;
        }
        state.entries.retain(|(_, id)| id != node_id);
    }

    /// Up to `count` distinct node ids for `key`, in ring order starting at
    /// the key's position. Two calls with the same key and the same ring
    /// state return identical lists.
    pub fn get_nodes(&self, key: &str, count: usize) -> Vec<String> {
        let state = self.state.read();
        if state.entries.is_empty() || count == 0 {
            return Vec::new();
        }
        let count = count.min(state.nodes.len());

        let target = hash_key(key);
        let len = state.entries.len();
        let start = {
            let idx = state.entries.partition_point(|(position, _)| *position < target);
            if idx == len {
                0
            } else {
                idx
            }
        };

        let mut picked: Vec<String> = Vec::with_capacity(count);
        let mut idx = start;
        loop {
            let (_, node_id) = &state.entries[idx];
            if !picked.iter().any(|p| p == node_id) {
                picked.push(node_id.clone());
                if picked.len() == count {
                    break;
                }
            }
            idx = (idx + 1) % len;
            if idx == start {
                break;
            }
        }
        picked
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// All physical node ids, sorted.
    pub fn list_nodes(&self) -> Vec<String> {
        self.state.read().nodes.iter().cloned().collect()
    }
}

/// Ring position of a key: the first four bytes of its SHA-256 digest,
/// big-endian. Must stay bit-exact so placement survives restarts.
pub fn hash_key(key: &str) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

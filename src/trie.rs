//! Binary prefix trie for CIDR and IPv6 lookups
//!
//! The trie is the alternative lookup path for inputs that are nested CIDR
//! prefixes rather than disjoint ranges: longest-prefix-match semantics,
//! IPv4 and IPv6 behind separate roots. It has a two-phase lifecycle:
//! [`TrieBuilder`] accepts inserts, and [`TrieBuilder::freeze`] consumes it
//! into an immutable [`PrefixTrie`], so inserting after the freeze is
//! statically impossible.
//!
//! Nodes live in one arena vector and refer to each other by index, two
//! child slots and an optional payload slot per node.

use crate::addr::IpBits;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Payload stored at a trie terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnEntry {
    /// Originating AS number
    pub asn: u32,
    /// Organization name, when known
    pub name: Option<String>,
}

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    left: u32,
    right: u32,
    value: u32,
}

impl Node {
    fn empty() -> Self {
        Node {
            left: NIL,
            right: NIL,
            value: NIL,
        }
    }
}

/// Mutable build phase of the prefix trie.
#[derive(Debug)]
pub struct TrieBuilder {
    nodes: Vec<Node>,
    values: Vec<AsnEntry>,
    v4_root: u32,
    v6_root: u32,
}

impl TrieBuilder {
    /// Create an empty builder with both roots allocated.
    pub fn new() -> Self {
        TrieBuilder {
            nodes: vec![Node::empty(), Node::empty()],
            values: Vec::new(),
            v4_root: 0,
            v6_root: 1,
        }
    }

    /// Insert a prefix with its payload.
    ///
    /// Walks `prefix_len` bits from the matching root, creating nodes as
    /// needed. Inserting the same prefix again overwrites: last write wins.
    pub fn insert(&mut self, net: IpNet, entry: AsnEntry) {
        let (bits, root) = match net {
            IpNet::V4(n) => (IpBits::from(n.network()), self.v4_root),
            IpNet::V6(n) => (IpBits::from(n.network()), self.v6_root),
        };
        let mut cur = root as usize;
        for i in 0..net.prefix_len() {
            let go_right = bits.bit(i);
            let next = if go_right {
                self.nodes[cur].right
            } else {
                self.nodes[cur].left
            };
            let next = if next == NIL {
                let id = self.nodes.len() as u32;
                self.nodes.push(Node::empty());
                if go_right {
                    self.nodes[cur].right = id;
                } else {
                    self.nodes[cur].left = id;
                }
                id
            } else {
                next
            };
            cur = next as usize;
        }
        let slot = self.nodes[cur].value;
        if slot == NIL {
            self.nodes[cur].value = self.values.len() as u32;
            self.values.push(entry);
        } else {
            self.values[slot as usize] = entry;
        }
    }

    /// Finish building: convert into the immutable lookup structure.
    pub fn freeze(self) -> PrefixTrie {
        let unique_asns = {
            let mut asns: Vec<u32> = self.values.iter().map(|v| v.asn).collect();
            asns.sort_unstable();
            asns.dedup();
            asns.len()
        };
        PrefixTrie {
            nodes: self.nodes,
            values: self.values,
            v4_root: self.v4_root,
            v6_root: self.v6_root,
            unique_asns,
        }
    }
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen, read-only prefix trie serving longest-prefix-match lookups.
#[derive(Debug)]
pub struct PrefixTrie {
    nodes: Vec<Node>,
    values: Vec<AsnEntry>,
    v4_root: u32,
    v6_root: u32,
    unique_asns: usize,
}

impl PrefixTrie {
    /// Longest-prefix-match lookup.
    ///
    /// Walks from the root recording the deepest payload seen; stops at the
    /// first missing child. Returns `None` when no prefix on the path
    /// carried a payload.
    pub fn lookup(&self, addr: IpBits) -> Option<&AsnEntry> {
        let root = match addr {
            IpBits::V4(_) => self.v4_root,
            IpBits::V6(_) => self.v6_root,
        };
        let width = addr.bit_count();
        let mut best = NIL;
        let mut cur = root;
        let mut depth: u8 = 0;
        loop {
            let node = &self.nodes[cur as usize];
            if node.value != NIL {
                best = node.value;
            }
            if depth == width {
                break;
            }
            let next = if addr.bit(depth) {
                node.right
            } else {
                node.left
            };
            if next == NIL {
                break;
            }
            cur = next;
            depth += 1;
        }
        if best == NIL {
            None
        } else {
            Some(&self.values[best as usize])
        }
    }

    /// Number of stored prefixes
    pub fn prefix_count(&self) -> usize {
        self.values.len()
    }

    /// Number of distinct ASNs across all stored prefixes
    pub fn unique_asn_count(&self) -> usize {
        self.unique_asns
    }

    /// Whether the trie holds no prefixes
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

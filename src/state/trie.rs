//! Secure trie built from its complete sorted entry set.
use super::TrieProof;
use crate::{
    node::{hash_data, hex_to_compact},
    param::TERMINATOR,
};
use ethers_core::{types::H256, utils::rlp::RlpStream};
use itertools::Itertools;
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Kind {
    Leaf { key: Vec<u8>, value: Vec<u8> },
    Extension { key: Vec<u8>, child: Box<TrieNode> },
    Branch { children: [Option<Box<TrieNode>>; 16] },
}

#[derive(Clone, Debug)]
struct TrieNode {
    kind: Kind,
    encoded: Vec<u8>,
}

impl TrieNode {
    fn new(kind: Kind, nodes: &mut HashMap<H256, Vec<u8>>) -> Self {
        let encoded = match &kind {
            Kind::Leaf { key, value } => {
                let mut hex = key.clone();
                hex.push(TERMINATOR);
                let mut stream = RlpStream::new_list(2);
                stream.append(&hex_to_compact(&hex));
                stream.append(value);
                stream.out().to_vec()
            }
            Kind::Extension { key, child } => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&hex_to_compact(key));
                stream.append_raw(&child.reference(), 1);
                stream.out().to_vec()
            }
            Kind::Branch { children } => {
                let mut stream = RlpStream::new_list(17);
                for child in children {
                    match child {
                        Some(child) => stream.append_raw(&child.reference(), 1),
                        None => stream.append_empty_data(),
                    };
                }
                stream.append_empty_data();
                stream.out().to_vec()
            }
        };
        if encoded.len() >= 32 {
            nodes.insert(hash_data(&encoded), encoded.clone());
        }
        Self { kind, encoded }
    }

    /// Item the parent embeds: the hash for nodes of 32 bytes or more, the node itself below.
    fn reference(&self) -> Vec<u8> {
        if self.encoded.len() >= 32 {
            let mut stream = RlpStream::new();
            stream.append(&hash_data(&self.encoded).as_bytes());
            stream.out().to_vec()
        } else {
            self.encoded.clone()
        }
    }
}

/// A committed secure trie. Keys are nibble paths of equal length.
#[derive(Clone, Debug, Default)]
pub(crate) struct Trie {
    root: Option<TrieNode>,
}

impl Trie {
    /// Builds the trie over `entries`, sorted by key, and records every hashed node in `nodes`.
    pub fn build(entries: &[(Vec<u8>, Vec<u8>)], nodes: &mut HashMap<H256, Vec<u8>>) -> Self {
        let root = build_node(entries, 0, nodes);
        if let Some(root) = &root {
            // the root is looked up by hash even when short
            nodes.insert(hash_data(&root.encoded), root.encoded.clone());
        }
        Self { root }
    }

    /// Hash of the root node, or the empty trie root.
    pub fn root_hash(&self) -> H256 {
        match &self.root {
            Some(root) => hash_data(&root.encoded),
            None => *super::EMPTY_ROOT,
        }
    }

    /// Nodes from the root along `key`, down to the leaf or the node where the path ends.
    pub fn prove(&self, key: &[u8]) -> TrieProof {
        let mut proof = TrieProof::default();
        let mut node = self.root.as_ref();
        let mut depth = 0;
        while let Some(current) = node {
            proof.nodes.push(current.encoded.clone());
            node = match &current.kind {
                Kind::Leaf { .. } => None,
                Kind::Extension { key: ext_key, child } => {
                    proof.ext_nibbles.push(ext_key.clone());
                    if key.get(depth..).map_or(false, |rest| rest.starts_with(ext_key)) {
                        depth += ext_key.len();
                        Some(child.as_ref())
                    } else {
                        None
                    }
                }
                Kind::Branch { children } => {
                    let child = key
                        .get(depth)
                        .and_then(|&nibble| children[usize::from(nibble)].as_deref());
                    depth += 1;
                    child
                }
            };
        }
        proof
    }
}

fn build_node(
    entries: &[(Vec<u8>, Vec<u8>)],
    depth: usize,
    nodes: &mut HashMap<H256, Vec<u8>>,
) -> Option<TrieNode> {
    let (first, last) = match entries {
        [] => return None,
        [(key, value)] => {
            let kind = Kind::Leaf {
                key: key[depth..].to_vec(),
                value: value.clone(),
            };
            return Some(TrieNode::new(kind, nodes));
        }
        [first, .., last] => (&first.0, &last.0),
    };

    // entries are sorted, so the first and last key bound the shared prefix
    let shared = first[depth..]
        .iter()
        .zip(&last[depth..])
        .take_while(|(a, b)| a == b)
        .count();
    if shared > 0 {
        let child = build_node(entries, depth + shared, nodes)?;
        let kind = Kind::Extension {
            key: first[depth..depth + shared].to_vec(),
            child: Box::new(child),
        };
        return Some(TrieNode::new(kind, nodes));
    }

    let mut children: [Option<Box<TrieNode>>; 16] = Default::default();
    for (nibble, group) in &entries.iter().group_by(|(key, _)| key[depth]) {
        let group: Vec<_> = group.cloned().collect();
        children[usize::from(nibble)] = build_node(&group, depth + 1, nodes).map(Box::new);
    }
    Some(TrieNode::new(Kind::Branch { children }, nodes))
}

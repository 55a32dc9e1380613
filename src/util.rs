//! Key helpers shared by the generator and callers building proofs themselves.

use crate::node::{decode_node, hash_data, key_nibbles};
use ethers_core::types::{Address, H256};

/// Nibbles of the account trie key of `address`.
pub fn account_key(address: &Address) -> Vec<u8> {
    key_nibbles(&hash_data(address.as_bytes()))
}

/// Nibbles of the storage trie key of the slot `key`.
pub fn storage_key(key: &H256) -> Vec<u8> {
    key_nibbles(&hash_data(key.as_bytes()))
}

/// Whether the shorter of two proofs of different length ends in a leaf. False when the
/// lengths agree or the shorter proof is empty.
pub fn is_shorter_proof_last_leaf(proof_s: &[Vec<u8>], proof_c: &[Vec<u8>]) -> bool {
    let shorter = match proof_s.len().cmp(&proof_c.len()) {
        std::cmp::Ordering::Less => proof_s,
        std::cmp::Ordering::Greater => proof_c,
        std::cmp::Ordering::Equal => return false,
    };
    shorter.last().map_or(false, |node| {
        decode_node(hash_data(node), node).map_or(false, |node| node.is_leaf())
    })
}

//! Trie node decoding and the key encodings used by the witness rows.
use crate::{
    error::{Result, WitnessError},
    param::{KEY_NIBBLES_LEN, TERMINATOR},
};
use ethers_core::{
    types::H256,
    utils::{
        keccak256,
        rlp::{Rlp, RlpStream},
    },
};

/// Reference from a node to one of its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Child {
    /// Nothing at this slot (`0x80`).
    Empty,
    /// Child of 32 bytes or more, referenced by its keccak hash.
    Hash(H256),
    /// Child shorter than 32 bytes, embedded as its own rlp list.
    Inline(Vec<u8>),
    /// Leaf value, or the value slot of a branch.
    Value(Vec<u8>),
}

/// A decoded trie node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// 16 children and the value slot.
    Branch(Box<[Child; 17]>),
    /// Extension or leaf. `key` is hex encoded; a leaf key ends with the terminator.
    Short {
        /// partial key nibbles
        key: Vec<u8>,
        /// child of an extension or value of a leaf
        value: Child,
    },
}

impl Child {
    fn decode(item: &Rlp) -> Result<Self> {
        if item.is_list() {
            return Ok(Self::Inline(item.as_raw().to_vec()));
        }
        let data = item.data()?;
        Ok(match data.len() {
            0 => Self::Empty,
            32 => Self::Hash(H256::from_slice(data)),
            _ => Self::Value(data.to_vec()),
        })
    }

    fn value(data: &[u8]) -> Self {
        if data.is_empty() {
            Self::Empty
        } else {
            Self::Value(data.to_vec())
        }
    }

    /// The bytes this reference occupies inside its parent node.
    pub fn raw_item(&self) -> Vec<u8> {
        match self {
            Self::Empty => vec![0x80],
            Self::Hash(hash) => {
                let mut stream = RlpStream::new();
                stream.append(&hash.as_bytes());
                stream.out().to_vec()
            }
            Self::Inline(raw) => raw.clone(),
            Self::Value(value) => {
                let mut stream = RlpStream::new();
                stream.append(value);
                stream.out().to_vec()
            }
        }
    }

    /// Whether this reference points at the node encoded as `encoded`.
    pub fn references(&self, encoded: &[u8]) -> bool {
        *self == node_ref(encoded)
    }
}

impl Node {
    /// Whether this is a short node whose key carries the terminator.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Short { key, .. } if key.last() == Some(&TERMINATOR))
    }

    /// Number of key nibbles consumed when passing through this node.
    pub fn key_nibbles(&self) -> usize {
        match self {
            Self::Branch(_) => 1,
            Self::Short { key, .. } => key.iter().filter(|&&n| n != TERMINATOR).count(),
        }
    }

    /// The reference followed for `nibble` (ignored by short nodes).
    pub fn child(&self, nibble: u8) -> &Child {
        match self {
            Self::Branch(children) => &children[usize::from(nibble)],
            Self::Short { value, .. } => value,
        }
    }
}

/// Keccak-256 of `data`.
pub fn hash_data(data: &[u8]) -> H256 {
    H256(keccak256(data))
}

/// How a parent refers to the node encoded as `encoded`.
pub fn node_ref(encoded: &[u8]) -> Child {
    if encoded.len() >= 32 {
        Child::Hash(hash_data(encoded))
    } else {
        Child::Inline(encoded.to_vec())
    }
}

/// Parses an rlp encoded trie node. `hash` is only used in log output.
pub fn decode_node(hash: H256, blob: &[u8]) -> Result<Node> {
    let rlp = Rlp::new(blob);
    match rlp.item_count()? {
        17 => {
            let mut children: [Child; 17] = Default::default();
            for (i, child) in children.iter_mut().enumerate().take(16) {
                *child = Child::decode(&rlp.at(i)?)?;
            }
            children[16] = Child::value(rlp.at(16)?.data()?);
            Ok(Node::Branch(Box::new(children)))
        }
        2 => {
            let key = compact_to_hex(rlp.at(0)?.data()?);
            let value = if key.last() == Some(&TERMINATOR) {
                Child::value(rlp.at(1)?.data()?)
            } else {
                Child::decode(&rlp.at(1)?)?
            };
            Ok(Node::Short { key, value })
        }
        n => {
            log::warn!("node {:?} has {} items", hash, n);
            Err(WitnessError::UnexpectedItemCount(n))
        }
    }
}

impl Default for Child {
    fn default() -> Self {
        Self::Empty
    }
}

/// Whether the rlp encoded node is a branch (17 items) rather than a short node.
pub fn is_branch(node: &[u8]) -> Result<bool> {
    match Rlp::new(node).item_count()? {
        17 => Ok(true),
        2 => Ok(false),
        n => Err(WitnessError::UnexpectedItemCount(n)),
    }
}

/// Number of bytes of the compact encoded key of an extension node.
pub fn get_extension_node_key_len(node: &[u8]) -> Result<usize> {
    Ok(Rlp::new(node).at(0)?.data()?.len())
}

/// Whether the compact key of an extension node holds an odd number of nibbles.
pub fn is_extension_key_odd(node: &[u8]) -> Result<bool> {
    let rlp = Rlp::new(node);
    let key = rlp.at(0)?;
    let key = key.data()?;
    let first = key.first().ok_or(WitnessError::MalformedNode("empty extension key"))?;
    Ok(first & 0x10 != 0)
}

/// Expands bytes into nibbles and appends the terminator.
pub fn key_bytes_to_hex(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .chain(std::iter::once(TERMINATOR))
        .collect()
}

/// Hex-prefix encoding of a nibble slice (terminator marks a leaf).
pub fn hex_to_compact(hex: &[u8]) -> Vec<u8> {
    let (hex, terminator) = match hex.split_last() {
        Some((&TERMINATOR, rest)) => (rest, 1u8),
        _ => (hex, 0u8),
    };
    let mut compact = Vec::with_capacity(hex.len() / 2 + 1);
    let mut first = terminator << 5;
    let rest = if hex.len() % 2 == 1 {
        first |= 0x10 | hex[0];
        &hex[1..]
    } else {
        hex
    };
    compact.push(first);
    compact.extend(rest.chunks(2).map(|pair| pair[0] << 4 | pair[1]));
    compact
}

/// Inverse of [`hex_to_compact`].
pub fn compact_to_hex(compact: &[u8]) -> Vec<u8> {
    if compact.is_empty() {
        return vec![];
    }
    let mut base = key_bytes_to_hex(compact);
    if base[0] < 2 {
        base.pop();
    }
    let chop = 2 - usize::from(base[0] & 1);
    base.split_off(chop)
}

/// Nibbles of the secure key, without terminator.
pub fn key_nibbles(hashed_key: &H256) -> Vec<u8> {
    let mut nibbles = key_bytes_to_hex(hashed_key.as_bytes());
    nibbles.truncate(KEY_NIBBLES_LEN);
    nibbles
}

/// Position and size of an rlp item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RlpItem {
    /// offset of the first header byte
    pub offset: usize,
    /// number of header bytes
    pub header: usize,
    /// number of payload bytes
    pub payload: usize,
}

impl RlpItem {
    /// Offset right after the item.
    pub fn end(&self) -> usize {
        self.offset + self.header + self.payload
    }

    /// Offset of the payload.
    pub fn payload_start(&self) -> usize {
        self.offset + self.header
    }
}

/// Classifies the rlp item starting at `offset` by its prefix byte alone. Unlike a decoder it
/// accepts non-canonical lengths, which placeholder nodes rely on.
pub fn rlp_item_at(bytes: &[u8], offset: usize) -> Result<RlpItem> {
    let prefix = *bytes
        .get(offset)
        .ok_or(WitnessError::MalformedNode("item beyond node end"))?;
    let (header, payload) = match prefix {
        0..=0x7f => (0, 1),
        0x80..=0xb7 => (1, usize::from(prefix - 0x80)),
        0xc0..=0xf7 => (1, usize::from(prefix - 0xc0)),
        _ => {
            let len_of_len = usize::from(if prefix <= 0xbf { prefix - 0xb7 } else { prefix - 0xf7 });
            let len_bytes = bytes
                .get(offset + 1..offset + 1 + len_of_len)
                .ok_or(WitnessError::MalformedNode("truncated length"))?;
            let payload = len_bytes
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
            (1 + len_of_len, payload)
        }
    };
    Ok(RlpItem {
        offset,
        header,
        payload,
    })
}

/// Header of a list node and its first two items (key and value of a short node, or the
/// first two children of a branch).
pub fn short_node_items(node: &[u8]) -> Result<(RlpItem, RlpItem, RlpItem)> {
    let list = rlp_item_at(node, 0)?;
    let key = rlp_item_at(node, list.payload_start())?;
    let value = rlp_item_at(node, key.end())?;
    Ok((list, key, value))
}

/// Checks that every element of `proof` is referenced by its parent at the nibble(s) of `key`
/// consumed so far.
pub fn verify_proof_chain(proof: &[Vec<u8>], key: &[u8]) -> Result<()> {
    let mut key_index = 0;
    for (depth, pair) in proof.windows(2).enumerate() {
        let parent = decode_node(hash_data(&pair[0]), &pair[0])?;
        let nibble = match parent {
            Node::Branch(_) => *key.get(key_index).ok_or(WitnessError::KeyExhausted(key_index))?,
            Node::Short { .. } => 0,
        };
        if !parent.child(nibble).references(&pair[1]) {
            return Err(WitnessError::HashMismatch { depth: depth + 1 });
        }
        key_index += parent.key_nibbles();
    }
    Ok(())
}

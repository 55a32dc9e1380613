//! Error type shared by every stage of witness assembly.

use ethers_core::{types::H256, utils::rlp::DecoderError};

#[derive(Debug, thiserror::Error)]
/// Errors raised while assembling a witness.
pub enum WitnessError {
    #[error(transparent)]
    /// rlp decode error
    Rlp(#[from] DecoderError),
    #[error("node list has {0} items, expected 2 or 17")]
    /// a node that is neither a branch nor a short node
    UnexpectedItemCount(usize),
    #[error("malformed node: {0}")]
    /// node bytes that cannot be laid out
    MalformedNode(&'static str),
    #[error("{len} bytes do not fit into a row segment of {max}")]
    /// node item too long for its row segment
    RowOverflow {
        /// length of the item
        len: usize,
        /// room in the row
        max: usize,
    },
    #[error("witness not properly generated: S and C differ at depth {depth}")]
    /// S and C proofs do not describe the same path
    ProofPairMismatch {
        /// proof index where the mismatch was found
        depth: usize,
    },
    #[error("node at depth {depth} is not referenced by its parent")]
    /// a node's hash differs from the child reference in its parent
    HashMismatch {
        /// proof index of the child
        depth: usize,
    },
    #[error("no witness layout for proofs of length {len_s} and {len_c}")]
    /// the delta between the proofs is none of the supported cases
    UnclassifiedDelta {
        /// length of the S proof
        len_s: usize,
        /// length of the C proof
        len_c: usize,
    },
    #[error("both proofs are empty")]
    /// nothing to witness
    EmptyProofs,
    #[error("no extension nibbles for extension node {0}")]
    /// extension nibble stream shorter than the number of extension nodes
    MissingExtensionNibbles(usize),
    #[error("extension node {index} has {decoded} nibbles, nibble stream has {given}")]
    /// extension nibble stream disagrees with the node
    ExtensionNibblesMismatch {
        /// index of the extension node
        index: usize,
        /// nibbles decoded from the node
        decoded: usize,
        /// nibbles supplied by the caller
        given: usize,
    },
    #[error("key exhausted at nibble {0}")]
    /// the path is deeper than the key
    KeyExhausted(usize),
    #[error("node {0:?} not found")]
    /// a node needed for the witness is missing from the database
    MissingNode(H256),
    #[error(transparent)]
    /// json error
    Json(#[from] serde_json::Error),
    #[error("unknown row type {0}")]
    /// row type byte out of range
    UnknownRowType(u8),
}

/// Shorthand for results in this crate.
pub type Result<T> = std::result::Result<T, WitnessError>;

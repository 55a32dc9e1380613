//! Witness generator for an Ethereum Merkle Patricia Trie circuit. Turns the proofs of a key
//! before (S) and after (C) a modification into the fixed width rows the circuit reads.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod generator;
pub mod node;
pub mod param;
pub mod parity;
pub mod prepare;
pub mod row;
pub mod serde;
pub mod state;
pub mod util;
pub mod witness;

pub use crate::serde::HexBytes;
pub use error::{Result, WitnessError};
pub use generator::{get_witness, ProofType, ProofWitness, TrieModification, WitnessGenerator};
pub use parity::Parity;
pub use row::{BranchInitRow, RowType, Side, WitnessRow};
pub use state::{MemoryState, NodeDatabase, TrieProof, TrieState};
pub use witness::{prepare_witness, ProofPair, TailCase, Witness, WitnessOptions};

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

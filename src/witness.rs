//! Assembles the witness of a single modification from the S (before) and C (after) proofs
//! of the modified key.
mod branch_placeholder;
mod leaf_placeholder;
mod modified_extension;

use crate::{
    error::{Result, WitnessError},
    node::{
        decode_node, get_extension_node_key_len, hash_data, is_branch, is_extension_key_odd,
        verify_proof_chain,
    },
    param::*,
    parity::Parity,
    prepare::{
        prepare_account_leaf, prepare_drifted_leaf_placeholder, prepare_empty_extension_rows,
        prepare_empty_non_existing_storage_row, prepare_extension_rows,
        prepare_non_existing_storage_row, prepare_storage_leaf_rows, prepare_two_branches,
        set_remaining_key,
    },
    row::{BranchInitRow, ExtensionKind, RowType, Side, WitnessRow},
    serde::HexBytes,
    state::NodeDatabase,
};
use ethers_core::types::Address;
use serde::Serialize;

/// Proofs of the modified key before and after the modification, root first, with the key
/// nibbles of every extension node met on either path.
#[derive(Clone, Debug, Default)]
pub struct ProofPair {
    /// proof before the modification
    pub proof_s: Vec<Vec<u8>>,
    /// proof after the modification
    pub proof_c: Vec<Vec<u8>>,
    /// nibbles of the extension nodes in `proof_s`
    pub ext_nibbles_s: Vec<Vec<u8>>,
    /// nibbles of the extension nodes in `proof_c`
    pub ext_nibbles_c: Vec<Vec<u8>>,
}

/// Flags describing what the proofs are about.
#[derive(Clone, Copy, Debug, Default)]
pub struct WitnessOptions {
    /// account trie proof rather than storage trie proof
    pub is_account_proof: bool,
    /// proves that the account does not exist
    pub non_existing_account_proof: bool,
    /// proves that the storage slot does not exist
    pub non_existing_storage_proof: bool,
    /// the shorter of two proofs of different length ends in a leaf
    pub is_shorter_proof_last_leaf: bool,
}

/// Rows of the witness and the blobs whose hashes the circuit looks up.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Witness {
    /// witness rows, in the order the circuit reads them
    pub rows: Vec<WitnessRow>,
    /// nodes to insert into the keccak table
    pub to_be_hashed: Vec<HexBytes>,
    /// whether an extension node was met on the common part of the paths
    pub saw_extension_node: bool,
}

/// How the C proof differs from the S proof below their common part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailCase {
    /// Same shape, the leaf was updated (or a wrong leaf proves non-existence).
    Update,
    /// Both proofs end in a branch without the key.
    BranchTerminus,
    /// A leaf was added to or removed from an existing branch.
    LeafInsertDelete,
    /// A leaf was turned into a branch holding two leaves, or back.
    BranchSplit,
    /// A branch was inserted into (or removed from) the middle of an extension node.
    ModifiedExtension,
}

impl TailCase {
    /// Classifies the difference between `proof_s` and `proof_c`.
    pub fn classify(
        proof_s: &[Vec<u8>],
        proof_c: &[Vec<u8>],
        is_shorter_proof_last_leaf: bool,
    ) -> Result<Self> {
        let (len_s, len_c) = (proof_s.len(), proof_c.len());
        let unclassified = WitnessError::UnclassifiedDelta { len_s, len_c };
        let (shorter, longer) = if len_s <= len_c {
            (proof_s, proof_c)
        } else {
            (proof_c, proof_s)
        };
        let Some(last_long) = longer.last() else {
            return Err(WitnessError::EmptyProofs);
        };

        let Some(last_short) = shorter.last() else {
            // first leaf of an empty trie, or the last one removed
            return if longer.len() == 1 && !is_branch(last_long)? {
                Ok(Self::LeafInsertDelete)
            } else {
                Err(unclassified)
            };
        };

        let long_is_branch = is_branch(last_long)?;
        match (len_s.abs_diff(len_c), is_branch(last_short)?) {
            (0, true) if long_is_branch => Ok(Self::BranchTerminus),
            (0, false) if !long_is_branch => {
                let is_leaf = |node: &[u8]| -> Result<bool> {
                    Ok(decode_node(hash_data(node), node)?.is_leaf())
                };
                if is_leaf(last_short)? && is_leaf(last_long)? {
                    Ok(Self::Update)
                } else {
                    Err(unclassified)
                }
            }
            (0, _) => Err(WitnessError::ProofPairMismatch {
                depth: len_s - 1,
            }),
            (1, true) => Ok(Self::LeafInsertDelete),
            (1 | 2, false) if is_shorter_proof_last_leaf => Ok(Self::BranchSplit),
            (1 | 2, false) => Ok(Self::ModifiedExtension),
            _ => Err(unclassified),
        }
    }
}

/// Builds the witness rows for the modification of the key with nibbles `key`, proved by
/// `proofs`. `neighbour_node` is the leaf that drifted when a branch was inserted or removed;
/// it is looked up in `db` when not given.
pub fn prepare_witness<D: NodeDatabase + ?Sized>(
    db: &D,
    address: Address,
    proofs: &ProofPair,
    key: &[u8],
    neighbour_node: Option<&[u8]>,
    options: WitnessOptions,
) -> Result<Witness> {
    if key.len() < KEY_NIBBLES_LEN {
        return Err(WitnessError::KeyExhausted(key.len()));
    }
    verify_proof_chain(&proofs.proof_s, key)?;
    verify_proof_chain(&proofs.proof_c, key)?;
    let case = TailCase::classify(
        &proofs.proof_s,
        &proofs.proof_c,
        options.is_shorter_proof_last_leaf,
    )?;
    log::debug!(
        "{:?} witness for {:?}, proofs of length {} and {}",
        case,
        address,
        proofs.proof_s.len(),
        proofs.proof_c.len()
    );

    let mut assembler = Assembler {
        db,
        proofs,
        key,
        options,
        rows: vec![],
        to_be_hashed: vec![],
        key_index: 0,
        extension_node_ind: 0,
        parity: Parity::default(),
    };

    let common = proofs.proof_s.len().min(proofs.proof_c.len());
    let up_to = match case {
        TailCase::BranchSplit | TailCase::ModifiedExtension => common - 1,
        _ => common,
    };
    assembler.walk(up_to)?;

    match case {
        TailCase::Update => assembler.finish_update()?,
        TailCase::BranchTerminus => assembler.finish_branch_terminus()?,
        TailCase::LeafInsertDelete => assembler.add_leaf_and_placeholder()?,
        TailCase::BranchSplit => {
            let placeholder = assembler.add_branch_and_placeholder(false)?;
            assembler.add_leaf_after_branch_placeholder(&placeholder, neighbour_node)?;
        }
        TailCase::ModifiedExtension => {
            let placeholder = assembler.add_branch_and_placeholder(true)?;
            assembler.add_leaf_after_branch_placeholder(&placeholder, neighbour_node)?;
            assembler.add_modified_ext_node(&placeholder)?;
        }
    }

    Ok(Witness {
        rows: assembler.rows,
        to_be_hashed: assembler.to_be_hashed.into_iter().map(HexBytes).collect(),
        saw_extension_node: assembler.extension_node_ind > 0,
    })
}

/// State of one witness assembly.
struct Assembler<'a, D: ?Sized> {
    db: &'a D,
    proofs: &'a ProofPair,
    key: &'a [u8],
    options: WitnessOptions,
    rows: Vec<WitnessRow>,
    to_be_hashed: Vec<Vec<u8>>,
    key_index: usize,
    extension_node_ind: usize,
    parity: Parity,
}

impl<'a, D: NodeDatabase + ?Sized> Assembler<'a, D> {
    fn nibble(&self, index: usize) -> Result<u8> {
        self.key
            .get(index)
            .copied()
            .filter(|_| index < KEY_NIBBLES_LEN)
            .ok_or(WitnessError::KeyExhausted(index))
    }

    /// Emits the rows of the first `up_to` elements, which both proofs share the shape of.
    fn walk(&mut self, up_to: usize) -> Result<()> {
        let proofs = self.proofs;
        let (len_s, len_c) = (proofs.proof_s.len(), proofs.proof_c.len());
        let mut extension: Option<(usize, WitnessRow, WitnessRow)> = None;

        for i in 0..up_to {
            let (node_s, node_c) = (&proofs.proof_s[i], &proofs.proof_c[i]);
            let branch = is_branch(node_s)?;
            if branch != is_branch(node_c)? {
                return Err(WitnessError::ProofPairMismatch { depth: i });
            }

            if !branch {
                if i != len_s - 1 || i != len_c - 1 {
                    let (n, row_s, row_c) = prepare_extension_rows(
                        &proofs.ext_nibbles_s,
                        self.extension_node_ind,
                        node_s,
                        node_c,
                        false,
                        false,
                    )?;
                    log::trace!("extension node of {} nibbles at depth {}", n, i);
                    self.key_index += n;
                    self.extension_node_ind += 1;
                    extension = Some((n, row_s, row_c));
                } else {
                    self.add_leaves(node_s, node_c)?;
                }
                continue;
            }

            self.parity.before_branch(extension.as_ref().map(|(n, ..)| *n));
            let nibble = self.nibble(self.key_index)?;
            let mut rows = prepare_two_branches(node_s, node_c, nibble, self.parity, false, false)?;
            self.key_index += 1;

            for (k, row) in rows.iter().enumerate().skip(1) {
                if k - 1 != usize::from(nibble) && !row.halves_equal() {
                    log::error!("branch at depth {} differs at child {}", i, k - 1);
                    return Err(WitnessError::ProofPairMismatch { depth: i });
                }
            }

            match extension.take() {
                Some((_, row_s, row_c)) => {
                    let (ext_s, ext_c) = (&proofs.proof_s[i - 1], &proofs.proof_c[i - 1]);
                    let kind = ExtensionKind::new(
                        get_extension_node_key_len(ext_s)?,
                        is_extension_key_odd(ext_s)?,
                    );
                    BranchInitRow(&mut rows[0]).set_extension(ext_s, ext_c, kind, self.parity);
                    rows.extend([row_s, row_c]);
                    self.to_be_hashed.extend([ext_s.clone(), ext_c.clone()]);
                }
                None => rows.extend(prepare_empty_extension_rows()),
            }
            log::trace!("branch at depth {} with parity {:?}", i, self.parity);

            self.rows.extend(rows);
            self.to_be_hashed.extend([node_s.clone(), node_c.clone()]);
        }

        if extension.is_some() {
            // an extension node always has a branch below it
            return Err(WitnessError::UnclassifiedDelta {
                len_s,
                len_c,
            });
        }
        Ok(())
    }

    /// Leaf rows of an update, both leaves real.
    fn add_leaves(&mut self, leaf_s: &[u8], leaf_c: &[u8]) -> Result<()> {
        if self.options.is_account_proof {
            let (rows, hashed) = prepare_account_leaf(
                leaf_s,
                leaf_c,
                self.key,
                self.options.non_existing_account_proof,
                false,
            )?;
            self.rows.extend(rows);
            self.to_be_hashed.extend(hashed);
        } else {
            for (leaf, side) in [(leaf_s, Side::S), (leaf_c, Side::C)] {
                let (rows, hashed) = prepare_storage_leaf_rows(leaf, side, false)?;
                self.rows.extend(rows);
                self.to_be_hashed.push(hashed);
            }
        }
        Ok(())
    }

    fn finish_update(&mut self) -> Result<()> {
        let is_account_proof = self.options.is_account_proof;
        self.rows.push(prepare_drifted_leaf_placeholder(is_account_proof));
        if !is_account_proof {
            let row = if self.options.non_existing_storage_proof {
                let c_key_row = &self.rows[self.rows.len() - 3];
                prepare_non_existing_storage_row(c_key_row, self.key, false)?
            } else {
                prepare_empty_non_existing_storage_row()
            };
            self.rows.push(row);
        }
        Ok(())
    }

    /// Both proofs end in the same branch, which has nothing at the key. A placeholder leaf
    /// stands in for the missing one.
    fn finish_branch_terminus(&mut self) -> Result<()> {
        let is_account_proof = self.options.is_account_proof;
        if is_account_proof {
            let leaf = placeholder_account_leaf(self.key, self.key_index)?;
            let (rows, _) = prepare_account_leaf(
                &leaf,
                &leaf,
                self.key,
                self.options.non_existing_account_proof,
                true,
            )?;
            self.rows.extend(rows);
            self.rows.push(prepare_drifted_leaf_placeholder(is_account_proof));
        } else {
            let mut leaf = vec![0; ROW_LEN];
            leaf[..3].copy_from_slice(&[228, 130, 51]);
            for side in [Side::S, Side::C] {
                let (rows, _) = prepare_storage_leaf_rows(&leaf, side, false)?;
                self.rows.extend(rows);
            }
            self.rows.push(prepare_drifted_leaf_placeholder(is_account_proof));

            let mut row = prepare_empty_non_existing_storage_row();
            if self.options.non_existing_storage_proof {
                set_remaining_key(&mut row, self.key, self.key_index)?;
            }
            self.rows.push(row);
        }
        Ok(())
    }
}

/// Account leaf standing in for a missing one: the key item holds the remaining nibbles of
/// `key`, the value keeps only its rlp headers.
fn placeholder_account_leaf(key: &[u8], key_index: usize) -> Result<Vec<u8>> {
    let mut leaf = WitnessRow::new(RowType::AccountLeafKeyS);
    set_remaining_key(&mut leaf, key, key_index)?;
    let key_len = usize::from(leaf[1] - 128);
    // list header, then the key item from byte 2
    let mut bytes = vec![0; ROW_LEN];
    bytes[0] = 248;
    bytes[2..3 + key_len].copy_from_slice(&leaf.0[1..2 + key_len]);
    bytes[3 + key_len] = 184;
    bytes[3 + key_len + 2] = 248;
    bytes[3 + key_len + 3] = bytes[3 + key_len + 1].wrapping_sub(2);
    Ok(bytes)
}

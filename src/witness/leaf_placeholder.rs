use super::{branch_placeholder::PlaceholderBranch, Assembler};
use crate::{
    error::{Result, WitnessError},
    node::{decode_node, hash_data, Child, Node},
    prepare::{
        prepare_account_leaf, prepare_drifted_leaf, prepare_drifted_leaf_placeholder,
        prepare_empty_non_existing_storage_row, prepare_storage_leaf_rows,
    },
    row::Side,
    state::NodeDatabase,
};

impl<'a, D: NodeDatabase + ?Sized> Assembler<'a, D> {
    /// A leaf exists on the longer side only. The same leaf stands in as placeholder on the
    /// other side, where the parent branch has nothing at the key.
    pub(super) fn add_leaf_and_placeholder(&mut self) -> Result<()> {
        let proofs = self.proofs;
        let s_is_longer = proofs.proof_s.len() > proofs.proof_c.len();
        let (longer, shorter) = if s_is_longer {
            (&proofs.proof_s, &proofs.proof_c)
        } else {
            (&proofs.proof_c, &proofs.proof_s)
        };
        let leaf = longer.last().ok_or(WitnessError::EmptyProofs)?;

        if let Some(parent) = shorter.last() {
            let nibble = self.nibble(self.key_index - 1)?;
            if *decode_node(hash_data(parent), parent)?.child(nibble) != Child::Empty {
                return Err(WitnessError::ProofPairMismatch {
                    depth: shorter.len() - 1,
                });
            }
        }

        let is_account_proof = self.options.is_account_proof;
        if is_account_proof {
            let (rows, mut hashed) = prepare_account_leaf(
                leaf,
                leaf,
                self.key,
                self.options.non_existing_account_proof,
                false,
            )?;
            self.rows.extend(rows);
            hashed.truncate(1);
            self.to_be_hashed.extend(hashed);
        } else {
            for side in [Side::S, Side::C] {
                let is_placeholder = (side == Side::S) != s_is_longer;
                let (rows, _) = prepare_storage_leaf_rows(leaf, side, is_placeholder)?;
                self.rows.extend(rows);
            }
            self.to_be_hashed.push(leaf.clone());
        }

        self.rows.push(prepare_drifted_leaf_placeholder(is_account_proof));
        if !is_account_proof {
            self.rows.push(prepare_empty_non_existing_storage_row());
        }
        Ok(())
    }

    /// Leaf rows below a placeholder branch.
    pub(super) fn add_leaf_after_branch_placeholder(
        &mut self,
        placeholder: &PlaceholderBranch,
        neighbour_node: Option<&[u8]>,
    ) -> Result<()> {
        if self.options.is_account_proof {
            self.add_account_leaf_after_branch_placeholder(placeholder, neighbour_node)
        } else {
            self.add_storage_leaf_after_branch_placeholder(placeholder, neighbour_node)
        }
    }

    fn add_account_leaf_after_branch_placeholder(
        &mut self,
        placeholder: &PlaceholderBranch,
        neighbour_node: Option<&[u8]>,
    ) -> Result<()> {
        let (leaf_s, leaf_c) = self.last_leaves()?;
        let non_existing = self.options.non_existing_account_proof;

        if placeholder.is_modified_extension {
            let leaf = if placeholder.s_is_longer { leaf_s } else { leaf_c };
            let (rows, mut hashed) = prepare_account_leaf(leaf, leaf, self.key, non_existing, false)?;
            self.rows.extend(rows);
            hashed.truncate(1);
            self.to_be_hashed.extend(hashed);
            self.rows.push(prepare_drifted_leaf_placeholder(true));
        } else {
            let (rows, hashed) = prepare_account_leaf(leaf_s, leaf_c, self.key, non_existing, false)?;
            self.rows.extend(rows);
            self.to_be_hashed.extend(hashed);
            let neighbour = self.neighbour(placeholder, neighbour_node)?;
            self.rows.push(prepare_drifted_leaf(&neighbour, true)?);
            self.to_be_hashed.push(neighbour);
        }
        Ok(())
    }

    fn add_storage_leaf_after_branch_placeholder(
        &mut self,
        placeholder: &PlaceholderBranch,
        neighbour_node: Option<&[u8]>,
    ) -> Result<()> {
        let (leaf_s, leaf_c) = self.last_leaves()?;

        if placeholder.is_modified_extension {
            // only the longer side has the leaf below the new branch
            let leaf = if placeholder.s_is_longer { leaf_s } else { leaf_c };
            for side in [Side::S, Side::C] {
                let is_placeholder = (side == Side::S) != placeholder.s_is_longer;
                let (rows, _) = prepare_storage_leaf_rows(leaf, side, is_placeholder)?;
                self.rows.extend(rows);
            }
            self.to_be_hashed.push(leaf.to_vec());
            self.rows.push(prepare_drifted_leaf_placeholder(false));
        } else {
            for (leaf, side) in [(leaf_s, Side::S), (leaf_c, Side::C)] {
                let (rows, hashed) = prepare_storage_leaf_rows(leaf, side, false)?;
                self.rows.extend(rows);
                self.to_be_hashed.push(hashed);
            }
            let neighbour = self.neighbour(placeholder, neighbour_node)?;
            self.rows.push(prepare_drifted_leaf(&neighbour, false)?);
            self.to_be_hashed.push(neighbour);
        }
        self.rows.push(prepare_empty_non_existing_storage_row());
        Ok(())
    }

    fn last_leaves(&self) -> Result<(&'a [u8], &'a [u8])> {
        let proofs = self.proofs;
        match (proofs.proof_s.last(), proofs.proof_c.last()) {
            (Some(s), Some(c)) => Ok((s, c)),
            _ => Err(WitnessError::EmptyProofs),
        }
    }

    /// The leaf that moved from the place of the placeholder branch into the branch, as the
    /// only other child at the drifted nibble. Taken from `given` or the node database, and
    /// checked against the branch reference.
    fn neighbour(&self, placeholder: &PlaceholderBranch, given: Option<&[u8]>) -> Result<Vec<u8>> {
        let proofs = self.proofs;
        let longer = if placeholder.s_is_longer {
            &proofs.proof_s
        } else {
            &proofs.proof_c
        };
        let depth = longer.len() - 2;
        let branch = &longer[depth];
        let Node::Branch(children) = decode_node(hash_data(branch), branch)? else {
            return Err(WitnessError::MalformedNode("expected a branch"));
        };
        let child = children
            .iter()
            .take(16)
            .enumerate()
            .find(|(k, child)| *k != usize::from(placeholder.nibble) && **child != Child::Empty)
            .map(|(_, child)| child)
            .ok_or(WitnessError::MalformedNode("branch with a single child"))?;

        let neighbour = match (given, child) {
            (Some(node), _) => node.to_vec(),
            (None, Child::Hash(hash)) => self.db.node(hash).ok_or(WitnessError::MissingNode(*hash))?,
            (None, Child::Inline(raw)) => raw.clone(),
            _ => return Err(WitnessError::MalformedNode("value in a branch child slot")),
        };
        if !child.references(&neighbour) {
            log::error!("drifted leaf does not match the branch at depth {}", depth);
            return Err(WitnessError::HashMismatch { depth: depth + 1 });
        }
        Ok(neighbour)
    }
}

use super::Assembler;
use crate::{
    error::Result,
    node::{get_extension_node_key_len, is_extension_key_odd},
    parity::Parity,
    prepare::{prepare_empty_extension_rows, prepare_extension_rows, prepare_parallel_branches},
    row::{BranchInitRow, ExtensionKind},
    state::NodeDatabase,
};

/// A branch present in only one of the two proofs.
#[derive(Clone, Copy, Debug)]
pub(super) struct PlaceholderBranch {
    /// the branch was inserted into (or removed from) an extension node
    pub is_modified_extension: bool,
    /// nibbles of the extension node right above the branch, zero without one
    pub number_of_nibbles: usize,
    /// parity of the last branch before the placeholder one
    pub parity_before: Parity,
    /// the branch exists in the S proof
    pub s_is_longer: bool,
    /// nibble of the key at the placeholder branch
    pub nibble: u8,
}

impl<'a, D: NodeDatabase + ?Sized> Assembler<'a, D> {
    /// Branch rows for the branch that exists on the longer side only, preceded in the row
    /// block by the extension node above it if the proofs differ by two elements.
    pub(super) fn add_branch_and_placeholder(
        &mut self,
        is_modified_extension: bool,
    ) -> Result<PlaceholderBranch> {
        let proofs = self.proofs;
        let (len_s, len_c) = (proofs.proof_s.len(), proofs.proof_c.len());
        let s_is_longer = len_s > len_c;
        let (longer, ext_nibbles) = if s_is_longer {
            (&proofs.proof_s, &proofs.ext_nibbles_s)
        } else {
            (&proofs.proof_c, &proofs.ext_nibbles_c)
        };
        let len = longer.len();
        let is_extension = len_s.abs_diff(len_c) == 2;

        let mut number_of_nibbles = 0;
        let mut extension = None;
        if is_extension {
            let ext = &longer[len - 3];
            let (n, row_s, row_c) = prepare_extension_rows(
                ext_nibbles,
                self.extension_node_ind,
                ext,
                ext,
                false,
                false,
            )?;
            number_of_nibbles = n;
            extension = Some((ext, row_s, row_c));
        }

        let parity_before = self.parity;
        let mut parity = parity_before;
        parity.before_branch(is_extension.then_some(number_of_nibbles));
        let nibble = self.nibble(self.key_index + number_of_nibbles)?;

        let branch = &longer[len - 2];
        let (mut rows, hashed) =
            prepare_parallel_branches(branch, nibble, s_is_longer, parity, is_modified_extension)?;
        match extension {
            Some((ext, row_s, row_c)) => {
                let kind = ExtensionKind::new(
                    get_extension_node_key_len(ext)?,
                    is_extension_key_odd(ext)?,
                );
                BranchInitRow(&mut rows[0]).set_extension(ext, ext, kind, parity);
                rows.extend([row_s, row_c]);
                self.to_be_hashed.push(ext.clone());
            }
            None => rows.extend(prepare_empty_extension_rows()),
        }
        log::trace!(
            "placeholder branch on the {} side, {} extension nibbles, parity {:?}",
            if s_is_longer { "C" } else { "S" },
            number_of_nibbles,
            parity
        );

        self.rows.extend(rows);
        self.to_be_hashed.push(hashed);
        self.parity = parity;

        Ok(PlaceholderBranch {
            is_modified_extension,
            number_of_nibbles,
            parity_before,
            s_is_longer,
            nibble,
        })
    }
}

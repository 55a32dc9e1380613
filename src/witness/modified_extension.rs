use super::{branch_placeholder::PlaceholderBranch, Assembler};
use crate::{
    error::{Result, WitnessError},
    node::{
        decode_node, get_extension_node_key_len, hash_data, hex_to_compact,
        is_extension_key_odd, Child, Node,
    },
    param::*,
    prepare::prepare_extension_row,
    row::{set_extension_size_flags, ExtensionKind, RowType, WitnessRow},
    state::NodeDatabase,
};
use ethers_core::utils::rlp::RlpStream;

impl<'a, D: NodeDatabase + ?Sized> Assembler<'a, D> {
    /// Rows describing the extension node that a branch was inserted into: the selectors, the
    /// long extension as it was, and the short extension left below the new branch.
    pub(super) fn add_modified_ext_node(&mut self, placeholder: &PlaceholderBranch) -> Result<()> {
        let proofs = self.proofs;
        let (longer, shorter, short_side_nibbles) = if placeholder.s_is_longer {
            (&proofs.proof_s, &proofs.proof_c, &proofs.ext_nibbles_c)
        } else {
            (&proofs.proof_c, &proofs.proof_s, &proofs.ext_nibbles_s)
        };
        let ind = self.extension_node_ind;
        let long_ext = shorter.last().ok_or(WitnessError::EmptyProofs)?;
        let nibbles = short_side_nibbles
            .get(ind)
            .ok_or(WitnessError::MissingExtensionNibbles(ind))?;
        let Node::Short {
            key: long_key,
            value: long_child,
        } = decode_node(hash_data(long_ext), long_ext)?
        else {
            return Err(WitnessError::MalformedNode("expected an extension node"));
        };
        if long_key != *nibbles {
            return Err(WitnessError::ExtensionNibblesMismatch {
                index: ind,
                decoded: long_key.len(),
                given: nibbles.len(),
            });
        }

        // the new branch splits the long extension after `n` nibbles
        let n = placeholder.number_of_nibbles;
        let mismatch = WitnessError::ProofPairMismatch {
            depth: shorter.len() - 1,
        };
        let diverging = *long_key.get(n).ok_or(mismatch)?;
        let key_part = self
            .key
            .get(self.key_index..self.key_index + n)
            .ok_or(WitnessError::KeyExhausted(self.key_index + n))?;
        if long_key[..n] != *key_part || diverging == placeholder.nibble {
            return Err(WitnessError::ProofPairMismatch {
                depth: shorter.len() - 1,
            });
        }

        let short_ext = (long_key.len() > n + 1).then(|| {
            let mut stream = RlpStream::new_list(2);
            stream.append(&hex_to_compact(&long_key[n + 1..]));
            stream.append_raw(&long_child.raw_item(), 1);
            stream.out().to_vec()
        });

        let branch_depth = longer.len() - 2;
        let branch = &longer[branch_depth];
        let Node::Branch(children) = decode_node(hash_data(branch), branch)? else {
            return Err(WitnessError::MalformedNode("expected a branch"));
        };
        let below = &children[usize::from(diverging)];
        let linked = match &short_ext {
            Some(ext) => below.references(ext),
            None => *below == long_child && long_child != Child::Empty,
        };
        if !linked {
            log::error!(
                "branch at depth {} does not hold the rest of the extension node",
                branch_depth
            );
            return Err(WitnessError::HashMismatch {
                depth: branch_depth + 1,
            });
        }

        let mut selectors = WitnessRow::new(RowType::ModifiedExtensionNodeSelectors);
        let kind = ExtensionKind::new(
            get_extension_node_key_len(long_ext)?,
            is_extension_key_odd(long_ext)?,
        );
        let mut parity = placeholder.parity_before;
        parity.before_branch(Some(long_key.len()));
        selectors[BRANCH_0_KEY_POS] = diverging;
        selectors[IS_EXTENSION_POS] = 1;
        selectors[kind.flag_pos(parity)] = 1;
        set_extension_size_flags(
            &mut selectors,
            long_ext,
            short_ext.as_deref().unwrap_or_default(),
        );

        let before = prepare_extension_row(long_ext, RowType::ModifiedExtensionNodeBefore)?;
        let after = match &short_ext {
            Some(ext) => prepare_extension_row(ext, RowType::ModifiedExtensionNodeAfter)?,
            None => WitnessRow::new(RowType::ModifiedExtensionNodeAfter),
        };
        log::trace!(
            "extension of {} nibbles split at {}, {} nibbles left",
            long_key.len(),
            n,
            long_key.len() - n - 1
        );

        self.rows.extend([selectors, before, after]);
        self.to_be_hashed.push(long_ext.clone());
        self.to_be_hashed.extend(short_ext);
        Ok(())
    }
}

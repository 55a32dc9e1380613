use crate::{
    error::{Result, WitnessError},
    node::{decode_node, hash_data, Child, Node},
    param::*,
    parity::Parity,
    row::{BranchInitRow, RowType, Side, WitnessRow},
};
use ethers_core::utils::rlp::Rlp;

/// Init row and 16 children rows of a branch present on both sides. A child row holds the S
/// child in its first half and the C child in its second, so the halves are equal wherever the
/// modification did not pass.
pub fn prepare_two_branches(
    node_s: &[u8],
    node_c: &[u8],
    nibble: u8,
    parity: Parity,
    placeholder_s: bool,
    placeholder_c: bool,
) -> Result<Vec<WitnessRow>> {
    let mut init = WitnessRow::new(RowType::InitBranch);
    {
        let mut view = BranchInitRow(&mut init);
        view.set_rlp_meta(Side::S, node_s)?;
        view.set_rlp_meta(Side::C, node_c)?;
        view.set_key(nibble);
        view.set_parity(parity);
        if placeholder_s {
            view.set_placeholder(Side::S);
        }
        if placeholder_c {
            view.set_placeholder(Side::C);
        }
        if node_s.len() < 32 {
            view.set_non_hashed(Side::S);
        }
        if node_c.len() < 32 {
            view.set_non_hashed(Side::C);
        }
    }

    let (rlp_s, rlp_c) = (Rlp::new(node_s), Rlp::new(node_c));
    let mut rows = Vec::with_capacity(BRANCH_ROWS_NUM);
    rows.push(init);
    for k in 0..16 {
        let mut row = WitnessRow::new(RowType::BranchChild);
        set_child(&mut row, S_RLP_START, rlp_s.at(k)?.as_raw())?;
        set_child(&mut row, C_RLP_START, rlp_c.at(k)?.as_raw())?;
        rows.push(row);
    }
    Ok(rows)
}

fn set_child(row: &mut WitnessRow, half: usize, raw: &[u8]) -> Result<()> {
    if raw == [0x80] {
        row[half + RLP_NUM] = 0x80;
        Ok(())
    } else {
        row.write(half + 1, raw, half + RLP_NUM + HASH_WIDTH)
    }
}

/// Branch block for a branch that exists on one side only. Both halves carry the real branch;
/// the side without it is flagged as placeholder. Returns the rows and the branch for hashing.
pub fn prepare_parallel_branches(
    branch: &[u8],
    nibble: u8,
    real_is_s: bool,
    parity: Parity,
    is_modified_extension: bool,
) -> Result<(Vec<WitnessRow>, Vec<u8>)> {
    let mut rows = prepare_two_branches(branch, branch, nibble, parity, !real_is_s, real_is_s)?;

    let Node::Branch(children) = decode_node(hash_data(branch), branch)? else {
        return Err(WitnessError::MalformedNode("expected a branch"));
    };
    let mut view = BranchInitRow(&mut rows[0]);
    if let Some(drifted) = (0..16u8)
        .find(|&k| k != nibble && children[usize::from(k)] != Child::Empty)
    {
        view.set_drifted(drifted);
    }
    if is_modified_extension {
        view.set_modified_extension();
    }
    Ok((rows, branch.to_vec()))
}

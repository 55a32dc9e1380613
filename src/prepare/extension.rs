use crate::{
    error::{Result, WitnessError},
    node::{decode_node, hash_data, short_node_items, Node},
    param::*,
    row::{RowType, WitnessRow},
};

/// The two rows appended to a branch block below an extension node. The S row holds the S
/// node's list header and key, the C row the key nibbles; both carry their side's child
/// reference in the second half. Returns the number of nibbles, which `ext_nibbles[ind]`
/// is authoritative for.
pub fn prepare_extension_rows(
    ext_nibbles: &[Vec<u8>],
    ind: usize,
    node_s: &[u8],
    node_c: &[u8],
    placeholder_s: bool,
    placeholder_c: bool,
) -> Result<(usize, WitnessRow, WitnessRow)> {
    let nibbles = ext_nibbles
        .get(ind)
        .ok_or(WitnessError::MissingExtensionNibbles(ind))?;
    for node in [node_s, node_c] {
        if let Node::Short { key, .. } = decode_node(hash_data(node), node)? {
            if key != *nibbles {
                return Err(WitnessError::ExtensionNibblesMismatch {
                    index: ind,
                    decoded: key.len(),
                    given: nibbles.len(),
                });
            }
        } else {
            return Err(WitnessError::MalformedNode("expected an extension node"));
        }
    }

    let row_s = if placeholder_s {
        WitnessRow::new(RowType::ExtensionNodeS)
    } else {
        prepare_extension_row(node_s, RowType::ExtensionNodeS)?
    };

    let mut row_c = WitnessRow::new(RowType::ExtensionNodeC);
    if !placeholder_c {
        let (_, _, value) = short_node_items(node_c)?;
        row_c.write(S_START, nibbles, C_RLP_START)?;
        row_c.write(
            C_RLP_START + 1,
            node_slice(node_c, value.offset, value.end())?,
            WITNESS_ROW_WIDTH,
        )?;
    }

    Ok((nibbles.len(), row_s, row_c))
}

/// Row holding the list header and key item of an extension node in its first half and the
/// child reference in its second.
pub fn prepare_extension_row(node: &[u8], row_type: RowType) -> Result<WitnessRow> {
    let (_, key, value) = short_node_items(node)?;
    let mut row = WitnessRow::new(row_type);
    row.write(S_RLP_START, node_slice(node, 0, key.end())?, C_RLP_START)?;
    row.write(
        C_RLP_START + 1,
        node_slice(node, value.offset, value.end())?,
        WITNESS_ROW_WIDTH,
    )?;
    Ok(row)
}

fn node_slice(node: &[u8], start: usize, end: usize) -> Result<&[u8]> {
    node.get(start..end)
        .ok_or(WitnessError::MalformedNode("extension item beyond node end"))
}

/// Zero extension rows closing a branch block without an extension node above it.
pub fn prepare_empty_extension_rows() -> Vec<WitnessRow> {
    vec![
        WitnessRow::new(RowType::ExtensionNodeS),
        WitnessRow::new(RowType::ExtensionNodeC),
    ]
}

use crate::{
    error::{Result, WitnessError},
    node::{compact_to_hex, hex_to_compact, rlp_item_at, short_node_items, RlpItem},
    param::*,
    row::{RowType, Side, WitnessRow},
};

/// Key row and value row of a storage leaf. The key row holds the list header and the key item,
/// the value row the value item (left zero for a placeholder). The row types carry the side.
pub fn prepare_storage_leaf_rows(
    leaf: &[u8],
    side: Side,
    is_placeholder: bool,
) -> Result<(Vec<WitnessRow>, Vec<u8>)> {
    let (key_type, value_type) = match side {
        Side::S => (RowType::StorageLeafSKey, RowType::StorageLeafSValue),
        Side::C => (RowType::StorageLeafCKey, RowType::StorageLeafCValue),
    };
    let (_, key, value) = short_node_items(leaf)?;

    let mut key_row = WitnessRow::new(key_type);
    key_row.write(S_RLP_START, leaf_slice(leaf, 0, key.end())?, WITNESS_ROW_WIDTH)?;

    let mut value_row = WitnessRow::new(value_type);
    if !is_placeholder {
        value_row.write(
            S_RLP_START,
            leaf_slice(leaf, value.offset, value.end())?,
            C_RLP_START,
        )?;
    }
    Ok((vec![key_row, value_row], leaf.to_vec()))
}

fn leaf_slice(leaf: &[u8], start: usize, end: usize) -> Result<&[u8]> {
    leaf.get(start..end)
        .ok_or(WitnessError::MalformedNode("leaf item beyond node end"))
}

/// Items of an account leaf: key, then the value string wrapping
/// `[nonce, balance, storage root, code hash]`.
struct AccountItems {
    key: RlpItem,
    value: RlpItem,
    inner: RlpItem,
    fields: Option<[RlpItem; 4]>,
}

impl AccountItems {
    fn new(leaf: &[u8], with_fields: bool) -> Result<Self> {
        let (_, key, value) = short_node_items(leaf)?;
        let inner = rlp_item_at(leaf, value.payload_start())?;
        let fields = if with_fields {
            let nonce = rlp_item_at(leaf, inner.payload_start())?;
            let balance = rlp_item_at(leaf, nonce.end())?;
            let storage_root = rlp_item_at(leaf, balance.end())?;
            let code_hash = rlp_item_at(leaf, storage_root.end())?;
            Some([nonce, balance, storage_root, code_hash])
        } else {
            None
        };
        Ok(Self {
            key,
            value,
            inner,
            fields,
        })
    }

    fn key_row(&self, leaf: &[u8], row_type: RowType) -> Result<WitnessRow> {
        let mut row = WitnessRow::new(row_type);
        row.write(S_RLP_START, leaf_slice(leaf, 0, self.key.end())?, WITNESS_ROW_WIDTH)?;
        Ok(row)
    }

    fn nonce_balance_row(&self, leaf: &[u8], row_type: RowType) -> Result<WitnessRow> {
        let mut row = WitnessRow::new(row_type);
        row.write(
            S_RLP_START,
            leaf_slice(leaf, self.value.offset, self.value.payload_start())?,
            S_START,
        )?;
        row.write(
            C_RLP_START,
            leaf_slice(leaf, self.inner.offset, self.inner.payload_start())?,
            C_START,
        )?;
        if let Some([nonce, balance, ..]) = &self.fields {
            row.write(S_START, leaf_slice(leaf, nonce.offset, nonce.end())?, C_RLP_START)?;
            row.write(
                C_START,
                leaf_slice(leaf, balance.offset, balance.end())?,
                WITNESS_ROW_WIDTH,
            )?;
        }
        Ok(row)
    }

    fn storage_codehash_row(&self, leaf: &[u8], row_type: RowType) -> Result<WitnessRow> {
        let mut row = WitnessRow::new(row_type);
        if let Some([_, _, storage_root, code_hash]) = &self.fields {
            row.write(
                S_RLP_START + 1,
                leaf_slice(leaf, storage_root.offset, storage_root.end())?,
                C_RLP_START,
            )?;
            row.write(
                C_RLP_START + 1,
                leaf_slice(leaf, code_hash.offset, code_hash.end())?,
                WITNESS_ROW_WIDTH,
            )?;
        }
        Ok(row)
    }
}

/// Account leaf block for both sides: key S, key C, non-existing, nonce/balance S and C,
/// storage root/code hash S and C. A placeholder leaf contributes its key and rlp headers
/// only. Returns the leaves to hash (none for a placeholder).
pub fn prepare_account_leaf(
    leaf_s: &[u8],
    leaf_c: &[u8],
    key: &[u8],
    non_existing_account: bool,
    is_placeholder: bool,
) -> Result<(Vec<WitnessRow>, Vec<Vec<u8>>)> {
    let items_s = AccountItems::new(leaf_s, !is_placeholder)?;
    let items_c = AccountItems::new(leaf_c, !is_placeholder)?;

    let mut non_existing = WitnessRow::new(RowType::AccountNonExisting);
    let key_payload = leaf_slice(leaf_c, items_c.key.payload_start(), items_c.key.end())?;
    let key_start = 2 + items_c.key.header;
    if non_existing_account {
        let queried = queried_key_compact(key, key_payload)?;
        if !is_placeholder {
            // the leaf on the path belongs to another key
            non_existing[0] = 1;
            non_existing.write(
                2,
                leaf_slice(leaf_c, items_c.key.offset, items_c.key.payload_start())?,
                key_start,
            )?;
        }
        non_existing.write(key_start, &queried, WITNESS_ROW_WIDTH)?;
    } else {
        non_existing.write(key_start, key_payload, WITNESS_ROW_WIDTH)?;
    }

    let rows = vec![
        items_s.key_row(leaf_s, RowType::AccountLeafKeyS)?,
        items_c.key_row(leaf_c, RowType::AccountLeafKeyC)?,
        non_existing,
        items_s.nonce_balance_row(leaf_s, RowType::AccountLeafNonceBalanceS)?,
        items_c.nonce_balance_row(leaf_c, RowType::AccountLeafNonceBalanceC)?,
        items_s.storage_codehash_row(leaf_s, RowType::AccountLeafRootCodehashS)?,
        items_c.storage_codehash_row(leaf_c, RowType::AccountLeafRootCodehashC)?,
    ];
    let to_be_hashed = if is_placeholder {
        vec![]
    } else {
        vec![leaf_s.to_vec(), leaf_c.to_vec()]
    };
    Ok((rows, to_be_hashed))
}

/// Compact encoding of the last nibbles of `key`, as many as the leaf key `leaf_key` holds.
fn queried_key_compact(key: &[u8], leaf_key: &[u8]) -> Result<Vec<u8>> {
    let leaf_nibbles = compact_to_hex(leaf_key)
        .iter()
        .filter(|&&n| n != TERMINATOR)
        .count();
    let remaining = key
        .get(KEY_NIBBLES_LEN - leaf_nibbles.min(KEY_NIBBLES_LEN)..KEY_NIBBLES_LEN)
        .ok_or(WitnessError::KeyExhausted(KEY_NIBBLES_LEN))?;
    let mut hex = remaining.to_vec();
    hex.push(TERMINATOR);
    Ok(hex_to_compact(&hex))
}

/// Row recording the leaf that moved into a newly inserted branch, zero when none did.
pub fn prepare_drifted_leaf_placeholder(is_account_proof: bool) -> WitnessRow {
    WitnessRow::new(drifted_type(is_account_proof))
}

/// Drifted leaf row holding the key of `neighbour`, the sibling of the modified leaf in the
/// inserted (or removed) branch.
pub fn prepare_drifted_leaf(neighbour: &[u8], is_account_proof: bool) -> Result<WitnessRow> {
    let (_, key, _) = short_node_items(neighbour)?;
    let mut row = WitnessRow::new(drifted_type(is_account_proof));
    row.write(S_RLP_START, leaf_slice(neighbour, 0, key.end())?, WITNESS_ROW_WIDTH)?;
    Ok(row)
}

fn drifted_type(is_account_proof: bool) -> RowType {
    if is_account_proof {
        RowType::AccountLeafNeighbouringLeaf
    } else {
        RowType::NeighbouringStorageLeaf
    }
}

/// Non-existing storage row for proofs of existing slots.
pub fn prepare_empty_non_existing_storage_row() -> WitnessRow {
    WitnessRow::new(RowType::NonExistingStorage)
}

/// Non-existing storage row next to the leaf found on the path of `key`. The headers are copied
/// from the C key row, the key bytes are those of the queried key. The first byte flags that
/// a leaf of another key was found (unless `no_leaf`).
pub fn prepare_non_existing_storage_row(
    c_key_row: &WitnessRow,
    key: &[u8],
    no_leaf: bool,
) -> Result<WitnessRow> {
    let bytes = c_key_row.bytes();
    let list = rlp_item_at(bytes, 0)?;
    let key_item = rlp_item_at(bytes, list.payload_start())?;
    let leaf_key = leaf_slice(bytes, key_item.payload_start(), key_item.end())?;
    let queried = queried_key_compact(key, leaf_key)?;

    let mut row = prepare_empty_non_existing_storage_row();
    row[0] = u8::from(!no_leaf);
    row.write(1, &bytes[1..key_item.payload_start()], key_item.payload_start())?;
    row.write(key_item.payload_start(), &queried, WITNESS_ROW_WIDTH)?;
    Ok(row)
}

/// Writes the key item header (`keyLen + 128`) and the compact encoding of the nibbles of `key`
/// below `key_index` from byte 1 of `row`. Used where a proof ends in a branch and no leaf
/// provides the headers.
pub fn set_remaining_key(row: &mut WitnessRow, key: &[u8], key_index: usize) -> Result<()> {
    let remaining = key
        .get(key_index..KEY_NIBBLES_LEN)
        .ok_or(WitnessError::KeyExhausted(key_index))?;
    let mut hex = remaining.to_vec();
    hex.push(TERMINATOR);
    let compact = hex_to_compact(&hex);
    row[1] = 128 + compact.len() as u8;
    row.write(2, &compact, WITNESS_ROW_WIDTH)
}

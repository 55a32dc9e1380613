use crate::{
    generator::{TrieModification, WitnessGenerator},
    node::hash_data,
    param::*,
    parity::Parity,
    row::{BranchInitRow, RowType, Side, WitnessRow},
    state::{MemoryState, TrieState, EMPTY_CODE_HASH},
    test_utils::*,
    util::storage_key,
    witness::{prepare_witness, ProofPair, TailCase, WitnessOptions},
    WitnessError,
};
use ethers_core::types::{Address, H256, U256};
use rand::Rng;
use std::collections::HashMap;

// Base storage: 0x21 (key 3a63..) and 0x12 (key bb8a..) in a root branch at nibbles 3 and b.
const BASE: [(u64, u64); 2] = [(0x12, 1), (0x21, 2)];

fn init(row: &mut WitnessRow) -> BranchInitRow<'_> {
    assert_eq!(row.row_type().unwrap(), RowType::InitBranch);
    BranchInitRow(row)
}

fn assert_storage_tail(rows: &[WitnessRow], from: usize) {
    assert_eq!(
        row_types(&rows[from..from + 6]),
        vec![
            RowType::StorageLeafSKey,
            RowType::StorageLeafSValue,
            RowType::StorageLeafCKey,
            RowType::StorageLeafCValue,
            RowType::NeighbouringStorageLeaf,
            RowType::NonExistingStorage,
        ]
    );
}

fn assert_branch_block(rows: &[WitnessRow], from: usize) {
    let mut expected = vec![RowType::InitBranch];
    expected.extend([RowType::BranchChild; 16]);
    expected.extend([RowType::ExtensionNodeS, RowType::ExtensionNodeC]);
    assert_eq!(row_types(&rows[from..from + BRANCH_ROWS_NUM]), expected);
}

#[test]
fn storage_update() {
    let mut state = storage_state(&BASE);
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x21), U256::from(17)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 25);
    assert_branch_block(&rows, 0);
    assert_storage_tail(&rows, 19);

    let mut root_row = rows[0];
    let root = init(&mut root_row);
    assert_eq!(root.key(), 3);
    assert_eq!(root.parity(), Some(Parity::C16));
    assert!(!root.is_extension());
    for k in 0..16 {
        assert_eq!(rows[k + 1].halves_equal(), k != 3, "child {}", k);
    }
    // leaf 0x21 below nibble 3: odd remaining key, so the compact key starts with 0x3a
    assert_eq!(&rows[19].0[..6], &[226, 160, 58, 99, 87, 1]);
    assert_eq!(rows[19].0[..34], rows[21].0[..34]);
    assert_eq!(rows[20][0], 2);
    assert_eq!(rows[22][0], 17);
    assert!(rows[23].bytes().iter().all(|&b| b == 0));
    assert!(rows[24].bytes().iter().all(|&b| b == 0));

    let hashed = &witness.storage.as_ref().unwrap().to_be_hashed;
    assert_eq!(hashed.len(), 4);
    assert!(!witness.storage.as_ref().unwrap().saw_extension_node);
}

#[test]
fn storage_insert_into_branch() {
    let mut state = storage_state(&BASE);
    // key 4057.., nothing at nibble 4 of the root
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x2), U256::from(3)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 25);
    assert_eq!(init(&mut rows[0].clone()).key(), 4);
    let child = &rows[5];
    assert_eq!(child[S_START], 128);
    assert_eq!(child[C_RLP_START + 1], 160);

    // the S leaf is a placeholder copy of the new C leaf
    assert_eq!(&rows[21].0[..6], &[226, 160, 48, 87, 135, 250]);
    assert_eq!(rows[19].0[..34], rows[21].0[..34]);
    assert!(rows[20].bytes().iter().all(|&b| b == 0));
    assert_eq!(rows[22][0], 3);
}

#[test]
fn storage_delete_from_branch() {
    let mut state = storage_state(&[(0x12, 1), (0x21, 2), (0x2, 3)]);
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x2), U256::zero()),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 25);
    assert_eq!(rows[20][0], 3);
    assert!(rows[22].bytes().iter().all(|&b| b == 0));
    assert_eq!(rows[5][S_RLP_START + 1], 160);
    assert_eq!(rows[5][C_START], 128);
}

#[test]
fn storage_branch_split() {
    let mut state = storage_state(&BASE);
    // key 31ec.. meets leaf 0x21 at nibble 3
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x11), U256::from(5)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 44);
    assert_eq!(branch_inits(&rows), vec![0, 19]);
    assert_branch_block(&rows, 0);
    assert_branch_block(&rows, 19);
    assert_storage_tail(&rows, 38);

    let mut placeholder_row = rows[19];
    let placeholder = init(&mut placeholder_row);
    assert!(placeholder.is_placeholder(Side::S));
    assert!(!placeholder.is_placeholder(Side::C));
    assert_eq!(placeholder.key(), 1);
    assert_eq!(placeholder.0[DRIFTED_POS], 10);
    assert_eq!(placeholder.parity(), Some(Parity::C1));
    assert!(rows[20..36].iter().all(WitnessRow::halves_equal));
    assert!(rows[36..38].iter().all(|row| row.bytes().iter().all(|&b| b == 0)));

    // old leaf at depth 1, new leaf at depth 2
    assert_eq!(&rows[38].0[..3], &[226, 160, 58]);
    assert_eq!(&rows[40].0[..6], &[226, 160, 32, 236, 194, 26]);
    // 0x21 moved one level down
    assert_eq!(&rows[42].0[..6], &[226, 160, 32, 99, 87, 1]);
}

#[test]
fn storage_branch_split_below_odd_extension() {
    let mut state = storage_state(&BASE);
    // key 3ad8.. shares 3a with 0x21
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x1b), U256::from(5)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 44);
    let mut placeholder_row = rows[19];
    let placeholder = init(&mut placeholder_row);
    assert!(placeholder.is_extension());
    assert_eq!(placeholder.key(), 13);
    assert_eq!(placeholder.0[DRIFTED_POS], 6);
    assert_eq!(placeholder.parity(), Some(Parity::C16));
    assert_eq!(placeholder.0[IS_EXT_SHORT_C16_POS], 1);

    // extension node with the single nibble a
    assert_eq!(&rows[36].0[..2], &[226, 0x1a]);
    assert_eq!(rows[36][C_RLP_START + 1], 160);
    assert_eq!(rows[37][S_START], 10);
    assert_eq!(rows[36].0[C_START..C_START + 32], rows[37].0[C_START..C_START + 32]);

    assert_eq!(&rows[40].0[..5], &[225, 159, 56, 170, 79]);
    assert_eq!(&rows[42].0[..5], &[225, 159, 51, 87, 1]);
}

#[test]
fn storage_branch_split_below_even_extension() {
    let mut state = storage_state(&BASE);
    // key 3a6a.. shares 3a6 with 0x21
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x1d1e), U256::from(5)),
    );
    let rows = storage_rows(&witness);

    let mut placeholder_row = rows[19];
    let placeholder = init(&mut placeholder_row);
    assert!(placeholder.is_extension());
    assert_eq!(placeholder.key(), 10);
    assert_eq!(placeholder.0[DRIFTED_POS], 3);
    assert_eq!(placeholder.parity(), Some(Parity::C1));
    assert_eq!(placeholder.0[IS_EXT_LONG_EVEN_C1_POS], 1);
    assert_eq!(&rows[37].0[S_START..S_START + 2], &[10, 6]);
}

#[test]
fn storage_branch_collapse() {
    let mut state = storage_state(&[(0x12, 1), (0x21, 2), (0x11, 3)]);
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x11), U256::zero()),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 44);
    let mut placeholder_row = rows[19];
    let placeholder = init(&mut placeholder_row);
    assert!(placeholder.is_placeholder(Side::C));
    assert_eq!(placeholder.key(), 1);
    assert_eq!(placeholder.0[DRIFTED_POS], 10);
    assert_eq!(&rows[40].0[..3], &[226, 160, 58]);
    assert_eq!(&rows[42].0[..3], &[226, 160, 32]);
}

// 0x5 (036b63..) and 0x4e4 (036b28..) sit below an extension 036b at the root.
const EXTENSION_BASE: [(u64, u64); 2] = [(0x5, 1), (0x4e4, 2)];

#[test]
fn drifted_leaf_from_caller() {
    let mut state = storage_state(&BASE);
    let slot_key = slot(0x11);
    let s = state.get_storage_proof(*MAIN_ADDRESS, slot_key).unwrap();
    state.set_state(*MAIN_ADDRESS, slot_key, U256::from(5));
    state.intermediate_root();
    let c = state.get_storage_proof(*MAIN_ADDRESS, slot_key).unwrap();
    let mut moved = state.get_storage_proof(*MAIN_ADDRESS, slot(0x21)).unwrap();
    let neighbour = moved.nodes.pop().unwrap();

    let proofs = ProofPair {
        proof_s: s.nodes,
        proof_c: c.nodes,
        ext_nibbles_s: s.ext_nibbles,
        ext_nibbles_c: c.ext_nibbles,
    };
    let options = WitnessOptions {
        is_shorter_proof_last_leaf: true,
        ..Default::default()
    };
    let key = storage_key(&slot_key);
    let empty_db: HashMap<H256, Vec<u8>> = HashMap::new();

    let given = prepare_witness(
        &empty_db,
        *MAIN_ADDRESS,
        &proofs,
        &key,
        Some(&neighbour),
        options,
    )
    .unwrap();
    let looked_up = prepare_witness(&state, *MAIN_ADDRESS, &proofs, &key, None, options).unwrap();
    assert_eq!(given.rows, looked_up.rows);

    assert!(matches!(
        prepare_witness(&empty_db, *MAIN_ADDRESS, &proofs, &key, None, options),
        Err(WitnessError::MissingNode(_))
    ));
    // the leaf before it moved is not what the new branch references
    let stale = proofs.proof_s[1].clone();
    assert!(matches!(
        prepare_witness(&empty_db, *MAIN_ADDRESS, &proofs, &key, Some(&stale), options),
        Err(WitnessError::HashMismatch { depth: 2 })
    ));
}

#[test]
fn extension_at_root() {
    let mut state = storage_state(&EXTENSION_BASE);
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x5), U256::from(9)),
    );
    let storage = witness.storage.as_ref().unwrap();
    let rows = &storage.rows;

    assert_eq!(rows.len(), 25);
    assert!(storage.saw_extension_node);
    let mut branch_row = rows[0];
    let branch = init(&mut branch_row);
    assert!(branch.is_extension());
    assert_eq!(branch.key(), 6);
    assert_eq!(branch.parity(), Some(Parity::C16));
    assert_eq!(branch.0[IS_EXT_LONG_EVEN_C16_POS], 1);
    assert_eq!(&rows[17].0[..5], &[229, 131, 0, 3, 107]);
    assert_eq!(&rows[18].0[S_START..S_START + 4], &[0, 3, 6, 11]);
    // extension S and C, then branch S and C, then the leaves
    assert_eq!(storage.to_be_hashed.len(), 6);
}

#[test]
fn modified_extension_split_after_one_nibble() {
    let mut state = storage_state(&EXTENSION_BASE);
    // key 0175.. leaves the extension after its first nibble
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0xb), U256::from(4)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 28);
    assert_branch_block(&rows, 0);
    assert_storage_tail(&rows, 19);
    assert_eq!(
        row_types(&rows[25..]),
        vec![
            RowType::ModifiedExtensionNodeSelectors,
            RowType::ModifiedExtensionNodeBefore,
            RowType::ModifiedExtensionNodeAfter,
        ]
    );

    let mut branch_row = rows[0];
    let branch = init(&mut branch_row);
    assert_eq!(branch.0[IS_MODIFIED_EXT_NODE_POS], 1);
    assert!(branch.is_placeholder(Side::S));
    assert!(branch.is_extension());
    assert_eq!(branch.key(), 1);
    assert_eq!(branch.0[DRIFTED_POS], 3);
    assert_eq!(branch.parity(), Some(Parity::C1));
    assert_eq!(branch.0[IS_EXT_SHORT_C1_POS], 1);

    // only the C leaf is real
    assert!(rows[20].bytes().iter().all(|&b| b == 0));
    assert_eq!(rows[22][0], 4);
    assert!(rows[23].bytes().iter().all(|&b| b == 0));

    let selectors = &rows[25];
    assert_eq!(selectors[BRANCH_0_KEY_POS], 3);
    assert_eq!(selectors[IS_EXT_LONG_EVEN_C16_POS], 1);
    assert_eq!(&rows[26].0[..5], &[229, 131, 0, 3, 107]);
    assert_eq!(&rows[27].0[..4], &[228, 130, 0, 107]);
    assert_eq!(rows[26].0[C_START..C_START + 32], rows[27].0[C_START..C_START + 32]);
}

#[test]
fn modified_extension_split_at_first_nibble() {
    let mut state = storage_state(&EXTENSION_BASE);
    // key 4057.. leaves the extension right away
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x2), U256::from(4)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 28);
    let mut branch_row = rows[0];
    let branch = init(&mut branch_row);
    assert!(!branch.is_extension());
    assert_eq!(branch.0[IS_MODIFIED_EXT_NODE_POS], 1);
    assert_eq!(branch.key(), 4);
    assert_eq!(branch.0[DRIFTED_POS], 0);
    assert_eq!(branch.parity(), Some(Parity::C16));
    assert!(rows[17..19].iter().all(|row| row.bytes().iter().all(|&b| b == 0)));

    assert_eq!(rows[25][BRANCH_0_KEY_POS], 0);
    assert_eq!(rows[25][IS_EXT_LONG_EVEN_C16_POS], 1);
    assert_eq!(&rows[27].0[..4], &[228, 130, 19, 107]);
}

#[test]
fn modified_extension_leaves_single_nibble() {
    let mut state = storage_state(&EXTENSION_BASE);
    // key 035f.. shares 03 with the extension
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x3f4), U256::from(4)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 28);
    let mut branch_row = rows[0];
    let branch = init(&mut branch_row);
    assert!(branch.is_extension());
    assert_eq!(branch.key(), 5);
    assert_eq!(branch.0[DRIFTED_POS], 6);
    assert_eq!(branch.parity(), Some(Parity::C16));
    assert_eq!(branch.0[IS_EXT_LONG_EVEN_C16_POS], 1);
    assert_eq!(&rows[18].0[S_START..S_START + 2], &[0, 3]);

    assert_eq!(rows[25][BRANCH_0_KEY_POS], 6);
    assert_eq!(&rows[27].0[..2], &[226, 0x1b]);
}

#[test]
fn modified_extension_reverted() {
    let mut state = storage_state(&EXTENSION_BASE);
    let mut generator = WitnessGenerator::new(&mut state);
    let insert = TrieModification::storage_changed(*MAIN_ADDRESS, slot(0xb), U256::from(4));
    let inserted = generator.handle_modification(&insert).unwrap();
    let delete = TrieModification::storage_changed(*MAIN_ADDRESS, slot(0xb), U256::zero());
    let deleted = generator.handle_modification(&delete).unwrap();

    let (rows_insert, rows_delete) = (storage_rows(&inserted), storage_rows(&deleted));
    assert_eq!(rows_delete.len(), 28);
    let mut branch_row = rows_delete[0];
    let branch = init(&mut branch_row);
    assert!(branch.is_placeholder(Side::C));
    assert_eq!(branch.0[IS_MODIFIED_EXT_NODE_POS], 1);
    // same extension rows either way
    assert_eq!(rows_insert[25..], rows_delete[25..]);
}

#[test]
fn storage_non_existing_below_branch() {
    let mut state = storage_state(&BASE);
    let witness = witness(
        &mut state,
        TrieModification::storage_does_not_exist(*MAIN_ADDRESS, slot(0x2)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 25);
    assert_eq!(init(&mut rows[0].clone()).key(), 4);
    assert!(rows[1..17].iter().all(WitnessRow::halves_equal));
    assert_eq!(&rows[19].0[..4], &[228, 130, 51, 0]);
    assert_eq!(&rows[24].0[..5], &[0, 160, 48, 87, 135]);
    // only the branch is hashed, twice
    assert_eq!(witness.storage.as_ref().unwrap().to_be_hashed.len(), 2);
}

#[test]
fn storage_non_existing_wrong_leaf() {
    let mut state = storage_state(&[(0x11, 1), (0x12, 2)]);
    let witness = witness(
        &mut state,
        TrieModification::storage_does_not_exist(*MAIN_ADDRESS, slot(0x21)),
    );
    let rows = storage_rows(&witness);

    assert_eq!(rows.len(), 25);
    assert_eq!(&rows[21].0[..6], &[226, 160, 49, 236, 194, 26]);
    assert_eq!(rows[22][0], 1);
    assert_eq!(&rows[24].0[..6], &[1, 160, 58, 99, 87, 1]);
    assert_eq!(rows[24].row_type().unwrap(), RowType::NonExistingStorage);
}

#[test]
fn first_slot_of_new_account() {
    init_logger();
    let mut state = MemoryState::default();
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x12), U256::from(1)),
    );

    let rows = storage_rows(&witness);
    assert_eq!(rows.len(), STORAGE_LEAF_ROWS_NUM);
    assert_storage_tail(&rows, 0);
    assert_eq!(&rows[2].0[..3], &[227, 161, 32]);
    assert_eq!(witness.storage.as_ref().unwrap().to_be_hashed.len(), 1);

    assert_eq!(witness.account.rows.len(), ACCOUNT_LEAF_ROWS_NUM);
    assert_eq!(&witness.account.rows[1].0[..4], &[248, 106, 161, 32]);
}

// Accounts 7b.., e9.., ab.. and 92.. in a root branch.
fn account_state() -> MemoryState {
    init_logger();
    let mut state = MemoryState::default();
    let addresses = [
        *MAIN_ADDRESS,
        Address::repeat_byte(1),
        Address::repeat_byte(2),
        Address::repeat_byte(3),
    ];
    for address in addresses {
        state.set_balance(address, U256::one());
    }
    state.intermediate_root();
    state
}

fn assert_account_tail(rows: &[WitnessRow], from: usize) {
    assert_eq!(
        row_types(&rows[from..from + ACCOUNT_LEAF_ROWS_NUM]),
        vec![
            RowType::AccountLeafKeyS,
            RowType::AccountLeafKeyC,
            RowType::AccountNonExisting,
            RowType::AccountLeafNonceBalanceS,
            RowType::AccountLeafNonceBalanceC,
            RowType::AccountLeafRootCodehashS,
            RowType::AccountLeafRootCodehashC,
            RowType::AccountLeafNeighbouringLeaf,
        ]
    );
}

#[test]
fn account_nonce_update() {
    let mut state = account_state();
    let witness = witness(
        &mut state,
        TrieModification::nonce_changed(*MAIN_ADDRESS, U256::from(5)),
    );
    let rows = &witness.account.rows;

    assert!(witness.storage.is_none());
    assert_eq!(rows.len(), 27);
    assert_branch_block(rows, 0);
    assert_account_tail(rows, 19);
    assert_eq!(init(&mut rows[0].clone()).key(), 7);

    // balance 1, nonce 0 before and 5 after
    assert_eq!(&rows[22].0[..3], &[184, 70, 128]);
    assert_eq!(&rows[22].0[C_RLP_START..C_RLP_START + 3], &[248, 68, 1]);
    assert_eq!(&rows[23].0[..3], &[184, 70, 5]);
    assert_eq!(&rows[21].0[..4], &[0, 0, 0, 0x3b]);
    assert_eq!(&rows[25].0[C_START..WITNESS_ROW_WIDTH], EMPTY_CODE_HASH.as_bytes());
    assert_eq!(rows[24].0[..C_RLP_START], rows[25].0[..C_RLP_START]);
}

#[test]
fn account_code_hash_update() {
    let mut state = account_state();
    let code_hash = hash_data(&[0x60, 0x00]);
    let witness = witness(
        &mut state,
        TrieModification::code_hash_changed(Address::repeat_byte(2), code_hash),
    );
    let rows = &witness.account.rows;

    assert_eq!(rows[25][C_RLP_START + 1], 160);
    assert_eq!(&rows[25].0[C_START..WITNESS_ROW_WIDTH], code_hash.as_bytes());
    assert_eq!(&rows[24].0[C_START..WITNESS_ROW_WIDTH], EMPTY_CODE_HASH.as_bytes());
}

#[test]
fn account_storage_root_follows_storage() {
    let mut state = account_state();
    let witness = witness(
        &mut state,
        TrieModification::storage_changed(*MAIN_ADDRESS, slot(0x12), U256::from(1)),
    );
    let rows = &witness.account.rows;
    assert_ne!(rows[24].0[S_START..C_RLP_START], rows[25].0[S_START..C_RLP_START]);
    let storage_root = H256::from_slice(&rows[25].0[S_START..C_RLP_START]);
    let leaf = &witness.storage.as_ref().unwrap().to_be_hashed[0];
    assert_eq!(hash_data(&leaf.0), storage_root);
}

#[test]
fn account_does_not_exist_below_branch() {
    let mut state = account_state();
    // 0961.., nothing at nibble 0
    let witness = witness(
        &mut state,
        TrieModification::account_does_not_exist(Address::repeat_byte(4)),
    );
    let rows = &witness.account.rows;

    assert_eq!(rows.len(), 27);
    assert_account_tail(rows, 19);
    assert_eq!(init(&mut rows[0].clone()).key(), 0);
    assert_eq!(&rows[19].0[..6], &[248, 0, 160, 57, 97, 114]);
    assert_eq!(rows[19].bytes(), rows[20].bytes());
    assert_eq!(&rows[21].0[..6], &[0, 0, 0, 57, 97, 114]);
    assert!(rows[26].bytes().iter().all(|&b| b == 0));
    assert_eq!(witness.account.to_be_hashed.len(), 2);
}

#[test]
fn account_does_not_exist_wrong_leaf() {
    let mut state = account_state();
    // 9267.. meets the leaf of 92c2..
    let witness = witness(
        &mut state,
        TrieModification::account_does_not_exist(Address::repeat_byte(9)),
    );
    let rows = &witness.account.rows;

    assert_eq!(rows.len(), 27);
    assert_eq!(&rows[21].0[..6], &[1, 0, 160, 50, 103, 75]);
    assert_eq!(rows[19].bytes(), rows[20].bytes());
}

#[test]
fn new_account_below_extension() {
    let mut state = account_state();
    // 9267.. shares 92 with an existing account
    let witness = witness(
        &mut state,
        TrieModification::balance_changed(Address::repeat_byte(9), U256::from(10)),
    );
    let rows = &witness.account.rows;

    assert_eq!(rows.len(), 46);
    assert_eq!(branch_inits(rows), vec![0, 19]);
    let mut placeholder_row = rows[19];
    let placeholder = init(&mut placeholder_row);
    assert!(placeholder.is_extension());
    assert!(placeholder.is_placeholder(Side::S));
    assert_eq!(placeholder.key(), 6);
    assert_eq!(placeholder.0[DRIFTED_POS], 12);
    assert_eq!(placeholder.parity(), Some(Parity::C16));
    assert_eq!(placeholder.0[IS_EXT_SHORT_C16_POS], 1);
    assert_account_tail(rows, 38);
    assert_eq!(rows[45].row_type().unwrap(), RowType::AccountLeafNeighbouringLeaf);
    assert_ne!(rows[45][0], 0);
}

#[test]
fn new_account_in_branch() {
    let mut state = account_state();
    // 685e.., nothing at nibble 6
    let witness = witness(
        &mut state,
        TrieModification::balance_changed(Address::repeat_byte(5), U256::from(10)),
    );
    let rows = &witness.account.rows;
    assert_eq!(rows.len(), 27);
    assert_eq!(init(&mut rows[0].clone()).key(), 6);
    assert_eq!(rows[19].bytes(), rows[20].bytes());
    assert_eq!(witness.account.to_be_hashed.len(), 3);
}

#[test]
fn every_root_is_hashed() {
    let mut state = storage_state(&BASE);
    let mut rng = rng();
    let mut generator = WitnessGenerator::new(&mut state);
    let mut present = std::collections::HashSet::new();
    let mut old_root = generator.state().root();
    for _ in 0..40 {
        let key = rng.gen_range(64..128u64);
        let mut value = rng.gen_range(0..3u64);
        // deleting a missing slot changes nothing
        if value == 0 && !present.contains(&key) {
            value = 1;
        }
        if value == 0 {
            present.remove(&key);
        } else {
            present.insert(key);
        }

        let storage_s = generator
            .state()
            .get_storage_proof(*MAIN_ADDRESS, slot(key))
            .unwrap();
        let witness = generator
            .handle_modification(&TrieModification::storage_changed(
                *MAIN_ADDRESS,
                slot(key),
                U256::from(value),
            ))
            .unwrap();
        let storage_c = generator
            .state()
            .get_storage_proof(*MAIN_ADDRESS, slot(key))
            .unwrap();

        let new_root = generator.state().root();
        let hashes = |hashed: &[crate::HexBytes]| -> Vec<H256> {
            hashed.iter().map(|node| hash_data(&node.0)).collect()
        };
        let account_hashes = hashes(&witness.account.to_be_hashed);
        assert!(account_hashes.contains(&old_root));
        assert!(account_hashes.contains(&new_root));

        let storage_hashes = hashes(&witness.storage.as_ref().unwrap().to_be_hashed);
        assert!(storage_hashes.contains(&hash_data(&storage_s.nodes[0])));
        assert!(storage_hashes.contains(&hash_data(&storage_c.nodes[0])));
        old_root = new_root;
    }
}

#[test]
fn classified_tail_cases() {
    // proofs of the modifications above in terms of their tail cases
    let mut state = storage_state(&BASE);
    let s = state.get_storage_proof(*MAIN_ADDRESS, slot(0x11)).unwrap();
    state.set_state(*MAIN_ADDRESS, slot(0x11), U256::one());
    state.intermediate_root();
    let c = state.get_storage_proof(*MAIN_ADDRESS, slot(0x11)).unwrap();
    assert_eq!(
        TailCase::classify(&s.nodes, &c.nodes, true).unwrap(),
        TailCase::BranchSplit
    );
    assert_eq!(
        TailCase::classify(&s.nodes, &s.nodes, false).unwrap(),
        TailCase::Update
    );
}

fn proof_pair(s: crate::TrieProof, c: crate::TrieProof) -> ProofPair {
    ProofPair {
        proof_s: s.nodes,
        proof_c: c.nodes,
        ext_nibbles_s: s.ext_nibbles,
        ext_nibbles_c: c.ext_nibbles,
    }
}

#[test]
fn branch_children_differ_off_the_path() {
    let mut state = storage_state(&BASE);
    let s = state.get_storage_proof(*MAIN_ADDRESS, slot(0x21)).unwrap();
    // 0x12 sits at nibble b of the root branch, off the path of 0x21
    state.set_state(*MAIN_ADDRESS, slot(0x21), U256::from(3));
    state.set_state(*MAIN_ADDRESS, slot(0x12), U256::from(4));
    state.intermediate_root();
    let c = state.get_storage_proof(*MAIN_ADDRESS, slot(0x21)).unwrap();
    let proofs = proof_pair(s, c);
    assert_eq!(
        TailCase::classify(&proofs.proof_s, &proofs.proof_c, false).unwrap(),
        TailCase::Update
    );

    let key = storage_key(&slot(0x21));
    assert!(matches!(
        prepare_witness(&state, *MAIN_ADDRESS, &proofs, &key, None, WitnessOptions::default()),
        Err(WitnessError::ProofPairMismatch { depth: 0 })
    ));
}

#[test]
fn equal_inputs_give_equal_witnesses() {
    let mut state = storage_state(&BASE);
    let s = state.get_storage_proof(*MAIN_ADDRESS, slot(0x11)).unwrap();
    state.set_state(*MAIN_ADDRESS, slot(0x11), U256::from(5));
    state.intermediate_root();
    let c = state.get_storage_proof(*MAIN_ADDRESS, slot(0x11)).unwrap();
    let options = WitnessOptions {
        is_shorter_proof_last_leaf: true,
        ..Default::default()
    };

    let proofs = proof_pair(s, c);
    let first = prepare_witness(
        &state,
        *MAIN_ADDRESS,
        &proofs,
        &storage_key(&slot(0x11)),
        None,
        options,
    )
    .unwrap();
    let again = prepare_witness(
        &state,
        *MAIN_ADDRESS,
        &proofs.clone(),
        &storage_key(&slot(0x11)),
        None,
        options,
    )
    .unwrap();
    assert!(!first.rows.is_empty());
    assert_eq!(first.rows, again.rows);
    assert_eq!(first.to_be_hashed, again.to_be_hashed);
    assert_eq!(first.saw_extension_node, again.saw_extension_node);
}

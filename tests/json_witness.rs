use ethers_core::types::{Address, H256, U256};
use mpt_witness::{
    get_witness, param::ROW_LEN, HexBytes, MemoryState, RowType, TrieModification, TrieState,
    WitnessError, WitnessGenerator, WitnessRow,
};
use serde_json::Value;

const ADDRESS: &str = "0x50efbf12580138bc263c95757826df4e24eb81c9";

const MODIFICATIONS: &str = r#"[{
    "Type": "StorageChanged",
    "Address": "0x50efbf12580138bc263c95757826df4e24eb81c9",
    "Key": "0x0000000000000000000000000000000000000000000000000000000000000021",
    "Value": "0x11"
}, {
    "Type": "BalanceChanged",
    "Address": "0x50efbf12580138bc263c95757826df4e24eb81c9",
    "Balance": "0x3e8"
}, {
    "Type": "AccountDoesNotExist",
    "Address": "0x0404040404040404040404040404040404040404"
}]"#;

fn state() -> MemoryState {
    let _ = env_logger::builder().is_test(true).try_init();
    let address: Address = ADDRESS.parse().unwrap();
    let mut state = MemoryState::default();
    state.set_state(address, H256::from_low_u64_be(0x12), U256::from(1));
    state.set_state(address, H256::from_low_u64_be(0x21), U256::from(2));
    state.set_balance(Address::repeat_byte(1), U256::one());
    state
}

fn row_type(row: &Value) -> RowType {
    let bytes = HexBytes::try_from(row.as_str().unwrap()).unwrap();
    let mut row = [0u8; ROW_LEN];
    row.copy_from_slice(bytes.as_ref());
    WitnessRow(row).row_type().unwrap()
}

#[test]
fn witness_json_shape() {
    let json = get_witness(&mut state(), MODIFICATIONS).unwrap();
    let witnesses: Vec<Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(witnesses.len(), 3);

    let storage = &witnesses[0];
    assert_eq!(storage["proof_type"], "StorageChanged");
    let rows = storage["storage"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 25);
    assert!(rows.iter().all(|row| row.as_str().unwrap().len() == 138));
    assert_eq!(row_type(&rows[0]), RowType::InitBranch);
    assert_eq!(row_type(&rows[24]), RowType::NonExistingStorage);
    for hashed in storage["storage"]["to_be_hashed"].as_array().unwrap() {
        assert!(hashed.as_str().unwrap().starts_with("0x"));
    }

    let balance = &witnesses[1];
    assert_eq!(balance["proof_type"], "BalanceChanged");
    assert!(balance["storage"].is_null());
    let account_rows = balance["account"]["rows"].as_array().unwrap();
    assert_eq!(
        row_type(account_rows.last().unwrap()),
        RowType::AccountLeafNeighbouringLeaf
    );

    let missing = &witnesses[2];
    assert_eq!(missing["proof_type"], "AccountDoesNotExist");
    assert_eq!(missing["account"]["saw_extension_node"], false);
}

#[test]
fn json_matches_generator() {
    let modifications: Vec<TrieModification> = serde_json::from_str(MODIFICATIONS).unwrap();
    let mut direct_state = state();
    let direct = WitnessGenerator::new(&mut direct_state)
        .handle_modifications(&modifications)
        .unwrap();

    let json = get_witness(&mut state(), MODIFICATIONS).unwrap();
    assert_eq!(json, serde_json::to_string(&direct).unwrap());
}

#[test]
fn rejects_malformed_request() {
    let err = get_witness(&mut state(), r#"[{"Type": "Unknown"}]"#).unwrap_err();
    assert!(matches!(err, WitnessError::Json(_)), "{}", err);
}

#[test]
fn state_is_left_modified() {
    let mut state = state();
    let before = state.intermediate_root();
    get_witness(&mut state, MODIFICATIONS).unwrap();
    assert_ne!(state.root(), before);
    assert_eq!(state.get_proof(Address::repeat_byte(4)).unwrap().nodes.len(), 1);
}

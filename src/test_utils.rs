use crate::{
    generator::{ProofWitness, TrieModification, WitnessGenerator},
    row::{RowType, WitnessRow},
    state::{MemoryState, TrieState},
};
use ethers_core::types::{Address, H256, U256};
use lazy_static::lazy_static;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

lazy_static! {
    pub static ref MAIN_ADDRESS: Address = "0x50efbf12580138bc263c95757826df4e24eb81c9"
        .parse()
        .unwrap();
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng() -> ChaCha8Rng {
    ChaCha8Rng::from_seed([101u8; 32])
}

pub fn slot(key: u64) -> H256 {
    H256::from_low_u64_be(key)
}

/// State holding the given storage slots of the main address.
pub fn storage_state(slots: &[(u64, u64)]) -> MemoryState {
    init_logger();
    let mut state = MemoryState::default();
    for &(key, value) in slots {
        state.set_state(*MAIN_ADDRESS, slot(key), U256::from(value));
    }
    state.intermediate_root();
    state
}

/// Witnesses of `modification` applied to `state`.
pub fn witness(state: &mut MemoryState, modification: TrieModification) -> ProofWitness {
    WitnessGenerator::new(state)
        .handle_modification(&modification)
        .unwrap()
}

pub fn storage_rows(witness: &ProofWitness) -> Vec<WitnessRow> {
    witness.storage.as_ref().unwrap().rows.clone()
}

pub fn row_types(rows: &[WitnessRow]) -> Vec<RowType> {
    rows.iter().map(|row| row.row_type().unwrap()).collect()
}

/// Indices of the init rows of all branch blocks.
pub fn branch_inits(rows: &[WitnessRow]) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.row_type().unwrap() == RowType::InitBranch)
        .map(|(i, _)| i)
        .collect()
}

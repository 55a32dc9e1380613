//! Drives a [`TrieState`] through a list of modifications and witnesses each one.
use crate::{
    error::Result,
    state::{TrieProof, TrieState},
    util::{account_key, is_shorter_proof_last_leaf, storage_key},
    witness::{prepare_witness, ProofPair, Witness, WitnessOptions},
};
use ethers_core::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// The state change a witness proves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, EnumIter)]
pub enum ProofType {
    /// nonce of an account changed
    NonceChanged,
    /// balance of an account changed
    BalanceChanged,
    /// code hash of an account changed
    CodeHashChanged,
    /// the account is not in the trie
    AccountDoesNotExist,
    /// a storage slot changed
    StorageChanged,
    /// the storage slot is not in the trie
    StorageDoesNotExist,
}

impl ProofType {
    /// Whether the modification needs a storage proof next to the account proof.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageChanged | Self::StorageDoesNotExist)
    }
}

/// One requested modification, in the field naming of the witness request format.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrieModification {
    /// kind of modification
    #[serde(rename = "Type")]
    pub proof_type: ProofType,
    /// account to modify
    pub address: Address,
    /// storage slot
    #[serde(default)]
    pub key: H256,
    /// new storage value
    #[serde(default)]
    pub value: U256,
    /// new nonce
    #[serde(default)]
    pub nonce: U256,
    /// new balance
    #[serde(default)]
    pub balance: U256,
    /// new code hash
    #[serde(default)]
    pub code_hash: H256,
}

impl TrieModification {
    fn new(proof_type: ProofType, address: Address) -> Self {
        Self {
            proof_type,
            address,
            key: H256::zero(),
            value: U256::zero(),
            nonce: U256::zero(),
            balance: U256::zero(),
            code_hash: H256::zero(),
        }
    }

    /// Sets storage slot `key` of `address` to `value`.
    pub fn storage_changed(address: Address, key: H256, value: U256) -> Self {
        Self {
            key,
            value,
            ..Self::new(ProofType::StorageChanged, address)
        }
    }

    /// Proves that storage slot `key` of `address` is not set.
    pub fn storage_does_not_exist(address: Address, key: H256) -> Self {
        Self {
            key,
            ..Self::new(ProofType::StorageDoesNotExist, address)
        }
    }

    /// Sets the nonce of `address`.
    pub fn nonce_changed(address: Address, nonce: U256) -> Self {
        Self {
            nonce,
            ..Self::new(ProofType::NonceChanged, address)
        }
    }

    /// Sets the balance of `address`.
    pub fn balance_changed(address: Address, balance: U256) -> Self {
        Self {
            balance,
            ..Self::new(ProofType::BalanceChanged, address)
        }
    }

    /// Sets the code hash of `address`.
    pub fn code_hash_changed(address: Address, code_hash: H256) -> Self {
        Self {
            code_hash,
            ..Self::new(ProofType::CodeHashChanged, address)
        }
    }

    /// Proves that `address` is not in the account trie.
    pub fn account_does_not_exist(address: Address) -> Self {
        Self::new(ProofType::AccountDoesNotExist, address)
    }
}

/// Witnesses of one modification: always the account proof, and the storage proof for
/// storage modifications.
#[derive(Clone, Debug, Serialize)]
pub struct ProofWitness {
    /// what was proved
    pub proof_type: ProofType,
    /// account trie witness
    pub account: Witness,
    /// storage trie witness
    pub storage: Option<Witness>,
}

/// Applies modifications to a trie state, taking proofs before and after each.
pub struct WitnessGenerator<'a, S: ?Sized> {
    state: &'a mut S,
}

impl<'a, S: TrieState + ?Sized> WitnessGenerator<'a, S> {
    /// Commits anything pending in `state`, so the first S proofs see it.
    pub fn new(state: &'a mut S) -> Self {
        state.intermediate_root();
        Self { state }
    }

    /// The state in its current form.
    pub fn state(&self) -> &S {
        &*self.state
    }

    /// Applies `modification` and returns its witnesses.
    pub fn handle_modification(&mut self, modification: &TrieModification) -> Result<ProofWitness> {
        let TrieModification {
            proof_type,
            address,
            key,
            ..
        } = *modification;
        let slot = proof_type.is_storage().then_some(key);

        let account_s = self.state.get_proof(address)?;
        let storage_s = slot
            .map(|key| self.state.get_storage_proof(address, key))
            .transpose()?;

        match proof_type {
            ProofType::NonceChanged => self.state.set_nonce(address, modification.nonce),
            ProofType::BalanceChanged => self.state.set_balance(address, modification.balance),
            ProofType::CodeHashChanged => {
                self.state.set_code_hash(address, modification.code_hash)
            }
            ProofType::StorageChanged => self.state.set_state(address, key, modification.value),
            ProofType::AccountDoesNotExist | ProofType::StorageDoesNotExist => {}
        }
        let root = self.state.intermediate_root();

        let account_c = self.state.get_proof(address)?;
        let account = self.witness(
            address,
            account_s,
            account_c,
            &account_key(&address),
            WitnessOptions {
                is_account_proof: true,
                non_existing_account_proof: proof_type == ProofType::AccountDoesNotExist,
                ..Default::default()
            },
        )?;

        let storage = match (slot, storage_s) {
            (Some(key), Some(storage_s)) => {
                let storage_c = self.state.get_storage_proof(address, key)?;
                Some(self.witness(
                    address,
                    storage_s,
                    storage_c,
                    &storage_key(&key),
                    WitnessOptions {
                        non_existing_storage_proof: proof_type == ProofType::StorageDoesNotExist,
                        ..Default::default()
                    },
                )?)
            }
            _ => None,
        };
        log::debug!(
            "{:?} of {:?}: {} account rows, {} storage rows, root {:?}",
            proof_type,
            address,
            account.rows.len(),
            storage.as_ref().map_or(0, |storage| storage.rows.len()),
            root
        );

        Ok(ProofWitness {
            proof_type,
            account,
            storage,
        })
    }

    /// Applies all modifications in order.
    pub fn handle_modifications(
        &mut self,
        modifications: &[TrieModification],
    ) -> Result<Vec<ProofWitness>> {
        modifications
            .iter()
            .map(|modification| self.handle_modification(modification))
            .collect()
    }

    fn witness(
        &self,
        address: Address,
        proof_s: TrieProof,
        proof_c: TrieProof,
        key: &[u8],
        mut options: WitnessOptions,
    ) -> Result<Witness> {
        options.is_shorter_proof_last_leaf =
            is_shorter_proof_last_leaf(&proof_s.nodes, &proof_c.nodes);
        let proofs = ProofPair {
            proof_s: proof_s.nodes,
            proof_c: proof_c.nodes,
            ext_nibbles_s: proof_s.ext_nibbles,
            ext_nibbles_c: proof_c.ext_nibbles,
        };
        prepare_witness(&*self.state, address, &proofs, key, None, options)
    }
}

/// Applies the JSON list of modifications in `modifications` to `state` and returns the
/// witnesses as JSON.
pub fn get_witness<S: TrieState + ?Sized>(state: &mut S, modifications: &str) -> Result<String> {
    let modifications: Vec<TrieModification> = serde_json::from_str(modifications)?;
    let witnesses = WitnessGenerator::new(state).handle_modifications(&modifications)?;
    Ok(serde_json::to_string(&witnesses)?)
}

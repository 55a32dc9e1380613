//! Trie state the witness generator takes its proofs from.
mod trie;

use crate::{
    error::Result,
    node::{hash_data, key_nibbles},
};
use ethers_core::{
    types::{Address, H256, U256},
    utils::rlp::RlpStream,
};
use lazy_static::lazy_static;
use std::collections::{BTreeMap, HashMap};
use trie::Trie;

lazy_static! {
    /// Root of the empty trie, keccak of the rlp empty string.
    pub static ref EMPTY_ROOT: H256 = hash_data(&[0x80]);
    /// Code hash of an account without code.
    pub static ref EMPTY_CODE_HASH: H256 = hash_data(&[]);
}

/// Read access to trie nodes by hash.
pub trait NodeDatabase {
    /// The rlp encoded node whose keccak hash is `hash`.
    fn node(&self, hash: &H256) -> Option<Vec<u8>>;
}

impl NodeDatabase for HashMap<H256, Vec<u8>> {
    fn node(&self, hash: &H256) -> Option<Vec<u8>> {
        self.get(hash).cloned()
    }
}

/// Proof of one key: the nodes from the root down, and the nibbles of the extension nodes
/// among them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrieProof {
    /// rlp encoded nodes, root first
    pub nodes: Vec<Vec<u8>>,
    /// key nibbles of every extension node in `nodes`
    pub ext_nibbles: Vec<Vec<u8>>,
}

/// Account and storage tries that can be modified and proved.
///
/// Proofs are taken against the last committed state; modifications become visible to them
/// after [`TrieState::intermediate_root`].
pub trait TrieState: NodeDatabase {
    /// Proof of the account at `address` in the account trie.
    fn get_proof(&self, address: Address) -> Result<TrieProof>;
    /// Proof of `key` in the storage trie of `address`, empty if the account does not exist.
    fn get_storage_proof(&self, address: Address, key: H256) -> Result<TrieProof>;
    /// Sets a storage slot; zero removes it.
    fn set_state(&mut self, address: Address, key: H256, value: U256);
    /// Sets the nonce of an account, creating it if needed.
    fn set_nonce(&mut self, address: Address, nonce: U256);
    /// Sets the balance of an account, creating it if needed.
    fn set_balance(&mut self, address: Address, balance: U256);
    /// Sets the code hash of an account, creating it if needed.
    fn set_code_hash(&mut self, address: Address, code_hash: H256);
    /// Commits pending modifications and returns the account trie root.
    fn intermediate_root(&mut self) -> H256;
}

#[derive(Clone, Debug)]
struct Account {
    nonce: U256,
    balance: U256,
    code_hash: H256,
    storage: BTreeMap<H256, U256>,
    storage_trie: Trie,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: U256::zero(),
            balance: U256::zero(),
            code_hash: *EMPTY_CODE_HASH,
            storage: BTreeMap::new(),
            storage_trie: Trie::default(),
        }
    }
}

impl Account {
    fn rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.nonce);
        stream.append(&self.balance);
        stream.append(&self.storage_trie.root_hash());
        stream.append(&self.code_hash);
        stream.out().to_vec()
    }
}

/// In-memory [`TrieState`]. Every commit rebuilds the tries of the modified accounts; the node
/// map only grows, so nodes of earlier roots stay resolvable.
#[derive(Clone, Debug, Default)]
pub struct MemoryState {
    accounts: BTreeMap<Address, Account>,
    account_trie: Trie,
    nodes: HashMap<H256, Vec<u8>>,
    dirty: bool,
}

impl MemoryState {
    /// Root of the last committed account trie.
    pub fn root(&self) -> H256 {
        self.account_trie.root_hash()
    }

    /// Number of nodes recorded so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        self.dirty = true;
        self.accounts.entry(address).or_default()
    }

    fn commit_storage(account: &mut Account, nodes: &mut HashMap<H256, Vec<u8>>) {
        let mut entries: Vec<_> = account
            .storage
            .iter()
            .map(|(key, value)| {
                let mut stream = RlpStream::new();
                stream.append(value);
                (key_nibbles(&hash_data(key.as_bytes())), stream.out().to_vec())
            })
            .collect();
        entries.sort();
        account.storage_trie = Trie::build(&entries, nodes);
    }
}

impl NodeDatabase for MemoryState {
    fn node(&self, hash: &H256) -> Option<Vec<u8>> {
        self.nodes.node(hash)
    }
}

impl TrieState for MemoryState {
    fn get_proof(&self, address: Address) -> Result<TrieProof> {
        Ok(self
            .account_trie
            .prove(&key_nibbles(&hash_data(address.as_bytes()))))
    }

    fn get_storage_proof(&self, address: Address, key: H256) -> Result<TrieProof> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| {
                account
                    .storage_trie
                    .prove(&key_nibbles(&hash_data(key.as_bytes())))
            })
            .unwrap_or_default())
    }

    fn set_state(&mut self, address: Address, key: H256, value: U256) {
        let account = self.account_mut(address);
        if value.is_zero() {
            account.storage.remove(&key);
        } else {
            account.storage.insert(key, value);
        }
    }

    fn set_nonce(&mut self, address: Address, nonce: U256) {
        self.account_mut(address).nonce = nonce;
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    fn set_code_hash(&mut self, address: Address, code_hash: H256) {
        self.account_mut(address).code_hash = code_hash;
    }

    fn intermediate_root(&mut self) -> H256 {
        if self.dirty {
            let nodes = &mut self.nodes;
            for account in self.accounts.values_mut() {
                Self::commit_storage(account, nodes);
            }
            let mut entries: Vec<_> = self
                .accounts
                .iter()
                .map(|(address, account)| {
                    (key_nibbles(&hash_data(address.as_bytes())), account.rlp())
                })
                .collect();
            entries.sort();
            self.account_trie = Trie::build(&entries, nodes);
            self.dirty = false;
            log::trace!(
                "committed {} accounts, root {:?}",
                self.accounts.len(),
                self.account_trie.root_hash()
            );
        }
        self.root()
    }
}

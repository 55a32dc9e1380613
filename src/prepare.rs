//! Row blocks for the individual proof elements. Each preparer lays out one node (or a
//! placeholder standing in for it) and returns the blobs the circuit has to hash.
mod branch;
mod extension;
mod leaf;

pub use branch::{prepare_parallel_branches, prepare_two_branches};
pub use extension::{prepare_empty_extension_rows, prepare_extension_row, prepare_extension_rows};
pub use leaf::{
    prepare_account_leaf, prepare_drifted_leaf, prepare_drifted_leaf_placeholder,
    prepare_empty_non_existing_storage_row, prepare_non_existing_storage_row,
    prepare_storage_leaf_rows, set_remaining_key,
};

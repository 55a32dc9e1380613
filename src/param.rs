//! Byte offsets of the witness row layout. The circuit reads rows positionally, so
//! none of these may change independently of it.

/// Width of a hash (and of one side of a row).
pub const HASH_WIDTH: usize = 32;
/// Bytes reserved in front of each side for an RLP prefix.
pub const RLP_NUM: usize = 2;
/// Number of content bytes in a row: `[S_RLP 2][S 32][C_RLP 2][C 32]`.
pub const WITNESS_ROW_WIDTH: usize = 2 * (RLP_NUM + HASH_WIDTH);
/// Content bytes plus the trailing row type byte.
pub const ROW_LEN: usize = WITNESS_ROW_WIDTH + 1;

/// Length of the RLP header area of a branch child slot.
pub const BRANCH_NODE_RLP_LEN: usize = RLP_NUM;
/// Offset of the C half of a branch child row.
pub const BRANCH_2_START: usize = RLP_NUM + HASH_WIDTH;

/// RLP prefix of the S half of a row.
pub const S_RLP_START: usize = 0;
/// First content byte of the S half.
pub const S_START: usize = RLP_NUM;
/// RLP prefix of the C half of a row.
pub const C_RLP_START: usize = RLP_NUM + HASH_WIDTH;
/// First content byte of the C half.
pub const C_START: usize = C_RLP_START + RLP_NUM;

// Branch init row.
/// RLP list header of the S branch in the init row.
pub const BRANCH_0_S_START: usize = 4;
/// RLP list header of the C branch in the init row.
pub const BRANCH_0_C_START: usize = 7;
/// Active nibble of the branch.
pub const BRANCH_0_KEY_POS: usize = 10;
/// The S branch is a placeholder.
pub const IS_BRANCH_S_PLACEHOLDER_POS: usize = 11;
/// The C branch is a placeholder.
pub const IS_BRANCH_C_PLACEHOLDER_POS: usize = 12;
/// Nibble the drifted leaf sits at in a placeholder branch.
pub const DRIFTED_POS: usize = 13;
/// An extension node sits above the branch.
pub const IS_EXTENSION_POS: usize = 14;
/// The branch was inserted into or removed from an extension.
pub const IS_MODIFIED_EXT_NODE_POS: usize = 15;
/// The branch consumes a high nibble.
pub const IS_BRANCH_C16_POS: usize = 19;
/// The branch consumes a low nibble.
pub const IS_BRANCH_C1_POS: usize = 20;
/// One nibble extension, branch at C16.
pub const IS_EXT_SHORT_C16_POS: usize = 21;
/// One nibble extension, branch at C1.
pub const IS_EXT_SHORT_C1_POS: usize = 22;
/// Even extension of two or more nibbles, branch at C16.
pub const IS_EXT_LONG_EVEN_C16_POS: usize = 23;
/// Even extension of two or more nibbles, branch at C1.
pub const IS_EXT_LONG_EVEN_C1_POS: usize = 24;
/// Odd extension of three or more nibbles, branch at C16.
pub const IS_EXT_LONG_ODD_C16_POS: usize = 25;
/// Odd extension of three or more nibbles, branch at C1.
pub const IS_EXT_LONG_ODD_C1_POS: usize = 26;
/// The S extension node RLP is longer than 55 bytes.
pub const IS_S_EXT_LONGER_THAN_55_POS: usize = 27;
/// The C extension node RLP is longer than 55 bytes.
pub const IS_C_EXT_LONGER_THAN_55_POS: usize = 28;
/// The S branch is inlined in its parent.
pub const IS_BRANCH_S_NON_HASHED_POS: usize = 29;
/// The C branch is inlined in its parent.
pub const IS_BRANCH_C_NON_HASHED_POS: usize = 30;
/// The S extension node is inlined in its parent.
pub const IS_EXT_NODE_S_NON_HASHED_POS: usize = 31;
/// The C extension node is inlined in its parent.
pub const IS_EXT_NODE_C_NON_HASHED_POS: usize = 32;

/// Init row, 16 children and the two extension rows.
pub const BRANCH_ROWS_NUM: usize = 19;
/// Extension S and C rows closing a branch block.
pub const EXTENSION_ROWS_NUM: usize = 2;
/// S key, S value, C key, C value, drifted, non-existing.
pub const STORAGE_LEAF_ROWS_NUM: usize = 6;
/// Key S, key C, non-existing, nonce/balance S+C, storage/codehash S+C, drifted.
pub const ACCOUNT_LEAF_ROWS_NUM: usize = 8;
/// Selectors, before and after rows of a modified extension node.
pub const MODIFIED_EXT_NODE_ROWS_NUM: usize = 3;

/// Nibbles of a full (keccak) key, terminator excluded.
pub const KEY_NIBBLES_LEN: usize = 64;
/// Nibble marking the end of a leaf key in hex encoding.
pub const TERMINATOR: u8 = 16;

//! Witness rows and typed views over their flag bytes.

use crate::{
    error::{Result, WitnessError},
    param::*,
    parity::Parity,
};
use serde::{Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Kind of a witness row, stored in its last byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, Hash)]
#[repr(u8)]
pub enum RowType {
    /// first row of a branch block, carries the flags
    InitBranch = 0,
    /// one of the 16 children rows of a branch block
    BranchChild = 1,
    /// storage leaf key before the modification
    StorageLeafSKey = 2,
    /// storage leaf key after the modification
    StorageLeafCKey = 3,
    /// account leaf key after the modification
    AccountLeafKeyC = 4,
    /// account leaf key before the modification
    AccountLeafKeyS = 6,
    /// nonce and balance before the modification
    AccountLeafNonceBalanceS = 7,
    /// nonce and balance after the modification
    AccountLeafNonceBalanceC = 8,
    /// storage root and code hash before the modification
    AccountLeafRootCodehashS = 9,
    /// account leaf drifted into a new branch
    AccountLeafNeighbouringLeaf = 10,
    /// storage root and code hash after the modification
    AccountLeafRootCodehashC = 11,
    /// storage leaf value before the modification
    StorageLeafSValue = 13,
    /// storage leaf value after the modification
    StorageLeafCValue = 14,
    /// storage leaf drifted into a new branch
    NeighbouringStorageLeaf = 15,
    /// extension node before the modification
    ExtensionNodeS = 16,
    /// extension node after the modification
    ExtensionNodeC = 17,
    /// queried account key of a non-existing proof
    AccountNonExisting = 18,
    /// queried storage key of a non-existing proof
    NonExistingStorage = 19,
    /// flags of a modified extension node
    ModifiedExtensionNodeSelectors = 20,
    /// extension node replaced by a shorter one
    ModifiedExtensionNodeBefore = 21,
    /// the shortened extension node
    ModifiedExtensionNodeAfter = 22,
}

impl TryFrom<u8> for RowType {
    type Error = WitnessError;

    fn try_from(value: u8) -> Result<Self> {
        Self::iter()
            .find(|row_type| *row_type as u8 == value)
            .ok_or(WitnessError::UnknownRowType(value))
    }
}

/// One fixed width witness row.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WitnessRow(pub [u8; ROW_LEN]);

impl WitnessRow {
    /// A zero row of the given type.
    pub fn new(row_type: RowType) -> Self {
        let mut row = Self([0; ROW_LEN]);
        row.0[WITNESS_ROW_WIDTH] = row_type as u8;
        row
    }

    /// Type of the row.
    pub fn row_type(&self) -> Result<RowType> {
        RowType::try_from(self.0[WITNESS_ROW_WIDTH])
    }

    /// Content bytes, without the type byte.
    pub fn bytes(&self) -> &[u8] {
        &self.0[..WITNESS_ROW_WIDTH]
    }

    /// Copies `data` to `offset`, failing if it would leave the segment ending at `limit`.
    pub fn write(&mut self, offset: usize, data: &[u8], limit: usize) -> Result<()> {
        let end = offset + data.len();
        if end > limit.min(WITNESS_ROW_WIDTH) {
            return Err(WitnessError::RowOverflow {
                len: data.len(),
                max: limit.min(WITNESS_ROW_WIDTH).saturating_sub(offset),
            });
        }
        self.0[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Whether the S half of a branch child row equals its C half.
    pub fn halves_equal(&self) -> bool {
        let len = BRANCH_NODE_RLP_LEN + HASH_WIDTH;
        self.0[..len] == self.0[BRANCH_2_START..BRANCH_2_START + len]
    }
}

impl std::ops::Index<usize> for WitnessRow {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.0[index]
    }
}

impl std::ops::IndexMut<usize> for WitnessRow {
    fn index_mut(&mut self, index: usize) -> &mut u8 {
        &mut self.0[index]
    }
}

impl Debug for WitnessRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &self.0[..])
    }
}

impl Serialize for WitnessRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

/// Which side of the witness a node belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// before the modification
    S,
    /// after the modification
    C,
}

/// Partial key of an extension node, as the circuit distinguishes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionKind {
    /// a single nibble
    Short,
    /// an even number of nibbles
    LongEven,
    /// an odd number of nibbles, more than one
    LongOdd,
}

impl ExtensionKind {
    /// Classifies the extension by the byte length of its compact key and its odd flag.
    pub fn new(key_len: usize, is_odd: bool) -> Self {
        match (key_len, is_odd) {
            (1, _) => Self::Short,
            (_, false) => Self::LongEven,
            (_, true) => Self::LongOdd,
        }
    }

    /// Init row flag for this kind when the branch below sits at `parity`.
    pub fn flag_pos(&self, parity: Parity) -> usize {
        match (self, parity) {
            (Self::Short, Parity::C16) => IS_EXT_SHORT_C16_POS,
            (Self::Short, Parity::C1) => IS_EXT_SHORT_C1_POS,
            (Self::LongEven, Parity::C16) => IS_EXT_LONG_EVEN_C16_POS,
            (Self::LongEven, Parity::C1) => IS_EXT_LONG_EVEN_C1_POS,
            (Self::LongOdd, Parity::C16) => IS_EXT_LONG_ODD_C16_POS,
            (Self::LongOdd, Parity::C1) => IS_EXT_LONG_ODD_C1_POS,
        }
    }
}

/// Named view of the first row of a branch block.
pub struct BranchInitRow<'a>(pub &'a mut WitnessRow);

impl<'a> BranchInitRow<'a> {
    /// Records the rlp list header of the S or C branch.
    pub fn set_rlp_meta(&mut self, side: Side, node: &[u8]) -> Result<()> {
        let meta = match node.first() {
            Some(0xc0..=0xf7) => 1,
            Some(0xf8) => 2,
            Some(0xf9) => 3,
            _ => return Err(WitnessError::MalformedNode("branch list header")),
        };
        let (count_pos, start) = match side {
            Side::S => (0, BRANCH_0_S_START),
            Side::C => (2, BRANCH_0_C_START),
        };
        // 1,1: one byte; 1,0: two bytes; 0,1: three bytes
        let count = match meta {
            1 => [1, 1],
            2 => [1, 0],
            _ => [0, 1],
        };
        let header = node
            .get(..meta)
            .ok_or(WitnessError::MalformedNode("branch list header"))?;
        self.0 .0[count_pos..count_pos + 2].copy_from_slice(&count);
        self.0 .0[start..start + meta].copy_from_slice(header);
        Ok(())
    }

    /// Nibble the modified path takes in this branch.
    pub fn set_key(&mut self, nibble: u8) {
        self.0[BRANCH_0_KEY_POS] = nibble;
    }

    /// Active nibble of the branch.
    pub fn key(&self) -> u8 {
        self.0[BRANCH_0_KEY_POS]
    }

    /// Parity of the branch position.
    pub fn set_parity(&mut self, parity: Parity) {
        self.0[IS_BRANCH_C16_POS] = parity.c16();
        self.0[IS_BRANCH_C1_POS] = parity.c1();
    }

    /// Parity recorded in the row.
    pub fn parity(&self) -> Option<Parity> {
        match (self.0[IS_BRANCH_C16_POS], self.0[IS_BRANCH_C1_POS]) {
            (1, 0) => Some(Parity::C16),
            (0, 1) => Some(Parity::C1),
            _ => None,
        }
    }

    /// Marks the branch on `side` as a placeholder.
    pub fn set_placeholder(&mut self, side: Side) {
        match side {
            Side::S => self.0[IS_BRANCH_S_PLACEHOLDER_POS] = 1,
            Side::C => self.0[IS_BRANCH_C_PLACEHOLDER_POS] = 1,
        }
    }

    /// Whether the branch on `side` is a placeholder.
    pub fn is_placeholder(&self, side: Side) -> bool {
        match side {
            Side::S => self.0[IS_BRANCH_S_PLACEHOLDER_POS] == 1,
            Side::C => self.0[IS_BRANCH_C_PLACEHOLDER_POS] == 1,
        }
    }

    /// Nibble of the leaf that drifted into this branch.
    pub fn set_drifted(&mut self, nibble: u8) {
        self.0[DRIFTED_POS] = nibble;
    }

    /// Marks the branch as the one inserted above a shortened extension node.
    pub fn set_modified_extension(&mut self) {
        self.0[IS_MODIFIED_EXT_NODE_POS] = 1;
    }

    /// Marks a branch as not hashed in its parent.
    pub fn set_non_hashed(&mut self, side: Side) {
        match side {
            Side::S => self.0[IS_BRANCH_S_NON_HASHED_POS] = 1,
            Side::C => self.0[IS_BRANCH_C_NON_HASHED_POS] = 1,
        }
    }

    /// Sets the flags describing the extension nodes `ext_s` and `ext_c` above this branch.
    pub fn set_extension(
        &mut self,
        ext_s: &[u8],
        ext_c: &[u8],
        kind: ExtensionKind,
        parity: Parity,
    ) {
        self.0[IS_EXTENSION_POS] = 1;
        set_extension_size_flags(self.0, ext_s, ext_c);
        self.0[kind.flag_pos(parity)] = 1;
    }

    /// Whether an extension node sits above this branch.
    pub fn is_extension(&self) -> bool {
        self.0[IS_EXTENSION_POS] == 1
    }
}

/// Long (more than 55 byte payload) and non-hashed flags of a pair of extension nodes.
pub(crate) fn set_extension_size_flags(row: &mut WitnessRow, ext_s: &[u8], ext_c: &[u8]) {
    // one byte of the list header holds the length
    if ext_s.len() > 56 {
        row[IS_S_EXT_LONGER_THAN_55_POS] = 1;
    }
    if ext_c.len() > 56 {
        row[IS_C_EXT_LONGER_THAN_55_POS] = 1;
    }
    if ext_s.len() < 32 {
        row[IS_EXT_NODE_S_NON_HASHED_POS] = 1;
    }
    if ext_c.len() < 32 {
        row[IS_EXT_NODE_C_NON_HASHED_POS] = 1;
    }
}

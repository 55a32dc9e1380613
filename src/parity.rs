//! Nibble parity of branch positions.

/// Which half of a key byte the next nibble occupies. `C16` is the high nibble and `C1` the
/// low one, so exactly one of the two circuit flags is set at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Parity {
    /// high nibble
    C16,
    /// low nibble, the state at the root
    #[default]
    C1,
}

impl Parity {
    /// The other half.
    pub fn flip(&mut self) {
        *self = match self {
            Self::C16 => Self::C1,
            Self::C1 => Self::C16,
        }
    }

    /// Parity after passing through a branch or an extension of `nibbles` nibbles and the branch
    /// below it. The branch consumes one nibble, so only even extensions change the result.
    pub fn before_branch(&mut self, preceding_extension_nibbles: Option<usize>) {
        match preceding_extension_nibbles {
            Some(n) if n % 2 == 1 => {}
            _ => self.flip(),
        }
    }

    /// Circuit flag `C16`.
    pub fn c16(&self) -> u8 {
        u8::from(*self == Self::C16)
    }

    /// Circuit flag `C1`.
    pub fn c1(&self) -> u8 {
        u8::from(*self == Self::C1)
    }

    /// Parity of the branch consuming nibble `key_index`.
    #[cfg(test)]
    pub(crate) fn at_key_index(key_index: usize) -> Self {
        if key_index % 2 == 0 {
            Self::C16
        } else {
            Self::C1
        }
    }
}

//! Deterministic identity for candidate definitions.
//!
//! A [`DefinitionHash`] is computed from the declaration name, the output
//! socket index and the textual signature, so two registrations of the same
//! implementation always agree and overloads of one name always differ.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

use crate::QualifiedName;

/// Domain mixing constants.
mod hash_constants {
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    pub const DEFINITION: u64 = 0x5ea77ffbcdf5f302;
    pub const OUTPUT: u64 = 0x9e3779b97f4a7c15;
    pub const SIGNATURE: u64 = 0xbf58476d1ce4e5b9;
}

/// A 64-bit hash identifying one definition of one output socket.
///
/// # Examples
///
/// ```
/// use weave_core::{DefinitionHash, QualifiedName};
///
/// let name = QualifiedName::from("math::add");
/// let a = DefinitionHash::new(&name, 0, "int -> int -> int");
/// let b = DefinitionHash::new(&name, 0, "float -> float -> float");
/// assert_ne!(a, b);
/// assert_eq!(a, DefinitionHash::new(&name, 0, "int -> int -> int"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DefinitionHash(pub u64);

impl DefinitionHash {
    pub const EMPTY: DefinitionHash = DefinitionHash(0);

    #[inline]
    pub fn new(name: &QualifiedName, output: usize, signature: &str) -> Self {
        let mut hash = hash_constants::DEFINITION ^ xxh64(name.to_string().as_bytes(), 0);
        // wrapping_mul keeps the components order-sensitive
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(hash_constants::OUTPUT ^ output as u64);
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(hash_constants::SIGNATURE ^ xxh64(signature.as_bytes(), 0));
        DefinitionHash(hash)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DefinitionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefinitionHash({:#018x})", self.0)
    }
}

impl fmt::Display for DefinitionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_index_changes_hash() {
        let name = QualifiedName::from("split");
        assert_ne!(
            DefinitionHash::new(&name, 0, "int"),
            DefinitionHash::new(&name, 1, "int")
        );
    }

    #[test]
    fn name_changes_hash() {
        assert_ne!(
            DefinitionHash::new(&QualifiedName::from("list::head"), 0, "[a] -> a"),
            DefinitionHash::new(&QualifiedName::from("list::tail"), 0, "[a] -> a")
        );
    }

    #[test]
    fn empty_is_zero() {
        assert!(DefinitionHash::EMPTY.is_empty());
        assert!(!DefinitionHash::new(&QualifiedName::from("x"), 0, "int").is_empty());
    }
}

//! Shared primitive types

/// The first four bytes of the keccak256 hash of a function signature
pub type Selector = [u8; 4];

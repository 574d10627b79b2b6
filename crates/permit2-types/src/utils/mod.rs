//! Utility functions for EIP-712 hashing and nonce arithmetic.

pub mod eip712;
pub mod hashing;
pub mod nonce;

pub use eip712::{compute_domain_hash, compute_final_digest, Eip712AbiEncoder, DOMAIN_TYPE};
pub use hashing::*;
pub use nonce::{bit_mask, bitmap_position, compose_nonce, NONCES_PER_SPACE};

//! Common types module for the Permit2 authorization engine.
//!
//! This module defines the value types shared by every Permit2 component:
//! the signed permit messages, the stored allowance record, the event tree,
//! and the EIP-712 hashing that binds a signature to exactly one message.

/// Allowance-based transfer types (standing approvals and their permits).
pub mod allowance;
/// Event types emitted by the authorization components.
pub mod events;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Signature-based one-shot transfer types.
pub mod signature_transfer;
/// Storage namespaces for the keyed state.
pub mod storage;
/// EIP-712 encoding, struct hashing and nonce arithmetic.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, B256, U256};
pub use allowance::*;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use signature_transfer::*;
pub use storage::*;
pub use validation::*;

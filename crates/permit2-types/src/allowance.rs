//! Allowance transfer types.
//!
//! An allowance is a standing, revocable, time-bounded permission for a
//! spender to move up to `amount` of a token from an owner. Owners grant it
//! directly through `approve` or by signing a [`PermitSingle`] / [`PermitBatch`]
//! that anyone may submit on their behalf.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Stored allowance record for one (owner, token, spender) triple.
///
/// The record is never removed; revoking an allowance zeroes `amount` and
/// leaves `nonce` where it was so that old permits stay invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedAllowance {
	/// Remaining amount the spender may transfer.
	pub amount: U256,
	/// Timestamp after which the allowance can no longer be used.
	pub expiration: u64,
	/// Nonce the next allowance permit for this triple must carry.
	pub nonce: u64,
}

impl PackedAllowance {
	/// Returns the record as the `(amount, expiration, nonce)` tuple exposed by `allowance`.
	pub fn as_tuple(&self) -> (U256, u64, u64) {
		(self.amount, self.expiration, self.nonce)
	}
}

/// The per-token part of an allowance permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDetails {
	/// Token the allowance applies to.
	pub token: Address,
	/// Allowance amount to set.
	pub amount: U256,
	/// Timestamp at which the granted allowance expires.
	pub expiration: u64,
	/// Must equal the stored nonce for (owner, token, spender).
	pub nonce: u64,
}

/// Signed message granting a single allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSingle {
	pub details: PermitDetails,
	/// Address receiving the allowance.
	pub spender: Address,
	/// Last timestamp at which the signature may be used.
	pub sig_deadline: U256,
}

/// Signed message granting allowances over several tokens to one spender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitBatch {
	pub details: Vec<PermitDetails>,
	pub spender: Address,
	pub sig_deadline: U256,
}

/// One entry of `batch_transfer_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceTransferDetails {
	pub from: Address,
	pub to: Address,
	pub amount: U256,
	pub token: Address,
}

/// A (token, spender) pair revoked by `lockdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSpenderPair {
	pub token: Address,
	pub spender: Address,
}

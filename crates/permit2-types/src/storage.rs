//! Storage-related types for the Permit2 state.

use alloy_primitives::{Address, U256};
use std::str::FromStr;

/// Storage namespaces for the keyed state.
///
/// Every record is addressed by a namespace plus the tuple that owns it;
/// components never read or write a key built from any other tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Allowance records keyed by (owner, token, spender).
	Allowances,
	/// Unordered nonce bitmaps keyed by (owner, nonce space).
	NonceBitmaps,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Allowances => "allowances",
			StorageKey::NonceBitmaps => "nonce_bitmaps",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Allowances, Self::NonceBitmaps].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"allowances" => Ok(Self::Allowances),
			"nonce_bitmaps" => Ok(Self::NonceBitmaps),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

/// Record id of the allowance for (owner, token, spender).
pub fn allowance_id(owner: &Address, token: &Address, spender: &Address) -> String {
	format!("{:x}-{:x}-{:x}", owner, token, spender)
}

/// Record id of the nonce bitmap for (owner, nonce space).
pub fn nonce_bitmap_id(owner: &Address, nonce_space: &U256) -> String {
	format!("{:x}-{:x}", owner, nonce_space)
}

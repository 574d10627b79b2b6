//! Signature transfer types.
//!
//! A signature transfer is a one-shot authorization: the owner signs a
//! message capping what may be moved, and the spender that submits it
//! chooses the recipient and the actual amount within that cap. Replay is
//! prevented by an unordered nonce consumed from the owner's bitmap.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Token and maximum amount a signature-transfer permit allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPermissions {
	pub token: Address,
	/// Cap on the amount the spender may request.
	pub amount: U256,
}

/// Signed one-shot transfer of a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitTransferFrom {
	pub permitted: TokenPermissions,
	/// Unordered nonce, see [`crate::utils::nonce`].
	pub nonce: U256,
	/// Last timestamp at which the signature may be used.
	pub deadline: U256,
}

/// Signed one-shot transfer of several tokens under one nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitBatchTransferFrom {
	pub permitted: Vec<TokenPermissions>,
	pub nonce: U256,
	pub deadline: U256,
}

/// Recipient and amount chosen by the spender at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTransferDetails {
	pub to: Address,
	pub requested_amount: U256,
}

/// Application data bound into a witness permit.
///
/// `type_string` completes the permit's EIP-712 type definition. It must
/// start with the witness member declaration (for example
/// `"Order witness)Order(uint256 id)TokenPermissions(address token,uint256 amount)"`)
/// and list every referenced struct in alphabetical order, exactly as the
/// signer's wallet rendered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
	/// EIP-712 struct hash of the application's witness value.
	pub value: B256,
	pub type_string: String,
}

impl Witness {
	pub fn new(value: B256, type_string: impl Into<String>) -> Self {
		Self {
			value,
			type_string: type_string.into(),
		}
	}
}

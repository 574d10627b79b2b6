//! EIP-712 struct hashes for every permit message.
//!
//! These functions are the single source of the signed bytes: the engine uses
//! them to verify, and off-chain tooling uses them to sign, so both sides agree
//! bit for bit.

use super::eip712::Eip712AbiEncoder;
use crate::{
	PermitBatch, PermitBatchTransferFrom, PermitDetails, PermitSingle, PermitTransferFrom,
	TokenPermissions, Witness,
};
use alloy_primitives::{keccak256, Address, B256};
use once_cell::sync::Lazy;

pub const TOKEN_PERMISSIONS_TYPE: &str = "TokenPermissions(address token,uint256 amount)";
pub const PERMIT_DETAILS_TYPE: &str =
	"PermitDetails(address token,uint256 amount,uint64 expiration,uint64 nonce)";
pub const PERMIT_SINGLE_TYPE: &str =
	"PermitSingle(PermitDetails details,address spender,uint256 sigDeadline)";
pub const PERMIT_BATCH_TYPE: &str =
	"PermitBatch(PermitDetails[] details,address spender,uint256 sigDeadline)";
pub const PERMIT_TRANSFER_FROM_TYPE: &str =
	"PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)";
pub const PERMIT_BATCH_TRANSFER_FROM_TYPE: &str =
	"PermitBatchTransferFrom(TokenPermissions[] permitted,address spender,uint256 nonce,uint256 deadline)";
/// Witness type strings are appended to this stub to close the struct.
pub const PERMIT_WITNESS_TRANSFER_FROM_TYPE_STUB: &str =
	"PermitWitnessTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline,";
pub const PERMIT_BATCH_WITNESS_TRANSFER_FROM_TYPE_STUB: &str =
	"PermitBatchWitnessTransferFrom(TokenPermissions[] permitted,address spender,uint256 nonce,uint256 deadline,";

static TOKEN_PERMISSIONS_TYPEHASH: Lazy<B256> =
	Lazy::new(|| keccak256(TOKEN_PERMISSIONS_TYPE.as_bytes()));
static PERMIT_DETAILS_TYPEHASH: Lazy<B256> =
	Lazy::new(|| keccak256(PERMIT_DETAILS_TYPE.as_bytes()));
static PERMIT_SINGLE_TYPEHASH: Lazy<B256> =
	Lazy::new(|| keccak256(format!("{}{}", PERMIT_SINGLE_TYPE, PERMIT_DETAILS_TYPE).as_bytes()));
static PERMIT_BATCH_TYPEHASH: Lazy<B256> =
	Lazy::new(|| keccak256(format!("{}{}", PERMIT_BATCH_TYPE, PERMIT_DETAILS_TYPE).as_bytes()));
static PERMIT_TRANSFER_FROM_TYPEHASH: Lazy<B256> = Lazy::new(|| {
	keccak256(format!("{}{}", PERMIT_TRANSFER_FROM_TYPE, TOKEN_PERMISSIONS_TYPE).as_bytes())
});
static PERMIT_BATCH_TRANSFER_FROM_TYPEHASH: Lazy<B256> = Lazy::new(|| {
	keccak256(format!("{}{}", PERMIT_BATCH_TRANSFER_FROM_TYPE, TOKEN_PERMISSIONS_TYPE).as_bytes())
});

/// Hash of a single [`PermitDetails`] entry.
pub fn hash_permit_details(details: &PermitDetails) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&PERMIT_DETAILS_TYPEHASH);
	enc.push_address(&details.token);
	enc.push_u256(details.amount);
	enc.push_u64(details.expiration);
	enc.push_u64(details.nonce);
	keccak256(enc.finish())
}

/// Struct hash of a [`PermitSingle`].
pub fn hash_permit_single(permit: &PermitSingle) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&PERMIT_SINGLE_TYPEHASH);
	enc.push_b256(&hash_permit_details(&permit.details));
	enc.push_address(&permit.spender);
	enc.push_u256(permit.sig_deadline);
	keccak256(enc.finish())
}

/// Struct hash of a [`PermitBatch`]. Entry order is part of the hash.
pub fn hash_permit_batch(permit: &PermitBatch) -> B256 {
	let details_hash = hash_array(permit.details.iter().map(hash_permit_details));

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&PERMIT_BATCH_TYPEHASH);
	enc.push_b256(&details_hash);
	enc.push_address(&permit.spender);
	enc.push_u256(permit.sig_deadline);
	keccak256(enc.finish())
}

/// Hash of a single [`TokenPermissions`] entry.
pub fn hash_token_permissions(permitted: &TokenPermissions) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&TOKEN_PERMISSIONS_TYPEHASH);
	enc.push_address(&permitted.token);
	enc.push_u256(permitted.amount);
	keccak256(enc.finish())
}

/// Struct hash of a [`PermitTransferFrom`] executed by `spender`.
pub fn hash_permit_transfer_from(permit: &PermitTransferFrom, spender: &Address) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&PERMIT_TRANSFER_FROM_TYPEHASH);
	enc.push_b256(&hash_token_permissions(&permit.permitted));
	enc.push_address(spender);
	enc.push_u256(permit.nonce);
	enc.push_u256(permit.deadline);
	keccak256(enc.finish())
}

/// Struct hash of a [`PermitBatchTransferFrom`] executed by `spender`.
pub fn hash_permit_batch_transfer_from(
	permit: &PermitBatchTransferFrom,
	spender: &Address,
) -> B256 {
	let permitted_hash = hash_array(permit.permitted.iter().map(hash_token_permissions));

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&PERMIT_BATCH_TRANSFER_FROM_TYPEHASH);
	enc.push_b256(&permitted_hash);
	enc.push_address(spender);
	enc.push_u256(permit.nonce);
	enc.push_u256(permit.deadline);
	keccak256(enc.finish())
}

/// Type hash of a witness permit; the witness type string is part of it, so a
/// witness can only be read under the schema the signer saw.
pub fn witness_type_hash(stub: &str, witness_type_string: &str) -> B256 {
	keccak256(format!("{}{}", stub, witness_type_string).as_bytes())
}

/// Struct hash of a [`PermitTransferFrom`] carrying a witness.
pub fn hash_permit_witness_transfer_from(
	permit: &PermitTransferFrom,
	spender: &Address,
	witness: &Witness,
) -> B256 {
	let type_hash = witness_type_hash(PERMIT_WITNESS_TRANSFER_FROM_TYPE_STUB, &witness.type_string);

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&type_hash);
	enc.push_b256(&hash_token_permissions(&permit.permitted));
	enc.push_address(spender);
	enc.push_u256(permit.nonce);
	enc.push_u256(permit.deadline);
	enc.push_b256(&witness.value);
	keccak256(enc.finish())
}

/// Struct hash of a [`PermitBatchTransferFrom`] carrying a witness.
pub fn hash_permit_batch_witness_transfer_from(
	permit: &PermitBatchTransferFrom,
	spender: &Address,
	witness: &Witness,
) -> B256 {
	let type_hash = witness_type_hash(
		PERMIT_BATCH_WITNESS_TRANSFER_FROM_TYPE_STUB,
		&witness.type_string,
	);
	let permitted_hash = hash_array(permit.permitted.iter().map(hash_token_permissions));

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&type_hash);
	enc.push_b256(&permitted_hash);
	enc.push_address(spender);
	enc.push_u256(permit.nonce);
	enc.push_u256(permit.deadline);
	enc.push_b256(&witness.value);
	keccak256(enc.finish())
}

/// EIP-712 array encoding: keccak256 of the concatenated element hashes.
fn hash_array(hashes: impl Iterator<Item = B256>) -> B256 {
	let mut buf = Vec::new();
	for hash in hashes {
		buf.extend_from_slice(hash.as_slice());
	}
	keccak256(buf)
}

//! Signature verification.

use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use permit2_types::utils::compute_final_digest;

/// Verification primitive consulted before any permit is honoured.
///
/// Implementations must hash with the canonical EIP-712 scheme so that a
/// signature produced by any conforming wallet verifies here.
pub trait SignatureVerifier: Send + Sync {
	/// Returns true iff `signature` over `domain_separator`/`struct_hash`
	/// was produced by `signer`.
	fn verify(
		&self,
		signer: &Address,
		domain_separator: &B256,
		struct_hash: &B256,
		signature: &[u8],
	) -> bool;
}

/// secp256k1 ECDSA verifier for externally owned accounts.
///
/// Accepts 65-byte `r || s || v` signatures and 64-byte EIP-2098 compact
/// `r || vs` signatures. Any other length is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaVerifier;

impl EcdsaVerifier {
	fn parse(signature: &[u8]) -> Option<PrimitiveSignature> {
		match signature.len() {
			65 => PrimitiveSignature::from_raw(signature).ok(),
			64 => {
				let r = U256::from_be_slice(&signature[..32]);
				let vs = U256::from_be_slice(&signature[32..]);
				let y_parity = vs.bit(255);
				let s = vs & (U256::MAX >> 1);
				Some(PrimitiveSignature::new(r, s, y_parity))
			},
			_ => None,
		}
	}
}

impl SignatureVerifier for EcdsaVerifier {
	fn verify(
		&self,
		signer: &Address,
		domain_separator: &B256,
		struct_hash: &B256,
		signature: &[u8],
	) -> bool {
		if signer.is_zero() {
			return false;
		}
		let Some(signature) = Self::parse(signature) else {
			tracing::debug!(len = signature.len(), "Rejected signature with invalid length");
			return false;
		};

		let digest = compute_final_digest(domain_separator, struct_hash);
		match signature.recover_address_from_prehash(&digest) {
			Ok(recovered) => recovered == *signer,
			Err(e) => {
				tracing::debug!(error = %e, "Signature recovery failed");
				false
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	fn signed(struct_hash: &B256, domain: &B256) -> (PrivateKeySigner, Vec<u8>) {
		let signer = PrivateKeySigner::random();
		let digest = compute_final_digest(domain, struct_hash);
		let signature = signer.sign_hash_sync(&digest).unwrap();
		(signer, signature.as_bytes().to_vec())
	}

	#[test]
	fn test_verifies_signer_and_rejects_others() {
		let domain = B256::repeat_byte(1);
		let hash = B256::repeat_byte(2);
		let (signer, signature) = signed(&hash, &domain);

		assert!(EcdsaVerifier.verify(&signer.address(), &domain, &hash, &signature));
		assert!(!EcdsaVerifier.verify(&Address::repeat_byte(5), &domain, &hash, &signature));
		assert!(!EcdsaVerifier.verify(&signer.address(), &B256::repeat_byte(3), &hash, &signature));
		assert!(!EcdsaVerifier.verify(&signer.address(), &domain, &B256::ZERO, &signature));
	}

	#[test]
	fn test_compact_signature_accepted() {
		let domain = B256::repeat_byte(1);
		let hash = B256::repeat_byte(9);
		let (signer, signature) = signed(&hash, &domain);

		let mut compact = signature[..64].to_vec();
		let v = signature[64];
		if v == 1 || v == 28 {
			compact[32] |= 0x80;
		}
		assert!(EcdsaVerifier.verify(&signer.address(), &domain, &hash, &compact));
	}

	#[test]
	fn test_malformed_signatures_rejected() {
		let domain = B256::ZERO;
		let hash = B256::ZERO;
		let owner = Address::repeat_byte(7);
		assert!(!EcdsaVerifier.verify(&owner, &domain, &hash, &[]));
		assert!(!EcdsaVerifier.verify(&owner, &domain, &hash, &[0u8; 63]));
		assert!(!EcdsaVerifier.verify(&owner, &domain, &hash, &[0u8; 65]));
		assert!(!EcdsaVerifier.verify(&Address::ZERO, &domain, &hash, &[0u8; 65]));
	}
}

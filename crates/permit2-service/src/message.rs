//! Typed permit messages for the `digest` and `sign` commands.
//!
//! A message file holds one JSON object tagged by `type`:
//!
//! ```json
//! { "type": "permit_single", "permit": { "details": { ... }, "spender": "0x..", "sig_deadline": "0x.." } }
//! { "type": "permit_transfer_from", "permit": { ... }, "spender": "0x.." }
//! { "type": "permit_witness_transfer_from", "permit": { ... }, "spender": "0x..",
//!   "witness": { "value": "0x..", "type_string": "..." } }
//! ```
//!
//! Signature-transfer messages name the spender that will submit them, since
//! it is part of the signed hash.

use permit2_types::utils::{
	compute_final_digest, hash_permit_batch, hash_permit_batch_transfer_from,
	hash_permit_batch_witness_transfer_from, hash_permit_single, hash_permit_transfer_from,
	hash_permit_witness_transfer_from,
};
use permit2_types::{
	Address, PermitBatch, PermitBatchTransferFrom, PermitSingle, PermitTransferFrom, Witness, B256,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedMessage {
	PermitSingle {
		permit: PermitSingle,
	},
	PermitBatch {
		permit: PermitBatch,
	},
	PermitTransferFrom {
		permit: PermitTransferFrom,
		spender: Address,
	},
	PermitBatchTransferFrom {
		permit: PermitBatchTransferFrom,
		spender: Address,
	},
	PermitWitnessTransferFrom {
		permit: PermitTransferFrom,
		spender: Address,
		witness: Witness,
	},
	PermitWitnessBatchTransferFrom {
		permit: PermitBatchTransferFrom,
		spender: Address,
		witness: Witness,
	},
}

impl TypedMessage {
	/// EIP-712 struct hash of the message.
	pub fn struct_hash(&self) -> B256 {
		match self {
			TypedMessage::PermitSingle { permit } => hash_permit_single(permit),
			TypedMessage::PermitBatch { permit } => hash_permit_batch(permit),
			TypedMessage::PermitTransferFrom { permit, spender } => {
				hash_permit_transfer_from(permit, spender)
			},
			TypedMessage::PermitBatchTransferFrom { permit, spender } => {
				hash_permit_batch_transfer_from(permit, spender)
			},
			TypedMessage::PermitWitnessTransferFrom {
				permit,
				spender,
				witness,
			} => hash_permit_witness_transfer_from(permit, spender, witness),
			TypedMessage::PermitWitnessBatchTransferFrom {
				permit,
				spender,
				witness,
			} => hash_permit_batch_witness_transfer_from(permit, spender, witness),
		}
	}

	/// Digest a wallet signs for this message under `domain_separator`.
	pub fn digest(&self, domain_separator: &B256) -> B256 {
		compute_final_digest(domain_separator, &self.struct_hash())
	}
}

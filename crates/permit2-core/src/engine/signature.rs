//! Signature transfers.
//!
//! One-shot transfers authorized by an owner signature alone, with no prior
//! approval. The submitting caller is bound into the signed hash as the
//! spender, picks the recipient and requests any amount up to the signed
//! cap. Replay is prevented by consuming the permit's unordered nonce.
//!
//! The nonce is consumed durably before any value moves, and the moves of a
//! batch land together or not at all.
//!
//! Witness variants additionally bind an application-defined value whose
//! EIP-712 type is spliced into the permit's own type string.

use super::context::CallContext;
use super::{check_deadline, nonces, Permit2Engine};
use crate::Permit2Error;
use permit2_token::TokenMove;
use permit2_types::utils::{
	hash_permit_batch_transfer_from, hash_permit_batch_witness_transfer_from,
	hash_permit_transfer_from, hash_permit_witness_transfer_from,
};
use permit2_types::{
	Address, PermitBatchTransferFrom, PermitTransferFrom, SignatureTransferDetails,
	TokenPermissions, Witness, B256, U256,
};

impl Permit2Engine {
	/// Transfers up to the permitted amount of one token out of `owner`.
	pub async fn permit_transfer_from(
		&self,
		ctx: &CallContext,
		permit: &PermitTransferFrom,
		transfer_details: &SignatureTransferDetails,
		owner: Address,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let struct_hash = hash_permit_transfer_from(permit, &ctx.caller);
		self.execute_transfer(ctx, permit, transfer_details, owner, struct_hash, signature)
			.await
	}

	/// [`Self::permit_transfer_from`] with a witness bound into the signature.
	pub async fn permit_witness_transfer_from(
		&self,
		ctx: &CallContext,
		permit: &PermitTransferFrom,
		transfer_details: &SignatureTransferDetails,
		owner: Address,
		witness: &Witness,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let struct_hash = hash_permit_witness_transfer_from(permit, &ctx.caller, witness);
		self.execute_transfer(ctx, permit, transfer_details, owner, struct_hash, signature)
			.await
	}

	/// Transfers several tokens out of `owner` under a single nonce.
	pub async fn permit_batch_transfer_from(
		&self,
		ctx: &CallContext,
		permit: &PermitBatchTransferFrom,
		transfer_details: &[SignatureTransferDetails],
		owner: Address,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let struct_hash = hash_permit_batch_transfer_from(permit, &ctx.caller);
		self.execute_batch_transfer(ctx, permit, transfer_details, owner, struct_hash, signature)
			.await
	}

	/// [`Self::permit_batch_transfer_from`] with a witness bound into the signature.
	pub async fn permit_witness_batch_transfer_from(
		&self,
		ctx: &CallContext,
		permit: &PermitBatchTransferFrom,
		transfer_details: &[SignatureTransferDetails],
		owner: Address,
		witness: &Witness,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let struct_hash = hash_permit_batch_witness_transfer_from(permit, &ctx.caller, witness);
		self.execute_batch_transfer(ctx, permit, transfer_details, owner, struct_hash, signature)
			.await
	}

	async fn execute_transfer(
		&self,
		ctx: &CallContext,
		permit: &PermitTransferFrom,
		transfer_details: &SignatureTransferDetails,
		owner: Address,
		struct_hash: B256,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let now = ctx.timestamp;
		let _guard = self.call_lock.lock().await;
		self.settle(move |mut journal| async move {
			check_deadline(permit.deadline, now)?;
			check_requested(&permit.permitted, transfer_details)?;
			self.verify_signature(&owner, &struct_hash, signature)?;
			nonces::consume(&mut journal, &owner, permit.nonce).await?;
			let moves = vec![TokenMove {
				token: permit.permitted.token,
				from: owner,
				to: transfer_details.to,
				amount: transfer_details.requested_amount,
			}];
			Ok(((), journal, moves))
		})
		.await?;

		tracing::debug!(
			owner = %owner,
			spender = %ctx.caller,
			token = %permit.permitted.token,
			to = %transfer_details.to,
			amount = %transfer_details.requested_amount,
			nonce = %permit.nonce,
			"Signature transfer executed"
		);
		Ok(())
	}

	/// Every entry is checked before any transfer is requested.
	async fn execute_batch_transfer(
		&self,
		ctx: &CallContext,
		permit: &PermitBatchTransferFrom,
		transfer_details: &[SignatureTransferDetails],
		owner: Address,
		struct_hash: B256,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		if transfer_details.len() != permit.permitted.len() {
			return Err(Permit2Error::LengthMismatch {
				expected: permit.permitted.len(),
				actual: transfer_details.len(),
			});
		}

		let now = ctx.timestamp;
		let _guard = self.call_lock.lock().await;
		self.settle(move |mut journal| async move {
			check_deadline(permit.deadline, now)?;
			for (permitted, requested) in permit.permitted.iter().zip(transfer_details) {
				check_requested(permitted, requested)?;
			}
			self.verify_signature(&owner, &struct_hash, signature)?;
			nonces::consume(&mut journal, &owner, permit.nonce).await?;

			// Zero requests let a spender skip entries of the signed batch.
			let moves: Vec<TokenMove> = permit
				.permitted
				.iter()
				.zip(transfer_details)
				.filter(|(_, requested)| requested.requested_amount != U256::ZERO)
				.map(|(permitted, requested)| TokenMove {
					token: permitted.token,
					from: owner,
					to: requested.to,
					amount: requested.requested_amount,
				})
				.collect();
			Ok(((), journal, moves))
		})
		.await?;

		tracing::debug!(
			owner = %owner,
			spender = %ctx.caller,
			entries = transfer_details.len(),
			nonce = %permit.nonce,
			"Batch signature transfer executed"
		);
		Ok(())
	}
}

fn check_requested(
	permitted: &TokenPermissions,
	requested: &SignatureTransferDetails,
) -> Result<(), Permit2Error> {
	if requested.requested_amount > permitted.amount {
		tracing::warn!(token = %permitted.token, permitted = %permitted.amount, requested = %requested.requested_amount, "Requested amount exceeds permit");
		return Err(Permit2Error::AmountExceedsPermitted {
			permitted: permitted.amount,
		});
	}
	Ok(())
}

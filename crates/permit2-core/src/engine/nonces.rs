//! Unordered nonce registry.
//!
//! Signature transfers are protected by nonces that can be consumed in any
//! order. Each owner has up to 2^248 nonce spaces of 256 bits; a nonce is
//! usable while its bit is clear, and bits are never cleared again.
//!
//! The monotonic allowance nonces live in the allowance records themselves,
//! see [`super::allowance`].

use super::context::CallContext;
use super::Permit2Engine;
use crate::state::Journal;
use crate::Permit2Error;
use permit2_types::utils::{bit_mask, bitmap_position};
use permit2_types::{Address, UnorderedNoncesEvent, U256};

impl Permit2Engine {
	/// Returns the bitmap word of `owner` for `nonce_space`.
	pub async fn nonce_bitmap(&self, owner: Address, nonce_space: U256) -> Result<U256, Permit2Error> {
		self.read(move |journal| async move {
			Ok(journal.nonce_bitmap(&owner, &nonce_space).await?)
		})
		.await
	}

	/// Whether `nonce` can still be consumed for `owner`.
	pub async fn is_nonce_usable(&self, owner: Address, nonce: U256) -> Result<bool, Permit2Error> {
		let (space, bit) = bitmap_position(nonce);
		let word = self.nonce_bitmap(owner, space).await?;
		Ok(word & bit_mask(bit) == U256::ZERO)
	}

	/// ORs `mask` into the caller's word for `nonce_space`.
	///
	/// Revokes every outstanding signature whose nonce falls on a set bit.
	/// Applying the same mask again changes nothing but still emits the event.
	pub async fn invalidate_unordered_nonces(
		&self,
		ctx: &CallContext,
		nonce_space: U256,
		mask: U256,
	) -> Result<(), Permit2Error> {
		let owner = ctx.owner()?;
		self.transact(move |mut journal| async move {
			let word = journal.nonce_bitmap(&owner, &nonce_space).await?;
			journal.set_nonce_bitmap(&owner, &nonce_space, word | mask);
			journal.emit(UnorderedNoncesEvent::UnorderedNonceInvalidation {
				owner,
				nonce_space,
				mask,
			});
			Ok(((), journal))
		})
		.await?;

		tracing::debug!(owner = %owner, nonce_space = %nonce_space, mask = %mask, "Invalidated unordered nonces");
		Ok(())
	}
}

/// Consumes `nonce` for `owner`, failing if its bit is already set.
pub(crate) async fn consume(
	journal: &mut Journal<'_>,
	owner: &Address,
	nonce: U256,
) -> Result<(), Permit2Error> {
	let (space, bit) = bitmap_position(nonce);
	let mask = bit_mask(bit);
	let word = journal.nonce_bitmap(owner, &space).await?;
	if word & mask != U256::ZERO {
		tracing::warn!(owner = %owner, nonce = %nonce, "Nonce already used");
		return Err(Permit2Error::NonceAlreadyUsed);
	}
	journal.set_nonce_bitmap(owner, &space, word | mask);
	journal.emit(UnorderedNoncesEvent::NonceInvalidated {
		owner: *owner,
		nonce,
	});
	Ok(())
}

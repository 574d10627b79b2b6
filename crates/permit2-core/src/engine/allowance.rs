//! Allowance transfers.
//!
//! Standing approvals per (owner, token, spender), granted directly by the
//! owner or through a signed [`PermitSingle`] / [`PermitBatch`], and spent by
//! the spender through `transfer_from`.
//!
//! Each record carries a monotonic nonce. A permit is only accepted when it
//! carries the stored nonce, and accepting it advances the nonce by one, so a
//! permit can be used once and permits signed with lower nonces become dead.
//! Owners may also skip the nonce forward with `invalidate_nonces`.
//!
//! `permit_batch` is all-or-nothing; `batch_transfer_from` is not, each entry
//! succeeds or fails on its own.

use super::context::CallContext;
use super::{check_deadline, Permit2Engine};
use crate::state::Journal;
use crate::Permit2Error;
use permit2_token::TokenMove;
use permit2_types::utils::{hash_permit_batch, hash_permit_single};
use permit2_types::{
	Address, AllowanceTransferDetails, AllowanceTransferEvent, PackedAllowance, PermitBatch,
	PermitDetails, PermitSingle, TokenSpenderPair, U256,
};

impl Permit2Engine {
	/// Returns the stored `(amount, expiration, nonce)` record for the triple.
	pub async fn allowance(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
	) -> Result<PackedAllowance, Permit2Error> {
		self.read(move |journal| async move {
			Ok(journal.allowance(&owner, &token, &spender).await?)
		})
		.await
	}

	/// Sets the caller's allowance for `spender` on `token`. The nonce is kept.
	pub async fn approve(
		&self,
		ctx: &CallContext,
		token: Address,
		spender: Address,
		amount: U256,
		expiration: u64,
	) -> Result<(), Permit2Error> {
		let owner = ctx.owner()?;
		let stored_expiration = self.stored_expiration(expiration, ctx.timestamp);
		self.transact(move |mut journal| async move {
			let mut record = journal.allowance(&owner, &token, &spender).await?;
			record.amount = amount;
			record.expiration = stored_expiration;
			journal.set_allowance(&owner, &token, &spender, record);
			journal.emit(AllowanceTransferEvent::Approval {
				owner,
				token,
				spender,
				amount,
				expiration,
			});
			Ok(((), journal))
		})
		.await?;

		tracing::debug!(owner = %owner, token = %token, spender = %spender, amount = %amount, expiration, "Approved");
		Ok(())
	}

	/// Applies a single allowance permit signed by `owner`.
	///
	/// Anyone may submit it. A nonce mismatch is reported before the deadline
	/// and the signature are looked at.
	pub async fn permit(
		&self,
		ctx: &CallContext,
		owner: Address,
		permit: &PermitSingle,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let now = ctx.timestamp;
		self.transact(move |mut journal| async move {
			self.update_approval(&mut journal, &owner, &permit.details, &permit.spender, now)
				.await?;
			check_deadline(permit.sig_deadline, now)?;
			self.verify_signature(&owner, &hash_permit_single(permit), signature)?;
			Ok(((), journal))
		})
		.await?;

		tracing::debug!(owner = %owner, token = %permit.details.token, spender = %permit.spender, nonce = permit.details.nonce, "Permit applied");
		Ok(())
	}

	/// Applies every entry of a batch permit, or none of them.
	pub async fn permit_batch(
		&self,
		ctx: &CallContext,
		owner: Address,
		permit: &PermitBatch,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		let now = ctx.timestamp;
		self.transact(move |mut journal| async move {
			for details in &permit.details {
				self.update_approval(&mut journal, &owner, details, &permit.spender, now)
					.await?;
			}
			check_deadline(permit.sig_deadline, now)?;
			self.verify_signature(&owner, &hash_permit_batch(permit), signature)?;
			Ok(((), journal))
		})
		.await?;

		tracing::debug!(owner = %owner, spender = %permit.spender, entries = permit.details.len(), "Batch permit applied");
		Ok(())
	}

	/// Moves `amount` of `token` from `from` to `to` against the caller's allowance.
	pub async fn transfer_from(
		&self,
		ctx: &CallContext,
		from: Address,
		to: Address,
		amount: U256,
		token: Address,
	) -> Result<(), Permit2Error> {
		let details = AllowanceTransferDetails {
			from,
			to,
			amount,
			token,
		};
		let _guard = self.call_lock.lock().await;
		self.apply_transfer(ctx, &details).await
	}

	/// Executes each transfer independently and reports one result per entry.
	///
	/// A failing entry leaves the entries before and after it in place.
	pub async fn batch_transfer_from(
		&self,
		ctx: &CallContext,
		transfers: &[AllowanceTransferDetails],
	) -> Vec<Result<(), Permit2Error>> {
		let _guard = self.call_lock.lock().await;
		let mut results = Vec::with_capacity(transfers.len());
		for (index, details) in transfers.iter().enumerate() {
			let result = self.apply_transfer(ctx, details).await;
			if let Err(e) = &result {
				tracing::warn!(index, from = %details.from, token = %details.token, error = %e, "Batch transfer entry failed");
			}
			results.push(result);
		}
		results
	}

	/// Zeroes the caller's allowance for every listed pair.
	pub async fn lockdown(
		&self,
		ctx: &CallContext,
		approvals: &[TokenSpenderPair],
	) -> Result<(), Permit2Error> {
		let owner = ctx.owner()?;
		self.transact(move |mut journal| async move {
			for pair in approvals {
				let mut record = journal.allowance(&owner, &pair.token, &pair.spender).await?;
				record.amount = U256::ZERO;
				journal.set_allowance(&owner, &pair.token, &pair.spender, record);
				journal.emit(AllowanceTransferEvent::Lockdown {
					owner,
					token: pair.token,
					spender: pair.spender,
				});
			}
			Ok(((), journal))
		})
		.await?;

		tracing::debug!(owner = %owner, pairs = approvals.len(), "Lockdown");
		Ok(())
	}

	/// Moves the caller's allowance nonce for (token, spender) forward to `new_nonce`.
	pub async fn invalidate_nonces(
		&self,
		ctx: &CallContext,
		token: Address,
		spender: Address,
		new_nonce: u64,
	) -> Result<(), Permit2Error> {
		let owner = ctx.owner()?;
		let old_nonce = self
			.transact(move |mut journal| async move {
				let mut record = journal.allowance(&owner, &token, &spender).await?;
				let old_nonce = record.nonce;
				if new_nonce <= old_nonce {
					tracing::warn!(owner = %owner, token = %token, spender = %spender, old_nonce, new_nonce, "Nonce must move forward");
					return Err(Permit2Error::InvalidNonce);
				}
				record.nonce = new_nonce;
				journal.set_allowance(&owner, &token, &spender, record);
				journal.emit(AllowanceTransferEvent::NonceInvalidation {
					owner,
					token,
					spender,
					new_nonce,
					old_nonce,
				});
				Ok((old_nonce, journal))
			})
			.await?;

		tracing::debug!(owner = %owner, token = %token, spender = %spender, old_nonce, new_nonce, "Invalidated allowance nonces");
		Ok(())
	}

	/// One allowance transfer in its own journal. The caller holds `call_lock`.
	async fn apply_transfer(
		&self,
		ctx: &CallContext,
		details: &AllowanceTransferDetails,
	) -> Result<(), Permit2Error> {
		let spender = ctx.caller;
		let now = ctx.timestamp;
		self.settle(move |mut journal| async move {
			self.spend_allowance(&mut journal, details, &spender, now)
				.await?;
			let moves = vec![TokenMove {
				token: details.token,
				from: details.from,
				to: details.to,
				amount: details.amount,
			}];
			Ok(((), journal, moves))
		})
		.await?;

		tracing::debug!(from = %details.from, to = %details.to, token = %details.token, spender = %spender, amount = %details.amount, "Transferred against allowance");
		Ok(())
	}

	/// Checks the nonce and stages the allowance a permit grants.
	async fn update_approval(
		&self,
		journal: &mut Journal<'_>,
		owner: &Address,
		details: &PermitDetails,
		spender: &Address,
		now: u64,
	) -> Result<(), Permit2Error> {
		let record = journal.allowance(owner, &details.token, spender).await?;
		if record.nonce != details.nonce {
			tracing::warn!(owner = %owner, token = %details.token, spender = %spender, expected = record.nonce, got = details.nonce, "Stale permit nonce");
			return Err(Permit2Error::InvalidNonce);
		}
		let next_nonce = details
			.nonce
			.checked_add(1)
			.ok_or(Permit2Error::InvalidNonce)?;

		journal.set_allowance(
			owner,
			&details.token,
			spender,
			PackedAllowance {
				amount: details.amount,
				expiration: self.stored_expiration(details.expiration, now),
				nonce: next_nonce,
			},
		);
		journal.emit(AllowanceTransferEvent::Permit {
			owner: *owner,
			token: details.token,
			spender: *spender,
			amount: details.amount,
			expiration: details.expiration,
			nonce: details.nonce,
		});
		Ok(())
	}

	/// Checks expiry and amount, and stages the decremented allowance.
	async fn spend_allowance(
		&self,
		journal: &mut Journal<'_>,
		details: &AllowanceTransferDetails,
		spender: &Address,
		now: u64,
	) -> Result<(), Permit2Error> {
		let mut record = journal
			.allowance(&details.from, &details.token, spender)
			.await?;
		if now > record.expiration {
			tracing::warn!(owner = %details.from, token = %details.token, spender = %spender, expiration = record.expiration, "Allowance expired");
			return Err(Permit2Error::AllowanceExpired {
				expiration: record.expiration,
			});
		}
		if self.is_unlimited(record.amount) {
			return Ok(());
		}

		record.amount = record.amount.checked_sub(details.amount).ok_or_else(|| {
			tracing::warn!(owner = %details.from, token = %details.token, spender = %spender, available = %record.amount, requested = %details.amount, "Insufficient allowance");
			Permit2Error::InsufficientAllowance {
				available: record.amount,
			}
		})?;
		journal.set_allowance(&details.from, &details.token, spender, record);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::super::testing::*;
	use super::*;
	use permit2_config::{AllowanceConfig, ZeroExpiration};
	use permit2_types::Permit2Event;

	fn spender() -> Address {
		addr(0x5e)
	}

	fn recipient() -> Address {
		addr(0x7c)
	}

	fn spender_ctx() -> CallContext {
		CallContext::new(spender(), NOW)
	}

	fn single(token: Address, amount: u64, nonce: u64) -> PermitSingle {
		PermitSingle {
			details: PermitDetails {
				token,
				amount: U256::from(amount),
				expiration: NOW + 1_000,
				nonce,
			},
			spender: spender(),
			sig_deadline: U256::from(NOW + 60),
		}
	}

	#[tokio::test]
	async fn test_approve_sets_exact_values_and_keeps_nonce() {
		let h = harness().await;
		let ctx = h.owner_ctx();
		let owner = h.owner_address();
		h.engine
			.invalidate_nonces(&ctx, token_a(), spender(), 3)
			.await
			.unwrap();

		h.engine
			.approve(&ctx, token_a(), spender(), U256::from(250), NOW + 5)
			.await
			.unwrap();
		assert_eq!(
			h.engine
				.allowance(owner, token_a(), spender())
				.await
				.unwrap()
				.as_tuple(),
			(U256::from(250), NOW + 5, 3)
		);

		// Overwrites unconditionally, including downwards.
		h.engine
			.approve(&ctx, token_a(), spender(), U256::from(1), 0)
			.await
			.unwrap();
		assert_eq!(
			h.engine
				.allowance(owner, token_a(), spender())
				.await
				.unwrap()
				.as_tuple(),
			(U256::from(1), 0, 3)
		);
	}

	#[tokio::test]
	async fn test_approve_emits_approval() {
		let h = harness().await;
		let mut rx = h.engine.event_bus().subscribe();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(9), NOW)
			.await
			.unwrap();
		assert_eq!(
			drain(&mut rx),
			vec![Permit2Event::AllowanceTransfer(AllowanceTransferEvent::Approval {
				owner: h.owner_address(),
				token: token_a(),
				spender: spender(),
				amount: U256::from(9),
				expiration: NOW,
			})]
		);
	}

	#[tokio::test]
	async fn test_owner_gated_calls_reject_zero_caller() {
		let h = harness().await;
		let ctx = CallContext::new(Address::ZERO, NOW);
		assert!(matches!(
			h.engine.approve(&ctx, token_a(), spender(), U256::from(1), NOW).await,
			Err(Permit2Error::Unauthorized)
		));
		assert!(matches!(
			h.engine
				.lockdown(
					&ctx,
					&[TokenSpenderPair {
						token: token_a(),
						spender: spender()
					}]
				)
				.await,
			Err(Permit2Error::Unauthorized)
		));
		assert!(matches!(
			h.engine.invalidate_nonces(&ctx, token_a(), spender(), 1).await,
			Err(Permit2Error::Unauthorized)
		));
	}

	#[tokio::test]
	async fn test_permit_advances_nonce_and_replay_fails() {
		let h = harness().await;
		let owner = h.owner_address();
		let permit = single(token_a(), 500, 0);
		let signature = h.sign(&hash_permit_single(&permit));
		let mut rx = h.engine.event_bus().subscribe();

		// Submitted by a relayer, not the owner.
		let relayer = CallContext::new(addr(0x99), NOW);
		h.engine
			.permit(&relayer, owner, &permit, &signature)
			.await
			.unwrap();
		assert_eq!(
			h.engine
				.allowance(owner, token_a(), spender())
				.await
				.unwrap()
				.as_tuple(),
			(U256::from(500), NOW + 1_000, 1)
		);
		assert_eq!(
			drain(&mut rx),
			vec![Permit2Event::AllowanceTransfer(AllowanceTransferEvent::Permit {
				owner,
				token: token_a(),
				spender: spender(),
				amount: U256::from(500),
				expiration: NOW + 1_000,
				nonce: 0,
			})]
		);

		assert!(matches!(
			h.engine.permit(&relayer, owner, &permit, &signature).await,
			Err(Permit2Error::InvalidNonce)
		));
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().nonce,
			1
		);
	}

	#[tokio::test]
	async fn test_stale_nonce_rejected_regardless_of_signature() {
		let h = harness().await;
		let owner = h.owner_address();
		let permit = single(token_a(), 500, 4);
		let valid = h.sign(&hash_permit_single(&permit));

		assert!(matches!(
			h.engine.permit(&spender_ctx(), owner, &permit, &valid).await,
			Err(Permit2Error::InvalidNonce)
		));
		assert!(matches!(
			h.engine.permit(&spender_ctx(), owner, &permit, &[0u8; 65]).await,
			Err(Permit2Error::InvalidNonce)
		));
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap(),
			PackedAllowance::default()
		);
	}

	#[tokio::test]
	async fn test_permit_expired_and_bad_signature() {
		let h = harness().await;
		let owner = h.owner_address();
		let permit = single(token_a(), 500, 0);
		let signature = h.sign(&hash_permit_single(&permit));

		let late = CallContext::new(spender(), NOW + 61);
		assert!(matches!(
			h.engine.permit(&late, owner, &permit, &signature).await,
			Err(Permit2Error::ExpiredSignature { .. })
		));

		// Signed for a different amount than submitted.
		let mut tampered = permit.clone();
		tampered.details.amount = U256::from(501);
		assert!(matches!(
			h.engine.permit(&spender_ctx(), owner, &tampered, &signature).await,
			Err(Permit2Error::SignatureInvalid)
		));

		// Claimed owner did not sign.
		assert!(matches!(
			h.engine.permit(&spender_ctx(), addr(0x44), &permit, &signature).await,
			Err(Permit2Error::SignatureInvalid)
		));
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap(),
			PackedAllowance::default()
		);

		// Exactly at the deadline is still valid.
		let edge = CallContext::new(spender(), NOW + 60);
		h.engine
			.permit(&edge, owner, &permit, &signature)
			.await
			.unwrap();
	}

	fn batch(nonces: [u64; 3]) -> PermitBatch {
		let tokens = [token_a(), token_b(), token_c()];
		PermitBatch {
			details: tokens
				.iter()
				.zip(nonces)
				.map(|(token, nonce)| PermitDetails {
					token: *token,
					amount: U256::from(100),
					expiration: NOW + 1_000,
					nonce,
				})
				.collect(),
			spender: spender(),
			sig_deadline: U256::from(NOW + 60),
		}
	}

	#[tokio::test]
	async fn test_permit_batch_applies_all_entries() {
		let h = harness().await;
		let owner = h.owner_address();
		let permit = batch([0, 0, 0]);
		let signature = h.sign(&hash_permit_batch(&permit));
		let mut rx = h.engine.event_bus().subscribe();

		h.engine
			.permit_batch(&spender_ctx(), owner, &permit, &signature)
			.await
			.unwrap();
		for token in [token_a(), token_b(), token_c()] {
			assert_eq!(
				h.engine.allowance(owner, token, spender()).await.unwrap().as_tuple(),
				(U256::from(100), NOW + 1_000, 1)
			);
		}
		let names: Vec<_> = drain(&mut rx).iter().map(|e| e.name()).collect();
		assert_eq!(names, vec!["Permit", "Permit", "Permit"]);
	}

	#[tokio::test]
	async fn test_permit_batch_is_atomic() {
		let h = harness().await;
		let ctx = h.owner_ctx();
		let owner = h.owner_address();
		// Second entry becomes stale.
		h.engine
			.invalidate_nonces(&ctx, token_b(), spender(), 2)
			.await
			.unwrap();
		let before = allowances_of(&h, owner).await;

		let permit = batch([0, 0, 0]);
		let signature = h.sign(&hash_permit_batch(&permit));
		let mut rx = h.engine.event_bus().subscribe();
		assert!(matches!(
			h.engine
				.permit_batch(&spender_ctx(), owner, &permit, &signature)
				.await,
			Err(Permit2Error::InvalidNonce)
		));

		assert_eq!(allowances_of(&h, owner).await, before);
		assert!(drain(&mut rx).is_empty());
	}

	async fn allowances_of(h: &Harness, owner: Address) -> Vec<PackedAllowance> {
		let mut records = Vec::new();
		for token in [token_a(), token_b(), token_c()] {
			records.push(h.engine.allowance(owner, token, spender()).await.unwrap());
		}
		records
	}

	#[tokio::test]
	async fn test_transfer_from_spends_allowance() {
		let h = harness().await;
		let owner = h.owner_address();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(100), NOW + 1_000)
			.await
			.unwrap();

		h.engine
			.transfer_from(&spender_ctx(), owner, recipient(), U256::from(60), token_a())
			.await
			.unwrap();
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().amount,
			U256::from(40)
		);
		assert_eq!(h.balance(token_a(), recipient()).await, U256::from(60));

		assert!(matches!(
			h.engine
				.transfer_from(&spender_ctx(), owner, recipient(), U256::from(60), token_a())
				.await,
			Err(Permit2Error::InsufficientAllowance { available }) if available == U256::from(40)
		));
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().amount,
			U256::from(40)
		);
		assert_eq!(h.balance(token_a(), recipient()).await, U256::from(60));
	}

	#[tokio::test]
	async fn test_transfer_from_respects_expiration() {
		let h = harness().await;
		let owner = h.owner_address();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(100), NOW + 10)
			.await
			.unwrap();

		let at_expiry = CallContext::new(spender(), NOW + 10);
		h.engine
			.transfer_from(&at_expiry, owner, recipient(), U256::from(1), token_a())
			.await
			.unwrap();

		let after = CallContext::new(spender(), NOW + 11);
		assert!(matches!(
			h.engine
				.transfer_from(&after, owner, recipient(), U256::from(1), token_a())
				.await,
			Err(Permit2Error::AllowanceExpired { expiration }) if expiration == NOW + 10
		));
	}

	#[tokio::test]
	async fn test_transfer_from_needs_caller_as_spender() {
		let h = harness().await;
		let owner = h.owner_address();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(100), NOW + 10)
			.await
			.unwrap();

		let other = CallContext::new(addr(0x66), NOW);
		assert!(h
			.engine
			.transfer_from(&other, owner, recipient(), U256::from(1), token_a())
			.await
			.is_err());
		assert_eq!(h.balance(token_a(), recipient()).await, U256::ZERO);
	}

	#[tokio::test]
	async fn test_unlimited_allowance_policy() {
		let h = harness().await;
		let owner = h.owner_address();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::MAX, NOW + 10)
			.await
			.unwrap();
		h.engine
			.transfer_from(&spender_ctx(), owner, recipient(), U256::from(30), token_a())
			.await
			.unwrap();
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().amount,
			U256::MAX
		);

		let h = harness_with(AllowanceConfig {
			unlimited_amount: false,
			zero_expiration: ZeroExpiration::Literal,
		})
		.await;
		let owner = h.owner_address();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::MAX, NOW + 10)
			.await
			.unwrap();
		h.engine
			.transfer_from(&spender_ctx(), owner, recipient(), U256::from(30), token_a())
			.await
			.unwrap();
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().amount,
			U256::MAX - U256::from(30)
		);
	}

	#[tokio::test]
	async fn test_zero_expiration_policy() {
		let h = harness().await;
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(5), 0)
			.await
			.unwrap();
		assert!(matches!(
			h.engine
				.transfer_from(&spender_ctx(), h.owner_address(), recipient(), U256::from(1), token_a())
				.await,
			Err(Permit2Error::AllowanceExpired { expiration: 0 })
		));

		let h = harness_with(AllowanceConfig {
			unlimited_amount: true,
			zero_expiration: ZeroExpiration::CurrentTimestamp,
		})
		.await;
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(5), 0)
			.await
			.unwrap();
		assert_eq!(
			h.engine
				.allowance(h.owner_address(), token_a(), spender())
				.await
				.unwrap()
				.expiration,
			NOW
		);
		h.engine
			.transfer_from(&spender_ctx(), h.owner_address(), recipient(), U256::from(1), token_a())
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_failed_token_transfer_restores_allowance() {
		let h = harness().await;
		let owner = h.owner_address();
		h.engine
			.approve(&h.owner_ctx(), token_a(), spender(), U256::from(5_000), NOW + 10)
			.await
			.unwrap();

		// Owner only holds 1000.
		assert!(matches!(
			h.engine
				.transfer_from(&spender_ctx(), owner, recipient(), U256::from(2_000), token_a())
				.await,
			Err(Permit2Error::Transfer(_))
		));
		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().amount,
			U256::from(5_000)
		);
	}

	#[tokio::test]
	async fn test_batch_transfer_entries_are_independent() {
		let h = harness().await;
		let ctx = h.owner_ctx();
		let owner = h.owner_address();
		for token in [token_a(), token_b(), token_c()] {
			h.engine
				.approve(&ctx, token, spender(), U256::from(50), NOW + 10)
				.await
				.unwrap();
		}

		let entry = |token: Address, amount: u64| AllowanceTransferDetails {
			from: owner,
			to: recipient(),
			amount: U256::from(amount),
			token,
		};
		let results = h
			.engine
			.batch_transfer_from(
				&spender_ctx(),
				&[entry(token_a(), 10), entry(token_b(), 51), entry(token_c(), 20)],
			)
			.await;

		assert!(results[0].is_ok());
		assert!(matches!(
			results[1],
			Err(Permit2Error::InsufficientAllowance { .. })
		));
		assert!(results[2].is_ok());
		assert_eq!(h.balance(token_a(), recipient()).await, U256::from(10));
		assert_eq!(h.balance(token_b(), recipient()).await, U256::ZERO);
		assert_eq!(h.balance(token_c(), recipient()).await, U256::from(20));
		assert_eq!(
			h.engine.allowance(owner, token_b(), spender()).await.unwrap().amount,
			U256::from(50)
		);
	}

	#[tokio::test]
	async fn test_lockdown_zeroes_amount_only() {
		let h = harness().await;
		let ctx = h.owner_ctx();
		let owner = h.owner_address();
		let permit = single(token_a(), 500, 0);
		let signature = h.sign(&hash_permit_single(&permit));
		h.engine
			.permit(&spender_ctx(), owner, &permit, &signature)
			.await
			.unwrap();
		h.engine
			.approve(&ctx, token_b(), spender(), U256::from(7), NOW + 3)
			.await
			.unwrap();

		let mut rx = h.engine.event_bus().subscribe();
		let pairs = [
			TokenSpenderPair {
				token: token_a(),
				spender: spender(),
			},
			TokenSpenderPair {
				token: token_b(),
				spender: spender(),
			},
		];
		h.engine.lockdown(&ctx, &pairs).await.unwrap();

		assert_eq!(
			h.engine.allowance(owner, token_a(), spender()).await.unwrap().as_tuple(),
			(U256::ZERO, NOW + 1_000, 1)
		);
		assert_eq!(
			h.engine.allowance(owner, token_b(), spender()).await.unwrap().as_tuple(),
			(U256::ZERO, NOW + 3, 0)
		);
		let events = drain(&mut rx);
		assert_eq!(events.len(), 2);
		assert!(events.iter().all(|e| e.name() == "Lockdown"));
	}

	#[tokio::test]
	async fn test_invalidate_nonces_moves_forward_only() {
		let h = harness().await;
		let ctx = h.owner_ctx();
		let owner = h.owner_address();
		let permit = single(token_a(), 500, 0);
		let signature = h.sign(&hash_permit_single(&permit));
		let mut rx = h.engine.event_bus().subscribe();

		h.engine
			.invalidate_nonces(&ctx, token_a(), spender(), 5)
			.await
			.unwrap();
		assert_eq!(
			drain(&mut rx),
			vec![Permit2Event::AllowanceTransfer(
				AllowanceTransferEvent::NonceInvalidation {
					owner,
					token: token_a(),
					spender: spender(),
					new_nonce: 5,
					old_nonce: 0,
				}
			)]
		);

		for stale in [5, 4] {
			assert!(matches!(
				h.engine.invalidate_nonces(&ctx, token_a(), spender(), stale).await,
				Err(Permit2Error::InvalidNonce)
			));
		}
		// The outstanding permit signed at nonce 0 is dead.
		assert!(matches!(
			h.engine.permit(&spender_ctx(), owner, &permit, &signature).await,
			Err(Permit2Error::InvalidNonce)
		));
	}
}

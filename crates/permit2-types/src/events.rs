//! Event types emitted by the authorization components.
//!
//! Each component owns a closed set of events. The top-level [`Permit2Event`]
//! composes them with component-qualified variants, so two components may use
//! the same event name without colliding. Field order follows the public
//! interface that indexers decode.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all Permit2 events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permit2Event {
	/// Events from the allowance transfer component.
	AllowanceTransfer(AllowanceTransferEvent),
	/// Events from the signature transfer component.
	SignatureTransfer(SignatureTransferEvent),
	/// Events from the unordered nonce registry.
	UnorderedNonces(UnorderedNoncesEvent),
}

impl Permit2Event {
	/// Name of the concrete event, as indexers see it.
	pub fn name(&self) -> &'static str {
		match self {
			Permit2Event::AllowanceTransfer(event) => match event {
				AllowanceTransferEvent::NonceInvalidation { .. } => "NonceInvalidation",
				AllowanceTransferEvent::Approval { .. } => "Approval",
				AllowanceTransferEvent::Permit { .. } => "Permit",
				AllowanceTransferEvent::Lockdown { .. } => "Lockdown",
			},
			Permit2Event::SignatureTransfer(event) => match *event {},
			Permit2Event::UnorderedNonces(event) => match event {
				UnorderedNoncesEvent::UnorderedNonceInvalidation { .. } => {
					"UnorderedNonceInvalidation"
				},
				UnorderedNoncesEvent::NonceInvalidated { .. } => "NonceInvalidated",
			},
		}
	}
}

/// Events related to standing allowances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowanceTransferEvent {
	/// The owner skipped the allowance nonce forward.
	NonceInvalidation {
		owner: Address,
		token: Address,
		spender: Address,
		new_nonce: u64,
		old_nonce: u64,
	},
	/// The owner set an allowance directly.
	Approval {
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
		expiration: u64,
	},
	/// An allowance was set through a signed permit.
	Permit {
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
		expiration: u64,
		/// The nonce the permit consumed.
		nonce: u64,
	},
	/// The owner revoked an allowance.
	Lockdown {
		owner: Address,
		token: Address,
		spender: Address,
	},
}

/// Events related to signature transfers.
///
/// The component emits nothing of its own; nonce consumption is reported by
/// [`UnorderedNoncesEvent::NonceInvalidated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureTransferEvent {}

/// Events related to the unordered nonce bitmaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnorderedNoncesEvent {
	/// The owner OR-ed a mask into one of its nonce spaces.
	UnorderedNonceInvalidation {
		owner: Address,
		nonce_space: U256,
		mask: U256,
	},
	/// A signature transfer consumed a nonce.
	NonceInvalidated { owner: Address, nonce: U256 },
}

impl From<AllowanceTransferEvent> for Permit2Event {
	fn from(event: AllowanceTransferEvent) -> Self {
		Permit2Event::AllowanceTransfer(event)
	}
}

impl From<UnorderedNoncesEvent> for Permit2Event {
	fn from(event: UnorderedNoncesEvent) -> Self {
		Permit2Event::UnorderedNonces(event)
	}
}

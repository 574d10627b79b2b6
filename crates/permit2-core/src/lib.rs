//! Core authorization engine for Permit2.
//!
//! The engine hosts the three cooperating components, all sharing one
//! owner-keyed state namespace:
//!
//! - allowance transfers: standing, time-bounded approvals granted directly
//!   or through signed permits, and transfers executed against them
//! - signature transfers: one-shot transfers authorized by a signature alone
//! - unordered nonces: the bitmap replay protection used by signature transfers
//!
//! Every mutating call runs against a [`state::Journal`] and only reaches
//! storage when the whole call succeeds.

use permit2_storage::StorageError;
use permit2_token::TokenError;
use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod state;

pub use builder::{BuilderError, Permit2Builder, Permit2Factories};
pub use engine::{context::CallContext, event_bus::EventBus, Permit2Engine};

/// Errors returned by Permit2 operations.
///
/// All of them are terminal for the call that raised them; no state written
/// by that call survives.
#[derive(Debug, Error)]
pub enum Permit2Error {
	/// The signed message is past its deadline.
	#[error("Signature expired at {deadline}")]
	ExpiredSignature { deadline: alloy_primitives::U256 },
	/// Allowance nonce mismatch, or an invalidation that does not move forward.
	#[error("Invalid nonce")]
	InvalidNonce,
	/// The unordered nonce was already consumed or invalidated.
	#[error("Nonce already used")]
	NonceAlreadyUsed,
	#[error("Insufficient allowance: {available} available")]
	InsufficientAllowance { available: alloy_primitives::U256 },
	#[error("Allowance expired at {expiration}")]
	AllowanceExpired { expiration: u64 },
	/// The requested amount exceeds what the signer permitted.
	#[error("Requested amount exceeds permitted {permitted}")]
	AmountExceedsPermitted { permitted: alloy_primitives::U256 },
	#[error("Length mismatch: {expected} permitted entries, {actual} transfer details")]
	LengthMismatch { expected: usize, actual: usize },
	#[error("Signature invalid")]
	SignatureInvalid,
	/// The caller may not act as the owner.
	#[error("Unauthorized")]
	Unauthorized,
	/// The external transfer primitive failed.
	#[error("Transfer failed: {0}")]
	Transfer(#[from] TokenError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

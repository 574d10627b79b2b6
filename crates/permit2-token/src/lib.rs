//! Token transfer module for the Permit2 engine.
//!
//! The engine never holds balances. Once an authorization has been checked it
//! asks a [`TokenInterface`] to move value between accounts, and treats any
//! failure as fatal for the call that requested it.
//!
//! A call that moves several tokens hands all of them over at once: either
//! every move lands or none does.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use permit2_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod ledger;
}

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
	/// The sender does not hold enough of the token.
	#[error("Insufficient balance: {token} holder {owner} has {balance}, needs {needed}")]
	InsufficientBalance {
		token: Address,
		owner: Address,
		balance: U256,
		needed: U256,
	},
	/// The recipient balance would overflow.
	#[error("Balance overflow for {owner} on {token}")]
	Overflow { token: Address, owner: Address },
	/// The token implementation rejected the transfer.
	#[error("Transfer rejected: {0}")]
	Rejected(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// One requested movement of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMove {
	pub token: Address,
	pub from: Address,
	pub to: Address,
	pub amount: U256,
}

/// Trait defining the transfer primitive the engine depends on.
#[async_trait]
pub trait TokenInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Applies every move in order, or none of them.
	///
	/// Later moves see the balances left by earlier ones. On error no balance
	/// has changed.
	async fn move_values(&self, moves: &[TokenMove]) -> Result<(), TokenError>;

	/// Returns the balance of `owner` in `token`.
	async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, TokenError>;
}

/// Type alias for token factory functions.
pub type TokenFactory = fn(&toml::Value) -> Result<Box<dyn TokenInterface>, TokenError>;

/// Registry trait for token implementations.
pub trait TokenRegistry: ImplementationRegistry<Factory = TokenFactory> {}

/// Get all registered token implementations.
pub fn get_all_implementations() -> Vec<(&'static str, TokenFactory)> {
	use implementations::ledger;

	vec![(ledger::Registry::NAME, ledger::Registry::factory())]
}

/// Service wrapping the configured token implementation.
pub struct TokenService {
	implementation: Box<dyn TokenInterface>,
}

impl TokenService {
	/// Creates a new TokenService with the specified implementation.
	pub fn new(implementation: Box<dyn TokenInterface>) -> Self {
		Self { implementation }
	}

	/// Moves value; zero-amount transfers are forwarded like any other.
	pub async fn transfer(
		&self,
		token: Address,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<(), TokenError> {
		self.transfer_all(&[TokenMove {
			token,
			from,
			to,
			amount,
		}])
		.await
	}

	/// Moves value for every entry atomically.
	pub async fn transfer_all(&self, moves: &[TokenMove]) -> Result<(), TokenError> {
		if moves.is_empty() {
			return Ok(());
		}
		tracing::trace!(moves = moves.len(), "Moving value");
		self.implementation.move_values(moves).await
	}

	pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, TokenError> {
		self.implementation.balance_of(token, owner).await
	}
}

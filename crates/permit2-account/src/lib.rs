//! Account and signature module for the Permit2 engine.
//!
//! Two sides of the same primitive live here. [`SignatureVerifier`] is the
//! capability the engine consults to decide whether a signature over a
//! domain-separated struct hash was produced by the claimed owner.
//! [`AccountInterface`] is the signing side used by owners and tooling to
//! produce those signatures.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use permit2_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

mod verify;

pub use verify::{EcdsaVerifier, SignatureVerifier};

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for account implementations.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte digest and returns the 65-byte `r || s || v` signature.
	async fn sign_hash(&self, hash: &B256) -> Result<Vec<u8>, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that signs permit digests for one account.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs the EIP-712 digest of `struct_hash` under `domain_separator`.
	pub async fn sign_typed(
		&self,
		domain_separator: &B256,
		struct_hash: &B256,
	) -> Result<Vec<u8>, AccountError> {
		let digest = permit2_types::utils::compute_final_digest(domain_separator, struct_hash);
		self.implementation.sign_hash(&digest).await
	}
}

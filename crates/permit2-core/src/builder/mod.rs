//! Builder pattern for constructing Permit2 engines.
//!
//! Composes a [`Permit2Engine`] from the configured storage and token
//! implementations, looked up by name in the supplied factory maps.

use crate::engine::{event_bus::EventBus, Permit2Engine};
use permit2_account::{EcdsaVerifier, SignatureVerifier};
use permit2_config::Config;
use permit2_storage::{StorageError, StorageInterface, StorageService};
use permit2_token::{TokenError, TokenInterface, TokenService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation name.
pub struct Permit2Factories<SF, TF> {
	pub storage_factories: HashMap<String, SF>,
	pub token_factories: HashMap<String, TF>,
}

/// Builder for constructing a Permit2Engine with pluggable implementations.
pub struct Permit2Builder {
	config: Config,
	verifier: Arc<dyn SignatureVerifier>,
	event_capacity: usize,
}

impl Permit2Builder {
	/// Creates a builder that verifies signatures with secp256k1 ECDSA.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			verifier: Arc::new(EcdsaVerifier),
			event_capacity: 1000,
		}
	}

	/// Replaces the signature verification primitive.
	pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
		self.verifier = verifier;
		self
	}

	/// Sets how many events a lagging subscriber may fall behind.
	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity.max(1);
		self
	}

	/// Builds the engine, creating only the primary implementation of each component.
	pub fn build<SF, TF>(self, factories: Permit2Factories<SF, TF>) -> Result<Permit2Engine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		TF: Fn(&toml::Value) -> Result<Box<dyn TokenInterface>, TokenError>,
	{
		let storage_backend = create_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let token_impl = create_primary(
			"token",
			&self.config.token.primary,
			&self.config.token.implementations,
			&factories.token_factories,
		)?;

		let storage = Arc::new(StorageService::new(storage_backend));
		let token = Arc::new(TokenService::new(token_impl));

		Ok(Permit2Engine::new(
			self.config,
			storage,
			token,
			self.verifier,
			EventBus::new(self.event_capacity),
		))
	}
}

fn create_primary<T: ?Sized, E: std::fmt::Display, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let config = implementations.get(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' has no configuration",
			component, primary
		))
	})?;
	let factory = factories.get(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"No {} implementation named '{}'",
			component, primary
		))
	})?;

	match factory(config) {
		Ok(implementation) => {
			tracing::info!(component, implementation = %primary, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component,
				implementation = %primary,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, primary, e
			)))
		},
	}
}

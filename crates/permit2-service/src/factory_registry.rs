//! Factory registry for Permit2 implementations.
//!
//! Collects the factories every implementation crate registers, so that
//! configuration can select backends by name.

use permit2_account::{AccountError, AccountFactory, AccountService};
use permit2_config::Config;
use permit2_core::{Permit2Builder, Permit2Engine, Permit2Factories};
use permit2_storage::StorageFactory;
use permit2_token::TokenFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Registry of all implementation factories, keyed by implementation name.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub token: HashMap<String, TokenFactory>,
	pub account: HashMap<String, AccountFactory>,
}

impl FactoryRegistry {
	fn new() -> Self {
		Self {
			storage: permit2_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			token: permit2_token::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			account: permit2_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the process-wide registry.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(FactoryRegistry::new)
}

/// Builds an engine from configuration with every registered implementation.
pub fn build_engine(config: Config) -> Result<Permit2Engine, Box<dyn std::error::Error>> {
	let registry = get_registry();
	let factories = Permit2Factories {
		storage_factories: registry.storage.clone(),
		token_factories: registry.token.clone(),
	};
	Ok(Permit2Builder::new(config).build(factories)?)
}

/// Builds the configured signing account, if the configuration has one.
pub fn build_account(config: &Config) -> Result<Option<AccountService>, AccountError> {
	let Some(account) = &config.account else {
		return Ok(None);
	};
	let settings = account.implementations.get(&account.primary).ok_or_else(|| {
		AccountError::InvalidKey(format!("No configuration for account '{}'", account.primary))
	})?;
	let factory = get_registry().account.get(&account.primary).ok_or_else(|| {
		AccountError::InvalidKey(format!("Unknown account implementation '{}'", account.primary))
	})?;
	tracing::info!(component = "account", implementation = %account.primary, "Loaded");
	Ok(Some(AccountService::new(factory(settings)?)))
}

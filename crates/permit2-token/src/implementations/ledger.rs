//! In-memory token ledger.
//!
//! Keeps balances for any number of tokens in one map. Balances can be
//! seeded from configuration, which makes scripted runs reproducible:
//!
//! ```toml
//! [token.implementations.ledger]
//! balances = [
//!   { token = "0x...", owner = "0x...", amount = "1000" },
//! ]
//! ```

use crate::{TokenError, TokenFactory, TokenInterface, TokenMove, TokenRegistry};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use permit2_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Balance ledger keyed by (token, owner).
#[derive(Default)]
pub struct LedgerToken {
	balances: RwLock<HashMap<(Address, Address), U256>>,
}

impl LedgerToken {
	pub fn new() -> Self {
		Self::default()
	}

	/// Credits `amount` of `token` to `owner`.
	pub async fn mint(&self, token: Address, owner: Address, amount: U256) -> Result<(), TokenError> {
		let mut balances = self.balances.write().await;
		let balance = balances.entry((token, owner)).or_default();
		*balance = balance
			.checked_add(amount)
			.ok_or(TokenError::Overflow { token, owner })?;
		Ok(())
	}
}

#[async_trait]
impl TokenInterface for LedgerToken {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LedgerTokenSchema)
	}

	async fn move_values(&self, moves: &[TokenMove]) -> Result<(), TokenError> {
		let mut balances = self.balances.write().await;

		// Balances touched by this batch; written back only if every move fits.
		let mut staged: HashMap<(Address, Address), U256> = HashMap::new();
		for TokenMove {
			token,
			from,
			to,
			amount,
		} in moves.iter().copied()
		{
			let current = |staged: &HashMap<_, U256>, owner: Address| {
				staged
					.get(&(token, owner))
					.or_else(|| balances.get(&(token, owner)))
					.copied()
					.unwrap_or_default()
			};

			let from_balance = current(&staged, from);
			let remaining =
				from_balance
					.checked_sub(amount)
					.ok_or(TokenError::InsufficientBalance {
						token,
						owner: from,
						balance: from_balance,
						needed: amount,
					})?;
			if from == to {
				continue;
			}
			let credited = current(&staged, to)
				.checked_add(amount)
				.ok_or(TokenError::Overflow { token, owner: to })?;

			staged.insert((token, from), remaining);
			staged.insert((token, to), credited);
		}

		balances.extend(staged);
		Ok(())
	}

	async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, TokenError> {
		let balances = self.balances.read().await;
		Ok(balances.get(&(token, owner)).copied().unwrap_or_default())
	}
}

/// Configuration schema for LedgerToken.
pub struct LedgerTokenSchema;

impl ConfigSchema for LedgerTokenSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let entry = Schema::new(
			vec![
				Field::new("token", FieldType::Address),
				Field::new("owner", FieldType::Address),
				Field::new("amount", FieldType::Amount),
			],
			vec![],
		);
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"balances",
				FieldType::Array(Box::new(FieldType::Table(entry))),
			)],
		);
		schema.validate(config)
	}
}

fn parse_entry(entry: &toml::Value) -> Result<(Address, Address, U256), TokenError> {
	let field = |name: &str| {
		entry
			.get(name)
			.and_then(|v| v.as_str())
			.ok_or_else(|| TokenError::Configuration(format!("balance entry missing '{}'", name)))
	};
	let token = field("token")?
		.parse::<Address>()
		.map_err(|e| TokenError::Configuration(e.to_string()))?;
	let owner = field("owner")?
		.parse::<Address>()
		.map_err(|e| TokenError::Configuration(e.to_string()))?;
	let amount = field("amount")?
		.parse::<U256>()
		.map_err(|e| TokenError::Configuration(e.to_string()))?;
	Ok((token, owner, amount))
}

/// Factory function to create a ledger from configuration.
///
/// Configuration parameters:
/// - `balances`: optional array of `{ token, owner, amount }` initial balances
pub fn create_token(config: &toml::Value) -> Result<Box<dyn TokenInterface>, TokenError> {
	LedgerTokenSchema
		.validate(config)
		.map_err(|e| TokenError::Configuration(e.to_string()))?;

	let mut balances: HashMap<(Address, Address), U256> = HashMap::new();
	if let Some(entries) = config.get("balances").and_then(|v| v.as_array()) {
		for entry in entries {
			let (token, owner, amount) = parse_entry(entry)?;
			let balance = balances.entry((token, owner)).or_default();
			*balance = balance
				.checked_add(amount)
				.ok_or(TokenError::Overflow { token, owner })?;
		}
	}
	tracing::debug!(seeded = balances.len(), "Created token ledger");

	Ok(Box::new(LedgerToken {
		balances: RwLock::new(balances),
	}))
}

/// Registry for the ledger token implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "ledger";
	type Factory = TokenFactory;

	fn factory() -> Self::Factory {
		create_token
	}
}

impl TokenRegistry for Registry {}

//! Configuration module for the Permit2 engine.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`; they are substituted before
//! parsing. The parsed configuration is validated before it is returned.

use alloy_primitives::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the Permit2 engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// EIP-712 domain every signature is bound to.
	pub domain: DomainConfig,
	/// Sentinel policy for allowances.
	#[serde(default)]
	pub allowance: AllowanceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the token transfer primitive.
	pub token: TokenConfig,
	/// Signing account used by tooling. Not needed by the engine itself.
	pub account: Option<AccountConfig>,
}

/// EIP-712 domain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
	/// Protocol name, "Permit2" unless overridden.
	#[serde(default = "default_domain_name")]
	pub name: String,
	/// Protocol version.
	#[serde(default = "default_domain_version")]
	pub version: String,
	/// Chain the deployment lives on.
	pub chain_id: u64,
	/// Address identifying this deployment.
	pub verifying_contract: Address,
}

fn default_domain_name() -> String {
	"Permit2".to_string()
}

fn default_domain_version() -> String {
	"1".to_string()
}

/// How a zero expiration passed to `approve` or a permit is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroExpiration {
	/// Store zero as given; the allowance is expired from any later timestamp.
	#[default]
	Literal,
	/// Replace zero with the timestamp of the granting call.
	CurrentTimestamp,
}

/// Allowance sentinel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllowanceConfig {
	/// When true, an allowance of `U256::MAX` is never decremented.
	#[serde(default = "default_unlimited_amount")]
	pub unlimited_amount: bool,
	#[serde(default)]
	pub zero_expiration: ZeroExpiration,
}

impl Default for AllowanceConfig {
	fn default() -> Self {
		Self {
			unlimited_amount: default_unlimited_amount(),
			zero_expiration: ZeroExpiration::default(),
		}
	}
}

fn default_unlimited_amount() -> bool {
	true
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the token transfer primitive.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of token implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the signing account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Bounded input keeps the regex scan cheap.
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.domain.name.is_empty() {
			return Err(ConfigError::Validation("Domain name cannot be empty".into()));
		}
		if self.domain.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Domain chain_id must be greater than 0".into(),
			));
		}
		if self.domain.verifying_contract.is_zero() {
			return Err(ConfigError::Validation(
				"Domain verifying_contract cannot be the zero address".into(),
			));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_primary("token", &self.token.primary, &self.token.implementations)?;
		if let Some(account) = &self.account {
			validate_primary("account", &account.primary, &account.implementations)?;
		}

		Ok(())
	}

	/// Minimal in-memory configuration for tests.
	#[cfg(any(test, feature = "testing"))]
	pub fn for_testing(chain_id: u64, verifying_contract: Address) -> Self {
		let empty = || toml::Value::Table(toml::map::Map::new());
		Self {
			domain: DomainConfig {
				name: default_domain_name(),
				version: default_domain_version(),
				chain_id,
				verifying_contract,
			},
			allowance: AllowanceConfig::default(),
			storage: StorageConfig {
				primary: "memory".into(),
				implementations: HashMap::from([("memory".to_string(), empty())]),
			},
			token: TokenConfig {
				primary: "ledger".into(),
				implementations: HashMap::from([("ledger".to_string(), empty())]),
			},
			account: None,
		}
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses TOML, resolving environment variables first and validating after.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[domain]
chain_id = 1
verifying_contract = "0x000000000022D473030F116dDEE9F6B43aC78BA3"

[storage]
primary = "memory"
[storage.implementations.memory]

[token]
primary = "ledger"
[token.implementations.ledger]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("PERMIT2_TEST_HOST", "localhost");
		std::env::set_var("PERMIT2_TEST_PORT", "5432");

		let input = "host = \"${PERMIT2_TEST_HOST}:${PERMIT2_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("PERMIT2_TEST_HOST");
		std::env::remove_var("PERMIT2_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${PERMIT2_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${PERMIT2_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("PERMIT2_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.domain.name, "Permit2");
		assert_eq!(config.domain.version, "1");
		assert!(config.allowance.unlimited_amount);
		assert_eq!(config.allowance.zero_expiration, ZeroExpiration::Literal);
		assert!(config.account.is_none());
	}

	#[test]
	fn test_allowance_policy_parsed() {
		let input = format!(
			"{}\n[allowance]\nunlimited_amount = false\nzero_expiration = \"current_timestamp\"\n",
			BASE
		);
		let config: Config = input.parse().unwrap();
		assert!(!config.allowance.unlimited_amount);
		assert_eq!(
			config.allowance.zero_expiration,
			ZeroExpiration::CurrentTimestamp
		);
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let input = BASE.replace("chain_id = 1", "chain_id = 0");
		let err = Config::from_str(&input).unwrap_err();
		assert!(err.to_string().contains("chain_id"));
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let input = BASE.replace("primary = \"memory\"", "primary = \"redis\"");
		let err = Config::from_str(&input).unwrap_err();
		assert!(
			err.to_string()
				.contains("Primary storage 'redis' not found in implementations"),
			"{}",
			err
		);
	}

	#[test]
	fn test_bad_address_is_parse_error() {
		let input = BASE.replace(
			"0x000000000022D473030F116dDEE9F6B43aC78BA3",
			"not-an-address",
		);
		assert!(matches!(
			Config::from_str(&input),
			Err(ConfigError::Parse(_))
		));
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("permit2.toml");
		std::fs::write(&path, BASE).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.domain.chain_id, 1);

		let missing = Config::from_file(dir.path().join("missing.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}

//! Main entry point for the Permit2 command-line tool.
//!
//! Loads an engine configuration and either computes signing material for
//! permit messages or runs a script of calls against a freshly built engine.

use clap::{Parser, Subcommand};
use permit2_account::implementations::local::LocalAccount;
use permit2_account::AccountService;
use permit2_config::Config;
use permit2_types::utils::compute_domain_hash;
use permit2_types::B256;
use std::path::{Path, PathBuf};

mod factory_registry;
mod message;
mod script;

use message::TypedMessage;

/// Command-line arguments for the Permit2 tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the domain separator of the configured deployment.
	Domain,
	/// Print the EIP-712 digest of a permit message.
	Digest {
		/// JSON message file
		message: PathBuf,
	},
	/// Sign a permit message and print the 65-byte signature.
	Sign {
		/// Hex private key; defaults to the configured account
		#[arg(long, env = "PERMIT2_PRIVATE_KEY", hide_env_values = true)]
		private_key: Option<String>,
		/// JSON message file
		message: PathBuf,
	},
	/// Execute a JSON script of calls and print results and events as JSON lines.
	Run {
		/// JSON script file
		script: PathBuf,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Output goes to stdout, so logs go to stderr.
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		chain_id = config.domain.chain_id,
		verifying_contract = %config.domain.verifying_contract,
		"Loaded configuration"
	);

	match args.command {
		Command::Domain => {
			println!("{}", domain_separator(&config));
		},
		Command::Digest { message } => {
			let message = read_message(&message).await?;
			println!("{}", message.digest(&domain_separator(&config)));
		},
		Command::Sign {
			private_key,
			message,
		} => {
			let message = read_message(&message).await?;
			let account = match private_key {
				Some(key) => AccountService::new(Box::new(LocalAccount::new(&key)?)),
				None => factory_registry::build_account(&config)?
					.ok_or("No --private-key given and no [account] configured")?,
			};
			let signer = account.get_address().await?;
			let signature = account
				.sign_typed(&domain_separator(&config), &message.struct_hash())
				.await?;
			tracing::info!(signer = %signer, "Signed message");
			println!("0x{}", alloy_primitives::hex::encode(signature));
		},
		Command::Run { script: path } => {
			let input = tokio::fs::read_to_string(&path).await?;
			let steps = script::parse_script(&input)?;
			let engine = factory_registry::build_engine(config)?;
			tracing::info!(steps = steps.len(), "Running script");

			for line in script::run_script(&engine, &steps).await {
				println!("{}", serde_json::to_string(&line)?);
			}
		},
	}

	Ok(())
}

fn domain_separator(config: &Config) -> B256 {
	compute_domain_hash(
		&config.domain.name,
		&config.domain.version,
		config.domain.chain_id,
		&config.domain.verifying_contract,
	)
}

async fn read_message(path: &Path) -> Result<TypedMessage, Box<dyn std::error::Error>> {
	let input = tokio::fs::read_to_string(path).await?;
	Ok(serde_json::from_str(&input)?)
}

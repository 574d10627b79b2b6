//! The Permit2 engine.
//!
//! [`Permit2Engine`] owns the collaborators every component shares: the typed
//! storage service, the token transfer primitive, the signature verifier and
//! the event bus. Component operations live in their own modules as `impl`
//! blocks on the engine.

pub mod allowance;
pub mod context;
pub mod event_bus;
pub mod nonces;
pub mod signature;

use crate::state::Journal;
use crate::Permit2Error;
use event_bus::EventBus;
use permit2_account::SignatureVerifier;
use permit2_config::{AllowanceConfig, Config, ZeroExpiration};
use permit2_storage::StorageService;
use permit2_token::{TokenMove, TokenService};
use permit2_types::utils::compute_domain_hash;
use permit2_types::{Address, B256, U256};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Main Permit2 engine.
pub struct Permit2Engine {
	/// Engine configuration.
	config: Config,
	/// Domain separator derived once from the configured domain.
	domain_separator: B256,
	/// Storage service holding allowances and nonce bitmaps.
	storage: Arc<StorageService>,
	/// External transfer primitive.
	token: Arc<TokenService>,
	/// Verification primitive for owner signatures.
	verifier: Arc<dyn SignatureVerifier>,
	/// Event bus for committed events.
	event_bus: EventBus,
	/// Serializes calls so no two interleave their reads and writes.
	call_lock: Mutex<()>,
}

impl Permit2Engine {
	/// Creates a new engine with the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		token: Arc<TokenService>,
		verifier: Arc<dyn SignatureVerifier>,
		event_bus: EventBus,
	) -> Self {
		let domain_separator = compute_domain_hash(
			&config.domain.name,
			&config.domain.version,
			config.domain.chain_id,
			&config.domain.verifying_contract,
		);
		tracing::debug!(
			chain_id = config.domain.chain_id,
			verifying_contract = %config.domain.verifying_contract,
			domain_separator = %domain_separator,
			"Computed domain separator"
		);

		Self {
			config,
			domain_separator,
			storage,
			token,
			verifier,
			event_bus,
			call_lock: Mutex::new(()),
		}
	}

	/// Domain separator every signature is bound to.
	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn token(&self) -> &Arc<TokenService> {
		&self.token
	}

	fn policy(&self) -> &AllowanceConfig {
		&self.config.allowance
	}

	/// Whether `amount` is the unlimited sentinel that transfers never decrement.
	fn is_unlimited(&self, amount: U256) -> bool {
		self.policy().unlimited_amount && amount == U256::MAX
	}

	/// Expiration to store for a grant made at `now`.
	fn stored_expiration(&self, expiration: u64, now: u64) -> u64 {
		match (self.policy().zero_expiration, expiration) {
			(ZeroExpiration::CurrentTimestamp, 0) => now,
			_ => expiration,
		}
	}

	/// Asks the verifier whether `owner` signed `struct_hash` under this domain.
	fn verify_signature(
		&self,
		owner: &Address,
		struct_hash: &B256,
		signature: &[u8],
	) -> Result<(), Permit2Error> {
		if self
			.verifier
			.verify(owner, &self.domain_separator, struct_hash, signature)
		{
			Ok(())
		} else {
			tracing::warn!(owner = %owner, "Signature rejected");
			Err(Permit2Error::SignatureInvalid)
		}
	}

	/// Runs `op` as one serialized call against a fresh journal.
	async fn transact<'s, T, F, Fut>(&'s self, op: F) -> Result<T, Permit2Error>
	where
		F: FnOnce(Journal<'s>) -> Fut,
		Fut: Future<Output = Result<(T, Journal<'s>), Permit2Error>>,
	{
		let _guard = self.call_lock.lock().await;
		self.apply(op).await
	}

	/// Runs `op` against a fresh journal and commits it only if `op` succeeds.
	/// The caller must hold `call_lock`.
	///
	/// Committed events are published on the bus in emission order.
	async fn apply<'s, T, F, Fut>(&'s self, op: F) -> Result<T, Permit2Error>
	where
		F: FnOnce(Journal<'s>) -> Fut,
		Fut: Future<Output = Result<(T, Journal<'s>), Permit2Error>>,
	{
		let (value, journal) = op(Journal::new(&self.storage)).await?;
		let committed = journal.commit().await?;
		self.publish(committed.into_events());
		Ok(value)
	}

	/// Like [`Self::apply`], for calls that end in token moves.
	///
	/// The journal is committed before any value moves, so a consumed nonce or
	/// spent allowance is durable by the time tokens leave the owner. The moves
	/// are then applied all at once; if they fail, the commit is reverted. A
	/// revert that fails keeps the nonce consumed and the allowance spent.
	/// The caller must hold `call_lock`.
	async fn settle<'s, T, F, Fut>(&'s self, op: F) -> Result<T, Permit2Error>
	where
		F: FnOnce(Journal<'s>) -> Fut,
		Fut: Future<Output = Result<(T, Journal<'s>, Vec<TokenMove>), Permit2Error>>,
	{
		let (value, journal, moves) = op(Journal::new(&self.storage)).await?;
		let committed = journal.commit().await?;

		if let Err(e) = self.token.transfer_all(&moves).await {
			tracing::warn!(error = %e, moves = moves.len(), "Token transfer failed, reverting call");
			if let Err(revert) = committed.revert().await {
				tracing::error!(error = %revert, "Revert failed, authorization stays consumed");
			}
			return Err(e.into());
		}
		self.publish(committed.into_events());
		Ok(value)
	}

	fn publish(&self, events: Vec<permit2_types::Permit2Event>) {
		for event in events {
			tracing::debug!(event = event.name(), "Emitting event");
			self.event_bus.publish(event);
		}
	}

	/// Read-only view of committed state, serialized with mutating calls.
	async fn read<'s, T, F, Fut>(&'s self, op: F) -> Result<T, Permit2Error>
	where
		F: FnOnce(Journal<'s>) -> Fut,
		Fut: Future<Output = Result<T, Permit2Error>>,
	{
		let _guard = self.call_lock.lock().await;
		op(Journal::new(&self.storage)).await
	}
}

/// Fails with [`Permit2Error::ExpiredSignature`] once `now` is past `deadline`.
fn check_deadline(deadline: U256, now: u64) -> Result<(), Permit2Error> {
	if U256::from(now) > deadline {
		tracing::warn!(%deadline, now, "Signature expired");
		return Err(Permit2Error::ExpiredSignature { deadline });
	}
	Ok(())
}

/// Fixtures shared by the component tests.
#[cfg(test)]
pub(crate) mod testing {
	use super::context::CallContext;
	use super::*;
	use async_trait::async_trait;
	use permit2_account::implementations::local::LocalAccount;
	use permit2_account::EcdsaVerifier;
	use permit2_storage::implementations::memory::MemoryStorage;
	use permit2_storage::{StorageError, StorageInterface};
	use permit2_token::implementations::ledger::LedgerToken;
	use permit2_types::ConfigSchema;
	use std::sync::atomic::{AtomicUsize, Ordering};

	pub const CHAIN_ID: u64 = 1;
	pub const NOW: u64 = 1_700_000_000;

	pub fn addr(b: u8) -> Address {
		Address::repeat_byte(b)
	}

	pub fn token_a() -> Address {
		addr(0xa1)
	}

	pub fn token_b() -> Address {
		addr(0xb2)
	}

	pub fn token_c() -> Address {
		addr(0xc3)
	}

	pub fn verifying_contract() -> Address {
		addr(0x22)
	}

	pub struct Harness {
		pub engine: Permit2Engine,
		pub owner: LocalAccount,
	}

	impl Harness {
		pub fn owner_address(&self) -> Address {
			self.owner.address_sync()
		}

		pub fn owner_ctx(&self) -> CallContext {
			CallContext::new(self.owner_address(), NOW)
		}

		/// Signs `struct_hash` as the owner under the engine's domain.
		pub fn sign(&self, struct_hash: &B256) -> Vec<u8> {
			let digest = permit2_types::utils::compute_final_digest(
				&self.engine.domain_separator(),
				struct_hash,
			);
			self.owner.sign_hash_sync(&digest).unwrap()
		}

		pub async fn balance(&self, token: Address, holder: Address) -> U256 {
			self.engine.token().balance_of(token, holder).await.unwrap()
		}
	}

	pub async fn harness() -> Harness {
		harness_with(AllowanceConfig::default()).await
	}

	/// Engine over memory storage and a ledger funding the owner with 1000
	/// of each test token.
	pub async fn harness_with(policy: AllowanceConfig) -> Harness {
		harness_on(policy, Box::new(MemoryStorage::new())).await
	}

	pub async fn harness_on(policy: AllowanceConfig, backend: Box<dyn StorageInterface>) -> Harness {
		let owner = LocalAccount::random();
		let ledger = LedgerToken::new();
		for token in [token_a(), token_b(), token_c()] {
			ledger
				.mint(token, owner.address_sync(), U256::from(1_000))
				.await
				.unwrap();
		}

		let mut config = Config::for_testing(CHAIN_ID, verifying_contract());
		config.allowance = policy;

		let engine = Permit2Engine::new(
			config,
			Arc::new(StorageService::new(backend)),
			Arc::new(TokenService::new(Box::new(ledger))),
			Arc::new(EcdsaVerifier),
			EventBus::new(64),
		);
		Harness { engine, owner }
	}

	/// Memory storage whose `n`-th write (counting from zero) fails.
	pub struct FailingWrite {
		inner: MemoryStorage,
		fail_at: usize,
		writes: AtomicUsize,
	}

	impl FailingWrite {
		pub fn new(fail_at: usize) -> Self {
			Self {
				inner: MemoryStorage::new(),
				fail_at,
				writes: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl StorageInterface for FailingWrite {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			if self.writes.fetch_add(1, Ordering::SeqCst) == self.fail_at {
				return Err(StorageError::Backend("disk full".into()));
			}
			self.inner.set_bytes(key, value).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.inner.config_schema()
		}
	}

	/// Drains every event currently buffered for `rx`.
	pub fn drain(
		rx: &mut tokio::sync::broadcast::Receiver<permit2_types::Permit2Event>,
	) -> Vec<permit2_types::Permit2Event> {
		let mut events = Vec::new();
		while let Ok(event) = rx.try_recv() {
			events.push(event);
		}
		events
	}
}

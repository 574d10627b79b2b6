//! Registry trait for self-registering implementations.
//!
//! Every pluggable backend (storage, token ledger) exposes a `Registry`
//! struct naming the key it answers to under `<section>.implementations`
//! and the factory that builds it from that TOML table.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}

//! Staged reads and writes for a single call.

use permit2_storage::{StorageError, StorageService};
use permit2_types::{
	allowance_id, nonce_bitmap_id, Address, PackedAllowance, Permit2Event, StorageKey, U256,
};
use std::collections::HashMap;

/// Write-back overlay over the storage service.
///
/// Reads see the call's own staged writes first. Dropping a journal without
/// calling [`Journal::commit`] discards every write and event it staged.
pub struct Journal<'a> {
	storage: &'a StorageService,
	allowances: HashMap<String, PackedAllowance>,
	bitmaps: HashMap<String, U256>,
	events: Vec<Permit2Event>,
}

impl<'a> Journal<'a> {
	pub fn new(storage: &'a StorageService) -> Self {
		Self {
			storage,
			allowances: HashMap::new(),
			bitmaps: HashMap::new(),
			events: Vec::new(),
		}
	}

	/// Current allowance for the triple; an absent record reads as all zeroes.
	pub async fn allowance(
		&self,
		owner: &Address,
		token: &Address,
		spender: &Address,
	) -> Result<PackedAllowance, StorageError> {
		let id = allowance_id(owner, token, spender);
		if let Some(staged) = self.allowances.get(&id) {
			return Ok(*staged);
		}
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Allowances, &id)
			.await?
			.unwrap_or_default())
	}

	pub fn set_allowance(
		&mut self,
		owner: &Address,
		token: &Address,
		spender: &Address,
		record: PackedAllowance,
	) {
		self.allowances
			.insert(allowance_id(owner, token, spender), record);
	}

	/// Current bitmap word for the nonce space; an absent word reads as zero.
	pub async fn nonce_bitmap(
		&self,
		owner: &Address,
		nonce_space: &U256,
	) -> Result<U256, StorageError> {
		let id = nonce_bitmap_id(owner, nonce_space);
		if let Some(staged) = self.bitmaps.get(&id) {
			return Ok(*staged);
		}
		Ok(self
			.storage
			.retrieve_optional(StorageKey::NonceBitmaps, &id)
			.await?
			.unwrap_or_default())
	}

	pub fn set_nonce_bitmap(&mut self, owner: &Address, nonce_space: &U256, word: U256) {
		self.bitmaps
			.insert(nonce_bitmap_id(owner, nonce_space), word);
	}

	/// Queues an event for publication after commit.
	pub fn emit(&mut self, event: impl Into<Permit2Event>) {
		self.events.push(event.into());
	}

	/// Writes every staged record to storage.
	///
	/// The value each write replaced is kept so the call can be undone with
	/// [`Committed::revert`]. If a write fails, the writes before it are rolled
	/// back before the error is returned. A rollback that fails itself is
	/// logged and leaves those writes in place.
	pub async fn commit(self) -> Result<Committed<'a>, StorageError> {
		let mut undo = Vec::with_capacity(self.allowances.len() + self.bitmaps.len());
		if let Err(e) = self.write_all(&mut undo).await {
			tracing::warn!(error = %e, written = undo.len(), "Commit failed, rolling back");
			if let Err(rollback) = restore(self.storage, undo).await {
				tracing::error!(error = %rollback, "Rollback failed, storage holds a partial commit");
			}
			return Err(e);
		}
		tracing::trace!(
			allowances = self.allowances.len(),
			bitmaps = self.bitmaps.len(),
			events = self.events.len(),
			"Committed journal"
		);
		Ok(Committed {
			storage: self.storage,
			undo,
			events: self.events,
		})
	}

	async fn write_all(&self, undo: &mut Vec<Undo>) -> Result<(), StorageError> {
		for (id, record) in &self.allowances {
			let previous = self
				.storage
				.retrieve_optional(StorageKey::Allowances, id)
				.await?;
			self.storage
				.store(StorageKey::Allowances, id, record)
				.await?;
			undo.push(Undo::Allowance {
				id: id.clone(),
				previous,
			});
		}
		for (id, word) in &self.bitmaps {
			let previous = self
				.storage
				.retrieve_optional(StorageKey::NonceBitmaps, id)
				.await?;
			self.storage
				.store(StorageKey::NonceBitmaps, id, word)
				.await?;
			undo.push(Undo::Bitmap {
				id: id.clone(),
				previous,
			});
		}
		Ok(())
	}
}

/// Value a committed write replaced; `None` when the key was absent.
enum Undo {
	Allowance {
		id: String,
		previous: Option<PackedAllowance>,
	},
	Bitmap {
		id: String,
		previous: Option<U256>,
	},
}

/// A journal whose writes have reached storage.
pub struct Committed<'a> {
	storage: &'a StorageService,
	undo: Vec<Undo>,
	events: Vec<Permit2Event>,
}

impl Committed<'_> {
	/// Events queued by the call, in emission order.
	pub fn into_events(self) -> Vec<Permit2Event> {
		self.events
	}

	/// Puts back every value the commit replaced and drops the events.
	pub async fn revert(self) -> Result<(), StorageError> {
		restore(self.storage, self.undo).await
	}
}

async fn restore(storage: &StorageService, undo: Vec<Undo>) -> Result<(), StorageError> {
	for entry in undo.into_iter().rev() {
		match entry {
			Undo::Allowance {
				id,
				previous: Some(record),
			} => storage.store(StorageKey::Allowances, &id, &record).await?,
			Undo::Allowance { id, previous: None } => {
				storage.remove(StorageKey::Allowances, &id).await?
			},
			Undo::Bitmap {
				id,
				previous: Some(word),
			} => storage.store(StorageKey::NonceBitmaps, &id, &word).await?,
			Undo::Bitmap { id, previous: None } => {
				storage.remove(StorageKey::NonceBitmaps, &id).await?
			},
		}
	}
	Ok(())
}

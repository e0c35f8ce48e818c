//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, Connection, FarmId, TokenRecord},
	store::{CompareAndSwapOutcome, StoreError, StoreFuture, StoreSnapshot, TokenStore},
};

type SharedSnapshot = Arc<RwLock<StoreSnapshot>>;

/// Thread-safe storage backend that keeps every key in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedSnapshot);
impl MemoryStore {
	/// Returns a copy of everything currently stored.
	pub fn snapshot(&self) -> StoreSnapshot {
		self.0.read().clone()
	}

	fn read_now<T>(
		snapshot: SharedSnapshot,
		f: impl FnOnce(&StoreSnapshot) -> T,
	) -> Result<T, StoreError> {
		Ok(f(&snapshot.read()))
	}

	fn write_now<T>(
		snapshot: SharedSnapshot,
		f: impl FnOnce(&mut StoreSnapshot) -> T,
	) -> Result<T, StoreError> {
		Ok(f(&mut snapshot.write()))
	}
}
impl TokenStore for MemoryStore {
	fn fetch_token(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::read_now(snapshot, |s| s.token.clone()) })
	}

	fn save_token(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| s.token = Some(record)) })
	}

	fn compare_and_swap_token(
		&self,
		expected_expires_at: OffsetDateTime,
		replacement: TokenRecord,
	) -> StoreFuture<'_, CompareAndSwapOutcome> {
		let snapshot = self.0.clone();

		Box::pin(async move {
			Self::write_now(snapshot, |s| s.compare_and_swap(expected_expires_at, replacement))
		})
	}

	fn delete_token(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| s.token.take()) })
	}

	fn fetch_connection(&self) -> StoreFuture<'_, Connection> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::read_now(snapshot, StoreSnapshot::connection) })
	}

	fn save_account_id(&self, account_id: AccountId) -> StoreFuture<'_, ()> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| s.account_id = Some(account_id)) })
	}

	fn save_farm_id(&self, farm_id: FarmId) -> StoreFuture<'_, ()> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| s.farm_id = Some(farm_id)) })
	}

	fn authorization_state(&self) -> StoreFuture<'_, Option<String>> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::read_now(snapshot, |s| s.authorization_state.clone()) })
	}

	fn save_authorization_state(&self, state: String) -> StoreFuture<'_, ()> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| s.authorization_state = Some(state)) })
	}

	fn take_authorization_state(&self) -> StoreFuture<'_, Option<String>> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| s.authorization_state.take()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let snapshot = self.0.clone();

		Box::pin(async move { Self::write_now(snapshot, |s| *s = StoreSnapshot::default()) })
	}
}

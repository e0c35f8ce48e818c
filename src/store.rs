//! Storage contracts and built-in stores for the token, connection ids, and pending nonce.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccountId, Connection, FarmId, TokenRecord},
};

/// Boxed future returned by every [`TokenStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key-value contract backing the token manager.
///
/// Persisted keys are `token`, `account_id`, `farm_id`, and `authorization_state`.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the current token, if any.
	fn fetch_token(&self) -> StoreFuture<'_, Option<TokenRecord>>;

	/// Persists or replaces the token wholesale.
	fn save_token(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Replaces the token only if the stored `expires_at` still equals `expected_expires_at`.
	fn compare_and_swap_token(
		&self,
		expected_expires_at: OffsetDateTime,
		replacement: TokenRecord,
	) -> StoreFuture<'_, CompareAndSwapOutcome>;

	/// Removes the token, returning the previous value.
	fn delete_token(&self) -> StoreFuture<'_, Option<TokenRecord>>;

	/// Fetches the stored account and farm identifiers.
	fn fetch_connection(&self) -> StoreFuture<'_, Connection>;

	/// Stores the connected account identifier.
	fn save_account_id(&self, account_id: AccountId) -> StoreFuture<'_, ()>;

	/// Stores the selected farm identifier.
	fn save_farm_id(&self, farm_id: FarmId) -> StoreFuture<'_, ()>;

	/// Returns the pending authorization nonce without consuming it.
	fn authorization_state(&self) -> StoreFuture<'_, Option<String>>;

	/// Stores the pending authorization nonce.
	fn save_authorization_state(&self, state: String) -> StoreFuture<'_, ()>;

	/// Removes and returns the pending authorization nonce.
	fn take_authorization_state(&self) -> StoreFuture<'_, Option<String>>;

	/// Deletes every persisted key.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Result of a token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The stored expiry matched and the token was replaced.
	Updated,
	/// A token exists but its expiry differs (someone else refreshed it).
	ExpiryMismatch,
	/// No token is stored.
	Missing,
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A write would violate a uniqueness constraint.
	#[error("Conflict: {message}.")]
	Conflict {
		/// Human-readable error payload.
		message: String,
	},
}

/// Full set of persisted keys, shared by the bundled backends.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
	/// Current token.
	#[serde(default)]
	pub token: Option<TokenRecord>,
	/// Connected account.
	#[serde(default)]
	pub account_id: Option<AccountId>,
	/// Selected farm.
	#[serde(default)]
	pub farm_id: Option<FarmId>,
	/// Pending authorization nonce.
	#[serde(default)]
	pub authorization_state: Option<String>,
}
impl StoreSnapshot {
	/// Applies a compare-and-swap on the token's `expires_at`.
	pub fn compare_and_swap(
		&mut self,
		expected_expires_at: OffsetDateTime,
		replacement: TokenRecord,
	) -> CompareAndSwapOutcome {
		let outcome = match &self.token {
			Some(existing) if existing.expires_at == expected_expires_at =>
				CompareAndSwapOutcome::Updated,
			Some(_) => CompareAndSwapOutcome::ExpiryMismatch,
			None => CompareAndSwapOutcome::Missing,
		};

		if matches!(outcome, CompareAndSwapOutcome::Updated) {
			self.token = Some(replacement);
		}

		outcome
	}

	/// Returns the stored connection identifiers.
	pub fn connection(&self) -> Connection {
		Connection { account_id: self.account_id, farm_id: self.farm_id }
	}
}

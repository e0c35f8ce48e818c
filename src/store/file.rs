//! File-backed [`TokenStore`] that persists a JSON snapshot after each mutation.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccountId, Connection, FarmId, TokenRecord},
	store::{CompareAndSwapOutcome, StoreError, StoreFuture, StoreSnapshot, TokenStore},
};

/// Persists every key to a single JSON file, replaced atomically via a temp file + rename.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<StoreSnapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<StoreSnapshot, StoreError> {
		if !path.exists() {
			return Ok(StoreSnapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(StoreSnapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &StoreSnapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn mutate<T>(&self, f: impl FnOnce(&mut StoreSnapshot) -> T) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let value = f(&mut guard);

		self.persist_locked(&guard)?;

		Ok(value)
	}
}
impl TokenStore for FileStore {
	fn fetch_token(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().token.clone()) })
	}

	fn save_token(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.token = Some(record)) })
	}

	fn compare_and_swap_token(
		&self,
		expected_expires_at: OffsetDateTime,
		replacement: TokenRecord,
	) -> StoreFuture<'_, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let outcome = guard.compare_and_swap(expected_expires_at, replacement);

			if matches!(outcome, CompareAndSwapOutcome::Updated) {
				self.persist_locked(&guard)?;
			}

			Ok(outcome)
		})
	}

	fn delete_token(&self) -> StoreFuture<'_, Option<TokenRecord>> {
		Box::pin(async move { self.mutate(|s| s.token.take()) })
	}

	fn fetch_connection(&self) -> StoreFuture<'_, Connection> {
		Box::pin(async move { Ok(self.inner.read().connection()) })
	}

	fn save_account_id(&self, account_id: AccountId) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.account_id = Some(account_id)) })
	}

	fn save_farm_id(&self, farm_id: FarmId) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.farm_id = Some(farm_id)) })
	}

	fn authorization_state(&self) -> StoreFuture<'_, Option<String>> {
		Box::pin(async move { Ok(self.inner.read().authorization_state.clone()) })
	}

	fn save_authorization_state(&self, state: String) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.authorization_state = Some(state)) })
	}

	fn take_authorization_state(&self) -> StoreFuture<'_, Option<String>> {
		Box::pin(async move { self.mutate(|s| s.authorization_state.take()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| *s = StoreSnapshot::default()) })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"farmlab_client_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_record() -> TokenRecord {
		TokenRecord::builder()
			.access_token("access-token")
			.refresh_token("refresh-token")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test record.")
	}

	#[test]
	fn save_and_reload_keeps_every_key() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let record = build_record();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(async {
			store.save_token(record.clone()).await?;
			store.save_account_id(AccountId(7)).await?;
			store.save_farm_id(FarmId(11)).await?;
			store.save_authorization_state("abc123".into()).await
		})
		.expect("Failed to populate file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let (token, connection, state) = rt
			.block_on(async {
				Ok::<_, StoreError>((
					reopened.fetch_token().await?,
					reopened.fetch_connection().await?,
					reopened.authorization_state().await?,
				))
			})
			.expect("Failed to read file store after reopen.");
		let token = token.expect("File store lost the token after reopen.");

		assert_eq!(token.access_token.expose(), record.access_token.expose());
		assert_eq!(token.expires_at.unix_timestamp(), record.expires_at.unix_timestamp());
		assert_eq!(connection.account_id, Some(AccountId(7)));
		assert_eq!(connection.farm_id, Some(FarmId(11)));
		assert_eq!(state.as_deref(), Some("abc123"));

		rt.block_on(reopened.clear()).expect("Failed to clear file store.");

		let cleared = FileStore::open(&path).expect("Failed to reopen cleared store.");

		assert!(rt.block_on(cleared.fetch_token()).expect("Fetch should succeed.").is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupted_snapshot_reports_serialization_error() {
		let path = temp_path();

		fs::write(&path, b"{not json").expect("Failed to write corrupted snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupted snapshot must fail to open.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}

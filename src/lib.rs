//! FarmLab boundary client: OAuth token lifecycle with single-flight refresh, authenticated
//! access to the FarmLab API, and idempotent import of remote boundaries as local assets.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod geometry;
pub mod http;
pub mod manager;
pub mod oauth;
pub mod obs;
pub mod store;
pub mod sync;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::TokenRecord,
		client::{ApiClient, ReqwestApiClient},
		config::FarmLabConfig,
		http::ReqwestHttpClient,
		store::{MemoryStore, TokenStore},
		sync::{AssetStore, BoundarySyncer, MemoryAssetStore},
	};

	/// Client identifier used by every integration test configuration.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// Client secret used by every integration test configuration.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";
	/// Redirect URI registered for integration tests.
	pub const TEST_REDIRECT_URI: &str = "https://farm.example.com/farmlab/grant";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a configuration pointing both the API and the auth server at `base_url`
	/// (`{base_url}/api/` and `{base_url}/auth/`).
	pub fn test_config(base_url: &str) -> FarmLabConfig {
		let base = base_url.trim_end_matches('/');

		FarmLabConfig::builder()
			.api_url(Url::parse(&format!("{base}/api")).expect("Failed to parse test API URL."))
			.auth_url(Url::parse(&format!("{base}/auth")).expect("Failed to parse test auth URL."))
			.client_id(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.redirect_uri(
				Url::parse(TEST_REDIRECT_URI).expect("Failed to parse test redirect URI."),
			)
			.build()
			.expect("Failed to build test configuration.")
	}

	/// Constructs an [`ApiClient`] backed by an in-memory token store and the reqwest
	/// transport used across integration tests.
	pub fn build_reqwest_test_client(
		config: FarmLabConfig,
	) -> (ReqwestApiClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let client = ApiClient::with_http_client(config, store, test_reqwest_http_client());

		(client, store_backend)
	}

	/// Constructs a [`BoundarySyncer`] over a fresh test client and in-memory asset store.
	pub fn build_reqwest_test_syncer(
		config: FarmLabConfig,
	) -> (BoundarySyncer<ReqwestHttpClient>, Arc<MemoryStore>, Arc<MemoryAssetStore>) {
		let (client, store) = build_reqwest_test_client(config);
		let assets_backend = Arc::new(MemoryAssetStore::default());
		let assets: Arc<dyn AssetStore> = assets_backend.clone();

		(BoundarySyncer::new(Arc::new(client), assets), store, assets_backend)
	}

	/// Builds a token record issued `age` ago that lives for `expires_in`.
	pub fn token_fixture(
		access: &str,
		refresh: Option<&str>,
		age: Duration,
		expires_in: Duration,
	) -> TokenRecord {
		let mut builder = TokenRecord::builder()
			.access_token(access)
			.issued_at(OffsetDateTime::now_utc() - age)
			.expires_in(expires_in);

		if let Some(refresh) = refresh {
			builder = builder.refresh_token(refresh);
		}

		builder.build().expect("Token record fixture should build successfully.")
	}

	/// Seeds a token that already expired one second ago.
	pub async fn seed_expired_token(store: &MemoryStore, access: &str, refresh: Option<&str>) {
		let record = token_fixture(access, refresh, Duration::seconds(3601), Duration::hours(1));

		store.save_token(record).await.expect("Failed to seed expired token into the store.");
	}

	/// Seeds a token that stays valid for another hour.
	pub async fn seed_valid_token(store: &MemoryStore, access: &str, refresh: Option<&str>) {
		let record = token_fixture(access, refresh, Duration::ZERO, Duration::hours(1));

		store.save_token(record).await.expect("Failed to seed valid token into the store.");
	}

	/// Wraps a JSON payload in the FarmLab `{payload: ...}` envelope.
	pub fn envelope(payload: serde_json::Value) -> String {
		serde_json::json!({ "payload": payload }).to_string()
	}

	/// JSON body returned by a successful token endpoint call.
	pub fn token_body(access: &str, refresh: &str, expires_in: i64) -> String {
		envelope(serde_json::json!({
			"access_token": access,
			"refresh_token": refresh,
			"token_type": "Bearer",
			"expires_in": expires_in,
		}))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};

//! OAuth token lifecycle: grant, silent refresh, and expiry-based invalidation.
//!
//! [`TokenManager`] owns the token state machine. Every outbound API call asks it for an
//! authorization header through [`TokenManager::authorization_header`], which refreshes an
//! expiring token at most once per call and clears the token when FarmLab rejects the
//! refresh. Refreshes are single-flight: concurrent callers wait on one async guard and
//! reuse whatever token the first caller stored.

mod authorize;
mod metrics;
mod refresh;

pub use metrics::{RefreshCounts, RefreshMetrics};

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	config::FarmLabConfig,
	http::HttpTransport,
	oauth::{GrantRequest, TokenEndpoint},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::TokenStore,
};

/// Lifecycle states of the stored token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
	/// No token has been granted (or it was revoked).
	#[default]
	NoToken,
	/// A token is stored and outside the refresh window.
	Valid,
	/// A token is stored and inside the refresh window.
	Expiring,
	/// A refresh call is in flight.
	Refreshing,
	/// The last grant or refresh failed and the token was cleared.
	Invalid,
}
impl TokenState {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenState::NoToken => "no_token",
			TokenState::Valid => "valid",
			TokenState::Expiring => "expiring",
			TokenState::Refreshing => "refreshing",
			TokenState::Invalid => "invalid",
		}
	}
}
impl Display for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Owns the FarmLab token lifecycle for one site.
pub struct TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	/// Store holding the token, connection ids, and pending nonce.
	pub store: Arc<dyn TokenStore>,
	/// Shared settings.
	pub config: Arc<FarmLabConfig>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	endpoint: TokenEndpoint<C>,
	state: Mutex<TokenState>,
	refresh_guard: AsyncMutex<()>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a manager sharing `http_client` for token calls.
	pub fn new(
		config: Arc<FarmLabConfig>,
		store: Arc<dyn TokenStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			endpoint: TokenEndpoint::new(config.clone(), http_client.into()),
			store,
			config,
			refresh_metrics: Default::default(),
			state: Mutex::new(TokenState::NoToken),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Returns the last state observed by this manager.
	pub fn state(&self) -> TokenState {
		*self.state.lock()
	}

	/// Re-evaluates the state against the stored token without contacting FarmLab.
	pub async fn inspect_state(&self) -> Result<TokenState> {
		let token = self.store.fetch_token().await?;
		let mut state = self.state.lock();

		*state = match (token, *state) {
			(None, TokenState::Invalid) => TokenState::Invalid,
			(None, _) => TokenState::NoToken,
			(Some(_), TokenState::Refreshing) => TokenState::Refreshing,
			(Some(token), _) if token.needs_refresh(self.config.refresh_skew) =>
				TokenState::Expiring,
			(Some(_), _) => TokenState::Valid,
		};

		Ok(*state)
	}

	/// Exchanges a grant for a token and persists it.
	///
	/// Any failure clears the stored token and leaves the manager [`TokenState::Invalid`].
	pub async fn grant(&self, request: GrantRequest) -> Result<TokenRecord> {
		const KIND: OperationKind = OperationKind::Grant;

		let span = OperationSpan::new(KIND, "grant");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.endpoint.request(request).await {
					Ok(record) => {
						self.store.save_token(record.clone()).await?;
						self.set_state(TokenState::Valid);

						Ok(record)
					},
					Err(e) => {
						self.invalidate().await;

						Err(e)
					},
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Returns the `Authorization` header value for the next request, if any.
	///
	/// `Ok(None)` means the caller proceeds unauthenticated: either no token exists or the
	/// one silent refresh was rejected. Transport and storage failures are returned as
	/// errors and leave the stored token untouched.
	pub async fn authorization_header(&self) -> Result<Option<String>> {
		Ok(self.usable_token().await?.map(|token| token.authorization_header()))
	}

	/// Returns the token the next request should use, refreshing it first when it is inside
	/// the skew window. Same contract as [`Self::authorization_header`].
	pub async fn usable_token(&self) -> Result<Option<TokenRecord>> {
		let mut refreshed = false;

		loop {
			let Some(token) = self.store.fetch_token().await? else {
				self.mark_absent();

				return Ok(None);
			};

			// The second pass hands out whatever the refresh stored, even if it is already
			// inside the skew window.
			if refreshed || !token.needs_refresh(self.config.refresh_skew) {
				self.set_state(TokenState::Valid);

				return Ok(Some(token));
			}

			self.set_state(TokenState::Expiring);

			match self.refresh_if_unchanged(token.expires_at).await {
				Ok(_) => refreshed = true,
				Err(Error::Auth(e)) => {
					obs::warn_absorbed(OperationKind::Refresh, "usable_token", &e);

					return Ok(None);
				},
				Err(e) => return Err(e),
			}
		}
	}

	/// Deletes the token, connection ids, and pending nonce.
	pub async fn revoke(&self) -> Result<()> {
		self.store.clear().await?;
		self.set_state(TokenState::NoToken);

		Ok(())
	}

	fn set_state(&self, state: TokenState) {
		*self.state.lock() = state;
	}

	fn mark_absent(&self) {
		let mut state = self.state.lock();

		if *state != TokenState::Invalid {
			*state = TokenState::NoToken;
		}
	}

	async fn invalidate(&self) {
		if let Err(e) = self.store.delete_token().await {
			obs::warn_absorbed(OperationKind::Refresh, "invalidate", &e);
		}

		self.set_state(TokenState::Invalid);
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("config", &self.config)
			.field("state", &self.state())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}

//! Single-flight refresh with compare-and-swap on the stored expiry.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::AuthError,
	http::HttpTransport,
	manager::{TokenManager, TokenState},
	oauth::GrantRequest,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::CompareAndSwapOutcome,
};

impl<C> TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	/// Refreshes the stored token regardless of its expiry.
	pub async fn refresh_token(&self) -> Result<TokenRecord> {
		self.refresh_inner(None, "refresh_token").await
	}

	/// Refreshes the stored token unless another caller already replaced the token whose
	/// expiry was `observed_expires_at`, in which case that replacement is returned.
	pub async fn refresh_if_unchanged(
		&self,
		observed_expires_at: OffsetDateTime,
	) -> Result<TokenRecord> {
		self.refresh_inner(Some(observed_expires_at), "refresh_if_unchanged").await
	}

	async fn refresh_inner(
		&self,
		observed_expires_at: Option<OffsetDateTime>,
		stage: &'static str,
	) -> Result<TokenRecord> {
		const KIND: OperationKind = OperationKind::Refresh;

		let span = OperationSpan::new(KIND, stage);

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.refresh_guard.lock().await;
				let result = self.refresh_locked(observed_expires_at).await;

				self.refresh_metrics.record(&result);

				result
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn refresh_locked(
		&self,
		observed_expires_at: Option<OffsetDateTime>,
	) -> Result<TokenRecord> {
		let Some(current) = self.store.fetch_token().await? else {
			self.set_state(TokenState::Invalid);

			return Err(AuthError::Reconnect.into());
		};

		if let Some(observed) = observed_expires_at
			&& current.expires_at != observed
		{
			self.set_state(TokenState::Valid);

			return Ok(current);
		}

		let Some(refresh_token) = current.refresh_token.as_ref().map(|s| s.expose().to_owned())
		else {
			self.invalidate().await;

			return Err(AuthError::MissingRefreshToken.into());
		};

		self.set_state(TokenState::Refreshing);

		let grant = GrantRequest::RefreshToken { refresh_token };
		let refreshed = match self.endpoint.request(grant).await {
			Ok(record) => record,
			Err(e @ Error::Auth(_)) => {
				self.invalidate().await;

				return Err(e);
			},
			Err(e) => {
				self.set_state(TokenState::Expiring);

				return Err(e);
			},
		};

		match self.store.compare_and_swap_token(current.expires_at, refreshed.clone()).await? {
			CompareAndSwapOutcome::Updated => {
				self.set_state(TokenState::Valid);

				Ok(refreshed)
			},
			CompareAndSwapOutcome::ExpiryMismatch => match self.store.fetch_token().await? {
				Some(existing) => {
					self.set_state(TokenState::Valid);

					Ok(existing)
				},
				None => {
					self.set_state(TokenState::NoToken);

					Err(AuthError::Reconnect.into())
				},
			},
			CompareAndSwapOutcome::Missing => {
				self.set_state(TokenState::NoToken);

				Err(AuthError::Reconnect.into())
			},
		}
	}
}

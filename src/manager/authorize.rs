//! Authorization-code flow: nonce issuance, authorize URL, and callback validation.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::AuthError,
	http::HttpTransport,
	manager::TokenManager,
	oauth::{self, GrantRequest},
};

const STATE_BYTES: usize = 16;

impl<C> TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	/// Returns the authorize URL, creating the pending nonce on first use and reusing it
	/// while the flow is pending.
	pub async fn start_authorization(&self) -> Result<Url> {
		let state = match self.store.authorization_state().await? {
			Some(state) => state,
			None => {
				let state = generate_state();

				self.store.save_authorization_state(state.clone()).await?;

				state
			},
		};

		oauth::authorize_url(&self.config, &state)
	}

	/// Exchanges the callback `code` for a token.
	///
	/// The pending nonce is consumed before anything else, so it is cleared whether the
	/// exchange succeeds or fails. A `returned_state` that differs from it is rejected.
	pub async fn complete_authorization(
		&self,
		code: &str,
		returned_state: Option<&str>,
	) -> Result<TokenRecord> {
		let pending = self.store.take_authorization_state().await?;
		let code = code.trim();

		if code.is_empty() {
			return Err(AuthError::MissingCode.into());
		}
		if let Some(returned) = returned_state
			&& pending.as_deref() != Some(returned)
		{
			return Err(AuthError::StateMismatch.into());
		}

		self.grant(GrantRequest::AuthorizationCode {
			code: code.to_owned(),
			redirect_uri: self.config.redirect_uri.clone(),
			state: pending,
		})
		.await
	}
}

fn generate_state() -> String {
	let bytes: [u8; STATE_BYTES] = rand::rng().random();

	bytes.iter().map(|b| format!("{b:02x}")).collect()
}

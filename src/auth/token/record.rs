//! Token record struct, expiry helpers, and builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Token type assumed when the auth server omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no relative expiry was configured.
	#[error("Expiry must be supplied via expires_in.")]
	MissingExpiry,
	/// Issued when `expires_in` is zero or negative.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiry,
	/// Issued when `issued_at + expires_in` falls outside the representable date range.
	#[error("The expires_in value overflows the expiry instant.")]
	ExpiryOutOfRange,
}

/// Token persisted under the `token` key.
///
/// `expires_at` is always derived from `issued_at + expires_in` when the record is built;
/// the builder offers no way to set it directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if FarmLab issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Token type used in the authorization header.
	pub token_type: String,
	/// Instant the grant or refresh completed.
	#[serde(with = "time::serde::timestamp")]
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Returns `true` once `instant + skew` reaches the expiry.
	///
	/// An edge past the representable range counts as reached.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, skew: Duration) -> bool {
		instant.checked_add(skew).is_none_or(|edge| edge >= self.expires_at)
	}

	/// Convenience helper that checks [`Self::needs_refresh_at`] against the current clock.
	pub fn needs_refresh(&self, skew: Duration) -> bool {
		self.needs_refresh_at(OffsetDateTime::now_utc(), skew)
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Renders the `Authorization` header value.
	pub fn authorization_header(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Convenience helper that stamps `issued_at` with the current clock.
	pub fn issued_now(self) -> Self {
		self.issued_at(OffsetDateTime::now_utc())
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Overrides the token type (defaults to `Bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let expires_in = self.expires_in.ok_or(TokenRecordBuilderError::MissingExpiry)?;

		if !expires_in.is_positive() {
			return Err(TokenRecordBuilderError::NonPositiveExpiry);
		}

		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at =
			issued_at.checked_add(expires_in).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?;
		let token_type = self
			.token_type
			.filter(|kind| !kind.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_owned());

		Ok(TokenRecord {
			access_token,
			refresh_token: self.refresh_token.filter(|secret| !secret.is_empty()),
			token_type,
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record_at(issued: OffsetDateTime, expires_in: Duration) -> TokenRecord {
		TokenRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(issued)
			.expires_in(expires_in)
			.build()
			.expect("Token record builder should succeed.")
	}

	#[test]
	fn builder_derives_expiry_from_expires_in() {
		let record = record_at(macros::datetime!(2025-01-01 00:00 UTC), Duration::minutes(30));

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(record.token_type, DEFAULT_TOKEN_TYPE);
	}

	#[test]
	fn builder_rejects_missing_or_invalid_input() {
		assert_eq!(
			TokenRecord::builder().expires_in(Duration::HOUR).build().unwrap_err(),
			TokenRecordBuilderError::MissingAccessToken
		);
		assert_eq!(
			TokenRecord::builder().access_token("a").build().unwrap_err(),
			TokenRecordBuilderError::MissingExpiry
		);
		assert_eq!(
			TokenRecord::builder()
				.access_token("a")
				.expires_in(Duration::ZERO)
				.build()
				.unwrap_err(),
			TokenRecordBuilderError::NonPositiveExpiry
		);
		assert_eq!(
			TokenRecord::builder()
				.access_token("a")
				.expires_in(Duration::seconds(i64::MAX))
				.build()
				.unwrap_err(),
			TokenRecordBuilderError::ExpiryOutOfRange
		);
	}

	#[test]
	fn refresh_window_honours_skew() {
		let record = record_at(macros::datetime!(2025-01-01 00:00 UTC), Duration::hours(1));
		let skew = Duration::seconds(120);

		assert!(!record.needs_refresh_at(macros::datetime!(2025-01-01 00:57 UTC), skew));
		assert!(record.needs_refresh_at(macros::datetime!(2025-01-01 00:58 UTC), skew));
		assert!(!record.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(record.needs_refresh_at(OffsetDateTime::now_utc(), Duration::MAX));
	}

	#[test]
	fn serializes_unix_timestamps_and_redacts_debug() {
		let record = record_at(macros::datetime!(2025-01-01 00:00 UTC), Duration::hours(1));
		let json = serde_json::to_value(&record).expect("Record should serialize.");

		assert_eq!(json["expires_at"], 1_735_693_200_i64);
		assert_eq!(json["issued_at"], 1_735_689_600_i64);
		assert!(!format!("{record:?}").contains("access\""));
		assert_eq!(record.authorization_header(), "Bearer access");
	}
}

//! FarmLab server settings shared by the token manager and the API client.
//!
//! Settings are validated once through [`FarmLabConfigBuilder`]; the same builder backs
//! serde deserialization so a config file cannot bypass the checks.

/// Builder API for assembling validated FarmLab settings.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Scope string requested when none is configured.
pub const DEFAULT_SCOPE: &str = "read search write update owner app";
/// Refresh skew applied when none is configured, in seconds.
pub const DEFAULT_REFRESH_SKEW_SECS: i64 = 120;
/// Per-call timeout applied when none is configured, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Validated FarmLab settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "FarmLabConfigBuilder")]
pub struct FarmLabConfig {
	/// API base URL, always ending with `/`.
	pub api_url: Url,
	/// Auth server base URL, always ending with `/`.
	pub auth_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret, if the client is confidential.
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI registered for the authorization-code grant.
	pub redirect_uri: Option<Url>,
	/// Space-delimited scope string sent on the authorize URL.
	pub scope: String,
	/// How long before expiry a token is treated as expiring.
	pub refresh_skew: Duration,
	/// Default deadline for each outbound call.
	pub request_timeout: StdDuration,
}
impl FarmLabConfig {
	/// Creates a new builder.
	pub fn builder() -> FarmLabConfigBuilder {
		FarmLabConfigBuilder::default()
	}

	/// Resolves an API path such as `Paddock` against the API base URL. A leading `/`
	/// resolves against the host root.
	pub fn api_endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.api_url
			.join(path)
			.map_err(|source| ConfigError::InvalidUrl { field: "api_url", source })
	}

	/// Token endpoint (`{auth_url}access/login`).
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.auth_url
			.join("access/login")
			.map_err(|source| ConfigError::InvalidUrl { field: "auth_url", source })
	}

	/// Authorization endpoint (`{auth_url}auth/grant`).
	pub fn authorization_endpoint(&self) -> Result<Url, ConfigError> {
		self.auth_url
			.join("auth/grant")
			.map_err(|source| ConfigError::InvalidUrl { field: "auth_url", source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> FarmLabConfig {
		FarmLabConfig::builder()
			.api_url(Url::parse("https://api.farmlab.example/v1").expect("API URL should parse."))
			.auth_url(Url::parse("https://auth.farmlab.example").expect("Auth URL should parse."))
			.client_id("client")
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn endpoints_resolve_under_base_urls() {
		let config = config();

		assert_eq!(
			config.api_endpoint("Paddock").expect("Endpoint should resolve.").as_str(),
			"https://api.farmlab.example/v1/Paddock"
		);
		assert_eq!(
			config
				.api_endpoint("/vasat/harvest/searchBounds")
				.expect("Endpoint should resolve.")
				.as_str(),
			"https://api.farmlab.example/vasat/harvest/searchBounds"
		);
		assert_eq!(
			config.token_endpoint().expect("Endpoint should resolve.").as_str(),
			"https://auth.farmlab.example/access/login"
		);
		assert_eq!(
			config.authorization_endpoint().expect("Endpoint should resolve.").as_str(),
			"https://auth.farmlab.example/auth/grant"
		);
	}

	#[test]
	fn defaults_apply() {
		let config = config();

		assert_eq!(config.scope, DEFAULT_SCOPE);
		assert_eq!(config.refresh_skew, Duration::seconds(120));
		assert_eq!(config.request_timeout, StdDuration::from_secs(30));
		assert!(config.client_secret.is_none());
	}

	#[test]
	fn deserializes_through_builder_validation() {
		let config: FarmLabConfig = serde_json::from_value(serde_json::json!({
			"api_url": "https://api.farmlab.example/",
			"auth_url": "https://auth.farmlab.example/",
			"client_id": "client",
			"client_secret": "secret",
			"refresh_skew_secs": 60,
		}))
		.expect("Config JSON should deserialize.");

		assert_eq!(config.refresh_skew, Duration::minutes(1));
		assert_eq!(config.client_secret.as_ref().map(TokenSecret::expose), Some("secret"));
		assert!(!format!("{config:?}").contains("\"secret\""));

		let insecure = serde_json::from_value::<FarmLabConfig>(serde_json::json!({
			"api_url": "http://api.farmlab.example/",
			"auth_url": "https://auth.farmlab.example/",
			"client_id": "client",
		}));

		assert!(insecure.is_err());
	}
}

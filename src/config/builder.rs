//! Validating builder for [`FarmLabConfig`](crate::config::FarmLabConfig).

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{
		DEFAULT_REFRESH_SKEW_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCOPE, FarmLabConfig,
	},
	error::ConfigError,
};

/// Builder for [`FarmLabConfig`] values; also the serde representation of a config file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FarmLabConfigBuilder {
	/// API base URL.
	pub api_url: Option<Url>,
	/// Auth server base URL.
	pub auth_url: Option<Url>,
	/// OAuth client identifier.
	pub client_id: Option<String>,
	/// OAuth client secret.
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI for the authorization-code grant.
	pub redirect_uri: Option<Url>,
	/// Requested scope string.
	pub scope: Option<String>,
	/// Refresh skew in seconds.
	pub refresh_skew_secs: Option<i64>,
	/// Request timeout in seconds.
	pub request_timeout_secs: Option<u64>,
}
impl FarmLabConfigBuilder {
	/// Sets the API base URL.
	pub fn api_url(mut self, url: Url) -> Self {
		self.api_url = Some(url);

		self
	}

	/// Sets the auth server base URL.
	pub fn auth_url(mut self, url: Url) -> Self {
		self.auth_url = Some(url);

		self
	}

	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the OAuth client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Overrides the requested scope string.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Overrides the refresh skew.
	pub fn refresh_skew(mut self, skew: Duration) -> Self {
		self.refresh_skew_secs = Some(skew.whole_seconds());

		self
	}

	/// Overrides the default request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout_secs = Some(timeout.as_secs());

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<FarmLabConfig, ConfigError> {
		let api_url = self.api_url.ok_or(ConfigError::MissingField { field: "api_url" })?;
		let auth_url = self.auth_url.ok_or(ConfigError::MissingField { field: "auth_url" })?;
		let client_id = self
			.client_id
			.map(|id| id.trim().to_owned())
			.filter(|id| !id.is_empty())
			.ok_or(ConfigError::MissingField { field: "client_id" })?;
		let refresh_skew_secs = self.refresh_skew_secs.unwrap_or(DEFAULT_REFRESH_SKEW_SECS);

		if refresh_skew_secs < 0 {
			return Err(ConfigError::InvalidSkew);
		}

		let request_timeout_secs =
			self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

		if request_timeout_secs == 0 {
			return Err(ConfigError::InvalidTimeout);
		}

		validate_url("api_url", &api_url)?;
		validate_url("auth_url", &auth_url)?;

		if let Some(redirect) = self.redirect_uri.as_ref() {
			validate_url("redirect_uri", redirect)?;
		}

		let scope = self
			.scope
			.map(|scope| scope.split_whitespace().collect::<Vec<_>>().join(" "))
			.filter(|scope| !scope.is_empty())
			.unwrap_or_else(|| DEFAULT_SCOPE.to_owned());

		Ok(FarmLabConfig {
			api_url: with_trailing_slash(api_url),
			auth_url: with_trailing_slash(auth_url),
			client_id,
			client_secret: self.client_secret.filter(|secret| !secret.is_empty()),
			redirect_uri: self.redirect_uri,
			scope,
			refresh_skew: Duration::seconds(refresh_skew_secs),
			request_timeout: StdDuration::from_secs(request_timeout_secs),
		})
	}
}
impl TryFrom<FarmLabConfigBuilder> for FarmLabConfig {
	type Error = ConfigError;

	fn try_from(builder: FarmLabConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

fn validate_url(field: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureUrl { field, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

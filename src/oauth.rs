//! FarmLab token endpoint client and authorize-URL construction.

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenRecordBuilderError},
	config::FarmLabConfig,
	envelope::{self, Payload},
	error::AuthError,
	http::{ApiRequest, HttpTransport, Method},
};

/// Grant types accepted by `access/login`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization code exchange.
	AuthorizationCode,
	/// Refresh token exchange.
	RefreshToken,
}
impl GrantType {
	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Grant-specific parameters for a token request.
#[derive(Clone)]
pub enum GrantRequest {
	/// Exchange an authorization code.
	AuthorizationCode {
		/// Code returned on the redirect.
		code: String,
		/// Redirect URI used when starting the flow.
		redirect_uri: Option<Url>,
		/// Authorization nonce sent with the code.
		state: Option<String>,
	},
	/// Exchange a refresh token.
	RefreshToken {
		/// Stored refresh token.
		refresh_token: String,
	},
}
impl GrantRequest {
	/// Returns the grant type of this request.
	pub fn grant_type(&self) -> GrantType {
		match self {
			GrantRequest::AuthorizationCode { .. } => GrantType::AuthorizationCode,
			GrantRequest::RefreshToken { .. } => GrantType::RefreshToken,
		}
	}

	fn into_body(self, config: &FarmLabConfig) -> serde_json::Value {
		let mut body = serde_json::Map::new();

		body.insert("grant_type".into(), self.grant_type().as_str().into());
		body.insert("client_id".into(), config.client_id.clone().into());

		if let Some(secret) = &config.client_secret {
			body.insert("client_secret".into(), secret.expose().into());
		}

		match self {
			GrantRequest::AuthorizationCode { code, redirect_uri, state } => {
				if let Some(state) = state {
					body.insert("state".into(), state.into());
				}

				body.insert("code".into(), code.into());

				if let Some(redirect_uri) = redirect_uri {
					body.insert("redirect_uri".into(), redirect_uri.as_str().into());
				}
			},
			GrantRequest::RefreshToken { refresh_token } => {
				body.insert("refresh_token".into(), refresh_token.into());
			},
		}

		serde_json::Value::Object(body)
	}
}
impl Debug for GrantRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrantRequest")
			.field("grant_type", &self.grant_type())
			.finish_non_exhaustive()
	}
}

#[derive(Deserialize)]
struct TokenPayload {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	token_type: Option<String>,
	expires_in: i64,
}

/// Calls `POST {auth_url}access/login` and turns the payload into a [`TokenRecord`].
pub struct TokenEndpoint<C>
where
	C: ?Sized + HttpTransport,
{
	config: Arc<FarmLabConfig>,
	http_client: Arc<C>,
}
impl<C> TokenEndpoint<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an endpoint client sharing the transport with the rest of the crate.
	pub fn new(config: Arc<FarmLabConfig>, http_client: Arc<C>) -> Self {
		Self { config, http_client }
	}

	/// Performs one grant. `expires_at` is stamped from the local clock at completion.
	pub async fn request(&self, grant: GrantRequest) -> Result<TokenRecord> {
		let grant_type = grant.grant_type();
		let label = grant_type.as_str();
		let request = ApiRequest::new(Method::Post, self.config.token_endpoint()?)
			.json(grant.into_body(&self.config))
			.timeout(self.config.request_timeout);
		let response = self.http_client.execute(request).await?;
		let status = response.status;

		if !response.is_success() {
			return Err(AuthError::Rejected { grant: label, status, message: response.snippet() }
				.into());
		}

		let payload = envelope::decode_envelope::<TokenPayload>(&response.body)
			.map_err(|source| AuthError::MalformedResponse { grant: label, source, status })?;
		let payload = match payload {
			Payload::Present(payload) => payload,
			Payload::Missing =>
				return Err(AuthError::MissingPayload { grant: label, status }.into()),
		};

		if payload.access_token.is_empty() {
			return Err(AuthError::MissingPayload { grant: label, status }.into());
		}
		if payload.expires_in <= 0 {
			return Err(AuthError::NonPositiveExpiresIn.into());
		}

		let mut builder = TokenRecord::builder()
			.access_token(payload.access_token)
			.issued_now()
			.expires_in(Duration::seconds(payload.expires_in));

		if let Some(refresh) = payload.refresh_token {
			builder = builder.refresh_token(refresh);
		}
		if let Some(token_type) = payload.token_type {
			builder = builder.token_type(token_type);
		}

		builder.build().map_err(|e| match e {
			TokenRecordBuilderError::ExpiryOutOfRange => AuthError::ExpiresInOutOfRange.into(),
			_ => AuthError::MissingPayload { grant: label, status }.into(),
		})
	}
}

/// Builds the URL the user is sent to when starting the authorization-code flow.
///
/// The client secret is never included.
pub fn authorize_url(config: &FarmLabConfig, state: &str) -> Result<Url> {
	let mut url = config.authorization_endpoint()?;

	{
		let mut query = url.query_pairs_mut();

		query
			.append_pair("response_type", "code")
			.append_pair("client_id", &config.client_id)
			.append_pair("state", state)
			.append_pair("scope", &config.scope);

		if let Some(redirect_uri) = &config.redirect_uri {
			query.append_pair("redirect_uri", redirect_uri.as_str());
		}
	}

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> FarmLabConfig {
		FarmLabConfig::builder()
			.api_url(Url::parse("https://api.farmlab.example/").expect("URL should parse."))
			.auth_url(Url::parse("https://auth.farmlab.example/").expect("URL should parse."))
			.client_id("client")
			.client_secret("hunter2")
			.redirect_uri(Url::parse("https://farm.example.com/grant").expect("URL should parse."))
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn authorize_url_carries_expected_pairs_without_secret() {
		let url = authorize_url(&config(), "abc123").expect("Authorize URL should build.");
		let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();

		assert_eq!(url.path(), "/auth/grant");
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client"));
		assert_eq!(pairs.get("state").map(String::as_str), Some("abc123"));
		assert_eq!(
			pairs.get("scope").map(String::as_str),
			Some("read search write update owner app")
		);
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://farm.example.com/grant")
		);
		assert!(!url.as_str().contains("hunter2"));
	}

	#[test]
	fn grant_bodies_match_wire_shape() {
		let config = config();
		let code = GrantRequest::AuthorizationCode {
			code: "xyz".into(),
			redirect_uri: config.redirect_uri.clone(),
			state: Some("abc".into()),
		}
		.into_body(&config);

		assert_eq!(
			code,
			serde_json::json!({
				"grant_type": "authorization_code",
				"client_id": "client",
				"client_secret": "hunter2",
				"state": "abc",
				"code": "xyz",
				"redirect_uri": "https://farm.example.com/grant",
			})
		);

		let refresh = GrantRequest::RefreshToken { refresh_token: "r1".into() }.into_body(&config);

		assert_eq!(refresh["grant_type"], "refresh_token");
		assert_eq!(refresh["refresh_token"], "r1");
		assert!(refresh.get("code").is_none());
		assert!(!format!("{:?}", GrantRequest::RefreshToken { refresh_token: "r1".into() })
			.contains("r1"));
	}
}

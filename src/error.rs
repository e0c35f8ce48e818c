//! Client-level error types shared across the token manager, API client, and syncer.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Grant or refresh failure against the FarmLab auth server.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// FarmLab API returned something the client could not use.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Geometry could not be converted between GeoJSON and WKT.
	#[error(transparent)]
	Geometry(#[from] crate::geometry::GeometryError),

	/// The operation needs a connection identifier that has not been stored yet.
	#[error("FarmLab is not connected: no {missing} is stored.")]
	NotConnected {
		/// Missing identifier (`account` or `farm`).
		missing: &'static str,
	},
	/// A farm is already linked to this site.
	#[error("Farm {farm_id} is already selected.")]
	FarmAlreadySelected {
		/// Farm identifier currently stored.
		farm_id: crate::auth::FarmId,
	},
}
impl Error {
	/// Returns `true` when the failure means the user must run the authorization flow again.
	pub fn requires_reconnect(&self) -> bool {
		match self {
			Self::Auth(e) => e.requires_reconnect(),
			Self::NotConnected { .. } => true,
			_ => false,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required setting is absent or blank.
	#[error("Configuration field `{field}` is required.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// URL setting cannot be parsed or joined.
	#[error("Configuration field `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Field name.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// URL setting uses plain HTTP against a non-loopback host.
	#[error("Configuration field `{field}` must use HTTPS: {url}.")]
	InsecureUrl {
		/// Field name.
		field: &'static str,
		/// Offending URL.
		url: String,
	},
	/// Refresh skew is negative.
	#[error("Refresh skew must not be negative.")]
	InvalidSkew,
	/// Request timeout is zero.
	#[error("Request timeout must be positive.")]
	InvalidTimeout,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling FarmLab.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call did not complete within its timeout.
	#[error("Request to FarmLab timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling FarmLab.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Grant and refresh failures. Every variant except [`AuthError::StateMismatch`] and
/// [`AuthError::MissingCode`] leaves the token cleared.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Auth server answered the grant with a non-success status.
	#[error("FarmLab rejected the {grant} grant with status {status}: {message}.")]
	Rejected {
		/// Grant label.
		grant: &'static str,
		/// HTTP status code.
		status: u16,
		/// Response body, truncated.
		message: String,
	},
	/// Auth server answered without a `payload`.
	#[error("FarmLab answered the {grant} grant without a payload (status {status}).")]
	MissingPayload {
		/// Grant label.
		grant: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// Token payload could not be decoded.
	#[error("FarmLab returned a malformed {grant} token payload.")]
	MalformedResponse {
		/// Grant label.
		grant: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// Token payload carried a zero or negative `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token payload carried an `expires_in` too large to turn into an expiry instant.
	#[error("The expires_in value is out of range.")]
	ExpiresInOutOfRange,
	/// Stored token cannot be refreshed because it has no refresh token.
	#[error("Stored token is missing a refresh token.")]
	MissingRefreshToken,
	/// Authorization callback arrived without a code.
	#[error("Authorization callback is missing the code parameter.")]
	MissingCode,
	/// Authorization callback state differs from the pending nonce.
	#[error("Authorization state does not match the pending request.")]
	StateMismatch,
	/// Token vanished from the store while a refresh was in flight.
	#[error("Token was removed during refresh; reconnect to FarmLab.")]
	Reconnect,
}
impl AuthError {
	/// Returns `true` when recovery needs a new authorization-code grant.
	pub fn requires_reconnect(&self) -> bool {
		!matches!(self, Self::MissingCode | Self::StateMismatch)
	}
}

/// FarmLab API failures surfaced by the strict client operations.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Response carried an unexpected status.
	#[error("FarmLab {operation} returned status {status}.")]
	Status {
		/// Operation label, e.g. `GET Account`.
		operation: &'static str,
		/// HTTP status code.
		status: u16,
		/// Response body, truncated.
		body: String,
	},
	/// Response had no `payload`.
	#[error("FarmLab {operation} returned no payload (status {status}).")]
	MissingPayload {
		/// Operation label.
		operation: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// Response payload could not be decoded.
	#[error("FarmLab {operation} returned malformed JSON.")]
	Json {
		/// Operation label.
		operation: &'static str,
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

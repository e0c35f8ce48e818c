//! Transport primitives for FarmLab API and token calls.
//!
//! The module exposes [`HttpTransport`] alongside the crate-owned [`ApiRequest`] and
//! [`ApiResponse`] types so hosts can plug in their own HTTP stack. The default `reqwest`
//! feature ships [`ReqwestHttpClient`], which honours per-call timeouts and captures the
//! `Retry-After` hint.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports able to execute FarmLab calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared between
/// the token manager and the API client behind an `Arc`. Non-2xx responses are not errors
/// at this layer; only failures to obtain a response are.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the raw response.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// HTTP methods used against FarmLab.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved outbound request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Header pairs in send order.
	pub headers: Vec<(String, String)>,
	/// JSON body, if any.
	pub json: Option<serde_json::Value>,
	/// Deadline for the whole call.
	pub timeout: Option<StdDuration>,
}
impl ApiRequest {
	/// Creates a request without headers, body, or timeout.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), json: None, timeout: None }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the JSON body.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.json = Some(body);

		self
	}

	/// Sets the call timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns the first header value matching `name`, case-insensitively.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	///
	/// The client never sleeps on it; it is passed through so hosts can schedule their own
	/// retry of throttled calls.
	pub retry_after: Option<Duration>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as lossy UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns at most 512 bytes of the body for error messages.
	pub fn snippet(&self) -> String {
		const MAX: usize = 512;

		let text = self.text();

		match text.char_indices().nth(MAX) {
			Some((idx, _)) => format!("{}...", &text[..idx]),
			None => text,
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// The auth server answers token calls directly, so any custom [`ReqwestClient`] should
/// disable redirect following.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder =
				client.request(method, request.url).header(ACCEPT, "application/json");

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.json {
				let bytes = serde_json::to_vec(body).map_err(TransportError::network)?;

				builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snippet_truncates_long_bodies() {
		let response = ApiResponse { status: 500, retry_after: None, body: vec![b'x'; 600] };
		let snippet = response.snippet();

		assert!(!response.is_success());
		assert_eq!(snippet.len(), 515);
		assert!(snippet.ends_with("..."));
	}

	#[test]
	fn header_lookup_ignores_case() {
		let request = ApiRequest::new(
			Method::Get,
			Url::parse("https://farmlab.example.com/api/Farm").expect("URL fixture should parse."),
		)
		.header("Authorization", "Bearer abc");

		assert_eq!(request.header_value("authorization"), Some("Bearer abc"));
		assert_eq!(request.method.to_string(), "GET");
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn retry_after_accepts_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, "30".parse().expect("Header value should parse."));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));
	}
}

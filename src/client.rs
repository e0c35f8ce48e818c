//! Authenticated access to the FarmLab API.
//!
//! [`ApiClient`] attaches the bearer token from [`TokenManager`] to every call, retries once
//! after a forced refresh when FarmLab answers `401`, and never fails on other non-2xx
//! statuses: [`ApiClient::request`] hands the raw response back. The typed `fetch_*`
//! operations turn statuses and missing payloads into [`ApiError`]s, and the `get_*`
//! operations built on them degrade to empty results instead.

mod connection;
mod model;

pub use connection::*;
pub use model::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::FarmLabConfig,
	envelope::{self, OneOrMany, Payload},
	error::ApiError,
	geometry::Position,
	http::{ApiRequest, ApiResponse, HttpTransport, Method},
	manager::TokenManager,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Per-call options for [`ApiClient::request`].
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Query pairs appended to the URL.
	pub query: Vec<(String, String)>,
	/// Extra headers; these win over the injected `Authorization` header.
	pub headers: Vec<(String, String)>,
	/// JSON body.
	pub json: Option<serde_json::Value>,
	/// Timeout overriding the configured default.
	pub timeout: Option<StdDuration>,
}
impl RequestOptions {
	/// Appends a query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
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

	/// Overrides the timeout for this call.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	fn has_authorization(&self) -> bool {
		self.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
	}
}

/// Authenticated FarmLab API client.
pub struct ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Shared settings.
	pub config: Arc<FarmLabConfig>,
	/// Store shared with the token manager.
	pub store: Arc<dyn TokenStore>,
	/// Token lifecycle owner.
	pub manager: Arc<TokenManager<C>>,
	http_client: Arc<C>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport for API and token calls.
	pub fn with_http_client(
		config: FarmLabConfig,
		store: Arc<dyn TokenStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let config = Arc::new(config);
		let http_client = http_client.into();
		let manager =
			Arc::new(TokenManager::new(config.clone(), store.clone(), http_client.clone()));

		Self { config, store, manager, http_client }
	}

	/// Sends an authenticated request to `path` under the API base URL.
	///
	/// A `401` while a token was attached triggers one forced refresh and one resend; if
	/// the refresh is rejected the original `401` response is returned.
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		options: RequestOptions,
	) -> Result<ApiResponse> {
		const KIND: OperationKind = OperationKind::ApiRequest;

		let span = OperationSpan::new(KIND, "request");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut url = self.config.api_endpoint(path)?;

				if !options.query.is_empty() {
					url.query_pairs_mut().extend_pairs(&options.query);
				}

				let token = self.manager.usable_token().await?;
				let header = token.as_ref().map(|token| token.authorization_header());
				let response = self.send(method, &url, &options, header.as_deref()).await?;

				if response.status != 401 || options.has_authorization() {
					return Ok(response);
				}

				let Some(token) = token else {
					return Ok(response);
				};

				match self.manager.refresh_if_unchanged(token.expires_at).await {
					Ok(fresh) => {
						let header = fresh.authorization_header();

						Ok(self.send(method, &url, &options, Some(&header)).await?)
					},
					Err(Error::Auth(e)) => {
						obs::warn_absorbed(KIND, "retry_after_401", &e);

						Ok(response)
					},
					Err(e) => Err(e),
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Fetches the connected account.
	pub async fn fetch_account(&self) -> Result<Account> {
		const OPERATION: &str = "GET Account/{id}";

		let account_id = self.store.fetch_connection().await?.require_account()?;
		let path = format!("Account/{account_id}");
		let accounts: OneOrMany<Account> =
			self.fetch_payload(OPERATION, Method::Get, &path, RequestOptions::default()).await?;

		accounts
			.into_first()
			.ok_or_else(|| ApiError::MissingPayload { operation: OPERATION, status: 200 }.into())
	}

	/// Lenient [`Self::fetch_account`]: `None` when not connected or the call fails.
	pub async fn get_account(&self) -> Option<Account> {
		lenient("get_account", self.fetch_account().await)
	}

	/// Fetches the selected farm.
	pub async fn fetch_farm(&self) -> Result<Farm> {
		const OPERATION: &str = "GET Farm/{id}";

		let farm_id = self.store.fetch_connection().await?.require_farm()?;
		let path = format!("Farm/{farm_id}");
		let farms: OneOrMany<Farm> =
			self.fetch_payload(OPERATION, Method::Get, &path, RequestOptions::default()).await?;

		farms
			.into_first()
			.ok_or_else(|| ApiError::MissingPayload { operation: OPERATION, status: 200 }.into())
	}

	/// Lenient [`Self::fetch_farm`]: `None` when no farm is selected or the call fails.
	pub async fn get_farm(&self) -> Option<Farm> {
		lenient("get_farm", self.fetch_farm().await)
	}

	/// Lists boundaries, scoped to the filter's farm or else the selected farm.
	pub async fn fetch_boundaries(&self, filter: BoundaryFilter) -> Result<Vec<Boundary>> {
		let farm_id = match filter.farm_id {
			Some(farm_id) => Some(farm_id),
			None => self.store.fetch_connection().await?.farm_id,
		};
		let mut options = RequestOptions::default();

		if filter.active_only {
			options = options.query("active", "true");
		}
		if let Some(farm_id) = farm_id {
			options = options.query("farm", farm_id.to_string());
		}

		let boundaries: OneOrMany<Boundary> =
			self.fetch_payload("GET Paddock", Method::Get, "Paddock", options).await?;

		Ok(boundaries.into_vec())
	}

	/// Lenient [`Self::fetch_boundaries`]: empty on any failure.
	pub async fn get_boundaries(&self, filter: BoundaryFilter) -> Vec<Boundary> {
		lenient("get_boundaries", self.fetch_boundaries(filter).await).unwrap_or_default()
	}

	/// Renders boundaries as a GeoJSON FeatureCollection. Each feature's `id` is the boundary
	/// id and its `properties` are the boundary's other fields.
	pub async fn boundary_feature_collection(
		&self,
		filter: BoundaryFilter,
	) -> Result<serde_json::Value> {
		let features = self
			.fetch_boundaries(filter)
			.await?
			.into_iter()
			.map(boundary_feature)
			.collect::<Vec<_>>();

		Ok(serde_json::json!({ "type": "FeatureCollection", "features": features }))
	}

	/// Searches cadastral parcels intersecting `ring` (`POST /vasat/harvest/searchBounds`)
	/// and returns them as a GeoJSON FeatureCollection.
	pub async fn search_cadastral_bounds(&self, ring: &[Position]) -> Result<serde_json::Value> {
		#[derive(Deserialize)]
		struct SearchPayload {
			payload: SearchResults,
		}
		#[derive(Deserialize)]
		struct SearchResults {
			#[serde(default)]
			results: Vec<SearchHit>,
		}
		#[derive(Deserialize)]
		struct SearchHit {
			id: serde_json::Value,
			#[serde(default)]
			item: serde_json::Map<String, serde_json::Value>,
		}

		let body = serde_json::json!({ "type": "Polygon", "coordinates": [ring] });
		let found: SearchPayload = self
			.fetch_payload(
				"POST searchBounds",
				Method::Post,
				"/vasat/harvest/searchBounds",
				RequestOptions::default().json(body),
			)
			.await?;
		let features = found
			.payload
			.results
			.into_iter()
			.map(|mut hit| {
				let geometry = hit.item.remove("geom").unwrap_or(serde_json::Value::Null);

				serde_json::json!({
					"type": "Feature",
					"id": hit.id,
					"geometry": geometry,
					"properties": hit.item,
				})
			})
			.collect::<Vec<_>>();

		Ok(serde_json::json!({ "type": "FeatureCollection", "features": features }))
	}

	async fn send(
		&self,
		method: Method,
		url: &Url,
		options: &RequestOptions,
		authorization: Option<&str>,
	) -> Result<ApiResponse> {
		let mut request = ApiRequest::new(method, url.clone())
			.timeout(options.timeout.unwrap_or(self.config.request_timeout));

		if let Some(authorization) = authorization
			&& !options.has_authorization()
		{
			request = request.header("Authorization", authorization);
		}

		request.headers.extend(options.headers.iter().cloned());
		request.json = options.json.clone();

		Ok(self.http_client.execute(request).await?)
	}

	/// Sends a request and decodes the `payload` of a 2xx response.
	async fn fetch_payload<T>(
		&self,
		operation: &'static str,
		method: Method,
		path: &str,
		options: RequestOptions,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.request(method, path, options).await?;
		let status = response.status;

		if !response.is_success() {
			return Err(ApiError::Status { operation, status, body: response.snippet() }.into());
		}

		match envelope::decode_envelope(&response.body)
			.map_err(|source| ApiError::Json { operation, status, source })?
		{
			Payload::Present(payload) => Ok(payload),
			Payload::Missing => Err(ApiError::MissingPayload { operation, status }.into()),
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client with its own reqwest transport (redirects disabled).
	pub fn new(config: FarmLabConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		Ok(Self::with_http_client(config, store, ReqwestHttpClient::new()?))
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("manager", &self.manager)
			.finish()
	}
}

fn lenient<T>(stage: &'static str, result: Result<T>) -> Option<T> {
	match result {
		Ok(value) => Some(value),
		Err(Error::NotConnected { .. }) => None,
		Err(e) => {
			obs::warn_absorbed(OperationKind::ApiRequest, stage, &e);

			None
		},
	}
}

fn boundary_feature(boundary: Boundary) -> serde_json::Value {
	let id = String::from(boundary.id.clone());
	let mut feature = match &boundary.geojson {
		serde_json::Value::Object(object) => object.clone(),
		_ => serde_json::Map::new(),
	};
	let mut properties = match serde_json::to_value(&boundary) {
		Ok(serde_json::Value::Object(properties)) => properties,
		_ => serde_json::Map::new(),
	};

	properties.remove("geojson");
	feature.entry("type").or_insert_with(|| "Feature".into());
	feature.entry("geometry").or_insert(serde_json::Value::Null);
	feature.insert("id".into(), id.into());
	feature.insert("properties".into(), properties.into());

	serde_json::Value::Object(feature)
}

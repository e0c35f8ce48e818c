#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use farmlab_client::{
	_preludet::*,
	auth::{AccountId, FarmId},
	client::{BoundaryFilter, BoundaryType, NewBoundary, NewFarm, RequestOptions},
	error::ApiError,
	http::Method,
	manager::TokenState,
	store::TokenStore,
};

fn boundary_json(id: &str, name: &str) -> serde_json::Value {
	json!({
		"id": id,
		"name": name,
		"boundaryType": "paddock",
		"farm": { "id": 3 },
		"geojson": {
			"type": "Feature",
			"properties": [],
			"geometry": {
				"type": "Polygon",
				"coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
			},
		},
	})
}

#[tokio::test]
async fn fetch_account_sends_bearer_token() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", Some("refresh-1")).await;
	store.save_account_id(AccountId(7)).await.expect("Failed to seed account id.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Account/7").header("authorization", "Bearer access-1");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!({ "id": 7, "name": "Sam's Farms", "plan": "pro" })));
		})
		.await;
	let account = client.fetch_account().await.expect("Account fetch should succeed.");

	mock.assert_async().await;

	assert_eq!(account.id, AccountId(7));
	assert_eq!(account.name.as_deref(), Some("Sam's Farms"));
	assert_eq!(account.extra.get("plan"), Some(&json!("pro")));
}

#[tokio::test]
async fn lenient_getters_skip_network_when_not_connected() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET);
			then.status(200).body(envelope(json!({ "id": 1 })));
		})
		.await;

	assert!(client.get_account().await.is_none());
	assert!(client.get_farm().await.is_none());

	let err = client.fetch_farm().await.expect_err("Strict fetch should report the missing farm.");

	assert!(matches!(err, Error::NotConnected { missing: "farm" }));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn boundaries_are_scoped_to_selected_farm() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;
	store.save_farm_id(FarmId(3)).await.expect("Failed to seed farm id.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/Paddock")
				.query_param("active", "true")
				.query_param("farm", "3");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!([
					boundary_json("p1", "North"),
					boundary_json("p2", "South"),
				])));
		})
		.await;
	let boundaries = client.get_boundaries(BoundaryFilter::default()).await;

	mock.assert_async().await;

	assert_eq!(boundaries.len(), 2);
	assert_eq!(boundaries[0].id.as_ref(), "p1");
	assert_eq!(boundaries[1].boundary_type, BoundaryType::Paddock);
}

#[tokio::test]
async fn non_success_status_degrades_to_empty_boundaries() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Paddock");
			then.status(500).body("upstream exploded");
		})
		.await;

	assert!(client.get_boundaries(BoundaryFilter::default()).await.is_empty());

	let err = client
		.fetch_boundaries(BoundaryFilter::default())
		.await
		.expect_err("Strict fetch should surface the status.");

	assert!(matches!(err, Error::Api(ApiError::Status { status: 500, .. })));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn missing_payload_is_reported_by_strict_fetch() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Farm");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	let err = client.list_farms().await.expect_err("Missing payload should fail.");

	assert!(matches!(err, Error::Api(ApiError::MissingPayload { status: 200, .. })));
}

#[tokio::test]
async fn unauthorized_response_triggers_one_refresh_and_resend() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-stale", Some("refresh-1")).await;

	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Farm").header("authorization", "Bearer access-stale");
			then.status(401).body("{\"error\":\"expired\"}");
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/access/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-fresh", "refresh-2", 3600));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Farm").header("authorization", "Bearer access-fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!([{ "id": 3, "name": "Home" }])));
		})
		.await;
	let farms = client.list_farms().await.expect("Retried request should succeed.");

	stale.assert_calls_async(1).await;
	login.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(farms.len(), 1);
	assert_eq!(farms[0].id, FarmId(3));
	assert_eq!(client.manager.state(), TokenState::Valid);
}

#[tokio::test]
async fn unauthorized_response_is_returned_when_refresh_is_rejected() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-stale", Some("refresh-revoked")).await;

	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Account");
			then.status(401).body("{\"error\":\"expired\"}");
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/access/login");
			then.status(400).body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let response = client
		.request(Method::Get, "Account", RequestOptions::default())
		.await
		.expect("Non-success statuses should not fail the request.");

	assert_eq!(response.status, 401);

	api.assert_calls_async(1).await;
	login.assert_calls_async(1).await;

	assert_eq!(client.manager.state(), TokenState::Invalid);
	assert!(store.snapshot().token.is_none());
}

#[tokio::test]
async fn caller_authorization_header_wins() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/Farm/5")
				.query_param("expand", "owner")
				.header("authorization", "Basic override");
			then.status(204);
		})
		.await;
	let response = client
		.request(
			Method::Get,
			"Farm/5",
			RequestOptions::default()
				.query("expand", "owner")
				.header("Authorization", "Basic override"),
		)
		.await
		.expect("Request should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status, 204);
}

#[tokio::test]
async fn throttled_response_hands_retry_after_to_caller() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", Some("refresh-1")).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Paddock");
			then.status(429).header("retry-after", "30");
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/access/login");
			then.status(200).body(token_body("unused", "unused", 3600));
		})
		.await;
	let response = client
		.request(Method::Get, "Paddock", RequestOptions::default())
		.await
		.expect("Throttled responses are returned, not raised.");

	mock.assert_async().await;
	login.assert_calls_async(0).await;

	assert_eq!(response.status, 429);
	assert_eq!(response.retry_after, Some(Duration::seconds(30)));
}

#[tokio::test]
async fn connect_resolves_and_stores_account() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));
	let authorize_url =
		client.manager.start_authorization().await.expect("Authorize URL should build.");
	let state = authorize_url
		.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("Authorize URL should carry a state nonce.");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/access/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-connect", "refresh-connect", 3600));
		})
		.await;

	let accounts = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Account").header("authorization", "Bearer access-connect");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!([{ "id": 42, "name": "Sam" }, { "id": 43 }])));
		})
		.await;
	let account_id =
		client.connect("code-1", Some(&state)).await.expect("Connect flow should succeed.");

	accounts.assert_async().await;

	assert_eq!(account_id, AccountId(42));
	assert_eq!(store.snapshot().account_id, Some(AccountId(42)));
}

#[tokio::test]
async fn create_farm_selects_new_farm_once() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;
	store.save_account_id(AccountId(1)).await.expect("Failed to seed account id.");

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/Farm").header("content-type", "application/json");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!({ "id": 77, "name": "New Farm" })));
		})
		.await;
	let farm = NewFarm {
		name: "New Farm".into(),
		owner_email: "sam@example.com".into(),
		owner_name: "Sam".into(),
		owner_phone: "0400 000 000".into(),
	};
	let farm_id = client.create_farm(farm.clone()).await.expect("Farm creation should succeed.");

	assert_eq!(farm_id, FarmId(77));
	assert_eq!(store.snapshot().farm_id, Some(FarmId(77)));

	let err = client.create_farm(farm).await.expect_err("A second farm should be refused.");

	assert!(matches!(err, Error::FarmAlreadySelected { farm_id: FarmId(77) }));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn select_farm_requires_account_and_no_existing_farm() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));
	let err = client.select_farm(FarmId(5)).await.expect_err("No account is stored yet.");

	assert!(matches!(err, Error::NotConnected { missing: "account" }));

	store.save_account_id(AccountId(1)).await.expect("Failed to seed account id.");
	client.select_farm(FarmId(5)).await.expect("Selecting a farm should succeed.");

	let err = client.select_farm(FarmId(6)).await.expect_err("Farm is already selected.");

	assert!(matches!(err, Error::FarmAlreadySelected { farm_id: FarmId(5) }));
	assert_eq!(store.snapshot().farm_id, Some(FarmId(5)));
}

#[tokio::test]
async fn connection_status_reports_records_and_token_state() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;
	store.save_account_id(AccountId(7)).await.expect("Failed to seed account id.");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Account/7");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!([{ "id": 7, "name": "Sam" }])));
		})
		.await;

	let status = client.connection_status().await.expect("Status should be available.");

	assert_eq!(status.connection.account_id, Some(AccountId(7)));
	assert_eq!(status.account.map(|account| account.id), Some(AccountId(7)));
	assert!(status.farm.is_none());
	assert_eq!(status.token_state, TokenState::Valid);
}

#[tokio::test]
async fn create_boundary_posts_feature_under_selected_farm() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;
	store.save_farm_id(FarmId(3)).await.expect("Failed to seed farm id.");

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/Paddock")
				.json_body(json!({
					"farm": { "id": 3 },
					"name": "East",
					"status": "scratched",
					"type": "Paddock",
					"boundaryType": "field",
					"geojson": {
						"type": "Feature",
						"properties": [],
						"geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
					},
				}));
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!({ "id": 501 })));
		})
		.await;
	let id = client
		.create_boundary(NewBoundary {
			name: "East".into(),
			active: true,
			boundary_type: BoundaryType::Field,
			geometry: json!({ "type": "Point", "coordinates": [1.0, 2.0] }),
		})
		.await
		.expect("Boundary creation should succeed.");

	mock.assert_async().await;

	assert_eq!(id.as_deref(), Some("501"));
}

#[tokio::test]
async fn boundary_feature_collection_uses_boundary_ids() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/Paddock").query_param("farm", "8");
			then.status(200)
				.header("content-type", "application/json")
				.body(envelope(json!([boundary_json("p1", "North")])));
		})
		.await;

	let collection = client
		.boundary_feature_collection(BoundaryFilter::default().for_farm(FarmId(8)))
		.await
		.expect("Feature collection should build.");

	assert_eq!(collection["type"], "FeatureCollection");
	assert_eq!(collection["features"][0]["id"], "p1");
	assert_eq!(collection["features"][0]["geometry"]["type"], "Polygon");
	assert_eq!(collection["features"][0]["properties"]["name"], "North");
}

#[tokio::test]
async fn cadastral_search_posts_to_host_root() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(test_config(&server.base_url()));

	seed_valid_token(&store, "access-1", None).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/vasat/harvest/searchBounds");
			then.status(200).header("content-type", "application/json").body(envelope(json!({
				"payload": {
					"results": [{
						"id": "lot-1",
						"item": {
							"geom": { "type": "Point", "coordinates": [1.0, 2.0] },
							"lotplan": "1/DP1",
						},
					}],
				},
			})));
		})
		.await;
	let ring = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
	let collection =
		client.search_cadastral_bounds(&ring).await.expect("Cadastral search should succeed.");

	mock.assert_async().await;

	assert_eq!(collection["features"][0]["id"], "lot-1");
	assert_eq!(collection["features"][0]["geometry"]["type"], "Point");
	assert_eq!(collection["features"][0]["properties"]["lotplan"], "1/DP1");
	assert!(collection["features"][0]["properties"].get("geom").is_none());
}

//! Connects to FarmLab (on the first run), then imports every active boundary of the
//! selected farm into an in-memory asset store and prints the report.
//!
//! ```sh
//! FARMLAB_CLIENT_ID=... FARMLAB_CLIENT_SECRET=... cargo run --example import_boundaries
//! # open the printed URL, then rerun with the callback parameters:
//! FARMLAB_CODE=... FARMLAB_STATE=... cargo run --example import_boundaries
//! ```

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use farmlab_client::{
	client::{ApiClient, BoundaryFilter},
	config::FarmLabConfig,
	store::{FileStore, TokenStore},
	sync::{AssetStore, BoundarySyncer, MemoryAssetStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = FarmLabConfig::builder()
		.api_url(Url::parse(&var_or("FARMLAB_API_URL", "https://farmlab.com.au/api"))?)
		.auth_url(Url::parse(&var_or("FARMLAB_AUTH_URL", "https://auth.farmlab.com.au"))?)
		.client_id(env::var("FARMLAB_CLIENT_ID")?)
		.client_secret(env::var("FARMLAB_CLIENT_SECRET")?)
		.redirect_uri(Url::parse(&var_or(
			"FARMLAB_REDIRECT_URI",
			"https://farm.example.com/farmlab/grant",
		))?)
		.build()?;
	let store: Arc<dyn TokenStore> =
		Arc::new(FileStore::open(var_or("FARMLAB_STORE", "farmlab-store.json"))?);
	let client = Arc::new(ApiClient::new(config, store.clone())?);

	if store.fetch_connection().await?.account_id.is_none() {
		let Ok(code) = env::var("FARMLAB_CODE") else {
			println!("Send your user to {}.", client.manager.start_authorization().await?);

			return Ok(());
		};
		let state = env::var("FARMLAB_STATE").ok();
		let account_id = client.connect(&code, state.as_deref()).await?;

		println!("Connected account {account_id}.");
	}
	if store.fetch_connection().await?.farm_id.is_none() {
		let farm = client
			.list_farms()
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| eyre!("The connected account has no farms."))?;

		client.select_farm(farm.id).await?;
		println!("Selected farm {} ({}).", farm.name, farm.id);
	}

	let boundaries = client.fetch_boundaries(BoundaryFilter::default()).await?;
	let selected = boundaries.iter().map(|boundary| boundary.id.clone()).collect::<Vec<_>>();
	let assets_backend = Arc::new(MemoryAssetStore::default());
	let assets: Arc<dyn AssetStore> = assets_backend.clone();
	let syncer = BoundarySyncer::new(client, assets);
	let report = syncer.import_boundaries(&selected).await?;

	for asset in &report.created {
		println!(
			"Created {} `{}` as {} ({}).",
			asset.land_type, asset.name, asset.id, asset.geometry
		);
	}
	for failure in &report.errors {
		eprintln!("Skipped boundary {}: {}.", failure.boundary_id, failure.error);
	}

	println!("Imported {} of {} boundaries.", assets_backend.len(), selected.len());

	Ok(())
}

fn var_or(key: &str, default: &str) -> String {
	env::var(key).unwrap_or_else(|_| default.to_owned())
}

//! One-way boundary import from FarmLab into local assets, and the reverse export.
//!
//! Imports are idempotent: every created asset carries a [`FARMLAB_TAG_TYPE`] tag holding
//! the boundary id, and each call rebuilds the `boundary id -> asset id` map from the
//! asset store before creating anything.

mod asset;
mod export;

pub use asset::*;
pub use export::*;

// self
use crate::{
	_prelude::*,
	auth::{AssetId, BoundaryId},
	client::{ApiClient, Boundary, BoundaryFilter},
	geometry,
	http::HttpTransport,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::StoreError,
};

/// Per-boundary failure recorded by an import.
#[derive(Debug)]
pub struct ImportFailure {
	/// Boundary that was not imported.
	pub boundary_id: BoundaryId,
	/// Why it was not imported.
	pub error: Error,
}

/// Outcome of [`BoundarySyncer::import_boundaries`].
#[derive(Debug, Default)]
pub struct ImportReport {
	/// Assets created, in fetch order.
	pub created: Vec<ImportedAsset>,
	/// Boundaries that failed individually.
	pub errors: Vec<ImportFailure>,
}
impl ImportReport {
	/// Returns `true` when no boundary failed.
	pub fn is_clean(&self) -> bool {
		self.errors.is_empty()
	}
}

/// Imports FarmLab boundaries into an [`AssetStore`].
pub struct BoundarySyncer<C>
where
	C: ?Sized + HttpTransport,
{
	client: Arc<ApiClient<C>>,
	assets: Arc<dyn AssetStore>,
}
impl<C> BoundarySyncer<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a syncer writing through `assets`.
	pub fn new(client: Arc<ApiClient<C>>, assets: Arc<dyn AssetStore>) -> Self {
		Self { client, assets }
	}

	/// Client used for FarmLab calls.
	pub fn client(&self) -> &Arc<ApiClient<C>> {
		&self.client
	}

	/// Imports the boundaries in `selected` that are not imported yet.
	///
	/// Geometry failures and tag conflicts are recorded per boundary; fetch, auth, and
	/// other storage failures abort the import, keeping assets already created.
	pub async fn import_boundaries(&self, selected: &[BoundaryId]) -> Result<ImportReport> {
		const KIND: OperationKind = OperationKind::Import;

		let span = OperationSpan::new(KIND, "import_boundaries");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.import_inner(selected)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Maps each boundary in `boundaries` that is already imported to its local asset id.
	pub async fn imported_assets(
		&self,
		boundaries: &[Boundary],
	) -> Result<HashMap<BoundaryId, AssetId>> {
		let ids = boundaries.iter().map(|boundary| boundary.id.clone()).collect::<Vec<_>>();

		if ids.is_empty() {
			return Ok(HashMap::new());
		}

		Ok(self
			.assets
			.find_by_external_tag(FARMLAB_TAG_TYPE, &ids)
			.await?
			.into_iter()
			.map(|tagged| (tagged.boundary_id, tagged.asset_id))
			.collect())
	}

	async fn import_inner(&self, selected: &[BoundaryId]) -> Result<ImportReport> {
		self.client.store.fetch_connection().await?.require_account()?;

		if selected.is_empty() {
			return Ok(ImportReport::default());
		}

		let boundaries = self.client.fetch_boundaries(BoundaryFilter::default()).await?;
		let imported = self.imported_assets(&boundaries).await?;
		let selected = selected.iter().collect::<HashSet<_>>();
		let mut seen = HashSet::new();
		let mut report = ImportReport::default();

		for boundary in boundaries {
			if !selected.contains(&boundary.id) {
				continue;
			}
			if imported.contains_key(&boundary.id) {
				obs::debug_skipped(OperationKind::Import, &boundary.id, "already imported");

				continue;
			}
			if !seen.insert(boundary.id.clone()) {
				obs::debug_skipped(OperationKind::Import, &boundary.id, "duplicate in fetch");

				continue;
			}

			let geometry = match geometry::geojson_to_wkt(&boundary.geojson) {
				Ok(wkt) => wkt,
				Err(e) => {
					obs::warn_absorbed(OperationKind::Import, "convert_geometry", &e);
					report.errors.push(ImportFailure { boundary_id: boundary.id, error: e.into() });

					continue;
				},
			};
			let asset = NewAsset {
				land_type: LandType::from(&boundary.boundary_type),
				external_tag: ExternalTag::farmlab(boundary.id.clone()),
				name: boundary.name,
				geometry,
			};

			match self.assets.create(asset.clone()).await {
				Ok(id) => report.created.push(ImportedAsset::new(id, asset)),
				Err(e @ StoreError::Conflict { .. }) => {
					obs::warn_absorbed(OperationKind::Import, "create_asset", &e);
					report.errors.push(ImportFailure { boundary_id: boundary.id, error: e.into() });
				},
				Err(e) => return Err(e.into()),
			}
		}

		Ok(report)
	}
}
impl<C> Debug for BoundarySyncer<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BoundarySyncer").field("client", &self.client).finish_non_exhaustive()
	}
}

//! Export of local assets as FarmLab boundaries.

// self
use crate::{
	_prelude::*,
	auth::{AssetId, BoundaryId},
	client::{BoundaryType, NewBoundary},
	geometry,
	http::HttpTransport,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	sync::BoundarySyncer,
};

/// Local asset offered for export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalAsset {
	/// Local id.
	pub id: AssetId,
	/// Display name.
	pub name: String,
	/// Geometry as WKT.
	pub geometry: String,
	/// Whether the asset is active.
	pub active: bool,
}

/// Asset exported successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedAsset {
	/// Local id.
	pub asset_id: AssetId,
	/// New boundary id, when FarmLab returned one.
	pub boundary_id: Option<BoundaryId>,
}

/// Per-asset failure recorded by an export.
#[derive(Debug)]
pub struct ExportFailure {
	/// Asset that was not exported.
	pub asset_id: AssetId,
	/// Why it was not exported.
	pub error: Error,
}

/// Outcome of [`BoundarySyncer::export_assets`].
#[derive(Debug, Default)]
pub struct ExportReport {
	/// Assets exported, in input order.
	pub created: Vec<ExportedAsset>,
	/// Assets that failed individually.
	pub errors: Vec<ExportFailure>,
}

impl<C> BoundarySyncer<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates one FarmLab boundary of `boundary_type` per asset under the selected farm.
	///
	/// Geometry and API status failures are recorded per asset; transport and auth
	/// failures abort the export.
	pub async fn export_assets(
		&self,
		assets: &[LocalAsset],
		boundary_type: BoundaryType,
	) -> Result<ExportReport> {
		const KIND: OperationKind = OperationKind::Export;

		let span = OperationSpan::new(KIND, "export_assets");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.client.store.fetch_connection().await?.require_farm()?;

				let mut report = ExportReport::default();

				for asset in assets {
					let geometry = match geometry::wkt_to_geojson(&asset.geometry) {
						Ok(geometry) => geometry,
						Err(e) => {
							obs::warn_absorbed(KIND, "convert_geometry", &e);
							report.errors.push(ExportFailure {
								asset_id: asset.id.clone(),
								error: e.into(),
							});

							continue;
						},
					};
					let boundary = NewBoundary {
						name: asset.name.clone(),
						active: asset.active,
						boundary_type: boundary_type.clone(),
						geometry,
					};

					match self.client.create_boundary(boundary).await {
						Ok(boundary_id) => report
							.created
							.push(ExportedAsset { asset_id: asset.id.clone(), boundary_id }),
						Err(e @ Error::Api(_)) => {
							obs::warn_absorbed(KIND, "create_boundary", &e);
							report
								.errors
								.push(ExportFailure { asset_id: asset.id.clone(), error: e });
						},
						Err(e) => return Err(e),
					}
				}

				Ok(report)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

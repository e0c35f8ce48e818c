//! Local asset records and the storage collaborator the syncer writes through.

// self
use crate::{
	_prelude::*,
	auth::{AssetId, BoundaryId},
	client::BoundaryType,
	store::{StoreError, StoreFuture},
};

/// External tag type correlating a local asset with a FarmLab boundary.
pub const FARMLAB_TAG_TYPE: &str = "farmlab_id";

/// Local land classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandType {
	/// Grazing paddock.
	Paddock,
	/// Cropping field.
	Field,
	/// Whole property (cadastral parcel).
	Property,
	/// Anything else.
	Other,
}
impl LandType {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			LandType::Paddock => "paddock",
			LandType::Field => "field",
			LandType::Property => "property",
			LandType::Other => "other",
		}
	}
}
impl From<&BoundaryType> for LandType {
	fn from(boundary_type: &BoundaryType) -> Self {
		match boundary_type {
			BoundaryType::Paddock => LandType::Paddock,
			BoundaryType::Field => LandType::Field,
			BoundaryType::CadastralBoundary => LandType::Property,
			BoundaryType::Zones | BoundaryType::CarbonEstimationArea | BoundaryType::Other(_) =>
				LandType::Other,
		}
	}
}
impl Display for LandType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// `{type, id}` pair stored on an imported asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalTag {
	/// Tag type; always [`FARMLAB_TAG_TYPE`] for imported boundaries.
	#[serde(rename = "type")]
	pub kind: String,
	/// Remote boundary id.
	pub id: BoundaryId,
}
impl ExternalTag {
	/// Tag for a FarmLab boundary.
	pub fn farmlab(id: BoundaryId) -> Self {
		Self { kind: FARMLAB_TAG_TYPE.into(), id }
	}
}

/// Asset to be created by an [`AssetStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
	/// Display name.
	pub name: String,
	/// Geometry as WKT.
	pub geometry: String,
	/// Land classification.
	pub land_type: LandType,
	/// Correlation tag.
	pub external_tag: ExternalTag,
}

/// Asset created by an import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedAsset {
	/// Local id assigned by the store.
	pub id: AssetId,
	/// Display name.
	pub name: String,
	/// Geometry as WKT.
	pub geometry: String,
	/// Land classification.
	pub land_type: LandType,
	/// Correlation tag.
	pub external_tag: ExternalTag,
}
impl ImportedAsset {
	/// Pairs a store-assigned id with the record that was created.
	pub fn new(id: AssetId, asset: NewAsset) -> Self {
		let NewAsset { name, geometry, land_type, external_tag } = asset;

		Self { id, name, geometry, land_type, external_tag }
	}
}

/// Existing asset matched by its external tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedAsset {
	/// Local asset id.
	pub asset_id: AssetId,
	/// Tag id, i.e. the remote boundary id.
	pub boundary_id: BoundaryId,
}

/// Minimal contract of the host's asset storage.
pub trait AssetStore
where
	Self: Send + Sync,
{
	/// Returns assets tagged `kind` whose tag id is one of `ids`.
	fn find_by_external_tag<'a>(
		&'a self,
		kind: &'a str,
		ids: &'a [BoundaryId],
	) -> StoreFuture<'a, Vec<TaggedAsset>>;

	/// Creates an asset and returns its local id.
	///
	/// Implementations reject a second asset with the same tag using
	/// [`StoreError::Conflict`].
	fn create(&self, asset: NewAsset) -> StoreFuture<'_, AssetId>;
}

/// In-process [`AssetStore`] for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssetStore(Arc<RwLock<Vec<ImportedAsset>>>);
impl MemoryAssetStore {
	/// Returns every asset in creation order.
	pub fn assets(&self) -> Vec<ImportedAsset> {
		self.0.read().clone()
	}

	/// Number of stored assets.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing has been created.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl AssetStore for MemoryAssetStore {
	fn find_by_external_tag<'a>(
		&'a self,
		kind: &'a str,
		ids: &'a [BoundaryId],
	) -> StoreFuture<'a, Vec<TaggedAsset>> {
		Box::pin(async move {
			let wanted = ids.iter().collect::<HashSet<_>>();

			Ok(self
				.0
				.read()
				.iter()
				.filter(|asset| {
					asset.external_tag.kind == kind && wanted.contains(&asset.external_tag.id)
				})
				.map(|asset| TaggedAsset {
					asset_id: asset.id.clone(),
					boundary_id: asset.external_tag.id.clone(),
				})
				.collect())
		})
	}

	fn create(&self, asset: NewAsset) -> StoreFuture<'_, AssetId> {
		let assets = self.0.clone();

		Box::pin(async move {
			let mut assets = assets.write();

			if assets.iter().any(|existing| existing.external_tag == asset.external_tag) {
				return Err(StoreError::Conflict {
					message: format!(
						"an asset tagged {}={} already exists",
						asset.external_tag.kind, asset.external_tag.id
					),
				});
			}

			let id = AssetId::new(format!("asset-{}", assets.len() + 1))
				.map_err(|e| StoreError::Backend { message: e.to_string() })?;

			assets.push(ImportedAsset::new(id.clone(), asset));

			Ok(id)
		})
	}
}

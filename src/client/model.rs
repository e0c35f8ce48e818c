//! Typed views of FarmLab accounts, farms, and boundaries.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, BoundaryId, FarmId},
};

/// Extra fields kept verbatim from FarmLab payloads.
pub type ExtraFields = BTreeMap<String, serde_json::Value>;

/// FarmLab account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
	/// Account id.
	pub id: AccountId,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub desc: Option<String>,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: ExtraFields,
}

/// FarmLab farm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
	/// Farm id.
	pub id: FarmId,
	/// Farm name.
	#[serde(default)]
	pub name: String,
	/// Description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub desc: Option<String>,
	/// Owner's name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_name: Option<String>,
	/// Owner's phone.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_phone: Option<String>,
	/// Owner's email.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_email: Option<String>,
	/// Free-form notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: ExtraFields,
}

/// Reference to a farm embedded in other payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FarmRef {
	/// Farm id.
	pub id: FarmId,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: ExtraFields,
}

/// Boundary categories. Unknown values are preserved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoundaryType {
	/// `paddock`
	#[default]
	Paddock,
	/// `zones`
	Zones,
	/// `field`
	Field,
	/// `cadastral_boundary`
	CadastralBoundary,
	/// `carbon_estimation_area`
	CarbonEstimationArea,
	/// Any other value.
	Other(String),
}
impl BoundaryType {
	/// Returns the wire label.
	pub fn as_str(&self) -> &str {
		match self {
			BoundaryType::Paddock => "paddock",
			BoundaryType::Zones => "zones",
			BoundaryType::Field => "field",
			BoundaryType::CadastralBoundary => "cadastral_boundary",
			BoundaryType::CarbonEstimationArea => "carbon_estimation_area",
			BoundaryType::Other(other) => other,
		}
	}
}
impl From<String> for BoundaryType {
	fn from(value: String) -> Self {
		match value.as_str() {
			"paddock" => BoundaryType::Paddock,
			"zones" => BoundaryType::Zones,
			"field" => BoundaryType::Field,
			"cadastral_boundary" => BoundaryType::CadastralBoundary,
			"carbon_estimation_area" => BoundaryType::CarbonEstimationArea,
			_ => BoundaryType::Other(value),
		}
	}
}
impl From<BoundaryType> for String {
	fn from(value: BoundaryType) -> Self {
		match value {
			BoundaryType::Other(other) => other,
			known => known.as_str().to_owned(),
		}
	}
}
impl Display for BoundaryType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Remote boundary (a FarmLab `Paddock` record).
///
/// `geojson` stays raw so one bad geometry never fails the decode of a whole listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
	/// Boundary id.
	pub id: BoundaryId,
	/// Boundary name.
	#[serde(default)]
	pub name: String,
	/// Boundary category.
	#[serde(default)]
	pub boundary_type: BoundaryType,
	/// GeoJSON Feature (or bare geometry).
	#[serde(default)]
	pub geojson: serde_json::Value,
	/// Owning farm.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub farm: Option<FarmRef>,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: ExtraFields,
}

/// Filter for `GET Paddock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryFilter {
	/// Send `active=true`.
	pub active_only: bool,
	/// Farm to scope to; `None` uses the selected farm, if any.
	pub farm_id: Option<FarmId>,
}
impl BoundaryFilter {
	/// Restricts the listing to `farm_id` regardless of the selected farm.
	pub fn for_farm(mut self, farm_id: FarmId) -> Self {
		self.farm_id = Some(farm_id);

		self
	}

	/// Includes inactive boundaries.
	pub fn include_inactive(mut self) -> Self {
		self.active_only = false;

		self
	}
}
impl Default for BoundaryFilter {
	fn default() -> Self {
		Self { active_only: true, farm_id: None }
	}
}

/// Input for `POST Farm`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFarm {
	/// Farm name.
	pub name: String,
	/// Owner's email.
	pub owner_email: String,
	/// Owner's name.
	pub owner_name: String,
	/// Owner's phone.
	pub owner_phone: String,
}

/// Input for `POST Paddock`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBoundary {
	/// Boundary name.
	pub name: String,
	/// Whether the local record is active (`scratched`) or not (`archived`).
	pub active: bool,
	/// Boundary category.
	pub boundary_type: BoundaryType,
	/// GeoJSON geometry object.
	pub geometry: serde_json::Value,
}
impl NewBoundary {
	pub(crate) fn into_payload(self, farm_id: FarmId) -> serde_json::Value {
		serde_json::json!({
			"farm": { "id": farm_id },
			"name": self.name,
			"status": if self.active { "scratched" } else { "archived" },
			"type": "Paddock",
			"boundaryType": self.boundary_type,
			"geojson": {
				"type": "Feature",
				"properties": [],
				"geometry": self.geometry,
			},
		})
	}
}

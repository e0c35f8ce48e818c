//! GeoJSON ↔ WKT conversion for boundary geometries.
//!
//! Both directions go through the [`Geometry`] model and are validated before output:
//! rings must be closed, have at least four positions, and not cross themselves. A
//! failure is a per-record [`GeometryError`]; the syncer records it and moves on.

mod geojson;
mod validate;
mod wkt;

pub use validate::validate;

// self
use crate::_prelude::*;

/// `[x, y]` position; extra ordinates are dropped on input.
pub type Position = [f64; 2];

/// 2D geometry covering the GeoJSON and WKT types FarmLab boundaries use.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
	/// `None` for `POINT EMPTY`.
	Point(Option<Position>),
	/// Open or closed line.
	LineString(Vec<Position>),
	/// Exterior ring followed by holes.
	Polygon(Vec<Vec<Position>>),
	/// Point set.
	MultiPoint(Vec<Position>),
	/// Line set.
	MultiLineString(Vec<Vec<Position>>),
	/// Polygon set.
	MultiPolygon(Vec<Vec<Vec<Position>>>),
	/// Heterogeneous set.
	GeometryCollection(Vec<Geometry>),
}
impl Geometry {
	/// GeoJSON type name.
	pub const fn type_name(&self) -> &'static str {
		match self {
			Geometry::Point(_) => "Point",
			Geometry::LineString(_) => "LineString",
			Geometry::Polygon(_) => "Polygon",
			Geometry::MultiPoint(_) => "MultiPoint",
			Geometry::MultiLineString(_) => "MultiLineString",
			Geometry::MultiPolygon(_) => "MultiPolygon",
			Geometry::GeometryCollection(_) => "GeometryCollection",
		}
	}

	/// Returns `true` for the `EMPTY` form of any type.
	pub fn is_empty(&self) -> bool {
		match self {
			Geometry::Point(point) => point.is_none(),
			Geometry::LineString(positions) | Geometry::MultiPoint(positions) =>
				positions.is_empty(),
			Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => rings.is_empty(),
			Geometry::MultiPolygon(polygons) => polygons.is_empty(),
			Geometry::GeometryCollection(members) => members.is_empty(),
		}
	}

	/// Parses a GeoJSON geometry, Feature, or FeatureCollection.
	pub fn from_geojson(value: &serde_json::Value) -> Result<Self, GeometryError> {
		geojson::parse(value)
	}

	/// Renders as a GeoJSON geometry object.
	pub fn to_geojson(&self) -> serde_json::Value {
		geojson::render(self)
	}

	/// Parses WKT (an optional `SRID=n;` prefix is ignored).
	pub fn from_wkt(text: &str) -> Result<Self, GeometryError> {
		wkt::parse(text)
	}

	/// Renders as WKT.
	pub fn to_wkt(&self) -> String {
		wkt::render(self)
	}
}
impl Display for Geometry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.to_wkt())
	}
}

/// Geometry conversion failures.
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum GeometryError {
	/// Input is not a GeoJSON geometry, Feature, or FeatureCollection.
	#[error("Invalid GeoJSON: {reason}.")]
	InvalidGeoJson {
		/// What was wrong.
		reason: String,
	},
	/// Geometry type is not supported.
	#[error("Unsupported geometry type `{kind}`.")]
	UnsupportedType {
		/// Type name found in the input.
		kind: String,
	},
	/// WKT could not be parsed.
	#[error("Invalid WKT at offset {offset}: {reason}.")]
	WktParse {
		/// Byte offset of the failure.
		offset: usize,
		/// What was expected.
		reason: String,
	},
	/// A coordinate is NaN or infinite.
	#[error("Coordinate is not a finite number.")]
	NonFiniteCoordinate,
	/// A line or ring has too few positions.
	#[error("{kind} needs at least {min} positions, found {found}.")]
	TooFewPositions {
		/// `LineString` or `LinearRing`.
		kind: &'static str,
		/// Required minimum.
		min: usize,
		/// Positions present.
		found: usize,
	},
	/// A ring's first and last positions differ.
	#[error("Ring {ring} is not closed.")]
	UnclosedRing {
		/// Ring index within its polygon (0 is the exterior).
		ring: usize,
	},
	/// A ring crosses or touches itself.
	#[error("Ring {ring} self-intersects near ({x}, {y}).")]
	SelfIntersection {
		/// Ring index within its polygon (0 is the exterior).
		ring: usize,
		/// Approximate x of the offending segment.
		x: f64,
		/// Approximate y of the offending segment.
		y: f64,
	},
	/// A ring encloses no area.
	#[error("Ring {ring} encloses no area.")]
	ZeroAreaRing {
		/// Ring index within its polygon (0 is the exterior).
		ring: usize,
	},
}

/// Converts a GeoJSON geometry (or Feature / FeatureCollection) to WKT.
pub fn geojson_to_wkt(value: &serde_json::Value) -> Result<String, GeometryError> {
	let geometry = Geometry::from_geojson(value)?;

	validate(&geometry)?;

	Ok(geometry.to_wkt())
}

/// Converts WKT to a GeoJSON geometry object.
pub fn wkt_to_geojson(text: &str) -> Result<serde_json::Value, GeometryError> {
	let geometry = Geometry::from_wkt(text)?;

	validate(&geometry)?;

	Ok(geometry.to_geojson())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn square() -> serde_json::Value {
		serde_json::json!({
			"type": "Polygon",
			"coordinates": [[
				[145.1, -37.2],
				[145.3, -37.2],
				[145.3, -37.0],
				[145.1, -37.0],
				[145.1, -37.2]
			]],
		})
	}

	#[test]
	fn simple_polygon_round_trips() {
		let wkt = geojson_to_wkt(&square()).expect("Square should convert to WKT.");

		assert_eq!(wkt, "POLYGON ((145.1 -37.2, 145.3 -37.2, 145.3 -37, 145.1 -37, 145.1 -37.2))");

		let back = wkt_to_geojson(&wkt).expect("WKT should convert back to GeoJSON.");

		assert_eq!(
			Geometry::from_geojson(&back).expect("Output should parse."),
			Geometry::from_geojson(&square()).expect("Input should parse.")
		);
	}

	#[test]
	fn bowtie_is_rejected_in_both_directions() {
		let bowtie = serde_json::json!({
			"type": "Polygon",
			"coordinates": [[[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0], [0.0, 0.0]]],
		});

		assert!(matches!(geojson_to_wkt(&bowtie), Err(GeometryError::SelfIntersection { .. })));
		assert!(matches!(
			wkt_to_geojson("POLYGON ((0 0, 2 2, 2 0, 0 2, 0 0))"),
			Err(GeometryError::SelfIntersection { .. })
		));
	}

	#[test]
	fn unclosed_ring_is_rejected() {
		let open = serde_json::json!({
			"type": "Polygon",
			"coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
		});

		assert_eq!(geojson_to_wkt(&open), Err(GeometryError::UnclosedRing { ring: 0 }));
	}

	#[test]
	fn feature_wrapper_is_unwrapped() {
		let feature = serde_json::json!({
			"type": "Feature",
			"properties": [],
			"geometry": { "type": "Point", "coordinates": [1.5, 2.0] },
		});

		assert_eq!(geojson_to_wkt(&feature).expect("Feature should convert."), "POINT (1.5 2)");
	}
}

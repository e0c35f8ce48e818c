// crates.io
use serde_json::{Map, Value, json};
// self
use crate::geometry::{Geometry, GeometryError, Position};

pub(super) fn parse(value: &Value) -> Result<Geometry, GeometryError> {
	let object = value.as_object().ok_or_else(|| invalid("expected a JSON object"))?;

	match type_of(object)? {
		"Feature" => parse_feature(object),
		"FeatureCollection" => {
			let features = object
				.get("features")
				.and_then(Value::as_array)
				.ok_or_else(|| invalid("FeatureCollection is missing `features`"))?;
			let mut members = features
				.iter()
				.map(|feature| {
					feature
						.as_object()
						.ok_or_else(|| invalid("feature must be an object"))
						.and_then(parse_feature)
				})
				.collect::<Result<Vec<_>, _>>()?;

			if members.len() == 1 {
				Ok(members.remove(0))
			} else {
				Ok(Geometry::GeometryCollection(members))
			}
		},
		_ => parse_geometry(object),
	}
}

fn parse_feature(object: &Map<String, Value>) -> Result<Geometry, GeometryError> {
	match object.get("geometry") {
		Some(Value::Object(geometry)) => parse_geometry(geometry),
		Some(Value::Null) | None => Err(invalid("Feature has no geometry")),
		Some(_) => Err(invalid("Feature geometry must be an object")),
	}
}

fn parse_geometry(object: &Map<String, Value>) -> Result<Geometry, GeometryError> {
	let kind = type_of(object)?;

	if kind == "GeometryCollection" {
		let members = object
			.get("geometries")
			.and_then(Value::as_array)
			.ok_or_else(|| invalid("GeometryCollection is missing `geometries`"))?;

		return members
			.iter()
			.map(|member| {
				member
					.as_object()
					.ok_or_else(|| invalid("geometry must be an object"))
					.and_then(parse_geometry)
			})
			.collect::<Result<Vec<_>, _>>()
			.map(Geometry::GeometryCollection);
	}

	let coordinates =
		object.get("coordinates").ok_or_else(|| invalid("geometry is missing `coordinates`"))?;

	match kind {
		"Point" => match coordinates.as_array() {
			Some(empty) if empty.is_empty() => Ok(Geometry::Point(None)),
			_ => position(coordinates).map(|p| Geometry::Point(Some(p))),
		},
		"LineString" => positions(coordinates).map(Geometry::LineString),
		"Polygon" => rings(coordinates).map(Geometry::Polygon),
		"MultiPoint" => positions(coordinates).map(Geometry::MultiPoint),
		"MultiLineString" => rings(coordinates).map(Geometry::MultiLineString),
		"MultiPolygon" => array(coordinates)?
			.iter()
			.map(rings)
			.collect::<Result<Vec<_>, _>>()
			.map(Geometry::MultiPolygon),
		other => Err(GeometryError::UnsupportedType { kind: other.to_owned() }),
	}
}

fn type_of(object: &Map<String, Value>) -> Result<&str, GeometryError> {
	object.get("type").and_then(Value::as_str).ok_or_else(|| invalid("missing `type`"))
}

fn array(value: &Value) -> Result<&Vec<Value>, GeometryError> {
	value.as_array().ok_or_else(|| invalid("coordinates must be arrays"))
}

fn position(value: &Value) -> Result<Position, GeometryError> {
	let ordinates = array(value)?;

	if ordinates.len() < 2 {
		return Err(invalid("a position needs at least two numbers"));
	}

	let mut out = [0.0; 2];

	for (slot, ordinate) in out.iter_mut().zip(ordinates) {
		*slot = ordinate.as_f64().ok_or_else(|| invalid("ordinates must be numbers"))?;
	}

	Ok(out)
}

fn positions(value: &Value) -> Result<Vec<Position>, GeometryError> {
	array(value)?.iter().map(position).collect()
}

fn rings(value: &Value) -> Result<Vec<Vec<Position>>, GeometryError> {
	array(value)?.iter().map(positions).collect()
}

pub(super) fn render(geometry: &Geometry) -> Value {
	match geometry {
		Geometry::Point(point) => match point {
			Some(p) => json!({ "type": "Point", "coordinates": p }),
			None => json!({ "type": "Point", "coordinates": [] }),
		},
		Geometry::LineString(line) => json!({ "type": "LineString", "coordinates": line }),
		Geometry::Polygon(rings) => json!({ "type": "Polygon", "coordinates": rings }),
		Geometry::MultiPoint(points) => json!({ "type": "MultiPoint", "coordinates": points }),
		Geometry::MultiLineString(lines) =>
			json!({ "type": "MultiLineString", "coordinates": lines }),
		Geometry::MultiPolygon(polygons) =>
			json!({ "type": "MultiPolygon", "coordinates": polygons }),
		Geometry::GeometryCollection(members) => json!({
			"type": "GeometryCollection",
			"geometries": members.iter().map(render).collect::<Vec<_>>(),
		}),
	}
}

fn invalid(reason: &str) -> GeometryError {
	GeometryError::InvalidGeoJson { reason: reason.to_owned() }
}

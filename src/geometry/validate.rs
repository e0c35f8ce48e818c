// self
use crate::geometry::{Geometry, GeometryError, Position};

/// Checks coordinates are finite, lines have two positions, and polygon rings are closed,
/// non-degenerate, and free of self-intersections. Ring-to-ring relations are not checked.
pub fn validate(geometry: &Geometry) -> Result<(), GeometryError> {
	match geometry {
		Geometry::Point(Some(position)) => finite(position),
		Geometry::Point(None) => Ok(()),
		Geometry::MultiPoint(positions) => positions.iter().try_for_each(finite),
		Geometry::LineString(line) => line_string(line),
		Geometry::MultiLineString(lines) => lines.iter().try_for_each(|line| line_string(line)),
		Geometry::Polygon(rings) => polygon(rings),
		Geometry::MultiPolygon(polygons) => polygons.iter().try_for_each(|rings| polygon(rings)),
		Geometry::GeometryCollection(members) => members.iter().try_for_each(validate),
	}
}

fn finite(position: &Position) -> Result<(), GeometryError> {
	if position.iter().all(|ordinate| ordinate.is_finite()) {
		Ok(())
	} else {
		Err(GeometryError::NonFiniteCoordinate)
	}
}

fn line_string(line: &[Position]) -> Result<(), GeometryError> {
	line.iter().try_for_each(finite)?;

	if line.len() == 1 {
		return Err(GeometryError::TooFewPositions { kind: "LineString", min: 2, found: 1 });
	}

	Ok(())
}

fn polygon(rings: &[Vec<Position>]) -> Result<(), GeometryError> {
	rings.iter().enumerate().try_for_each(|(idx, ring)| linear_ring(idx, ring))
}

fn linear_ring(idx: usize, ring: &[Position]) -> Result<(), GeometryError> {
	ring.iter().try_for_each(finite)?;

	if ring.len() < 4 {
		return Err(GeometryError::TooFewPositions {
			kind: "LinearRing",
			min: 4,
			found: ring.len(),
		});
	}
	if ring.first() != ring.last() {
		return Err(GeometryError::UnclosedRing { ring: idx });
	}

	let mut points = ring.to_vec();

	points.dedup();

	if points.len() < 4 {
		return Err(GeometryError::ZeroAreaRing { ring: idx });
	}

	let segments = points.len() - 1;

	for i in 0..segments {
		for j in i + 1..segments {
			let crossing = if j == i + 1 {
				backtracks(points[i], points[i + 1], points[i + 2])
			} else if i == 0 && j == segments - 1 {
				backtracks(points[1], points[0], points[segments - 1])
			} else {
				segments_intersect(points[i], points[i + 1], points[j], points[j + 1])
			};

			if crossing {
				let [x, y] = points[j];

				return Err(GeometryError::SelfIntersection { ring: idx, x, y });
			}
		}
	}

	Ok(())
}

fn cross(o: Position, a: Position, b: Position) -> f64 {
	(a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Adjacent segments `a→shared` and `shared→b` fold back over each other.
fn backtracks(a: Position, shared: Position, b: Position) -> bool {
	let dot = (a[0] - shared[0]) * (b[0] - shared[0]) + (a[1] - shared[1]) * (b[1] - shared[1]);

	cross(a, shared, b) == 0.0 && dot > 0.0
}

fn on_segment(p: Position, q: Position, r: Position) -> bool {
	q[0] <= p[0].max(r[0])
		&& q[0] >= p[0].min(r[0])
		&& q[1] <= p[1].max(r[1])
		&& q[1] >= p[1].min(r[1])
}

fn segments_intersect(p1: Position, p2: Position, p3: Position, p4: Position) -> bool {
	let d1 = cross(p3, p4, p1);
	let d2 = cross(p3, p4, p2);
	let d3 = cross(p1, p2, p3);
	let d4 = cross(p1, p2, p4);

	if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
		&& ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
	{
		return true;
	}

	(d1 == 0.0 && on_segment(p3, p1, p4))
		|| (d2 == 0.0 && on_segment(p3, p2, p4))
		|| (d3 == 0.0 && on_segment(p1, p3, p2))
		|| (d4 == 0.0 && on_segment(p1, p4, p2))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn polygon_of(ring: &[Position]) -> Geometry {
		Geometry::Polygon(vec![ring.to_vec()])
	}

	#[test]
	fn valid_shapes_pass() {
		let square = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]];
		let hole = [[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [1.0, 1.0]];

		validate(&polygon_of(&square)).expect("Square should be valid.");
		validate(&Geometry::Polygon(vec![square.to_vec(), hole.to_vec()]))
			.expect("Square with hole should be valid.");
		validate(&polygon_of(&[[0.0, 0.0], [4.0, 0.0], [4.0, 0.0], [2.0, 3.0], [0.0, 0.0]]))
			.expect("Repeated consecutive positions should be tolerated.");
	}

	#[test]
	fn ring_touching_itself_is_rejected() {
		// Figure-eight pinched at (2, 2).
		let ring =
			[[0.0, 0.0], [2.0, 2.0], [4.0, 0.0], [4.0, 4.0], [2.0, 2.0], [0.0, 4.0], [0.0, 0.0]];

		assert!(matches!(
			validate(&polygon_of(&ring)),
			Err(GeometryError::SelfIntersection { ring: 0, .. })
		));
	}

	#[test]
	fn spikes_and_flat_rings_are_rejected() {
		let spike =
			[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [4.0, 6.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]];

		assert!(matches!(
			validate(&polygon_of(&spike)),
			Err(GeometryError::SelfIntersection { .. })
		));
		assert!(matches!(
			validate(&polygon_of(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 0.0]])),
			Err(GeometryError::SelfIntersection { .. })
		));
		assert_eq!(
			validate(&polygon_of(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 0.0]])),
			Err(GeometryError::ZeroAreaRing { ring: 0 })
		);
	}

	#[test]
	fn short_rings_lines_and_nan_are_rejected() {
		assert!(matches!(
			validate(&polygon_of(&[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]])),
			Err(GeometryError::TooFewPositions { min: 4, found: 3, .. })
		));
		assert!(matches!(
			validate(&Geometry::LineString(vec![[0.0, 0.0]])),
			Err(GeometryError::TooFewPositions { min: 2, .. })
		));
		assert_eq!(
			validate(&Geometry::Point(Some([f64::NAN, 0.0]))),
			Err(GeometryError::NonFiniteCoordinate)
		);
	}
}

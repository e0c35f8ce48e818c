// std
use std::fmt::Write;
// self
use crate::geometry::{Geometry, GeometryError, Position};

/// Deepest `GEOMETRYCOLLECTION` nesting accepted; matches serde_json's recursion limit.
const MAX_NESTING: usize = 128;

pub(super) fn parse(text: &str) -> Result<Geometry, GeometryError> {
	let mut parser = Parser { src: text, pos: 0, depth: 0 };

	parser.skip_srid()?;

	let geometry = parser.geometry()?;

	parser.skip_ws();

	if parser.pos != text.len() {
		return Err(parser.error("unexpected trailing input"));
	}

	Ok(geometry)
}

struct Parser<'a> {
	src: &'a str,
	pos: usize,
	depth: usize,
}
impl Parser<'_> {
	fn rest(&self) -> &str {
		&self.src[self.pos..]
	}

	fn error(&self, reason: &str) -> GeometryError {
		GeometryError::WktParse { offset: self.pos, reason: reason.to_owned() }
	}

	fn skip_ws(&mut self) {
		let trimmed = self.rest().trim_start();

		self.pos = self.src.len() - trimmed.len();
	}

	fn skip_srid(&mut self) -> Result<(), GeometryError> {
		self.skip_ws();

		if self.rest().get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("SRID=")) {
			let end = self.rest().find(';').ok_or_else(|| self.error("SRID prefix needs `;`"))?;

			self.pos += end + 1;
		}

		Ok(())
	}

	fn word(&mut self) -> String {
		self.skip_ws();

		let len = self.rest().find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(self.rest().len());
		let word = self.rest()[..len].to_ascii_uppercase();

		self.pos += len;

		word
	}

	fn peek(&mut self) -> Option<char> {
		self.skip_ws();
		self.rest().chars().next()
	}

	fn expect(&mut self, token: char) -> Result<(), GeometryError> {
		if self.peek() == Some(token) {
			self.pos += token.len_utf8();

			Ok(())
		} else {
			Err(self.error(&format!("expected `{token}`")))
		}
	}

	fn eat(&mut self, token: char) -> bool {
		if self.peek() == Some(token) {
			self.pos += token.len_utf8();

			true
		} else {
			false
		}
	}

	/// Consumes `EMPTY` or `(`; returns `true` for `EMPTY`.
	fn open_or_empty(&mut self) -> Result<bool, GeometryError> {
		let start = self.pos;

		if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
			if self.word() == "EMPTY" {
				return Ok(true);
			}

			self.pos = start;

			return Err(self.error("expected `(` or `EMPTY`"));
		}

		self.expect('(')?;

		Ok(false)
	}

	fn geometry(&mut self) -> Result<Geometry, GeometryError> {
		let start = self.pos;
		let tag = self.word();

		if tag.is_empty() {
			return Err(self.error("expected a geometry type"));
		}

		let dims_at = self.pos;
		let dims = self.word();

		if !matches!(dims.as_str(), "Z" | "M" | "ZM") {
			self.pos = dims_at;
		}

		match tag.as_str() {
			"POINT" =>
				if self.open_or_empty()? {
					Ok(Geometry::Point(None))
				} else {
					let position = self.position()?;

					self.expect(')')?;

					Ok(Geometry::Point(Some(position)))
				},
			"LINESTRING" => self.positions_body().map(Geometry::LineString),
			"POLYGON" => self.rings_body().map(Geometry::Polygon),
			"MULTIPOINT" => self.multi_point_body().map(Geometry::MultiPoint),
			"MULTILINESTRING" => self.rings_body().map(Geometry::MultiLineString),
			"MULTIPOLYGON" => self.list(Self::rings_body).map(Geometry::MultiPolygon),
			"GEOMETRYCOLLECTION" => {
				if self.depth == MAX_NESTING {
					return Err(self.error("nesting too deep"));
				}

				self.depth += 1;

				let members = self.list(Self::geometry);

				self.depth -= 1;

				members.map(Geometry::GeometryCollection)
			},
			_ => {
				self.pos = start;

				Err(GeometryError::UnsupportedType { kind: tag })
			},
		}
	}

	fn list<T>(
		&mut self,
		mut item: impl FnMut(&mut Self) -> Result<T, GeometryError>,
	) -> Result<Vec<T>, GeometryError> {
		if self.open_or_empty()? {
			return Ok(Vec::new());
		}

		let mut items = vec![item(self)?];

		while self.eat(',') {
			items.push(item(self)?);
		}

		self.expect(')')?;

		Ok(items)
	}

	fn positions_body(&mut self) -> Result<Vec<Position>, GeometryError> {
		self.list(Self::position)
	}

	fn rings_body(&mut self) -> Result<Vec<Vec<Position>>, GeometryError> {
		self.list(Self::positions_body)
	}

	fn multi_point_body(&mut self) -> Result<Vec<Position>, GeometryError> {
		self.list(|parser| {
			if parser.eat('(') {
				let position = parser.position()?;

				parser.expect(')')?;

				Ok(position)
			} else {
				parser.position()
			}
		})
	}

	fn position(&mut self) -> Result<Position, GeometryError> {
		let x = self.number()?;
		let y = self.number()?;

		// Z and M ordinates are accepted and dropped.
		for _ in 0..2 {
			if self.peek().is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.')) {
				self.number()?;
			}
		}

		Ok([x, y])
	}

	fn number(&mut self) -> Result<f64, GeometryError> {
		self.skip_ws();

		let len = self
			.rest()
			.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')))
			.unwrap_or(self.rest().len());
		let raw = &self.rest()[..len];

		if raw.is_empty() {
			return Err(self.error("expected a number"));
		}

		let value = raw.parse::<f64>().map_err(|_| self.error("invalid number"))?;

		self.pos += len;

		Ok(value)
	}
}

pub(super) fn render(geometry: &Geometry) -> String {
	let mut out = String::new();

	write_geometry(&mut out, geometry);

	out
}

fn write_geometry(out: &mut String, geometry: &Geometry) {
	out.push_str(&geometry.type_name().to_ascii_uppercase());

	if geometry.is_empty() {
		out.push_str(" EMPTY");

		return;
	}

	out.push(' ');

	match geometry {
		Geometry::Point(Some(position)) => {
			out.push('(');
			write_position(out, position);
			out.push(')');
		},
		Geometry::Point(None) => {},
		Geometry::LineString(positions) | Geometry::MultiPoint(positions) =>
			write_positions(out, positions),
		Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => write_rings(out, rings),
		Geometry::MultiPolygon(polygons) =>
			write_list(out, polygons, |out, rings| write_rings(out, rings)),
		Geometry::GeometryCollection(members) => write_list(out, members, write_geometry),
	}
}

fn write_list<T>(out: &mut String, items: &[T], mut write: impl FnMut(&mut String, &T)) {
	out.push('(');

	for (idx, item) in items.iter().enumerate() {
		if idx > 0 {
			out.push_str(", ");
		}

		write(out, item);
	}

	out.push(')');
}

fn write_rings(out: &mut String, rings: &[Vec<Position>]) {
	write_list(out, rings, |out, ring| write_positions(out, ring));
}

fn write_positions(out: &mut String, positions: &[Position]) {
	write_list(out, positions, write_position);
}

fn write_position(out: &mut String, position: &Position) {
	let _ = write!(out, "{} {}", position[0], position[1]);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_every_supported_type() {
		let cases = [
			("POINT (1 2)", Geometry::Point(Some([1.0, 2.0]))),
			("point empty", Geometry::Point(None)),
			("LINESTRING (0 0, 1 1)", Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]])),
			("MULTIPOINT ((0 0), (1 1))", Geometry::MultiPoint(vec![[0.0, 0.0], [1.0, 1.0]])),
			("MULTIPOINT (0 0, 1 1)", Geometry::MultiPoint(vec![[0.0, 0.0], [1.0, 1.0]])),
			(
				"MULTILINESTRING ((0 0, 1 1), (2 2, 3 3))",
				Geometry::MultiLineString(vec![
					vec![[0.0, 0.0], [1.0, 1.0]],
					vec![[2.0, 2.0], [3.0, 3.0]],
				]),
			),
			("MULTIPOLYGON EMPTY", Geometry::MultiPolygon(Vec::new())),
			(
				"GEOMETRYCOLLECTION (POINT (1 2), LINESTRING EMPTY)",
				Geometry::GeometryCollection(vec![
					Geometry::Point(Some([1.0, 2.0])),
					Geometry::LineString(Vec::new()),
				]),
			),
		];

		for (text, expected) in cases {
			assert_eq!(parse(text).expect(text), expected, "{text}");
		}
	}

	#[test]
	fn z_m_tags_and_srid_are_accepted() {
		assert_eq!(
			parse("SRID=4326;POINT Z (1 2 3)").expect("EWKT point should parse."),
			Geometry::Point(Some([1.0, 2.0]))
		);
		assert_eq!(
			parse("LINESTRING ZM (0 0 5 6, 1 1 7 8)").expect("ZM line should parse."),
			Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]])
		);
	}

	#[test]
	fn errors_carry_offsets() {
		assert_eq!(
			parse("POINT (1 2"),
			Err(GeometryError::WktParse { offset: 10, reason: "expected `)`".into() })
		);
		assert!(matches!(parse("CIRCLE (0 0)"), Err(GeometryError::UnsupportedType { .. })));
		assert!(matches!(
			parse("POINT (1 2) junk"),
			Err(GeometryError::WktParse { offset: 12, .. })
		));
		assert!(matches!(parse("POINT (a b)"), Err(GeometryError::WktParse { offset: 7, .. })));
	}

	#[test]
	fn deep_collection_nesting_is_an_error() {
		let nested = |depth: usize| {
			format!(
				"{}POINT EMPTY{}",
				"GEOMETRYCOLLECTION (".repeat(depth),
				")".repeat(depth)
			)
		};

		assert!(parse(&nested(MAX_NESTING)).is_ok());
		assert!(matches!(
			parse(&nested(200_000)),
			Err(GeometryError::WktParse { reason, .. }) if reason == "nesting too deep"
		));
	}

	#[test]
	fn renders_nested_structures() {
		let polygon = Geometry::MultiPolygon(vec![vec![vec![
			[0.0, 0.0],
			[1.0, 0.0],
			[1.0, 1.0],
			[0.0, 0.0],
		]]]);

		assert_eq!(render(&polygon), "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)))");
		assert_eq!(render(&Geometry::GeometryCollection(Vec::new())), "GEOMETRYCOLLECTION EMPTY");
	}
}

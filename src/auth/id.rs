//! Strongly typed identifiers for FarmLab and local records.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "RawId", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl TryFrom<RawId> for $name {
			type Error = IdentifierError;

			fn try_from(value: RawId) -> Result<Self, Self::Error> {
				match value {
					RawId::Text(text) => Self::try_from(text),
					RawId::Number(number) => Ok(Self(number.to_string())),
				}
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

macro_rules! def_numeric_id {
	($name:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub i64);
		impl $name {
			/// Returns the raw numeric value.
			pub const fn get(self) -> i64 {
				self.0
			}
		}
		impl From<i64> for $name {
			fn from(value: i64) -> Self {
				Self(value)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				Display::fmt(&self.0, f)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (boundary, asset).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (boundary, asset).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (boundary, asset).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Wire form of a string identifier; FarmLab emits both numbers and strings.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RawId {
	/// Textual identifier.
	Text(String),
	/// Numeric identifier, kept as its decimal string.
	Number(i64),
}

def_id! { BoundaryId, "Identifier of a remote FarmLab boundary (paddock).", "Boundary" }
def_id! { AssetId, "Identifier of a locally stored asset.", "Asset" }

def_numeric_id! { AccountId, "Identifier of the connected FarmLab account." }
def_numeric_id! { FarmId, "Identifier of the selected FarmLab farm." }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_blank_and_whitespace() {
		assert!(BoundaryId::new(" p1").is_err(), "Leading whitespace must be rejected.");
		assert!(BoundaryId::new("p1 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(AssetId::new("").is_err());

		let boundary = BoundaryId::new("p1").expect("Boundary fixture should be valid.");

		assert_eq!(boundary.as_ref(), "p1");
	}

	#[test]
	fn boundary_ids_accept_numbers_and_strings() {
		let numeric: BoundaryId =
			serde_json::from_str("42").expect("Numeric boundary id should deserialize.");
		let text: BoundaryId =
			serde_json::from_str("\"42\"").expect("String boundary id should deserialize.");

		assert_eq!(numeric, text);
		assert_eq!(serde_json::to_string(&numeric).expect("Id should serialize."), "\"42\"");
		assert!(serde_json::from_str::<BoundaryId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_enforced() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		AssetId::new(&exact).expect("Exact length should succeed.");

		assert!(AssetId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<BoundaryId, u8> = HashMap::from_iter([(
			BoundaryId::new("p-123").expect("Boundary used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("p-123"), Some(&7));
	}

	#[test]
	fn numeric_ids_are_transparent() {
		let farm: FarmId = serde_json::from_str("17").expect("Farm id should deserialize.");

		assert_eq!(farm, FarmId(17));
		assert_eq!(farm.to_string(), "17");
	}
}

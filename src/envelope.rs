//! `{payload: ...}` response envelopes used by every FarmLab endpoint.
//!
//! A missing or `null` payload signals failure regardless of the HTTP status, so the
//! envelope is decoded into [`Payload`] at the edge and callers match on it.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Outcome of decoding a FarmLab envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload<T> {
	/// The envelope carried data.
	Present(T),
	/// The envelope carried no `payload` (or `payload: null`).
	Missing,
}
impl<T> Payload<T> {
	/// Converts into an [`Option`].
	pub fn into_option(self) -> Option<T> {
		match self {
			Payload::Present(value) => Some(value),
			Payload::Missing => None,
		}
	}

	/// Returns `true` when data is present.
	pub fn is_present(&self) -> bool {
		matches!(self, Payload::Present(_))
	}
}

#[derive(Deserialize)]
struct Envelope<T> {
	#[serde(default = "Option::default")]
	payload: Option<T>,
}

/// Decodes an envelope, reporting the JSON path of any decode failure.
///
/// An empty body counts as a missing payload.
pub fn decode_envelope<T>(
	body: &[u8],
) -> Result<Payload<T>, serde_path_to_error::Error<serde_json::Error>>
where
	T: DeserializeOwned,
{
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Payload::Missing);
	}

	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let envelope: Envelope<T> = serde_path_to_error::deserialize(&mut deserializer)?;

	Ok(envelope.payload.map_or(Payload::Missing, Payload::Present))
}

/// Payload that FarmLab returns either as a single object or a list.
///
/// `GET Account/{id}` and `GET Farm/{id}` have been observed to return both shapes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
	/// List of objects. Tried first so a list is never taken for a single `T`.
	Many(Vec<T>),
	/// Single object.
	One(T),
}
impl<T> OneOrMany<T> {
	/// Returns the first element.
	pub fn into_first(self) -> Option<T> {
		match self {
			OneOrMany::One(value) => Some(value),
			OneOrMany::Many(values) => values.into_iter().next(),
		}
	}

	/// Flattens into a vector.
	pub fn into_vec(self) -> Vec<T> {
		match self {
			OneOrMany::One(value) => vec![value],
			OneOrMany::Many(values) => values,
		}
	}
}

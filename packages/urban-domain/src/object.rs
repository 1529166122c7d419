use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Center `x, y, z` followed by the `width, height, depth` extents.
pub type BoundingBox = [f64; 6];

pub type Point3 = [f64; 3];

/// An incoming sighting of a 3D object, as posted by capture pipelines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Observation {
	pub id: String,
	pub city: String,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub lat: f64,
	pub lon: f64,
	#[serde(rename = "type")]
	pub object_type: String,
	pub pointcloud: Vec<Point3>,
	pub bbox: BoundingBox,
}
impl Observation {
	pub fn validate(&self) -> Result<(), ObservationError> {
		if self.id.trim().is_empty() {
			return Err(ObservationError::new("$.id", "id must be non-empty."));
		}
		if self.object_type.trim().is_empty() {
			return Err(ObservationError::new("$.type", "type must be non-empty."));
		}
		if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
			return Err(ObservationError::new("$.lat", "lat must be a finite number in -90..=90."));
		}
		if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
			return Err(ObservationError::new(
				"$.lon",
				"lon must be a finite number in -180..=180.",
			));
		}
		if let Some(index) = self.bbox.iter().position(|value| !value.is_finite()) {
			return Err(ObservationError::new(
				format!("$.bbox[{index}]"),
				"bbox values must be finite numbers.",
			));
		}
		if self.pointcloud.is_empty() {
			return Err(ObservationError::new("$.pointcloud", "pointcloud must be non-empty."));
		}
		if let Some(index) =
			self.pointcloud.iter().position(|point| point.iter().any(|value| !value.is_finite()))
		{
			return Err(ObservationError::new(
				format!("$.pointcloud[{index}]"),
				"pointcloud coordinates must be finite numbers.",
			));
		}

		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationError {
	pub path: String,
	pub message: String,
}
impl ObservationError {
	fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
		Self { path: path.into(), message: message.into() }
	}
}
impl Display for ObservationError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.path, self.message)
	}
}
impl std::error::Error for ObservationError {}

/// The typed shape of a stored object's metadata payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
	pub id: String,
	pub city: String,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub lat: f64,
	pub lon: f64,
	#[serde(rename = "type")]
	pub object_type: String,
	pub bbox: BoundingBox,
}
impl ObjectMetadata {
	pub fn from_observation(observation: &Observation, normalized_type: &str) -> Self {
		Self {
			id: observation.id.clone(),
			city: observation.city.clone(),
			timestamp: observation.timestamp,
			lat: observation.lat,
			lon: observation.lon,
			object_type: normalized_type.to_string(),
			bbox: observation.bbox,
		}
	}

	pub fn from_payload(payload: &Map<String, Value>) -> serde_json::Result<Self> {
		serde_json::from_value(Value::Object(payload.clone()))
	}

	pub fn to_payload(&self) -> serde_json::Result<Map<String, Value>> {
		match serde_json::to_value(self)? {
			Value::Object(map) => Ok(map),
			other => Err(serde::ser::Error::custom(format!(
				"object metadata serialized to a non-object value: {other}"
			))),
		}
	}
}

#[derive(Serialize)]
struct ObservedFields<'a> {
	#[serde(with = "crate::time_serde")]
	timestamp: OffsetDateTime,
	lat: f64,
	lon: f64,
	#[serde(rename = "type")]
	object_type: &'a str,
	bbox: BoundingBox,
}

/// Overlays the fields an observation re-measures onto a stored payload.
///
/// The stored identifier, origin city and any keys the observation does not carry are kept
/// as they are. A payload without an `id` key receives `record_id`.
pub fn merge_observation(
	record_id: &str,
	existing: &Map<String, Value>,
	observation: &Observation,
	normalized_type: &str,
) -> serde_json::Result<Map<String, Value>> {
	let observed = serde_json::to_value(ObservedFields {
		timestamp: observation.timestamp,
		lat: observation.lat,
		lon: observation.lon,
		object_type: normalized_type,
		bbox: observation.bbox,
	})?;
	let mut merged = existing.clone();

	if let Value::Object(fields) = observed {
		merged.extend(fields);
	}

	merged.entry("id").or_insert_with(|| Value::String(record_id.to_string()));

	Ok(merged)
}

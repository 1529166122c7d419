use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{DecisionRequest, Error, MatchCandidate, MatchContext, Result, UrbanService};
use urban_domain::{
	decision::{Decision, Outcome},
	object::{ObjectMetadata, Observation, Point3, merge_observation},
};

pub const CREATED_STATUS: &str = "new object created";
pub const UPDATED_STATUS: &str = "object updated";

#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionOutcome {
	/// The arbiter kept the stored record; nothing was written or sent.
	Unchanged { existing: ObjectMetadata, reason: String },
	Updated,
	Created,
}

#[derive(Serialize)]
struct NotificationPayload<'a> {
	id: &'a str,
	#[serde(rename = "type")]
	object_type: &'a str,
	#[serde(with = "urban_domain::time_serde")]
	timestamp: OffsetDateTime,
	points3d: &'a [Point3],
}

impl UrbanService {
	/// Matches the observation against stored records and creates, replaces or keeps.
	///
	/// Concurrent calls are not serialized. Two observations of the same unseen object that
	/// resolve at the same time can both create a record.
	pub async fn resolve(&self, observation: Observation) -> Result<ResolutionOutcome> {
		observation.validate().map_err(|err| Error::InvalidRequest { message: err.to_string() })?;

		let normalized_type = self.normalize_type(&observation).await?;
		let embedding = self.encode(&observation).await?;
		let Some(candidate) = self.retrievers.find_match(&embedding).await? else {
			return self.create(&observation, &normalized_type, &embedding).await;
		};
		let decision = self.decide(&candidate, &observation, &normalized_type).await;

		tracing::info!(
			object_id = %observation.id,
			record_id = %candidate.record_id,
			score = candidate.score,
			decision = decision.outcome.as_str(),
			reason = %decision.reason,
			"Arbiter decision."
		);

		match decision.outcome {
			Outcome::Keep => {
				let existing = ObjectMetadata::from_payload(&candidate.metadata).map_err(|err| {
					Error::Validation {
						message: format!(
							"Stored record {} does not match the object schema: {err}.",
							candidate.record_id
						),
					}
				})?;

				Ok(ResolutionOutcome::Unchanged { existing, reason: decision.reason })
			},
			Outcome::Replace => {
				let merged = merge_observation(
					&candidate.record_id,
					&candidate.metadata,
					&observation,
					&normalized_type,
				)
				.map_err(|err| Error::Validation { message: err.to_string() })?;

				self.store
					.insert(&candidate.record_id, &embedding, &merged)
					.await
					.map_err(|err| Error::Persistence { message: err.to_string() })?;

				tracing::info!(record_id = %candidate.record_id, "Object updated.");

				self.notify(&observation).await;

				Ok(ResolutionOutcome::Updated)
			},
		}
	}

	async fn normalize_type(&self, observation: &Observation) -> Result<String> {
		let normalized = self
			.providers
			.normalizer
			.normalize(&self.cfg.providers.llm, &observation.object_type)
			.await
			.map_err(|err| {
				tracing::error!(object_id = %observation.id, error = %err, "Type normalization failed.");

				Error::Normalization { message: err.to_string() }
			})?;
		let normalized = match normalized.trim() {
			"" => observation.object_type.trim().to_string(),
			label => label.to_string(),
		};

		tracing::info!(
			object_id = %observation.id,
			raw_type = %observation.object_type,
			normalized_type = %normalized,
			"Normalized object type."
		);

		Ok(normalized)
	}

	async fn encode(&self, observation: &Observation) -> Result<Vec<f32>> {
		let embedding = self
			.providers
			.encoder
			.encode(&self.cfg.providers.encoder, &observation.pointcloud)
			.await
			.map_err(|err| {
				tracing::error!(object_id = %observation.id, error = %err, "Point cloud encoding failed.");

				Error::Encoding { message: err.to_string() }
			})?;
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if embedding.len() != expected {
			return Err(Error::Encoding {
				message: format!(
					"Encoder returned {} dimensions; expected {expected}.",
					embedding.len()
				),
			});
		}

		Ok(embedding)
	}

	async fn decide(
		&self,
		candidate: &MatchCandidate,
		observation: &Observation,
		normalized_type: &str,
	) -> Decision {
		let request = DecisionRequest {
			existing: &candidate.metadata,
			incoming: observation,
			normalized_type,
			context: MatchContext { score: candidate.score },
		};

		match self.providers.arbiter.decide(&self.cfg.providers.llm, request).await {
			Ok(raw) => Decision::parse_or_keep(&raw),
			Err(err) => {
				tracing::warn!(object_id = %observation.id, error = %err, "Arbiter failed; keeping the stored record.");

				Decision::keep(err.to_string())
			},
		}
	}

	async fn create(
		&self,
		observation: &Observation,
		normalized_type: &str,
		embedding: &[f32],
	) -> Result<ResolutionOutcome> {
		let metadata = ObjectMetadata::from_observation(observation, normalized_type)
			.to_payload()
			.map_err(|err| Error::Validation { message: err.to_string() })?;

		self.store
			.insert(&observation.id, embedding, &metadata)
			.await
			.map_err(|err| Error::Persistence { message: err.to_string() })?;

		tracing::info!(object_id = %observation.id, "Object created.");

		self.notify(observation).await;

		Ok(ResolutionOutcome::Created)
	}

	/// One delivery attempt; failures are logged and never reach the caller.
	async fn notify(&self, observation: &Observation) {
		let payload = match serde_json::to_value(NotificationPayload {
			id: &observation.id,
			object_type: &observation.object_type,
			timestamp: observation.timestamp,
			points3d: &observation.pointcloud,
		}) {
			Ok(payload) => payload,
			Err(err) => {
				tracing::error!(object_id = %observation.id, error = %err, "Failed to build notification.");

				return;
			},
		};

		match self.providers.notifier.notify(&self.cfg.providers.notifier, &payload).await {
			Ok(()) => tracing::info!(object_id = %observation.id, "Notified downstream."),
			Err(err) => {
				tracing::error!(object_id = %observation.id, error = %err, "Notification failed.")
			},
		}
	}
}

impl ResolutionOutcome {
	/// The HTTP body: a status string, or the kept record.
	pub fn to_response(&self) -> serde_json::Result<Value> {
		match self {
			Self::Unchanged { existing, .. } => serde_json::to_value(existing),
			Self::Updated => Ok(Value::from(UPDATED_STATUS)),
			Self::Created => Ok(Value::from(CREATED_STATUS)),
		}
	}
}

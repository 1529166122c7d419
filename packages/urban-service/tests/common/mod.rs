#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Map, Value};
use time::macros::datetime;

use urban_config::{Config, EncoderProviderConfig, LlmProviderConfig, NotifierConfig};
use urban_domain::object::{Observation, Point3};
use urban_service::{
	BoxFuture, DecisionArbiter, DecisionRequest, Notifier, PointEncoder, PredicateSynthesizer,
	Providers, TypeNormalizer, UrbanService,
};
use urban_testkit::{MemoryStore, Recorder, Script};

pub const DIM: u32 = 3;
pub const REPLACE_REPLY: &str = r#"{"decision": "update", "reason": "newer daylight scan"}"#;
pub const KEEP_REPLY: &str = r#"{"decision": "keep", "reason": "night capture is less reliable"}"#;

pub fn test_config(batch_size: u32) -> Config {
	urban_testkit::test_config(DIM, batch_size)
}

fn failure(message: &str) -> urban_providers::Error {
	urban_providers::Error::InvalidResponse { message: message.to_string() }
}

/// `None` entries fail the call.
pub struct ScriptedEncoder {
	pub replies: Script<Option<Vec<f32>>>,
}
impl PointEncoder for ScriptedEncoder {
	fn encode<'a>(
		&'a self,
		_cfg: &'a EncoderProviderConfig,
		_points: &'a [Point3],
	) -> BoxFuture<'a, urban_providers::Result<Vec<f32>>> {
		Box::pin(async move { self.replies.next().flatten().ok_or_else(|| failure("encoder down")) })
	}
}

pub struct ScriptedNormalizer {
	pub replies: Script<Option<String>>,
}
impl TypeNormalizer for ScriptedNormalizer {
	fn normalize<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_raw: &'a str,
	) -> BoxFuture<'a, urban_providers::Result<String>> {
		Box::pin(async move {
			self.replies.next().flatten().ok_or_else(|| failure("normalizer down"))
		})
	}
}

pub struct ScriptedArbiter {
	pub replies: Script<Option<String>>,
	pub scores: Recorder<f32>,
	pub existing: Recorder<Map<String, Value>>,
}
impl DecisionArbiter for ScriptedArbiter {
	fn decide<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		request: DecisionRequest<'a>,
	) -> BoxFuture<'a, urban_providers::Result<String>> {
		Box::pin(async move {
			self.scores.record(request.context.score);
			self.existing.record(request.existing.clone());

			self.replies.next().flatten().ok_or_else(|| failure("arbiter timed out"))
		})
	}
}

pub struct ScriptedSynthesizer {
	pub replies: Script<Option<String>>,
	pub conditions: Recorder<String>,
}
impl PredicateSynthesizer for ScriptedSynthesizer {
	fn synthesize<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		condition: &'a str,
	) -> BoxFuture<'a, urban_providers::Result<String>> {
		Box::pin(async move {
			self.conditions.record(condition.to_string());

			self.replies.next().flatten().ok_or_else(|| failure("synthesizer down"))
		})
	}
}

pub struct RecordingNotifier {
	pub fail: bool,
	pub payloads: Recorder<Value>,
}
impl Notifier for RecordingNotifier {
	fn notify<'a>(
		&'a self,
		_cfg: &'a NotifierConfig,
		payload: &'a Value,
	) -> BoxFuture<'a, urban_providers::Result<()>> {
		Box::pin(async move {
			self.payloads.record(payload.clone());

			if self.fail { Err(failure("webhook returned 503")) } else { Ok(()) }
		})
	}
}

pub struct Fakes {
	pub encoder: Arc<ScriptedEncoder>,
	pub normalizer: Arc<ScriptedNormalizer>,
	pub arbiter: Arc<ScriptedArbiter>,
	pub synthesizer: Arc<ScriptedSynthesizer>,
	pub notifier: Arc<RecordingNotifier>,
}
impl Fakes {
	pub fn encoder_returns(mut self, embedding: Option<Vec<f32>>) -> Self {
		self.encoder = Arc::new(ScriptedEncoder { replies: Script::repeating(embedding) });

		self
	}

	pub fn normalizer_returns(mut self, label: Option<&str>) -> Self {
		self.normalizer =
			Arc::new(ScriptedNormalizer { replies: Script::repeating(label.map(str::to_string)) });

		self
	}

	pub fn arbiter_returns(mut self, reply: Option<&str>) -> Self {
		self.arbiter = Arc::new(ScriptedArbiter {
			replies: Script::repeating(reply.map(str::to_string)),
			scores: Recorder::default(),
			existing: Recorder::default(),
		});

		self
	}

	pub fn synthesizer_returns(mut self, expression: Option<&str>) -> Self {
		self.synthesizer = Arc::new(ScriptedSynthesizer {
			replies: Script::repeating(expression.map(str::to_string)),
			conditions: Recorder::default(),
		});

		self
	}

	pub fn notifier_fails(mut self) -> Self {
		self.notifier = Arc::new(RecordingNotifier { fail: true, payloads: Recorder::default() });

		self
	}
}
impl Default for Fakes {
	fn default() -> Self {
		Self {
			encoder: Arc::new(ScriptedEncoder { replies: Script::repeating(Some(vec![0.5, 0.0, 0.0])) }),
			normalizer: Arc::new(ScriptedNormalizer {
				replies: Script::repeating(Some("Car".to_string())),
			}),
			arbiter: Arc::new(ScriptedArbiter {
				replies: Script::repeating(Some(REPLACE_REPLY.to_string())),
				scores: Recorder::default(),
				existing: Recorder::default(),
			}),
			synthesizer: Arc::new(ScriptedSynthesizer {
				replies: Script::repeating(Some(r#"type == "Car""#.to_string())),
				conditions: Recorder::default(),
			}),
			notifier: Arc::new(RecordingNotifier { fail: false, payloads: Recorder::default() }),
		}
	}
}

pub struct Harness {
	pub service: UrbanService,
	pub store: Arc<MemoryStore>,
	pub fakes: Fakes,
}
impl Harness {
	pub fn new(fakes: Fakes) -> Self {
		Self::with_config(test_config(1_000), fakes)
	}

	pub fn with_config(cfg: Config, fakes: Fakes) -> Self {
		let store = Arc::new(MemoryStore::new());
		let providers = Providers::new(
			fakes.encoder.clone(),
			fakes.normalizer.clone(),
			fakes.arbiter.clone(),
			fakes.synthesizer.clone(),
			fakes.notifier.clone(),
		);
		let service = UrbanService::with_providers(cfg, store.clone(), providers);

		Self { service, store, fakes }
	}
}

pub fn observation(id: &str, raw_type: &str) -> Observation {
	Observation {
		id: id.to_string(),
		city: "Riga".to_string(),
		timestamp: datetime!(2025-07-14 09:30 UTC),
		lat: 56.95,
		lon: 24.1,
		object_type: raw_type.to_string(),
		pointcloud: vec![[0.0, 0.0, 0.0], [1.0, 0.5, 0.25]],
		bbox: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
	}
}

pub fn stored_record(id: &str, object_type: &str) -> Value {
	serde_json::json!({
		"id": id,
		"city": "Tallinn",
		"timestamp": "2024-01-01T00:00:00Z",
		"lat": 59.4,
		"lon": 24.7,
		"type": object_type,
		"bbox": [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
		"surveyor": "crew-7",
	})
}

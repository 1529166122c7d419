use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub resolution: Resolution,
	#[serde(default)]
	pub stream: Stream,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Allows any origin, method and header on the HTTP surface.
	#[serde(default = "default_true")]
	pub cors_permissive: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	#[serde(default = "default_collection")]
	pub collection: String,
	/// Embedding dimension shared by the encoder output and the collection schema.
	#[serde(default = "default_vector_dim")]
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub encoder: EncoderProviderConfig,
	pub llm: LlmProviderConfig,
	pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize)]
pub struct EncoderProviderConfig {
	pub api_base: String,
	pub path: String,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default = "default_base_backoff_ms")]
	pub base_backoff_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct NotifierConfig {
	pub url: String,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Resolution {
	/// Candidates are accepted only when their distance is strictly below this value.
	pub match_threshold: f32,
	pub top_k: u32,
}
impl Default for Resolution {
	fn default() -> Self {
		Self { match_threshold: 0.8, top_k: 1 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Stream {
	pub batch_size: u32,
}
impl Default for Stream {
	fn default() -> Self {
		Self { batch_size: 1_000 }
	}
}

fn default_true() -> bool {
	true
}

fn default_collection() -> String {
	"object_vectors".to_string()
}

fn default_vector_dim() -> u32 {
	256
}

fn default_timeout_ms() -> u64 {
	5_000
}

fn default_max_attempts() -> u32 {
	3
}

fn default_base_backoff_ms() -> u64 {
	1_000
}

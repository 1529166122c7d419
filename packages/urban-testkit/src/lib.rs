pub mod memory;
pub mod script;

mod error;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use script::{Recorder, Script};

use std::{env, thread, time::Duration};

use qdrant_client::Qdrant;
use serde_json::Map;
use tokio::{runtime::Builder, time};
use uuid::Uuid;

use urban_config::{
	Config, EncoderProviderConfig, LlmProviderConfig, NotifierConfig, Providers, Qdrant as QdrantConfig,
	Resolution, Service, Storage, Stream,
};

/// A uniquely named Qdrant collection that is deleted on cleanup or drop.
pub struct TestCollection {
	url: String,
	name: String,
	cleaned: bool,
}
impl TestCollection {
	pub fn new(url: &str, prefix: &str) -> Self {
		Self {
			url: url.to_string(),
			name: format!("{prefix}_{}", Uuid::new_v4().simple()),
			cleaned: false,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn qdrant_config(&self, vector_dim: u32) -> QdrantConfig {
		QdrantConfig {
			url: self.url.clone(),
			collection: self.name.clone(),
			vector_dim,
		}
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleaned = true;

		delete_collection(&self.url, &self.name).await
	}
}
impl Drop for TestCollection {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let url = self.url.clone();
		let name = self.name.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test collection cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(delete_collection(&url, &name)) {
				eprintln!("Test Qdrant cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

/// A complete configuration pointing every provider at an unroutable address.
pub fn test_config(vector_dim: u32, batch_size: u32) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			cors_permissive: true,
		},
		storage: Storage {
			qdrant: QdrantConfig {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "object_vectors".to_string(),
				vector_dim,
			},
		},
		providers: Providers {
			encoder: EncoderProviderConfig {
				api_base: "http://127.0.0.1:1".to_string(),
				path: "/encode".to_string(),
				api_key: None,
				timeout_ms: 1_000,
				max_attempts: 1,
				base_backoff_ms: 1,
				default_headers: Map::new(),
			},
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			notifier: NotifierConfig {
				url: "http://127.0.0.1:1/notify".to_string(),
				api_key: None,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		resolution: Resolution { match_threshold: 0.8, top_k: 1 },
		stream: Stream { batch_size },
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("URBAN_QDRANT_URL").ok()
}

async fn delete_collection(url: &str, name: &str) -> Result<()> {
	let client = Qdrant::from_url(url).build()?;
	let max_attempts = 4;
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let result =
			time::timeout(Duration::from_secs(10), client.delete_collection(name.to_string())).await;

		match result {
			Ok(Ok(_)) => return Ok(()),
			Ok(Err(err)) =>
				if attempt == max_attempts {
					return Err(err.into());
				},
			Err(_) =>
				if attempt == max_attempts {
					return Err(Error::Message(format!(
						"Timed out deleting Qdrant collection {name:?} after {attempt} attempts."
					)));
				},
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2);
	}

	Ok(())
}

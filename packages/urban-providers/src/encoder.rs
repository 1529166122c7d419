use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{
	Error, Result,
	retry::{self, RetryPolicy},
};

/// Turns a point cloud into an embedding through the remote geometry encoder.
///
/// Transport failures, non-success statuses and malformed bodies are retried with exponential
/// backoff according to the encoder's configured attempt budget.
pub async fn encode(
	cfg: &urban_config::EncoderProviderConfig,
	points: &[[f64; 3]],
) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;
	let body = serde_json::json!({ "points3d": points });
	let policy = RetryPolicy::new(cfg.max_attempts, Duration::from_millis(cfg.base_backoff_ms));

	retry::retry(policy, "encoder", |_| {
		let request = client.post(&url).headers(headers.clone()).json(&body);

		async move {
			let json: Value = request.send().await?.error_for_status()?.json().await?;

			parse_embedding_response(json)
		}
	})
	.await
}

fn parse_embedding_response(json: Value) -> Result<Vec<f32>> {
	let embedding = json.get("embedding").and_then(Value::as_array).ok_or_else(|| {
		Error::InvalidResponse {
			message: "Encoder response does not contain an embedding array.".to_string(),
		}
	})?;
	let mut vec = Vec::with_capacity(embedding.len());

	for value in embedding {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Encoder embedding values must be numeric.".to_string(),
		})?;

		vec.push(number as f32);
	}

	Ok(vec)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embedding_array() {
		let json = serde_json::json!({ "embedding": [0.25, -1.0, 3] });
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![0.25, -1.0, 3.0]);
	}

	#[test]
	fn rejects_missing_embedding() {
		let json = serde_json::json!({ "vector": [0.25] });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "embedding": [0.25, "x"] });

		assert!(parse_embedding_response(json).is_err());
	}
}

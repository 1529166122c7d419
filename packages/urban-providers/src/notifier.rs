use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::Result;

/// Delivers one webhook call; a non-success status is an error and nothing is retried here.
pub async fn notify(cfg: &urban_config::NotifierConfig, payload: &Value) -> Result<()> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

	client
		.post(&cfg.url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(payload)
		.send()
		.await?
		.error_for_status()?;

	Ok(())
}

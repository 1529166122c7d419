mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EncoderProviderConfig, LlmProviderConfig, NotifierConfig, Providers, Qdrant,
	Resolution, Service, Storage, Stream,
};

use std::{fs, path::Path};

use serde_json::{Map, Value};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if !cfg.resolution.match_threshold.is_finite() {
		return Err(Error::Validation {
			message: "resolution.match_threshold must be a finite number.".to_string(),
		});
	}
	if cfg.resolution.match_threshold <= 0.0 {
		return Err(Error::Validation {
			message: "resolution.match_threshold must be greater than zero.".to_string(),
		});
	}
	if cfg.resolution.top_k == 0 {
		return Err(Error::Validation {
			message: "resolution.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.stream.batch_size == 0 {
		return Err(Error::Validation {
			message: "stream.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.encoder.max_attempts == 0 {
		return Err(Error::Validation {
			message: "providers.encoder.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.llm.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.api_key must be non-empty.".to_string(),
		});
	}
	if !cfg.providers.llm.temperature.is_finite()
		|| !(0.0..=2.0).contains(&cfg.providers.llm.temperature)
	{
		return Err(Error::Validation {
			message: "providers.llm.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}

	for (label, headers) in [
		("encoder", &cfg.providers.encoder.default_headers),
		("llm", &cfg.providers.llm.default_headers),
		("notifier", &cfg.providers.notifier.default_headers),
	] {
		validate_headers(label, headers)?;
	}

	Ok(())
}

fn validate_headers(label: &str, headers: &Map<String, Value>) -> Result<()> {
	if headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: format!("providers.{label}.default_headers values must be strings."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.providers.encoder.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.providers.encoder.api_key = None;
	}
	if cfg.providers.notifier.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		cfg.providers.notifier.api_key = None;
	}
}

//! Canonical object-type labels.

use serde_json::Value;

use urban_providers::llm;

const MAX_TOKENS: u32 = 10;

pub fn build_messages(raw: &str) -> Vec<Value> {
	let prompt = format!(
		"Convert the value of the \"type\" field to a canonical form:\nInput: \"{raw}\"\n\n\
		 Expected output: a single English word (e.g., Car, Tree, Bench)."
	);

	vec![
		serde_json::json!({
			"role": "system",
			"content": "You help normalize textual labels of objects.",
		}),
		serde_json::json!({ "role": "user", "content": prompt }),
	]
}

/// Strips quoting and a trailing period from a model reply.
pub fn clean_label(reply: &str) -> String {
	let trimmed = reply.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`')).trim();

	trimmed.strip_suffix('.').unwrap_or(trimmed).trim().to_string()
}

pub async fn normalize_with_llm(
	cfg: &urban_config::LlmProviderConfig,
	raw: &str,
) -> urban_providers::Result<String> {
	let reply = llm::complete(cfg, &build_messages(raw), MAX_TOKENS).await?;
	let label = clean_label(&reply);

	if label.is_empty() { Ok(raw.trim().to_string()) } else { Ok(label) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_quotes_and_period() {
		assert_eq!(clean_label(" \"Car.\" "), "Car");
		assert_eq!(clean_label("`Tree`"), "Tree");
		assert_eq!(clean_label("Bench"), "Bench");
	}

	#[test]
	fn empty_reply_stays_empty() {
		assert_eq!(clean_label(" \"\" "), "");
	}

	#[test]
	fn prompt_quotes_the_raw_label() {
		let messages = build_messages("автомобиль");

		assert_eq!(messages.len(), 2);
		assert!(
			messages[1]["content"].as_str().is_some_and(|content| content.contains("\"автомобиль\""))
		);
	}
}

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::{Error, Result, UrbanService};
use urban_domain::predicate::Predicate;
use urban_providers::llm;

const MAX_TOKENS: u32 = 500;

/// Whether a rule stream yields the records the condition selects or the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleMode {
	Included,
	Excluded,
}
impl RuleMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Included => "included",
			Self::Excluded => "excluded",
		}
	}
}

impl UrbanService {
	/// Synthesizes the predicate for `condition`, negated for [`RuleMode::Excluded`].
	pub async fn rule_predicate(&self, condition: &str, mode: RuleMode) -> Result<Predicate> {
		let condition = condition.trim();

		if condition.is_empty() {
			return Err(Error::InvalidRequest { message: "condition must be non-empty.".to_string() });
		}

		let expression = self
			.providers
			.synthesizer
			.synthesize(&self.cfg.providers.llm, condition)
			.await
			.map_err(|err| Error::PredicateSynthesis { message: err.to_string() })?;
		let expression = clean_expression(&expression);
		let predicate = Predicate::parse(expression).map_err(|err| Error::PredicateSynthesis {
			message: format!("Synthesized expression {expression:?} is invalid {err}."),
		})?;
		let predicate = match mode {
			RuleMode::Included => predicate,
			RuleMode::Excluded => predicate.negate(),
		};

		tracing::info!(condition, mode = mode.as_str(), predicate = %predicate, "Synthesized rule predicate.");

		Ok(predicate)
	}

	pub async fn stream_by_rule(
		&self,
		condition: &str,
		mode: RuleMode,
	) -> Result<BoxStream<'static, Result<String>>> {
		let predicate = self.rule_predicate(condition, mode).await?;

		if predicate.is_unsatisfiable() {
			return Ok(stream::empty().boxed());
		}

		Ok(self.streamer().stream(predicate.to_string()))
	}
}

pub fn build_messages(condition: &str) -> Vec<Value> {
	let prompt = format!(
		"Write a filter expression over the object fields `type`, `city`, `id` (strings) and \
		 `lat`, `lon` (numbers) that captures this condition:\n\nCondition: \"{condition}\"\n\n\
		 Use ==, !=, <, <=, >, >=, in (...), not in (...), and, or, not and parentheses. \
		 Quote strings with double quotes.\n\
		 Return ONLY the boolean expression, for example:\n\
		 `type in (\"Car\",\"Truck\") and type != \"Tree\"`"
	);

	vec![
		serde_json::json!({ "role": "system", "content": "You produce a record filter expression." }),
		serde_json::json!({ "role": "user", "content": prompt }),
	]
}

/// Removes surrounding whitespace and code fences from a model reply.
pub fn clean_expression(reply: &str) -> &str {
	reply.trim().trim_matches('`').trim()
}

pub async fn synthesize_with_llm(
	cfg: &urban_config::LlmProviderConfig,
	condition: &str,
) -> urban_providers::Result<String> {
	let reply = llm::complete(cfg, &build_messages(condition), MAX_TOKENS).await?;

	Ok(clean_expression(&reply).to_string())
}

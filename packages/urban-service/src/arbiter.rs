//! The LLM-backed keep-or-replace arbiter.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;

use crate::DecisionRequest;
use urban_domain::capture::CaptureContext;
use urban_providers::llm;

const MAX_TOKENS: u32 = 150;

pub fn build_messages(request: &DecisionRequest<'_>) -> Vec<Value> {
	let existing = request.existing;
	let incoming = request.incoming;
	let capture = CaptureContext::from_timestamp(incoming.timestamp);
	let captured_at =
		incoming.timestamp.format(&Rfc3339).unwrap_or_else(|_| incoming.timestamp.to_string());
	let mut prompt = String::from(
		"You have information about a previously recorded object and new data for the same object.\n\n",
	);

	prompt.push_str(&format!(
		"Existing data:\n- ID: {}\n- Type: {}\n- Timestamp: {}\n- BBox: {}\n\n",
		field(existing.get("id")),
		field(existing.get("type")),
		field(existing.get("timestamp")),
		field(existing.get("bbox")),
	));
	prompt.push_str(&format!(
		"New data:\n- ID: {}\n- Capture time: {captured_at} (season: {}, time of day: {})\n\
		 - Type (normalized): {}\n- BBox: {:?}\n- Points (count): {}\n\n",
		incoming.id,
		capture.month,
		capture.time_of_day.as_str(),
		request.normalized_type,
		incoming.bbox,
		incoming.pointcloud.len(),
	));
	prompt.push_str(&format!("Additional metadata:\n- score: {}\n\n", request.context.score));

	prompt.push_str(
		"Decide whether to UPDATE the record (update) or keep the existing one (keep). \
		 Return the response in JSON format with the following fields:\n\
		 {\n  \"decision\": \"update\" or \"keep\",\n  \"reason\": \"brief justification\"\n}",
	);

	vec![
		serde_json::json!({
			"role": "system",
			"content": "You assist with making a decision about updating a 3D object in the database.",
		}),
		serde_json::json!({ "role": "user", "content": prompt }),
	]
}

pub async fn decide_with_llm(
	cfg: &urban_config::LlmProviderConfig,
	request: DecisionRequest<'_>,
) -> urban_providers::Result<String> {
	llm::complete(cfg, &build_messages(&request), MAX_TOKENS).await
}

fn field(value: Option<&Value>) -> String {
	match value {
		Some(Value::String(text)) => text.clone(),
		Some(other) => other.to_string(),
		None => "unknown".to_string(),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::Map;
	use time::macros::datetime;

	use super::*;
	use crate::MatchContext;
	use urban_domain::object::Observation;

	#[test]
	fn prompt_carries_capture_context_and_score() {
		let existing = Map::from_iter([
			("id".to_string(), Value::from("obj-1")),
			("type".to_string(), Value::from("Bench")),
		]);
		let incoming = Observation {
			id: "obs-7".to_string(),
			city: "Riga".to_string(),
			timestamp: datetime!(2025-07-14 23:15 UTC),
			lat: 56.95,
			lon: 24.1,
			object_type: "скамейка".to_string(),
			pointcloud: vec![[0.0, 0.0, 0.0]; 3],
			bbox: [0.0; 6],
		};
		let request = DecisionRequest {
			existing: &existing,
			incoming: &incoming,
			normalized_type: "Bench",
			context: MatchContext { score: 0.25 },
		};
		let messages = build_messages(&request);
		let prompt = messages[1]["content"].as_str().expect("prompt must be a string");

		assert!(prompt.contains("- ID: obj-1"));
		assert!(prompt.contains("season: July, time of day: night"));
		assert!(prompt.contains("- Type (normalized): Bench"));
		assert!(prompt.contains("- Points (count): 3"));
		assert!(prompt.contains("- score: 0.25"));
		assert!(prompt.contains("- Timestamp: unknown"));

		let sections: Vec<usize> =
			["Existing data:", "New data:", "Additional metadata:", "Decide whether"]
				.iter()
				.map(|heading| {
					prompt.find(heading).unwrap_or_else(|| panic!("Missing section {heading:?}."))
				})
				.collect();

		assert!(sections.windows(2).all(|pair| pair[0] < pair[1]), "Sections out of order.");
	}
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
	Keep,
	Replace,
}
impl Outcome {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Keep => "keep",
			Self::Replace => "replace",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Decision {
	pub outcome: Outcome,
	pub reason: String,
}
impl Decision {
	pub fn keep(reason: impl Into<String>) -> Self {
		Self { outcome: Outcome::Keep, reason: reason.into() }
	}

	pub fn replace(reason: impl Into<String>) -> Self {
		Self { outcome: Outcome::Replace, reason: reason.into() }
	}

	/// Parses `{"decision": "keep" | "update" | "replace", "reason": "..."}`.
	pub fn parse(raw: &str) -> Option<Self> {
		let parsed: RawDecision = serde_json::from_str(raw).ok()?;
		let outcome = match parsed.decision.as_str() {
			"keep" => Outcome::Keep,
			"update" | "replace" => Outcome::Replace,
			_ => return None,
		};

		Some(Self { outcome, reason: parsed.reason })
	}

	/// Like [`Decision::parse`], but unreadable output becomes `Keep` with the raw text as reason.
	pub fn parse_or_keep(raw: &str) -> Self {
		Self::parse(raw).unwrap_or_else(|| Self::keep(raw))
	}
}

#[derive(Deserialize)]
struct RawDecision {
	decision: String,
	reason: String,
}

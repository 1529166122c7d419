use std::collections::BTreeSet;

use futures::TryStreamExt;
use serde_json::Value;

use crate::{Result, UrbanService};

impl UrbanService {
	/// Distinct `type` labels across all stored records, sorted.
	pub async fn list_types(&self) -> Result<Vec<String>> {
		let mut pages = self.streamer().pages("");
		let mut types = BTreeSet::new();

		while let Some(page) = pages.try_next().await? {
			for record in page {
				if let Some(Value::String(label)) = record.metadata.get("type") {
					types.insert(label.clone());
				}
			}
		}

		Ok(types.into_iter().collect())
	}
}

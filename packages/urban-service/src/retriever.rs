//! Candidate retrieval: ordered match strategies with first-accept semantics.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{BoxFuture, Error, Result};
use urban_storage::RecordStore;

/// An existing record judged close enough to an incoming embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchCandidate {
	pub record_id: String,
	/// Non-negative dissimilarity; smaller means closer.
	pub score: f32,
	pub metadata: Map<String, Value>,
	pub embedding: Vec<f32>,
}

pub trait MatchStrategy
where
	Self: Send + Sync,
{
	fn find_match<'a>(&'a self, embedding: &'a [f32])
	-> BoxFuture<'a, Result<Option<MatchCandidate>>>;
}

/// Accepts the store's nearest record when its distance is strictly below the threshold.
pub struct NearestNeighborStrategy {
	store: Arc<dyn RecordStore>,
	threshold: f32,
	top_k: u64,
}
impl NearestNeighborStrategy {
	pub fn new(store: Arc<dyn RecordStore>, cfg: &urban_config::Resolution) -> Self {
		Self { store, threshold: cfg.match_threshold, top_k: u64::from(cfg.top_k.max(1)) }
	}

	async fn nearest(&self, embedding: &[f32]) -> Result<Option<MatchCandidate>> {
		let hits = self
			.store
			.search(embedding, self.top_k)
			.await
			.map_err(|err| Error::Match { message: err.to_string() })?;
		let Some(best) = hits.into_iter().next() else {
			return Ok(None);
		};

		// NaN compares false, so it is rejected along with anything at or above the threshold.
		let accepted = best.distance < self.threshold;

		if !accepted {
			tracing::debug!(
				record_id = %best.id,
				distance = best.distance,
				threshold = self.threshold,
				"Nearest record rejected."
			);

			return Ok(None);
		}

		Ok(Some(MatchCandidate {
			record_id: best.id,
			score: best.distance,
			metadata: best.metadata,
			embedding: embedding.to_vec(),
		}))
	}
}
impl MatchStrategy for NearestNeighborStrategy {
	fn find_match<'a>(
		&'a self,
		embedding: &'a [f32],
	) -> BoxFuture<'a, Result<Option<MatchCandidate>>> {
		Box::pin(self.nearest(embedding))
	}
}

/// Strategies in priority order; the first one that accepts wins.
#[derive(Clone)]
pub struct RetrieverChain {
	strategies: Vec<Arc<dyn MatchStrategy>>,
}
impl RetrieverChain {
	pub fn new(strategies: Vec<Arc<dyn MatchStrategy>>) -> Self {
		Self { strategies }
	}

	pub fn len(&self) -> usize {
		self.strategies.len()
	}

	pub fn is_empty(&self) -> bool {
		self.strategies.is_empty()
	}

	pub async fn find_match(&self, embedding: &[f32]) -> Result<Option<MatchCandidate>> {
		for strategy in &self.strategies {
			if let Some(candidate) = strategy.find_match(embedding).await? {
				return Ok(Some(candidate));
			}
		}

		Ok(None)
	}
}

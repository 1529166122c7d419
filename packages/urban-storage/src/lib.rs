pub mod filter;
pub mod qdrant;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin};

use serde_json::{Map, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A nearest-neighbor result; `distance` is non-negative and smaller means more similar.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
	pub id: String,
	pub distance: f32,
	pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredRecord {
	pub id: String,
	pub metadata: Map<String, Value>,
}

/// Persistence for object records keyed by identifier.
///
/// Implementations must be safe to share between concurrent requests; no cross-call locking
/// is expected from callers.
pub trait RecordStore
where
	Self: Send + Sync,
{
	/// Writes the record, replacing any record stored under the same identifier.
	fn insert<'a>(
		&'a self,
		id: &'a str,
		embedding: &'a [f32],
		metadata: &'a Map<String, Value>,
	) -> BoxFuture<'a, Result<()>>;

	/// Returns up to `top_k` hits ordered by ascending distance.
	fn search<'a>(&'a self, embedding: &'a [f32], top_k: u64)
	-> BoxFuture<'a, Result<Vec<SearchHit>>>;

	/// Returns the records matching `predicate` in the store's stable order, skipping `offset`.
	fn query_page<'a>(
		&'a self,
		predicate: &'a str,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<StoredRecord>>>;
}

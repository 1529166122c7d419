//! An in-process `RecordStore` with the ordering and paging behavior of the Qdrant store.

use std::sync::{
	Mutex,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};

use serde_json::{Map, Value};

use urban_domain::predicate::Predicate;
use urban_storage::{BoxFuture, Error, RecordStore, Result, SearchHit, StoredRecord};

#[derive(Clone, Debug)]
struct Entry {
	id: String,
	embedding: Vec<f32>,
	metadata: Map<String, Value>,
}

/// Records are kept in first-insert order; re-inserting an identifier overwrites in place.
#[derive(Default)]
pub struct MemoryStore {
	entries: Mutex<Vec<Entry>>,
	page_sizes: Mutex<Vec<usize>>,
	searches: AtomicUsize,
	inserts: AtomicUsize,
	fail_search: AtomicBool,
	fail_insert: AtomicBool,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn seed(&self, id: &str, embedding: Vec<f32>, metadata: Value) {
		let metadata = match metadata {
			Value::Object(map) => map,
			_ => Map::new(),
		};

		self.put(id, embedding, metadata);
	}

	pub fn get(&self, id: &str) -> Option<(Vec<f32>, Map<String, Value>)> {
		self.lock_entries()
			.iter()
			.find(|entry| entry.id == id)
			.map(|entry| (entry.embedding.clone(), entry.metadata.clone()))
	}

	pub fn len(&self) -> usize {
		self.lock_entries().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Sizes of every page returned by `query_page`, in call order.
	pub fn page_sizes(&self) -> Vec<usize> {
		self.page_sizes.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn page_fetches(&self) -> usize {
		self.page_sizes().len()
	}

	pub fn searches(&self) -> usize {
		self.searches.load(Ordering::SeqCst)
	}

	pub fn inserts(&self) -> usize {
		self.inserts.load(Ordering::SeqCst)
	}

	pub fn fail_search(&self, fail: bool) {
		self.fail_search.store(fail, Ordering::SeqCst);
	}

	pub fn fail_insert(&self, fail: bool) {
		self.fail_insert.store(fail, Ordering::SeqCst);
	}

	fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn put(&self, id: &str, embedding: Vec<f32>, metadata: Map<String, Value>) {
		let mut entries = self.lock_entries();
		let entry = Entry { id: id.to_string(), embedding, metadata };

		match entries.iter_mut().find(|existing| existing.id == id) {
			Some(existing) => *existing = entry,
			None => entries.push(entry),
		}
	}
}
impl RecordStore for MemoryStore {
	fn insert<'a>(
		&'a self,
		id: &'a str,
		embedding: &'a [f32],
		metadata: &'a Map<String, Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.inserts.fetch_add(1, Ordering::SeqCst);

			if self.fail_insert.load(Ordering::SeqCst) {
				return Err(Error::InvalidArgument("Injected insert failure.".to_string()));
			}

			self.put(id, embedding.to_vec(), metadata.clone());

			Ok(())
		})
	}

	fn search<'a>(
		&'a self,
		embedding: &'a [f32],
		top_k: u64,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			self.searches.fetch_add(1, Ordering::SeqCst);

			if self.fail_search.load(Ordering::SeqCst) {
				return Err(Error::InvalidArgument("Injected search failure.".to_string()));
			}

			let mut hits = self
				.lock_entries()
				.iter()
				.map(|entry| SearchHit {
					id: entry.id.clone(),
					distance: euclidean(embedding, &entry.embedding),
					metadata: entry.metadata.clone(),
				})
				.collect::<Vec<_>>();

			hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
			hits.truncate(usize::try_from(top_k).unwrap_or(usize::MAX));

			Ok(hits)
		})
	}

	fn query_page<'a>(
		&'a self,
		predicate: &'a str,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<StoredRecord>>> {
		Box::pin(async move {
			let predicate = Predicate::parse(predicate)
				.map_err(|err| Error::InvalidArgument(format!("Invalid predicate {err}.")))?;
			let offset = usize::try_from(offset).unwrap_or(usize::MAX);
			let limit = usize::try_from(limit).unwrap_or(usize::MAX);
			let page = self
				.lock_entries()
				.iter()
				.filter(|entry| predicate.matches(&entry.metadata))
				.skip(offset)
				.take(limit)
				.map(|entry| StoredRecord { id: entry.id.clone(), metadata: entry.metadata.clone() })
				.collect::<Vec<_>>();

			self.page_sizes.lock().unwrap_or_else(|err| err.into_inner()).push(page.len());

			Ok(page)
		})
	}
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn search_orders_by_distance_and_truncates() {
		let store = MemoryStore::new();

		store.seed("far", vec![3.0, 4.0], serde_json::json!({}));
		store.seed("near", vec![0.0, 0.5], serde_json::json!({}));

		let hits = store.search(&[0.0, 0.0], 1).await.expect("search failed");

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "near");
		assert_eq!(hits[0].distance, 0.5);
	}

	#[tokio::test]
	async fn insert_overwrites_in_place() {
		let store = MemoryStore::new();

		store.seed("a", vec![0.0], serde_json::json!({ "type": "Car" }));
		store.seed("b", vec![1.0], serde_json::json!({ "type": "Car" }));

		let metadata = Map::from_iter([("type".to_string(), Value::from("Bus"))]);

		store.insert("a", &[2.0], &metadata).await.expect("insert failed");

		let page = store.query_page("", 0, 10).await.expect("query failed");

		assert_eq!(page.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
		assert_eq!(page[0].metadata["type"], "Bus");
	}
}

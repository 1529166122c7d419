//! Lazy enumeration of record identifiers matching a predicate.
//!
//! Pages are fetched one at a time and only when the consumer asks for more items. Records
//! written between page fetches may be skipped or seen twice.

use std::sync::Arc;

use futures::{
	StreamExt, TryStreamExt,
	stream::{self, BoxStream},
};

use crate::{Error, Result};
use urban_storage::{RecordStore, StoredRecord};

/// Position of one enumeration; owned by a single stream and never shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamCursor {
	pub predicate: String,
	pub offset: u64,
	pub batch_size: u64,
}
impl StreamCursor {
	pub fn new(predicate: impl Into<String>, batch_size: u64) -> Self {
		Self { predicate: predicate.into(), offset: 0, batch_size: batch_size.max(1) }
	}

	fn advance(&mut self) {
		self.offset = self.offset.saturating_add(self.batch_size);
	}
}

#[derive(Clone)]
pub struct ExpressionStreamer {
	store: Arc<dyn RecordStore>,
	batch_size: u64,
}
impl ExpressionStreamer {
	pub fn new(store: Arc<dyn RecordStore>, batch_size: u64) -> Self {
		Self { store, batch_size: batch_size.max(1) }
	}

	/// Identifiers of matching records, in store order.
	pub fn stream(&self, predicate: impl Into<String>) -> BoxStream<'static, Result<String>> {
		self.pages(predicate)
			.map_ok(|page| stream::iter(page.into_iter().map(|record| Ok::<_, Error>(record.id))))
			.try_flatten()
			.boxed()
	}

	/// Non-empty pages of matching records. An empty or short page ends the sequence.
	pub fn pages(
		&self,
		predicate: impl Into<String>,
	) -> BoxStream<'static, Result<Vec<StoredRecord>>> {
		let cursor = StreamCursor::new(predicate, self.batch_size);

		stream::try_unfold((self.store.clone(), Some(cursor)), |(store, cursor)| {
			next_page(store, cursor)
		})
		.boxed()
	}
}

type PageState = (Arc<dyn RecordStore>, Option<StreamCursor>);

async fn next_page(
	store: Arc<dyn RecordStore>,
	cursor: Option<StreamCursor>,
) -> Result<Option<(Vec<StoredRecord>, PageState)>> {
	let Some(mut cursor) = cursor else {
		return Ok(None);
	};
	let page = store.query_page(&cursor.predicate, cursor.offset, cursor.batch_size).await?;

	tracing::debug!(
		offset = cursor.offset,
		batch_size = cursor.batch_size,
		records = page.len(),
		"Fetched stream page."
	);

	if page.is_empty() {
		return Ok(None);
	}

	let exhausted = (page.len() as u64) < cursor.batch_size;

	cursor.advance();

	Ok(Some((page, (store, if exhausted { None } else { Some(cursor) }))))
}

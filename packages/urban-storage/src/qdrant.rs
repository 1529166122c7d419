use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType, PointId,
		PointStruct, Query, QueryPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
		point_id::PointIdOptions, value::Kind,
	},
};
use serde_json::Map;
use uuid::Uuid;

use crate::{BoxFuture, Error, RecordStore, Result, SearchHit, StoredRecord, filter};
use urban_domain::predicate::Predicate;

/// Namespace for deriving point ids from record identifiers.
pub const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93d7_5b08_a1e2_47c9_d3f0_b815);
pub const METADATA_FIELD: &str = "metadata";
pub const KEYWORD_FIELDS: [&str; 3] = ["id", "city", "type"];

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &urban_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its keyword indexes when the collection does not exist yet.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
					VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Euclid),
				),
			)
			.await?;

		for field in KEYWORD_FIELDS {
			self.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(
						self.collection.clone(),
						field,
						FieldType::Keyword,
					)
					.wait(true),
				)
				.await?;
		}

		tracing::info!(collection = %self.collection, "Created Qdrant collection.");

		Ok(())
	}

	async fn upsert(
		&self,
		id: &str,
		embedding: &[f32],
		metadata: &Map<String, serde_json::Value>,
	) -> Result<()> {
		if embedding.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Embedding has {} dimensions; the collection expects {}.",
				embedding.len(),
				self.vector_dim
			)));
		}

		let point = PointStruct::new(point_id(id), embedding.to_vec(), build_payload(id, metadata)?);

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true))
			.await?;

		Ok(())
	}

	async fn nearest(&self, embedding: &[f32], top_k: u64) -> Result<Vec<SearchHit>> {
		let response = self
			.client
			.query(
				QueryPointsBuilder::new(self.collection.clone())
					.query(Query::new_nearest(embedding.to_vec()))
					.limit(top_k)
					.with_payload(true),
			)
			.await?;

		Ok(response
			.result
			.into_iter()
			.map(|point| {
				let id = record_id(&point.payload, point.id.as_ref());

				SearchHit { id, distance: point.score, metadata: decode_metadata(&point.payload) }
			})
			.collect())
	}

	async fn page(&self, predicate: &str, offset: u64, limit: u64) -> Result<Vec<StoredRecord>> {
		let predicate = Predicate::parse(predicate)
			.map_err(|err| Error::InvalidArgument(format!("Invalid predicate {err}.")))?;

		if predicate.is_unsatisfiable() {
			return Ok(Vec::new());
		}

		let mut builder = QueryPointsBuilder::new(self.collection.clone())
			.offset(offset)
			.limit(limit)
			.with_payload(true);

		if let Some(filter) = filter::to_filter(&predicate) {
			builder = builder.filter(filter);
		}

		let response = self.client.query(builder).await?;

		Ok(response
			.result
			.into_iter()
			.map(|point| StoredRecord {
				id: record_id(&point.payload, point.id.as_ref()),
				metadata: decode_metadata(&point.payload),
			})
			.collect())
	}
}
impl RecordStore for QdrantStore {
	fn insert<'a>(
		&'a self,
		id: &'a str,
		embedding: &'a [f32],
		metadata: &'a Map<String, serde_json::Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert(id, embedding, metadata))
	}

	fn search<'a>(
		&'a self,
		embedding: &'a [f32],
		top_k: u64,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(self.nearest(embedding, top_k))
	}

	fn query_page<'a>(
		&'a self,
		predicate: &'a str,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<StoredRecord>>> {
		Box::pin(self.page(predicate, offset, limit))
	}
}

pub fn point_id(record_id: &str) -> String {
	Uuid::new_v5(&RECORD_NAMESPACE, record_id.as_bytes()).to_string()
}

fn build_payload(id: &str, metadata: &Map<String, serde_json::Value>) -> Result<Payload> {
	let mut payload = Payload::new();

	payload.insert("id", id.to_string());

	for field in ["city", "type"] {
		if let Some(serde_json::Value::String(text)) = metadata.get(field) {
			payload.insert(field, text.clone());
		}
	}
	for field in ["lat", "lon"] {
		if let Some(number @ serde_json::Value::Number(_)) = metadata.get(field) {
			payload.insert(field, number.clone());
		}
	}

	payload.insert(METADATA_FIELD, serde_json::to_string(metadata)?);

	Ok(payload)
}

fn record_id(payload: &HashMap<String, Value>, point_id: Option<&PointId>) -> String {
	if let Some(Kind::StringValue(id)) = payload.get("id").and_then(|value| value.kind.as_ref()) {
		return id.clone();
	}

	match point_id.and_then(|id| id.point_id_options.as_ref()) {
		Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
		Some(PointIdOptions::Num(num)) => num.to_string(),
		None => String::new(),
	}
}

fn decode_metadata(payload: &HashMap<String, Value>) -> Map<String, serde_json::Value> {
	let Some(Kind::StringValue(raw)) =
		payload.get(METADATA_FIELD).and_then(|value| value.kind.as_ref())
	else {
		return Map::new();
	};

	match serde_json::from_str::<serde_json::Value>(raw) {
		Ok(serde_json::Value::Object(map)) => map,
		Ok(_) | Err(_) => {
			tracing::warn!("Stored metadata is not a JSON object.");

			Map::new()
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn point_id_is_stable_per_identifier() {
		assert_eq!(point_id("obj-1"), point_id("obj-1"));
		assert_ne!(point_id("obj-1"), point_id("obj-2"));
		assert!(Uuid::parse_str(&point_id("obj-1")).is_ok());
	}

	#[test]
	fn payload_carries_filterable_fields_and_blob() {
		let metadata = serde_json::json!({
			"id": "obj-1",
			"city": "Riga",
			"type": "Car",
			"lat": 56.95,
			"lon": 24.1,
		});
		let serde_json::Value::Object(metadata) = metadata else { panic!("fixture must be an object") };
		let payload: HashMap<String, Value> =
			build_payload("obj-1", &metadata).expect("payload build failed").into();

		assert_eq!(record_id(&payload, None), "obj-1");
		assert_eq!(decode_metadata(&payload), metadata);
		assert!(payload.contains_key("type"));
		assert!(payload.contains_key("lat"));
	}

	#[test]
	fn unparsable_metadata_decodes_to_empty_object() {
		let mut payload = HashMap::new();

		payload.insert(METADATA_FIELD.to_string(), Value::from("not json".to_string()));

		assert!(decode_metadata(&payload).is_empty());
	}
}

use serde_json::{Map, Value};
use tokio::runtime::Runtime;

use urban_storage::{RecordStore, qdrant::QdrantStore};
use urban_testkit::TestCollection;

fn metadata(id: &str, object_type: &str) -> Map<String, Value> {
	match serde_json::json!({ "id": id, "city": "Riga", "type": object_type, "lat": 56.95, "lon": 24.1 })
	{
		Value::Object(map) => map,
		_ => unreachable!(),
	}
}

#[test]
#[ignore = "Requires external Qdrant. Set URBAN_QDRANT_URL to run."]
fn insert_search_and_page_round_trip() {
	let Some(url) = urban_testkit::env_qdrant_url() else {
		eprintln!("Skipping insert_search_and_page_round_trip; set URBAN_QDRANT_URL to run this test.");

		return;
	};
	let rt = Runtime::new().expect("Failed to build runtime.");

	rt.block_on(async {
		let collection = TestCollection::new(&url, "urban_storage");
		let store =
			QdrantStore::new(&collection.qdrant_config(3)).expect("Failed to build Qdrant store.");

		store.ensure_collection().await.expect("Failed to ensure collection.");
		store.ensure_collection().await.expect("ensure_collection must be idempotent.");

		store.insert("a", &[0.0, 0.0, 0.0], &metadata("a", "Car")).await.expect("insert failed");
		store.insert("b", &[3.0, 4.0, 0.0], &metadata("b", "Tree")).await.expect("insert failed");
		store.insert("a", &[0.0, 0.0, 0.5], &metadata("a", "Bus")).await.expect("insert failed");

		let hits = store.search(&[0.0, 0.0, 0.0], 1).await.expect("search failed");

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "a");
		assert!((hits[0].distance - 0.5).abs() < 1e-4, "Unexpected distance {}", hits[0].distance);
		assert_eq!(hits[0].metadata["type"], "Bus");

		let included =
			store.query_page(r#"type != "Tree""#, 0, 10).await.expect("query_page failed");

		assert_eq!(included.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(), ["a"]);

		let excluded =
			store.query_page(r#"not (type != "Tree")"#, 0, 10).await.expect("query_page failed");

		assert_eq!(excluded.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(), ["b"]);

		let first = store.query_page("", 0, 1).await.expect("query_page failed");
		let second = store.query_page("", 1, 1).await.expect("query_page failed");
		let third = store.query_page("", 2, 1).await.expect("query_page failed");

		assert_eq!(first.len(), 1);
		assert_eq!(second.len(), 1);
		assert_ne!(first[0].id, second[0].id);
		assert!(third.is_empty());

		collection.cleanup().await.expect("Failed to clean up test collection.");
	});
}

#[test]
fn invalid_predicate_is_rejected_before_querying() {
	let rt = Runtime::new().expect("Failed to build runtime.");
	let cfg = urban_config::Qdrant {
		url: "http://127.0.0.1:6334".to_string(),
		collection: "unused".to_string(),
		vector_dim: 3,
	};
	let store = QdrantStore::new(&cfg).expect("Client construction must not connect.");
	let err = rt
		.block_on(store.query_page("colour == 'red'", 0, 10))
		.expect_err("Expected predicate error.");

	assert!(matches!(err, urban_storage::Error::InvalidArgument(_)), "Unexpected error: {err:?}");
}

use urban_testkit::{Error, TestCollection};

#[test]
fn collection_names_are_unique_per_prefix() {
	let first = TestCollection::new("http://127.0.0.1:1", "urban_kit");
	let second = TestCollection::new("http://127.0.0.1:1", "urban_kit");

	assert!(first.name().starts_with("urban_kit_"));
	assert_ne!(first.name(), second.name());
	assert_eq!(first.qdrant_config(3).collection, first.name());
}

#[tokio::test]
async fn cleanup_surfaces_the_client_error() {
	let collection = TestCollection::new("http://127.0.0.1:1", "urban_kit");
	let err = collection.cleanup().await.expect_err("Expected cleanup against a closed port to fail.");

	assert!(matches!(err, Error::Qdrant(_)), "Unexpected error kind: {err:?}");
}

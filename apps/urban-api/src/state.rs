use std::sync::Arc;

use urban_service::UrbanService;
use urban_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<UrbanService>,
}
impl AppState {
	/// Connects to Qdrant, creating the collection on first start.
	pub async fn new(config: urban_config::Config) -> color_eyre::Result<Self> {
		let store = QdrantStore::new(&config.storage.qdrant)?;

		store.ensure_collection().await?;

		Ok(Self::with_service(UrbanService::new(config, Arc::new(store))))
	}

	pub fn with_service(service: UrbanService) -> Self {
		Self { service: Arc::new(service) }
	}
}

pub mod arbiter;
pub mod catalog;
pub mod labels;
pub mod resolve;
pub mod retriever;
pub mod rules;
pub mod stream;

mod error;

pub use error::{Error, Result};
pub use resolve::{CREATED_STATUS, ResolutionOutcome, UPDATED_STATUS};
pub use retriever::{MatchCandidate, MatchStrategy, NearestNeighborStrategy, RetrieverChain};
pub use rules::RuleMode;
pub use stream::{ExpressionStreamer, StreamCursor};
pub use urban_storage::BoxFuture;

use std::sync::Arc;

use serde_json::{Map, Value};

use urban_config::{Config, EncoderProviderConfig, LlmProviderConfig, NotifierConfig};
use urban_domain::object::{Observation, Point3};
use urban_providers::{encoder, notifier};
use urban_storage::RecordStore;

pub trait PointEncoder
where
	Self: Send + Sync,
{
	fn encode<'a>(
		&'a self,
		cfg: &'a EncoderProviderConfig,
		points: &'a [Point3],
	) -> BoxFuture<'a, urban_providers::Result<Vec<f32>>>;
}

pub trait TypeNormalizer
where
	Self: Send + Sync,
{
	/// Returns the canonical English label for `raw`.
	fn normalize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		raw: &'a str,
	) -> BoxFuture<'a, urban_providers::Result<String>>;
}

/// Chooses between keeping a matched record and replacing it with the incoming observation.
///
/// Implementations return their raw verdict text and must not write to the store or notify.
/// The caller interprets the text; output that is not a well-formed verdict means keep.
pub trait DecisionArbiter
where
	Self: Send + Sync,
{
	fn decide<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		request: DecisionRequest<'a>,
	) -> BoxFuture<'a, urban_providers::Result<String>>;
}

pub trait PredicateSynthesizer
where
	Self: Send + Sync,
{
	/// Translates a free-text condition into an expression of the record predicate language.
	fn synthesize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		condition: &'a str,
	) -> BoxFuture<'a, urban_providers::Result<String>>;
}

pub trait Notifier
where
	Self: Send + Sync,
{
	fn notify<'a>(
		&'a self,
		cfg: &'a NotifierConfig,
		payload: &'a Value,
	) -> BoxFuture<'a, urban_providers::Result<()>>;
}

/// Everything an arbiter may look at for one decision.
#[derive(Clone, Copy, Debug)]
pub struct DecisionRequest<'a> {
	pub existing: &'a Map<String, Value>,
	pub incoming: &'a Observation,
	pub normalized_type: &'a str,
	pub context: MatchContext,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchContext {
	pub score: f32,
}

#[derive(Clone)]
pub struct Providers {
	pub encoder: Arc<dyn PointEncoder>,
	pub normalizer: Arc<dyn TypeNormalizer>,
	pub arbiter: Arc<dyn DecisionArbiter>,
	pub synthesizer: Arc<dyn PredicateSynthesizer>,
	pub notifier: Arc<dyn Notifier>,
}
impl Providers {
	pub fn new(
		encoder: Arc<dyn PointEncoder>,
		normalizer: Arc<dyn TypeNormalizer>,
		arbiter: Arc<dyn DecisionArbiter>,
		synthesizer: Arc<dyn PredicateSynthesizer>,
		notifier: Arc<dyn Notifier>,
	) -> Self {
		Self { encoder, normalizer, arbiter, synthesizer, notifier }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			encoder: provider.clone(),
			normalizer: provider.clone(),
			arbiter: provider.clone(),
			synthesizer: provider.clone(),
			notifier: provider,
		}
	}
}

pub struct UrbanService {
	pub cfg: Config,
	pub store: Arc<dyn RecordStore>,
	pub retrievers: RetrieverChain,
	pub providers: Providers,
}
impl UrbanService {
	pub fn new(cfg: Config, store: Arc<dyn RecordStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	/// Builds the service with the default chain: one nearest-neighbor strategy over `store`.
	pub fn with_providers(cfg: Config, store: Arc<dyn RecordStore>, providers: Providers) -> Self {
		let nearest: Arc<dyn MatchStrategy> =
			Arc::new(NearestNeighborStrategy::new(store.clone(), &cfg.resolution));
		let retrievers = RetrieverChain::new(vec![nearest]);

		Self { cfg, store, retrievers, providers }
	}

	pub fn with_retrievers(mut self, retrievers: RetrieverChain) -> Self {
		self.retrievers = retrievers;

		self
	}

	pub fn streamer(&self) -> ExpressionStreamer {
		ExpressionStreamer::new(self.store.clone(), u64::from(self.cfg.stream.batch_size))
	}
}

struct DefaultProviders;
impl PointEncoder for DefaultProviders {
	fn encode<'a>(
		&'a self,
		cfg: &'a EncoderProviderConfig,
		points: &'a [Point3],
	) -> BoxFuture<'a, urban_providers::Result<Vec<f32>>> {
		Box::pin(encoder::encode(cfg, points))
	}
}
impl TypeNormalizer for DefaultProviders {
	fn normalize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		raw: &'a str,
	) -> BoxFuture<'a, urban_providers::Result<String>> {
		Box::pin(labels::normalize_with_llm(cfg, raw))
	}
}
impl DecisionArbiter for DefaultProviders {
	fn decide<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		request: DecisionRequest<'a>,
	) -> BoxFuture<'a, urban_providers::Result<String>> {
		Box::pin(arbiter::decide_with_llm(cfg, request))
	}
}
impl PredicateSynthesizer for DefaultProviders {
	fn synthesize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		condition: &'a str,
	) -> BoxFuture<'a, urban_providers::Result<String>> {
		Box::pin(rules::synthesize_with_llm(cfg, condition))
	}
}
impl Notifier for DefaultProviders {
	fn notify<'a>(
		&'a self,
		cfg: &'a NotifierConfig,
		payload: &'a Value,
	) -> BoxFuture<'a, urban_providers::Result<()>> {
		Box::pin(notifier::notify(cfg, payload))
	}
}

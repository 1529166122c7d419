pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Request failures, classified by the stage that produced them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Normalization error: {message}")]
	Normalization { message: String },
	#[error("Encoding error: {message}")]
	Encoding { message: String },
	#[error("Match error: {message}")]
	Match { message: String },
	#[error("Persistence error: {message}")]
	Persistence { message: String },
	#[error("Validation error: {message}")]
	Validation { message: String },
	#[error("Predicate synthesis error: {message}")]
	PredicateSynthesis { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<urban_storage::Error> for Error {
	fn from(err: urban_storage::Error) -> Self {
		match err {
			urban_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

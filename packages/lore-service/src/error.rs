use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Failed to chunk document at {relpath}.")]
	ChunkingFailure { relpath: String },
	#[error("Session not found: {session_id}.")]
	SessionNotFound { session_id: Uuid },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Invalid configuration: {message}")]
	InvalidConfig { message: String },
	#[error("Generation timed out.")]
	GenerationTimeout,
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		from_sqlx(err)
	}
}
impl From<lore_storage::Error> for Error {
	fn from(err: lore_storage::Error) -> Self {
		match err {
			lore_storage::Error::Sqlx(inner) => from_sqlx(inner),
			lore_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			lore_storage::Error::NotFound(message) => Self::NotFound { message },
			lore_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

fn from_sqlx(err: sqlx::Error) -> Error {
	if let sqlx::Error::Database(db_err) = &err {
		// Same-relpath write races surface as unique violations; last writer
		// wins at the transaction level, the loser sees a conflict.
		if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation {
			return Error::Conflict { message: err.to_string() };
		}
	}

	Error::Storage { message: err.to_string() }
}

pub mod admin;
pub mod citations;
pub mod ingest;
pub mod prompt;
pub mod query;
pub mod search;
pub mod sessions;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

pub use admin::ReindexReport;
pub use citations::Citation;
pub use ingest::{IngestRequest, IngestResponse};
pub use query::{QueryRequest, QueryResponse};
pub use sessions::{SessionManager, Turn};

use lore_config::{Config, GenerationProviderConfig};
use lore_domain::redaction::Redactor;
use lore_providers::generation::{self, GenerationResponse};
use lore_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Seam for the opaque generation capability; tests swap in stubs here.
pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GenerationResponse>>;
}

#[derive(Clone)]
pub struct Providers {
	pub generation: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn new(generation: Arc<dyn GenerationProvider>) -> Self {
		Self { generation }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { generation: Arc::new(DefaultProviders) }
	}
}

struct DefaultProviders;
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GenerationResponse>> {
		Box::pin(async move { Ok(generation::generate(cfg, prompt).await?) })
	}
}

pub struct LoreService {
	pub cfg: Config,
	pub db: Db,
	pub sessions: SessionManager,
	pub providers: Providers,
	redactor: Redactor,
}
impl LoreService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Result<Self> {
		let redactor = Redactor::new(&cfg.redaction.patterns)
			.map_err(|err| Error::InvalidConfig { message: err.to_string() })?;
		let sessions = SessionManager::new(&cfg.session);

		Ok(Self { cfg, db, sessions, providers, redactor })
	}

	/// Redaction applies to stored chunk text, prompt passages, and answers;
	/// a disabled `[redaction]` section makes this a pass-through.
	pub(crate) fn scrub(&self, text: &str) -> String {
		if self.cfg.redaction.enabled { self.redactor.scrub(text) } else { text.to_string() }
	}
}

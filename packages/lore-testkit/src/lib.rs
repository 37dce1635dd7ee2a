//! Shared fixtures for integration tests: a throwaway SQLite database on
//! disk plus a config populated with test-friendly defaults.

mod error;

pub use error::{Error, Result};

use std::future::Future;

use tempfile::TempDir;

use lore_config::{
	Chunking, Config, ConfidenceThresholds, GenerationProviderConfig, Paths, Redaction, Search,
	Service, Session, Sqlite, Storage,
};
use lore_storage::db::Db;

/// A schema-initialized database backed by a temp directory. The directory
/// (and the database file with it) is removed when the value drops.
pub struct TestDatabase {
	db: Db,
	path: String,
	// Held for its Drop; deleting the dir is the cleanup.
	_dir: TempDir,
}
impl TestDatabase {
	pub async fn new() -> Result<Self> {
		let dir = TempDir::new()?;
		let path = dir
			.path()
			.join("lore_test.db")
			.to_str()
			.ok_or_else(|| Error::Message("Non-UTF-8 temp path.".into()))?
			.to_string();
		let db = Db::connect(&sqlite_config(&path)).await?;

		db.ensure_schema().await?;

		Ok(Self { db, path, _dir: dir })
	}

	pub fn db(&self) -> &Db {
		&self.db
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// A full service config pointing at this database.
	pub fn config(&self) -> Config {
		test_config(&self.path)
	}
}

pub async fn with_test_db<F, Fut, T>(f: F) -> Result<T>
where
	F: FnOnce(TestDatabase) -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let db = TestDatabase::new().await?;

	f(db).await
}

fn sqlite_config(path: &str) -> Sqlite {
	Sqlite { path: path.to_string(), pool_max_conns: 4, busy_timeout_ms: 5_000 }
}

pub fn test_config(db_path: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".into(),
			admin_bind: "127.0.0.1:0".into(),
			log_level: "warn".into(),
		},
		paths: Paths { corpus_root: "corpus".into() },
		storage: Storage { sqlite: sqlite_config(db_path) },
		chunking: Chunking { max_tokens: 400, prefer_structure: true },
		search: Search { candidate_k: 50, top_n: 8 },
		confidence: ConfidenceThresholds { min_score: 1.2, floor_score: 0.35, agreement_ratio: 0.55 },
		session: Session { idle_timeout_secs: 1_800, sweep_interval_secs: 300, max_messages: 20 },
		generation: GenerationProviderConfig {
			base_url: "http://127.0.0.1:11434".into(),
			path: "/api/generate".into(),
			model: "test-model".into(),
			temperature: 0.2,
			max_tokens: 512,
			timeout_ms: 2_000,
			api_key: None,
		},
		redaction: Redaction::default(),
	}
}

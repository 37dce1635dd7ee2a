use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub paths: Paths,
	pub storage: Storage,
	pub chunking: Chunking,
	pub search: Search,
	pub confidence: ConfidenceThresholds,
	pub session: Session,
	pub generation: GenerationProviderConfig,
	#[serde(default)]
	pub redaction: Redaction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
	pub corpus_root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sqlite {
	pub path: String,
	pub pool_max_conns: u32,
	#[serde(default = "default_busy_timeout_ms")]
	pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chunking {
	pub max_tokens: u32,
	#[serde(default = "default_true")]
	pub prefer_structure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub candidate_k: u32,
	pub top_n: u32,
}

/// Relevance gating for the answer-mode classifier. Scores are on the
/// negated-BM25 scale produced by the search index; higher is better.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfidenceThresholds {
	/// Minimum relevance for a chunk to count as document-grounded evidence.
	pub min_score: f32,
	/// Below this, the corpus is treated as having nothing to say at all.
	pub floor_score: f32,
	/// A hit corroborates the top hit only when its score is at least this
	/// fraction of the top score.
	pub agreement_ratio: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
	pub idle_timeout_secs: u64,
	pub sweep_interval_secs: u64,
	pub max_messages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
	pub base_url: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Redaction {
	pub enabled: bool,
	/// Extra patterns on top of the built-in set. Empty means built-ins only.
	pub patterns: Vec<String>,
}

fn default_busy_timeout_ms() -> u64 {
	5_000
}

fn default_true() -> bool {
	true
}

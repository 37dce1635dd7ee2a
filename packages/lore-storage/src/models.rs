use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Document {
	pub doc_id: i64,
	pub relpath: String,
	pub title: Option<String>,
	pub space_key: Option<String>,
	pub version: i64,
	pub file_type: String,
	pub updated_at: Option<String>,
	pub sha256: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Chunk {
	pub chunk_id: i64,
	pub doc_id: i64,
	pub section_path: Option<String>,
	pub text: String,
	pub token_count: i64,
	pub extra_meta: Option<String>,
}

/// Chunk fields supplied by the chunking policy; ids are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewChunk {
	pub section_path: Option<String>,
	pub text: String,
	pub token_count: i64,
	pub extra_meta: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
	pub relpath: String,
	pub title: Option<String>,
	pub space_key: Option<String>,
	pub version: i64,
	pub file_type: String,
	pub updated_at: Option<String>,
	pub sha256: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkHit {
	pub chunk_id: i64,
	pub score: f32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CitationRow {
	pub chunk_id: i64,
	pub doc_id: i64,
	pub title: Option<String>,
	pub section_path: Option<String>,
	pub relpath: String,
}

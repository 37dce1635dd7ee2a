use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{Error, LoreService, Result};
use lore_chunking::ChunkingConfig;
use lore_storage::{
	docs, fts,
	models::{NewChunk, NewDocument},
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IngestRequest {
	pub relpath: String,
	pub title: Option<String>,
	pub space_key: Option<String>,
	pub file_type: String,
	pub updated_at: Option<String>,
	pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IngestResponse {
	pub doc_id: i64,
	pub changed: bool,
	pub version: i64,
	pub chunk_count: usize,
}

impl LoreService {
	/// Ingest one document. An unchanged fingerprint at the same relpath is a
	/// no-op; any change replaces the document's chunks and index rows in one
	/// transaction.
	pub async fn ingest(&self, req: IngestRequest) -> Result<IngestResponse> {
		let relpath = req.relpath.trim();

		if relpath.is_empty() {
			return Err(Error::InvalidRequest { message: "relpath is required.".to_string() });
		}
		if req.text.trim().is_empty() {
			return Err(Error::ChunkingFailure { relpath: relpath.to_string() });
		}

		let sha256 = hex::encode(Sha256::digest(req.text.as_bytes()));
		let existing = docs::get_document_by_relpath(&self.db.pool, relpath).await?;

		if let Some(doc) = &existing {
			if doc.sha256 == sha256 {
				let chunk_count = docs::chunk_count_for_doc(&self.db.pool, doc.doc_id).await?;

				tracing::debug!(relpath, "Document unchanged; skipping re-ingestion.");

				return Ok(IngestResponse {
					doc_id: doc.doc_id,
					changed: false,
					version: doc.version,
					chunk_count: chunk_count as usize,
				});
			}
		}

		let chunk_cfg = ChunkingConfig {
			max_tokens: self.cfg.chunking.max_tokens,
			prefer_structure: self.cfg.chunking.prefer_structure,
		};
		let chunks = lore_chunking::split_document(&req.text, &chunk_cfg);

		if chunks.is_empty() {
			return Err(Error::ChunkingFailure { relpath: relpath.to_string() });
		}

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let (doc_id, version) = match &existing {
			Some(doc) => {
				let version = doc.version + 1;
				let new_doc = NewDocument {
					relpath: relpath.to_string(),
					title: req.title.clone(),
					space_key: req.space_key.clone(),
					version,
					file_type: req.file_type.clone(),
					updated_at: req.updated_at.clone(),
					sha256: sha256.clone(),
					created_at: doc.created_at,
				};

				// Index rows must go while the chunk rows still map them.
				fts::deindex_doc(&mut *tx, doc.doc_id).await?;
				docs::delete_chunks_for_doc(&mut *tx, doc.doc_id).await?;
				docs::update_document(&mut *tx, doc.doc_id, &new_doc).await?;

				(doc.doc_id, version)
			},
			None => {
				let new_doc = NewDocument {
					relpath: relpath.to_string(),
					title: req.title.clone(),
					space_key: req.space_key.clone(),
					version: 1,
					file_type: req.file_type.clone(),
					updated_at: req.updated_at.clone(),
					sha256: sha256.clone(),
					created_at: now,
				};

				(docs::insert_document(&mut *tx, &new_doc).await?, 1)
			},
		};

		for chunk in &chunks {
			let text = self.scrub(&chunk.text);
			let new_chunk = NewChunk {
				section_path: chunk.section_path.clone(),
				text: text.clone(),
				token_count: chunk.token_count,
				extra_meta: None,
			};
			let chunk_id = docs::insert_chunk(&mut *tx, doc_id, &new_chunk).await?;

			fts::index_chunk(&mut *tx, chunk_id, &text).await?;
		}

		tx.commit().await?;

		tracing::info!(relpath, doc_id, version, chunk_count = chunks.len(), "Document ingested.");

		Ok(IngestResponse { doc_id, changed: true, version, chunk_count: chunks.len() })
	}

	/// Remove a document with its chunks and index rows; `false` when the
	/// relpath is unknown.
	pub async fn delete_document(&self, relpath: &str) -> Result<bool> {
		let Some(doc) = docs::get_document_by_relpath(&self.db.pool, relpath.trim()).await? else {
			return Ok(false);
		};
		let mut tx = self.db.pool.begin().await?;

		fts::deindex_doc(&mut *tx, doc.doc_id).await?;
		docs::delete_document(&mut *tx, doc.doc_id).await?;
		tx.commit().await?;

		tracing::info!(relpath, doc_id = doc.doc_id, "Document deleted.");

		Ok(true)
	}
}

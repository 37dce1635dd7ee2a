use serde::{Deserialize, Serialize};

use crate::{LoreService, Result};
use lore_storage::docs;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Citation {
	/// 1-based ordinal in the order the generator used the passage.
	pub id: usize,
	pub title: String,
	pub section: String,
	pub file: String,
	pub score: f32,
}

impl LoreService {
	/// Resolve chunk ids into citations, preserving the given usage order.
	/// A chunk deleted since retrieval is skipped, never a failure.
	pub async fn resolve_citations(&self, ordered: &[(i64, f32)]) -> Result<Vec<Citation>> {
		let mut citations = Vec::with_capacity(ordered.len());

		for &(chunk_id, score) in ordered {
			let Some(row) = docs::get_citation(&self.db.pool, chunk_id).await? else {
				tracing::warn!(chunk_id, "Chunk disappeared before citation; skipping.");

				continue;
			};

			citations.push(Citation {
				id: citations.len() + 1,
				title: row.title.unwrap_or_else(|| "Unknown".to_string()),
				section: row.section_path.unwrap_or_else(|| "Unknown".to_string()),
				file: row.relpath,
				score,
			});
		}

		Ok(citations)
	}
}

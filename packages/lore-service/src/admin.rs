use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{LoreService, Result};
use lore_storage::{docs, fts};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct ReindexReport {
	pub documents_checked: u64,
	pub documents_reindexed: u64,
	pub orphan_entries_removed: u64,
}

impl LoreService {
	/// Repair index/store drift: rebuild index rows for documents with
	/// unindexed chunks and drop index entries whose chunk is gone.
	pub async fn reindex(&self) -> Result<ReindexReport> {
		let mut report = ReindexReport::default();
		let missing =
			fts::chunks_missing_from_index(&self.db.pool).await?.into_iter().collect::<HashSet<_>>();
		let doc_ids = docs::list_doc_ids(&self.db.pool).await?;

		for doc_id in doc_ids {
			report.documents_checked += 1;

			let chunks = docs::chunks_for_doc(&self.db.pool, doc_id).await?;

			if !chunks.iter().any(|chunk| missing.contains(&chunk.chunk_id)) {
				continue;
			}

			// Rebuild the whole document's rows so partial drift cannot
			// survive the repair.
			let mut tx = self.db.pool.begin().await?;

			fts::deindex_doc(&mut *tx, doc_id).await?;

			for chunk in &chunks {
				fts::index_chunk(&mut *tx, chunk.chunk_id, &chunk.text).await?;
			}

			tx.commit().await?;

			report.documents_reindexed += 1;
		}

		report.orphan_entries_removed = fts::purge_orphan_entries(&self.db.pool).await?;

		if report.documents_reindexed > 0 || report.orphan_entries_removed > 0 {
			tracing::info!(
				documents_reindexed = report.documents_reindexed,
				orphan_entries_removed = report.orphan_entries_removed,
				"Search index repaired."
			);
		}

		Ok(report)
	}
}

use crate::{LoreService, Result};
use lore_storage::{fts, models::ChunkHit};

impl LoreService {
	/// Ranked full-text lookup. A query with no usable terms returns no hits
	/// rather than an error.
	pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<ChunkHit>> {
		let Some(expr) = fts::match_expr(query) else {
			return Ok(Vec::new());
		};

		Ok(fts::search(&self.db.pool, &expr, limit).await?)
	}
}

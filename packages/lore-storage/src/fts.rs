//! Full-text index maintenance and ranked lookup over the `fts_chunks` table.
//!
//! Index rows mirror `chunks` rows one to one, keyed by rowid = chunk_id.
//! Callers that mutate chunks must run the matching index mutation on the
//! same transaction so the two tables never drift apart.

use sqlx::SqliteExecutor;

use crate::{Result, models::ChunkHit};

const MAX_QUERY_TERMS: usize = 16;

/// Build a MATCH expression from free-form user text.
///
/// Terms are lowercased, stripped to alphanumerics, deduplicated and quoted,
/// then OR-joined so any term can contribute to the bm25 score. Returns
/// `None` when the text yields no usable terms.
pub fn match_expr(query: &str) -> Option<String> {
	let mut terms = Vec::new();

	for raw in query.split(|c: char| !c.is_alphanumeric()) {
		if raw.len() < 2 {
			continue;
		}

		let term = raw.to_lowercase();

		if terms.contains(&term) {
			continue;
		}

		terms.push(term);

		if terms.len() == MAX_QUERY_TERMS {
			break;
		}
	}

	if terms.is_empty() {
		return None;
	}

	Some(terms.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(" OR "))
}

pub async fn index_chunk<'e, E>(executor: E, chunk_id: i64, text: &str) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query("INSERT INTO fts_chunks (rowid, text) VALUES (?1,?2)")
		.bind(chunk_id)
		.bind(text)
		.execute(executor)
		.await?;

	Ok(())
}

/// Remove every index entry belonging to a document.
///
/// Must run before the document's chunk rows are deleted, while the
/// `chunks` table still knows which rowids belong to the document.
pub async fn deindex_doc<'e, E>(executor: E, doc_id: i64) -> Result<u64>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
DELETE FROM fts_chunks
WHERE rowid IN (SELECT chunk_id FROM chunks WHERE doc_id = ?1)",
	)
	.bind(doc_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Ranked lookup. Scores are `-bm25(...)` so higher is better; ties break
/// toward the lower chunk_id for stable ordering.
pub async fn search<'e, E>(executor: E, match_expr: &str, limit: i64) -> Result<Vec<ChunkHit>>
where
	E: SqliteExecutor<'e>,
{
	let rows: Vec<(i64, f64)> = sqlx::query_as(
		"\
SELECT rowid, -bm25(fts_chunks)
FROM fts_chunks
WHERE fts_chunks MATCH ?1
ORDER BY bm25(fts_chunks) ASC, rowid ASC
LIMIT ?2",
	)
	.bind(match_expr)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().map(|(chunk_id, score)| ChunkHit { chunk_id, score: score as f32 }).collect())
}

pub async fn index_entry_count<'e, E>(executor: E) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count: i64 =
		sqlx::query_scalar("SELECT count(*) FROM fts_chunks").fetch_one(executor).await?;

	Ok(count)
}

/// Chunk ids present in `chunks` but absent from the index.
pub async fn chunks_missing_from_index<'e, E>(executor: E) -> Result<Vec<i64>>
where
	E: SqliteExecutor<'e>,
{
	let ids: Vec<i64> = sqlx::query_scalar(
		"\
SELECT chunk_id
FROM chunks
WHERE chunk_id NOT IN (SELECT rowid FROM fts_chunks)
ORDER BY chunk_id ASC",
	)
	.fetch_all(executor)
	.await?;

	Ok(ids)
}

/// Delete index entries whose chunk row no longer exists.
pub async fn purge_orphan_entries<'e, E>(executor: E) -> Result<u64>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
DELETE FROM fts_chunks
WHERE rowid NOT IN (SELECT chunk_id FROM chunks)",
	)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

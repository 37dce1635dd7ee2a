use sqlx::SqliteExecutor;

use crate::{
	Result,
	models::{Chunk, CitationRow, Document, NewChunk, NewDocument},
};

pub async fn insert_document<'e, E>(executor: E, doc: &NewDocument) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO documents (
\trelpath,
\ttitle,
\tspace_key,
\tversion,
\tfile_type,
\tupdated_at,
\tsha256,
\tcreated_at
)
VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
	)
	.bind(doc.relpath.as_str())
	.bind(doc.title.as_deref())
	.bind(doc.space_key.as_deref())
	.bind(doc.version)
	.bind(doc.file_type.as_str())
	.bind(doc.updated_at.as_deref())
	.bind(doc.sha256.as_str())
	.bind(doc.created_at)
	.execute(executor)
	.await?;

	Ok(result.last_insert_rowid())
}

pub async fn update_document<'e, E>(executor: E, doc_id: i64, doc: &NewDocument) -> Result<()>
where
	E: SqliteExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE documents
SET
\ttitle = ?1,
\tspace_key = ?2,
\tversion = ?3,
\tfile_type = ?4,
\tupdated_at = ?5,
\tsha256 = ?6
WHERE doc_id = ?7",
	)
	.bind(doc.title.as_deref())
	.bind(doc.space_key.as_deref())
	.bind(doc.version)
	.bind(doc.file_type.as_str())
	.bind(doc.updated_at.as_deref())
	.bind(doc.sha256.as_str())
	.bind(doc_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_document_by_relpath<'e, E>(executor: E, relpath: &str) -> Result<Option<Document>>
where
	E: SqliteExecutor<'e>,
{
	let row = sqlx::query_as::<_, Document>(
		"\
SELECT
\tdoc_id,
\trelpath,
\ttitle,
\tspace_key,
\tversion,
\tfile_type,
\tupdated_at,
\tsha256,
\tcreated_at
FROM documents
WHERE relpath = ?1
LIMIT 1",
	)
	.bind(relpath)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn delete_document<'e, E>(executor: E, doc_id: i64) -> Result<u64>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM documents WHERE doc_id = ?1")
		.bind(doc_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

pub async fn insert_chunk<'e, E>(
	executor: E,
	doc_id: i64,
	chunk: &NewChunk,
) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO chunks (doc_id, section_path, text, token_count, extra_meta)
VALUES (?1,?2,?3,?4,?5)",
	)
	.bind(doc_id)
	.bind(chunk.section_path.as_deref())
	.bind(chunk.text.as_str())
	.bind(chunk.token_count)
	.bind(chunk.extra_meta.as_deref())
	.execute(executor)
	.await?;

	Ok(result.last_insert_rowid())
}

pub async fn delete_chunks_for_doc<'e, E>(executor: E, doc_id: i64) -> Result<u64>
where
	E: SqliteExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM chunks WHERE doc_id = ?1")
		.bind(doc_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}

pub async fn get_chunk<'e, E>(executor: E, chunk_id: i64) -> Result<Option<Chunk>>
where
	E: SqliteExecutor<'e>,
{
	let row = sqlx::query_as::<_, Chunk>(
		"\
SELECT chunk_id, doc_id, section_path, text, token_count, extra_meta
FROM chunks
WHERE chunk_id = ?1
LIMIT 1",
	)
	.bind(chunk_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn get_citation<'e, E>(executor: E, chunk_id: i64) -> Result<Option<CitationRow>>
where
	E: SqliteExecutor<'e>,
{
	let row = sqlx::query_as::<_, CitationRow>(
		"\
SELECT chunk_id, doc_id, title, section_path, relpath
FROM v_chunk_citation
WHERE chunk_id = ?1
LIMIT 1",
	)
	.bind(chunk_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn chunk_count_for_doc<'e, E>(executor: E, doc_id: i64) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM chunks WHERE doc_id = ?1")
		.bind(doc_id)
		.fetch_one(executor)
		.await?;

	Ok(count)
}

pub async fn count_chunks<'e, E>(executor: E) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM chunks").fetch_one(executor).await?;

	Ok(count)
}

pub async fn count_documents<'e, E>(executor: E) -> Result<i64>
where
	E: SqliteExecutor<'e>,
{
	let count: i64 =
		sqlx::query_scalar("SELECT count(*) FROM documents").fetch_one(executor).await?;

	Ok(count)
}

pub async fn list_doc_ids<'e, E>(executor: E) -> Result<Vec<i64>>
where
	E: SqliteExecutor<'e>,
{
	let ids: Vec<i64> = sqlx::query_scalar("SELECT doc_id FROM documents ORDER BY doc_id ASC")
		.fetch_all(executor)
		.await?;

	Ok(ids)
}

pub async fn chunks_for_doc<'e, E>(executor: E, doc_id: i64) -> Result<Vec<Chunk>>
where
	E: SqliteExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Chunk>(
		"\
SELECT chunk_id, doc_id, section_path, text, token_count, extra_meta
FROM chunks
WHERE doc_id = ?1
ORDER BY chunk_id ASC",
	)
	.bind(doc_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

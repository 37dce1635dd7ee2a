use std::fs;

use lore_ingest::walker;
use lore_service::LoreService;
use lore_storage::{db::Db, docs};
use lore_testkit::TestDatabase;
use tempfile::TempDir;

async fn test_service(tdb: &TestDatabase) -> LoreService {
	let cfg = tdb.config();
	let db = Db::connect(&cfg.storage.sqlite).await.unwrap();

	LoreService::new(cfg, db).unwrap()
}

#[tokio::test]
async fn walks_corpus_and_reports_summary() {
	let tdb = TestDatabase::new().await.unwrap();
	let service = test_service(&tdb).await;
	let corpus = TempDir::new().unwrap();

	fs::create_dir_all(corpus.path().join("kb")).unwrap();
	fs::write(
		corpus.path().join("kb/setup.md"),
		"# Setup Guide\n\nInstall the agent and configure the corpus root.",
	)
	.unwrap();
	fs::write(corpus.path().join("kb/notes.txt"), "Plain notes about operations.").unwrap();
	fs::write(
		corpus.path().join("kb/faq.html"),
		"<html><body><h1>FAQ</h1><p>Answers to common questions.</p></body></html>",
	)
	.unwrap();
	fs::write(corpus.path().join("kb/scan.pdf"), "%PDF-1.4 binary-ish").unwrap();

	let summary = walker::walk_corpus(&service, corpus.path()).await.unwrap();

	assert_eq!(summary.ingested, 3);
	assert_eq!(summary.unchanged, 0);
	assert_eq!(summary.skipped, 1);
	assert_eq!(summary.failed, 0);
	assert_eq!(docs::count_documents(&service.db.pool).await.unwrap(), 3);

	let doc = docs::get_document_by_relpath(&service.db.pool, "kb/setup.md").await.unwrap().unwrap();

	assert_eq!(doc.title.as_deref(), Some("Setup Guide"));
	assert_eq!(doc.space_key.as_deref(), Some("kb"));
	assert_eq!(doc.file_type, "md");
	assert!(doc.updated_at.is_some());

	// A second walk over the same tree changes nothing.
	let second = walker::walk_corpus(&service, corpus.path()).await.unwrap();

	assert_eq!(second.ingested, 0);
	assert_eq!(second.unchanged, 3);
	assert_eq!(docs::count_documents(&service.db.pool).await.unwrap(), 3);
}

#[tokio::test]
async fn bad_file_does_not_abort_the_walk() {
	let tdb = TestDatabase::new().await.unwrap();
	let service = test_service(&tdb).await;
	let corpus = TempDir::new().unwrap();

	// Whitespace-only text fails chunking; the good file still lands.
	fs::write(corpus.path().join("blank.md"), "   \n\n   ").unwrap();
	fs::write(corpus.path().join("good.md"), "# Good\n\nUsable content.").unwrap();

	let summary = walker::walk_corpus(&service, corpus.path()).await.unwrap();

	assert_eq!(summary.ingested, 1);
	assert_eq!(summary.failed, 1);
	assert_eq!(docs::count_documents(&service.db.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn missing_root_is_an_error() {
	let tdb = TestDatabase::new().await.unwrap();
	let service = test_service(&tdb).await;

	assert!(walker::walk_corpus(&service, std::path::Path::new("/nonexistent/corpus")).await.is_err());
}

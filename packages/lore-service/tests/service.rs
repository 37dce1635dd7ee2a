use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use lore_config::{Config, GenerationProviderConfig};
use lore_domain::confidence::{AnswerMode, Confidence};
use lore_providers::generation::GenerationResponse;
use lore_service::{
	BoxFuture, GenerationProvider, IngestRequest, LoreService, Providers, QueryRequest,
};
use lore_storage::{db::Db, docs, fts};
use lore_testkit::TestDatabase;
use time::{Duration, OffsetDateTime};

struct StubGeneration {
	answer: &'static str,
	used: Option<Vec<usize>>,
	calls: Arc<AtomicUsize>,
}
impl StubGeneration {
	fn new(answer: &'static str) -> Self {
		Self { answer, used: None, calls: Arc::new(AtomicUsize::new(0)) }
	}

	fn with_used(answer: &'static str, used: Vec<usize>) -> Self {
		Self { answer, used: Some(used), calls: Arc::new(AtomicUsize::new(0)) }
	}

	fn counter(&self) -> Arc<AtomicUsize> {
		self.calls.clone()
	}
}
impl GenerationProvider for StubGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GenerationResponse>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let response = GenerationResponse { text: self.answer.to_string(), used: self.used.clone() };

		Box::pin(async move { Ok(response) })
	}
}

struct FailingGeneration;
impl GenerationProvider for FailingGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GenerationResponse>> {
		Box::pin(async move { Err(color_eyre::eyre::eyre!("connection refused")) })
	}
}

struct SlowGeneration;
impl GenerationProvider for SlowGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<GenerationResponse>> {
		Box::pin(async move {
			tokio::time::sleep(std::time::Duration::from_millis(500)).await;

			Ok(GenerationResponse { text: "too late".to_string(), used: None })
		})
	}
}

async fn setup(
	providers: Providers,
	cfg_mut: impl FnOnce(&mut Config),
) -> (TestDatabase, LoreService) {
	let tdb = TestDatabase::new().await.unwrap();
	let mut cfg = tdb.config();

	// Tiny corpora produce small BM25 magnitudes; keep the gates permissive
	// unless a test overrides them.
	cfg.confidence.min_score = 0.01;
	cfg.confidence.floor_score = 0.001;
	cfg.confidence.agreement_ratio = 0.1;

	cfg_mut(&mut cfg);

	let db = Db::connect(&cfg.storage.sqlite).await.unwrap();
	let service = LoreService::with_providers(cfg, db, providers).unwrap();

	(tdb, service)
}

fn stub_providers(answer: &'static str) -> (Providers, Arc<AtomicUsize>) {
	let stub = StubGeneration::new(answer);
	let counter = stub.counter();

	(Providers::new(Arc::new(stub)), counter)
}

fn ingest_request(relpath: &str, text: &str) -> IngestRequest {
	IngestRequest {
		relpath: relpath.to_string(),
		title: Some("Product Handbook".to_string()),
		space_key: Some("kb".to_string()),
		file_type: "md".to_string(),
		updated_at: None,
		text: text.to_string(),
	}
}

const HANDBOOK: &str = "\
# Overview

The product ships as a managed service with a self-hosted option.

## Pricing

Pricing has three tiers: starter, team, and enterprise. The starter tier is free
for up to five seats and the team tier is billed per seat per month.

## Support

Support is available on business days via the helpdesk.";

#[tokio::test]
async fn reingestion_of_unchanged_text_is_a_noop() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;
	let first = service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();
	let second = service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	assert!(first.changed);
	assert_eq!(first.version, 1);
	assert!(!second.changed);
	assert_eq!(second.version, 1);
	assert_eq!(second.doc_id, first.doc_id);
	assert_eq!(second.chunk_count, first.chunk_count);
	assert_eq!(docs::count_documents(&service.db.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn changed_text_bumps_version_and_replaces_chunks() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let updated = format!("{HANDBOOK}\n\n## Refunds\n\nRefunds are processed within two weeks.");
	let second = service.ingest(ingest_request("kb/handbook.md", &updated)).await.unwrap();

	assert!(second.changed);
	assert_eq!(second.version, 2);
	assert_eq!(
		docs::count_chunks(&service.db.pool).await.unwrap(),
		fts::index_entry_count(&service.db.pool).await.unwrap()
	);
	assert_eq!(docs::count_chunks(&service.db.pool).await.unwrap() as usize, second.chunk_count);
}

#[tokio::test]
async fn blank_text_is_a_chunking_failure() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;
	let result = service.ingest(ingest_request("kb/empty.md", "   \n\n  ")).await;

	assert!(matches!(result, Err(lore_service::Error::ChunkingFailure { .. })));
	assert_eq!(docs::count_documents(&service.db.pool).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_document_removes_chunks_and_index_rows() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	assert!(service.delete_document("kb/handbook.md").await.unwrap());
	assert!(!service.delete_document("kb/handbook.md").await.unwrap());
	assert_eq!(docs::count_chunks(&service.db.pool).await.unwrap(), 0);
	assert_eq!(fts::index_entry_count(&service.db.pool).await.unwrap(), 0);
}

#[tokio::test]
async fn pricing_question_is_doc_grounded_with_pricing_citation() {
	let (providers, calls) = stub_providers("The starter tier is free for up to five seats.");
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let response = service
		.answer(QueryRequest { question: "What are the pricing tiers?".to_string(), session_id: None })
		.await
		.unwrap();

	assert_eq!(response.mode, AnswerMode::DocGrounded);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(!response.citations.is_empty());
	assert!(response.citations.iter().any(|c| c.section.contains("Pricing")));
	assert_eq!(response.chunks_used, response.citations.len());
	assert_eq!(response.citations[0].id, 1);
	assert_eq!(response.citations[0].file, "kb/handbook.md");
}

#[tokio::test]
async fn empty_corpus_abstains_without_calling_generation() {
	let (providers, calls) = stub_providers("should never be called");
	let (_tdb, service) = setup(providers, |_| {}).await;
	let response = service
		.answer(QueryRequest { question: "What are the pricing tiers?".to_string(), session_id: None })
		.await
		.unwrap();

	assert_eq!(response.mode, AnswerMode::Abstain);
	assert_eq!(response.confidence, Confidence::Abstain);
	assert!(response.citations.is_empty());
	assert_eq!(response.chunks_used, 0);
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn weak_match_falls_back_to_general_knowledge() {
	let (providers, calls) = stub_providers("Generally speaking, yes.");
	let (_tdb, service) = setup(providers, |cfg| {
		// Force every match under the grounding gate.
		cfg.confidence.min_score = 1_000.0;
		cfg.confidence.floor_score = 0.000_1;
	})
	.await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let response = service
		.answer(QueryRequest { question: "Is there a free pricing tier?".to_string(), session_id: None })
		.await
		.unwrap();

	assert_eq!(response.mode, AnswerMode::General);
	assert_eq!(response.confidence, Confidence::General);
	assert!(response.citations.is_empty());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generation_failure_degrades_to_low_confidence() {
	let providers = Providers::new(Arc::new(FailingGeneration));
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let response = service
		.answer(QueryRequest { question: "What are the pricing tiers?".to_string(), session_id: None })
		.await
		.unwrap();

	assert_eq!(response.mode, AnswerMode::Abstain);
	assert_eq!(response.confidence, Confidence::Low);
	assert!(response.citations.is_empty());
	assert_eq!(response.chunks_used, 0);
}

#[tokio::test]
async fn generation_timeout_degrades_to_low_confidence() {
	let providers = Providers::new(Arc::new(SlowGeneration));
	let (_tdb, service) = setup(providers, |cfg| {
		cfg.generation.timeout_ms = 50;
	})
	.await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let response = service
		.answer(QueryRequest { question: "What are the pricing tiers?".to_string(), session_id: None })
		.await
		.unwrap();

	assert_eq!(response.confidence, Confidence::Low);
	assert_eq!(response.mode, AnswerMode::Abstain);
}

#[tokio::test]
async fn used_ordinals_drive_citation_order() {
	let stub = StubGeneration::with_used("See sources.", vec![2, 1]);
	let providers = Providers::new(Arc::new(stub));
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let response = service
		.answer(QueryRequest {
			question: "What are the pricing tiers and support hours?".to_string(),
			session_id: None,
		})
		.await
		.unwrap();

	assert_eq!(response.mode, AnswerMode::DocGrounded);
	assert_eq!(response.citations.len(), 2);
	// Ordinals are reassigned 1-based in usage order.
	assert_eq!(response.citations[0].id, 1);
	assert_eq!(response.citations[1].id, 2);
}

#[tokio::test]
async fn blank_question_is_rejected() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;
	let result =
		service.answer(QueryRequest { question: "   ".to_string(), session_id: None }).await;

	assert!(matches!(result, Err(lore_service::Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn queries_accumulate_history_until_reset() {
	let (providers, _) = stub_providers("An answer.");
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let session_id = service.sessions.create().await;

	for question in ["What are the pricing tiers?", "What about support?"] {
		service
			.answer(QueryRequest { question: question.to_string(), session_id: Some(session_id) })
			.await
			.unwrap();
	}

	let history = service.sessions.history(session_id).await.unwrap();

	assert_eq!(history.len(), 4);
	assert_eq!(history[0].role, "user");
	assert_eq!(history[1].role, "assistant");
	assert!(history[1].mode.is_some());

	assert!(service.sessions.reset(session_id).await);
	assert!(!service.sessions.reset(session_id).await);
	assert!(service.sessions.history(session_id).await.is_err());

	let fresh = service.sessions.create().await;

	assert_ne!(fresh, session_id);
}

#[tokio::test]
async fn unknown_session_id_gets_a_fresh_session() {
	let (providers, _) = stub_providers("An answer.");
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let bogus = uuid::Uuid::new_v4();
	let response = service
		.answer(QueryRequest {
			question: "What are the pricing tiers?".to_string(),
			session_id: Some(bogus),
		})
		.await
		.unwrap();

	assert_ne!(response.session_id, bogus);
	assert!(service.sessions.contains(response.session_id).await);
}

#[tokio::test]
async fn sweep_expires_idle_sessions() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;
	let session_id = service.sessions.create().await;

	assert_eq!(service.sessions.sweep(OffsetDateTime::now_utc()).await, 0);

	let removed = service.sessions.sweep(OffsetDateTime::now_utc() + Duration::hours(2)).await;

	assert_eq!(removed, 1);
	assert!(!service.sessions.contains(session_id).await);
	assert_eq!(service.sessions.active_count().await, 0);
}

#[tokio::test]
async fn idle_session_expires_on_observation_without_a_sweep() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |cfg| {
		cfg.session.idle_timeout_secs = 1;
	})
	.await;
	let session_id = service.sessions.create().await;

	tokio::time::sleep(std::time::Duration::from_millis(1_200)).await;

	assert!(matches!(
		service.sessions.history(session_id).await,
		Err(lore_service::Error::SessionNotFound { .. })
	));
	// The expired entry is gone even though no sweep ran.
	assert_eq!(service.sessions.active_count().await, 0);
}

#[tokio::test]
async fn history_is_capped_at_max_messages() {
	let (providers, _) = stub_providers("An answer.");
	let (_tdb, service) = setup(providers, |cfg| {
		cfg.session.max_messages = 4;
	})
	.await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	let session_id = service.sessions.create().await;

	for _ in 0..4 {
		service
			.answer(QueryRequest {
				question: "What are the pricing tiers?".to_string(),
				session_id: Some(session_id),
			})
			.await
			.unwrap();
	}

	let history = service.sessions.history(session_id).await.unwrap();

	assert_eq!(history.len(), 4);
	// Oldest turns roll off first.
	assert_eq!(history[0].role, "user");
}

#[tokio::test]
async fn redaction_scrubs_chunks_and_answers() {
	let (providers, _) = stub_providers("Mail ops@example.com for access.");
	let (_tdb, service) = setup(providers, |cfg| {
		cfg.redaction.enabled = true;
	})
	.await;
	let text = "# Access\n\nTo get access, mail ops@example.com with your request.";

	service.ingest(ingest_request("kb/access.md", text)).await.unwrap();

	let chunks = docs::chunks_for_doc(&service.db.pool, 1).await.unwrap();

	assert!(chunks.iter().all(|chunk| !chunk.text.contains("ops@example.com")));

	let response = service
		.answer(QueryRequest { question: "How do I get access?".to_string(), session_id: None })
		.await
		.unwrap();

	assert!(!response.answer.contains("ops@example.com"));
}

#[tokio::test]
async fn reindex_repairs_missing_and_orphaned_entries() {
	let (providers, _) = stub_providers("unused");
	let (_tdb, service) = setup(providers, |_| {}).await;

	service.ingest(ingest_request("kb/handbook.md", HANDBOOK)).await.unwrap();

	// Simulate drift in both directions.
	sqlx::query("DELETE FROM fts_chunks WHERE rowid = 1")
		.execute(&service.db.pool)
		.await
		.unwrap();
	sqlx::query("INSERT INTO fts_chunks (rowid, text) VALUES (9999, 'ghost entry')")
		.execute(&service.db.pool)
		.await
		.unwrap();

	let report = service.reindex().await.unwrap();

	assert_eq!(report.documents_checked, 1);
	assert_eq!(report.documents_reindexed, 1);
	assert_eq!(report.orphan_entries_removed, 1);
	assert!(fts::chunks_missing_from_index(&service.db.pool).await.unwrap().is_empty());
	assert_eq!(
		fts::index_entry_count(&service.db.pool).await.unwrap(),
		docs::count_chunks(&service.db.pool).await.unwrap()
	);
}

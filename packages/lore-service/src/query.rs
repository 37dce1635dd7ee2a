//! Query orchestration: retrieve, classify, generate, cite.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Citation, Error, LoreService, Result,
	prompt::{self, Passage},
	sessions::{ROLE_ASSISTANT, ROLE_USER, Turn},
};
use lore_domain::confidence::{self, AnswerMode, Confidence};
use lore_providers::generation::GenerationResponse;
use lore_storage::{docs, models::ChunkHit};

pub const ABSTAIN_ANSWER: &str = "I don't have that information in the documentation.";
pub const DEGRADED_ANSWER: &str =
	"An error occurred while generating the response. Please try again.";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QueryRequest {
	pub question: String,
	#[serde(default)]
	pub session_id: Option<Uuid>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QueryResponse {
	pub session_id: Uuid,
	pub answer: String,
	pub citations: Vec<Citation>,
	pub confidence: Confidence,
	pub mode: AnswerMode,
	pub chunks_used: usize,
}

impl LoreService {
	pub async fn answer(&self, req: QueryRequest) -> Result<QueryResponse> {
		let question = req.question.trim();

		if question.is_empty() {
			return Err(Error::InvalidRequest { message: "question is required.".to_string() });
		}

		// Unknown, absent, or expired ids all get a fresh session.
		let session_id = match req.session_id {
			Some(id) if self.sessions.contains(id).await => id,
			_ => self.sessions.create().await,
		};
		let history = self.sessions.history(session_id).await.unwrap_or_default();
		let hits = self.search(question, self.cfg.search.candidate_k as i64).await?;
		let scores = hits.iter().map(|hit| hit.score).collect::<Vec<_>>();
		let verdict = confidence::classify(&scores, &self.cfg.confidence);

		tracing::debug!(
			session_id = %session_id,
			hits = hits.len(),
			mode = ?verdict.mode,
			"Query classified."
		);

		let response = match verdict.mode {
			AnswerMode::Abstain => QueryResponse {
				session_id,
				answer: ABSTAIN_ANSWER.to_string(),
				citations: Vec::new(),
				confidence: Confidence::Abstain,
				mode: AnswerMode::Abstain,
				chunks_used: 0,
			},
			AnswerMode::General => self.answer_general(session_id, question, &history).await,
			AnswerMode::DocGrounded => {
				self.answer_grounded(session_id, question, &history, &hits, verdict.confidence)
					.await?
			},
		};

		self.record_turns(session_id, question, &response).await;

		Ok(response)
	}

	async fn answer_general(
		&self,
		session_id: Uuid,
		question: &str,
		history: &[Turn],
	) -> QueryResponse {
		let history_text = prompt::format_history(history);
		let user_prompt = prompt::build_user_prompt(question, "", AnswerMode::General, &history_text);
		let full_prompt = prompt::compose(prompt::SYSTEM_PROMPT, &user_prompt);

		match self.generate_bounded(&full_prompt).await {
			Ok(generated) => QueryResponse {
				session_id,
				answer: self.scrub(&generated.text),
				citations: Vec::new(),
				confidence: Confidence::General,
				mode: AnswerMode::General,
				chunks_used: 0,
			},
			Err(err) => {
				tracing::warn!(error = %err, "Generation failed; returning degraded response.");

				degraded(session_id)
			},
		}
	}

	async fn answer_grounded(
		&self,
		session_id: Uuid,
		question: &str,
		history: &[Turn],
		hits: &[ChunkHit],
		confidence: Confidence,
	) -> Result<QueryResponse> {
		let passages = self.hydrate_passages(hits).await?;

		// Every retrieved chunk may have been deleted since ranking.
		if passages.is_empty() {
			return Ok(QueryResponse {
				session_id,
				answer: ABSTAIN_ANSWER.to_string(),
				citations: Vec::new(),
				confidence: Confidence::Abstain,
				mode: AnswerMode::Abstain,
				chunks_used: 0,
			});
		}

		let context = prompt::format_context(&passages);
		let history_text = prompt::format_history(history);
		let user_prompt =
			prompt::build_user_prompt(question, &context, AnswerMode::DocGrounded, &history_text);
		let full_prompt = prompt::compose(prompt::SYSTEM_PROMPT, &user_prompt);
		let generated = match self.generate_bounded(&full_prompt).await {
			Ok(generated) => generated,
			Err(err) => {
				tracing::warn!(error = %err, "Generation failed; returning degraded response.");

				return Ok(degraded(session_id));
			},
		};
		let ordered = used_passages(&passages, generated.used.as_deref());
		let citations = self.resolve_citations(&ordered).await?;
		let chunks_used = citations.len();

		Ok(QueryResponse {
			session_id,
			answer: self.scrub(&generated.text),
			citations,
			confidence,
			mode: AnswerMode::DocGrounded,
			chunks_used,
		})
	}

	/// Fetch and scrub the top passages, skipping chunks deleted since
	/// retrieval.
	async fn hydrate_passages(&self, hits: &[ChunkHit]) -> Result<Vec<Passage>> {
		let top_n = self.cfg.search.top_n as usize;
		let mut passages = Vec::with_capacity(top_n.min(hits.len()));

		for hit in hits.iter().take(top_n) {
			let Some(chunk) = docs::get_chunk(&self.db.pool, hit.chunk_id).await? else {
				tracing::warn!(chunk_id = hit.chunk_id, "Chunk disappeared after ranking; skipping.");

				continue;
			};
			let title = match docs::get_citation(&self.db.pool, hit.chunk_id).await? {
				Some(row) => row.title.unwrap_or_else(|| "Unknown".to_string()),
				None => "Unknown".to_string(),
			};

			passages.push(Passage {
				chunk_id: chunk.chunk_id,
				score: hit.score,
				title,
				text: self.scrub(&chunk.text),
			});
		}

		Ok(passages)
	}

	async fn generate_bounded(&self, full_prompt: &str) -> Result<GenerationResponse> {
		let timeout = std::time::Duration::from_millis(self.cfg.generation.timeout_ms);
		let call = self.providers.generation.generate(&self.cfg.generation, full_prompt);

		match tokio::time::timeout(timeout, call).await {
			Err(_) => Err(Error::GenerationTimeout),
			Ok(Err(report)) => Err(Error::Provider { message: report.to_string() }),
			Ok(Ok(generated)) => Ok(generated),
		}
	}

	async fn record_turns(&self, session_id: Uuid, question: &str, response: &QueryResponse) {
		let now = OffsetDateTime::now_utc();
		let turns = vec![
			Turn {
				role: ROLE_USER.to_string(),
				content: question.to_string(),
				ts: now,
				mode: None,
				confidence: None,
			},
			Turn {
				role: ROLE_ASSISTANT.to_string(),
				content: response.answer.clone(),
				ts: now,
				mode: Some(response.mode),
				confidence: Some(response.confidence),
			},
		];

		// A sweep may race the append; the response still stands.
		if let Err(err) = self.sessions.append(session_id, turns).await {
			tracing::warn!(session_id = %session_id, error = %err, "Failed to record session turns.");
		}
	}
}

fn degraded(session_id: Uuid) -> QueryResponse {
	QueryResponse {
		session_id,
		answer: DEGRADED_ANSWER.to_string(),
		citations: Vec::new(),
		confidence: Confidence::Low,
		mode: AnswerMode::Abstain,
		chunks_used: 0,
	}
}

/// Map the generator's 1-based `used` ordinals onto passages, dropping
/// out-of-range or duplicate ordinals; absent ordinals mean prompt order.
fn used_passages(passages: &[Passage], used: Option<&[usize]>) -> Vec<(i64, f32)> {
	let Some(used) = used else {
		return passages.iter().map(|p| (p.chunk_id, p.score)).collect();
	};
	let mut seen = vec![false; passages.len()];
	let mut ordered = Vec::with_capacity(used.len());

	for &ordinal in used {
		if ordinal == 0 || ordinal > passages.len() || seen[ordinal - 1] {
			continue;
		}

		seen[ordinal - 1] = true;

		let passage = &passages[ordinal - 1];

		ordered.push((passage.chunk_id, passage.score));
	}

	ordered
}

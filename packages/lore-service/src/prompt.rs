//! Prompt assembly for the generation endpoint: system rules, recent
//! history, numbered source passages, then the question.

use crate::sessions::{ROLE_ASSISTANT, ROLE_USER, Turn};
use lore_domain::confidence::AnswerMode;

pub const SYSTEM_PROMPT: &str = "\
You are a helpful assistant with access to company documentation. You have two modes:

1) DOC-GROUNDED: When relevant documentation context is provided, answer based on it and cite sources.
2) GENERAL: When no documentation is available, respond naturally using your general knowledge.

Rules:
- When using documentation, cite sources with [Doc: filename/page]
- When no documentation is available, respond naturally as a helpful assistant
- Never claim you can't answer simple questions or greetings
- For questions about company-specific information without documentation, say \"I don't have that information in the documentation\"";

const HISTORY_TURNS: usize = 3;
const HISTORY_CONTENT_LIMIT: usize = 200;

#[derive(Clone, Debug)]
pub struct Passage {
	pub chunk_id: i64,
	pub score: f32,
	pub title: String,
	pub text: String,
}

pub fn format_context(passages: &[Passage]) -> String {
	passages
		.iter()
		.enumerate()
		.map(|(i, passage)| format!("[Source {} - {}]\n{}", i + 1, passage.title, passage.text))
		.collect::<Vec<_>>()
		.join("\n\n---\n\n")
}

/// Render the last few turns for display context. Assistant turns are
/// truncated; history never feeds retrieval.
pub fn format_history(turns: &[Turn]) -> String {
	let start = turns.len().saturating_sub(HISTORY_TURNS * 2);

	turns[start..]
		.iter()
		.filter_map(|turn| match turn.role.as_str() {
			ROLE_USER => Some(format!("User: {}", turn.content)),
			ROLE_ASSISTANT => Some(format!("Assistant: {}", truncate(&turn.content))),
			_ => None,
		})
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn build_user_prompt(question: &str, context: &str, mode: AnswerMode, history: &str) -> String {
	let mut parts = Vec::new();

	if !history.is_empty() {
		parts.push(format!("Previous conversation:\n{history}\n"));
	}

	parts.push(format!("Question: {question}\n"));
	parts.push(format!("Mode: {}\n", mode_hint(mode)));

	if !context.is_empty() {
		parts.push(format!("Documentation Context:\n{context}\n"));
	}

	if mode == AnswerMode::DocGrounded {
		parts.push("\nInstructions: Answer based on the documentation context. Cite sources.".to_string());
	} else {
		parts.push(
			"\nInstructions: No documentation available. Respond naturally and helpfully."
				.to_string(),
		);
	}

	parts.push("\nAnswer:".to_string());

	parts.join("\n")
}

pub fn compose(system: &str, user: &str) -> String {
	format!("System: {system}\n\nUser: {user}\n\nAssistant:")
}

fn mode_hint(mode: AnswerMode) -> &'static str {
	match mode {
		AnswerMode::DocGrounded => "DOC-GROUNDED",
		AnswerMode::General => "GENERAL",
		AnswerMode::Abstain => "ABSTAIN",
	}
}

fn truncate(content: &str) -> String {
	if content.chars().count() <= HISTORY_CONTENT_LIMIT {
		return content.to_string();
	}

	let short: String = content.chars().take(HISTORY_CONTENT_LIMIT).collect();

	format!("{short}...")
}

#[cfg(test)]
mod tests {
	use super::*;
	use time::OffsetDateTime;

	fn turn(role: &str, content: &str) -> Turn {
		Turn {
			role: role.to_string(),
			content: content.to_string(),
			ts: OffsetDateTime::now_utc(),
			mode: None,
			confidence: None,
		}
	}

	#[test]
	fn context_numbers_sources_from_one() {
		let passages = vec![
			Passage { chunk_id: 7, score: 2.0, title: "Billing".into(), text: "Invoices ship monthly.".into() },
			Passage { chunk_id: 9, score: 1.5, title: "Plans".into(), text: "Three tiers exist.".into() },
		];
		let context = format_context(&passages);

		assert!(context.starts_with("[Source 1 - Billing]\nInvoices ship monthly."));
		assert!(context.contains("[Source 2 - Plans]"));
		assert!(context.contains("\n\n---\n\n"));
	}

	#[test]
	fn history_keeps_recent_turns_and_truncates_assistant() {
		let long = "x".repeat(300);
		let turns = vec![turn(ROLE_USER, "first question"), turn(ROLE_ASSISTANT, &long)];
		let formatted = format_history(&turns);

		assert!(formatted.starts_with("User: first question\nAssistant: xxx"));
		assert!(formatted.ends_with("..."));
		assert!(formatted.len() < 250);
	}

	#[test]
	fn grounded_prompt_carries_context_and_instructions() {
		let prompt =
			build_user_prompt("What are the tiers?", "[Source 1 - Plans]\n...", AnswerMode::DocGrounded, "");

		assert!(prompt.contains("Mode: DOC-GROUNDED"));
		assert!(prompt.contains("Documentation Context:"));
		assert!(prompt.contains("Cite sources."));
		assert!(prompt.ends_with("\nAnswer:"));
	}

	#[test]
	fn general_prompt_omits_context() {
		let prompt = build_user_prompt("Hello there", "", AnswerMode::General, "");

		assert!(prompt.contains("Mode: GENERAL"));
		assert!(!prompt.contains("Documentation Context:"));
	}
}

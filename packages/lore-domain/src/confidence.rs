//! Answer-mode classification from retrieval scores.
//!
//! Scores arrive sorted best-first on the negated-BM25 scale (higher is
//! better). The classifier only looks at the score shape; it never inspects
//! the text.

use serde::{Deserialize, Serialize};

use lore_config::ConfidenceThresholds;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AnswerMode {
	#[serde(rename = "DOC-GROUNDED")]
	DocGrounded,
	#[serde(rename = "GENERAL")]
	General,
	#[serde(rename = "ABSTAIN")]
	Abstain,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
	High,
	Medium,
	/// Degraded marker: the answer path fell back after a generation failure.
	Low,
	General,
	Abstain,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Verdict {
	pub mode: AnswerMode,
	pub confidence: Confidence,
}

pub fn classify(scores: &[f32], thresholds: &ConfidenceThresholds) -> Verdict {
	let Some(&top) = scores.first() else {
		return Verdict { mode: AnswerMode::Abstain, confidence: Confidence::Abstain };
	};

	if top < thresholds.floor_score {
		return Verdict { mode: AnswerMode::Abstain, confidence: Confidence::Abstain };
	}
	if top < thresholds.min_score {
		return Verdict { mode: AnswerMode::General, confidence: Confidence::General };
	}

	// A hit corroborates only when it is both independently relevant and
	// close enough to the top score.
	let corroborating = scores
		.iter()
		.filter(|&&score| score >= thresholds.min_score && score >= thresholds.agreement_ratio * top)
		.count();

	let confidence = if corroborating >= 2 { Confidence::High } else { Confidence::Medium };

	Verdict { mode: AnswerMode::DocGrounded, confidence }
}

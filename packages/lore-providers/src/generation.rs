//! Client for an Ollama-style local generation endpoint.
//!
//! The endpoint takes a single composed prompt and returns the full
//! completion in one response body; streaming is disabled.

use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationResponse {
	pub text: String,
	/// 1-based ordinals of the prompt sources the model reports using.
	pub used: Option<Vec<usize>>,
}

pub async fn generate(
	cfg: &lore_config::GenerationProviderConfig,
	prompt: &str,
) -> Result<GenerationResponse> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.base_url, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"prompt": prompt,
		"stream": false,
		"options": {
			"temperature": cfg.temperature,
			"num_predict": cfg.max_tokens,
		},
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref())?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_generation_response(json)
}

fn parse_generation_response(json: Value) -> Result<GenerationResponse> {
	if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
		return Err(Error::InvalidResponse {
			message: format!("Generation endpoint returned an error: {error}."),
		});
	}

	let text = json.get("response").and_then(|v| v.as_str()).ok_or_else(|| {
		Error::InvalidResponse { message: "Generation response is missing response text.".into() }
	})?;
	let used = json.get("used").and_then(|v| v.as_array()).map(|values| {
		values.iter().filter_map(|v| v.as_u64()).map(|v| v as usize).collect::<Vec<_>>()
	});

	Ok(GenerationResponse { text: clean_response(text), used })
}

static THINK_TAGS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
	[
		Regex::new(r"(?is)<think>.*?</think>").unwrap(),
		Regex::new(r"(?is)<thinking>.*?</thinking>").unwrap(),
		Regex::new(r"(?is)\[thinking\].*?\[/thinking\]").unwrap(),
	]
});
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip leaked reasoning tags and collapse the whitespace they leave behind.
pub fn clean_response(text: &str) -> String {
	let mut cleaned = text.to_string();

	for pattern in THINK_TAGS.iter() {
		cleaned = pattern.replace_all(&cleaned, "").into_owned();
	}

	EXCESS_NEWLINES.replace_all(&cleaned, "\n\n").trim().to_string()
}

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, ConfidenceThresholds, GenerationProviderConfig, Paths, Redaction, Search,
	Service, Session, Sqlite, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.path.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.sqlite.path must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.max_tokens == 0 {
		return Err(Error::Validation {
			message: "chunking.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.search.candidate_k == 0 {
		return Err(Error::Validation {
			message: "search.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.top_n == 0 {
		return Err(Error::Validation {
			message: "search.top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.search.top_n > cfg.search.candidate_k {
		return Err(Error::Validation {
			message: "search.top_n must not exceed search.candidate_k.".to_string(),
		});
	}
	if !cfg.confidence.min_score.is_finite() || cfg.confidence.min_score < 0.0 {
		return Err(Error::Validation {
			message: "confidence.min_score must be a finite number, zero or greater.".to_string(),
		});
	}
	if !cfg.confidence.floor_score.is_finite() || cfg.confidence.floor_score < 0.0 {
		return Err(Error::Validation {
			message: "confidence.floor_score must be a finite number, zero or greater.".to_string(),
		});
	}
	if cfg.confidence.floor_score > cfg.confidence.min_score {
		return Err(Error::Validation {
			message: "confidence.floor_score must not exceed confidence.min_score.".to_string(),
		});
	}
	if !cfg.confidence.agreement_ratio.is_finite()
		|| !(0.0..=1.0).contains(&cfg.confidence.agreement_ratio)
	{
		return Err(Error::Validation {
			message: "confidence.agreement_ratio must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.session.idle_timeout_secs == 0 {
		return Err(Error::Validation {
			message: "session.idle_timeout_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.session.sweep_interval_secs == 0 {
		return Err(Error::Validation {
			message: "session.sweep_interval_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.session.max_messages == 0 {
		return Err(Error::Validation {
			message: "session.max_messages must be greater than zero.".to_string(),
		});
	}
	if cfg.generation.base_url.trim().is_empty() {
		return Err(Error::Validation {
			message: "generation.base_url must be non-empty.".to_string(),
		});
	}
	if cfg.generation.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "generation.model must be non-empty.".to_string(),
		});
	}
	if cfg.generation.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "generation.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !cfg.generation.temperature.is_finite() || cfg.generation.temperature < 0.0 {
		return Err(Error::Validation {
			message: "generation.temperature must be a finite number, zero or greater.".to_string(),
		});
	}

	for pattern in &cfg.redaction.patterns {
		if pattern.trim().is_empty() {
			return Err(Error::Validation {
				message: "redaction.patterns must not contain empty patterns.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.generation.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.generation.api_key = None;
	}
	if let Some(stripped) = cfg.generation.base_url.strip_suffix('/') {
		cfg.generation.base_url = stripped.to_string();
	}
}

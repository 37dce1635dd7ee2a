//! Sensitive-data scrubbing applied to chunk text at ingest and to answers
//! before they leave the service.

use regex::Regex;

pub const REDACTED: &str = "[REDACTED]";

/// Built-in patterns: contact data, network addresses, cloud and chat
/// credentials, private key blocks, card-shaped digit runs.
const SENSITIVE_PATTERNS: &[&str] = &[
	r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
	r"\b(?:\+?\d{1,3}[\s-]?)?(?:\(?\d{2,4}\)?[\s-]?)?\d{3,4}[\s-]?\d{4}\b",
	r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
	r"\b([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b",
	r"\b(?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}\b",
	r"AKIA[0-9A-Z]{16}",
	r"ASIA[0-9A-Z]{16}",
	r"(?i)aws_secret_access_key\s*=\s*[A-Za-z0-9/+=]{40}",
	r"xox[baprs]-[A-Za-z0-9-]{10,48}",
	r"https://hooks\.slack\.com/services/[A-Za-z0-9/_-]+",
	r"(?i)(?:api[_-]?key|secret|password|token|bearer|jwt)[^\n]{0,50}",
	r"-----BEGIN (?:RSA|DSA|EC|OPENSSH) PRIVATE KEY-----[\s\S]+?-----END .* PRIVATE KEY-----",
	r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
];

pub struct Redactor {
	patterns: Vec<Regex>,
}
impl Redactor {
	/// Compile the built-in set plus any user-supplied extras. An invalid
	/// extra pattern fails construction rather than being skipped silently.
	pub fn new(extra_patterns: &[String]) -> Result<Self, regex::Error> {
		let mut patterns = Vec::with_capacity(SENSITIVE_PATTERNS.len() + extra_patterns.len());

		for pattern in SENSITIVE_PATTERNS {
			patterns.push(Regex::new(pattern)?);
		}
		for pattern in extra_patterns {
			patterns.push(Regex::new(pattern)?);
		}

		Ok(Self { patterns })
	}

	pub fn scrub(&self, text: &str) -> String {
		let mut scrubbed = text.to_string();

		for pattern in &self.patterns {
			scrubbed = pattern.replace_all(&scrubbed, REDACTED).into_owned();
		}

		scrubbed
	}
}

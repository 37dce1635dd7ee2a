//! Structure-aware text chunking.
//!
//! Markdown-like documents are cut along their heading hierarchy so every
//! chunk carries a `section_path` naming the headings above it. Paragraphs
//! within a section are packed together up to the token budget; a single
//! paragraph over budget is split at sentence boundaries, and a single
//! sentence over budget between words.

use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_tokens: u32,
	pub prefer_structure: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
	pub section_path: Option<String>,
	pub text: String,
	pub token_count: i64,
}

/// Word count on unicode word boundaries. This is the budget unit for
/// `ChunkingConfig::max_tokens` and what gets persisted per chunk.
pub fn token_count(text: &str) -> usize {
	text.unicode_words().count()
}

pub fn split_document(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	if cfg.prefer_structure {
		split_structured(text, cfg)
	} else {
		split_flat(text, cfg)
	}
}

fn split_structured(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let mut chunks = Vec::new();
	// Heading titles above the current line, one slot per ATX level.
	let mut heading_stack: Vec<(usize, String)> = Vec::new();
	let mut builder = SectionBuilder::new(cfg.max_tokens);
	let mut paragraph = String::new();

	for line in text.lines() {
		if let Some((level, title)) = parse_heading(line) {
			builder.take_paragraph(&mut paragraph, &mut chunks);
			builder.flush(&mut chunks);
			heading_stack.retain(|(l, _)| *l < level);
			heading_stack.push((level, title));
			builder.section_path = section_path(&heading_stack);

			continue;
		}
		if line.trim().is_empty() {
			builder.take_paragraph(&mut paragraph, &mut chunks);

			continue;
		}
		if !paragraph.is_empty() {
			paragraph.push('\n');
		}

		paragraph.push_str(line);
	}

	builder.take_paragraph(&mut paragraph, &mut chunks);
	builder.flush(&mut chunks);

	chunks
}

fn split_flat(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let mut chunks = Vec::new();
	let mut builder = SectionBuilder::new(cfg.max_tokens);

	for block in text.split("\n\n").map(str::trim).filter(|block| !block.is_empty()) {
		builder.push_paragraph(block, &mut chunks);
	}

	builder.flush(&mut chunks);

	chunks
}

struct SectionBuilder {
	max_tokens: u32,
	section_path: Option<String>,
	current: String,
	current_tokens: usize,
}
impl SectionBuilder {
	fn new(max_tokens: u32) -> Self {
		Self { max_tokens, section_path: None, current: String::new(), current_tokens: 0 }
	}

	fn take_paragraph(&mut self, paragraph: &mut String, chunks: &mut Vec<Chunk>) {
		if paragraph.is_empty() {
			return;
		}

		let text = std::mem::take(paragraph);

		self.push_paragraph(&text, chunks);
	}

	fn push_paragraph(&mut self, paragraph: &str, chunks: &mut Vec<Chunk>) {
		let tokens = token_count(paragraph);

		if tokens > self.max_tokens as usize {
			self.flush(chunks);
			self.split_oversize(paragraph, chunks);

			return;
		}
		if self.current_tokens + tokens > self.max_tokens as usize {
			self.flush(chunks);
		}
		if !self.current.is_empty() {
			self.current.push_str("\n\n");
		}

		self.current.push_str(paragraph);

		self.current_tokens += tokens;
	}

	fn split_oversize(&mut self, paragraph: &str, chunks: &mut Vec<Chunk>) {
		for (_, sentence) in paragraph.split_sentence_bound_indices() {
			let tokens = token_count(sentence);

			if tokens > self.max_tokens as usize {
				self.split_words(sentence, chunks);

				continue;
			}
			if self.current_tokens + tokens > self.max_tokens as usize {
				self.flush(chunks);
			}

			self.current.push_str(sentence);

			self.current_tokens += tokens;
		}

		self.flush(chunks);
	}

	// Last resort for a single sentence over budget: break between words.
	fn split_words(&mut self, sentence: &str, chunks: &mut Vec<Chunk>) {
		for (_, word) in sentence.split_word_bound_indices() {
			let tokens = token_count(word);

			if self.current_tokens + tokens > self.max_tokens as usize {
				self.flush(chunks);
			}

			self.current.push_str(word);

			self.current_tokens += tokens;
		}
	}

	fn flush(&mut self, chunks: &mut Vec<Chunk>) {
		let text = self.current.trim();

		if !text.is_empty() {
			chunks.push(Chunk {
				section_path: self.section_path.clone(),
				text: text.to_string(),
				token_count: token_count(text) as i64,
			});
		}

		self.current.clear();

		self.current_tokens = 0;
	}
}

fn parse_heading(line: &str) -> Option<(usize, String)> {
	let line = line.trim_start();
	let level = line.bytes().take_while(|b| *b == b'#').count();

	if level == 0 || level > 6 {
		return None;
	}
	// ATX headings need a space after the marker; "#hashtag" is prose.
	if !line[level..].starts_with(' ') {
		return None;
	}

	let title = line[level..].trim();

	if title.is_empty() {
		return None;
	}

	Some((level, title.trim_end_matches('#').trim().to_string()))
}

fn section_path(stack: &[(usize, String)]) -> Option<String> {
	if stack.is_empty() {
		return None;
	}

	Some(stack.iter().map(|(_, title)| title.as_str()).collect::<Vec<_>>().join(" > "))
}

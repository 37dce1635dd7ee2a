//! Corpus walker: recurses through the corpus root, extracts plain text per
//! file type, and feeds each file through the ingestion operation. One bad
//! file never aborts the run.

use std::{fs, path::Path};

use color_eyre::eyre;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use lore_service::{IngestRequest, LoreService};

#[derive(Debug, Default)]
pub struct WalkSummary {
	pub ingested: u64,
	pub unchanged: u64,
	pub skipped: u64,
	pub failed: u64,
}

pub async fn walk_corpus(service: &LoreService, root: &Path) -> color_eyre::Result<WalkSummary> {
	if !root.is_dir() {
		return Err(eyre::eyre!("Corpus root {} is not a directory.", root.display()));
	}

	let mut summary = WalkSummary::default();
	let mut files = Vec::new();

	collect_files(root, &mut files)?;
	files.sort();

	for path in files {
		let relpath = match path.strip_prefix(root) {
			Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
			Err(_) => continue,
		};
		let Some(file_type) = detect_file_type(&path) else {
			tracing::debug!(relpath, "Unknown file type; skipping.");

			summary.skipped += 1;

			continue;
		};

		match ingest_file(service, &path, &relpath, file_type).await {
			Ok(true) => summary.ingested += 1,
			Ok(false) => summary.unchanged += 1,
			Err(err) => {
				tracing::warn!(relpath, error = %err, "Failed to ingest file; continuing.");

				summary.failed += 1;
			},
		}
	}

	Ok(summary)
}

async fn ingest_file(
	service: &LoreService,
	path: &Path,
	relpath: &str,
	file_type: &'static str,
) -> color_eyre::Result<bool> {
	let raw = fs::read_to_string(path)?;
	let text = if file_type == "html" { strip_html(&raw) } else { raw };
	let response = service
		.ingest(IngestRequest {
			relpath: relpath.to_string(),
			title: title_of(&text, relpath),
			space_key: space_key_of(relpath),
			file_type: file_type.to_string(),
			updated_at: mtime_rfc3339(path),
			text,
		})
		.await?;

	Ok(response.changed)
}

fn collect_files(dir: &Path, files: &mut Vec<std::path::PathBuf>) -> color_eyre::Result<()> {
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_dir() {
			collect_files(&path, files)?;
		} else {
			files.push(path);
		}
	}

	Ok(())
}

fn detect_file_type(path: &Path) -> Option<&'static str> {
	let ext = path.extension()?.to_str()?.to_lowercase();

	match ext.as_str() {
		"md" | "markdown" => Some("md"),
		"txt" => Some("txt"),
		"html" | "htm" | "xhtml" => Some("html"),
		_ => None,
	}
}

/// First markdown heading, else the file stem.
fn title_of(text: &str, relpath: &str) -> Option<String> {
	for line in text.lines() {
		let trimmed = line.trim_start();

		if let Some(title) = trimmed.strip_prefix('#') {
			let title = title.trim_start_matches('#').trim();

			if !title.is_empty() {
				return Some(title.to_string());
			}
		}
	}

	Path::new(relpath).file_stem().map(|stem| stem.to_string_lossy().to_string())
}

/// Top-level directory of the relative path, when there is one.
fn space_key_of(relpath: &str) -> Option<String> {
	let (first, rest) = relpath.split_once('/')?;

	if rest.is_empty() { None } else { Some(first.to_string()) }
}

fn mtime_rfc3339(path: &Path) -> Option<String> {
	let modified = fs::metadata(path).ok()?.modified().ok()?;

	OffsetDateTime::from(modified).format(&Rfc3339).ok()
}

/// Minimal tag strip for wiki exports: drops script/style bodies, removes
/// tags, decodes the common entities. Real scraping stays out of scope.
fn strip_html(html: &str) -> String {
	let mut out = String::with_capacity(html.len());
	let mut chars = html.char_indices().peekable();

	while let Some((i, c)) = chars.next() {
		if c != '<' {
			out.push(c);

			continue;
		}

		let rest = &html[i..];
		let skip_until = if starts_ci(rest, "<script") {
			Some("</script>")
		} else if starts_ci(rest, "<style") {
			Some("</style>")
		} else {
			None
		};

		if let Some(close) = skip_until {
			if let Some(end) = find_ci(rest, close) {
				let stop = i + end + close.len();

				while let Some(&(j, _)) = chars.peek() {
					if j >= stop {
						break;
					}

					chars.next();
				}

				continue;
			}
		}

		// Plain tag: consume through the closing '>'.
		for (_, t) in chars.by_ref() {
			if t == '>' {
				break;
			}
		}

		// Block-ish boundaries keep paragraphs apart.
		if starts_ci(rest, "</p") || starts_ci(rest, "<br") || starts_ci(rest, "</h") || starts_ci(rest, "</div") {
			out.push('\n');
		}
	}

	decode_entities(&out)
}

fn starts_ci(haystack: &str, prefix: &str) -> bool {
	haystack
		.as_bytes()
		.get(..prefix.len())
		.is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return None;
	}

	haystack
		.as_bytes()
		.windows(needle.len())
		.position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

fn decode_entities(text: &str) -> String {
	// `&amp;` goes last so `&amp;lt;` decodes once, to the literal `&lt;`.
	text.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&nbsp;", " ")
		.replace("&amp;", "&")
}

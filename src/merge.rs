//! Selective line-level merge of an AI-proposed fix into an existing document.
//!
//! An AI-proposed rewrite is untrustworthy wholesale, so the merge is
//! line-granular: only lines whose key also appears in the proposal are
//! replaced, first occurrence only, and keys the original never mentions are
//! discarded rather than appended. The merge can correct existing lines but
//! never introduces unreviewed new ones.
//!
//! ## Key extraction
//!
//! A key line holds a named setting: `key = value` or `key: value`. The key is
//! the trimmed text before the first recognized separator, with `=` preferred
//! when a line contains both (a mapping value may itself contain `=`).
//! Blank lines, comment lines (`#`, `//`) and lines with no separator are
//! opaque and copy through byte-identical.
//!
//! The merge is total over any text input: no structural mismatch raises an
//! error, the result is always a best-effort document.

use std::collections::HashMap;

/// Extract the key from a line, if it is a key line.
///
/// Returns `None` for blank lines, comments, and lines without a recognized
/// separator.
fn extract_key(line: &str) -> Option<&str> {
	let trimmed = line.trim();
	if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
		return None;
	}
	let sep = match (trimmed.find('='), trimmed.find(':')) {
		(Some(eq), _) => eq,
		(None, Some(colon)) => colon,
		(None, None) => return None,
	};
	let key = trimmed[..sep].trim_end();
	if key.is_empty() { None } else { Some(key) }
}

/// Keyed view of a proposal, consumed during the merge pass.
///
/// Built once per merge with the same key-extraction rule as the original
/// walk. Each key is removed on first use, so a proposal line can replace at
/// most one original line.
#[derive(Debug)]
pub struct ProposalMap {
	entries: HashMap<String, String>,
}

impl ProposalMap {
	/// Scan proposal text into a key → replacement-line map.
	///
	/// The replacement is the full trimmed line. If the proposal repeats a
	/// key, the first occurrence wins.
	pub fn parse(proposal: &str) -> Self {
		let mut entries: HashMap<String, String> = HashMap::new();
		for line in proposal.lines() {
			if let Some(key) = extract_key(line) {
				entries.entry(key.to_string()).or_insert_with(|| line.trim().to_string());
			}
		}
		Self { entries }
	}

	/// Remove and return the replacement for `key`, if any.
	fn take(&mut self, key: &str) -> Option<String> {
		self.entries.remove(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Graft `proposal` into `original`, replacing only the first occurrence of
/// each key the proposal mentions.
///
/// Untouched lines are copied byte-identical, terminators included. Proposal
/// keys with no match in the original are discarded. Returns the merged
/// document; never fails.
pub fn selective_merge(original: &str, proposal: &str) -> String {
	let mut map = ProposalMap::parse(proposal);
	let mut out = String::with_capacity(original.len());

	for raw in original.split_inclusive('\n') {
		let terminator = line_terminator(raw);
		let body = &raw[..raw.len() - terminator.len()];

		match extract_key(body).and_then(|key| map.take(key)) {
			Some(replacement) => {
				out.push_str(&replacement);
				out.push_str(terminator);
			}
			None => out.push_str(raw),
		}
	}

	if !map.is_empty() {
		tracing::debug!(unmatched = map.len(), "discarding proposal keys with no match in the original");
	}

	out
}

/// The terminator of a `split_inclusive('\n')` chunk: `"\r\n"`, `"\n"`, or
/// `""` for an unterminated final line.
fn line_terminator(raw: &str) -> &'static str {
	if raw.ends_with("\r\n") {
		"\r\n"
	} else if raw.ends_with('\n') {
		"\n"
	} else {
		""
	}
}

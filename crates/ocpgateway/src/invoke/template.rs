// URL templating for service calls

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

use super::path::stringify;
use crate::error::{Error, Result};

/// RFC 3986 unreserved characters are left alone
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'.')
	.remove(b'_')
	.remove(b'~');

/// Percent-encode one URL path segment
pub fn encode_segment(value: &str) -> String {
	utf8_percent_encode(value, PATH_VALUE).to_string()
}

/// Substitute `{name}` and `:name` placeholders with percent-encoded path inputs.
///
/// `:name` only matches when not followed by another identifier character, so
/// `:id` does not match inside `:identifier`, and never before the path starts.
/// Placeholders without a matching input, inputs without a placeholder and
/// inputs whose name is not an identifier are left as they are.
pub fn substitute_path(url: &str, inputs: &Map<String, Value>) -> String {
	let (origin, path) = url.split_at(path_start(url));
	let mut origin = origin.to_string();
	let mut path = path.to_string();
	for (name, value) in inputs.iter().filter(|(name, _)| is_identifier(name)) {
		let encoded = encode_segment(&stringify(value));
		let braced = format!("{{{name}}}");
		origin = origin.replace(&braced, &encoded);
		path = replace_colon(&path.replace(&braced, &encoded), name, &encoded);
	}
	origin + &path
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	chars
		.next()
		.is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Byte offset where the path begins, past any `scheme://authority`
fn path_start(url: &str) -> usize {
	match url.find("://") {
		Some(i) => url[i + 3..].find('/').map_or(url.len(), |j| i + 3 + j),
		None => 0,
	}
}

fn replace_colon(path: &str, name: &str, value: &str) -> String {
	let needle = format!(":{name}");
	let mut out = String::with_capacity(path.len());
	let mut copied = 0;
	let mut from = 0;
	while let Some(found) = path[from..].find(&needle) {
		let pos = from + found;
		let end = pos + needle.len();
		from = end;
		let boundary = path[end..]
			.chars()
			.next()
			.is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
		if boundary {
			out.push_str(&path[copied..pos]);
			out.push_str(value);
			copied = end;
		}
	}
	out.push_str(&path[copied..]);
	out
}

/// Append query inputs, choosing `?` or `&` depending on the URL.
///
/// Array values repeat the key; nested objects are sent as compact JSON.
pub fn append_query(url: &str, inputs: &Map<String, Value>) -> Result<String> {
	if inputs.is_empty() {
		return Ok(url.to_string());
	}
	let mut pairs: Vec<(&str, String)> = Vec::with_capacity(inputs.len());
	for (key, value) in inputs {
		match value {
			Value::Array(items) => pairs.extend(items.iter().map(|v| (key.as_str(), stringify(v)))),
			Value::Null => pairs.push((key.as_str(), String::new())),
			other => pairs.push((key.as_str(), stringify(other))),
		}
	}
	let query = serde_urlencoded::to_string(&pairs)
		.map_err(|e| Error::BadRequest(format!("invalid query inputs: {e}")))?;
	let separator = if url.contains('?') { '&' } else { '?' };
	Ok(format!("{url}{separator}{query}"))
}

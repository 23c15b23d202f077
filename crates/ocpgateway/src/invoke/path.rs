// Response path expressions
//
// Two syntaxes are accepted:
// - `$`-prefixed JSONPath, e.g. `$.data.token` or `$.items[0].id`
// - legacy dotted keys with an optional single index per segment, e.g. `a.b[0].c`
//
// Resolution never fails: a missing key, an out-of-range index or an
// unparseable expression all yield `None`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use serde_json_path::JsonPath;

/// A JSONPath token embedded in a template such as `Bearer $.access_token`
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\$[A-Za-z0-9_.\[\]*\-]*").expect("valid token regex")
});

/// Resolve a single expression against a JSON document.
pub fn resolve<'a>(value: &'a Value, expr: &str) -> Option<&'a Value> {
	let expr = expr.trim();
	if expr.starts_with('$') {
		let path = JsonPath::parse(expr).ok()?;
		return path.query(value).first();
	}
	resolve_legacy(value, expr)
}

fn resolve_legacy<'a>(value: &'a Value, expr: &str) -> Option<&'a Value> {
	if expr.is_empty() {
		return None;
	}
	let mut current = value;
	for segment in expr.split('.') {
		let (key, index) = split_index(segment)?;
		if !key.is_empty() {
			current = match current {
				Value::Object(obj) => obj.get(key)?,
				Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
				_ => return None,
			};
		}
		if let Some(i) = index {
			current = current.as_array()?.get(i)?;
		}
	}
	Some(current)
}

/// `name[3]` -> ("name", Some(3)); `name` -> ("name", None)
fn split_index(segment: &str) -> Option<(&str, Option<usize>)> {
	let Some(open) = segment.find('[') else {
		return (!segment.is_empty()).then_some((segment, None));
	};
	let inner = segment[open + 1..].strip_suffix(']')?;
	let index = inner.trim().parse::<usize>().ok()?;
	Some((&segment[..open], Some(index)))
}

/// Extract a value for a response-map template.
///
/// A template that is exactly one expression yields the referenced value
/// as-is. A template mixing text and expressions yields a string, and only
/// when every expression resolves to a non-null value.
pub fn extract(template: &str, body: &Value) -> Option<Value> {
	let trimmed = template.trim();
	if !trimmed.contains('$') {
		return resolve_legacy(body, trimmed).cloned();
	}
	if TOKEN.find(trimmed).is_some_and(|m| m.as_str() == trimmed) {
		return resolve(body, trimmed).cloned();
	}
	let mut complete = true;
	let rendered = TOKEN.replace_all(template, |caps: &regex::Captures| {
		match resolve(body, &caps[0]).filter(|v| !v.is_null()) {
			Some(v) => stringify(v),
			None => {
				complete = false;
				String::new()
			},
		}
	});
	complete.then(|| Value::String(rendered.into_owned()))
}

/// Render a template into a header value.
///
/// Expressions that do not resolve (or resolve to null) are left in place as
/// literal text.
pub fn render(template: &str, body: &Value) -> String {
	if !template.contains('$') {
		return match resolve_legacy(body, template.trim()).filter(|v| !v.is_null()) {
			Some(v) => stringify(v),
			None => template.to_string(),
		};
	}
	TOKEN
		.replace_all(template, |caps: &regex::Captures| {
			match resolve(body, &caps[0]).filter(|v| !v.is_null()) {
				Some(v) => stringify(v),
				None => caps[0].to_string(),
			}
		})
		.into_owned()
}

/// Strings render without quotes, everything else as compact JSON
pub fn stringify(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

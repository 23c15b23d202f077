// Protocol normalization into OCP documents

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::types::{
	CatalogSource, DEFAULT_OCP_VERSION, OCP_PROTOCOL, OcpDocument, OcpMetadata, OcpStructure,
	OcpTool, SourceType, empty_object,
};

/// A fetched catalog body, tagged with the protocol it is described in
#[derive(Debug, Clone, PartialEq)]
pub enum RawCatalog {
	Mcp(Value),
	LangServe(Value),
	/// The already unwrapped `data` payload of an OCP-M response
	OcpM(Value),
}

type NormalizeFn = fn(&Value, &str, &BTreeMap<String, String>, &str) -> Result<OcpDocument>;

/// Supported (source type, OCP version) pairs
const NORMALIZERS: &[(SourceType, &str, NormalizeFn)] = &[
	(SourceType::Mcp, DEFAULT_OCP_VERSION, normalize_mcp),
	(SourceType::LangServe, DEFAULT_OCP_VERSION, normalize_langserve),
	(SourceType::OcpM, DEFAULT_OCP_VERSION, normalize_ocpm),
];

impl RawCatalog {
	pub fn source_type(&self) -> SourceType {
		match self {
			RawCatalog::Mcp(_) => SourceType::Mcp,
			RawCatalog::LangServe(_) => SourceType::LangServe,
			RawCatalog::OcpM(_) => SourceType::OcpM,
		}
	}

	fn body(&self) -> &Value {
		match self {
			RawCatalog::Mcp(v) | RawCatalog::LangServe(v) | RawCatalog::OcpM(v) => v,
		}
	}

	/// Convert into an OCP document of the requested version.
	///
	/// `url` is the catalog URL as registered, before any `/tools` suffix was
	/// appended by the fetcher.
	pub fn normalize(
		&self,
		url: &str,
		headers: &BTreeMap<String, String>,
		version: Option<&str>,
	) -> Result<OcpDocument> {
		let version = version.unwrap_or(DEFAULT_OCP_VERSION);
		let normalize = normalizer(self.source_type(), version)?;
		normalize(self.body(), url, headers, version)
	}
}

/// Fail unless a normalizer exists for the source type and version
pub fn check_version(source_type: SourceType, version: Option<&str>) -> Result<()> {
	normalizer(source_type, version.unwrap_or(DEFAULT_OCP_VERSION)).map(|_| ())
}

fn normalizer(source_type: SourceType, version: &str) -> Result<NormalizeFn> {
	NORMALIZERS
		.iter()
		.find(|(t, v, _)| *t == source_type && *v == version)
		.map(|(_, _, f)| *f)
		.ok_or_else(|| Error::UnsupportedVersion {
			source_type,
			version: version.to_string(),
		})
}

fn normalize_mcp(
	raw: &Value,
	url: &str,
	headers: &BTreeMap<String, String>,
	version: &str,
) -> Result<OcpDocument> {
	let tools = tool_entries(raw)
		.iter()
		.map(|entry| convert_tool(entry, false))
		.collect::<Result<Vec<_>>>()?;
	document(SourceType::Mcp, raw, strip_tools_suffix(url), headers, version, tools)
}

fn normalize_ocpm(
	raw: &Value,
	url: &str,
	headers: &BTreeMap<String, String>,
	version: &str,
) -> Result<OcpDocument> {
	let tools = tool_entries(raw)
		.iter()
		.map(|entry| convert_tool(entry, false))
		.collect::<Result<Vec<_>>>()?;
	document(SourceType::OcpM, raw, strip_tools_suffix(url), headers, version, tools)
}

fn normalize_langserve(
	raw: &Value,
	url: &str,
	headers: &BTreeMap<String, String>,
	version: &str,
) -> Result<OcpDocument> {
	let tools = tool_entries(raw)
		.iter()
		.map(|entry| convert_tool(entry, true))
		.collect::<Result<Vec<_>>>()?;
	document(SourceType::LangServe, raw, url.to_string(), headers, version, tools)
}

fn document(
	source_type: SourceType,
	raw: &Value,
	url: String,
	headers: &BTreeMap<String, String>,
	version: &str,
	tools: Vec<OcpTool>,
) -> Result<OcpDocument> {
	let mut seen = HashSet::new();
	for tool in &tools {
		if !seen.insert(tool.name.as_str()) {
			return Err(Error::DuplicateToolName(tool.name.clone()));
		}
	}

	let description = raw
		.pointer("/metadata/description")
		.or_else(|| raw.get("description"))
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_string();

	Ok(OcpDocument {
		metadata: OcpMetadata {
			protocol: OCP_PROTOCOL.to_string(),
			version: version.to_string(),
			source: CatalogSource {
				id: raw.get("id").and_then(scalar_string),
				source_type,
				url,
				headers: headers.clone(),
			},
		},
		structure: OcpStructure {
			description,
			input_schema: non_empty(raw.get("input_schema")).unwrap_or_else(empty_object),
			output_schema: non_empty(raw.get("output_schema")).unwrap_or_else(empty_object),
			tools,
		},
	})
}

/// Tool entries of a raw body. A top-level array is the tool list itself.
fn tool_entries(raw: &Value) -> &[Value] {
	match raw {
		Value::Array(items) => items,
		Value::Object(obj) => obj
			.get("tools")
			.and_then(Value::as_array)
			.map(Vec::as_slice)
			.unwrap_or_default(),
		_ => &[],
	}
}

fn convert_tool(entry: &Value, always_synthesize: bool) -> Result<OcpTool> {
	let name = entry
		.get("name")
		.and_then(Value::as_str)
		.map(str::trim)
		.unwrap_or_default();
	if name.is_empty() {
		return Err(Error::BadRequest("tool name must not be empty".to_string()));
	}

	let declared = if always_synthesize {
		None
	} else {
		non_empty(entry.get("input_schema")).or_else(|| non_empty(entry.get("inputSchema")))
	};
	let input_schema = declared.unwrap_or_else(|| synthesize_schema(entry.get("args")));

	Ok(OcpTool {
		name: name.to_string(),
		description: entry
			.get("description")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string(),
		input_schema,
		service_id: None,
	})
}

/// `{type: object, properties: args, required: [arg names]}`
fn synthesize_schema(args: Option<&Value>) -> Value {
	let properties = args
		.and_then(Value::as_object)
		.cloned()
		.unwrap_or_else(Map::new);
	let required: Vec<&String> = properties.keys().collect();
	json!({
		"type": "object",
		"properties": properties,
		"required": required,
	})
}

fn non_empty(value: Option<&Value>) -> Option<Value> {
	match value? {
		Value::Null => None,
		Value::Object(obj) if obj.is_empty() => None,
		v => Some(v.clone()),
	}
}

fn scalar_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

pub(crate) fn strip_tools_suffix(url: &str) -> String {
	let trimmed = url.trim_end_matches('/');
	trimmed
		.strip_suffix("/tools")
		.unwrap_or(trimmed)
		.to_string()
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;

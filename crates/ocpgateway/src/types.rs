// Configuration records and canonical catalog types
//
// - Catalog sources and the normalized OCP document
// - Authenticator and service definitions
// - Ephemeral execution inputs and results

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Placeholder written over secret values on read paths
pub const MASK: &str = "****";

pub const OCP_PROTOCOL: &str = "OCP";
pub const DEFAULT_OCP_VERSION: &str = "1.0.0";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Protocol an external catalog is described in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
	#[serde(rename = "mcp")]
	Mcp,
	#[serde(rename = "langserve")]
	LangServe,
	#[serde(rename = "ocp-m")]
	OcpM,
}

impl SourceType {
	pub fn as_str(&self) -> &'static str {
		match self {
			SourceType::Mcp => "mcp",
			SourceType::LangServe => "langserve",
			SourceType::OcpM => "ocp-m",
		}
	}
}

impl fmt::Display for SourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where and how to fetch an external tool catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
	/// Identifier the remote catalog reports for itself, if any
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(rename = "type")]
	pub source_type: SourceType,
	pub url: String,
	#[serde(default, deserialize_with = "null_as_default")]
	pub headers: BTreeMap<String, String>,
}

impl CatalogSource {
	pub fn new(source_type: SourceType, url: impl Into<String>) -> Self {
		Self {
			id: None,
			source_type,
			url: url.into(),
			headers: BTreeMap::new(),
		}
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	pub fn masked(&self) -> Self {
		Self {
			headers: mask_strings(&self.headers),
			..self.clone()
		}
	}
}

/// Canonical, versioned catalog description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcpDocument {
	pub metadata: OcpMetadata,
	pub structure: OcpStructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcpMetadata {
	pub protocol: String,
	pub version: String,
	pub source: CatalogSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcpStructure {
	#[serde(default)]
	pub description: String,
	#[serde(default = "empty_object")]
	pub input_schema: Value,
	#[serde(default = "empty_object")]
	pub output_schema: Value,
	#[serde(default)]
	pub tools: Vec<OcpTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcpTool {
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default = "empty_object")]
	pub input_schema: Value,
	/// Service definition that executes this tool
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub service_id: Option<String>,
}

impl OcpDocument {
	/// Exact-name tool lookup
	pub fn tool(&self, name: &str) -> Option<&OcpTool> {
		self.structure.tools.iter().find(|t| t.name == name)
	}

	pub fn tool_mut(&mut self, name: &str) -> Option<&mut OcpTool> {
		self.structure.tools.iter_mut().find(|t| t.name == name)
	}
}

/// A registered catalog as held by the config store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCatalog {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Owning tenant, used only to filter registry listings
	#[serde(default)]
	pub scope: String,
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default = "Utc::now")]
	pub created_at: DateTime<Utc>,
	pub document: OcpDocument,
}

impl StoredCatalog {
	pub fn masked(&self) -> Self {
		let mut catalog = self.clone();
		catalog.document.metadata.source = self.document.metadata.source.masked();
		catalog
	}

	/// Description shown in listings, falling back to the normalized one
	pub fn display_description(&self) -> &str {
		self
			.description
			.as_deref()
			.unwrap_or(&self.document.structure.description)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Delete,
	Patch,
}

impl HttpMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Delete => "DELETE",
			HttpMethod::Patch => "PATCH",
		}
	}
}

impl fmt::Display for HttpMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<HttpMethod> for reqwest::Method {
	fn from(method: HttpMethod) -> Self {
		match method {
			HttpMethod::Get => reqwest::Method::GET,
			HttpMethod::Post => reqwest::Method::POST,
			HttpMethod::Put => reqwest::Method::PUT,
			HttpMethod::Delete => reqwest::Method::DELETE,
			HttpMethod::Patch => reqwest::Method::PATCH,
		}
	}
}

/// A configured call whose purpose is obtaining credentials for another call.
///
/// `response_map` maps an outgoing header name to a template over the
/// authentication response, e.g. `"Authorization": "Bearer $.access_token"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatorDefinition {
	pub id: String,
	#[serde(default)]
	pub name: String,
	pub url: String,
	pub method: HttpMethod,
	#[serde(default, deserialize_with = "null_as_default")]
	pub headers: BTreeMap<String, String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub body: Map<String, Value>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub response_map: BTreeMap<String, String>,
	#[serde(default = "default_true")]
	pub enabled: bool,
}

impl AuthenticatorDefinition {
	/// Read view with header and body values replaced by [`MASK`]
	pub fn masked(&self) -> Self {
		Self {
			headers: mask_strings(&self.headers),
			body: self
				.body
				.keys()
				.map(|k| (k.clone(), Value::String(MASK.to_string())))
				.collect(),
			..self.clone()
		}
	}
}

/// A configured HTTP call representing one externally callable operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub url: String,
	pub method: HttpMethod,
	#[serde(default, deserialize_with = "deserialize_headers")]
	pub headers: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub body: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub authenticator_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub input_schema: Option<InputSchema>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub output_schema: Option<Value>,
	#[serde(default = "default_content_type")]
	pub content_type: String,
}

/// JSON-Schema-like description of a service's inputs.
///
/// Properties named `path`, `query` and `body` are sections holding their own
/// `properties`/`required`; any other property is a flat field looked up
/// across all sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSchema {
	#[serde(rename = "type", default = "object_type")]
	pub schema_type: String,
	#[serde(default)]
	pub properties: BTreeMap<String, PropertySchema>,
	#[serde(default)]
	pub required: Vec<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertySchema {
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub schema_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pattern: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub example: Option<Value>,
	#[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
	pub enumeration: Option<Vec<Value>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub format: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub properties: BTreeMap<String, PropertySchema>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub required: Vec<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl PropertySchema {
	pub fn string() -> Self {
		Self {
			schema_type: Some("string".to_string()),
			..Default::default()
		}
	}

	pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
		self.pattern = Some(pattern.into());
		self
	}
}

/// Caller supplied inputs for one execution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionInputs {
	#[serde(default, deserialize_with = "null_as_default")]
	pub path: Map<String, Value>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub query: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<Value>,
}

/// Result of a successful target call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
	pub success: bool,
	pub status_code: u16,
	pub response: Value,
}

/// Result of running an authenticator: extracted fields and the raw body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatorOutcome {
	pub status_code: u16,
	pub extracted: Map<String, Value>,
	pub raw: Value,
}

fn mask_strings(values: &BTreeMap<String, String>) -> BTreeMap<String, String> {
	values
		.keys()
		.map(|k| (k.clone(), MASK.to_string()))
		.collect()
}

fn default_true() -> bool {
	true
}

fn default_content_type() -> String {
	DEFAULT_CONTENT_TYPE.to_string()
}

fn object_type() -> String {
	"object".to_string()
}

pub(crate) fn empty_object() -> Value {
	Value::Object(Map::new())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct HeaderPair {
	name: String,
	value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeadersRepr {
	Map(BTreeMap<String, String>),
	List(Vec<HeaderPair>),
}

/// Accepts both a header map and the legacy list of `{name, value}` pairs
fn deserialize_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<HeadersRepr>::deserialize(deserializer)? {
		None => BTreeMap::new(),
		Some(HeadersRepr::Map(map)) => map,
		Some(HeadersRepr::List(list)) => list.into_iter().map(|h| (h.name, h.value)).collect(),
	})
}

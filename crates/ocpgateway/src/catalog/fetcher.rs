// Structure fetcher for remote tool catalogs

use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value;
use tracing::{info, warn};

use super::normalizer::RawCatalog;
use crate::client::{Purpose, UpstreamClient};
use crate::error::{Error, Result};
use crate::types::SourceType;

/// Retrieves raw catalogs over HTTP. Every failure is reported as
/// [`Error::BadStructure`] naming the cause.
#[derive(Debug, Clone)]
pub struct StructureFetcher {
	client: UpstreamClient,
}

impl StructureFetcher {
	pub fn new(client: UpstreamClient) -> Self {
		Self { client }
	}

	pub async fn fetch(
		&self,
		source_type: SourceType,
		url: &str,
		headers: &BTreeMap<String, String>,
	) -> Result<RawCatalog> {
		let target = match source_type {
			SourceType::Mcp | SourceType::OcpM => tools_url(url),
			SourceType::LangServe => url.to_string(),
		};
		info!(target: "catalog", source_type = %source_type, url = %target, "fetching catalog structure");

		let mut request = self.client.request(Method::GET, &target);
		for (name, value) in headers {
			request = request.header(name.as_str(), value.as_str());
		}
		let response = self
			.client
			.send(Purpose::Fetch, request)
			.await
			.map_err(|failure| {
				warn!(target: "catalog", url = %target, cause = %failure.cause(), "catalog fetch failed");
				Error::bad_structure(&target, failure.cause())
			})?;

		let body: Value = serde_json::from_str(&response.body)
			.map_err(|e| Error::bad_structure(&target, format!("malformed body: {e}")))?;

		match source_type {
			SourceType::Mcp if body.is_object() || body.is_array() => Ok(RawCatalog::Mcp(body)),
			SourceType::Mcp => Err(Error::bad_structure(
				&target,
				"malformed body: expected a JSON object or array",
			)),
			SourceType::LangServe if body.is_object() => Ok(RawCatalog::LangServe(body)),
			SourceType::LangServe => Err(Error::bad_structure(
				&target,
				"malformed body: expected a JSON object",
			)),
			SourceType::OcpM => match body {
				Value::Object(mut obj) => obj
					.remove("data")
					.filter(|data| !data.is_null())
					.map(RawCatalog::OcpM)
					.ok_or_else(|| Error::bad_structure(&target, "missing 'data' field")),
				_ => Err(Error::bad_structure(
					&target,
					"malformed body: expected a JSON object",
				)),
			},
		}
	}
}

/// Trailing slash trimmed, `/tools` appended once
pub fn tools_url(url: &str) -> String {
	let trimmed = url.trim_end_matches('/');
	if trimmed.ends_with("/tools") {
		trimmed.to_string()
	} else {
		format!("{trimmed}/tools")
	}
}

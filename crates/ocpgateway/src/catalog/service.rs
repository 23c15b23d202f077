// Catalog registration, update, deletion and composition

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::fetcher::StructureFetcher;
use super::normalizer::check_version;
use crate::error::{Error, Result};
use crate::registry::Links;
use crate::store::ConfigStore;
use crate::types::{
	CatalogSource, DEFAULT_OCP_VERSION, OCP_PROTOCOL, OcpDocument, OcpMetadata, OcpStructure,
	OcpTool, SourceType, StoredCatalog, empty_object,
};

/// Register or update a catalog from a remote source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCatalog {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub source: CatalogSource,
	/// Tool name to service id
	#[serde(default)]
	pub bindings: BTreeMap<String, String>,
	/// OCP version to normalize into, defaults to 1.0.0
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

/// Build a catalog out of existing service definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeCatalog {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub tools: Vec<ComposeTool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeTool {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub service_id: String,
}

pub struct CatalogService {
	store: Arc<dyn ConfigStore>,
	fetcher: StructureFetcher,
	links: Links,
}

impl CatalogService {
	pub fn new(store: Arc<dyn ConfigStore>, fetcher: StructureFetcher, links: Links) -> Self {
		Self {
			store,
			fetcher,
			links,
		}
	}

	pub async fn register(&self, scope: &str, request: RegisterCatalog) -> Result<StoredCatalog> {
		let document = self.build_document(&request).await?;
		let catalog = StoredCatalog {
			id: uuid::Uuid::new_v4().to_string(),
			name: request.name,
			description: request.description,
			scope: scope.to_string(),
			enabled: request.enabled,
			created_at: Utc::now(),
			document,
		};
		self.store.put_catalog(catalog.clone()).await?;
		info!(
			target: "catalog",
			catalog_id = %catalog.id,
			tools = catalog.document.structure.tools.len(),
			"catalog registered"
		);
		Ok(catalog.masked())
	}

	/// Re-fetch and re-normalize, keeping id, scope and creation time
	pub async fn update(&self, id: &str, request: RegisterCatalog) -> Result<StoredCatalog> {
		let existing = self
			.store
			.catalog(id)
			.await?
			.ok_or_else(|| Error::not_found("catalog", id))?;
		let document = self.build_document(&request).await?;
		let catalog = StoredCatalog {
			name: request.name,
			description: request.description,
			enabled: request.enabled,
			document,
			..existing
		};
		self.store.put_catalog(catalog.clone()).await?;
		info!(target: "catalog", catalog_id = %id, "catalog updated");
		Ok(catalog.masked())
	}

	pub async fn delete(&self, id: &str) -> Result<()> {
		if !self.store.delete_catalog(id).await? {
			return Err(Error::not_found("catalog", id));
		}
		info!(target: "catalog", catalog_id = %id, "catalog deleted");
		Ok(())
	}

	/// Catalog with source headers masked
	pub async fn get(&self, id: &str) -> Result<StoredCatalog> {
		self
			.store
			.catalog(id)
			.await?
			.map(|c| c.masked())
			.ok_or_else(|| Error::not_found("catalog", id))
	}

	pub async fn compose(&self, scope: &str, request: ComposeCatalog) -> Result<StoredCatalog> {
		let id = uuid::Uuid::new_v4().to_string();
		let mut seen = HashSet::new();
		let mut tools = Vec::with_capacity(request.tools.len());
		for tool in request.tools {
			let name = tool.name.trim();
			if name.is_empty() {
				return Err(Error::BadRequest("tool name must not be empty".to_string()));
			}
			if !seen.insert(name.to_string()) {
				return Err(Error::DuplicateToolName(name.to_string()));
			}
			let service = self
				.store
				.service(&tool.service_id)
				.await?
				.ok_or_else(|| Error::not_found("service", &tool.service_id))?;
			let input_schema = match &service.input_schema {
				Some(schema) => serde_json::to_value(schema)
					.map_err(|e| Error::Internal(format!("failed to encode input schema: {e}")))?,
				None => empty_object(),
			};
			tools.push(OcpTool {
				name: name.to_string(),
				description: tool
					.description
					.or_else(|| service.description.clone())
					.unwrap_or_default(),
				input_schema,
				service_id: Some(service.id),
			});
		}

		let description = request.description.clone().unwrap_or_default();
		let catalog = StoredCatalog {
			id: id.clone(),
			name: request.name,
			description: request.description,
			scope: scope.to_string(),
			enabled: request.enabled,
			created_at: Utc::now(),
			document: OcpDocument {
				metadata: OcpMetadata {
					protocol: OCP_PROTOCOL.to_string(),
					version: DEFAULT_OCP_VERSION.to_string(),
					source: CatalogSource {
						id: Some(id.clone()),
						..CatalogSource::new(SourceType::OcpM, self.links.catalog_url(&id))
					},
				},
				structure: OcpStructure {
					description,
					input_schema: empty_object(),
					output_schema: empty_object(),
					tools,
				},
			},
		};
		self.store.put_catalog(catalog.clone()).await?;
		info!(
			target: "catalog",
			catalog_id = %id,
			tools = catalog.document.structure.tools.len(),
			"catalog composed"
		);
		Ok(catalog)
	}

	async fn build_document(&self, request: &RegisterCatalog) -> Result<OcpDocument> {
		let source = &request.source;
		url::Url::parse(&source.url)
			.map_err(|e| Error::BadRequest(format!("invalid catalog url '{}': {e}", source.url)))?;
		check_version(source.source_type, request.version.as_deref())?;
		let raw = self
			.fetcher
			.fetch(source.source_type, &source.url, &source.headers)
			.await?;
		let mut document = raw.normalize(&source.url, &source.headers, request.version.as_deref())?;
		for (tool_name, service_id) in &request.bindings {
			if self.store.service(service_id).await?.is_none() {
				return Err(Error::not_found("service", service_id));
			}
			let tool = document.tool_mut(tool_name).ok_or_else(|| {
				Error::BusinessRule(format!(
					"binding refers to tool '{tool_name}' which the catalog does not define"
				))
			})?;
			tool.service_id = Some(service_id.clone());
		}
		Ok(document)
	}
}

fn default_true() -> bool {
	true
}

// Dynamic tool registry
//
// Read and execute facade over stored catalogs. Nothing here mutates a
// catalog; schema output joins each tool with its live service definition.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::invoke::ServiceInvoker;
use crate::invoke::template::encode_segment;
use crate::store::ConfigStore;
use crate::types::{ExecutionInputs, ExecutionResult, HttpMethod, StoredCatalog};

pub const SCHEMA_VERSION: &str = "1.0.0-ocpm";

/// Self links under the dynamic base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
	base: String,
}

impl Links {
	pub fn new(base: impl Into<String>) -> Self {
		Self {
			base: base.into().trim_end_matches('/').to_string(),
		}
	}

	pub fn base(&self) -> &str {
		&self.base
	}

	pub fn catalog_url(&self, id: &str) -> String {
		format!("{}/{id}", self.base)
	}

	pub fn schema_url(&self, id: &str) -> String {
		format!("{}/{id}/schema.json", self.base)
	}

	pub fn tools_url(&self, id: &str) -> String {
		format!("{}/{id}/tools", self.base)
	}

	/// Execute link of one tool, with the tool name percent-encoded
	pub fn execute_url(&self, id: &str, tool: &str) -> String {
		format!("{}/{id}/tools/{}/execute", self.base, encode_segment(tool))
	}

	/// Execute link with a literal `{tool_name}` placeholder
	pub fn execute_template(&self, id: &str) -> String {
		format!("{}/{id}/tools/{{tool_name}}/execute", self.base)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
	pub id: String,
	pub name: String,
	pub description: String,
	pub url: String,
	pub schema_url: String,
	pub tools_url: String,
	/// Template link, `{tool_name}` is left for the caller to fill
	pub execute_url: String,
	pub registered_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSchema {
	pub catalog_id: String,
	pub name: String,
	pub description: String,
	pub base_url: String,
	pub tools: Vec<ToolSchema>,
	pub metadata: SchemaMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
	pub name: String,
	pub description: String,
	pub method: HttpMethod,
	pub service_url: String,
	pub execute_url: String,
	pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
	pub generated_at: String,
	pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolList {
	pub id: String,
	pub name: String,
	pub description: String,
	pub tools: Vec<ToolSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSummary {
	pub name: String,
	pub description: String,
	pub args: Value,
}

pub struct DynamicRegistry {
	store: Arc<dyn ConfigStore>,
	invoker: Arc<ServiceInvoker>,
	links: Links,
}

impl DynamicRegistry {
	pub fn new(store: Arc<dyn ConfigStore>, invoker: Arc<ServiceInvoker>, links: Links) -> Self {
		Self {
			store,
			invoker,
			links,
		}
	}

	/// Enabled catalogs in the scope, sorted by name
	pub async fn registry(&self, scope: Option<&str>) -> Result<Vec<RegistryEntry>> {
		let mut catalogs: Vec<StoredCatalog> = self
			.store
			.catalogs(scope)
			.await?
			.into_iter()
			.filter(|c| c.enabled)
			.collect();
		catalogs.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
		debug!(target: "registry", scope = ?scope, catalogs = catalogs.len(), "listing registry");

		Ok(
			catalogs
				.iter()
				.map(|c| RegistryEntry {
					id: c.id.clone(),
					name: c.name.clone(),
					description: c.display_description().to_string(),
					url: self.links.catalog_url(&c.id),
					schema_url: self.links.schema_url(&c.id),
					tools_url: self.links.tools_url(&c.id),
					execute_url: self.links.execute_template(&c.id),
					registered_at: c.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
				})
				.collect(),
		)
	}

	/// Tools joined with their current service definitions. Tools whose
	/// service is unbound or missing are skipped.
	pub async fn schema(&self, catalog_id: &str) -> Result<CatalogSchema> {
		let catalog = self.catalog(catalog_id).await?;
		let mut tools = Vec::new();
		for tool in &catalog.document.structure.tools {
			let Some(service_id) = &tool.service_id else {
				continue;
			};
			let Some(service) = self.store.service(service_id).await? else {
				debug!(target: "registry", catalog_id, tool = %tool.name, service_id = %service_id, "skipping tool with missing service");
				continue;
			};
			let input_schema = match &service.input_schema {
				Some(schema) => serde_json::to_value(schema)
					.map_err(|e| Error::Internal(format!("failed to encode input schema: {e}")))?,
				None => tool.input_schema.clone(),
			};
			tools.push(ToolSchema {
				name: tool.name.clone(),
				description: tool.description.clone(),
				method: service.method,
				service_url: service.url.clone(),
				execute_url: self.links.execute_url(&catalog.id, &tool.name),
				input_schema,
			});
		}

		Ok(CatalogSchema {
			catalog_id: catalog.id.clone(),
			name: catalog.name.clone(),
			description: catalog.display_description().to_string(),
			base_url: self.links.catalog_url(&catalog.id),
			tools,
			metadata: SchemaMetadata {
				generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
				version: SCHEMA_VERSION.to_string(),
			},
		})
	}

	pub async fn list_tools(&self, catalog_id: &str) -> Result<ToolList> {
		let catalog = self.catalog(catalog_id).await?;
		let mut tools = Vec::with_capacity(catalog.document.structure.tools.len());
		for tool in &catalog.document.structure.tools {
			let service_schema = match &tool.service_id {
				Some(id) => self.store.service(id).await?.and_then(|s| s.input_schema),
				None => None,
			};
			let args = match service_schema {
				Some(schema) => serde_json::to_value(schema)
					.map_err(|e| Error::Internal(format!("failed to encode input schema: {e}")))?,
				None => tool.input_schema.clone(),
			};
			tools.push(ToolSummary {
				name: tool.name.clone(),
				description: tool.description.clone(),
				args,
			});
		}
		Ok(ToolList {
			id: catalog.id.clone(),
			name: catalog.name.clone(),
			description: catalog.display_description().to_string(),
			tools,
		})
	}

	pub async fn execute_tool(
		&self,
		catalog_id: &str,
		tool_name: &str,
		inputs: ExecutionInputs,
	) -> Result<ExecutionResult> {
		let catalog = self.catalog(catalog_id).await?;
		let tool = catalog
			.document
			.tool(tool_name)
			.ok_or_else(|| Error::tool_not_found(catalog_id, tool_name))?;
		let service_id = tool.service_id.as_deref().ok_or_else(|| {
			Error::BusinessRule(format!(
				"tool '{tool_name}' in catalog '{catalog_id}' is not bound to a service"
			))
		})?;
		info!(target: "registry", catalog_id, tool = tool_name, service_id, "executing tool");
		self.invoker.execute(service_id, inputs).await
	}

	async fn catalog(&self, id: &str) -> Result<StoredCatalog> {
		self
			.store
			.catalog(id)
			.await?
			.ok_or_else(|| Error::not_found("catalog", id))
	}
}

//! Catalog fetching, normalization and registration against mock upstreams.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use ocpgateway::Error;
use ocpgateway::catalog::{ComposeCatalog, ComposeTool, RegisterCatalog, StructureFetcher};
use ocpgateway::client::UpstreamClient;
use ocpgateway::store::{ConfigStore, MemoryStore};
use ocpgateway::types::{CatalogSource, MASK, SourceType};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common;

fn fetcher() -> anyhow::Result<StructureFetcher> {
	Ok(StructureFetcher::new(UpstreamClient::new(&common::config().client)?))
}

#[tokio::test]
async fn test_mcp_fetch_appends_tools_once() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/tools"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
		.expect(2)
		.mount(&server)
		.await;

	let fetcher = fetcher()?;
	let headers = BTreeMap::new();
	fetcher
		.fetch(SourceType::Mcp, &format!("{}/api", server.uri()), &headers)
		.await?;
	fetcher
		.fetch(SourceType::Mcp, &format!("{}/api/tools/", server.uri()), &headers)
		.await?;
	Ok(())
}

#[tokio::test]
async fn test_langserve_fetch_uses_url_unchanged() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/agents"))
		.and(header("x-api-key", "k-1"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
		.expect(1)
		.mount(&server)
		.await;

	let headers = BTreeMap::from([("x-api-key".to_string(), "k-1".to_string())]);
	let raw = fetcher()?
		.fetch(SourceType::LangServe, &format!("{}/agents", server.uri()), &headers)
		.await?;
	assert_eq!(raw.source_type(), SourceType::LangServe);
	Ok(())
}

#[tokio::test]
async fn test_ocpm_without_data_is_bad_structure() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/tools"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
		.mount(&server)
		.await;

	let err = fetcher()?
		.fetch(SourceType::OcpM, &server.uri(), &BTreeMap::new())
		.await
		.unwrap_err();
	assert_matches!(&err, Error::BadStructure { cause, .. } if cause.contains("data"));
	assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
	Ok(())
}

#[tokio::test]
async fn test_fetch_failures_name_the_cause() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/down/tools"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/html"))
		.respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
		.mount(&server)
		.await;

	let fetcher = fetcher()?;
	let err = fetcher
		.fetch(SourceType::Mcp, &format!("{}/down", server.uri()), &BTreeMap::new())
		.await
		.unwrap_err();
	assert!(err.to_string().contains("503 Service Unavailable"), "{err}");

	let err = fetcher
		.fetch(SourceType::LangServe, &format!("{}/html", server.uri()), &BTreeMap::new())
		.await
		.unwrap_err();
	assert!(err.to_string().contains("malformed body"), "{err}");

	// Nothing listens on port 9
	let err = fetcher
		.fetch(SourceType::Mcp, "http://127.0.0.1:9", &BTreeMap::new())
		.await
		.unwrap_err();
	assert_matches!(&err, Error::BadStructure { cause, .. } if cause == "could not connect");
	Ok(())
}

#[tokio::test]
async fn test_register_update_delete() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/mcp/tools"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"metadata": {"description": "Company tools"},
			"tools": [
				{"name": "lookup", "description": "Find a company", "args": {"cnpj": {"type": "string"}}},
				{"name": "search"}
			]
		})))
		.mount(&server)
		.await;

	let store = Arc::new(MemoryStore::new());
	store
		.put_service(common::cnpj_service("http://api.local", None))
		.await?;
	let engine = common::engine(store.clone())?;

	let request = RegisterCatalog {
		name: "companies".to_string(),
		description: None,
		enabled: true,
		source: CatalogSource::new(SourceType::Mcp, format!("{}/mcp", server.uri()))
			.with_header("Authorization", "Bearer upstream-secret"),
		bindings: BTreeMap::from([("lookup".to_string(), "svc-cnpj".to_string())]),
		version: None,
	};
	let registered = engine.catalogs.register("acme", request.clone()).await?;
	assert_eq!(registered.scope, "acme");
	assert_eq!(registered.document.metadata.source.headers["Authorization"], MASK);
	assert_eq!(
		registered.document.metadata.source.url,
		format!("{}/mcp", server.uri())
	);
	assert_eq!(registered.document.structure.description, "Company tools");

	// The store keeps the real header; reads mask it
	let stored = store.catalog(&registered.id).await?.expect("stored");
	assert_eq!(
		stored.document.metadata.source.headers["Authorization"],
		"Bearer upstream-secret"
	);
	assert_eq!(
		stored.document.tool("lookup").and_then(|t| t.service_id.as_deref()),
		Some("svc-cnpj")
	);
	assert!(stored.document.tool("search").unwrap().service_id.is_none());
	let fetched = engine.catalogs.get(&registered.id).await?;
	assert_eq!(fetched.document.metadata.source.headers["Authorization"], MASK);

	let updated = engine
		.catalogs
		.update(
			&registered.id,
			RegisterCatalog {
				name: "companies-v2".to_string(),
				..request
			},
		)
		.await?;
	assert_eq!(updated.id, registered.id);
	assert_eq!(updated.name, "companies-v2");
	assert_eq!(updated.created_at, registered.created_at);
	assert_eq!(updated.scope, "acme");

	engine.catalogs.delete(&registered.id).await?;
	assert_matches!(
		engine.catalogs.delete(&registered.id).await,
		Err(Error::NotFound { entity: "catalog", .. })
	);
	assert_matches!(
		engine.catalogs.get(&registered.id).await,
		Err(Error::NotFound { .. })
	);
	Ok(())
}

#[tokio::test]
async fn test_register_rejects_bad_bindings() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/tools"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "lookup"}])))
		.mount(&server)
		.await;

	let store = Arc::new(MemoryStore::new());
	store
		.put_service(common::cnpj_service("http://api.local", None))
		.await?;
	let engine = common::engine(store.clone())?;

	let request = |tool: &str, service: &str| RegisterCatalog {
		name: "bad".to_string(),
		description: None,
		enabled: true,
		source: CatalogSource::new(SourceType::Mcp, server.uri()),
		bindings: BTreeMap::from([(tool.to_string(), service.to_string())]),
		version: None,
	};

	assert_matches!(
		engine.catalogs.register("acme", request("missing", "svc-cnpj")).await,
		Err(Error::BusinessRule(_))
	);
	assert_matches!(
		engine.catalogs.register("acme", request("lookup", "svc-missing")).await,
		Err(Error::NotFound { entity: "service", .. })
	);
	assert_matches!(
		engine
			.catalogs
			.register(
				"acme",
				RegisterCatalog {
					version: Some("9.9.9".to_string()),
					bindings: BTreeMap::new(),
					..request("lookup", "svc-cnpj")
				}
			)
			.await,
		Err(Error::UnsupportedVersion { .. })
	);
	assert_eq!(store.catalog_count(), 0);
	Ok(())
}

#[tokio::test]
async fn test_unsupported_version_fails_before_fetch() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
		.expect(0)
		.mount(&server)
		.await;

	let engine = common::engine(Arc::new(MemoryStore::new()))?;
	let request = RegisterCatalog {
		name: "future".to_string(),
		description: None,
		enabled: true,
		source: CatalogSource::new(SourceType::Mcp, server.uri()),
		bindings: BTreeMap::new(),
		version: Some("2.0.0".to_string()),
	};
	assert_matches!(
		engine.catalogs.register("acme", request).await,
		Err(Error::UnsupportedVersion { version, .. }) if version == "2.0.0"
	);
	Ok(())
}

#[tokio::test]
async fn test_fetch_timeout_is_named() -> anyhow::Result<()> {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/slow/tools"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!({"tools": []}))
				.set_delay(Duration::from_millis(1500)),
		)
		.mount(&server)
		.await;

	let mut client = common::config().client;
	client.fetch_timeout = Duration::from_millis(200);
	let err = StructureFetcher::new(UpstreamClient::new(&client)?)
		.fetch(SourceType::Mcp, &format!("{}/slow", server.uri()), &BTreeMap::new())
		.await
		.unwrap_err();
	assert_matches!(&err, Error::BadStructure { cause, .. } if cause == "timeout");
	assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
	Ok(())
}

#[tokio::test]
async fn test_compose_binds_services() -> anyhow::Result<()> {
	let store = Arc::new(MemoryStore::new());
	store
		.put_service(common::cnpj_service("http://api.local", None))
		.await?;
	let engine = common::engine(store.clone())?;

	let composed = engine
		.catalogs
		.compose(
			"acme",
			ComposeCatalog {
				name: "local".to_string(),
				description: Some("Composed tools".to_string()),
				enabled: true,
				tools: vec![ComposeTool {
					name: "cnpj".to_string(),
					description: None,
					service_id: "svc-cnpj".to_string(),
				}],
			},
		)
		.await?;

	let source = &composed.document.metadata.source;
	assert_eq!(source.source_type, SourceType::OcpM);
	assert_eq!(source.url, format!("/ocp-m/dynamic/{}", composed.id));
	let tool = composed.document.tool("cnpj").expect("tool");
	assert_eq!(tool.service_id.as_deref(), Some("svc-cnpj"));
	assert_eq!(tool.description, "Look up a company by cnpj");
	assert_eq!(tool.input_schema["required"], json!(["path"]));

	let duplicate = ComposeCatalog {
		name: "dup".to_string(),
		description: None,
		enabled: true,
		tools: vec![
			ComposeTool {
				name: "a".to_string(),
				description: None,
				service_id: "svc-cnpj".to_string(),
			},
			ComposeTool {
				name: "a".to_string(),
				description: None,
				service_id: "svc-cnpj".to_string(),
			},
		],
	};
	assert_matches!(
		engine.catalogs.compose("acme", duplicate).await,
		Err(Error::DuplicateToolName(_))
	);
	Ok(())
}

//! HTTP envelope and routing.

use std::sync::Arc;

use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use ocpgateway::api;
use ocpgateway::store::{ConfigStore, MemoryStore};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common;

async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => builder
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap(),
		None => builder.body(Body::empty()).unwrap(),
	};
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = response.into_body().collect().await.unwrap().to_bytes();
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({"text": String::from_utf8_lossy(&bytes)}))
	};
	(status, json)
}

async fn app(store: Arc<MemoryStore>) -> anyhow::Result<axum::Router> {
	let config = common::config();
	let engine = Arc::new(ocpgateway::Engine::new(store, &config)?);
	Ok(api::router(engine, &config.base_path))
}

#[tokio::test]
async fn test_end_to_end_over_http() -> anyhow::Result<()> {
	let auth = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/token"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc123"})))
		.mount(&auth)
		.await;
	let upstream = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/v1/cnpj/12345678000199"))
		.and(header("Authorization", "Bearer abc123"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ACME LTDA"})))
		.expect(1)
		.mount(&upstream)
		.await;

	let store = Arc::new(MemoryStore::new());
	store
		.put_authenticator(common::token_authenticator(&auth.uri()))
		.await?;
	store
		.put_service(common::cnpj_service(&upstream.uri(), Some("auth-1")))
		.await?;
	let app = app(store).await?;

	let (status, body) = send(
		&app,
		Method::POST,
		"/catalogs/compose",
		Some(json!({
			"scope": "acme",
			"name": "companies",
			"tools": [{"name": "lookup", "service_id": "svc-cnpj"}]
		})),
	)
	.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["success"], json!(true));
	assert_eq!(body["status_code"], json!(201));
	let id = body["data"]["id"].as_str().expect("catalog id").to_string();

	let (status, body) = send(&app, Method::GET, "/ocp-m/dynamic/registry?scope=acme", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"][0]["id"], json!(id));

	let (status, body) = send(&app, Method::GET, &format!("/ocp-m/dynamic/{id}/schema.json"), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["tools"][0]["method"], json!("GET"));

	let (status, body) = send(
		&app,
		Method::POST,
		&format!("/ocp-m/dynamic/{id}/tools/lookup/execute"),
		Some(json!({"path": {"cnpj": "12345678000199"}})),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["success"], json!(true));
	assert_eq!(body["data"]["response"]["name"], json!("ACME LTDA"));
	Ok(())
}

#[tokio::test]
async fn test_error_envelopes() -> anyhow::Result<()> {
	let store = Arc::new(MemoryStore::new());
	store
		.put_service(common::cnpj_service("http://127.0.0.1:9", None))
		.await?;
	let app = app(store).await?;

	let (status, body) = send(&app, Method::GET, "/ocp-m/dynamic/missing/tools", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["success"], json!(false));
	assert_eq!(body["status_code"], json!(404));
	assert_eq!(body["message"], json!("catalog 'missing' not found"));
	assert!(body.get("errors").is_none());

	let (status, body) = send(
		&app,
		Method::POST,
		"/services/svc-cnpj/execute",
		Some(json!({"path": {"cnpj": "abc"}})),
	)
	.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["message"], json!("input validation failed"));
	assert!(body["errors"]["path.cnpj"].is_string());

	// Empty body means no inputs, which fails the required path section
	let (status, body) = send(&app, Method::POST, "/services/svc-cnpj/execute", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["errors"]["path"], json!("field is required"));

	let (status, _) = send(&app, Method::DELETE, "/catalogs/nope", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	Ok(())
}

#[tokio::test]
async fn test_read_views_are_masked() -> anyhow::Result<()> {
	let store = Arc::new(MemoryStore::new());
	store
		.put_authenticator(common::token_authenticator("http://auth.local"))
		.await?;
	let app = app(store).await?;

	let (status, body) = send(&app, Method::GET, "/authenticators/auth-1", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["body"]["client_secret"], json!("****"));
	assert!(!body.to_string().contains("s3cr3t"));

	let (status, body) = send(&app, Method::GET, "/healthz", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["text"], json!("ok"));
	Ok(())
}

#[tokio::test]
async fn test_execute_link_routes_for_spaced_tool_name() -> anyhow::Result<()> {
	let upstream = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/v1/cnpj/12345678000199"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ACME LTDA"})))
		.expect(1)
		.mount(&upstream)
		.await;

	let store = Arc::new(MemoryStore::new());
	store
		.put_service(common::cnpj_service(&upstream.uri(), None))
		.await?;
	let app = app(store).await?;

	let (_, body) = send(
		&app,
		Method::POST,
		"/catalogs/compose",
		Some(json!({
			"scope": "acme",
			"name": "companies",
			"tools": [{"name": "find company", "service_id": "svc-cnpj"}]
		})),
	)
	.await;
	let id = body["data"]["id"].as_str().expect("catalog id").to_string();

	let (_, body) = send(&app, Method::GET, &format!("/ocp-m/dynamic/{id}/schema.json"), None).await;
	let link = body["data"]["tools"][0]["execute_url"]
		.as_str()
		.expect("execute link")
		.to_string();
	assert_eq!(link, format!("/ocp-m/dynamic/{id}/tools/find%20company/execute"));

	let (status, body) = send(
		&app,
		Method::POST,
		&link,
		Some(json!({"path": {"cnpj": "12345678000199"}})),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["response"]["name"], json!("ACME LTDA"));
	Ok(())
}

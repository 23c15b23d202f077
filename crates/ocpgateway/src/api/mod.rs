// HTTP API over the engine

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::{ComposeCatalog, RegisterCatalog};
use crate::engine::Engine;
use crate::registry::{CatalogSchema, RegistryEntry, ToolList};
use crate::types::{
	AuthenticatorDefinition, AuthenticatorOutcome, ExecutionInputs, ExecutionResult, StoredCatalog,
};

mod response;

pub use response::{ApiError, Envelope, ok, with_status};

type ApiResult<T> = Result<Envelope<T>, ApiError>;
type AppState = Arc<Engine>;

/// Build the router. Dynamic catalog routes live under `base_path`.
pub fn router(engine: Arc<Engine>, base_path: &str) -> Router {
	let dynamic = Router::new()
		.route("/registry", get(registry))
		.route("/{id}/schema.json", get(schema))
		.route("/{id}/tools", get(list_tools))
		.route("/{id}/tools/{tool}/execute", post(execute_tool));

	Router::new()
		.nest(base_path, dynamic)
		.route("/services/{id}/execute", post(execute_service))
		.route("/authenticators/{id}", get(get_authenticator))
		.route("/authenticators/{id}/execute", post(execute_authenticator))
		.route("/catalogs", post(register_catalog))
		.route("/catalogs/compose", post(compose_catalog))
		.route(
			"/catalogs/{id}",
			get(get_catalog).put(update_catalog).delete(delete_catalog),
		)
		.route("/healthz", get(health))
		.with_state(engine)
		.layer(TraceLayer::new_for_http())
}

/// Serve until ctrl-c
pub async fn serve(listener: TcpListener, engine: Arc<Engine>, base_path: &str) -> std::io::Result<()> {
	let app = router(engine, base_path);
	info!(target: "api", addr = ?listener.local_addr().ok(), base_path, "serving");
	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
			info!(target: "api", "shutdown signal received");
		})
		.await
}

async fn health() -> &'static str {
	"ok"
}

#[derive(Debug, Deserialize)]
struct ScopeQuery {
	scope: Option<String>,
}

async fn registry(State(engine): State<AppState>, Query(query): Query<ScopeQuery>) -> ApiResult<Vec<RegistryEntry>> {
	engine
		.registry
		.registry(query.scope.as_deref())
		.await
		.map(ok)
		.map_err(ApiError)
}

async fn schema(State(engine): State<AppState>, Path(id): Path<String>) -> ApiResult<CatalogSchema> {
	engine.registry.schema(&id).await.map(ok).map_err(ApiError)
}

async fn list_tools(State(engine): State<AppState>, Path(id): Path<String>) -> ApiResult<ToolList> {
	engine.registry.list_tools(&id).await.map(ok).map_err(ApiError)
}

async fn execute_tool(
	State(engine): State<AppState>,
	Path((id, tool)): Path<(String, String)>,
	body: Bytes,
) -> ApiResult<ExecutionResult> {
	let inputs = parse_inputs(&body)?;
	engine
		.registry
		.execute_tool(&id, &tool, inputs)
		.await
		.map(ok)
		.map_err(ApiError)
}

async fn execute_service(
	State(engine): State<AppState>,
	Path(id): Path<String>,
	body: Bytes,
) -> ApiResult<ExecutionResult> {
	let inputs = parse_inputs(&body)?;
	engine.invoker.execute(&id, inputs).await.map(ok).map_err(ApiError)
}

async fn execute_authenticator(
	State(engine): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<AuthenticatorOutcome> {
	engine.authenticators.execute(&id).await.map(ok).map_err(ApiError)
}

async fn get_authenticator(
	State(engine): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<AuthenticatorDefinition> {
	engine.authenticators.get(&id).await.map(ok).map_err(ApiError)
}

#[derive(Debug, Serialize, Deserialize)]
struct RegisterRequest {
	#[serde(default)]
	scope: String,
	#[serde(flatten)]
	catalog: RegisterCatalog,
}

#[derive(Debug, Serialize, Deserialize)]
struct ComposeRequest {
	#[serde(default)]
	scope: String,
	#[serde(flatten)]
	catalog: ComposeCatalog,
}

async fn register_catalog(State(engine): State<AppState>, body: Bytes) -> ApiResult<StoredCatalog> {
	let request: RegisterRequest = parse_json(&body)?;
	engine
		.catalogs
		.register(&request.scope, request.catalog)
		.await
		.map(|c| with_status(StatusCode::CREATED, c))
		.map_err(ApiError)
}

async fn compose_catalog(State(engine): State<AppState>, body: Bytes) -> ApiResult<StoredCatalog> {
	let request: ComposeRequest = parse_json(&body)?;
	engine
		.catalogs
		.compose(&request.scope, request.catalog)
		.await
		.map(|c| with_status(StatusCode::CREATED, c))
		.map_err(ApiError)
}

async fn get_catalog(State(engine): State<AppState>, Path(id): Path<String>) -> ApiResult<StoredCatalog> {
	engine.catalogs.get(&id).await.map(ok).map_err(ApiError)
}

async fn update_catalog(
	State(engine): State<AppState>,
	Path(id): Path<String>,
	body: Bytes,
) -> ApiResult<StoredCatalog> {
	let request: RegisterCatalog = parse_json(&body)?;
	engine.catalogs.update(&id, request).await.map(ok).map_err(ApiError)
}

async fn delete_catalog(State(engine): State<AppState>, Path(id): Path<String>) -> ApiResult<serde_json::Value> {
	engine.catalogs.delete(&id).await.map_err(ApiError)?;
	Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}

/// An empty body means no inputs
fn parse_inputs(body: &[u8]) -> Result<ExecutionInputs, ApiError> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(ExecutionInputs::default());
	}
	let value: serde_json::Value = parse_json(body)?;
	if value.is_null() {
		return Ok(ExecutionInputs::default());
	}
	serde_json::from_value(value).map_err(|e| ApiError::bad_request(format!("invalid inputs: {e}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
	serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
}

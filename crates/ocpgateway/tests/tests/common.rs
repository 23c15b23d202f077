use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ocpgateway::store::MemoryStore;
use ocpgateway::types::{AuthenticatorDefinition, InputSchema, PropertySchema, ServiceDefinition};
use ocpgateway::{Config, Engine};
use serde_json::json;

pub fn config() -> Config {
	let mut config = Config::default();
	config.client.fetch_timeout = Duration::from_secs(2);
	config.client.authenticator_timeout = Duration::from_secs(2);
	config.client.service_timeout = Duration::from_secs(2);
	config
}

pub fn engine(store: Arc<MemoryStore>) -> anyhow::Result<Engine> {
	Ok(Engine::new(store, &config())?)
}

/// Engine whose outbound calls all give up after `timeout`
pub fn engine_with_timeout(store: Arc<MemoryStore>, timeout: Duration) -> anyhow::Result<Engine> {
	let mut config = config();
	config.client.fetch_timeout = timeout;
	config.client.authenticator_timeout = timeout;
	config.client.service_timeout = timeout;
	Ok(Engine::new(store, &config)?)
}

/// Token endpoint mapping `access_token` into a bearer header
pub fn token_authenticator(base: &str) -> AuthenticatorDefinition {
	serde_json::from_value(json!({
		"id": "auth-1",
		"name": "token",
		"url": format!("{base}/token"),
		"method": "POST",
		"body": {"client_id": "ocp", "client_secret": "s3cr3t"},
		"response_map": {"Authorization": "Bearer $.access_token"}
	}))
	.expect("valid authenticator")
}

/// Company lookup keyed by a 14 digit cnpj path segment
pub fn cnpj_service(base: &str, authenticator_id: Option<&str>) -> ServiceDefinition {
	let path = PropertySchema {
		schema_type: Some("object".to_string()),
		properties: BTreeMap::from([(
			"cnpj".to_string(),
			PropertySchema::string().with_pattern("^[0-9]{14}$"),
		)]),
		required: vec!["cnpj".to_string()],
		..Default::default()
	};
	let mut service: ServiceDefinition = serde_json::from_value(json!({
		"id": "svc-cnpj",
		"name": "cnpj lookup",
		"description": "Look up a company by cnpj",
		"url": format!("{base}/v1/cnpj/:cnpj"),
		"method": "GET",
		"authenticator_id": authenticator_id
	}))
	.expect("valid service");
	service.input_schema = Some(InputSchema {
		schema_type: "object".to_string(),
		properties: BTreeMap::from([("path".to_string(), path)]),
		required: vec!["path".to_string()],
		..Default::default()
	});
	service
}

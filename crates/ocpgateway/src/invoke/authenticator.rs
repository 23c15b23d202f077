// Authenticator execution and response extraction

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::path;
use crate::client::{Purpose, UpstreamClient};
use crate::error::{Error, Result};
use crate::store::ConfigStore;
use crate::types::{AuthenticatorDefinition, AuthenticatorOutcome};

pub struct AuthenticatorExecutor {
	store: Arc<dyn ConfigStore>,
	client: UpstreamClient,
}

impl AuthenticatorExecutor {
	pub fn new(store: Arc<dyn ConfigStore>, client: UpstreamClient) -> Self {
		Self { store, client }
	}

	/// Masked view of a stored authenticator
	pub async fn get(&self, id: &str) -> Result<AuthenticatorDefinition> {
		Ok(self.load(id).await?.masked())
	}

	pub async fn execute(&self, id: &str) -> Result<AuthenticatorOutcome> {
		let definition = self.load(id).await?;
		self.call(&definition).await
	}

	pub(crate) async fn load(&self, id: &str) -> Result<AuthenticatorDefinition> {
		let definition = self
			.store
			.authenticator(id)
			.await?
			.ok_or_else(|| Error::not_found("authenticator", id))?;
		if !definition.enabled {
			return Err(Error::BusinessRule(format!("authenticator '{id}' is disabled")));
		}
		Ok(definition)
	}

	/// Issue the authentication request and extract every mapped field.
	///
	/// Unresolvable fields are `null` in `extracted`; the parsed body is always
	/// returned as `raw`.
	pub async fn call(&self, definition: &AuthenticatorDefinition) -> Result<AuthenticatorOutcome> {
		debug!(
			target: "invoke",
			authenticator_id = %definition.id,
			method = %definition.method,
			url = %definition.url,
			"calling authenticator"
		);
		let mut request = self
			.client
			.request(definition.method.into(), &definition.url);
		for (name, value) in &definition.headers {
			request = request.header(name.as_str(), value.as_str());
		}
		if !definition.body.is_empty() {
			request = request.json(&definition.body);
		}

		let response = self
			.client
			.send(Purpose::Authenticate, request)
			.await
			.map_err(|failure| {
				warn!(
					target: "invoke",
					authenticator_id = %definition.id,
					cause = %failure.cause(),
					"authenticator call failed"
				);
				failure.into_error(&definition.url)
			})?;

		let raw = response.json_or_raw();
		let extracted: Map<String, Value> = definition
			.response_map
			.iter()
			.map(|(key, template)| {
				let value = path::extract(template, &raw).unwrap_or(Value::Null);
				(key.clone(), value)
			})
			.collect();

		Ok(AuthenticatorOutcome {
			status_code: response.status,
			extracted,
			raw,
		})
	}
}

/// Header values for the target call, one per `response_map` entry.
///
/// Expressions that do not resolve are kept as literal text.
pub fn injected_headers(
	definition: &AuthenticatorDefinition,
	outcome: &AuthenticatorOutcome,
) -> BTreeMap<String, String> {
	definition
		.response_map
		.iter()
		.map(|(header, template)| (header.clone(), path::render(template, &outcome.raw)))
		.collect()
}

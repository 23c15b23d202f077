// Service invocation: validate, authenticate, template, call

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{info, warn};

use super::authenticator::{AuthenticatorExecutor, injected_headers};
use super::path::stringify;
use super::template::{append_query, substitute_path};
use super::validation::validate_inputs;
use crate::client::{Purpose, UpstreamClient};
use crate::error::{Error, Result};
use crate::store::ConfigStore;
use crate::types::{ExecutionInputs, ExecutionResult, HttpMethod, ServiceDefinition};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

pub struct ServiceInvoker {
	store: Arc<dyn ConfigStore>,
	client: UpstreamClient,
	authenticators: Arc<AuthenticatorExecutor>,
}

impl ServiceInvoker {
	pub fn new(
		store: Arc<dyn ConfigStore>,
		client: UpstreamClient,
		authenticators: Arc<AuthenticatorExecutor>,
	) -> Self {
		Self {
			store,
			client,
			authenticators,
		}
	}

	pub async fn execute(&self, service_id: &str, inputs: ExecutionInputs) -> Result<ExecutionResult> {
		let service = self
			.store
			.service(service_id)
			.await?
			.ok_or_else(|| Error::not_found("service", service_id))?;
		self.invoke(&service, inputs).await
	}

	pub async fn invoke(&self, service: &ServiceDefinition, inputs: ExecutionInputs) -> Result<ExecutionResult> {
		if let Some(schema) = &service.input_schema {
			validate_inputs(schema, &inputs)?;
		}

		let mut headers = service.headers.clone();
		if let Some(auth_id) = &service.authenticator_id {
			let injected = self
				.authenticate(auth_id)
				.await
				.map_err(|e| Error::authenticator_failed(auth_id, e))?;
			merge_headers(&mut headers, injected);
		}

		let prepared = PreparedRequest::build(service, headers, inputs)?;
		info!(
			target: "invoke",
			service_id = %service.id,
			method = %prepared.method,
			url = %prepared.url,
			"invoking service"
		);
		let builder = prepared.into_builder(&self.client, &service.content_type)?;
		let response = self
			.client
			.send(Purpose::Execute, builder)
			.await
			.map_err(|failure| {
				warn!(
					target: "invoke",
					service_id = %service.id,
					cause = %failure.cause(),
					"service call failed"
				);
				failure.into_error(&service.url)
			})?;

		Ok(ExecutionResult {
			success: true,
			status_code: response.status,
			response: response.json_or_raw(),
		})
	}

	async fn authenticate(&self, auth_id: &str) -> Result<BTreeMap<String, String>> {
		let definition = self.authenticators.load(auth_id).await?;
		let outcome = self.authenticators.call(&definition).await?;
		Ok(injected_headers(&definition, &outcome))
	}
}

/// Injected headers replace configured ones, matching names case-insensitively
fn merge_headers(headers: &mut BTreeMap<String, String>, injected: BTreeMap<String, String>) {
	for (name, value) in injected {
		headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
		headers.insert(name, value);
	}
}

/// Final method, url, headers and body of a target call
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
	pub method: HttpMethod,
	pub url: String,
	pub headers: BTreeMap<String, String>,
	pub body: Option<Value>,
}

impl PreparedRequest {
	pub fn build(
		service: &ServiceDefinition,
		headers: BTreeMap<String, String>,
		inputs: ExecutionInputs,
	) -> Result<Self> {
		let url = substitute_path(&service.url, &inputs.path);
		let url = append_query(&url, &inputs.query)?;
		// Body inputs replace the default body entirely
		let body = inputs
			.body
			.filter(|b| !b.is_null())
			.or_else(|| Some(service.body.clone()).filter(|b| !b.is_null()));
		Ok(Self {
			method: service.method,
			url,
			headers,
			body,
		})
	}

	fn into_builder(self, client: &UpstreamClient, content_type: &str) -> Result<RequestBuilder> {
		let mut builder = client.request(self.method.into(), &self.url);
		for (name, value) in &self.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		let Some(body) = self.body else {
			return Ok(builder);
		};
		let media_type = content_type
			.split(';')
			.next()
			.unwrap_or_default()
			.trim()
			.to_ascii_lowercase();
		builder = match media_type.as_str() {
			"application/json" => builder.json(&body),
			FORM_URLENCODED => {
				let form = serde_urlencoded::to_string(form_pairs(&body)?)
					.map_err(|e| Error::BadRequest(format!("invalid form body: {e}")))?;
				builder.header(CONTENT_TYPE, FORM_URLENCODED).body(form)
			},
			_ => builder
				.header(CONTENT_TYPE, content_type)
				.body(stringify(&body)),
		};
		Ok(builder)
	}
}

fn form_pairs(body: &Value) -> Result<Vec<(String, String)>> {
	let obj = body
		.as_object()
		.ok_or_else(|| Error::BadRequest("form body must be a JSON object".to_string()))?;
	Ok(obj.iter().map(|(k, v)| (k.clone(), stringify(v))).collect())
}

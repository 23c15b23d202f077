// Outbound HTTP client shared by the fetcher, authenticator and invoker

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// What an outbound call is for. Selects the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
	Fetch,
	Authenticate,
	Execute,
}

impl Purpose {
	fn as_str(&self) -> &'static str {
		match self {
			Purpose::Fetch => "fetch",
			Purpose::Authenticate => "authenticate",
			Purpose::Execute => "execute",
		}
	}
}

/// A completed call with a 2xx status
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
	pub status: u16,
	pub body: String,
}

impl UpstreamResponse {
	/// Parsed JSON body, or `{"raw": text}` when the body is not JSON
	pub fn json_or_raw(&self) -> Value {
		serde_json::from_str(&self.body).unwrap_or_else(|_| json!({ "raw": self.body }))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
	Timeout,
	Connect,
	Status {
		status: u16,
		reason: String,
		body: String,
	},
	Other(String),
}

impl UpstreamFailure {
	/// Short human readable cause
	pub fn cause(&self) -> String {
		match self {
			UpstreamFailure::Timeout => "timeout".to_string(),
			UpstreamFailure::Connect => "could not connect".to_string(),
			UpstreamFailure::Status { status, reason, .. } => format!("HTTP {status} {reason}"),
			UpstreamFailure::Other(message) => message.clone(),
		}
	}

	pub fn into_error(self, url: impl Into<String>) -> Error {
		let url = url.into();
		match self {
			UpstreamFailure::Timeout => Error::UpstreamTimeout { url },
			UpstreamFailure::Connect => Error::UpstreamConnect { url },
			UpstreamFailure::Status {
				status,
				reason,
				body,
			} => Error::UpstreamStatus {
				url,
				status,
				reason,
				body,
			},
			UpstreamFailure::Other(message) => Error::Upstream { url, message },
		}
	}
}

impl From<reqwest::Error> for UpstreamFailure {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			UpstreamFailure::Timeout
		} else if e.is_connect() {
			UpstreamFailure::Connect
		} else {
			UpstreamFailure::Other(e.to_string())
		}
	}
}

/// Pooled HTTP client. Built once and shared; every call is a single attempt.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
	http: reqwest::Client,
	config: ClientConfig,
}

impl UpstreamClient {
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let http = reqwest::Client::builder()
			.user_agent(config.user_agent.as_str())
			.build()
			.map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
		Ok(Self {
			http,
			config: config.clone(),
		})
	}

	pub fn timeout(&self, purpose: Purpose) -> Duration {
		match purpose {
			Purpose::Fetch => self.config.fetch_timeout,
			Purpose::Authenticate => self.config.authenticator_timeout,
			Purpose::Execute => self.config.service_timeout,
		}
	}

	pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
		self.http.request(method, url)
	}

	/// Send a prepared request under the purpose's timeout.
	///
	/// Non-2xx responses are returned as [`UpstreamFailure::Status`] with the
	/// body text preserved.
	pub async fn send(
		&self,
		purpose: Purpose,
		builder: RequestBuilder,
	) -> Result<UpstreamResponse, UpstreamFailure> {
		let response = builder.timeout(self.timeout(purpose)).send().await?;
		let status = response.status();
		let body = response.text().await?;
		debug!(
			target: "invoke",
			purpose = purpose.as_str(),
			status = status.as_u16(),
			"upstream call completed"
		);
		if !status.is_success() {
			return Err(UpstreamFailure::Status {
				status: status.as_u16(),
				reason: status.canonical_reason().unwrap_or("").to_string(),
				body,
			});
		}
		Ok(UpstreamResponse {
			status: status.as_u16(),
			body,
		})
	}
}

// Engine error types

use std::collections::BTreeMap;

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::SourceType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification every [`Error`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	NotFound,
	BadRequest,
	BusinessRule,
	Internal,
}

/// Errors raised by the invocation engine.
///
/// Upstream transport failures are translated into one of these variants at
/// the point of the outbound call; `reqwest` errors never cross a component
/// boundary.
#[derive(Error, Debug)]
pub enum Error {
	#[error("{entity} '{id}' not found")]
	NotFound { entity: &'static str, id: String },

	#[error("tool '{tool}' not found in catalog '{catalog}'")]
	ToolNotFound { catalog: String, tool: String },

	#[error("{0}")]
	BadRequest(String),

	#[error("input validation failed")]
	Validation { errors: BTreeMap<String, String> },

	#[error("bad upstream structure from {url}: {cause}")]
	BadStructure { url: String, cause: String },

	#[error("unsupported OCP version '{version}' for {source_type} catalogs")]
	UnsupportedVersion {
		source_type: SourceType,
		version: String,
	},

	#[error("duplicate tool name: '{0}'")]
	DuplicateToolName(String),

	#[error("timeout calling {url}")]
	UpstreamTimeout { url: String },

	#[error("could not connect to {url}")]
	UpstreamConnect { url: String },

	#[error("upstream {url} returned {status} {reason}: {body}")]
	UpstreamStatus {
		url: String,
		status: u16,
		reason: String,
		body: String,
	},

	#[error("request to {url} failed: {message}")]
	Upstream { url: String, message: String },

	#[error("authenticator chain failed for '{authenticator_id}': {source}")]
	AuthenticatorFailed {
		authenticator_id: String,
		source: Box<Error>,
	},

	#[error("{0}")]
	BusinessRule(String),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
		Self::NotFound {
			entity,
			id: id.into(),
		}
	}

	pub fn tool_not_found(catalog: impl Into<String>, tool: impl Into<String>) -> Self {
		Self::ToolNotFound {
			catalog: catalog.into(),
			tool: tool.into(),
		}
	}

	pub fn bad_structure(url: impl Into<String>, cause: impl Into<String>) -> Self {
		Self::BadStructure {
			url: url.into(),
			cause: cause.into(),
		}
	}

	pub fn authenticator_failed(authenticator_id: impl Into<String>, source: Error) -> Self {
		Self::AuthenticatorFailed {
			authenticator_id: authenticator_id.into(),
			source: Box::new(source),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::NotFound { .. } | Error::ToolNotFound { .. } => ErrorKind::NotFound,
			Error::BusinessRule(_) => ErrorKind::BusinessRule,
			Error::Internal(_) | Error::Store(_) => ErrorKind::Internal,
			_ => ErrorKind::BadRequest,
		}
	}

	pub fn status_code(&self) -> StatusCode {
		match self.kind() {
			ErrorKind::NotFound => StatusCode::NOT_FOUND,
			ErrorKind::BadRequest | ErrorKind::BusinessRule => StatusCode::BAD_REQUEST,
			ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Field level errors, present only for input validation failures.
	pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
		match self {
			Error::Validation { errors } => Some(errors),
			_ => None,
		}
	}

	pub fn to_body(&self) -> ErrorBody {
		ErrorBody {
			message: self.to_string(),
			status_code: self.status_code().as_u16(),
			errors: self.field_errors().cloned(),
		}
	}
}

/// Structured error returned across the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
	pub message: String,
	pub status_code: u16,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub errors: Option<BTreeMap<String, String>>,
}

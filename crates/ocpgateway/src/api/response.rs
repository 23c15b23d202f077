use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{Error, ErrorBody, ErrorKind};

/// Success envelope:
/// ```json
/// { "success": true, "status_code": 200, "data": ... }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
	pub success: bool,
	pub status_code: u16,
	pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Envelope<T> {
	with_status(StatusCode::OK, data)
}

pub fn with_status<T: Serialize>(status: StatusCode, data: T) -> Envelope<T> {
	Envelope {
		success: true,
		status_code: status.as_u16(),
		data,
	}
}

impl<T: Serialize> IntoResponse for Envelope<T> {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
		(status, Json(self)).into_response()
	}
}

/// Error envelope:
/// ```json
/// { "success": false, "status_code": 400, "message": "...", "errors": {...} }
/// ```
#[derive(Debug, Clone, Serialize)]
struct ErrorEnvelope {
	success: bool,
	#[serde(flatten)]
	body: ErrorBody,
}

/// Any engine error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		Self(err)
	}
}

impl ApiError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self(Error::BadRequest(message.into()))
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = self.0.to_body();
		match self.0.kind() {
			ErrorKind::Internal => error!(target: "api", error = %self.0, "request failed"),
			_ => warn!(target: "api", status = body.status_code, error = %self.0, "request rejected"),
		}
		(
			self.0.status_code(),
			Json(ErrorEnvelope {
				success: false,
				body,
			}),
		)
			.into_response()
	}
}

//! Inbound webhook pipeline: signature verification, filtering, and persistence.

pub mod ingest;
pub mod jwks;
pub mod verifier;

pub use ingest::{EventIngestor, IngestOutcome, WebhookPayload};
pub use jwks::{HttpKeySetFetcher, JwksCache, KeySetFetcher};
pub use verifier::WebhookVerifier;

// self
use crate::_prelude::*;

/// Response produced by the webhook boundary; the hosting HTTP runtime maps it 1:1 onto the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookResponse {
	/// HTTP status code.
	pub status: u16,
	/// Short diagnostic message; internal detail stays in the logs.
	pub message: String,
}
impl WebhookResponse {
	fn new(status: u16, message: impl Into<String>) -> Self {
		Self { status, message: message.into() }
	}
}

/// Framework-agnostic webhook endpoint.
///
/// The hosting runtime (an external collaborator) hands over the method, the `Authorization`
/// header, and the raw body; the handler maps every failure category onto an HTTP status: 401 for
/// authentication, 400 for malformed bodies, 405 for unsupported methods, 500 for anything
/// unclassified.
pub struct WebhookHandler {
	verifier: WebhookVerifier,
	ingestor: EventIngestor,
}
impl WebhookHandler {
	/// Creates a handler over the provided verifier and ingestor.
	pub fn new(verifier: WebhookVerifier, ingestor: EventIngestor) -> Self {
		Self { verifier, ingestor }
	}

	/// Handles one inbound request.
	pub async fn handle(
		&self,
		method: &str,
		authorization: Option<&str>,
		body: &[u8],
	) -> WebhookResponse {
		if method.eq_ignore_ascii_case("GET") {
			return WebhookResponse::new(
				200,
				"Endpoint is active and ready to receive POST requests.",
			);
		}
		if !method.eq_ignore_ascii_case("POST") {
			return WebhookResponse::new(405, "Method Not Allowed");
		}

		let Some(token) = authorization.and_then(|header| header.strip_prefix("Bearer ")) else {
			return WebhookResponse::new(401, "Unauthorized: Missing Authorization header.");
		};

		if let Err(err) = self.verifier.verify(token).await {
			return match err {
				Error::Auth(auth_err) => {
					tracing::warn!(error = %auth_err, "webhook token validation failed");

					WebhookResponse::new(401, format!("Unauthorized: {auth_err}"))
				},
				other => {
					tracing::error!(error = %other, "webhook verification failed upstream");

					WebhookResponse::new(500, "Internal Server Error")
				},
			};
		}

		let raw: Value = match serde_json::from_slice(body) {
			Ok(value) => value,
			Err(_) => return WebhookResponse::new(400, "Bad Request: Invalid JSON."),
		};

		match self.ingestor.ingest(raw).await {
			Ok(IngestOutcome::Stored) => WebhookResponse::new(200, "Webhook received and stored."),
			Ok(IngestOutcome::Skipped) => WebhookResponse::new(
				200,
				"Webhook received but not stored (does not match criteria).",
			),
			Err(Error::Structural(structural_err)) => {
				tracing::warn!(error = %structural_err, "webhook body rejected");

				WebhookResponse::new(400, "Bad Request: Invalid JSON.")
			},
			Err(err) => {
				tracing::error!(error = %err, "unhandled error while storing webhook");

				WebhookResponse::new(500, "Internal Server Error")
			},
		}
	}
}
impl Debug for WebhookHandler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebhookHandler").field("verifier", &self.verifier).finish()
	}
}

//! Crate-level error taxonomy shared by the token manager, gateway, and webhook pipeline.
//!
//! Every failure falls into one of four behavioral categories: transient (retried with backoff),
//! fatal/auth (propagated immediately, never retried), validation (raised before any network
//! call), and structural (unexpected wire shapes, fatal). [`Error::is_transient`] is the single
//! classification point consulted by the retry executor.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Network-level transport failure (always transient).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Endpoint answered with a non-success HTTP status; transient iff 429 or 5xx.
	#[error("Endpoint returned HTTP {status}: {body}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Response body text, kept for diagnostics.
		body: String,
	},
	/// Authentication failure; never retried.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Input validation failure raised before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Response or payload shape did not match expectations.
	#[error(transparent)]
	Structural(#[from] StructuralError),
	/// Event-store failure while persisting an accepted webhook.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Retry budget exhausted; chains the last observed transient error.
	#[error("Max retries ({attempts}) exceeded for {operation}.")]
	RetriesExhausted {
		/// Name of the operation that kept failing.
		operation: &'static str,
		/// Number of attempts made.
		attempts: u32,
		/// Last transient error observed before giving up.
		#[source]
		source: BoxError,
	},
}
impl Error {
	/// Returns `true` when a retry with backoff is worthwhile.
	///
	/// Connection-level failures and timeouts are always transient; HTTP statuses are transient
	/// only for 429 and 5xx. Everything else (4xx, auth, validation, structural) is fatal.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Transport(_) => true,
			Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
			_ => false,
		}
	}
}

/// Transport-level failures (DNS, TCP, TLS, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its total timeout.
	#[error("Request exceeded the configured timeout.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Authentication failures; all fatal to the invocation that observed them.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Identity endpoint answered 401 during the token exchange; the personal access credential
	/// is presumed permanently invalid, so retrying would only burn quota.
	#[error("Identity provider rejected the client credentials: {body}.")]
	CredentialsRejected {
		/// Response body returned alongside the 401.
		body: String,
	},
	/// Webhook token header could not be parsed at all.
	#[error("Webhook token header is malformed.")]
	MalformedToken {
		/// Underlying JWT parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Webhook token header carries no `kid` field.
	#[error("Webhook token header is missing the `kid` field.")]
	MissingKeyId,
	/// No published key matches the token's `kid`, even after a forced key-set refresh.
	#[error("No published key matches kid `{kid}`.")]
	UnknownKeyId {
		/// Key identifier taken from the unverified token header.
		kid: String,
	},
	/// Signature or claims validation failed (bad signature, expired, audience/issuer mismatch).
	#[error("Webhook token failed signature or claims validation.")]
	TokenRejected {
		/// Underlying JWT validation failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
}

/// Input validation failures raised before any network call.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Check number text contained no digits after stripping.
	#[error("Invalid check number `{original}`: no digits remaining after stripping.")]
	CheckNumberEmpty {
		/// The original text as supplied by the caller.
		original: String,
	},
	/// Check number digits could not be converted to an integer.
	#[error("Invalid check number `{value}`: must be convertible to an integer.")]
	CheckNumberNotNumeric {
		/// The digit string that failed conversion.
		value: String,
	},
	/// Amount-paid text could not be parsed as a decimal number.
	#[error("Invalid amount paid `{value}`: must be convertible to a decimal number.")]
	AmountPaidNotNumeric {
		/// The text that failed parsing.
		value: String,
	},
	/// An update was requested with no fields set.
	#[error("At least one field must be provided for update.")]
	EmptyUpdate,
}

/// Unexpected wire shapes; fatal, no partial recovery.
#[derive(Debug, ThisError)]
pub enum StructuralError {
	/// Response body was not valid JSON at all.
	#[error("Response body is not valid JSON.")]
	InvalidJson {
		/// Underlying JSON parse failure.
		#[source]
		source: serde_json::Error,
	},
	/// Response parsed as JSON but did not match the expected schema.
	#[error("Response shape did not match the expected schema.")]
	UnexpectedShape {
		/// Parse failure annotated with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Identity lookup returned an empty `orgs` list.
	#[error("Identity response listed no organizations.")]
	NoOrganizations,
	/// Identity lookup was attempted before a bearer token existed.
	#[error("Identity lookup attempted without a bearer token.")]
	MissingBearerToken,
	/// Auth state was still incomplete after a successful refresh cycle.
	#[error("Auth state incomplete after refresh.")]
	IncompleteAuthState,
	/// A published key matched the `kid` but lacked usable RSA components.
	#[error("Published key `{kid}` is missing its RSA modulus or exponent.")]
	IncompleteKey {
		/// Key identifier of the unusable key.
		kid: String,
	},
	/// A published key carried RSA components that could not be decoded.
	#[error("Published key `{kid}` carries malformed RSA components.")]
	MalformedKey {
		/// Key identifier of the unusable key.
		kid: String,
		/// Underlying decoding failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Webhook body parsed as JSON but was not an object.
	#[error("Webhook body is not a JSON object.")]
	NotAnObject,
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A base URL could not be extended with a request path.
	#[error("Base URL cannot be extended with path `{path}`.")]
	InvalidPath {
		/// The relative path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Decodes a typed wire document, annotating shape mismatches with the offending path.
pub(crate) fn decode_document<T>(body: &str) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| StructuralError::UnexpectedShape { source }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn status_error(status: u16) -> Error {
		Error::UnexpectedStatus { status, body: String::new() }
	}

	#[test]
	fn transient_classification_matches_taxonomy() {
		assert!(Error::Transport(TransportError::Timeout).is_transient());
		assert!(
			Error::Transport(TransportError::Network {
				source: "connection reset".to_string().into()
			})
			.is_transient()
		);
		assert!(status_error(429).is_transient());
		assert!(status_error(500).is_transient());
		assert!(status_error(503).is_transient());

		assert!(!status_error(401).is_transient());
		assert!(!status_error(403).is_transient());
		assert!(!status_error(404).is_transient());
		assert!(!Error::Auth(AuthError::MissingKeyId).is_transient());
		assert!(!Error::Validation(ValidationError::EmptyUpdate).is_transient());
		assert!(!Error::Structural(StructuralError::NoOrganizations).is_transient());
	}

	#[test]
	fn exhaustion_error_chains_the_last_cause() {
		let err = Error::RetriesExhausted {
			operation: "fetch_bearer_token",
			attempts: 5,
			source: Box::new(TransportError::Timeout),
		};

		assert!(err.to_string().contains("fetch_bearer_token"));
		assert!(err.to_string().contains('5'));

		let source =
			StdError::source(&err).expect("Exhaustion error should expose the last cause.");

		assert_eq!(source.to_string(), TransportError::Timeout.to_string());
	}

	#[test]
	fn document_decoding_reports_the_offending_path() {
		#[derive(Debug, Deserialize)]
		struct Doc {
			#[allow(dead_code)]
			access_token: String,
		}

		let err = decode_document::<Doc>(r#"{"access_token":42}"#)
			.expect_err("Mismatched field type should fail decoding.");

		assert!(matches!(
			err,
			Error::Structural(StructuralError::UnexpectedShape { ref source })
				if source.path().to_string() == "access_token"
		));
	}
}

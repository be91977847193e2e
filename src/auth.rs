//! Credential configuration and authentication state shared with the gateway.

pub mod manager;

pub use manager::TokenManager;

// self
use crate::_prelude::*;

/// Safety margin subtracted from the token expiry before declaring it stale.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(60);

/// Default scope string requested during the personal-access-token exchange.
pub const DEFAULT_SCOPE: &str =
	"fv.api.gateway.access tenant filevine.v2.api.* email openid fv.auth.tenant.read";

/// Fixed credential set and identity endpoints for a single tenant integration.
#[derive(Clone)]
pub struct ApiCredentials {
	/// Token endpoint receiving the form-encoded credential exchange.
	pub identity_url: Url,
	/// Utility endpoint resolving the caller's org and user identifiers.
	pub util_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: String,
	/// Long-lived personal access token exchanged for short-lived bearer tokens.
	pub personal_access_token: String,
	/// Scope string sent with every token exchange.
	pub scope: String,
}
impl ApiCredentials {
	/// Creates a credential set with the default scope string.
	pub fn new(
		identity_url: Url,
		util_url: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		personal_access_token: impl Into<String>,
	) -> Self {
		Self {
			identity_url,
			util_url,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			personal_access_token: personal_access_token.into(),
			scope: DEFAULT_SCOPE.into(),
		}
	}

	/// Overrides the requested scope string.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}
}
impl Debug for ApiCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiCredentials")
			.field("identity_url", &self.identity_url.as_str())
			.field("util_url", &self.util_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("personal_access_token", &"<redacted>")
			.field("scope", &self.scope)
			.finish()
	}
}

/// Mutable authentication state owned by [`TokenManager`].
#[derive(Clone, Debug, Default)]
pub struct AuthState {
	/// Tenant host URL extracted from the identity lookup.
	pub tenant_url: Option<String>,
	/// Current short-lived bearer token.
	pub bearer_token: Option<String>,
	/// Absolute expiry of the bearer token; `None` until the first exchange.
	pub token_expires_at: Option<OffsetDateTime>,
	/// Organization identifier required by API headers.
	pub org_id: Option<i64>,
	/// Native user identifier required by API headers.
	pub user_id: Option<i64>,
}
impl AuthState {
	/// Returns `true` iff `now >= token_expires_at - 60s`, or no expiry is recorded yet.
	pub fn is_token_expired(&self, now: OffsetDateTime) -> bool {
		match self.token_expires_at {
			Some(expires_at) => now >= expires_at - EXPIRY_MARGIN,
			None => true,
		}
	}

	/// Returns `true` once both org and user identifiers are populated.
	pub fn has_identity(&self) -> bool {
		self.org_id.is_some() && self.user_id.is_some()
	}
}

/// Read-only view of a fully populated [`AuthState`], handed to API callers.
#[derive(Clone, Debug)]
pub struct AuthSnapshot {
	/// Bearer token guaranteed fresh at snapshot time.
	pub bearer_token: String,
	/// Organization identifier for the `x-fv-orgid` header.
	pub org_id: i64,
	/// Native user identifier for the `x-fv-userid` header.
	pub user_id: i64,
	/// Tenant host URL, when the identity lookup supplied one.
	pub tenant_url: Option<String>,
}

//! Token lifecycle management: credential exchange, expiry tracking, and identity derivation.
//!
//! [`TokenManager`] owns the mutable [`AuthState`] behind a single async mutex. Holding the lock
//! across the whole of [`TokenManager::ensure_auth_state`] makes refreshes single-flight:
//! concurrent callers await the in-flight exchange instead of issuing duplicate token requests.

// self
use crate::{
	_prelude::*,
	auth::{ApiCredentials, AuthSnapshot, AuthState},
	clock::{Clock, SystemClock},
	error::{AuthError, StructuralError, TransportError, decode_document},
	retry::RetryPolicy,
};

/// Token-endpoint response for the personal-access-token grant.
#[derive(Debug, Deserialize)]
struct TokenGrant {
	access_token: String,
	expires_in: i64,
}

/// Identity-lookup response; only the fields the integration consumes are modeled.
#[derive(Debug, Deserialize)]
struct IdentityDocument {
	orgs: Vec<OrgMembership>,
	user: UserDocument,
}
#[derive(Debug, Deserialize)]
struct OrgMembership {
	#[serde(rename = "orgId")]
	org_id: i64,
	tenant: TenantDocument,
}
#[derive(Debug, Deserialize)]
struct TenantDocument {
	#[serde(rename = "hostNameAsUrl")]
	host_name_as_url: String,
}
#[derive(Debug, Deserialize)]
struct UserDocument {
	#[serde(rename = "userId")]
	user_id: NativeId,
}
#[derive(Debug, Deserialize)]
struct NativeId {
	native: i64,
}

/// Owns the OAuth credential exchange, token expiry tracking, and org/user identity derivation.
pub struct TokenManager {
	credentials: ApiCredentials,
	retry: RetryPolicy,
	timeout: StdDuration,
	http: ReqwestClient,
	clock: Arc<dyn Clock>,
	state: AsyncMutex<AuthState>,
}
impl TokenManager {
	/// Creates a manager with a default HTTP client, retry policy, and 30-second timeout.
	pub fn new(credentials: ApiCredentials) -> Self {
		Self {
			credentials,
			retry: RetryPolicy::default(),
			timeout: StdDuration::from_secs(30),
			http: ReqwestClient::default(),
			clock: Arc::new(SystemClock),
			state: AsyncMutex::new(AuthState::default()),
		}
	}

	/// Replaces the HTTP client used for identity traffic.
	pub fn with_http_client(mut self, http: ReqwestClient) -> Self {
		self.http = http;

		self
	}

	/// Replaces the retry policy applied to both fetch operations.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Replaces the per-request total timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Replaces the clock consulted for expiry checks (tests inject [`ManualClock`]).
	///
	/// [`ManualClock`]: crate::clock::ManualClock
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns a copy of the current auth state for inspection.
	pub async fn auth_state(&self) -> AuthState {
		self.state.lock().await.clone()
	}

	/// Idempotent guard invoked before every outbound API call.
	///
	/// Refreshes the bearer token only when absent or inside the expiry margin and fetches the
	/// org/user identity only when absent, so repeated calls within the token's lifetime incur no
	/// network cost.
	pub async fn ensure_auth_state(&self) -> Result<AuthSnapshot> {
		let mut state = self.state.lock().await;
		let now = self.clock.now();

		if state.bearer_token.is_none() || state.is_token_expired(now) {
			tracing::info!("bearer token missing or expiring; refreshing");
			self.refresh_bearer_token(&mut state).await?;
		}
		if !state.has_identity() {
			tracing::info!("org/user identifiers missing; fetching");
			self.refresh_identity(&mut state).await?;
		}

		match (&state.bearer_token, state.org_id, state.user_id) {
			(Some(bearer_token), Some(org_id), Some(user_id)) => Ok(AuthSnapshot {
				bearer_token: bearer_token.clone(),
				org_id,
				user_id,
				tenant_url: state.tenant_url.clone(),
			}),
			_ => Err(StructuralError::IncompleteAuthState.into()),
		}
	}

	/// Forces a bearer-token exchange regardless of the cached expiry.
	pub async fn fetch_bearer_token(&self) -> Result<String> {
		let mut state = self.state.lock().await;

		self.refresh_bearer_token(&mut state).await
	}

	/// Forces an identity lookup using the currently cached bearer token.
	pub async fn fetch_user_org_ids(&self) -> Result<(i64, i64)> {
		let mut state = self.state.lock().await;

		self.refresh_identity(&mut state).await
	}

	async fn refresh_bearer_token(&self, state: &mut AuthState) -> Result<String> {
		let grant = self
			.retry
			.run("fetch_bearer_token", || self.token_request())
			.await
			.inspect_err(|err| {
				if matches!(err, Error::Auth(AuthError::CredentialsRejected { .. })) {
					tracing::warn!(
						"401 during token fetch; credentials are presumed invalid, not retrying"
					);
				}
			})?;
		let now = self.clock.now();

		state.bearer_token = Some(grant.access_token.clone());
		state.token_expires_at = Some(now + Duration::seconds(grant.expires_in));

		tracing::info!("bearer token fetched");

		Ok(grant.access_token)
	}

	async fn token_request(&self) -> Result<TokenGrant> {
		let form = [
			("grant_type", "personal_access_token"),
			("token", self.credentials.personal_access_token.as_str()),
			("client_id", self.credentials.client_id.as_str()),
			("client_secret", self.credentials.client_secret.as_str()),
			("scope", self.credentials.scope.as_str()),
		];
		let response = self
			.http
			.post(self.credentials.identity_url.clone())
			.timeout(self.timeout)
			.form(&form)
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.text().await.map_err(TransportError::from)?;

		if status != StatusCode::OK {
			tracing::error!(status = status.as_u16(), "token fetch failed");

			if status == StatusCode::UNAUTHORIZED {
				return Err(AuthError::CredentialsRejected { body }.into());
			}

			return Err(Error::UnexpectedStatus { status: status.as_u16(), body });
		}

		decode_document(&body)
	}

	async fn refresh_identity(&self, state: &mut AuthState) -> Result<(i64, i64)> {
		let bearer_token =
			state.bearer_token.clone().ok_or(StructuralError::MissingBearerToken)?;
		let document =
			self.retry.run("fetch_user_org_ids", || self.identity_request(&bearer_token)).await?;
		let org = document.orgs.into_iter().next().ok_or(StructuralError::NoOrganizations)?;
		let user_id = document.user.user_id.native;

		state.tenant_url = Some(org.tenant.host_name_as_url);
		state.org_id = Some(org.org_id);
		state.user_id = Some(user_id);

		tracing::info!("user/org identifiers fetched");

		Ok((user_id, org.org_id))
	}

	async fn identity_request(&self, bearer_token: &str) -> Result<IdentityDocument> {
		let response = self
			.http
			.post(self.credentials.util_url.clone())
			.timeout(self.timeout)
			.bearer_auth(bearer_token)
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.text().await.map_err(TransportError::from)?;

		if status != StatusCode::OK {
			tracing::error!(status = status.as_u16(), "identity fetch failed");

			return Err(Error::UnexpectedStatus { status: status.as_u16(), body });
		}

		decode_document(&body)
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("credentials", &self.credentials)
			.field("retry", &self.retry)
			.field("timeout", &self.timeout)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::StructuralError;

	#[test]
	fn identity_document_extracts_nested_fields() {
		let body = r#"{
			"orgs": [
				{"orgId": 4912, "tenant": {"hostNameAsUrl": "https://tenant.example.com"}},
				{"orgId": 9999, "tenant": {"hostNameAsUrl": "https://other.example.com"}}
			],
			"user": {"userId": {"native": 80231}}
		}"#;
		let document: IdentityDocument =
			decode_document(body).expect("Identity fixture should decode.");
		let org = document.orgs.into_iter().next().expect("First org should be present.");

		assert_eq!(org.org_id, 4912);
		assert_eq!(org.tenant.host_name_as_url, "https://tenant.example.com");
		assert_eq!(document.user.user_id.native, 80231);
	}

	#[test]
	fn identity_document_rejects_missing_keys() {
		let err = decode_document::<IdentityDocument>(r#"{"orgs": []}"#)
			.expect_err("Missing `user` key should fail decoding.");

		assert!(matches!(err, Error::Structural(StructuralError::UnexpectedShape { .. })));
	}

	#[test]
	fn token_grant_decodes_expiry() {
		let grant: TokenGrant = decode_document(r#"{"access_token":"abc","expires_in":3600}"#)
			.expect("Token grant fixture should decode.");

		assert_eq!(grant.access_token, "abc");
		assert_eq!(grant.expires_in, 3600);
	}
}

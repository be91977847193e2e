//! Authenticated REST gateway for project collection items.
//!
//! Every operation first runs [`TokenManager::ensure_auth_state`] to obtain a fresh
//! [`AuthSnapshot`], then issues the request through the retry executor with a fresh connection
//! per attempt. Non-200 responses surface as [`Error::UnexpectedStatus`] carrying the body text;
//! bodies that fail JSON decoding surface as a distinct structural error.

pub mod update;

pub use update::ExpenseItemUpdate;

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{
	_prelude::*,
	auth::{AuthSnapshot, TokenManager},
	error::{ConfigError, StructuralError, TransportError},
	retry::RetryPolicy,
};

/// Fixed field selection requested when fetching an expense item.
const EXPENSE_ITEM_FIELDS: &str = "itemId,checkhistory,status,title,createdDate,notes,discription,transactionType,amount,payee,balanceDue,toggleQuickbooksIntegration,iscreditcard,typeofcheckrequest";
/// Fixed field selection requested when fetching project details.
const PROJECT_FIELDS: &str = "number,projectId,clientName";

/// Builds authenticated requests against the external REST API.
pub struct ApiGateway {
	api_base_url: Url,
	token_manager: Arc<TokenManager>,
	retry: RetryPolicy,
	timeout: StdDuration,
	http: ReqwestClient,
}
impl ApiGateway {
	/// Creates a gateway with a default HTTP client, retry policy, and 30-second timeout.
	pub fn new(api_base_url: Url, token_manager: Arc<TokenManager>) -> Self {
		Self {
			api_base_url,
			token_manager,
			retry: RetryPolicy::default(),
			timeout: StdDuration::from_secs(30),
			http: ReqwestClient::default(),
		}
	}

	/// Replaces the HTTP client used for API traffic.
	pub fn with_http_client(mut self, http: ReqwestClient) -> Self {
		self.http = http;

		self
	}

	/// Replaces the retry policy applied to every call.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Replaces the per-request total timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Fetches a collection item with the fixed expense field selection.
	pub async fn get_expense_item(
		&self,
		project_id: i64,
		section_selector: &str,
		item_id: &str,
	) -> Result<Value> {
		let url = self.collection_url(project_id, section_selector, item_id)?;

		self.get_json(url, &[("requestedFields", EXPENSE_ITEM_FIELDS.into())]).await
	}

	/// Fetches project metadata (number, client name).
	pub async fn get_project_details(&self, project_id: i64) -> Result<Value> {
		let url = self.join(&format!("fv-app/v2/Projects/{project_id}"))?;

		self.get_json(url, &[("requestedFields", PROJECT_FIELDS.into())]).await
	}

	/// Applies a partial update to an expense item.
	///
	/// Validation and numeric coercion happen before any network call; an empty update or a bad
	/// coercion fails with [`ValidationError`](crate::error::ValidationError) without touching the
	/// wire.
	pub async fn update_expense_item(
		&self,
		project_id: i64,
		section_selector: &str,
		item_id: &str,
		update: ExpenseItemUpdate,
	) -> Result<Value> {
		let payload = update.into_payload(item_id)?;
		let url = self.collection_url(project_id, section_selector, item_id)?;

		self.patch_json(url, payload).await
	}

	async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<Value> {
		let auth = self.token_manager.ensure_auth_state().await?;

		self.retry.run("api_get", || self.get_once(&url, query, &auth)).await
	}

	async fn patch_json(&self, url: Url, payload: Value) -> Result<Value> {
		let auth = self.token_manager.ensure_auth_state().await?;

		self.retry.run("api_patch", || self.patch_once(&url, &payload, &auth)).await
	}

	async fn get_once(&self, url: &Url, query: &[(&str, String)], auth: &AuthSnapshot) -> Result<Value> {
		tracing::info!(url = %url, "requesting URL");

		let response = self
			.authenticated(self.http.get(url.clone()), auth)
			.query(query)
			.send()
			.await
			.map_err(TransportError::from)?;

		Self::read_json(response).await
	}

	async fn patch_once(&self, url: &Url, payload: &Value, auth: &AuthSnapshot) -> Result<Value> {
		tracing::info!(url = %url, "patching URL");

		let response = self
			.authenticated(self.http.patch(url.clone()), auth)
			.json(payload)
			.send()
			.await
			.map_err(TransportError::from)?;

		Self::read_json(response).await
	}

	fn authenticated(
		&self,
		request: reqwest::RequestBuilder,
		auth: &AuthSnapshot,
	) -> reqwest::RequestBuilder {
		request
			.timeout(self.timeout)
			.bearer_auth(&auth.bearer_token)
			.header("x-fv-orgid", auth.org_id)
			.header("x-fv-userid", auth.user_id)
			.header(ACCEPT, "application/json")
	}

	async fn read_json(response: reqwest::Response) -> Result<Value> {
		let status = response.status();
		let body = response.text().await.map_err(TransportError::from)?;

		if status != StatusCode::OK {
			tracing::error!(status = status.as_u16(), "request failed");

			return Err(Error::UnexpectedStatus { status: status.as_u16(), body });
		}

		serde_json::from_str(&body).map_err(|source| {
			tracing::error!("response body is not valid JSON");

			StructuralError::InvalidJson { source }.into()
		})
	}

	fn collection_url(
		&self,
		project_id: i64,
		section_selector: &str,
		item_id: &str,
	) -> Result<Url> {
		self.join(&format!("fv-app/v2/Projects/{project_id}/Collections/{section_selector}/{item_id}"))
	}

	fn join(&self, path: &str) -> Result<Url> {
		// Plain concatenation keeps any path segments of the base URL, which `Url::join` would
		// drop when the base does not end with a slash.
		let base = self.api_base_url.as_str().trim_end_matches('/');

		Url::parse(&format!("{base}/{path}"))
			.map_err(|source| ConfigError::InvalidPath { path: path.into(), source }.into())
	}
}
impl Debug for ApiGateway {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiGateway")
			.field("api_base_url", &self.api_base_url.as_str())
			.field("retry", &self.retry)
			.field("timeout", &self.timeout)
			.finish()
	}
}

//! JWKS discovery, caching, and refresh.
//!
//! The cache is an explicitly owned object rather than ambient process state: callers inject a
//! [`KeySetFetcher`] and a [`Clock`], so tests can substitute a counting fake for either. The
//! cached set is replaced wholesale on refresh and emptied before any fetch, so a failed refresh
//! never leaves a stale set behind. An async mutex serializes refreshes; concurrent callers await
//! the in-flight fetch instead of issuing duplicates.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	error::{AuthError, TransportError, decode_document},
};

/// Fixed time-to-live of a cached key set.
pub const KEY_SET_TTL: Duration = Duration::seconds(3600);

/// A single public-key record from a JWKS document.
#[derive(Clone, Debug, Deserialize)]
pub struct JsonWebKey {
	/// Key type (e.g. `RSA`).
	pub kty: String,
	/// Key identifier matched against the token header's `kid`.
	pub kid: Option<String>,
	/// Declared algorithm, when published.
	pub alg: Option<String>,
	/// Key use (`sig`/`enc`), when published.
	#[serde(rename = "use")]
	pub key_use: Option<String>,
	/// RSA modulus, base64url-encoded.
	pub n: Option<String>,
	/// RSA public exponent, base64url-encoded.
	pub e: Option<String>,
}

/// A key-set document as served by the identity provider.
#[derive(Clone, Debug, Deserialize)]
pub struct KeySetDocument {
	/// Published public keys.
	pub keys: Vec<JsonWebKey>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
	jwks_uri: String,
}

/// Boxed future returned by [`KeySetFetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<KeySetDocument>> + 'a + Send>>;

/// Source of key-set documents, abstracted so tests can substitute a fake.
pub trait KeySetFetcher
where
	Self: Send + Sync,
{
	/// Fetches a fresh key-set document.
	fn fetch(&self) -> FetchFuture<'_>;
}

/// Production fetcher that walks the OpenID discovery document to the key-set endpoint.
#[derive(Clone, Debug)]
pub struct HttpKeySetFetcher {
	authority: Url,
	timeout: StdDuration,
	http: ReqwestClient,
}
impl HttpKeySetFetcher {
	/// Creates a fetcher for the provided identity authority with a 5-second timeout.
	pub fn new(authority: Url) -> Self {
		Self { authority, timeout: StdDuration::from_secs(5), http: ReqwestClient::default() }
	}

	/// Replaces the HTTP client used for discovery traffic.
	pub fn with_http_client(mut self, http: ReqwestClient) -> Self {
		self.http = http;

		self
	}

	/// Replaces the per-request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	async fn get_document<T>(&self, url: Url) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let response = self
			.http
			.get(url)
			.timeout(self.timeout)
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.text().await.map_err(TransportError::from)?;

		if status != StatusCode::OK {
			return Err(Error::UnexpectedStatus { status: status.as_u16(), body });
		}

		decode_document(&body)
	}

	async fn fetch_key_set(&self) -> Result<KeySetDocument> {
		let base = self.authority.as_str().trim_end_matches('/');
		let discovery_url = Url::parse(&format!("{base}/.well-known/openid-configuration"))
			.map_err(|source| crate::error::ConfigError::InvalidPath {
				path: ".well-known/openid-configuration".into(),
				source,
			})?;
		let discovery: DiscoveryDocument = self.get_document(discovery_url).await?;
		let jwks_url = Url::parse(&discovery.jwks_uri).map_err(|source| {
			crate::error::ConfigError::InvalidPath { path: discovery.jwks_uri.clone(), source }
		})?;

		self.get_document(jwks_url).await
	}
}
impl KeySetFetcher for HttpKeySetFetcher {
	fn fetch(&self) -> FetchFuture<'_> {
		Box::pin(self.fetch_key_set())
	}
}

#[derive(Debug)]
struct CachedKeySet {
	keys: HashMap<String, JsonWebKey>,
	fetched_at: OffsetDateTime,
}

/// Owned key-set cache with a fixed TTL and single-flight refresh.
pub struct JwksCache {
	fetcher: Arc<dyn KeySetFetcher>,
	clock: Arc<dyn Clock>,
	ttl: Duration,
	state: AsyncMutex<Option<CachedKeySet>>,
}
impl JwksCache {
	/// Creates a cache over the provided fetcher with the standard one-hour TTL.
	pub fn new(fetcher: Arc<dyn KeySetFetcher>) -> Self {
		Self { fetcher, clock: Arc::new(SystemClock), ttl: KEY_SET_TTL, state: AsyncMutex::new(None) }
	}

	/// Replaces the clock consulted for freshness checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the cache TTL.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Returns the published key matching `kid`, refreshing the cache as needed.
	///
	/// When the cached set carries no matching key, one forced refresh runs and the lookup is
	/// retried before failing with [`AuthError::UnknownKeyId`], so at most two fetches happen per
	/// lookup.
	pub async fn signing_key(&self, kid: &str) -> Result<JsonWebKey> {
		let mut state = self.state.lock().await;
		let now = self.clock.now();

		if !matches!(&*state, Some(cached) if now - cached.fetched_at < self.ttl) {
			self.refresh(&mut state, now).await?;
		}
		if let Some(key) = Self::lookup(&state, kid) {
			return Ok(key);
		}

		// Unknown kid: the provider may have rotated keys since this set was fetched, so refresh
		// once more before giving up.
		self.refresh(&mut state, now).await?;

		Self::lookup(&state, kid).ok_or_else(|| AuthError::UnknownKeyId { kid: kid.into() }.into())
	}

	async fn refresh(&self, state: &mut Option<CachedKeySet>, now: OffsetDateTime) -> Result<()> {
		// Invalidate first so a failed fetch leaves the cache empty, never stale.
		*state = None;

		let document = self.fetcher.fetch().await.inspect_err(|err| {
			tracing::error!(error = %err, "key set refresh failed; cache invalidated");
		})?;
		let keys: HashMap<_, _> = document
			.keys
			.into_iter()
			.filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
			.collect();

		tracing::info!(key_count = keys.len(), "key set cache refreshed");

		*state = Some(CachedKeySet { keys, fetched_at: now });

		Ok(())
	}

	fn lookup(state: &Option<CachedKeySet>, kid: &str) -> Option<JsonWebKey> {
		state.as_ref().and_then(|cached| cached.keys.get(kid).cloned())
	}
}
impl Debug for JwksCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwksCache").field("ttl", &self.ttl).finish()
	}
}

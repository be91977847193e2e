//! RS512 verification of inbound webhook tokens against the cached key set.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
// self
use crate::{
	_prelude::*,
	error::{AuthError, StructuralError},
	webhook::jwks::{JsonWebKey, JwksCache},
};

/// Validates signed webhook tokens issued by the identity provider.
///
/// Verification is three stages: extract the `kid` from the unverified header, resolve the
/// matching published key through the [`JwksCache`], then verify the RS512 signature together
/// with the audience and issuer claims. Every failure maps to an [`AuthError`], distinguishable
/// from transport or server errors at the webhook boundary.
pub struct WebhookVerifier {
	keys: JwksCache,
	audience: String,
	issuer: String,
}
impl WebhookVerifier {
	/// Creates a verifier over the provided cache and expected claim values.
	pub fn new(keys: JwksCache, audience: impl Into<String>, issuer: impl Into<String>) -> Self {
		Self { keys, audience: audience.into(), issuer: issuer.into() }
	}

	/// Verifies the token's signature, audience, issuer, and expiry.
	pub async fn verify(&self, token: &str) -> Result<()> {
		let header =
			decode_header(token).map_err(|source| AuthError::MalformedToken { source })?;
		let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
		let key = self.keys.signing_key(&kid).await?;
		let decoding_key = Self::decoding_key(&kid, &key)?;
		let mut validation = Validation::new(Algorithm::RS512);

		validation.set_audience(&[self.audience.as_str()]);
		validation.set_issuer(&[self.issuer.as_str()]);

		decode::<Value>(token, &decoding_key, &validation)
			.map_err(|source| AuthError::TokenRejected { source })?;

		tracing::debug!("webhook token verified");

		Ok(())
	}

	fn decoding_key(kid: &str, key: &JsonWebKey) -> Result<DecodingKey> {
		let (Some(n), Some(e)) = (&key.n, &key.e) else {
			return Err(StructuralError::IncompleteKey { kid: kid.into() }.into());
		};

		DecodingKey::from_rsa_components(n, e)
			.map_err(|source| StructuralError::MalformedKey { kid: kid.into(), source }.into())
	}
}
impl Debug for WebhookVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebhookVerifier")
			.field("audience", &self.audience)
			.field("issuer", &self.issuer)
			.finish()
	}
}

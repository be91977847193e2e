//! Shared fixtures for webhook integration tests: a freshly minted RSA keypair, its JWKS
//! rendering, and an RS512 token signer.

// std
use std::time::{SystemTime, UNIX_EPOCH};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{
	RsaPrivateKey, RsaPublicKey,
	pkcs8::{EncodePrivateKey, LineEnding},
	traits::PublicKeyParts,
};
use serde_json::{Value, json};
// self
use filevine_bridge::jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

/// Signing material shared between the mock identity provider and the token signer.
pub struct SigningKeys {
	pub kid: &'static str,
	pub encoding_key: EncodingKey,
	pub jwks: Value,
}

/// Generates a 2048-bit RSA keypair and renders its public half as a JWKS document.
pub fn generate_signing_keys(kid: &'static str) -> SigningKeys {
	let mut rng = rand::thread_rng();
	let private_key =
		RsaPrivateKey::new(&mut rng, 2048).expect("RSA key generation should succeed.");
	let pem = private_key
		.to_pkcs8_pem(LineEnding::LF)
		.expect("Private key should encode as PKCS#8 PEM.");
	let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
		.expect("PEM-encoded private key should load as an encoding key.");
	let public_key = RsaPublicKey::from(&private_key);
	let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
	let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
	let jwks = json!({
		"keys": [
			{ "kty": "RSA", "kid": kid, "alg": "RS512", "use": "sig", "n": n, "e": e },
		],
	});

	SigningKeys { kid, encoding_key, jwks }
}

/// Signs an RS512 token; `exp_offset_secs` is relative to now (negative ⇒ already expired).
pub fn sign_token(
	keys: &SigningKeys,
	kid: &str,
	audience: &str,
	issuer: &str,
	exp_offset_secs: i64,
) -> String {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be past the epoch.")
		.as_secs() as i64;
	let claims = json!({
		"aud": audience,
		"iss": issuer,
		"iat": now - 10,
		"exp": now + exp_offset_secs,
	});
	let mut header = Header::new(Algorithm::RS512);

	header.kid = Some(kid.into());

	encode(&header, &claims, &keys.encoding_key).expect("Token signing should succeed.")
}

//! Filevine case-management integration: token lifecycle, retrying API gateway, and signed
//! webhook ingestion in one crate.
//!
//! The crate splits into two halves that share one error taxonomy:
//!
//! - Outbound: [`auth::TokenManager`] exchanges a long-lived personal access token for short-lived
//!   bearer tokens and derives the org/user identity, while [`gateway::ApiGateway`] issues
//!   authenticated GET/PATCH calls through the [`retry::RetryPolicy`] executor.
//! - Inbound: [`webhook::WebhookVerifier`] validates RS512-signed webhook tokens against a cached
//!   JWKS, and [`webhook::EventIngestor`] filters and persists accepted payloads into an
//!   [`store::EventStore`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod retry;
pub mod store;
pub mod webhook;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
pub use reqwest;
pub use url;
#[cfg(test)] use {base64 as _, httpmock as _, rand as _, rsa as _};

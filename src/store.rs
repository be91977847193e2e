//! Storage contract for accepted webhook events, plus the built-in in-memory backend.
//!
//! The persistent store is an opaque append target: the ingestor creates each record once with
//! `processed = false`, and an external processor (out of scope here) later flips the flag.

// self
use crate::_prelude::*;

/// Boxed future returned by [`EventStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persisted record created once per accepted webhook.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookEvent {
	/// Event name reported by the provider (`Event`).
	pub event_type: Option<String>,
	/// Object kind reported by the provider (`Object`).
	pub object_type: Option<String>,
	/// Acting user identifier (`UserId`).
	pub user_id: Option<i64>,
	/// Project identifier (`ProjectId`).
	pub project_id: Option<i64>,
	/// Field selector from the object identifier.
	pub field_selector: Option<String>,
	/// Project type identifier from the object identifier.
	pub project_type_id: Option<String>,
	/// Section selector from the object identifier.
	pub section_selector: Option<String>,
	/// Collection item identifier.
	pub item_id: Option<String>,
	/// Field identifier.
	pub field_id: Option<i64>,
	/// Provider-reported event timestamp.
	pub timestamp: Option<String>,
	/// Server-assigned receipt instant.
	pub received_at: OffsetDateTime,
	/// Processing flag; always `false` at creation.
	pub processed: bool,
	/// Instant the external processor completed, if it has.
	pub processed_at: Option<OffsetDateTime>,
	/// Full original body, retained verbatim.
	pub raw_payload: Value,
}

/// Storage backend contract implemented by event stores.
pub trait EventStore
where
	Self: Send + Sync,
{
	/// Appends a new event record.
	fn append(&self, event: WebhookEvent) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`EventStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The event record could not be encoded into the backend's document format.
	#[error("Webhook event could not be encoded for storage: {reason}.")]
	Encode {
		/// What the backend's codec reported.
		reason: String,
	},
	/// The backend rejected or failed the append.
	#[error("Webhook event append failed: {reason}.")]
	Append {
		/// What the storage engine reported.
		reason: String,
	},
}

/// Thread-safe in-memory [`EventStore`] for local development and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryEventStore(Arc<RwLock<Vec<WebhookEvent>>>);
impl MemoryEventStore {
	/// Returns a snapshot of every appended event, in arrival order.
	pub fn events(&self) -> Vec<WebhookEvent> {
		self.0.read().clone()
	}

	/// Number of appended events.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no events have been appended.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl EventStore for MemoryEventStore {
	fn append(&self, event: WebhookEvent) -> StoreFuture<'_, ()> {
		let events = self.0.clone();

		Box::pin(async move {
			events.write().push(event);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	fn event(section: &str) -> WebhookEvent {
		WebhookEvent {
			event_type: Some("PhaseChanged".into()),
			object_type: Some("Project".into()),
			user_id: Some(80231),
			project_id: Some(12361871),
			field_selector: Some("sendtofvcheckreq".into()),
			project_type_id: Some("32506".into()),
			section_selector: Some(section.into()),
			item_id: Some("item-1".into()),
			field_id: Some(55550550),
			timestamp: Some("2025-06-01T12:00:00Z".into()),
			received_at: OffsetDateTime::now_utc(),
			processed: false,
			processed_at: None,
			raw_payload: serde_json::json!({"Event": "PhaseChanged"}),
		}
	}

	#[tokio::test]
	async fn append_preserves_arrival_order() {
		let store = MemoryEventStore::default();

		store.append(event("expenses")).await.expect("First append should succeed.");
		store.append(event("timeentries")).await.expect("Second append should succeed.");

		let events = store.events();

		assert_eq!(events.len(), 2);
		assert_eq!(events[0].section_selector.as_deref(), Some("expenses"));
		assert_eq!(events[1].section_selector.as_deref(), Some("timeentries"));
		assert!(events.iter().all(|event| !event.processed));
	}

	#[test]
	fn append_failure_surfaces_through_the_crate_error() {
		let store_error = StoreError::Append { reason: "document collection unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("document collection unreachable"));
	}

	#[test]
	fn event_round_trips_through_serde() {
		let original = event("expenses");
		let payload =
			serde_json::to_string(&original).expect("Event should serialize to JSON.");
		let decoded: WebhookEvent =
			serde_json::from_str(&payload).expect("Serialized event should deserialize.");

		assert_eq!(decoded.item_id, original.item_id);
		assert_eq!(decoded.received_at, original.received_at);
		assert!(!decoded.processed);
	}
}

//! Filtering and persistence of verified webhook payloads.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	error::StructuralError,
	store::{EventStore, WebhookEvent},
};

/// Section selector accepted for persistence.
pub const ACCEPTED_SECTION: &str = "expenses";
/// Field selector accepted for persistence.
pub const ACCEPTED_FIELD: &str = "sendtofvcheckreq";

/// Typed view of an inbound webhook body; unknown fields are ignored, known fields optional.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookPayload {
	/// Event name (`Event`).
	pub event: Option<String>,
	/// Object kind (`Object`).
	pub object: Option<String>,
	/// Acting user identifier.
	pub user_id: Option<i64>,
	/// Project identifier.
	pub project_id: Option<i64>,
	/// Identifier of the object the event concerns.
	#[serde(default)]
	pub object_id: ObjectIdentifier,
	/// Free-form companion fields.
	#[serde(default)]
	pub other: OtherFields,
	/// Provider-reported event timestamp.
	pub timestamp: Option<String>,
}
impl WebhookPayload {
	/// Acceptance filter: only expense-section events for the check-request field are persisted.
	pub fn matches_filter(&self) -> bool {
		self.object_id.section_selector.as_deref() == Some(ACCEPTED_SECTION)
			&& self.object_id.field_selector.as_deref() == Some(ACCEPTED_FIELD)
	}
}

/// Object-identifier block of a webhook payload.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectIdentifier {
	/// Section selector (e.g. `expenses`).
	pub section_selector: Option<String>,
	/// Field selector the event fired for.
	pub field_selector: Option<String>,
	/// Project type identifier.
	pub project_type_id: Option<String>,
}

/// `Other` block of a webhook payload.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OtherFields {
	/// Collection item identifier.
	pub item_id: Option<String>,
	/// Field identifier.
	pub field_id: Option<i64>,
}

/// Outcome of ingesting one verified payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
	/// Payload matched the acceptance filter and was appended to the store.
	Stored,
	/// Payload was acknowledged but did not match the filter; nothing persisted.
	Skipped,
}

/// Filters verified payloads and forwards matching ones to the event store.
pub struct EventIngestor {
	store: Arc<dyn EventStore>,
	clock: Arc<dyn Clock>,
}
impl EventIngestor {
	/// Creates an ingestor appending to the provided store.
	pub fn new(store: Arc<dyn EventStore>) -> Self {
		Self { store, clock: Arc::new(SystemClock) }
	}

	/// Replaces the clock used to stamp `received_at`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Parses, filters, and (when matching) persists one raw webhook body.
	pub async fn ingest(&self, raw: Value) -> Result<IngestOutcome> {
		if !raw.is_object() {
			return Err(StructuralError::NotAnObject.into());
		}

		let payload: WebhookPayload = serde_path_to_error::deserialize(raw.clone())
			.map_err(|source| StructuralError::UnexpectedShape { source })?;

		if !payload.matches_filter() {
			tracing::info!(
				event = payload.event.as_deref().unwrap_or("<unset>"),
				"payload does not match acceptance filter; skipping storage",
			);

			return Ok(IngestOutcome::Skipped);
		}

		let event = Self::flatten(payload, raw, self.clock.now());

		self.store.append(event).await?;

		tracing::info!("webhook payload stored");

		Ok(IngestOutcome::Stored)
	}

	fn flatten(payload: WebhookPayload, raw: Value, received_at: OffsetDateTime) -> WebhookEvent {
		WebhookEvent {
			event_type: payload.event,
			object_type: payload.object,
			user_id: payload.user_id,
			project_id: payload.project_id,
			field_selector: payload.object_id.field_selector,
			project_type_id: payload.object_id.project_type_id,
			section_selector: payload.object_id.section_selector,
			item_id: payload.other.item_id,
			field_id: payload.other.field_id,
			timestamp: payload.timestamp,
			received_at,
			processed: false,
			processed_at: None,
			raw_payload: raw,
		}
	}
}
impl Debug for EventIngestor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EventIngestor").finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros;
	// self
	use super::*;
	use crate::{clock::ManualClock, store::MemoryEventStore};

	fn payload(section: &str, field: &str) -> Value {
		json!({
			"Event": "CollectionItemUpdated",
			"Object": "CollectionItem",
			"UserId": 80231,
			"ProjectId": 12361871,
			"ObjectId": {
				"SectionSelector": section,
				"FieldSelector": field,
				"ProjectTypeId": "32506",
			},
			"Other": {
				"ItemId": "c1c738ba-2409-4109-a44a-2d0b8bf56dea",
				"FieldId": 55550550,
			},
			"Timestamp": "2025-06-01T12:00:00Z",
		})
	}

	fn ingestor(store: &MemoryEventStore) -> EventIngestor {
		let clock = ManualClock::starting_at(macros::datetime!(2025-06-01 12:00 UTC));

		EventIngestor::new(Arc::new(store.clone())).with_clock(Arc::new(clock))
	}

	#[tokio::test]
	async fn matching_payload_is_flattened_and_stored() {
		let store = MemoryEventStore::default();
		let outcome = ingestor(&store)
			.ingest(payload(ACCEPTED_SECTION, ACCEPTED_FIELD))
			.await
			.expect("Matching payload should ingest.");

		assert_eq!(outcome, IngestOutcome::Stored);

		let events = store.events();

		assert_eq!(events.len(), 1);

		let event = &events[0];

		assert_eq!(event.event_type.as_deref(), Some("CollectionItemUpdated"));
		assert_eq!(event.section_selector.as_deref(), Some("expenses"));
		assert_eq!(event.field_selector.as_deref(), Some("sendtofvcheckreq"));
		assert_eq!(event.item_id.as_deref(), Some("c1c738ba-2409-4109-a44a-2d0b8bf56dea"));
		assert_eq!(event.field_id, Some(55550550));
		assert_eq!(event.received_at, macros::datetime!(2025-06-01 12:00 UTC));
		assert!(!event.processed);
		assert!(event.processed_at.is_none());
		assert_eq!(event.raw_payload, payload(ACCEPTED_SECTION, ACCEPTED_FIELD));
	}

	#[tokio::test]
	async fn non_matching_section_is_acknowledged_without_storage() {
		let store = MemoryEventStore::default();
		let outcome = ingestor(&store)
			.ingest(payload("timeentries", ACCEPTED_FIELD))
			.await
			.expect("Non-matching payload should still be acknowledged.");

		assert_eq!(outcome, IngestOutcome::Skipped);
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn non_matching_field_is_acknowledged_without_storage() {
		let store = MemoryEventStore::default();
		let outcome = ingestor(&store)
			.ingest(payload(ACCEPTED_SECTION, "someotherfield"))
			.await
			.expect("Non-matching payload should still be acknowledged.");

		assert_eq!(outcome, IngestOutcome::Skipped);
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn non_object_body_is_structural() {
		let store = MemoryEventStore::default();
		let err = ingestor(&store)
			.ingest(json!(["not", "an", "object"]))
			.await
			.expect_err("Array body should be rejected.");

		assert!(matches!(err, Error::Structural(StructuralError::NotAnObject)));
		assert!(store.is_empty());
	}

	#[test]
	fn sparse_payloads_still_deserialize() {
		let payload: WebhookPayload = serde_path_to_error::deserialize(json!({
			"Event": "ProjectCreated",
		}))
		.expect("Payload without selectors should deserialize.");

		assert!(!payload.matches_filter());
		assert!(payload.object_id.section_selector.is_none());
	}
}

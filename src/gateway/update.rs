//! Partial-update construction for expense items, with numeric coercion and validation.
//!
//! Validation is result-based rather than exception-driven: a bad coercion or an empty update
//! surfaces as a [`ValidationError`] from [`ExpenseItemUpdate::into_payload`] before the gateway
//! touches the network.

// crates.io
use serde_json::{Map, json};
// self
use crate::{_prelude::*, error::ValidationError};

/// Check-number input, either already numeric or free text to be coerced.
#[derive(Clone, Debug)]
pub enum CheckNumber {
	/// Numeric value passed through unchanged.
	Number(i64),
	/// Free text; all non-digit characters are stripped before integer conversion.
	Text(String),
}
impl From<i64> for CheckNumber {
	fn from(value: i64) -> Self {
		Self::Number(value)
	}
}
impl From<&str> for CheckNumber {
	fn from(value: &str) -> Self {
		Self::Text(value.into())
	}
}
impl From<String> for CheckNumber {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

/// Amount-paid input, either already numeric or text to be parsed as a decimal.
#[derive(Clone, Debug)]
pub enum AmountPaid {
	/// Numeric value passed through unchanged.
	Amount(f64),
	/// Free text parsed as a decimal number.
	Text(String),
}
impl From<f64> for AmountPaid {
	fn from(value: f64) -> Self {
		Self::Amount(value)
	}
}
impl From<&str> for AmountPaid {
	fn from(value: &str) -> Self {
		Self::Text(value.into())
	}
}
impl From<String> for AmountPaid {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

/// Builder for a partial expense-item update.
///
/// At least one field must be set before the update can be submitted; the literal status
/// `"Unknown"` is normalized to a JSON `null` (explicit clear).
#[derive(Clone, Debug, Default)]
pub struct ExpenseItemUpdate {
	status: Option<String>,
	check_history: Option<String>,
	check_number: Option<CheckNumber>,
	amount_paid: Option<AmountPaid>,
	check_date: Option<String>,
}
impl ExpenseItemUpdate {
	/// Creates an empty update.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the status field; `"Unknown"` clears the stored value.
	pub fn status(mut self, status: impl Into<String>) -> Self {
		self.status = Some(status.into());

		self
	}

	/// Sets the check-history field.
	pub fn check_history(mut self, check_history: impl Into<String>) -> Self {
		self.check_history = Some(check_history.into());

		self
	}

	/// Sets the check number, accepting numeric or text input.
	pub fn check_number(mut self, check_number: impl Into<CheckNumber>) -> Self {
		self.check_number = Some(check_number.into());

		self
	}

	/// Sets the amount paid, accepting numeric or text input.
	pub fn amount_paid(mut self, amount_paid: impl Into<AmountPaid>) -> Self {
		self.amount_paid = Some(amount_paid.into());

		self
	}

	/// Sets the check-date field.
	pub fn check_date(mut self, check_date: impl Into<String>) -> Self {
		self.check_date = Some(check_date.into());

		self
	}

	/// Validates, coerces, and wraps the update into the PATCH payload envelope.
	pub(crate) fn into_payload(self, item_id: &str) -> Result<Value, ValidationError> {
		let mut data = Map::new();

		if let Some(status) = self.status {
			let value = if status == "Unknown" { Value::Null } else { status.into() };

			data.insert("status".into(), value);
		}
		if let Some(check_history) = self.check_history {
			data.insert("checkhistory".into(), check_history.into());
		}
		if let Some(check_number) = self.check_number {
			data.insert("checknumber".into(), Self::coerce_check_number(check_number)?.into());
		}
		if let Some(amount_paid) = self.amount_paid {
			data.insert("amountpaid".into(), Self::coerce_amount_paid(amount_paid)?.into());
		}
		if let Some(check_date) = self.check_date {
			data.insert("checkdate".into(), check_date.into());
		}
		if data.is_empty() {
			return Err(ValidationError::EmptyUpdate);
		}

		Ok(json!({
			"ItemId": { "Native": item_id, "Partner": null },
			"DataObject": data,
			"Links": {},
			"CreatedDate": null,
		}))
	}

	fn coerce_check_number(check_number: CheckNumber) -> Result<i64, ValidationError> {
		let text = match check_number {
			CheckNumber::Number(value) => return Ok(value),
			CheckNumber::Text(text) => text,
		};
		let digits: String = text.chars().filter(char::is_ascii_digit).collect();

		if digits != text {
			tracing::warn!(original = %text, stripped = %digits, "stripped non-numeric characters from check number");
		}
		if digits.is_empty() {
			return Err(ValidationError::CheckNumberEmpty { original: text });
		}

		digits.parse().map_err(|_| ValidationError::CheckNumberNotNumeric { value: digits })
	}

	fn coerce_amount_paid(amount_paid: AmountPaid) -> Result<f64, ValidationError> {
		match amount_paid {
			AmountPaid::Amount(value) => Ok(value),
			AmountPaid::Text(text) => text
				.trim()
				.parse()
				.map_err(|_| ValidationError::AmountPaidNotNumeric { value: text }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ITEM_ID: &str = "c1c738ba-2409-4109-a44a-2d0b8bf56dea";

	fn data_object(payload: &Value) -> &Value {
		&payload["DataObject"]
	}

	#[test]
	fn check_number_text_strips_non_digits() {
		let payload = ExpenseItemUpdate::new()
			.check_number("CHK-042")
			.into_payload(ITEM_ID)
			.expect("Check number with digits should coerce.");

		assert_eq!(data_object(&payload)["checknumber"], json!(42));
	}

	#[test]
	fn check_number_without_digits_fails_naming_the_original() {
		let err = ExpenseItemUpdate::new()
			.check_number("---")
			.into_payload(ITEM_ID)
			.expect_err("Digit-free check number should fail validation.");

		assert_eq!(err, ValidationError::CheckNumberEmpty { original: "---".into() });
	}

	#[test]
	fn check_number_overflow_fails_conversion() {
		let err = ExpenseItemUpdate::new()
			.check_number("99999999999999999999")
			.into_payload(ITEM_ID)
			.expect_err("Out-of-range digit string should fail conversion.");

		assert!(matches!(err, ValidationError::CheckNumberNotNumeric { .. }));
	}

	#[test]
	fn amount_paid_text_parses_as_decimal() {
		let payload = ExpenseItemUpdate::new()
			.amount_paid("12.50")
			.into_payload(ITEM_ID)
			.expect("Decimal text should parse.");

		assert_eq!(data_object(&payload)["amountpaid"], json!(12.5));
	}

	#[test]
	fn amount_paid_garbage_fails_validation() {
		let err = ExpenseItemUpdate::new()
			.amount_paid("twelve")
			.into_payload(ITEM_ID)
			.expect_err("Non-numeric amount should fail validation.");

		assert_eq!(err, ValidationError::AmountPaidNotNumeric { value: "twelve".into() });
	}

	#[test]
	fn unknown_status_normalizes_to_null() {
		let payload = ExpenseItemUpdate::new()
			.status("Unknown")
			.into_payload(ITEM_ID)
			.expect("Status-only update should build.");

		assert_eq!(data_object(&payload)["status"], Value::Null);

		let payload = ExpenseItemUpdate::new()
			.status("Paid")
			.into_payload(ITEM_ID)
			.expect("Status-only update should build.");

		assert_eq!(data_object(&payload)["status"], json!("Paid"));
	}

	#[test]
	fn empty_update_is_rejected_before_any_request() {
		let err = ExpenseItemUpdate::new()
			.into_payload(ITEM_ID)
			.expect_err("Update with no fields should fail validation.");

		assert_eq!(err, ValidationError::EmptyUpdate);
	}

	#[test]
	fn payload_envelope_matches_the_wire_contract() {
		let payload = ExpenseItemUpdate::new()
			.status("Paid")
			.check_history("QB sync complete")
			.check_number(1042_i64)
			.amount_paid(250.75)
			.check_date("2025-06-01")
			.into_payload(ITEM_ID)
			.expect("Fully populated update should build.");

		assert_eq!(
			payload,
			json!({
				"ItemId": { "Native": ITEM_ID, "Partner": null },
				"DataObject": {
					"status": "Paid",
					"checkhistory": "QB sync complete",
					"checknumber": 1042,
					"amountpaid": 250.75,
					"checkdate": "2025-06-01",
				},
				"Links": {},
				"CreatedDate": null,
			}),
		);
	}
}

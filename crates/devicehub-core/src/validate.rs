//! Explicit request validation helpers.
//!
//! Request DTOs deserialize every field as optional and are checked here
//! before any service logic runs, so a single response can report all
//! rejected fields at once.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DeviceHubError, FieldError, Result};

/// Decimal places kept for metric values (`NUMERIC(10,2)`).
pub const VALUE_SCALE: u32 = 2;

/// Exclusive bound on the magnitude of a stored metric value.
const VALUE_LIMIT: i64 = 100_000_000;

/// Accumulates field errors for one request.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Keep `value` if it has a non-whitespace character, otherwise record `message`.
    pub fn require_non_blank(
        &mut self,
        field: &'static str,
        value: Option<String>,
        message: &str,
    ) -> Option<String> {
        match non_blank(value) {
            Some(v) => Some(v),
            None => {
                self.push(field, message);
                None
            }
        }
    }

    pub fn require_present<T>(&mut self, field: &'static str, value: Option<T>, message: &str) -> Option<T> {
        if value.is_none() {
            self.push(field, message);
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_error(self) -> DeviceHubError {
        DeviceHubError::Validation(self.errors)
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// `None` for absent, empty, or whitespace-only strings.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !is_blank(s))
}

/// Round the way Postgres rounds into a scale-2 numeric column.
pub fn to_storage_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn fits_storage(value: Decimal) -> bool {
    value.abs() < Decimal::from(VALUE_LIMIT)
}

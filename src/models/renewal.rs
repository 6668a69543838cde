//! Librarian renewal form

use std::borrow::Cow;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{ValidateArgs, ValidationError};

use super::form::FormErrors;

pub const RENEWAL_FIELD: &str = "renewal_date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Submitted or proposed renewal date (YYYY-MM-DD)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, validator::Validate)]
#[validate(context = RenewalWindow)]
pub struct RenewBookForm {
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        custom(function = "validate_renewal_date", use_context)
    )]
    pub renewal_date: Option<String>,
}

/// Dates a renewal may be set to, both ends inclusive
#[derive(Debug, Clone, Copy)]
pub struct RenewalWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
    pub max_weeks: i64,
}

fn validate_renewal_date(value: &str, window: &RenewalWindow) -> Result<(), ValidationError> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err(ValidationError::new("required")
            .with_message(Cow::from("This field is required.")));
    }

    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ValidationError::new("invalid").with_message(Cow::from("Enter a valid date.")))?;

    if date < window.earliest {
        return Err(ValidationError::new("renewal_in_past")
            .with_message(Cow::from("Invalid date - renewal in past")));
    }
    if date > window.latest {
        return Err(ValidationError::new("renewal_too_far").with_message(Cow::from(format!(
            "Invalid date - renewal more than {} weeks ahead",
            window.max_weeks
        ))));
    }
    Ok(())
}

/// Window a renewal date must fall in, relative to today
#[derive(Debug, Clone, Copy)]
pub struct RenewalPolicy {
    pub proposed_weeks: i64,
    pub max_weeks: i64,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            proposed_weeks: 3,
            max_weeks: 4,
        }
    }
}

impl RenewalPolicy {
    pub fn proposed_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(self.proposed_weeks)
    }

    pub fn latest_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(self.max_weeks)
    }

    pub fn window(&self, today: NaiveDate) -> RenewalWindow {
        RenewalWindow {
            earliest: today,
            latest: self.latest_date(today),
            max_weeks: self.max_weeks,
        }
    }

    /// Form prefilled with the proposed date
    pub fn initial_form(&self, today: NaiveDate) -> RenewBookForm {
        RenewBookForm {
            renewal_date: Some(self.proposed_date(today).format(DATE_FORMAT).to_string()),
        }
    }

    /// Validate a submitted date against today's window and return it parsed
    pub fn clean(&self, form: &RenewBookForm, today: NaiveDate) -> Result<NaiveDate, FormErrors> {
        form.validate_with_args(&self.window(today))?;

        let raw = form.renewal_date.as_deref().map(str::trim).unwrap_or("");
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
            let mut errors = FormErrors::new();
            errors.add(RENEWAL_FIELD, "Enter a valid date.");
            errors
        })
    }
}

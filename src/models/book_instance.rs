//! Book instance (physical copy) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::form::trimmed;

/// Availability of a copy. Stored as a one-letter code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Maintenance,
        LoanStatus::OnLoan,
        LoanStatus::Available,
        LoanStatus::Reserved,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    /// Accepts the storage code ("o") or the serialized name ("on_loan")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Some(status) = Self::from_code(&s) {
            return Ok(status);
        }
        match s.as_str() {
            "maintenance" => Ok(LoanStatus::Maintenance),
            "on_loan" => Ok(LoanStatus::OnLoan),
            "available" => Ok(LoanStatus::Available),
            "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        LoanStatus::from_code(s.trim())
            .ok_or_else(|| format!("Invalid loan status code: {}", s).into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// Full book instance model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    /// Meaningful only while on loan
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
}

impl BookInstance {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.due_back, today)
    }
}

pub fn is_overdue(due_back: Option<NaiveDate>, today: NaiveDate) -> bool {
    due_back.map(|d| today > d).unwrap_or(false)
}

/// "<uuid> (<book title>)"
pub fn instance_display(id: &Uuid, book_title: &str) -> String {
    format!("{} ({})", id, book_title)
}

/// Instance joined with its book title and borrower, as shown in lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InstanceListing {
    pub id: Uuid,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub book_id: i32,
    pub book_title: String,
    pub borrower_id: Option<i32>,
    pub borrower_username: Option<String>,
    pub is_overdue: bool,
}

impl InstanceListing {
    pub fn display(&self) -> String {
        instance_display(&self.id, &self.book_title)
    }
}

/// Admin filters for the instance list
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct InstanceFilter {
    /// Status code or name
    pub status: Option<String>,
    /// Exact due date (YYYY-MM-DD)
    pub due_back: Option<NaiveDate>,
}

/// Create/update book instance request (admin)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookInstanceForm {
    /// Taken from the parent book when edited inline
    #[serde(default)]
    pub book_id: i32,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1-200 characters"))]
    pub imprint: String,
    #[serde(default)]
    pub due_back: Option<NaiveDate>,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(default)]
    pub borrower_id: Option<i32>,
}

impl From<&BookInstance> for BookInstanceForm {
    fn from(instance: &BookInstance) -> Self {
        BookInstanceForm {
            book_id: instance.book_id,
            imprint: instance.imprint.clone(),
            due_back: instance.due_back,
            status: instance.status,
            borrower_id: instance.borrower_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_codes_round_trip() {
        for status in LoanStatus::ALL {
            assert_eq!(LoanStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(LoanStatus::from_code("x"), None);
    }

    #[test]
    fn status_parses_names_and_codes() {
        assert_eq!("o".parse::<LoanStatus>(), Ok(LoanStatus::OnLoan));
        assert_eq!("on_loan".parse::<LoanStatus>(), Ok(LoanStatus::OnLoan));
        assert_eq!(" Available ".parse::<LoanStatus>(), Ok(LoanStatus::Available));
        assert!("lost".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn new_copies_start_in_maintenance() {
        assert_eq!(LoanStatus::default(), LoanStatus::Maintenance);
    }

    #[test]
    fn overdue_only_after_due_date() {
        let today = day(2024, 3, 10);
        assert!(!is_overdue(None, today));
        assert!(!is_overdue(Some(today), today));
        assert!(!is_overdue(Some(day(2024, 3, 11)), today));
        assert!(is_overdue(Some(day(2024, 3, 9)), today));
    }

    #[test]
    fn display_includes_title() {
        let id = Uuid::nil();
        assert_eq!(
            instance_display(&id, "Dune"),
            "00000000-0000-0000-0000-000000000000 (Dune)"
        );
    }
}

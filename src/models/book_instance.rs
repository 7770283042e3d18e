//! Book instance (loanable copy) model, loan status and the renewal form

use std::borrow::Cow;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Default proposal shown on the renewal form
pub const DEFAULT_RENEWAL_WEEKS: i64 = 3;

/// Furthest a due date may be pushed, in days from today
pub const MAX_RENEWAL_DAYS: i64 = 28;

/// Loan status of a copy. Stored as a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub fn as_code(&self) -> &'static str {
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
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Maintenance
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    /// Accepts the stored code or the snake_case name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "maintenance" => Ok(LoanStatus::Maintenance),
            "o" | "on_loan" => Ok(LoanStatus::OnLoan),
            "a" | "available" => Ok(LoanStatus::Available),
            "r" | "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (TEXT column holding the code)
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
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_code(), buf)
    }
}

/// Book instance as stored, with display columns filled by joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
    // Computed fields (populated when queried with JOINs, None otherwise)
    #[sqlx(default)]
    #[serde(default)]
    pub book_title: Option<String>,
    #[sqlx(default)]
    #[serde(default)]
    pub borrower_username: Option<String>,
}

impl BookInstance {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_back.map(|d| today > d).unwrap_or(false)
    }
}

/// Copy as listed on the loan pages
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanedInstance {
    #[serde(flatten)]
    pub instance: BookInstance,
    pub is_overdue: bool,
}

impl LoanedInstance {
    pub fn new(instance: BookInstance, today: NaiveDate) -> Self {
        let is_overdue = instance.is_overdue(today);
        Self { instance, is_overdue }
    }
}

/// Create/update copy request (admin console)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "check_loan_consistency", skip_on_field_errors = false))]
pub struct BookInstanceForm {
    pub book_id: i32,
    #[serde(default)]
    #[validate(length(max = 200, message = "Imprint must be at most 200 characters"))]
    pub imprint: String,
    #[serde(default)]
    pub due_back: Option<NaiveDate>,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(default)]
    pub borrower_id: Option<i32>,
}

/// A copy on loan must name its borrower and its due date
fn check_loan_consistency(form: &BookInstanceForm) -> Result<(), ValidationError> {
    if form.status == LoanStatus::OnLoan && (form.borrower_id.is_none() || form.due_back.is_none()) {
        let mut err = ValidationError::new("on_loan_incomplete");
        err.message = Some(Cow::from(
            "A copy on loan needs both a borrower and a due date",
        ));
        return Err(err);
    }
    Ok(())
}

impl From<&BookInstance> for BookInstanceForm {
    fn from(instance: &BookInstance) -> Self {
        Self {
            book_id: instance.book_id,
            imprint: instance.imprint.clone(),
            due_back: instance.due_back,
            status: instance.status,
            borrower_id: instance.borrower_id,
        }
    }
}

/// Renewal form submitted by a librarian
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenewBookForm {
    pub renewal_date: NaiveDate,
}

impl RenewBookForm {
    pub const FIELDS: &'static [&'static str] = &["renewal_date"];

    /// Date proposed when the form is first shown
    pub fn proposed_date(today: NaiveDate) -> NaiveDate {
        today + Duration::weeks(DEFAULT_RENEWAL_WEEKS)
    }

    /// Validate against `today`; the first failing rule wins
    pub fn clean(&self, today: NaiveDate) -> Result<NaiveDate, ValidationErrors> {
        let date = self.renewal_date;

        let failure = if date < today {
            Some(("date_in_past", "Invalid date - renewal in past"))
        } else if date > today + Duration::days(MAX_RENEWAL_DAYS) {
            Some((
                "date_too_far_in_future",
                "Invalid date - renewal more than 4 weeks ahead",
            ))
        } else {
            None
        };

        match failure {
            None => Ok(date),
            Some((code, message)) => {
                let mut err = ValidationError::new(code);
                err.message = Some(Cow::from(message));
                let mut errors = ValidationErrors::new();
                errors.add("renewal_date", err);
                Err(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn error_code(errors: &ValidationErrors) -> String {
        errors.field_errors().values().next().unwrap()[0].code.to_string()
    }

    #[test]
    fn renewal_today_is_valid() {
        let form = RenewBookForm { renewal_date: today() };
        assert_eq!(form.clean(today()).unwrap(), today());
    }

    #[test]
    fn renewal_yesterday_is_in_the_past() {
        let form = RenewBookForm { renewal_date: today() - Duration::days(1) };
        let errors = form.clean(today()).unwrap_err();
        assert_eq!(error_code(&errors), "date_in_past");
        assert!(errors.field_errors().contains_key("renewal_date"));
    }

    #[test]
    fn renewal_four_weeks_ahead_is_the_limit() {
        let ok = RenewBookForm { renewal_date: today() + Duration::days(28) };
        assert!(ok.clean(today()).is_ok());

        let late = RenewBookForm { renewal_date: today() + Duration::days(29) };
        let errors = late.clean(today()).unwrap_err();
        assert_eq!(error_code(&errors), "date_too_far_in_future");
    }

    #[test]
    fn proposed_date_is_three_weeks_out() {
        assert_eq!(
            RenewBookForm::proposed_date(today()),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        );
    }

    #[test]
    fn status_parses_codes_and_names() {
        assert_eq!("o".parse::<LoanStatus>().unwrap(), LoanStatus::OnLoan);
        assert_eq!("available".parse::<LoanStatus>().unwrap(), LoanStatus::Available);
        assert!("lost".parse::<LoanStatus>().is_err());
        assert_eq!(LoanStatus::Reserved.as_code(), "r");
    }

    #[test]
    fn on_loan_copy_needs_borrower_and_due_date() {
        let form = BookInstanceForm {
            book_id: 1,
            imprint: "Penguin, 1999".into(),
            due_back: None,
            status: LoanStatus::OnLoan,
            borrower_id: Some(3),
        };
        assert!(form.validate().is_err());

        let complete = BookInstanceForm { due_back: Some(today()), ..form };
        assert!(complete.validate().is_ok());
    }

    #[test]
    fn overdue_only_after_due_date() {
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id: 1,
            imprint: String::new(),
            due_back: Some(today()),
            status: LoanStatus::OnLoan,
            borrower_id: Some(1),
            book_title: None,
            borrower_username: None,
        };
        assert!(!instance.is_overdue(today()));
        assert!(instance.is_overdue(today() + Duration::days(1)));
    }
}

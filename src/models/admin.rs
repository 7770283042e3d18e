//! Admin console descriptors, filters and inline payloads

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::book_instance::{BookInstanceForm, LoanStatus};

/// Rows per admin list page
pub const ADMIN_PAGE_SIZE: i64 = 100;

/// Entity kinds exposed in the admin console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminModel {
    Authors,
    Books,
    BookInstances,
    Genres,
    Languages,
}

impl AdminModel {
    pub const ALL: [AdminModel; 5] = [
        AdminModel::Authors,
        AdminModel::Books,
        AdminModel::BookInstances,
        AdminModel::Genres,
        AdminModel::Languages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminModel::Authors => "authors",
            AdminModel::Books => "books",
            AdminModel::BookInstances => "bookinstances",
            AdminModel::Genres => "genres",
            AdminModel::Languages => "languages",
        }
    }
}

/// A group of fields on the change form; each row renders on one line
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Fieldset {
    pub name: Option<&'static str>,
    pub rows: Vec<Vec<&'static str>>,
}

/// Tabular inline editor for related rows
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InlineAdmin {
    pub model: AdminModel,
    pub fields: Vec<&'static str>,
}

/// Presentation of one entity kind in the console
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelAdmin {
    pub model: AdminModel,
    pub verbose_name_plural: &'static str,
    pub list_display: Vec<&'static str>,
    pub list_filter: Vec<&'static str>,
    pub fieldsets: Vec<Fieldset>,
    pub inlines: Vec<InlineAdmin>,
}

impl ModelAdmin {
    /// Defaults: every column on one row each, no filters
    fn plain(model: AdminModel, verbose: &'static str, fields: &[&'static str]) -> Self {
        Self {
            model,
            verbose_name_plural: verbose,
            list_display: vec!["name"],
            list_filter: Vec::new(),
            fieldsets: vec![Fieldset {
                name: None,
                rows: fields.iter().map(|f| vec![*f]).collect(),
            }],
            inlines: Vec::new(),
        }
    }

    pub fn for_model(model: AdminModel) -> Self {
        match model {
            AdminModel::Authors => Self {
                model,
                verbose_name_plural: "Authors",
                list_display: vec!["last_name", "first_name", "date_of_birth", "date_of_death"],
                list_filter: Vec::new(),
                fieldsets: vec![Fieldset {
                    name: None,
                    rows: vec![
                        vec!["first_name"],
                        vec!["last_name"],
                        vec!["date_of_birth", "date_of_death"],
                    ],
                }],
                inlines: Vec::new(),
            },
            AdminModel::BookInstances => Self {
                model,
                verbose_name_plural: "Book instances",
                list_display: vec!["book", "status", "borrower", "due_back", "id"],
                list_filter: vec!["status", "due_back"],
                fieldsets: vec![
                    Fieldset {
                        name: None,
                        rows: vec![vec!["book"], vec!["imprint"], vec!["id"]],
                    },
                    Fieldset {
                        name: Some("Availability"),
                        rows: vec![vec!["status"], vec!["due_back"], vec!["borrower"]],
                    },
                ],
                inlines: Vec::new(),
            },
            AdminModel::Books => Self {
                model,
                verbose_name_plural: "Books",
                list_display: vec!["title", "author", "display_genre"],
                list_filter: Vec::new(),
                fieldsets: vec![Fieldset {
                    name: None,
                    rows: ["title", "author", "summary", "isbn", "language", "genre"]
                        .iter()
                        .map(|f| vec![*f])
                        .collect(),
                }],
                inlines: vec![InlineAdmin {
                    model: AdminModel::BookInstances,
                    fields: vec!["id", "imprint", "status", "due_back", "borrower"],
                }],
            },
            AdminModel::Genres => Self::plain(model, "Genres", &["name"]),
            AdminModel::Languages => Self::plain(model, "Languages", &["name"]),
        }
    }

    /// Every registered model, in console order
    pub fn registry() -> Vec<ModelAdmin> {
        AdminModel::ALL.iter().map(|m| Self::for_model(*m)).collect()
    }
}

/// Date-range choices for the `due_back` list filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DueBackFilter {
    Today,
    Past7Days,
    ThisMonth,
    ThisYear,
    HasDate,
    NoDate,
}

/// Query parameters of an admin list
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AdminListQuery {
    pub page: Option<String>,
    /// Copy status (code or name); book instances only
    pub status: Option<String>,
    /// Due date range; book instances only
    pub due_back: Option<DueBackFilter>,
}

/// Resolved filter over book instances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    pub status: Option<LoanStatus>,
    /// Inclusive lower bound on due_back
    pub due_from: Option<NaiveDate>,
    /// Exclusive upper bound on due_back
    pub due_until: Option<NaiveDate>,
    /// Some(true) keeps rows with a due date, Some(false) rows without
    pub has_due_back: Option<bool>,
}

impl InstanceFilter {
    pub fn new(status: Option<LoanStatus>, due_back: Option<DueBackFilter>, today: NaiveDate) -> Self {
        let tomorrow = today + Duration::days(1);
        let mut filter = Self {
            status,
            ..Self::default()
        };

        match due_back {
            None => {}
            Some(DueBackFilter::Today) => {
                filter.due_from = Some(today);
                filter.due_until = Some(tomorrow);
            }
            Some(DueBackFilter::Past7Days) => {
                filter.due_from = Some(today - Duration::days(7));
                filter.due_until = Some(tomorrow);
            }
            Some(DueBackFilter::ThisMonth) => {
                let first = today.with_day(1).unwrap_or(today);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                filter.due_from = Some(first);
                filter.due_until = next;
            }
            Some(DueBackFilter::ThisYear) => {
                filter.due_from = NaiveDate::from_ymd_opt(today.year(), 1, 1);
                filter.due_until = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1);
            }
            Some(DueBackFilter::HasDate) => filter.has_due_back = Some(true),
            Some(DueBackFilter::NoDate) => filter.has_due_back = Some(false),
        }

        filter
    }

    /// In-process evaluation of the filter, matching the SQL predicate
    pub fn matches(&self, status: LoanStatus, due_back: Option<NaiveDate>) -> bool {
        if self.status.is_some_and(|s| s != status) {
            return false;
        }
        match self.has_due_back {
            Some(true) if due_back.is_none() => return false,
            Some(false) if due_back.is_some() => return false,
            _ => {}
        }
        if self.due_from.is_some() || self.due_until.is_some() {
            let Some(due) = due_back else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) {
                return false;
            }
            if self.due_until.is_some_and(|until| due >= until) {
                return false;
            }
        }
        true
    }
}

/// One row of the book-instance inline on the book change form
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InlineInstance {
    /// Existing copy to update or delete; absent for a new copy
    pub id: Option<Uuid>,
    #[serde(default)]
    pub imprint: String,
    #[serde(default)]
    pub due_back: Option<NaiveDate>,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(default)]
    pub borrower_id: Option<i32>,
    #[serde(default)]
    pub delete: bool,
}

impl InlineInstance {
    pub fn to_form(&self, book_id: i32) -> BookInstanceForm {
        BookInstanceForm {
            book_id,
            imprint: self.imprint.clone(),
            due_back: self.due_back,
            status: self.status,
            borrower_id: self.borrower_id,
        }
    }
}

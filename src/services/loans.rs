//! Loan listings and renewal

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstance, LoanedInstance, RenewBookForm},
        form::Submission,
        page::PageMeta,
    },
    repository::Repository,
};

/// Loans per page on both loan lists
pub const LOANS_PER_PAGE: i64 = 3;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Copies on loan to one borrower, soonest due first
    pub async fn my_borrowed(
        &self,
        user_id: i32,
        page: Option<&str>,
        today: NaiveDate,
    ) -> AppResult<(Vec<LoanedInstance>, PageMeta)> {
        self.on_loan(Some(user_id), page, today).await
    }

    /// Every copy on loan, soonest due first
    pub async fn all_borrowed(
        &self,
        page: Option<&str>,
        today: NaiveDate,
    ) -> AppResult<(Vec<LoanedInstance>, PageMeta)> {
        self.on_loan(None, page, today).await
    }

    async fn on_loan(
        &self,
        borrower_id: Option<i32>,
        page: Option<&str>,
        today: NaiveDate,
    ) -> AppResult<(Vec<LoanedInstance>, PageMeta)> {
        let count = self.repository.book_instances.count_on_loan(borrower_id).await?;
        let meta = PageMeta::resolve(page, count, LOANS_PER_PAGE)?;
        let loans = self
            .repository
            .book_instances
            .list_on_loan(borrower_id, meta.limit(), meta.offset())
            .await?
            .into_iter()
            .map(|instance| LoanedInstance::new(instance, today))
            .collect();
        Ok((loans, meta))
    }

    pub async fn get_instance(&self, id: Uuid) -> AppResult<BookInstance> {
        self.repository.book_instances.get_by_id(id).await
    }

    /// Set a new due date on a copy already looked up by the caller.
    ///
    /// A rejected date leaves the copy untouched.
    pub async fn renew(
        &self,
        instance: &BookInstance,
        form: &RenewBookForm,
        today: NaiveDate,
    ) -> AppResult<Submission<BookInstance>> {
        let due_back = match form.clean(today) {
            Ok(date) => date,
            Err(errors) => return Ok(Submission::Invalid(errors)),
        };

        self.repository
            .book_instances
            .set_due_back(instance.id, due_back)
            .await?;
        tracing::info!("Renewed copy {} until {}", instance.id, due_back);

        Ok(Submission::Saved(BookInstance {
            due_back: Some(due_back),
            ..instance.clone()
        }))
    }
}

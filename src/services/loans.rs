//! Loans: borrowed lists and the renewal workflow

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    config::CatalogConfig,
    error::AppResult,
    models::{
        book_instance::{BookInstance, InstanceListing},
        form::{FormErrors, FormOutcome},
        pagination::{Page, Paginator},
        renewal::{RenewBookForm, RenewalPolicy},
    },
    repository::Repository,
};

/// Renewal form with the copy being renewed
#[derive(Debug, Clone, serde::Serialize)]
pub struct RenewalPage {
    pub instance: InstanceListing,
    pub form: RenewBookForm,
    pub errors: FormErrors,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: CatalogConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    pub fn policy(&self) -> RenewalPolicy {
        RenewalPolicy {
            proposed_weeks: self.config.renewal_proposed_weeks,
            max_weeks: self.config.renewal_max_weeks,
        }
    }

    /// On-loan copies borrowed by `user_id`, soonest due first
    pub async fn borrowed_by(&self, user_id: i32, page: Option<&str>) -> AppResult<Page<InstanceListing>> {
        self.on_loan(Some(user_id), page).await
    }

    /// Every on-loan copy, soonest due first
    pub async fn all_borrowed(&self, page: Option<&str>) -> AppResult<Page<InstanceListing>> {
        self.on_loan(None, page).await
    }

    async fn on_loan(&self, borrower_id: Option<i32>, page: Option<&str>) -> AppResult<Page<InstanceListing>> {
        let total = self.repository.book_instances.count_on_loan(borrower_id).await?;
        let paginator = Paginator::new(total, self.config.loan_page_size);
        let page = paginator.resolve(page)?;

        let rows = self
            .repository
            .book_instances
            .list_on_loan(borrower_id, paginator.per_page, paginator.offset(page))
            .await?;

        Ok(Page::new(rows, paginator, page))
    }

    /// Renewal form prefilled with the proposed due date
    pub async fn renewal_form(&self, instance_id: Uuid, today: NaiveDate) -> AppResult<RenewalPage> {
        let instance = self.repository.book_instances.get_listing(instance_id).await?;
        Ok(RenewalPage {
            instance,
            form: self.policy().initial_form(today),
            errors: FormErrors::new(),
        })
    }

    /// Validate the submitted date and store it as the new due date.
    /// Status is not touched.
    pub async fn renew(
        &self,
        instance_id: Uuid,
        form: RenewBookForm,
        today: NaiveDate,
    ) -> AppResult<FormOutcome<BookInstance, RenewalPage>> {
        let instance = self.repository.book_instances.get_listing(instance_id).await?;

        let due_back = match self.policy().clean(&form, today) {
            Ok(date) => date,
            Err(errors) => {
                return Ok(FormOutcome::Invalid(RenewalPage {
                    instance,
                    form,
                    errors,
                }));
            }
        };

        let renewed = self
            .repository
            .book_instances
            .update_due_back(instance_id, due_back)
            .await?;

        tracing::info!(instance_id = %instance_id, due_back = %due_back, "Book instance renewed");
        Ok(FormOutcome::Saved(renewed))
    }
}

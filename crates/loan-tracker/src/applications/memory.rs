use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationUpdate, LoanApplication,
};
use super::store::{ApplicationStore, Page, PageRequest, ReportFilter, StoreError};

/// Process-local store with the same observable semantics as the MongoDB gateway.
/// Records are kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryApplicationStore {
    records: Mutex<Vec<ApplicationRecord>>,
}

impl InMemoryApplicationStore {
    fn records(&self) -> Result<MutexGuard<'_, Vec<ApplicationRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn filtered(&self, filter: &ReportFilter) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self
            .records()?
            .iter()
            .filter(|record| filter.matches(&record.application))
            .cloned()
            .collect())
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.to_lowercase())
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRecord>, StoreError> {
        self.filtered(&ReportFilter {
            status,
            date_range: None,
        })
    }

    async fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, StoreError> {
        self.records()?
            .iter()
            .find(|record| &record.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_name(
        &self,
        first_name_prefix: &str,
        last_name_prefix: &str,
    ) -> Result<ApplicationRecord, StoreError> {
        self.records()?
            .iter()
            .find(|record| {
                let applicant = &record.application.main_applicant;
                starts_with_ignore_case(&applicant.first_name, first_name_prefix)
                    && starts_with_ignore_case(&applicant.last_name, last_name_prefix)
            })
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, application: LoanApplication) -> Result<ApplicationId, StoreError> {
        let id = ApplicationId(ObjectId::new().to_hex());
        self.records()?.push(ApplicationRecord {
            id: id.clone(),
            application,
        });
        Ok(id)
    }

    async fn update(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<(), StoreError> {
        let mut records = self.records()?;
        let record = records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(StoreError::NotFound)?;
        record.application.apply(update);
        Ok(())
    }

    async fn search(&self, filter: &ReportFilter) -> Result<Vec<ApplicationRecord>, StoreError> {
        self.filtered(filter)
    }

    async fn paginate(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Page<ApplicationRecord>, StoreError> {
        let matching = self.filtered(filter)?;
        let total = matching.len() as u64;
        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.page_size()).unwrap_or(usize::MAX);
        let data = matching.into_iter().skip(skip).take(take).collect();
        Ok(Page::new(data, total, page))
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::applications::domain::{
    Address, Applicant, ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission,
    ApplicationUpdate, Employment, FinancialInfo, Income, Loan, LoanApplication, Vehicle,
};
use crate::applications::store::{ApplicationStore, Page, PageRequest, ReportFilter, StoreError};
use crate::applications::{application_router, InMemoryApplicationStore, LoanApplicationService};
use crate::documents::{DocumentStore, InMemoryDocumentStore, ObjectStoreError};

pub(super) type MemoryService = LoanApplicationService<InMemoryApplicationStore, InMemoryDocumentStore>;

pub(super) fn address(postal_code: &str) -> Address {
    Address {
        street: "100 King St W".to_string(),
        city: "Toronto".to_string(),
        province: "ON".to_string(),
        postal_code: postal_code.to_string(),
    }
}

pub(super) fn applicant(first_name: &str, last_name: &str) -> Applicant {
    Applicant {
        first_name: first_name.to_string(),
        middle_name: None,
        last_name: last_name.to_string(),
        date_of_birth: "1988-04-12".to_string(),
        sin: "046454286".to_string(),
        address: address("M5V 2T6"),
        duration_at_address: 36,
        rent: 1450,
        cell_phone: "416-555-1234".to_string(),
        email: format!(
            "{}.{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ),
        marital_status: "single".to_string(),
        dependents: 1,
        status_in_canada: "citizen".to_string(),
        ft_employment: Some(Employment {
            company_name: "Maple Logistics".to_string(),
            position: "Dispatcher".to_string(),
            length_of_service: 48,
            gross_income: 62_000.0,
            company_address: address("m4w1a8"),
            company_phone: "(416) 555-9000".to_string(),
        }),
        vehicle1: Some(Vehicle {
            year: 2019,
            make: "Honda".to_string(),
            model: "Civic".to_string(),
        }),
        vehicle2: None,
        monthly_expenses: Some(FinancialInfo {
            utilities: 180,
            property_tax: 0,
            child_support: 0,
            groceries: 600,
            car_insurance: 210,
            car_payment: 0,
            phone_bill: 75,
            internet: 60,
        }),
        monthly_income: Some(Income {
            ft_income: 4100,
            pt_income: 0,
            child_tax: 250,
            govt_support: 0,
            pension: 0,
        }),
        loans: vec![Loan {
            financial_institution: Some("Northern Credit Union".to_string()),
            monthly_payment: Some(320),
        }],
    }
}

pub(super) fn submission(first_name: &str, last_name: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        main_applicant: applicant(first_name, last_name),
        co_applicant: None,
        amount: Some(18_500.0),
        security: Some("2019 Honda Civic".to_string()),
        status: ApplicationStatus::Applied,
        notes: None,
        reason: Some("Debt consolidation".to_string()),
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryApplicationStore>,
    Arc<InMemoryDocumentStore>,
) {
    let store = Arc::new(InMemoryApplicationStore::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let service = LoanApplicationService::new(store.clone(), documents.clone());
    (service, store, documents)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    application_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body")
        .to_vec()
}

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

pub(super) struct UnavailableStore;

#[async_trait]
impl ApplicationStore for UnavailableStore {
    async fn list(
        &self,
        _status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRecord>, StoreError> {
        Err(offline())
    }

    async fn get(&self, _id: &ApplicationId) -> Result<ApplicationRecord, StoreError> {
        Err(offline())
    }

    async fn find_by_name(
        &self,
        _first_name_prefix: &str,
        _last_name_prefix: &str,
    ) -> Result<ApplicationRecord, StoreError> {
        Err(offline())
    }

    async fn insert(&self, _application: LoanApplication) -> Result<ApplicationId, StoreError> {
        Err(offline())
    }

    async fn update(
        &self,
        _id: &ApplicationId,
        _update: ApplicationUpdate,
    ) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn search(&self, _filter: &ReportFilter) -> Result<Vec<ApplicationRecord>, StoreError> {
        Err(offline())
    }

    async fn paginate(
        &self,
        _filter: &ReportFilter,
        _page: PageRequest,
    ) -> Result<Page<ApplicationRecord>, StoreError> {
        Err(offline())
    }
}

/// Accepts the first `accept` writes, then fails every later one.
pub(super) struct FlakyDocuments {
    inner: InMemoryDocumentStore,
    remaining: std::sync::atomic::AtomicUsize,
}

impl FlakyDocuments {
    pub(super) fn accepting(accept: usize) -> Self {
        Self {
            inner: InMemoryDocumentStore::default(),
            remaining: std::sync::atomic::AtomicUsize::new(accept),
        }
    }

    pub(super) fn stored(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        use std::sync::atomic::Ordering;
        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(ObjectStoreError::Unavailable("bucket offline".to_string()));
        }
        self.inner.put_object(key, bytes, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.inner.get_object(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        self.inner.list_keys(prefix).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, ObjectStoreError> {
        self.inner.delete_prefix(prefix).await
    }
}

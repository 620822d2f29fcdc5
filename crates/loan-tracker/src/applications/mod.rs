//! Loan application intake, case-worker updates, document handling, and reporting.
//!
//! Payloads are checked by [`validation`] before they reach an [`ApplicationStore`];
//! the [`LoanApplicationService`] ties the store to a [`crate::documents::DocumentStore`]
//! and the report renderers, and [`application_router`] exposes it over HTTP.

pub mod domain;
pub mod memory;
pub mod mongo;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Address, Applicant, ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission,
    ApplicationUpdate, Employment, FinancialInfo, Income, Loan, LoanApplication, UnknownStatus,
    Vehicle,
};
pub use memory::InMemoryApplicationStore;
pub use mongo::MongoApplicationStore;
pub use router::application_router;
pub use service::{
    report_filter, ApplicationServiceError, DocumentDownload, DocumentUpload, LoanApplicationService,
    RenderedReport, UploadReceipt,
};
pub use store::{
    parse_date_bound, ApplicationStore, DateRange, InvalidDateBound, Page, PageRequest,
    PageRequestError, ReportFilter, StoreError,
};
pub use validation::{
    is_valid_email, is_valid_postal_code, normalize_postal_code, parse_status, phone_digits,
    validate_submission, validate_update, ValidationError,
};

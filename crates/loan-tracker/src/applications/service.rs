use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationSubmission, ApplicationUpdate,
    LoanApplication,
};
use super::store::{
    parse_date_bound, ApplicationStore, DateRange, InvalidDateBound, Page, PageRequest,
    PageRequestError, ReportFilter, StoreError,
};
use super::validation::{parse_status, validate_submission, validate_update, ValidationError};
use crate::documents::{
    derive_key, file_name, folder_prefix, DocumentStore, DocumentType, ObjectStoreError,
    UnknownDocumentType,
};
use crate::reports::{self, ReportError, ReportFormat};

/// One file destined for an application folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub document_type: DocumentType,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub message: &'static str,
    pub document_type: DocumentType,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub bytes: Vec<u8>,
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Build a report filter from raw query values. Blank values count as absent.
pub fn report_filter(
    status: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<ReportFilter, ApplicationServiceError> {
    let status = non_blank(status)
        .map(|raw| parse_status(raw, "status"))
        .transpose()?;
    let start = non_blank(start_date).map(parse_date_bound).transpose()?;
    let end = non_blank(end_date).map(parse_date_bound).transpose()?;
    Ok(ReportFilter {
        status,
        date_range: DateRange::from_bounds(start, end),
    })
}

/// Service composing validation, the application store, document storage, and reports.
pub struct LoanApplicationService<S, D> {
    store: Arc<S>,
    documents: Arc<D>,
}

impl<S, D> LoanApplicationService<S, D>
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, documents: Arc<D>) -> Self {
        Self { store, documents }
    }

    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRecord>, ApplicationServiceError> {
        Ok(self.store.list(status).await?)
    }

    pub async fn get(
        &self,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn find_by_name(
        &self,
        first_name_prefix: &str,
        last_name_prefix: &str,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        Ok(self
            .store
            .find_by_name(first_name_prefix, last_name_prefix)
            .await?)
    }

    /// Validate and persist a new application. The intake timestamp is assigned here.
    pub async fn create(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationId, ApplicationServiceError> {
        let submission = validate_submission(submission)?;
        let application = LoanApplication::from_submission(submission, Utc::now());
        let status = application.status;
        let id = self.store.insert(application).await?;
        info!(application_id = %id, %status, "application created");
        Ok(id)
    }

    pub async fn update(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<(), ApplicationServiceError> {
        let update = validate_update(update)?;
        let status = update.status;
        self.store.update(id, update).await?;
        info!(application_id = %id, status = ?status, "application updated");
        Ok(())
    }

    pub async fn report_page(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Page<ApplicationRecord>, ApplicationServiceError> {
        Ok(self.store.paginate(filter, page).await?)
    }

    pub async fn report_records(
        &self,
        filter: &ReportFilter,
    ) -> Result<Vec<ApplicationRecord>, ApplicationServiceError> {
        Ok(self.store.search(filter).await?)
    }

    pub async fn render_report(
        &self,
        filter: &ReportFilter,
        format: ReportFormat,
    ) -> Result<RenderedReport, ApplicationServiceError> {
        let records = self.report_records(filter).await?;
        let bytes = reports::render(&records, format)?;
        info!(%format, records = records.len(), bytes = bytes.len(), "report rendered");
        Ok(RenderedReport { format, bytes })
    }

    pub async fn upload_document(
        &self,
        id: &ApplicationId,
        upload: DocumentUpload,
    ) -> Result<UploadReceipt, ApplicationServiceError> {
        let record = self.store.get(id).await?;
        self.store_document(&record, upload).await
    }

    /// Upload several documents in order. Earlier uploads stay in place if a later one fails.
    pub async fn upload_documents(
        &self,
        id: &ApplicationId,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Vec<UploadReceipt>, ApplicationServiceError> {
        if uploads.is_empty() {
            return Err(ApplicationServiceError::NoFiles);
        }
        let record = self.store.get(id).await?;

        let mut receipts = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.store_document(&record, upload).await {
                Ok(receipt) => receipts.push(receipt),
                Err(err) => {
                    warn!(
                        application_id = %id,
                        uploaded = receipts.len(),
                        error = %err,
                        "multi-document upload stopped early"
                    );
                    return Err(err);
                }
            }
        }
        Ok(receipts)
    }

    pub async fn download_document(
        &self,
        id: &ApplicationId,
        document_type: DocumentType,
    ) -> Result<DocumentDownload, ApplicationServiceError> {
        let record = self.store.get(id).await?;
        let key = document_key(&record, document_type);
        let bytes = self.documents.get_object(&key).await?;
        Ok(DocumentDownload {
            file_name: document_type.object_name(),
            bytes,
        })
    }

    /// File names in the application's folder, sorted, optionally narrowed to one type.
    pub async fn list_documents(
        &self,
        id: &ApplicationId,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<String>, ApplicationServiceError> {
        let record = self.store.get(id).await?;
        let prefix = record_prefix(&record);
        let wanted = document_type.map(DocumentType::object_name);

        let mut names: Vec<String> = self
            .documents
            .list_keys(&prefix)
            .await?
            .iter()
            .map(|key| file_name(key).to_string())
            .filter(|name| !name.is_empty())
            .filter(|name| wanted.as_ref().map_or(true, |wanted| name == wanted))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Delete every stored document of an application.
    pub async fn purge_documents(
        &self,
        id: &ApplicationId,
    ) -> Result<usize, ApplicationServiceError> {
        let record = self.store.get(id).await?;
        let removed = self.documents.delete_prefix(&record_prefix(&record)).await?;
        info!(application_id = %id, removed, "application documents purged");
        Ok(removed)
    }

    async fn store_document(
        &self,
        record: &ApplicationRecord,
        upload: DocumentUpload,
    ) -> Result<UploadReceipt, ApplicationServiceError> {
        let DocumentUpload {
            document_type,
            content_type,
            bytes,
        } = upload;

        if bytes.is_empty() {
            return Err(ApplicationServiceError::EmptyUpload(document_type));
        }

        let key = document_key(record, document_type);
        let size = bytes.len();
        self.documents
            .put_object(&key, bytes, &content_type)
            .await?;
        info!(application_id = %record.id, %document_type, key = %key, size, "document uploaded");

        Ok(UploadReceipt {
            message: "File uploaded successfully",
            document_type,
            key,
        })
    }
}

// Keys are derived from the current stored name on every access.
fn document_key(record: &ApplicationRecord, document_type: DocumentType) -> String {
    let applicant = &record.application.main_applicant;
    derive_key(
        &record.id,
        &applicant.last_name,
        &applicant.first_name,
        document_type,
    )
}

fn record_prefix(record: &ApplicationRecord) -> String {
    let applicant = &record.application.main_applicant;
    folder_prefix(&record.id, &applicant.last_name, &applicant.first_name)
}

/// Error raised by the loan application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Documents(#[from] ObjectStoreError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    PageRequest(#[from] PageRequestError),
    #[error(transparent)]
    DateBound(#[from] InvalidDateBound),
    #[error("{0}; allowed types are contract, id_proof, bank_statement, pay_stub, additional_doc, photo_id, proof_of_address")]
    DocumentType(#[from] UnknownDocumentType),
    #[error("uploaded {0} document is empty")]
    EmptyUpload(DocumentType),
    #[error("no files were provided")]
    NoFiles,
    #[error("malformed multipart body: {0}")]
    Multipart(String),
}

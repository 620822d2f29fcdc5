use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ApplicationId, ApplicationStatus, ApplicationSubmission, ApplicationUpdate};
use super::service::{
    non_blank, report_filter, ApplicationServiceError, DocumentUpload, LoanApplicationService,
};
use super::store::{ApplicationStore, PageRequest, ReportFilter, StoreError};
use super::validation::{parse_status, ValidationError};
use crate::documents::{DocumentStore, DocumentType, ObjectStoreError};
use crate::reports::{ReportError, ReportFormat};

type SharedService<S, D> = Arc<LoanApplicationService<S, D>>;

/// Router builder exposing intake, case-worker, document, and report endpoints.
pub fn application_router<S, D>(service: SharedService<S, D>) -> Router
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/applications",
            get(list_handler::<S, D>).post(create_handler::<S, D>),
        )
        .route("/applications/search", get(search_handler::<S, D>))
        .route(
            "/applications/:id",
            get(get_handler::<S, D>)
                .put(update_handler::<S, D>)
                .patch(update_handler::<S, D>),
        )
        .route("/applications/:id/upload", post(upload_handler::<S, D>))
        .route(
            "/applications/:id/upload-multi-type",
            post(upload_multi_handler::<S, D>),
        )
        .route("/applications/:id/download", get(download_handler::<S, D>))
        .route("/applications/:id/files", get(files_handler::<S, D>))
        .route("/report", get(report_handler::<S, D>))
        .route("/report/download", get(report_download_handler::<S, D>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameQuery {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentTypeQuery {
    pub file_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FilesQuery {
    pub file_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub format: Option<String>,
}

impl ReportQuery {
    fn filter(&self) -> Result<ReportFilter, ApplicationServiceError> {
        report_filter(
            self.status.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )
    }

    fn page_request(&self) -> Result<PageRequest, ApplicationServiceError> {
        Ok(PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        )?)
    }

    fn format(&self) -> Result<ReportFormat, ApplicationServiceError> {
        match non_blank(self.format.as_deref()) {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(ReportFormat::default()),
        }
    }
}

fn optional_status(raw: Option<&str>) -> Result<Option<ApplicationStatus>, ApplicationServiceError> {
    Ok(non_blank(raw)
        .map(|raw| parse_status(raw, "status"))
        .transpose()?)
}

const DESERIALIZE_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Locate the offending field in a body that parsed as JSON but not as the payload type.
fn rejected_field(message: &str) -> (String, String) {
    let message = message.strip_prefix(DESERIALIZE_PREFIX).unwrap_or(message);
    if let Some((path, detail)) = message.split_once(": ") {
        if !path.is_empty() && !path.contains(char::is_whitespace) {
            return (path.to_string(), detail.to_string());
        }
    }
    let missing = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(field, _)| field.to_string());
    (
        missing.unwrap_or_else(|| "body".to_string()),
        message.to_string(),
    )
}

/// JSON bodies of the wrong shape are field-level validation failures; anything that
/// is not JSON at all keeps the rejection's own status.
fn body_rejection(rejection: JsonRejection) -> Response {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let (field, detail) = rejected_field(&err.body_text());
            error_response(ValidationError::Malformed { field, detail }.into())
        }
        other => {
            let payload = json!({ "error": other.body_text(), "field": "body" });
            (other.status(), Json(payload)).into_response()
        }
    }
}

/// Map service failures onto HTTP responses with a JSON `error` payload.
pub(crate) fn error_response(err: ApplicationServiceError) -> Response {
    let status = match &err {
        ApplicationServiceError::Validation(validation) => {
            let payload = json!({
                "error": validation.to_string(),
                "field": validation.field(),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
        ApplicationServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Documents(ObjectStoreError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Documents(ObjectStoreError::UnsupportedMediaType(_)) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        ApplicationServiceError::Report(ReportError::UnknownFormat(_))
        | ApplicationServiceError::PageRequest(_)
        | ApplicationServiceError::DateBound(_)
        | ApplicationServiceError::DocumentType(_)
        | ApplicationServiceError::EmptyUpload(_)
        | ApplicationServiceError::NoFiles
        | ApplicationServiceError::Multipart(_) => StatusCode::BAD_REQUEST,
        ApplicationServiceError::Store(StoreError::Unavailable(_))
        | ApplicationServiceError::Documents(ObjectStoreError::Unavailable(_))
        | ApplicationServiceError::Report(_) => {
            error!(error = %err, "request failed on a backing service");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}

pub(crate) async fn list_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let status = match optional_status(query.status.as_deref()) {
        Ok(status) => status,
        Err(err) => return error_response(err),
    };
    match service.list(status).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn search_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Query(query): Query<NameQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    match service
        .find_by_name(&query.first_name, &query.last_name)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    body: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let submission = match body {
        Ok(Json(submission)) => submission,
        Err(rejection) => return body_rejection(rejection),
    };
    match service.create(submission).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    match service.get(&ApplicationId(id)).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(id): Path<String>,
    body: Result<Json<ApplicationUpdate>, JsonRejection>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let update = match body {
        Ok(Json(update)) => update,
        Err(rejection) => return body_rejection(rejection),
    };
    match service.update(&ApplicationId(id), update).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Application updated" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// Content type of a part, guessed from its file name when the client sent none.
fn part_content_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    declared
        .map(str::to_string)
        .or_else(|| {
            file_name
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|guessed| guessed.essence_str().to_string())
        })
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.essence_str().to_string())
}

struct FilePart {
    name: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
    file_name: Option<String>,
}

impl FilePart {
    /// Form fields and file inputs left empty carry no usable file name.
    fn is_file(&self) -> bool {
        self.file_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

async fn next_file_part(
    multipart: &mut Multipart,
) -> Result<Option<FilePart>, ApplicationServiceError> {
    let field = match multipart
        .next_field()
        .await
        .map_err(|err| ApplicationServiceError::Multipart(err.body_text()))?
    {
        Some(field) => field,
        None => return Ok(None),
    };

    let name = field.name().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);
    let content_type = part_content_type(field.content_type(), field.file_name());
    let bytes = field
        .bytes()
        .await
        .map_err(|err| ApplicationServiceError::Multipart(err.body_text()))?;

    Ok(Some(FilePart {
        name,
        content_type,
        bytes: bytes.to_vec(),
        file_name,
    }))
}

pub(crate) async fn upload_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(id): Path<String>,
    Query(query): Query<DocumentTypeQuery>,
    mut multipart: Multipart,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let result = async {
        let document_type: DocumentType = query.file_type.parse()?;
        let part = next_file_part(&mut multipart)
            .await?
            .ok_or(ApplicationServiceError::NoFiles)?;
        service
            .upload_document(
                &ApplicationId(id),
                DocumentUpload {
                    document_type,
                    content_type: part.content_type,
                    bytes: part.bytes,
                },
            )
            .await
    }
    .await;

    match result {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Each multipart field is named after its document type. Parts without a file name
/// (plain form fields, or file inputs the user left empty) are skipped.
pub(crate) async fn upload_multi_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let result = async {
        let mut uploads = Vec::new();
        while let Some(part) = next_file_part(&mut multipart).await? {
            if !part.is_file() {
                continue;
            }
            let document_type: DocumentType = part.name.unwrap_or_default().parse()?;
            uploads.push(DocumentUpload {
                document_type,
                content_type: part.content_type,
                bytes: part.bytes,
            });
        }
        service.upload_documents(&ApplicationId(id), uploads).await
    }
    .await;

    match result {
        Ok(receipts) => (StatusCode::OK, Json(json!({ "uploaded": receipts }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn download_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(id): Path<String>,
    Query(query): Query<DocumentTypeQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let result = async {
        let document_type: DocumentType = query.file_type.parse()?;
        service
            .download_document(&ApplicationId(id), document_type)
            .await
    }
    .await;

    match result {
        Ok(download) => attachment(
            mime::APPLICATION_PDF.essence_str(),
            &download.file_name,
            download.bytes,
        ),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn files_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(id): Path<String>,
    Query(query): Query<FilesQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let result = async {
        let document_type = non_blank(query.file_type.as_deref())
            .map(str::parse::<DocumentType>)
            .transpose()?;
        service
            .list_documents(&ApplicationId(id), document_type)
            .await
    }
    .await;

    match result {
        Ok(names) => (StatusCode::OK, Json(names)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let result = async {
        let filter = query.filter()?;
        let page = query.page_request()?;
        service.report_page(&filter, page).await
    }
    .await;

    match result {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_download_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: DocumentStore + 'static,
{
    let result = async {
        let filter = query.filter()?;
        let format = query.format()?;
        service.render_report(&filter, format).await
    }
    .await;

    match result {
        Ok(report) => attachment(
            report.format.content_type(),
            report.format.file_name(),
            report.bytes,
        ),
        Err(err) => error_response(err),
    }
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

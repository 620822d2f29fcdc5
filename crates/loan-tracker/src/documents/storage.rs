use async_trait::async_trait;

/// Media types accepted as PDF uploads, compared case-insensitively.
pub const PDF_CONTENT_TYPES: [&str; 4] = [
    "application/pdf",
    "application/x-pdf",
    "application/acrobat",
    "applications/pdf",
];

pub fn is_pdf_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    PDF_CONTENT_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(essence))
}

/// Rejects anything that is not a PDF before a backend is contacted.
pub fn ensure_pdf(content_type: &str) -> Result<(), ObjectStoreError> {
    if is_pdf_content_type(content_type) {
        Ok(())
    } else {
        Err(ObjectStoreError::UnsupportedMediaType(
            content_type.to_string(),
        ))
    }
}

/// Byte storage addressed by derived keys. Writing an existing key replaces it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Every key under `prefix`; an empty prefix folder is an empty list, not an error.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;

    /// Remove every key under `prefix`, returning how many were deleted.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, ObjectStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("document not found")]
    NotFound,
    #[error("unsupported media type '{0}', only PDF documents are accepted")]
    UnsupportedMediaType(String),
    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}

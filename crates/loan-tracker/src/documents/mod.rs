//! Supporting documents: the closed set of document types, the key deriver that places
//! them in per-application folders, and the object storage gateways.

pub mod keys;
pub mod memory;
pub mod s3;
pub mod storage;

pub use keys::{derive_key, file_name, folder_prefix, folder_segment, DocumentType, UnknownDocumentType};
pub use memory::{InMemoryDocumentStore, StoredObject};
pub use s3::S3DocumentStore;
pub use storage::{ensure_pdf, is_pdf_content_type, DocumentStore, ObjectStoreError};

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::storage::{ensure_pdf, DocumentStore, ObjectStoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local object store keyed like the bucket, listing in key order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl InMemoryDocumentStore {
    fn objects(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>, ObjectStoreError> {
        self.objects
            .lock()
            .map_err(|_| ObjectStoreError::Unavailable("in-memory object lock poisoned".to_string()))
    }

    /// Snapshot of one object, for assertions.
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        ensure_pdf(content_type)?;
        self.objects()?.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects()?
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or(ObjectStoreError::NotFound)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self
            .objects()?
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, ObjectStoreError> {
        let mut objects = self.objects()?;
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));
        Ok(before - objects.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_upload_wins() {
        let store = InMemoryDocumentStore::default();
        store
            .put_object("doe_john_1/contract.pdf", b"first".to_vec(), "application/pdf")
            .await
            .expect("first upload");
        store
            .put_object("doe_john_1/contract.pdf", b"second".to_vec(), "application/x-pdf")
            .await
            .expect("second upload");

        assert_eq!(store.len(), 1);
        let bytes = store
            .get_object("doe_john_1/contract.pdf")
            .await
            .expect("object present");
        assert_eq!(bytes, b"second");
    }

    #[tokio::test]
    async fn non_pdf_uploads_never_reach_storage() {
        let store = InMemoryDocumentStore::default();
        let result = store
            .put_object("doe_john_1/photo_id.pdf", b"png".to_vec(), "image/png")
            .await;
        assert!(matches!(result, Err(ObjectStoreError::UnsupportedMediaType(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn listing_and_purging_stay_within_the_prefix() {
        let store = InMemoryDocumentStore::default();
        for key in [
            "doe_john_1/contract.pdf",
            "doe_john_1/pay_stub.pdf",
            "doe_john_12/contract.pdf",
            "roe_jane_2/contract.pdf",
        ] {
            store
                .put_object(key, b"%PDF".to_vec(), "application/pdf")
                .await
                .expect("upload");
        }

        let keys = store.list_keys("doe_john_1/").await.expect("listing");
        assert_eq!(keys, vec!["doe_john_1/contract.pdf", "doe_john_1/pay_stub.pdf"]);
        assert!(store.list_keys("nobody/").await.expect("listing").is_empty());

        let removed = store.delete_prefix("doe_john_1/").await.expect("purge");
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 2);
        assert!(matches!(
            store.get_object("doe_john_1/contract.pdf").await,
            Err(ObjectStoreError::NotFound)
        ));
    }
}

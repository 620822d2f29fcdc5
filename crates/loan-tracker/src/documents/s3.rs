use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tracing::{debug, warn};

use super::storage::{ensure_pdf, DocumentStore, ObjectStoreError};

const FALLBACK_REGION: &str = "us-east-1";
/// S3 caps a single DeleteObjects call at 1000 keys.
const DELETE_BATCH: usize = 1000;

fn unavailable(err: impl std::error::Error) -> ObjectStoreError {
    let message = DisplayErrorContext(&err).to_string();
    warn!(error = %message, "object storage call failed");
    ObjectStoreError::Unavailable(message)
}

/// Bucket-backed document storage. One client per process, shared by clones.
#[derive(Debug, Clone)]
pub struct S3DocumentStore {
    client: Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Credentials and region come from the standard AWS environment chain.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let region = RegionProviderChain::default_provider().or_else(Region::new(FALLBACK_REGION));
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;
        Self::new(Client::new(&config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        ensure_pdf(content_type)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(unavailable)?;
        debug!(bucket = %self.bucket, key, "object stored");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                return Err(if missing {
                    ObjectStoreError::NotFound
                } else {
                    unavailable(err)
                });
            }
        };

        let body = output.body.collect().await.map_err(unavailable)?;
        Ok(body.into_bytes().to_vec())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(unavailable)?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, ObjectStoreError> {
        let keys = self.list_keys(prefix).await?;
        let mut deleted = 0;

        for batch in keys.chunks(DELETE_BATCH) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(unavailable)?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(unavailable)?;

            let output = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(unavailable)?;

            if let Some(failure) = output.errors().first() {
                let message = format!(
                    "failed to delete '{}': {}",
                    failure.key().unwrap_or_default(),
                    failure.message().unwrap_or("unknown error")
                );
                warn!(bucket = %self.bucket, prefix, error = %message, "batch delete incomplete");
                return Err(ObjectStoreError::Unavailable(message));
            }
            deleted += output.deleted().len();
        }

        Ok(deleted)
    }
}

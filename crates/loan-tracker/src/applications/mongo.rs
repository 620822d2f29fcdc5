use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    Applicant, ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationUpdate,
    LoanApplication,
};
use super::store::{ApplicationStore, Page, PageRequest, ReportFilter, StoreError};
use crate::config::StorageConfig;

/// Stored layout: one flat document per application with nested applicants embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApplicationDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    main_applicant: Applicant,
    #[serde(default)]
    co_applicant: Option<Applicant>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    security: Option<String>,
    status: ApplicationStatus,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    application_date: DateTime<Utc>,
}

impl From<LoanApplication> for ApplicationDocument {
    fn from(application: LoanApplication) -> Self {
        Self {
            id: None,
            main_applicant: application.main_applicant,
            co_applicant: application.co_applicant,
            amount: application.amount,
            security: application.security,
            status: application.status,
            notes: application.notes,
            reason: application.reason,
            application_date: application.application_date,
        }
    }
}

impl TryFrom<ApplicationDocument> for ApplicationRecord {
    type Error = StoreError;

    fn try_from(document: ApplicationDocument) -> Result<Self, Self::Error> {
        let id = document
            .id
            .ok_or_else(|| StoreError::Unavailable("stored application has no _id".to_string()))?;

        Ok(ApplicationRecord {
            id: ApplicationId(id.to_hex()),
            application: LoanApplication {
                main_applicant: document.main_applicant,
                co_applicant: document.co_applicant,
                amount: document.amount,
                security: document.security,
                status: document.status,
                notes: document.notes,
                reason: document.reason,
                application_date: document.application_date,
            },
        })
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    let message = err.to_string();
    warn!(error = %message, "mongodb call failed");
    StoreError::Unavailable(message)
}

/// Ids that are not well-formed ObjectIds cannot name a stored record.
fn object_id(id: &ApplicationId) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id.as_str()).map_err(|_| StoreError::NotFound)
}

fn prefix_pattern(prefix: &str) -> Document {
    doc! {
        "$regex": format!("^{}", regex::escape(prefix)),
        "$options": "i",
    }
}

fn filter_document(filter: &ReportFilter) -> Document {
    let mut query = Document::new();
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(range) = filter.date_range {
        query.insert(
            "application_date",
            doc! {
                "$gte": bson::DateTime::from_chrono(range.start),
                "$lte": bson::DateTime::from_chrono(range.end),
            },
        );
    }
    query
}

fn insertion_order() -> Document {
    doc! { "_id": 1 }
}

/// MongoDB-backed gateway. The client is created once at startup and injected.
#[derive(Debug, Clone)]
pub struct MongoApplicationStore {
    collection: Collection<ApplicationDocument>,
}

impl MongoApplicationStore {
    pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client
                .database(database)
                .collection::<ApplicationDocument>(collection),
        }
    }

    pub async fn connect(config: &StorageConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.mongodb_url)
            .await
            .map_err(unavailable)?;
        Ok(Self::from_client(
            &client,
            &config.database,
            &config.collection,
        ))
    }

    async fn find_all(
        &self,
        query: Document,
        options: FindOptions,
    ) -> Result<Vec<ApplicationRecord>, StoreError> {
        let cursor = self
            .collection
            .find(query, options)
            .await
            .map_err(unavailable)?;
        let documents: Vec<ApplicationDocument> =
            cursor.try_collect().await.map_err(unavailable)?;
        documents
            .into_iter()
            .map(ApplicationRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl ApplicationStore for MongoApplicationStore {
    async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRecord>, StoreError> {
        self.search(&ReportFilter {
            status,
            date_range: None,
        })
        .await
    }

    async fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, StoreError> {
        let oid = object_id(id)?;
        self.collection
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound)
            .and_then(ApplicationRecord::try_from)
    }

    async fn find_by_name(
        &self,
        first_name_prefix: &str,
        last_name_prefix: &str,
    ) -> Result<ApplicationRecord, StoreError> {
        let query = doc! {
            "main_applicant.first_name": prefix_pattern(first_name_prefix),
            "main_applicant.last_name": prefix_pattern(last_name_prefix),
        };
        let options = FindOneOptions::builder().sort(insertion_order()).build();
        self.collection
            .find_one(query, options)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound)
            .and_then(ApplicationRecord::try_from)
    }

    async fn insert(&self, application: LoanApplication) -> Result<ApplicationId, StoreError> {
        let result = self
            .collection
            .insert_one(ApplicationDocument::from(application), None)
            .await
            .map_err(unavailable)?;
        result
            .inserted_id
            .as_object_id()
            .map(|oid| ApplicationId(oid.to_hex()))
            .ok_or_else(|| StoreError::Unavailable("insert returned a non-ObjectId _id".to_string()))
    }

    async fn update(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<(), StoreError> {
        let oid = object_id(id)?;
        let changes = bson::to_document(&update).map_err(unavailable)?;

        let matched = if changes.is_empty() {
            self.collection
                .count_documents(doc! { "_id": oid }, None)
                .await
                .map_err(unavailable)?
        } else {
            self.collection
                .update_one(doc! { "_id": oid }, doc! { "$set": changes }, None)
                .await
                .map_err(unavailable)?
                .matched_count
        };

        if matched == 0 {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn search(&self, filter: &ReportFilter) -> Result<Vec<ApplicationRecord>, StoreError> {
        let options = FindOptions::builder().sort(insertion_order()).build();
        self.find_all(filter_document(filter), options).await
    }

    async fn paginate(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Page<ApplicationRecord>, StoreError> {
        let query = filter_document(filter);
        let total = self
            .collection
            .count_documents(query.clone(), None)
            .await
            .map_err(unavailable)?;
        let options = FindOptions::builder()
            .sort(insertion_order())
            .skip(page.skip())
            .limit(i64::try_from(page.page_size()).unwrap_or(i64::MAX))
            .build();
        let data = self.find_all(query, options).await?;
        Ok(Page::new(data, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::store::DateRange;
    use chrono::TimeZone;

    #[test]
    fn name_prefix_is_anchored_and_escaped() {
        let pattern = prefix_pattern("o'b.(r)");
        assert_eq!(pattern.get_str("$regex").expect("regex"), r"^o'b\.\(r\)");
        assert_eq!(pattern.get_str("$options").expect("options"), "i");
    }

    #[test]
    fn filter_document_skips_absent_criteria() {
        assert!(filter_document(&ReportFilter::default()).is_empty());

        let filter = ReportFilter {
            status: Some(ApplicationStatus::Funded),
            date_range: None,
        };
        let query = filter_document(&filter);
        assert_eq!(query.get_str("status").expect("status"), "FUNDED");
        assert!(!query.contains_key("application_date"));
    }

    #[test]
    fn filter_document_bounds_dates_inclusively() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let filter = ReportFilter {
            status: None,
            date_range: Some(DateRange { start, end }),
        };
        let query = filter_document(&filter);
        let window = query
            .get_document("application_date")
            .expect("date window");
        assert_eq!(
            window.get_datetime("$gte").expect("lower bound"),
            &bson::DateTime::from_chrono(start)
        );
        assert_eq!(
            window.get_datetime("$lte").expect("upper bound"),
            &bson::DateTime::from_chrono(end)
        );
    }

    #[test]
    fn malformed_ids_resolve_to_not_found() {
        assert!(matches!(
            object_id(&ApplicationId("not-an-object-id".to_string())),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn empty_update_serializes_to_empty_set() {
        let changes = bson::to_document(&ApplicationUpdate::default()).expect("serializes");
        assert!(changes.is_empty());

        let changes = bson::to_document(&ApplicationUpdate {
            status: Some(ApplicationStatus::Funded),
            ..ApplicationUpdate::default()
        })
        .expect("serializes");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get_str("status").expect("status"), "FUNDED");
    }
}

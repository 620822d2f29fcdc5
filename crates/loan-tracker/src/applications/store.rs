use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationUpdate, LoanApplication,
};

/// Gateway over the single logical collection of loan applications.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// All records, optionally restricted to one status.
    async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRecord>, StoreError>;

    async fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, StoreError>;

    /// First record whose main applicant's names start with both prefixes, ignoring case.
    async fn find_by_name(
        &self,
        first_name_prefix: &str,
        last_name_prefix: &str,
    ) -> Result<ApplicationRecord, StoreError>;

    async fn insert(&self, application: LoanApplication) -> Result<ApplicationId, StoreError>;

    /// Merge `update` into the stored record; absent fields are left untouched.
    async fn update(&self, id: &ApplicationId, update: ApplicationUpdate)
        -> Result<(), StoreError>;

    async fn search(&self, filter: &ReportFilter) -> Result<Vec<ApplicationRecord>, StoreError>;

    async fn paginate(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Page<ApplicationRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("application not found")]
    NotFound,
    #[error("application store unavailable: {0}")]
    Unavailable(String),
}

/// Inclusive window over `application_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// A range only exists when both bounds are supplied; a lone bound filters nothing.
    pub fn from_bounds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self { start, end }),
            _ => None,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not an ISO 8601 date or timestamp")]
pub struct InvalidDateBound(pub String);

/// Parse a report bound. Accepts RFC 3339, a naive timestamp (read as UTC), or a
/// bare date (midnight UTC).
pub fn parse_date_bound(raw: &str) -> Result<DateTime<Utc>, InvalidDateBound> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| InvalidDateBound(raw.to_string()))
}

/// Filter shared by the paginated report and the report download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportFilter {
    pub status: Option<ApplicationStatus>,
    pub date_range: Option<DateRange>,
}

impl ReportFilter {
    pub fn matches(&self, application: &LoanApplication) -> bool {
        let status_ok = self
            .status
            .map_or(true, |status| application.status == status);
        let date_ok = self
            .date_range
            .map_or(true, |range| range.contains(application.application_date));
        status_ok && date_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageRequestError {
    #[error("page must be at least 1")]
    Page,
    #[error("page_size must be at least 1")]
    PageSize,
}

/// One-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u64 = 10;

    pub fn new(page: u64, page_size: u64) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::Page);
        }
        if page_size == 0 {
            return Err(PageRequestError::PageSize);
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            data,
            total,
            page: request.page,
            page_size: request.page_size,
            pages: total.div_ceil(request.page_size),
        }
    }
}

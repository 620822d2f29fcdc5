use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, store-assigned identifier. Immutable once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailing address. The postal code must be in Canadian `A1A 1A1` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employment {
    pub company_name: String,
    pub position: String,
    pub length_of_service: u32,
    pub gross_income: f64,
    pub company_address: Address,
    pub company_phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub year: u16,
    pub make: String,
    pub model: String,
}

/// Monthly expenses by category, in whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInfo {
    pub utilities: i64,
    #[serde(alias = "property_taxs")]
    pub property_tax: i64,
    pub child_support: i64,
    pub groceries: i64,
    #[serde(alias = "car_insurence")]
    pub car_insurance: i64,
    pub car_payment: i64,
    pub phone_bill: i64,
    pub internet: i64,
}

impl FinancialInfo {
    pub(crate) fn categories(&self) -> [(&'static str, i64); 8] {
        [
            ("utilities", self.utilities),
            ("property_tax", self.property_tax),
            ("child_support", self.child_support),
            ("groceries", self.groceries),
            ("car_insurance", self.car_insurance),
            ("car_payment", self.car_payment),
            ("phone_bill", self.phone_bill),
            ("internet", self.internet),
        ]
    }
}

/// Monthly income. Secondary sources that are not supplied count as zero dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    pub ft_income: i64,
    #[serde(default)]
    pub pt_income: i64,
    #[serde(default)]
    pub child_tax: i64,
    #[serde(default)]
    pub govt_support: i64,
    #[serde(default)]
    pub pension: i64,
}

impl Income {
    pub(crate) fn sources(&self) -> [(&'static str, i64); 5] {
        [
            ("ft_income", self.ft_income),
            ("pt_income", self.pt_income),
            ("child_tax", self.child_tax),
            ("govt_support", self.govt_support),
            ("pension", self.pension),
        ]
    }

    pub fn total(&self) -> i64 {
        self.sources().iter().map(|(_, amount)| amount).sum()
    }
}

/// An existing obligation held elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Loan {
    #[serde(default)]
    pub financial_institution: Option<String>,
    #[serde(default, alias = "monthly_pymnt")]
    pub monthly_payment: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: String,
    #[serde(rename = "SIN")]
    pub sin: String,
    pub address: Address,
    pub duration_at_address: u32,
    pub rent: i64,
    pub cell_phone: String,
    pub email: String,
    pub marital_status: String,
    pub dependents: u32,
    pub status_in_canada: String,
    #[serde(default)]
    pub ft_employment: Option<Employment>,
    #[serde(default)]
    pub vehicle1: Option<Vehicle>,
    #[serde(default)]
    pub vehicle2: Option<Vehicle>,
    #[serde(default)]
    pub monthly_expenses: Option<FinancialInfo>,
    #[serde(default)]
    pub monthly_income: Option<Income>,
    #[serde(default, alias = "loan")]
    pub loans: Vec<Loan>,
}

/// Case-worker facing status. Persisted as the upper-case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Approved,
    Funded,
    Declined,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Approved,
        ApplicationStatus::Funded,
        ApplicationStatus::Declined,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Funded => "FUNDED",
            ApplicationStatus::Declined => "DECLINED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

/// Intake payload. The creation timestamp and id are never accepted from clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub main_applicant: Applicant,
    #[serde(default)]
    pub co_applicant: Option<Applicant>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub security: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// The persisted aggregate, minus its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub main_applicant: Applicant,
    pub co_applicant: Option<Applicant>,
    pub amount: Option<f64>,
    pub security: Option<String>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub application_date: DateTime<Utc>,
}

impl LoanApplication {
    pub fn from_submission(submission: ApplicationSubmission, received_at: DateTime<Utc>) -> Self {
        let ApplicationSubmission {
            main_applicant,
            co_applicant,
            amount,
            security,
            status,
            notes,
            reason,
        } = submission;

        Self {
            main_applicant,
            co_applicant,
            amount,
            security,
            status,
            notes,
            reason,
            application_date: received_at,
        }
    }

    /// Merge-update: only the fields present in `update` are overwritten.
    pub fn apply(&mut self, update: ApplicationUpdate) {
        let ApplicationUpdate {
            status,
            notes,
            reason,
            co_applicant,
            amount,
            security,
        } = update;

        if let Some(status) = status {
            self.status = status;
        }
        if let Some(notes) = notes {
            self.notes = Some(notes);
        }
        if let Some(reason) = reason {
            self.reason = Some(reason);
        }
        if let Some(co_applicant) = co_applicant {
            self.co_applicant = Some(co_applicant);
        }
        if let Some(amount) = amount {
            self.amount = Some(amount);
        }
        if let Some(security) = security {
            self.security = Some(security);
        }
    }
}

/// Stored application together with its identity, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub application: LoanApplication,
}

/// Fields a case worker may change after intake. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_applicant: Option<Applicant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
}

impl ApplicationUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

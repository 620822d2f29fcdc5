//! Summary report rendering for case workers.
//!
//! Both renderers deliberately reduce each application to its main applicant's name and
//! status; the paginated JSON report is the place for full records.

mod excel;
mod pdf;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::applications::domain::ApplicationRecord;

pub use excel::{render_excel, report_rows};
pub use pdf::{render_pdf, LINES_PER_PAGE, REPORT_TITLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    #[serde(alias = "xlsx")]
    Excel,
}

impl ReportFormat {
    pub const fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "report.pdf",
            ReportFormat::Excel => "report.xlsx",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "excel",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unknown report format '{0}', expected pdf or excel")]
    UnknownFormat(String),
    #[error("failed to build PDF report: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build spreadsheet report: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

/// `N. First Last - STATUS`, numbered from 1 in record order.
pub fn report_lines(records: &[ApplicationRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let applicant = &record.application.main_applicant;
            format!(
                "{}. {} {} - {}",
                index + 1,
                applicant.first_name,
                applicant.last_name,
                record.application.status
            )
        })
        .collect()
}

pub fn render(records: &[ApplicationRecord], format: ReportFormat) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Pdf => render_pdf(&report_lines(records)),
        ReportFormat::Excel => render_excel(records),
    }
}

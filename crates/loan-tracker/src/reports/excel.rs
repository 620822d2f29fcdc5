use rust_xlsxwriter::{Format, Workbook};

use super::ReportError;
use crate::applications::domain::ApplicationRecord;

const SHEET_NAME: &str = "Loan Applications";
const HEADERS: [&str; 3] = ["First Name", "Last Name", "Status"];

/// Cell values under [`HEADERS`], one row per record in record order.
pub fn report_rows(records: &[ApplicationRecord]) -> Vec<[String; 3]> {
    records
        .iter()
        .map(|record| {
            let applicant = &record.application.main_applicant;
            [
                applicant.first_name.clone(),
                applicant.last_name.clone(),
                record.application.status.as_str().to_string(),
            ]
        })
        .collect()
}

/// One row per record under a fixed three-column header.
pub fn render_excel(records: &[ApplicationRecord]) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (column, title) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, column, title, &header)?;
    }

    for (row, cells) in (1u32..).zip(report_rows(records)) {
        for (column, value) in (0u16..).zip(&cells) {
            sheet.write_string(row, column, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

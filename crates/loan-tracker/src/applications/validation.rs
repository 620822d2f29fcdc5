use std::sync::OnceLock;

use regex::Regex;
use validator::ValidateEmail;

use super::domain::{
    Address, Applicant, ApplicationStatus, ApplicationSubmission, ApplicationUpdate, Employment,
};

/// Field-level rejection raised at the input boundary. `field` is the dotted path
/// of the offending value, e.g. `main_applicant.address.postal_code`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: {expected}")]
    InvalidFormat {
        field: String,
        expected: &'static str,
    },
    #[error("{field}: must not be blank")]
    Blank { field: String },
    #[error("{field}: must be a non-negative amount")]
    Negative { field: String },
    #[error("{field}: {detail}")]
    Malformed { field: String, detail: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::InvalidFormat { field, .. }
            | ValidationError::Blank { field }
            | ValidationError::Negative { field }
            | ValidationError::Malformed { field, .. } => field,
        }
    }

    fn invalid(field: String, expected: &'static str) -> Self {
        Self::InvalidFormat { field, expected }
    }
}

static POSTAL_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn postal_code_regex() -> &'static Regex {
    POSTAL_CODE_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][0-9][A-Za-z][ -]?[0-9][A-Za-z][0-9]$")
            .unwrap_or_else(|error| panic!("postal code regex failed to compile: {error}"))
    })
}

/// Canadian postal code check (`A1A 1A1`, optional space or hyphen, any case).
pub fn is_valid_postal_code(raw: &str) -> bool {
    postal_code_regex().is_match(raw)
}

/// Canonical stored form of an accepted postal code: upper case, single space.
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    if !is_valid_postal_code(raw) {
        return None;
    }
    let compact: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let (forward, local) = compact.split_at(3);
    Some(format!("{forward} {local}"))
}

/// Strip `()`, `.`, `-` and whitespace; the remainder must be exactly ten ASCII digits.
pub fn phone_digits(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '(' | ')' | '.' | '-')))
        .collect();

    if digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Mailbox syntax check; the domain must also contain at least one dot.
pub fn is_valid_email(raw: &str) -> bool {
    if !raw.validate_email() {
        return false;
    }
    match raw.rsplit_once('@') {
        Some((_, domain)) => {
            domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Status supplied as free text, e.g. a query parameter.
pub fn parse_status(raw: &str, field: &str) -> Result<ApplicationStatus, ValidationError> {
    raw.parse().map_err(|_| {
        ValidationError::invalid(
            field.to_string(),
            "expected one of APPLIED, APPROVED, FUNDED, DECLINED",
        )
    })
}

/// Validate an intake payload and return it with normalized postal codes.
pub fn validate_submission(
    mut submission: ApplicationSubmission,
) -> Result<ApplicationSubmission, ValidationError> {
    validate_applicant(&mut submission.main_applicant, "main_applicant")?;
    if let Some(co_applicant) = submission.co_applicant.as_mut() {
        validate_applicant(co_applicant, "co_applicant")?;
    }
    if let Some(amount) = submission.amount {
        ensure_non_negative_amount(amount, "amount".to_string())?;
    }
    Ok(submission)
}

/// Validate the fields present in a partial update.
pub fn validate_update(mut update: ApplicationUpdate) -> Result<ApplicationUpdate, ValidationError> {
    if let Some(co_applicant) = update.co_applicant.as_mut() {
        validate_applicant(co_applicant, "co_applicant")?;
    }
    if let Some(amount) = update.amount {
        ensure_non_negative_amount(amount, "amount".to_string())?;
    }
    Ok(update)
}

fn validate_applicant(applicant: &mut Applicant, path: &str) -> Result<(), ValidationError> {
    ensure_present(&applicant.first_name, format!("{path}.first_name"))?;
    ensure_present(&applicant.last_name, format!("{path}.last_name"))?;

    validate_address(&mut applicant.address, &format!("{path}.address"))?;

    if phone_digits(&applicant.cell_phone).is_none() {
        return Err(ValidationError::invalid(
            format!("{path}.cell_phone"),
            "expected a 10 digit phone number such as 416-555-1234",
        ));
    }

    if !is_valid_email(&applicant.email) {
        return Err(ValidationError::invalid(
            format!("{path}.email"),
            "expected an email address such as jane@example.com",
        ));
    }

    ensure_non_negative(applicant.rent, format!("{path}.rent"))?;

    if let Some(employment) = applicant.ft_employment.as_mut() {
        validate_employment(employment, &format!("{path}.ft_employment"))?;
    }

    if let Some(expenses) = &applicant.monthly_expenses {
        for (category, amount) in expenses.categories() {
            ensure_non_negative(amount, format!("{path}.monthly_expenses.{category}"))?;
        }
    }

    if let Some(income) = &applicant.monthly_income {
        for (source, amount) in income.sources() {
            ensure_non_negative(amount, format!("{path}.monthly_income.{source}"))?;
        }
    }

    for (index, loan) in applicant.loans.iter().enumerate() {
        if let Some(payment) = loan.monthly_payment {
            ensure_non_negative(payment, format!("{path}.loans[{index}].monthly_payment"))?;
        }
    }

    Ok(())
}

fn validate_employment(employment: &mut Employment, path: &str) -> Result<(), ValidationError> {
    ensure_non_negative_amount(employment.gross_income, format!("{path}.gross_income"))?;
    validate_address(
        &mut employment.company_address,
        &format!("{path}.company_address"),
    )
}

fn validate_address(address: &mut Address, path: &str) -> Result<(), ValidationError> {
    match normalize_postal_code(&address.postal_code) {
        Some(normalized) => {
            address.postal_code = normalized;
            Ok(())
        }
        None => Err(ValidationError::invalid(
            format!("{path}.postal_code"),
            "expected a Canadian postal code such as M5V 2T6",
        )),
    }
}

fn ensure_present(value: &str, field: String) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(())
    }
}

fn ensure_non_negative(amount: i64, field: String) -> Result<(), ValidationError> {
    if amount < 0 {
        Err(ValidationError::Negative { field })
    } else {
        Ok(())
    }
}

fn ensure_non_negative_amount(amount: f64, field: String) -> Result<(), ValidationError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field })
    }
}

use super::common::*;
use crate::applications::domain::{ApplicationStatus, ApplicationUpdate, Loan};
use crate::applications::validation::{
    is_valid_email, is_valid_postal_code, normalize_postal_code, parse_status, phone_digits,
    validate_submission, validate_update, ValidationError,
};

#[test]
fn postal_codes_follow_the_canadian_pattern() {
    for accepted in ["M5V 2T6", "m5v2t6", "K1A-0B1", "h0h 0h0"] {
        assert!(is_valid_postal_code(accepted), "{accepted} should be accepted");
    }
    for rejected in ["", "M5V  2T6", "5MV 2T6", "M5V 2T", "M5V 2T6X", "12345", "M5V_2T6"] {
        assert!(!is_valid_postal_code(rejected), "{rejected} should be rejected");
    }
}

#[test]
fn postal_codes_reject_non_ascii_digits() {
    for rejected in ["K\u{0661}A \u{0660}B\u{0661}", "M\u{FF15}V 2T6"] {
        assert!(!is_valid_postal_code(rejected), "{rejected} should be rejected");
        assert_eq!(normalize_postal_code(rejected), None);
    }

    let mut submission = submission("Amal", "Haddad");
    submission.main_applicant.address.postal_code = "K\u{0661}A \u{0660}B\u{0661}".to_string();
    let err = validate_submission(submission).expect_err("non-ASCII digits rejected");
    assert_eq!(err.field(), "main_applicant.address.postal_code");
}

#[test]
fn postal_codes_are_normalized_for_storage() {
    assert_eq!(normalize_postal_code("m5v2t6").as_deref(), Some("M5V 2T6"));
    assert_eq!(normalize_postal_code("k1a-0b1").as_deref(), Some("K1A 0B1"));
    assert_eq!(normalize_postal_code("nope"), None);
}

#[test]
fn phones_reduce_to_ten_digits_regardless_of_punctuation() {
    for accepted in ["416-555-1234", "(416)5551234", "4165551234", "416.555.1234", " (416) 555 1234 "] {
        assert_eq!(phone_digits(accepted).as_deref(), Some("4165551234"), "{accepted}");
    }
    for rejected in ["123-456-789", "1-416-555-1234", "416-555-12a4", "+14165551234", ""] {
        assert_eq!(phone_digits(rejected), None, "{rejected}");
    }
}

#[test]
fn emails_need_a_dotted_domain() {
    assert!(is_valid_email("john.doe@example.com"));
    assert!(!is_valid_email("john.doe@localhost"));
    assert!(!is_valid_email("john.doe.example.com"));
    assert!(!is_valid_email("john@.example"));
}

#[test]
fn valid_submission_is_returned_normalized() {
    let validated = validate_submission(submission("John", "Doe")).expect("valid submission");
    let employment = validated
        .main_applicant
        .ft_employment
        .as_ref()
        .expect("employment kept");
    assert_eq!(employment.company_address.postal_code, "M4W 1A8");
    assert_eq!(validated.main_applicant.address.postal_code, "M5V 2T6");
    assert_eq!(validated.main_applicant.cell_phone, "416-555-1234");
}

#[test]
fn bad_postal_code_names_the_nested_field() {
    let mut payload = submission("John", "Doe");
    payload.main_applicant.address.postal_code = "90210".to_string();

    let error = validate_submission(payload).expect_err("rejected");
    assert_eq!(error.field(), "main_applicant.address.postal_code");
    assert!(matches!(error, ValidationError::InvalidFormat { .. }));
}

#[test]
fn co_applicant_is_held_to_the_same_rules() {
    let mut payload = submission("John", "Doe");
    let mut co_applicant = applicant("Jane", "Doe");
    co_applicant.cell_phone = "555-1234".to_string();
    payload.co_applicant = Some(co_applicant);

    let error = validate_submission(payload).expect_err("rejected");
    assert_eq!(error.field(), "co_applicant.cell_phone");
}

#[test]
fn blank_names_and_negative_amounts_are_rejected() {
    let mut payload = submission("John", "Doe");
    payload.main_applicant.last_name = "   ".to_string();
    assert_eq!(
        validate_submission(payload).expect_err("rejected"),
        ValidationError::Blank {
            field: "main_applicant.last_name".to_string()
        }
    );

    let mut payload = submission("John", "Doe");
    payload.main_applicant.loans.push(Loan {
        financial_institution: None,
        monthly_payment: Some(-5),
    });
    assert_eq!(
        validate_submission(payload).expect_err("rejected").field(),
        "main_applicant.loans[1].monthly_payment"
    );

    let mut payload = submission("John", "Doe");
    payload.amount = Some(f64::NAN);
    assert_eq!(
        validate_submission(payload).expect_err("rejected").field(),
        "amount"
    );
}

#[test]
fn missing_secondary_income_counts_as_zero() {
    let raw = serde_json::json!({
        "ft_income": 4100,
    });
    let income: crate::applications::domain::Income =
        serde_json::from_value(raw).expect("secondary sources default");
    assert_eq!(income.total(), 4100);
}

#[test]
fn updates_only_check_the_fields_they_carry() {
    let update = ApplicationUpdate {
        status: Some(ApplicationStatus::Funded),
        ..ApplicationUpdate::default()
    };
    assert_eq!(validate_update(update.clone()).expect("valid"), update);

    let mut bad_co = applicant("Jane", "Doe");
    bad_co.email = "jane".to_string();
    let update = ApplicationUpdate {
        co_applicant: Some(bad_co),
        ..ApplicationUpdate::default()
    };
    assert_eq!(
        validate_update(update).expect_err("rejected").field(),
        "co_applicant.email"
    );
}

#[test]
fn statuses_are_a_closed_set() {
    assert_eq!(parse_status("funded", "status"), Ok(ApplicationStatus::Funded));
    let error = parse_status("PENDING", "status").expect_err("unknown status");
    assert_eq!(error.field(), "status");

    let parsed: Result<ApplicationUpdate, _> =
        serde_json::from_value(serde_json::json!({ "status": "PENDING" }));
    assert!(parsed.is_err());
}

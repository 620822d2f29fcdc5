use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use loan_tracker::applications::{
    application_router, InMemoryApplicationStore, LoanApplicationService,
};
use loan_tracker::documents::{DocumentStore, InMemoryDocumentStore};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "workflow-boundary";

fn intake_payload() -> Value {
    json!({
        "main_applicant": {
            "first_name": "John",
            "last_name": "Doe",
            "date_of_birth": "1985-02-14",
            "SIN": "130692544",
            "address": {
                "street": "1 Front St",
                "city": "Toronto",
                "province": "ON",
                "postal_code": "m5v2t6"
            },
            "duration_at_address": 24,
            "rent": 1800,
            "cell_phone": "416-555-1234",
            "email": "john.doe@example.com",
            "marital_status": "married",
            "dependents": 2,
            "status_in_canada": "citizen",
            "monthly_income": { "ft_income": 5200 },
            "loans": [{ "financial_institution": "Bank of Example", "monthly_payment": 250 }]
        },
        "amount": 12000.0,
        "security": "2017 Toyota Corolla",
        "reason": "Vehicle purchase"
    })
}

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(payload).expect("payload serializes"),
        ))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

fn pdf_upload(uri: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn intake_to_report_through_the_http_surface() {
    let documents = Arc::new(InMemoryDocumentStore::default());
    let service = LoanApplicationService::new(
        Arc::new(InMemoryApplicationStore::default()),
        documents.clone(),
    );
    let router = application_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request("POST", "/applications", &intake_payload()))
        .await
        .expect("create executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = json_body(response).await["id"]
        .as_str()
        .expect("id is a string")
        .to_string();

    let response = router
        .clone()
        .oneshot(get("/applications/search?first_name=Jo&last_name=Do"))
        .await
        .expect("search executes");
    assert_eq!(response.status(), StatusCode::OK);
    let found = json_body(response).await;
    assert_eq!(found["id"], id.as_str());
    assert_eq!(found["status"], "APPLIED");
    assert_eq!(
        found["main_applicant"]["address"]["postal_code"], "M5V 2T6",
        "postal codes are stored in canonical form"
    );
    assert!(found["application_date"].is_string());

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/applications/{id}"),
            &json!({ "status": "APPROVED", "notes": "Verified employment" }),
        ))
        .await
        .expect("update executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(pdf_upload(
            &format!("/applications/{id}/upload?file_type=contract"),
            "contract-signed.pdf",
            b"%PDF-1.7 signed contract",
        ))
        .await
        .expect("upload executes");
    assert_eq!(response.status(), StatusCode::OK);

    // A second upload of the same type replaces the first.
    let response = router
        .clone()
        .oneshot(pdf_upload(
            &format!("/applications/{id}/upload?file_type=contract"),
            "contract-v2.pdf",
            b"%PDF-1.7 amended contract",
        ))
        .await
        .expect("upload executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(documents.len(), 1);
    let stored = documents
        .get_object(&format!("doe_john_{id}/contract.pdf"))
        .await
        .expect("object stored");
    assert_eq!(stored, b"%PDF-1.7 amended contract".to_vec());

    let response = router
        .clone()
        .oneshot(get(&format!("/applications/{id}/files")))
        .await
        .expect("files executes");
    let files = json_body(response).await;
    let files = files.as_array().expect("file list");
    assert_eq!(files.len(), 1);
    assert!(files[0]
        .as_str()
        .is_some_and(|name| name.ends_with("contract.pdf")));

    let response = router
        .clone()
        .oneshot(get("/report?status=APPROVED"))
        .await
        .expect("report executes");
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["total"], 1);
    assert_eq!(report["data"][0]["notes"], "Verified employment");

    let response = router
        .oneshot(get("/report/download?format=pdf&status=APPROVED"))
        .await
        .expect("report download executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("body readable");
    assert!(bytes.starts_with(b"%PDF"));
}

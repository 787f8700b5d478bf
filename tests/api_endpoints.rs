//! Integration tests for AadhaarChain API endpoints
//!
//! These tests drive the credential, verification and history endpoints the
//! web client uses, plus the chain inspection endpoints.

use aadhaarchain::api::{build_api_router, ApiNode};
use aadhaarchain::service::VerificationService;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

const SUBJECT: &str = "123456789012";

fn test_server(reveal_otp: bool) -> (TestServer, Arc<VerificationService>) {
    let service = Arc::new(VerificationService::new(1).expect("Failed to create service"));
    let node = Arc::new(ApiNode::new(service.clone(), reveal_otp));
    let server = TestServer::new(build_api_router(node)).expect("Failed to create test server");
    (server, service)
}

async fn issue_otp(server: &TestServer, subject: &str) -> String {
    let response = server
        .post("/generate-otp")
        .json(&json!({ "aadhar_number": subject }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    json["otp"].as_str().expect("otp missing").to_string()
}

#[tokio::test]
async fn test_generate_otp_rejects_short_number() {
    let (server, service) = test_server(true);

    let response = server
        .post("/generate-otp")
        .json(&json!({ "subject_id": "12345" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid Aadhaar number");
    assert!(json.get("otp").is_none());

    assert!(service.otp_store().is_empty());
    assert_eq!(service.blockchain().len(), 1);
}

#[tokio::test]
async fn test_generate_otp_hidden_when_not_revealed() {
    let (server, service) = test_server(false);

    let response = server
        .post("/generate-otp")
        .json(&json!({ "subject_id": SUBJECT }))
        .await;
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert!(json.get("otp").is_none());
    assert!(service.has_credential(SUBJECT));
}

#[tokio::test]
async fn test_verify_and_history_flow() {
    let (server, _service) = test_server(true);
    let otp = issue_otp(&server, SUBJECT).await;

    let response = server
        .post("/verify-transaction")
        .json(&json!({ "aadhar_number": SUBJECT, "transaction_type": "UPDATE", "otp": otp }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Transaction verified and added to blockchain");

    // Same code again: the credential is gone.
    let response = server
        .post("/verify-transaction")
        .json(&json!({ "aadhar_number": SUBJECT, "transaction_type": "UPDATE", "otp": otp }))
        .await;
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "OTP expired. Please generate a new OTP");

    let response = server.get(&format!("/transaction-history/{}", SUBJECT)).await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total_items"], 1);
    assert_eq!(json["total_pages"], 1);
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["transactions"][0]["verification_status"], "VERIFIED");
    assert_eq!(json["transactions"][0]["transaction_type"], "UPDATE");
}

#[tokio::test]
async fn test_wrong_otp_reports_verification_failed() {
    let (server, service) = test_server(true);
    let otp = issue_otp(&server, SUBJECT).await;
    let wrong = if otp == "100000" { "100001" } else { "100000" };

    let response = server
        .post("/verify-transaction")
        .json(&json!({ "subject_id": SUBJECT, "transaction_type": "AUTH", "otp": wrong }))
        .await;
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Verification failed");
    assert!(service.has_credential(SUBJECT));
    assert_eq!(service.blockchain().len(), 1);
}

#[tokio::test]
async fn test_history_query_parameters() {
    let (server, service) = test_server(true);
    for kind in ["AUTH", "UPDATE", "AUTH"] {
        let issued = service.issue_credential(SUBJECT).unwrap();
        assert!(service.submit(SUBJECT, kind, &issued.code).is_verified());
    }

    let response = server
        .get(&format!(
            "/transaction-history/{}?filter_type=AUTH&sort_by=timestamp&sort_order=asc&per_page=1&page=2",
            SUBJECT
        ))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["total_items"], 2);
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["current_page"], 2);
    assert_eq!(json["transactions"].as_array().unwrap().len(), 1);

    let response = server
        .get(&format!("/transaction-history/{}?page=0", SUBJECT))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server.get("/transaction-history/12345").await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["error"], "Invalid Aadhaar number");
}

#[tokio::test]
async fn test_inspection_endpoints() {
    let (server, service) = test_server(true);
    let issued = service.issue_credential(SUBJECT).unwrap();
    assert!(service.submit(SUBJECT, "UPDATE", &issued.code).is_verified());

    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());

    let response = server.get("/api/blockchain/stats").await;
    let json: Value = response.json();
    assert_eq!(json["height"], 2);
    assert_eq!(json["difficulty"], 1);
    assert_eq!(json["pending"], 0);

    let response = server.get("/api/blockchain/blocks").await;
    let json: Value = response.json();
    assert_eq!(json["total"], 2);
    assert_eq!(json["blocks"][0]["index"], 1);
    assert_eq!(json["blocks"][1]["previous_hash"], "0");

    let response = server.get("/api/blockchain/block/0").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["payload"]["kind"], "genesis");
    assert_eq!(json["payload"]["message"], "Genesis Block");

    let response = server.get("/api/blockchain/block/999").await;
    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let response = server.get("/api/blockchain/verify").await;
    let json: Value = response.json();
    assert_eq!(json["valid"], true);

    let response = server.get("/api/stats").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert!(json["total_requests"].is_number());
    assert!(json["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_rejected_replies_count_as_failed_requests() {
    let (server, _service) = test_server(true);

    server
        .post("/generate-otp")
        .json(&json!({ "subject_id": "12345" }))
        .await;
    let otp = issue_otp(&server, SUBJECT).await;
    let wrong = if otp == "100000" { "100001" } else { "100000" };
    server
        .post("/verify-transaction")
        .json(&json!({ "subject_id": SUBJECT, "transaction_type": "AUTH", "otp": wrong }))
        .await;

    let json: Value = server.get("/api/stats").await.json();
    assert_eq!(json["total_requests"], 3);
    assert_eq!(json["successful_requests"], 1);
    assert_eq!(json["failed_requests"], 2);
    assert_eq!(json["otps_issued"], 1);
    assert_eq!(json["transactions_rejected"], 1);
}

#[tokio::test]
async fn test_block_pages_count_from_one() {
    let (server, service) = test_server(true);
    for _ in 0..2 {
        let issued = service.issue_credential(SUBJECT).unwrap();
        assert!(service.submit(SUBJECT, "UPDATE", &issued.code).is_verified());
    }

    let response = server.get("/api/blockchain/blocks?page=1&limit=2").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["page"], 1);
    assert_eq!(json["blocks"][0]["index"], 2);
    assert_eq!(json["blocks"][1]["index"], 1);

    let json: Value = server.get("/api/blockchain/blocks?page=2&limit=2").await.json();
    assert_eq!(json["blocks"].as_array().unwrap().len(), 1);
    assert_eq!(json["blocks"][0]["index"], 0);

    let response = server.get("/api/blockchain/blocks?page=0").await;
    assert_eq!(response.status_code(), 400);
}

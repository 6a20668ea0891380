//! API integration tests
//!
//! Need a running server and the rows from `tests/fixtures/seed.sql`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const BORROWER_ID: i64 = 1001;

/// Create and authorize a loan, returning its ID
async fn open_loan(client: &Client, resource_ids: &[i64]) -> i64 {
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "borrower_id": BORROWER_ID,
            "resource_ids": resource_ids,
        }))
        .send()
        .await
        .expect("Failed to send create request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "pending");
    let loan_id = body["id"].as_i64().expect("No loan ID");

    let response = client
        .post(format!("{}/loans/{}/authorize", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send authorize request");
    assert!(response.status().is_success());

    loan_id
}

async fn get_json(client: &Client, path: &str) -> Value {
    let response = client
        .get(format!("{}{}", BASE_URL, path))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success(), "GET {} failed: {}", path, response.status());
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let body = get_json(&client, "/health").await;
    assert_eq!(body["status"], "healthy");

    let body = get_json(&client, "/ready").await;
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_loan_not_found() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans/999999", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_create_loan_requires_resources() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "borrower_id": BORROWER_ID, "resource_ids": [] }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_return_with_damage() {
    let client = Client::new();
    let loan_id = open_loan(&client, &[1001, 1002]).await;

    let resource = get_json(&client, "/resources/1001").await;
    assert_eq!(resource["status"], "loaned");

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({
            "notes": "[Resource ID 1001]\nDamages: [Cracked Screen, Broken Hinge] | Notes: \"dropped\""
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");
    assert_eq!(body["overdue_days"], 0);
    assert_eq!(body["incidents_created"], 2);

    let damaged = get_json(&client, "/resources/1001").await;
    assert_eq!(damaged["status"], "damaged");
    let clean = get_json(&client, "/resources/1002").await;
    assert_eq!(clean["status"], "available");

    let incidents = get_json(&client, "/resources/1001/incidents").await;
    let incidents = incidents.as_array().expect("incidents array");
    assert_eq!(incidents.len(), 2);
    assert_eq!(incidents[0]["incident_number"], 1);
    assert_eq!(incidents[0]["damage_type"], "Cracked Screen");
    assert_eq!(incidents[0]["description"], "dropped");
    assert_eq!(incidents[1]["incident_number"], 2);

    let summary = get_json(&client, "/resources/1001/maintenance").await;
    assert_eq!(summary["total_incidents"], 2);
    assert_eq!(summary["completed_incidents"], 0);
    assert_eq!(summary["primary_reporter"], "Ada Lovelace");

    let reports = get_json(&client, &format!("/loans/{}/damage-reports", loan_id)).await;
    assert_eq!(reports["reports"][0]["resource_id"], "1001");
}

#[tokio::test]
#[ignore]
async fn test_return_twice_is_rejected() {
    let client = Client::new();
    let loan_id = open_loan(&client, &[1003]).await;

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let resource = get_json(&client, "/resources/1003").await;
    assert_eq!(resource["status"], "available");
}

#[tokio::test]
#[ignore]
async fn test_return_with_foreign_resource_rolls_back() {
    let client = Client::new();
    let loan_id = open_loan(&client, &[1004]).await;

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({
            "reports": [{ "resource_id": "999999", "damages": ["Dent"] }]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    let loan = get_json(&client, &format!("/loans/{}", loan_id)).await;
    assert!(loan["actual_return"].is_null());
    let resource = get_json(&client, "/resources/1004").await;
    assert_eq!(resource["status"], "loaned");
}

#[tokio::test]
#[ignore]
async fn test_maintenance_completion_releases_resource() {
    let client = Client::new();
    let loan_id = open_loan(&client, &[1005]).await;

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({
            "reports": [{ "resource_id": "default", "damages": ["Dent"], "damage_note": "corner" }]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .put(format!("{}/resources/1005/status", BASE_URL))
        .json(&json!({ "status": "in_repair" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let incidents = get_json(&client, "/resources/1005/incidents").await;
    let incident_id = incidents[0]["id"].as_i64().expect("No incident ID");

    let response = client
        .put(format!("{}/incidents/{}/status", BASE_URL, incident_id))
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["summary"]["completion_percentage"], 100.0);
    assert_eq!(body["summary"]["overall_status"], "completed");

    let resource = get_json(&client, "/resources/1005").await;
    assert_eq!(resource["status"], "available");
}

#[tokio::test]
#[ignore]
async fn test_direct_release_is_rejected() {
    let client = Client::new();

    let response = client
        .put(format!("{}/resources/1006/status", BASE_URL))
        .json(&json!({ "status": "available" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_refresh_overdue() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans/refresh-overdue", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["updated"].is_number());
}

async fn return_loan(client: &Client, loan_id: i64, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&body)
        .send()
        .await
        .expect("Failed to send return request")
}

async fn set_incident_status(client: &Client, incident_id: i64, status: &str) -> reqwest::Response {
    client
        .put(format!("{}/incidents/{}/status", BASE_URL, incident_id))
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Failed to send incident request")
}

#[tokio::test]
#[ignore]
async fn test_incident_numbering_continues_across_loans() {
    let client = Client::new();

    let first = open_loan(&client, &[1007]).await;
    let response = return_loan(
        &client,
        first,
        json!({ "notes": "[Resource ID 1007]\nDamages: [Dent, Scratch]" }),
    )
    .await;
    assert!(response.status().is_success());

    let incidents = get_json(&client, "/resources/1007/incidents").await;
    let ids: Vec<i64> = incidents
        .as_array()
        .expect("incidents array")
        .iter()
        .map(|i| i["id"].as_i64().expect("No incident ID"))
        .collect();
    assert_eq!(ids.len(), 2);

    // one repaired, one written off: the resource goes back into service
    assert!(set_incident_status(&client, ids[0], "completed").await.status().is_success());
    let response = set_incident_status(&client, ids[1], "cancelled").await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["summary"]["completion_percentage"], 50.0);

    let resource = get_json(&client, "/resources/1007").await;
    assert_eq!(resource["status"], "available");

    let second = open_loan(&client, &[1007]).await;
    let response = return_loan(
        &client,
        second,
        json!({ "reports": [{ "resource_id": "1007", "damages": ["Crack"] }] }),
    )
    .await;
    assert!(response.status().is_success());

    let incidents = get_json(&client, "/resources/1007/incidents").await;
    let numbers: Vec<i64> = incidents
        .as_array()
        .expect("incidents array")
        .iter()
        .map(|i| i["incident_number"].as_i64().expect("No incident number"))
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
#[ignore]
async fn test_cancelling_only_open_incident_is_rejected() {
    let client = Client::new();
    let loan_id = open_loan(&client, &[1011]).await;

    let response = return_loan(&client, loan_id, json!({ "notes": "Damages: [Dent]" })).await;
    assert!(response.status().is_success());

    let incidents = get_json(&client, "/resources/1011/incidents").await;
    let incident_id = incidents[0]["id"].as_i64().expect("No incident ID");

    let response = set_incident_status(&client, incident_id, "cancelled").await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_return_rejects_bad_input_and_keeps_loan_open() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "borrower_id": BORROWER_ID,
            "resource_ids": [1008],
            "notes": "[fragile] handle with care",
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_i64().expect("No loan ID");

    let response = client
        .post(format!("{}/loans/{}/authorize", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // returned before it was lent
    let response = return_loan(&client, loan_id, json!({ "returned_at": "2000-01-01T00:00:00Z" })).await;
    assert_eq!(response.status(), 400);

    // ids that would break the notes format
    for id in ["7]", "5\nDamages: [Injected]"] {
        let response = return_loan(
            &client,
            loan_id,
            json!({ "reports": [{ "resource_id": id, "damages": ["Crack"] }] }),
        )
        .await;
        assert_eq!(response.status(), 400);
    }

    let loan = get_json(&client, &format!("/loans/{}", loan_id)).await;
    assert!(loan["actual_return"].is_null());

    let response = return_loan(
        &client,
        loan_id,
        json!({ "reports": [{ "resource_id": "1008", "damages": ["Dent"] }] }),
    )
    .await;
    assert!(response.status().is_success());

    let reports = get_json(&client, &format!("/loans/{}/damage-reports", loan_id)).await;
    assert!(reports["timestamp"].is_string());
    assert_ne!(reports["timestamp"], "fragile");
    assert_eq!(reports["reports"][0]["resource_id"], "1008");
    assert_eq!(reports["reports"][0]["damages"][0], "Dent");
}

#[tokio::test]
#[ignore]
async fn test_unmarked_damage_on_multi_resource_loan_is_rejected() {
    let client = Client::new();
    let loan_id = open_loan(&client, &[1009, 1010]).await;

    let response = return_loan(
        &client,
        loan_id,
        json!({ "notes": "Damages: [Cracked Screen] | Notes: \"dropped\"" }),
    )
    .await;
    assert_eq!(response.status(), 400);

    for id in [1009, 1010] {
        let resource = get_json(&client, &format!("/resources/{}", id)).await;
        assert_eq!(resource["status"], "loaned");
    }

    let response = return_loan(&client, loan_id, json!({})).await;
    assert!(response.status().is_success());
}

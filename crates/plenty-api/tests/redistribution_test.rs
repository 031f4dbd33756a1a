#![allow(clippy::unwrap_used)]
// Integration tests for the redistribution workflow using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plenty_api::redistribution::{
    Direction, LocationTransfer, TargetLocation, VariationTransfer, Violation,
};
use plenty_api::{
    BaseUrl, Credential, Error, PlentyClient, RedistributionTemplate, StepOutcome, TransportConfig,
    WorkflowStep,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PlentyClient) {
    let server = MockServer::start().await;
    let client = PlentyClient::with_credential(
        reqwest::Client::new(),
        BaseUrl::trusted(Url::parse(&server.uri()).unwrap()),
        Credential::new("Bearer", SecretString::from("token".to_owned())),
        TransportConfig::default(),
    );
    (server, client)
}

async fn mount_order(server: &MockServer, items: Value) {
    Mock::given(method("POST"))
        .and(path("/rest/redistributions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 900,
            "typeId": 15,
            "orderItems": items,
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_transactions(server: &MockServer, order_item_id: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/rest/orders/items/{order_item_id}/transactions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(server)
        .await;
}

/// `METHOD /path` of every received request, in arrival order.
async fn calls(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| format!("{} {}", req.method, req.url.path()))
        .collect()
}

async fn bodies(server: &MockServer, suffix: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| req.url.path().ends_with(suffix))
        .map(|req| req.body_json().unwrap())
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_location_transfer_without_booking() {
    let (server, client) = setup().await;
    mount_order(&server, json!([{"id": 1001, "itemVariationId": 5}])).await;
    mount_transactions(&server, 1001).await;
    Mock::given(path_regex(r"^/rest/orders/\d+/booking$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let template = RedistributionTemplate::new(10, 20, 1)
        .variation(VariationTransfer::new(5, 3).location(LocationTransfer::new(100, 3)));

    let report = client.create_redistribution(&template, false).await.unwrap();

    assert_eq!(report.order_id, 900);
    assert!(report.is_complete());
    assert_eq!(report.transactions(Direction::Out).count(), 1);
    assert_eq!(report.transactions(Direction::In).count(), 0);

    let order = &bodies(&server, "/rest/redistributions").await[0];
    assert_eq!(order["orderItems"][0]["quantity"], json!(3));
    assert_eq!(order["orderItems"].as_array().unwrap().len(), 1);

    assert_eq!(
        bodies(&server, "/transactions").await,
        vec![json!({
            "orderItemId": 1001,
            "quantity": 3,
            "direction": "out",
            "status": "regular",
            "warehouseLocationId": 100,
        })]
    );
}

#[tokio::test]
async fn test_invalid_template_issues_no_requests() {
    let (server, client) = setup().await;

    let unbalanced = RedistributionTemplate::new(10, 20, 1)
        .variation(VariationTransfer::new(5, 3).location(LocationTransfer::new(100, 2)));
    let result = client.create_redistribution(&unbalanced, true).await;
    match result {
        Err(Error::Validation(err)) => assert_eq!(
            err.violations,
            vec![Violation::LocationSum {
                variation_id: 5,
                expected: 3,
                actual: 2,
            }]
        ),
        other => panic!("expected a validation error, got: {other:?}"),
    }

    let nested = RedistributionTemplate::new(10, 20, 1).variation(
        VariationTransfer::new(5, 3).location(
            LocationTransfer::new(100, 3)
                .target(TargetLocation::new(200, 1))
                .target(TargetLocation::new(201, 1)),
        ),
    );
    let result = client.create_redistribution(&nested, false).await;
    assert!(matches!(result, Err(Error::Validation(_))), "got: {result:?}");

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_variation_is_rejected_before_ordering() {
    let (server, client) = setup().await;

    let template = RedistributionTemplate::new(10, 20, 1)
        .variation(VariationTransfer::new(5, 1).location(LocationTransfer::new(100, 1)))
        .variation(VariationTransfer::new(5, 2).location(LocationTransfer::new(101, 2)));

    let result = client.create_redistribution(&template, false).await;

    match result {
        Err(Error::Validation(err)) => assert_eq!(
            err.violations,
            vec![Violation::DuplicateVariation { variation_id: 5 }]
        ),
        other => panic!("expected a validation error, got: {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_sequence_with_targets() {
    let (server, client) = setup().await;
    mount_order(&server, json!([{"id": 1001, "itemVariationId": 5}])).await;
    mount_transactions(&server, 1001).await;
    Mock::given(method("PUT"))
        .and(path("/rest/redistributions/900"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 900})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/orders/900/booking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let template = RedistributionTemplate::new(10, 20, 1).variation(
        VariationTransfer::new(5, 4).location(
            LocationTransfer::new(100, 4)
                .batch("B-7")
                .target(TargetLocation::new(200, 3))
                .target(TargetLocation::new(201, 1)),
        ),
    );

    let report = client.create_redistribution(&template, true).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(
        calls(&server).await,
        vec![
            "POST /rest/redistributions",
            "POST /rest/orders/items/1001/transactions",
            "PUT /rest/redistributions/900",
            "POST /rest/orders/900/booking",
            "POST /rest/orders/items/1001/transactions",
            "POST /rest/orders/items/1001/transactions",
            "POST /rest/orders/900/booking",
            "PUT /rest/redistributions/900",
        ]
    );

    let date_types: Vec<Value> = bodies(&server, "/rest/redistributions/900")
        .await
        .iter()
        .map(|body| body["dates"][0]["typeId"].clone())
        .collect();
    assert_eq!(date_types, vec![json!(16), json!(18)]);

    let transactions = bodies(&server, "/transactions").await;
    assert_eq!(transactions[1]["direction"], json!("in"));
    assert_eq!(transactions[1]["warehouseLocationId"], json!(200));
    assert_eq!(transactions[2]["batch"], json!("B-7"));
}

#[tokio::test]
async fn test_failed_transaction_skips_booking_but_not_siblings() {
    let (server, client) = setup().await;
    mount_order(&server, json!([{"id": 1001, "itemVariationId": 5}])).await;
    Mock::given(method("POST"))
        .and(path("/rest/orders/items/1001/transactions"))
        .and(body_partial_json(json!({"warehouseLocationId": 100})))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {"message": "Location is locked"}
        })))
        .mount(&server)
        .await;
    mount_transactions(&server, 1001).await;
    Mock::given(path_regex(r"^/rest/(orders/900/booking|redistributions/900)$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let template = RedistributionTemplate::new(10, 20, 1).variation(
        VariationTransfer::new(5, 3)
            .location(LocationTransfer::new(100, 1))
            .location(LocationTransfer::new(101, 2).target(TargetLocation::new(200, 2))),
    );

    let report = client.create_redistribution(&template, true).await.unwrap();

    assert!(!report.is_complete());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].outcome,
        StepOutcome::Failed("Location is locked".into())
    );
    assert_eq!(report.transactions(Direction::Out).count(), 2);
    assert_eq!(report.transactions(Direction::In).count(), 1);

    let skipped: Vec<WorkflowStep> = report
        .steps
        .iter()
        .filter(|record| matches!(record.outcome, StepOutcome::Skipped(_)))
        .map(|record| record.step)
        .collect();
    assert_eq!(
        skipped,
        vec![
            WorkflowStep::InitiateDate,
            WorkflowStep::BookOutgoing,
            WorkflowStep::BookIncoming,
            WorkflowStep::FinishDate,
        ]
    );
}

#[tokio::test]
async fn test_variation_missing_from_order_is_recorded() {
    let (server, client) = setup().await;
    mount_order(&server, json!([{"id": 1001, "itemVariationId": 5}])).await;
    mount_transactions(&server, 1001).await;

    let template = RedistributionTemplate::new(10, 20, 1)
        .variation(VariationTransfer::new(5, 1).location(LocationTransfer::new(100, 1)))
        .variation(VariationTransfer::new(6, 1).location(LocationTransfer::new(101, 1)));

    let report = client.create_redistribution(&template, false).await.unwrap();

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].step,
        WorkflowStep::Transaction {
            direction: Direction::Out,
            variation_id: 6,
            location_id: 101,
        }
    );
    assert_eq!(bodies(&server, "/transactions").await.len(), 1);
}

#[tokio::test]
async fn test_order_creation_failure_is_an_error() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/rest/redistributions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "The warehouse does not exist"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let template = RedistributionTemplate::new(10, 20, 1)
        .variation(VariationTransfer::new(5, 3).location(LocationTransfer::new(100, 3)));

    let result = client.create_redistribution(&template, true).await;

    assert!(
        matches!(result, Err(Error::Api { status: 400, .. })),
        "got: {result:?}"
    );
    assert_eq!(calls(&server).await, vec!["POST /rest/redistributions"]);
}

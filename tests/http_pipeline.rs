use chrono::NaiveDate;
use crm::{Dashboard, Severity};
use crm_tests::{
    API_KEY, PROJECT_ID, deal_json, http_services, list_body, mount_table, records_path,
    write_body,
};
use entity::{Money, Stage};
use platform_api::ApiError;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

#[tokio::test]
async fn board_skips_malformed_rows_with_one_warning() {
    let server = MockServer::start().await;
    mount_table(
        &server,
        "deals",
        vec![
            deal_json(1, "Fleet rollout", "Lead", 3000.0),
            json!({ "Id": 2, "stage": "Lead" }),
            deal_json(3, "Renewal", "Closed", 1500.5),
            deal_json(4, "Legacy import", "Won", 200.0),
        ],
    )
    .await;

    let (services, feed) = http_services(&server);
    let board = services.board().await.unwrap();
    assert_eq!(board.deals().len(), 3);

    let buckets = board.buckets();
    assert_eq!(buckets.ids(Stage::Lead), [1]);
    assert_eq!(buckets.ids(Stage::Closed), [3]);
    assert_eq!(buckets.unmatched.len(), 1);
    assert_eq!(board.stage_total(Stage::Closed), Money::from_cents(150_050));
    assert_eq!(board.total_value(), Money::from_cents(470_050));

    assert_eq!(
        feed.messages(),
        [(Severity::Warning, "Skipped 1 malformed deal record".to_string())]
    );
}

#[tokio::test]
async fn stage_change_puts_full_record_and_adopts_response() {
    let server = MockServer::start().await;
    mount_table(
        &server,
        "deals",
        vec![
            deal_json(1, "Fleet rollout", "Lead", 3000.0),
            deal_json(2, "Renewal", "Proposal", 1200.0),
        ],
    )
    .await;
    let mut stored = deal_json(1, "Fleet rollout", "Negotiation", 3000.0);
    stored["updatedAt"] = json!("2025-03-02T10:00:00.000Z");
    Mock::given(method("PUT"))
        .and(path(records_path("deals")))
        .and(header("X-Project-Id", PROJECT_ID))
        .and(header("Authorization", format!("Bearer {API_KEY}").as_str()))
        .and(body_partial_json(json!({
            "records": [{
                "Id": 1,
                "title": "Fleet rollout",
                "stage": "Negotiation",
                "probability": 40,
                "contactId": 1,
                "expectedCloseDate": "2025-06-30"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(write_body(stored)))
        .expect(1)
        .mount(&server)
        .await;

    let (services, feed) = http_services(&server);
    let mut board = services.board().await.unwrap();
    let moved = board.change_stage(1, Stage::Negotiation).await.unwrap();

    assert!(moved.stage.is(Stage::Negotiation));
    assert_eq!(board.buckets().ids(Stage::Negotiation), [1]);
    assert!(board.buckets().ids(Stage::Lead).is_empty());
    assert_eq!(board.deal(2).map(|d| d.stage.is(Stage::Proposal)), Some(true));
    assert_eq!(
        feed.messages(),
        [(Severity::Success, "Deal moved to Negotiation".to_string())]
    );
}

#[tokio::test]
async fn rejected_update_leaves_board_untouched() {
    let server = MockServer::start().await;
    mount_table(
        &server,
        "deals",
        vec![deal_json(7, "Edge pilot", "Qualified", 900.0)],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(records_path("deals")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "success": false, "message": "db down" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (services, feed) = http_services(&server);
    let mut board = services.board().await.unwrap();
    let before = board.deals().to_vec();

    let err = board.change_stage_named(7, "closed").await.unwrap_err();
    assert_eq!(err.code(), "STORE_UNAVAILABLE");
    assert_eq!(board.deals(), before.as_slice());
    assert_eq!(
        feed.messages(),
        [(Severity::Error, "Failed to update deal stage".to_string())]
    );
}

#[tokio::test]
async fn moving_an_unknown_deal_never_writes() {
    let server = MockServer::start().await;
    mount_table(
        &server,
        "deals",
        vec![deal_json(1, "Fleet rollout", "Lead", 3000.0)],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path(records_path("deals")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (services, feed) = http_services(&server);
    let err = services.move_deal(42, "Closed").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { id: 42, .. }));
    assert_eq!(feed.messages().len(), 1);

    let err = services.move_deal(1, "Archived").await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
    assert_eq!(feed.messages().len(), 1);
}

#[tokio::test]
async fn missing_record_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/9", records_path("contacts"))))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (services, feed) = http_services(&server);
    let err = services.contacts.try_get(9).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { id: 9, .. }));
    assert!(services.contacts.get(9).await.is_none());
    assert_eq!(
        feed.messages(),
        [(Severity::Error, "Failed to load contact".to_string())]
    );
}

#[tokio::test]
async fn dashboard_reads_all_three_tables() {
    let server = MockServer::start().await;
    mount_table(
        &server,
        "contacts",
        vec![json!({
            "Id": 1, "firstName": "Maya", "lastName": "Chen",
            "email": "maya@northwind.io", "company": "Northwind"
        })],
    )
    .await;
    mount_table(
        &server,
        "deals",
        vec![
            deal_json(1, "Fleet rollout", "Closed", 3000.0),
            deal_json(2, "Renewal", "Proposal", 1000.0),
            deal_json(3, "Pilot", "Lead", 500.0),
        ],
    )
    .await;
    mount_table(
        &server,
        "activities",
        vec![json!({
            "Id": 1, "type": "Call", "contactId": 1, "subject": "Kickoff",
            "date": "2025-06-20T15:00:00.000Z"
        })],
    )
    .await;

    let (services, feed) = http_services(&server);
    let workspace = services.load_workspace().await.unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 6, 25).unwrap();
    let dashboard = Dashboard::compute(&workspace, today);

    assert_eq!(dashboard.stats.total_contacts, 1);
    assert_eq!(dashboard.stats.total_deals, 3);
    assert_eq!(dashboard.stats.total_value, Money::from_units(4500));
    assert_eq!(dashboard.stats.win_rate, 33);
    assert_eq!(dashboard.recent_activities.len(), 1);
    let upcoming: Vec<i64> = dashboard.upcoming_closes.iter().map(|d| d.id).collect();
    assert_eq!(upcoming, [2, 3]);
    assert!(feed.is_empty());
}

#[tokio::test]
async fn unreachable_table_fails_the_workspace_load() {
    let server = MockServer::start().await;
    mount_table(&server, "contacts", Vec::new()).await;
    mount_table(&server, "activities", Vec::new()).await;
    Mock::given(method("GET"))
        .and(path(records_path("deals")))
        .respond_with(ResponseTemplate::new(503).set_body_json(list_body(Vec::new())))
        .mount(&server)
        .await;

    let (services, _feed) = http_services(&server);
    let err = services.load_workspace().await.unwrap_err();
    assert_eq!(err.code(), "STORE_UNAVAILABLE");
}

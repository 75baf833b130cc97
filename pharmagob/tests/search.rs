mod common;

use bson::doc;
use pharmagob::{
    page::PageRequest,
    query::Sort,
    repositories::{
        LocationContentRepository, LocationContentSearchFilters, PatientRepository,
        PatientSearchFilters, ShipmentRepository, ShipmentSearchFilters, StockTransferRepository,
        StockTransferSearchFilters,
    },
};
use pretty_assertions::assert_eq;

use common::{builder, ids, location_contents, patients, store};

#[tokio::test]
async fn second_page_of_twenty_five_matches() {
    let store = store(builder().with_documents("patients", patients(25))).await;
    let repository = PatientRepository::new(&store);

    let envelope = repository
        .search_by_curp("GOMA", PageRequest::new(2, 10), PatientSearchFilters::default(), None)
        .await
        .unwrap();

    assert_eq!(envelope.count, 25);
    let expected: Vec<String> = (11..=20).map(|n| format!("P-{n:02}")).collect();
    assert_eq!(ids(&envelope.results), expected);
}

#[tokio::test]
async fn last_partial_page_keeps_full_count() {
    let store = store(builder().with_documents("patients", patients(25))).await;
    let repository = PatientRepository::new(&store);

    let envelope = repository
        .search_by_curp("goma", PageRequest::new(3, 10), PatientSearchFilters::default(), None)
        .await
        .unwrap();

    assert_eq!(envelope.count, 25);
    assert_eq!(envelope.results.len(), 5);
}

#[tokio::test]
async fn no_match_is_zero_and_empty() {
    let store = store(builder().with_documents("patients", patients(5))).await;
    let repository = PatientRepository::new(&store);

    let envelope = repository
        .search_by_curp("ZZZZ", PageRequest::first(), PatientSearchFilters::default(), None)
        .await
        .unwrap();

    assert_eq!(envelope.count, 0);
    assert!(envelope.results.is_empty());
}

#[tokio::test]
async fn absent_tenant_does_not_restrict_and_present_tenant_does() {
    let store = store(builder().with_documents("patients", patients(25))).await;
    let repository = PatientRepository::new(&store);

    let all = repository
        .search_by_curp("GOMA", PageRequest::first(), PatientSearchFilters::default(), None)
        .await
        .unwrap();
    let tenant = repository
        .search_by_curp(
            "GOMA",
            PageRequest::first(),
            PatientSearchFilters { umu_id: Some("U-2".into()), ..Default::default() },
            None,
        )
        .await
        .unwrap();

    assert_eq!(all.count, 25);
    assert_eq!(tenant.count, 12);
    assert!(tenant.results.iter().all(|d| d.get_str("umu_id").unwrap() == "U-2"));
}

#[tokio::test]
async fn page_below_one_reads_first_page() {
    let store = store(builder().with_documents("patients", patients(4))).await;
    let repository = PatientRepository::new(&store);

    let envelope = repository
        .search_by_curp("GOMA", PageRequest::new(0, 2), PatientSearchFilters::default(), None)
        .await
        .unwrap();

    assert_eq!(ids(&envelope.results), vec!["P-01", "P-02"]);
}

#[tokio::test]
async fn created_at_window_is_exclusive() {
    let store = store(builder().with_documents("patients", patients(10))).await;
    let repository = PatientRepository::new(&store);

    // created_at of P-02..P-08 is 9_998..9_992
    let envelope = repository
        .search_by_curp(
            "GOMA",
            PageRequest::first(),
            PatientSearchFilters {
                created_at_gt: Some(9_991),
                created_at_lt: Some(9_999),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(envelope.count, 7);
    assert_eq!(ids(&envelope.results).first().map(String::as_str), Some("P-02"));
}

#[tokio::test]
async fn shipment_search_applies_window_and_review_status() {
    let shipments = vec![
        doc! { "_id": "S-1", "order_number": "OC-2024-001", "review_status": "PENDING", "created_at": 10_i64 },
        doc! { "_id": "S-2", "order_number": "OC-2024-002", "review_status": "APPROVED", "created_at": 20_i64 },
        doc! { "_id": "S-3", "order_number": "OC-2024-003", "review_status": "PENDING", "created_at": 30_i64 },
        doc! { "_id": "S-4", "order_number": "OC-2024-004", "review_status": "PENDING", "created_at": 40_i64 },
    ];
    let store = store(builder().with_documents("shipments", shipments)).await;
    let repository = ShipmentRepository::new(&store);

    let envelope = repository
        .search_by_order_number(
            "OC-2024",
            PageRequest::first(),
            ShipmentSearchFilters {
                created_at_gt: Some(5),
                created_at_lt: Some(35),
                review_status: Some(vec!["PENDING".into()]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(envelope.count, 2);
    assert_eq!(ids(&envelope.results), vec!["S-3", "S-1"]);
}

#[tokio::test]
async fn review_status_lookup() {
    let shipments = vec![
        doc! { "_id": "S-1", "order_number": "OC-1", "review_status": "APPROVED" },
        doc! { "_id": "S-2", "order_number": "OC-2" },
    ];
    let store = store(builder().with_documents("shipments", shipments)).await;
    let repository = ShipmentRepository::new(&store);

    assert_eq!(repository.get_review_status("S-1").await.unwrap().as_deref(), Some("APPROVED"));
    assert_eq!(repository.get_review_status("S-2").await.unwrap(), None);
    assert_eq!(repository.get_review_status("S-9").await.unwrap(), None);
}

#[tokio::test]
async fn item_search_excludes_tenants_and_bounds_quantity() {
    let store = store(builder().with_documents("location_contents", location_contents())).await;
    let repository = LocationContentRepository::new(&store);

    let envelope = repository
        .search_by_item(
            "PARACETAMOL",
            0,
            1_000,
            PageRequest::first(),
            LocationContentSearchFilters {
                quantity_gt: Some(4),
                excluded_umu_ids: Some(vec!["U-2".into()]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(envelope.count, 2);
    assert_eq!(ids(&envelope.results), vec!["LC-2", "LC-1"]);
}

#[tokio::test]
async fn item_search_window_is_always_applied() {
    let store = store(builder().with_documents("location_contents", location_contents())).await;
    let repository = LocationContentRepository::new(&store);

    let envelope = repository
        .search_by_item(
            "PARACETAMOL",
            150,
            450,
            PageRequest::first(),
            LocationContentSearchFilters::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(ids(&envelope.results), vec!["LC-4", "LC-2"]);
}

#[tokio::test]
async fn stock_transfers_default_to_oldest_first() {
    let transfers = vec![
        doc! { "_id": "T-1", "reference_id": "TR-0001", "last_event": "SENT", "created_at": 30_i64 },
        doc! { "_id": "T-2", "reference_id": "TR-0002", "last_event": "RECEIVED", "created_at": 10_i64 },
        doc! { "_id": "T-3", "reference_id": "TR-0003", "last_event": "SENT", "created_at": 20_i64 },
    ];
    let store = store(builder().with_documents("stock_transfers", transfers)).await;
    let repository = StockTransferRepository::new(&store);

    let default_order = repository
        .search_by_reference_id("TR", PageRequest::first(), StockTransferSearchFilters::default(), None)
        .await
        .unwrap();
    let newest_first = repository
        .search_by_reference_id(
            "TR",
            PageRequest::first(),
            StockTransferSearchFilters { last_event: Some("SENT".into()), ..Default::default() },
            Some(vec![Sort::desc("created_at")]),
        )
        .await
        .unwrap();

    assert_eq!(ids(&default_order.results), vec!["T-2", "T-3", "T-1"]);
    assert_eq!(ids(&newest_first.results), vec!["T-1", "T-3"]);
}

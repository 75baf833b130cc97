mod common;

use bson::doc;
use pharmagob::{
    condition::Condition,
    error::RepositoryError,
    page::PageRequest,
    query::{Projection, Sort},
    repositories::{
        DispatchRecordDetailRepository, ItemRepository, LocationRepository, LookupOptions,
        StockTransferEventRepository,
    },
    repository::ListQuery,
};
use pretty_assertions::assert_eq;

use common::{builder, ids, patients, store};

#[tokio::test]
async fn paginated_listing_merges_conditions_per_field() {
    let store = store(builder().with_documents("patients", patients(10))).await;
    let repository = store.repository("patients");

    // created_at 9_999..9_990 for P-01..P-10
    let envelope = repository
        .get_paginated(
            PageRequest::new(1, 2),
            ListQuery::new()
                .condition(Condition::parse("created_at", ">", 9_992_i64).unwrap())
                .condition(Condition::parse("created_at", "<=", 9_997_i64).unwrap())
                .sort(vec![Sort::asc("created_at")]),
        )
        .await
        .unwrap();

    assert_eq!(envelope.count, 5);
    assert_eq!(ids(&envelope.results), vec!["P-07", "P-06"]);
}

#[tokio::test]
async fn tenant_replaces_umu_condition() {
    let store = store(builder().with_documents("patients", patients(6))).await;
    let repository = store.repository("patients");

    let envelope = repository
        .get_paginated(
            PageRequest::first(),
            ListQuery::new()
                .condition(Condition::eq("umu_id", "U-1"))
                .umu_id("U-2")
                .sort(vec![Sort::asc("_id")])
                .projection(Projection::fields(["umu_id"])),
        )
        .await
        .unwrap();

    assert_eq!(ids(&envelope.results), vec!["P-02", "P-04", "P-06"]);
    assert!(envelope.results.iter().all(|d| !d.contains_key("curp")));
}

#[test]
fn unsupported_operator_fails_before_any_query() {
    let err = Condition::parse("created_at", "!=", 1).unwrap_err();

    assert!(matches!(err, RepositoryError::UnsupportedOperator(op) if op == "!="));
}

#[tokio::test]
async fn base_crud_round() {
    let store = store(builder()).await;
    let repository = store.repository("items");

    repository
        .create(doc! { "_id": "I-1", "foreign_id": "F-1", "umu_id": "U-1", "name": "Paracetamol" })
        .await
        .unwrap();

    assert_eq!(repository.update("I-1", doc! { "name": "Paracetamol 500" }).await.unwrap(), 1);
    assert_eq!(repository.update("I-9", doc! { "name": "nobody" }).await.unwrap(), 0);

    // Existing document: $setOnInsert leaves it untouched.
    assert_eq!(repository.set("I-1", doc! { "name": "ignored" }, true).await.unwrap(), 1);
    // Missing document: upserted.
    assert_eq!(repository.set("I-2", doc! { "foreign_id": "F-2" }, true).await.unwrap(), 0);

    let item = repository.get("I-1", None, Vec::new(), None).await.unwrap().unwrap();
    assert_eq!(item.get_str("name").unwrap(), "Paracetamol 500");
    assert!(repository.get("I-1", Some("U-2"), Vec::new(), None).await.unwrap().is_none());
    assert!(repository.get("I-2", None, Vec::new(), None).await.unwrap().is_some());

    let modified = repository
        .update_many([Condition::eq("umu_id", "U-1")], doc! { "active": true })
        .await
        .unwrap();
    assert_eq!(modified, 1);
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let store = store(builder()).await;
    let err = store.repository("items").update("I-1", doc! {}).await.unwrap_err();

    assert!(matches!(err, RepositoryError::InvalidDocument(_)));
}

#[tokio::test]
async fn foreign_key_lookups() {
    let store = store(
        builder()
            .with_documents(
                "items",
                vec![
                    doc! { "_id": "I-1", "foreign_id": "F-1", "umu_id": "U-1" },
                    doc! { "_id": "I-2", "foreign_id": "F-1", "umu_id": "U-2" },
                    doc! { "_id": "I-3", "foreign_id": "F-2", "umu_id": "U-1" },
                ],
            )
            .with_documents(
                "locations",
                vec![
                    doc! { "_id": "L-1", "umu_id": "U-1", "label_code": "A-01" },
                    doc! { "_id": "L-2", "umu_id": "U-1", "label_code": "A-02" },
                    doc! { "_id": "L-3", "umu_id": "U-2", "label_code": "A-01" },
                ],
            )
            .with_documents(
                "dispatch_record_details",
                vec![
                    doc! { "_id": "D-1", "dispatch_record": { "id": "DR-1" }, "umu_id": "U-1" },
                    doc! { "_id": "D-2", "dispatch_record": { "id": "DR-1" }, "umu_id": "U-1" },
                    doc! { "_id": "D-3", "dispatch_record": { "id": "DR-2" }, "umu_id": "U-1" },
                ],
            ),
    )
    .await;

    let items = ItemRepository::new(&store)
        .get_by_foreign_id("F-1", Some("U-2"), LookupOptions::new())
        .await
        .unwrap();
    assert_eq!(ids(&items.results), vec!["I-2"]);

    let locations = LocationRepository::new(&store)
        .get_by_umu_id("U-1", None, LookupOptions::new().sort(vec![Sort::desc("label_code")]))
        .await
        .unwrap();
    assert_eq!(ids(&locations.results), vec!["L-2", "L-1"]);

    let labelled = LocationRepository::new(&store)
        .get_by_umu_id("U-1", Some("A-01"), LookupOptions::new())
        .await
        .unwrap();
    assert_eq!(ids(&labelled.results), vec!["L-1"]);

    let details = DispatchRecordDetailRepository::new(&store)
        .get_by_dispatch_record_id("DR-1", None, LookupOptions::new().limit(1))
        .await
        .unwrap();
    assert_eq!(details.count, 2);
    assert_eq!(details.results.len(), 1);
}

#[tokio::test]
async fn stock_transfer_events_by_tenants_newest_first() {
    let events = vec![
        doc! { "_id": "E-1", "stock_transfer_id": "T-1", "umu_id": "U-1", "transition_timestamp": 1_i64 },
        doc! { "_id": "E-2", "stock_transfer_id": "T-1", "umu_id": "U-2", "transition_timestamp": 2_i64 },
        doc! { "_id": "E-3", "stock_transfer_id": "T-1", "umu_id": "U-3", "transition_timestamp": 3_i64 },
        doc! { "_id": "E-4", "stock_transfer_id": "T-2", "umu_id": "U-1", "transition_timestamp": 4_i64 },
    ];
    let store = store(builder().with_documents("stock_transfer_events", events)).await;
    let repository = StockTransferEventRepository::new(&store);

    let filtered = repository
        .get_by_stock_transfer_id("T-1", Some(vec!["U-1".into(), "U-3".into()]), LookupOptions::new())
        .await
        .unwrap();
    let unfiltered = repository
        .get_by_stock_transfer_id("T-1", Some(Vec::new()), LookupOptions::new())
        .await
        .unwrap();

    assert_eq!(ids(&filtered.results), vec!["E-3", "E-1"]);
    assert_eq!(ids(&unfiltered.results), vec!["E-3", "E-2", "E-1"]);
}

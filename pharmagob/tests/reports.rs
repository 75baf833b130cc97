mod common;

use std::time::Duration;

use bson::{DateTime, doc, oid::ObjectId};
use pharmagob::{
    DocumentStore,
    backend::StoreBackendBuilder,
    condition::Condition,
    config::RepositoryConfig,
    models::ReportRequest,
    query::IndexSpec,
    repositories::{LocationContentRepository, ReportRepository},
};
use pretty_assertions::assert_eq;

use common::{NOW_MS, builder, location_contents, store};

#[tokio::test]
async fn stock_report_is_grouped_and_expiring() {
    let store = store(builder().with_documents("location_contents", location_contents())).await;
    let repository = LocationContentRepository::new(&store);

    let handle = repository
        .materialize_stock_report("june", vec![Condition::eq("umu_id", "U-1")])
        .await
        .unwrap();

    assert_eq!(handle.output_name, "report_june");
    assert_eq!(handle.ttl, Duration::from_secs(86_400));

    let rows = store.backend().documents("report_june").await;
    assert_eq!(rows.len(), 2);
    let row = |item: &str| {
        rows.iter()
            .find(|r| r.get_str("item_id").unwrap() == item)
            .unwrap_or_else(|| panic!("no row for {item}"))
    };
    assert_eq!(row("PARACETAMOL-500").get_i32("quantity").unwrap(), 12);
    assert_eq!(row("IBUPROFENO-400").get_i32("quantity").unwrap(), 1);
    for r in &rows {
        assert_eq!(r.get_str("umu_id").unwrap(), "U-1");
        assert_eq!(r.get_datetime("created_at").unwrap(), &DateTime::from_millis(NOW_MS));
    }

    assert_eq!(
        store.backend().indexes("report_june").await,
        vec![IndexSpec::expiring("created_at", Duration::from_secs(86_400))]
    );
}

#[tokio::test]
async fn rerunning_a_report_replaces_its_output() {
    let store = store(builder().with_documents("location_contents", location_contents())).await;
    let repository = LocationContentRepository::new(&store);

    repository
        .materialize_stock_report("daily", vec![Condition::eq("umu_id", "U-1")])
        .await
        .unwrap();
    repository
        .materialize_stock_report("daily", vec![Condition::eq("umu_id", "U-2")])
        .await
        .unwrap();

    let rows = store.backend().documents("report_daily").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("umu_id").unwrap(), "U-2");
    assert_eq!(rows[0].get_i32("quantity").unwrap(), 3);
}

#[tokio::test]
async fn report_output_is_reaped_by_its_expiry_index() {
    let store = store(builder().with_documents("location_contents", location_contents())).await;
    LocationContentRepository::new(&store)
        .materialize_stock_report("kept", vec![])
        .await
        .unwrap();

    assert_eq!(store.backend().reap_expired().await, 0);
    assert_eq!(store.backend().documents("report_kept").await.len(), 3);

    let backend = builder()
        .with_documents("location_contents", location_contents())
        .build()
        .await
        .unwrap();
    let short_lived = DocumentStore::with_config(
        backend,
        RepositoryConfig { report_ttl_secs: 0, ..RepositoryConfig::default() },
    );
    LocationContentRepository::new(&short_lived)
        .materialize_stock_report("gone", vec![])
        .await
        .unwrap();

    assert_eq!(short_lived.backend().reap_expired().await, 3);
    assert!(short_lived.backend().documents("report_gone").await.is_empty());
    assert_eq!(short_lived.backend().documents("location_contents").await.len(), 4);
}

#[tokio::test]
async fn report_requests_round_trip() {
    let store = store(builder()).await;
    let repository = ReportRepository::new(&store);

    let report = repository
        .create(ReportRequest::new("PENDING", doc! { "umu_id": "U-1" }))
        .await
        .unwrap();
    let id = report.id.to_hex();

    assert_eq!(repository.get_by_id(&id).await.unwrap(), Some(report.clone()));

    assert!(repository.update_status(&id, "RUNNING", 40).await.unwrap());
    let updated = repository.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(updated.status, "RUNNING");
    assert_eq!(updated.progress, 40);
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn invalid_or_unknown_report_ids() {
    let store = store(builder()).await;
    let repository = ReportRepository::new(&store);
    let unknown = ObjectId::new().to_hex();

    assert_eq!(repository.get_by_id("not-an-object-id").await.unwrap(), None);
    assert!(!repository.update_status("not-an-object-id", "DONE", 100).await.unwrap());
    assert_eq!(repository.get_by_id(&unknown).await.unwrap(), None);
    assert!(!repository.update_status(&unknown, "DONE", 100).await.unwrap());
}

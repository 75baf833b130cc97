#![allow(dead_code)]

use bson::{DateTime, Document, doc};
use pharmagob::{
    DocumentStore,
    backend::StoreBackendBuilder,
    memory::{InMemoryStore, InMemoryStoreBuilder},
};
use tracing_subscriber::EnvFilter;

/// Time pinned for `$$NOW` in every seeded store.
pub const NOW_MS: i64 = 1_718_000_000_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn builder() -> InMemoryStoreBuilder {
    init_tracing();
    InMemoryStore::builder().with_fixed_now(DateTime::from_millis(NOW_MS))
}

pub async fn store(builder: InMemoryStoreBuilder) -> DocumentStore<InMemoryStore> {
    DocumentStore::new(builder.build().await.expect("seeded store"))
}

/// `matching` patients whose CURP starts with `GOMA`, newest first by index, plus
/// three that never match.
///
/// Patient `n` (1-based) has `created_at = 10_000 - n`, so the `created_at` desc
/// order is `P-01, P-02, ...`. Odd patients belong to `U-1`, even ones to `U-2`.
pub fn patients(matching: usize) -> Vec<Document> {
    let mut documents: Vec<Document> = (1..=matching)
        .map(|n| {
            doc! {
                "_id": format!("P-{n:02}"),
                "curp": format!("GOMA{n:02}0101HDFRRN"),
                "umu_id": if n % 2 == 1 { "U-1" } else { "U-2" },
                "created_at": 10_000_i64 - n as i64,
            }
        })
        .collect();
    for n in 1..=3 {
        documents.push(doc! {
            "_id": format!("X-{n}"),
            "curp": format!("LOPE{n:02}0101MDFRRN"),
            "umu_id": "U-1",
            "created_at": 20_000_i64 + n,
        });
    }
    documents
}

pub fn location_contents() -> Vec<Document> {
    vec![
        doc! { "_id": "LC-1", "umu_id": "U-1", "item": { "id": "PARACETAMOL-500" }, "lot": "L1", "quantity": 5, "created_at": 100_i64 },
        doc! { "_id": "LC-2", "umu_id": "U-1", "item": { "id": "PARACETAMOL-500" }, "lot": "L2", "quantity": 7, "created_at": 200_i64 },
        doc! { "_id": "LC-3", "umu_id": "U-1", "item": { "id": "IBUPROFENO-400" }, "lot": "L1", "quantity": 1, "created_at": 300_i64 },
        doc! { "_id": "LC-4", "umu_id": "U-2", "item": { "id": "PARACETAMOL-500" }, "lot": "L9", "quantity": 3, "created_at": 400_i64 },
    ]
}

pub fn ids(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d.get_str("_id").expect("string _id").to_string())
        .collect()
}

//! Integration tests for catalog migrations using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("catalog").await.unwrap();

    brandhub_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("principal"), "missing principal table");
    assert!(info_str.contains("brand"), "missing brand table");
    assert!(
        info_str.contains("namespace_ledger"),
        "missing namespace_ledger table"
    );
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("catalog").await.unwrap();

    brandhub_db::run_migrations(&db).await.unwrap();
    brandhub_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_principal_email() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("catalog").await.unwrap();
    brandhub_db::run_migrations(&db).await.unwrap();

    db.query("CREATE principal SET email = 'a@example.com', password_hash = 'x'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE principal SET email = 'a@example.com', password_hash = 'y'")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "duplicate email should be rejected");
}

#[tokio::test]
async fn ledger_rejects_reused_namespace() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("catalog").await.unwrap();
    brandhub_db::run_migrations(&db).await.unwrap();

    db.query("CREATE namespace_ledger SET namespace = 'brand_1', brand_id = 'a'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE namespace_ledger SET namespace = 'brand_1', brand_id = 'b'")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "ledger must reject a reused namespace");
}

#[tokio::test]
async fn brand_schema_applies_in_fresh_database() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("brand_x").await.unwrap();

    db.query(brandhub_db::brand_schema())
        .await
        .unwrap()
        .check()
        .unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info_str = format!("{:?}", info.unwrap());
    for table in brandhub_db::BRAND_TABLES {
        assert!(info_str.contains(table), "missing {table}");
    }
}

use cdc::error::ErrorKind;
use cdc::schema::{
    DdlAction, ResolvedVersionMap, SchemaChangeJob, SchemaRegistry, SchemaVersionLookup,
};
use cdc::test_utils::schema::{
    BOOTSTRAP_VERSION, ORDERS_TABLE_ID, USERS_TABLE_ID, bootstrap_jobs, users_add_note_job,
    users_table_definition,
};
use telemetry::tracing::init_test_tracing;

#[test]
fn registry_requires_at_least_one_job() {
    let result = SchemaRegistry::new(Vec::new());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigError);
}

#[test]
fn advance_replays_jobs_up_to_the_requested_version() {
    init_test_tracing();

    let mut registry = SchemaRegistry::new(bootstrap_jobs()).unwrap();
    assert_eq!(registry.active_version(), 0);

    // Stop before the orders table exists.
    registry.advance_to(2).unwrap();
    assert_eq!(registry.active_version(), 2);
    assert!(registry.lookup("app", "users").is_ok());
    assert_eq!(
        registry.lookup("app", "orders").unwrap_err().kind(),
        ErrorKind::UnknownTable
    );

    registry.advance_to(BOOTSTRAP_VERSION).unwrap();
    assert_eq!(registry.active_version(), BOOTSTRAP_VERSION);
    assert!(registry.lookup("app", "orders").is_ok());
    assert!(registry.table_by_id(ORDERS_TABLE_ID).is_ok());
}

#[test]
fn advance_to_a_past_version_is_a_no_op() {
    init_test_tracing();

    let mut registry = SchemaRegistry::new(bootstrap_jobs()).unwrap();
    registry.advance_to(BOOTSTRAP_VERSION).unwrap();

    let users_before = registry.lookup("app", "users").unwrap().clone();

    registry.advance_to(1).unwrap();
    registry.advance_to(BOOTSTRAP_VERSION).unwrap();

    assert_eq!(registry.active_version(), BOOTSTRAP_VERSION);
    assert_eq!(registry.lookup("app", "users").unwrap(), &users_before);
}

#[test]
fn malformed_job_fails_the_advance_without_partial_application() {
    init_test_tracing();

    let mut jobs = bootstrap_jobs();
    // A table-level action without its resulting definition is malformed.
    jobs.push(SchemaChangeJob {
        table_definition: None,
        ..users_add_note_job(4)
    });

    let mut registry = SchemaRegistry::new(jobs).unwrap();
    let result = registry.advance_to(4);

    assert_eq!(result.unwrap_err().kind(), ErrorKind::SchemaAdvanceFailed);
    // The registry stopped at the last job that applied cleanly.
    assert_eq!(registry.active_version(), BOOTSTRAP_VERSION);
    assert_eq!(
        registry.lookup("app", "users").unwrap(),
        &users_table_definition()
    );
}

#[test]
fn job_against_unknown_objects_fails_the_advance() {
    init_test_tracing();

    let mut jobs = bootstrap_jobs();
    jobs.push(SchemaChangeJob {
        version: 4,
        action: DdlAction::DropTable,
        database: "app".to_string(),
        table: "ghost".to_string(),
        statement: "drop table app.ghost".to_string(),
        table_definition: None,
    });

    let mut registry = SchemaRegistry::new(jobs).unwrap();
    assert_eq!(
        registry.advance_to(4).unwrap_err().kind(),
        ErrorKind::SchemaAdvanceFailed
    );
    assert_eq!(registry.active_version(), BOOTSTRAP_VERSION);
}

#[test]
fn dropping_a_table_removes_it_from_lookups() {
    init_test_tracing();

    let mut jobs = bootstrap_jobs();
    jobs.push(SchemaChangeJob {
        version: 4,
        action: DdlAction::DropTable,
        database: "app".to_string(),
        table: "users".to_string(),
        statement: "drop table app.users".to_string(),
        table_definition: None,
    });

    let mut registry = SchemaRegistry::new(jobs).unwrap();
    registry.advance_to(4).unwrap();

    assert_eq!(
        registry.lookup("app", "users").unwrap_err().kind(),
        ErrorKind::UnknownTable
    );
    assert_eq!(
        registry.table_by_id(USERS_TABLE_ID).unwrap_err().kind(),
        ErrorKind::UnknownTable
    );
    assert!(registry.lookup("app", "orders").is_ok());
}

#[test]
fn dropping_a_database_removes_its_tables() {
    init_test_tracing();

    let mut jobs = bootstrap_jobs();
    jobs.push(SchemaChangeJob {
        version: 4,
        action: DdlAction::DropDatabase,
        database: "app".to_string(),
        table: String::new(),
        statement: "drop database app".to_string(),
        table_definition: None,
    });

    let mut registry = SchemaRegistry::new(jobs).unwrap();
    registry.advance_to(4).unwrap();

    assert_eq!(
        registry.lookup("app", "users").unwrap_err().kind(),
        ErrorKind::UnknownTable
    );
    assert_eq!(
        registry.lookup("app", "orders").unwrap_err().kind(),
        ErrorKind::UnknownTable
    );
}

#[tokio::test]
async fn version_map_resolves_the_governing_version() {
    init_test_tracing();

    let versions = ResolvedVersionMap::new();
    versions.record(100, 1).await;
    versions.record(200, 2).await;

    // Before any recorded point there is no governing version.
    assert_eq!(
        versions.version_at(99).await.unwrap_err().kind(),
        ErrorKind::UnknownSchemaVersion
    );

    assert_eq!(versions.version_at(100).await.unwrap(), 1);
    assert_eq!(versions.version_at(150).await.unwrap(), 1);
    assert_eq!(versions.version_at(200).await.unwrap(), 2);
    assert_eq!(versions.version_at(u64::MAX).await.unwrap(), 2);
}

use bytes::Bytes;

use cdc::codec::key::{encode_ddl_job_key, encode_row_key};
use cdc::error::ErrorKind;
use cdc::mounter::TransactionMounter;
use cdc::schema::{DdlAction, ResolvedVersionMap, SchemaRegistry, TableId};
use cdc::test_utils::mutations::{
    ddl_mutation, delete_op, index_delete, index_put, insert_op, raw_transaction, row_delete,
    row_put, row_update,
};
use cdc::test_utils::schema::{
    BOOTSTRAP_VERSION, ORDERS_EMAIL_INDEX, USERS_NAME_INDEX, bootstrap_jobs,
    orders_table_definition, users_add_note_job, users_table_definition,
    users_table_definition_with_note,
};
use cdc::types::{Datum, MutationKind, RawMutation};
use telemetry::tracing::init_test_tracing;

/// Builds a mounter over the bootstrap schema, with the bootstrap version
/// governing every timestamp from 0 onwards.
async fn bootstrap_mounter() -> (TransactionMounter<ResolvedVersionMap>, ResolvedVersionMap) {
    let registry = SchemaRegistry::new(bootstrap_jobs()).unwrap();
    let versions = ResolvedVersionMap::new();
    versions.record(0, BOOTSTRAP_VERSION).await;

    (
        TransactionMounter::new(registry, versions.clone()),
        versions,
    )
}

fn string(value: &str) -> Datum {
    Datum::String(value.to_string())
}

#[tokio::test]
async fn fresh_insert_produces_a_single_insert() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let users = users_table_definition();

    let txn = raw_transaction(
        2000,
        vec![
            row_put(
                &users,
                7,
                vec![(2, string("alice")), (3, Datum::Int(30))],
                2000,
            ),
            // The index entry is re-established by the insert itself.
            index_put(&users, USERS_NAME_INDEX, vec![string("alice")], 7, 2000),
        ],
    );

    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(logical.commit_ts, 2000);
    assert_eq!(
        logical.dml().unwrap(),
        &[insert_op(
            &users,
            vec![
                ("id", Datum::Int(7)),
                ("name", string("alice")),
                ("age", Datum::Int(30)),
            ],
        )]
    );
}

#[tokio::test]
async fn non_key_update_expands_to_delete_then_insert() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let users = users_table_definition();

    let txn = raw_transaction(
        2100,
        vec![row_update(
            &users,
            7,
            vec![(2, string("alice")), (3, Datum::Int(31))],
            vec![(2, string("alice")), (3, Datum::Int(30))],
            2100,
        )],
    );

    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[
            delete_op(&users, vec![("id", Datum::Int(7))]),
            insert_op(
                &users,
                vec![
                    ("id", Datum::Int(7)),
                    ("name", string("alice")),
                    ("age", Datum::Int(31)),
                ],
            ),
        ]
    );
}

#[tokio::test]
async fn second_put_on_the_same_row_key_within_a_transaction_is_an_update() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let users = users_table_definition();

    // No captured old image on the second Put; the image observed earlier in
    // the same transaction is what marks it as a replacement.
    let txn = raw_transaction(
        2200,
        vec![
            row_put(&users, 8, vec![(2, string("bob")), (3, Datum::Null)], 2200),
            row_put(
                &users,
                8,
                vec![(2, string("bob")), (3, Datum::Int(44))],
                2200,
            ),
        ],
    );

    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[
            insert_op(
                &users,
                vec![
                    ("id", Datum::Int(8)),
                    ("name", string("bob")),
                    ("age", Datum::Null),
                ],
            ),
            delete_op(&users, vec![("id", Datum::Int(8))]),
            insert_op(
                &users,
                vec![
                    ("id", Datum::Int(8)),
                    ("name", string("bob")),
                    ("age", Datum::Int(44)),
                ],
            ),
        ]
    );
}

#[tokio::test]
async fn handle_delete_retracts_the_row_and_its_index_entries() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let users = users_table_definition();

    let txn = raw_transaction(
        2300,
        vec![
            index_delete(&users, USERS_NAME_INDEX, vec![string("alice")], 2300),
            row_delete(&users, 7, None, 2300),
        ],
    );

    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[
            delete_op(&users, vec![("name", string("alice"))]),
            delete_op(&users, vec![("id", Datum::Int(7))]),
        ]
    );
}

#[tokio::test]
async fn indexed_column_update_retracts_the_stale_entry_before_the_insert() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let orders = orders_table_definition();

    let old = vec![
        (1, string("A1")),
        (2, Datum::Int(5)),
        (3, string("a@example.com")),
    ];
    let new = vec![
        (1, string("A1")),
        (2, Datum::Int(5)),
        (3, string("b@example.com")),
    ];

    let txn = raw_transaction(
        2400,
        vec![
            index_delete(
                &orders,
                ORDERS_EMAIL_INDEX,
                vec![string("a@example.com")],
                2400,
            ),
            row_update(&orders, 11, new, old, 2400),
            index_put(
                &orders,
                ORDERS_EMAIL_INDEX,
                vec![string("b@example.com")],
                11,
                2400,
            ),
        ],
    );

    // Both retractions precede the insert: the stale indexed value first,
    // then the replaced row's primary key.
    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[
            delete_op(&orders, vec![("email", string("a@example.com"))]),
            delete_op(&orders, vec![("code", string("A1"))]),
            insert_op(
                &orders,
                vec![
                    ("code", string("A1")),
                    ("amount", Datum::Int(5)),
                    ("email", string("b@example.com")),
                ],
            ),
        ]
    );
}

#[tokio::test]
async fn explicit_pk_delete_reconstructs_identity_from_the_value() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let orders = orders_table_definition();

    let old = vec![
        (1, string("A1")),
        (2, Datum::Int(5)),
        (3, string("b@example.com")),
    ];

    let txn = raw_transaction(
        2500,
        vec![
            index_delete(
                &orders,
                ORDERS_EMAIL_INDEX,
                vec![string("b@example.com")],
                2500,
            ),
            row_delete(&orders, 11, Some(old), 2500),
        ],
    );

    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[
            delete_op(&orders, vec![("email", string("b@example.com"))]),
            delete_op(&orders, vec![("code", string("A1"))]),
        ]
    );
}

#[tokio::test]
async fn schema_change_transaction_produces_exactly_one_ddl() {
    init_test_tracing();

    // The registry knows the full job history; the stream advances through it.
    let job = users_add_note_job(4);
    let mut jobs = bootstrap_jobs();
    jobs.push(job.clone());

    let registry = SchemaRegistry::new(jobs).unwrap();
    let versions = ResolvedVersionMap::new();
    versions.record(0, BOOTSTRAP_VERSION).await;
    let mut mounter = TransactionMounter::new(registry, versions.clone());

    let txn = raw_transaction(3000, vec![ddl_mutation(&job, 3000)]);

    let logical = mounter.mount(txn).await.unwrap();
    assert!(logical.is_ddl());
    assert!(logical.dml().is_none());

    let ddl = logical.ddl().unwrap();
    assert_eq!(ddl.action, DdlAction::AddColumn);
    assert_eq!(ddl.database, "app");
    assert_eq!(ddl.table, "users");
    assert_eq!(ddl.statement, job.statement);
    assert_eq!(mounter.registry().active_version(), 4);

    // Later transactions decode against the widened schema.
    versions.record(3000, 4).await;
    let users = users_table_definition_with_note();

    let txn = raw_transaction(
        3100,
        vec![row_put(
            &users,
            9,
            vec![(2, string("kkk")), (3, Datum::Int(6)), (4, string("hi"))],
            3100,
        )],
    );
    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[insert_op(
            &users,
            vec![
                ("id", Datum::Int(9)),
                ("name", string("kkk")),
                ("age", Datum::Int(6)),
                ("note", string("hi")),
            ],
        )]
    );

    let txn = raw_transaction(
        3200,
        vec![row_put(
            &users,
            10,
            vec![(2, string("ttt")), (3, Datum::Int(6)), (4, Datum::Null)],
            3200,
        )],
    );
    let logical = mounter.mount(txn).await.unwrap();
    assert_eq!(
        logical.dml().unwrap(),
        &[insert_op(
            &users,
            vec![
                ("id", Datum::Int(10)),
                ("name", string("ttt")),
                ("age", Datum::Int(6)),
                ("note", Datum::Null),
            ],
        )]
    );
}

#[tokio::test]
async fn transaction_with_no_row_operations_mounts_to_zero_dml() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;

    let logical = mounter.mount(raw_transaction(2600, vec![])).await.unwrap();
    assert_eq!(logical.commit_ts, 2600);
    assert!(logical.dml().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_table_fails_the_mount() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;

    let mut ghost = users_table_definition();
    ghost.id = TableId(99);

    let txn = raw_transaction(
        2700,
        vec![row_put(
            &ghost,
            1,
            vec![(2, string("x")), (3, Datum::Null)],
            2700,
        )],
    );

    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::UnknownTable
    );
}

#[tokio::test]
async fn missing_version_mapping_fails_the_mount() {
    init_test_tracing();

    let registry = SchemaRegistry::new(bootstrap_jobs()).unwrap();
    let mut mounter = TransactionMounter::new(registry, ResolvedVersionMap::new());

    let users = users_table_definition();
    let txn = raw_transaction(
        2800,
        vec![row_put(
            &users,
            1,
            vec![(2, string("x")), (3, Datum::Null)],
            2800,
        )],
    );

    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::UnknownSchemaVersion
    );
}

#[tokio::test]
async fn corrupt_row_value_fails_the_mount() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let users = users_table_definition();

    let mutation = RawMutation {
        kind: MutationKind::Put,
        key: encode_row_key(users.id, 1),
        value: Bytes::from_static(&[0xff, 0x01]),
        commit_ts: 2900,
    };

    assert_eq!(
        mounter
            .mount(raw_transaction(2900, vec![mutation]))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::DecodeCorruption
    );
}

#[tokio::test]
async fn image_validation_rejects_bad_rows() {
    init_test_tracing();

    let users = users_table_definition();

    // Type mismatch: name is varchar, image carries an integer.
    let (mut mounter, _) = bootstrap_mounter().await;
    let txn = raw_transaction(
        3300,
        vec![row_put(
            &users,
            1,
            vec![(2, Datum::Int(5)), (3, Datum::Int(1))],
            3300,
        )],
    );
    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::DecodeCorruption
    );

    // Missing column: the image does not cover age.
    let (mut mounter, _) = bootstrap_mounter().await;
    let txn = raw_transaction(3400, vec![row_put(&users, 1, vec![(2, string("x"))], 3400)]);
    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::DecodeCorruption
    );

    // Null in a non-nullable column.
    let (mut mounter, _) = bootstrap_mounter().await;
    let txn = raw_transaction(
        3500,
        vec![row_put(
            &users,
            1,
            vec![(2, Datum::Null), (3, Datum::Null)],
            3500,
        )],
    );
    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::DecodeCorruption
    );
}

#[tokio::test]
async fn explicit_pk_delete_without_identity_image_is_corruption() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let orders = orders_table_definition();

    let txn = raw_transaction(3600, vec![row_delete(&orders, 11, None, 3600)]);
    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::DecodeCorruption
    );
}

#[tokio::test]
async fn unknown_index_id_is_corruption() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;
    let users = users_table_definition();

    let txn = raw_transaction(
        3700,
        vec![index_delete(&users, 99, vec![string("alice")], 3700)],
    );
    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::DecodeCorruption
    );
}

#[tokio::test]
async fn ddl_job_beyond_the_known_history_fails_the_mount() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;

    // The stream carries a job the registry's job feed never supplied.
    let job = users_add_note_job(99);
    let txn = raw_transaction(3900, vec![ddl_mutation(&job, 3900)]);

    assert_eq!(
        mounter.mount(txn).await.unwrap_err().kind(),
        ErrorKind::SchemaAdvanceFailed
    );
    // The registry still advanced through the jobs it does know.
    assert_eq!(mounter.registry().active_version(), BOOTSTRAP_VERSION);
}

#[tokio::test]
async fn unrecognized_ddl_action_is_corruption() {
    init_test_tracing();

    let (mut mounter, _) = bootstrap_mounter().await;

    let job = serde_json::json!({
        "version": 9,
        "action": "rename_table",
        "database": "app",
        "table": "users",
        "statement": "rename table app.users to app.people",
    });
    let mutation = RawMutation {
        kind: MutationKind::Put,
        key: encode_ddl_job_key(9),
        value: serde_json::to_vec(&job).unwrap().into(),
        commit_ts: 3800,
    };

    assert_eq!(
        mounter
            .mount(raw_transaction(3800, vec![mutation]))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::DecodeCorruption
    );
}

//! Schema fixtures shared by the integration tests.
//!
//! Two tables cover the two primary-key forms: `app.users` is addressed by an
//! integer-handle primary key with a unique index on the name, and
//! `app.orders` has an explicit varchar primary key plus a unique index on
//! the email column.

use crate::schema::{
    ColumnDefinition, ColumnType, DdlAction, IndexDefinition, PrimaryKeyForm, SchemaChangeJob,
    SchemaVersion, TableDefinition, TableId,
};

/// Table id of the `app.users` fixture.
pub const USERS_TABLE_ID: TableId = TableId(1);

/// Table id of the `app.orders` fixture.
pub const ORDERS_TABLE_ID: TableId = TableId(2);

/// Unique index on `users.name`.
pub const USERS_NAME_INDEX: u64 = 1;

/// Primary-key index on `orders.code`.
pub const ORDERS_PK_INDEX: u64 = 1;

/// Unique index on `orders.email`.
pub const ORDERS_EMAIL_INDEX: u64 = 2;

/// Returns the `app.users` definition: integer-handle primary key `id`,
/// non-null `name`, nullable `age`.
pub fn users_table_definition() -> TableDefinition {
    TableDefinition {
        id: USERS_TABLE_ID,
        database: "app".to_string(),
        name: "users".to_string(),
        columns: vec![
            ColumnDefinition {
                id: 1,
                name: "id".to_string(),
                typ: ColumnType::BigInt,
                nullable: false,
            },
            ColumnDefinition {
                id: 2,
                name: "name".to_string(),
                typ: ColumnType::Varchar,
                nullable: false,
            },
            ColumnDefinition {
                id: 3,
                name: "age".to_string(),
                typ: ColumnType::BigInt,
                nullable: true,
            },
        ],
        primary_key: PrimaryKeyForm::IntegerHandle { column: 1 },
        unique_indexes: vec![IndexDefinition {
            id: USERS_NAME_INDEX,
            name: "uniq_name".to_string(),
            columns: vec![2],
        }],
    }
}

/// Returns the `app.users` definition after `note` was added.
pub fn users_table_definition_with_note() -> TableDefinition {
    let mut definition = users_table_definition();
    definition.columns.push(ColumnDefinition {
        id: 4,
        name: "note".to_string(),
        typ: ColumnType::Varchar,
        nullable: true,
    });

    definition
}

/// Returns the `app.orders` definition: explicit varchar primary key `code`,
/// non-null `amount`, non-null `email` with a unique index.
pub fn orders_table_definition() -> TableDefinition {
    TableDefinition {
        id: ORDERS_TABLE_ID,
        database: "app".to_string(),
        name: "orders".to_string(),
        columns: vec![
            ColumnDefinition {
                id: 1,
                name: "code".to_string(),
                typ: ColumnType::Varchar,
                nullable: false,
            },
            ColumnDefinition {
                id: 2,
                name: "amount".to_string(),
                typ: ColumnType::BigInt,
                nullable: false,
            },
            ColumnDefinition {
                id: 3,
                name: "email".to_string(),
                typ: ColumnType::Varchar,
                nullable: false,
            },
        ],
        primary_key: PrimaryKeyForm::ExplicitColumns {
            columns: vec![1],
            index_id: ORDERS_PK_INDEX,
        },
        unique_indexes: vec![IndexDefinition {
            id: ORDERS_EMAIL_INDEX,
            name: "uniq_email".to_string(),
            columns: vec![3],
        }],
    }
}

/// Returns the bootstrap job sequence: create the `app` database at version 1
/// and both fixture tables at versions 2 and 3.
pub fn bootstrap_jobs() -> Vec<SchemaChangeJob> {
    vec![
        SchemaChangeJob {
            version: 1,
            action: DdlAction::CreateDatabase,
            database: "app".to_string(),
            table: String::new(),
            statement: "create database app".to_string(),
            table_definition: None,
        },
        SchemaChangeJob {
            version: 2,
            action: DdlAction::CreateTable,
            database: "app".to_string(),
            table: "users".to_string(),
            statement: "create table app.users(id bigint primary key, name varchar(255) unique, age bigint)".to_string(),
            table_definition: Some(users_table_definition()),
        },
        SchemaChangeJob {
            version: 3,
            action: DdlAction::CreateTable,
            database: "app".to_string(),
            table: "orders".to_string(),
            statement: "create table app.orders(code varchar(64) primary key, amount bigint, email varchar(255) unique)".to_string(),
            table_definition: Some(orders_table_definition()),
        },
    ]
}

/// The schema version produced by the last bootstrap job.
pub const BOOTSTRAP_VERSION: SchemaVersion = 3;

/// Returns a job adding the nullable `note` column to `app.users` at the
/// given version.
pub fn users_add_note_job(version: SchemaVersion) -> SchemaChangeJob {
    SchemaChangeJob {
        version,
        action: DdlAction::AddColumn,
        database: "app".to_string(),
        table: "users".to_string(),
        statement: "alter table app.users add note varchar(255) null".to_string(),
        table_definition: Some(users_table_definition_with_note()),
    }
}

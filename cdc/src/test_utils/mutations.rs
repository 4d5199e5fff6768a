//! Raw mutation and event encoders for tests.
//!
//! Builds physically encoded mutations the way the upstream store would emit
//! them, so tests exercise the full decode path instead of hand-crafted
//! intermediates.

use std::collections::HashMap;

use bytes::Bytes;

use crate::codec::key::{encode_ddl_job_key, encode_index_key, encode_row_key};
use crate::codec::row::{RowImage, RowValue, encode_index_value, encode_row_value};
use crate::schema::{ColumnId, IndexId, SchemaChangeJob, TableDefinition};
use crate::types::{
    BufferedEvent, Datum, DmlKind, DmlOp, MutationKind, RawMutation, RawTransaction, Watermark,
};

/// Encodes a Put on a row key carrying a fresh row image.
pub fn row_put(
    table: &TableDefinition,
    handle: i64,
    row: Vec<(ColumnId, Datum)>,
    commit_ts: u64,
) -> RawMutation {
    RawMutation {
        kind: MutationKind::Put,
        key: encode_row_key(table.id, handle),
        value: encode_row_value(&RowValue::new(RowImage::new(row))),
        commit_ts,
    }
}

/// Encodes a Put on a row key carrying a new image and the captured old one.
pub fn row_update(
    table: &TableDefinition,
    handle: i64,
    row: Vec<(ColumnId, Datum)>,
    old: Vec<(ColumnId, Datum)>,
    commit_ts: u64,
) -> RawMutation {
    RawMutation {
        kind: MutationKind::Put,
        key: encode_row_key(table.id, handle),
        value: encode_row_value(&RowValue::with_old(RowImage::new(row), RowImage::new(old))),
        commit_ts,
    }
}

/// Encodes a Delete on a row key. `old` carries the removed row's image for
/// tables that reconstruct the identity from the value; pass `None` for
/// integer-handle tables.
pub fn row_delete(
    table: &TableDefinition,
    handle: i64,
    old: Option<Vec<(ColumnId, Datum)>>,
    commit_ts: u64,
) -> RawMutation {
    let value = match old {
        Some(old) => encode_row_value(&RowValue::new(RowImage::new(old))),
        None => Bytes::new(),
    };

    RawMutation {
        kind: MutationKind::Delete,
        key: encode_row_key(table.id, handle),
        value,
        commit_ts,
    }
}

/// Encodes a Put establishing a unique-index entry pointing at `handle`.
pub fn index_put(
    table: &TableDefinition,
    index_id: IndexId,
    values: Vec<Datum>,
    handle: i64,
    commit_ts: u64,
) -> RawMutation {
    RawMutation {
        kind: MutationKind::Put,
        key: encode_index_key(table.id, index_id, &values),
        value: encode_index_value(handle),
        commit_ts,
    }
}

/// Encodes a Delete retracting a unique-index entry.
pub fn index_delete(
    table: &TableDefinition,
    index_id: IndexId,
    values: Vec<Datum>,
    commit_ts: u64,
) -> RawMutation {
    RawMutation {
        kind: MutationKind::Delete,
        key: encode_index_key(table.id, index_id, &values),
        value: Bytes::new(),
        commit_ts,
    }
}

/// Encodes a DDL-log mutation carrying a schema-change job.
pub fn ddl_mutation(job: &SchemaChangeJob, commit_ts: u64) -> RawMutation {
    let value = serde_json::to_vec(job).expect("schema-change jobs serialize to JSON");

    RawMutation {
        kind: MutationKind::Put,
        key: encode_ddl_job_key(job.version),
        value: value.into(),
        commit_ts,
    }
}

/// Wraps a mutation into a feed event.
pub fn mutation_event(mutation: RawMutation) -> BufferedEvent {
    BufferedEvent::Mutation(mutation)
}

/// Wraps a watermark into a feed event.
pub fn watermark_event(timestamp: u64) -> BufferedEvent {
    BufferedEvent::Watermark(Watermark { timestamp })
}

/// Builds a raw transaction from mutations, preserving their order.
pub fn raw_transaction(commit_ts: u64, mutations: Vec<RawMutation>) -> RawTransaction {
    RawTransaction {
        commit_ts,
        mutations,
    }
}

/// Builds the expected Insert operation for assertions.
pub fn insert_op(table: &TableDefinition, values: Vec<(&str, Datum)>) -> DmlOp {
    dml_op(table, DmlKind::Insert, values)
}

/// Builds the expected Delete operation for assertions.
pub fn delete_op(table: &TableDefinition, values: Vec<(&str, Datum)>) -> DmlOp {
    dml_op(table, DmlKind::Delete, values)
}

fn dml_op(table: &TableDefinition, kind: DmlKind, values: Vec<(&str, Datum)>) -> DmlOp {
    DmlOp {
        database: table.database.clone(),
        table: table.name.clone(),
        kind,
        values: values
            .into_iter()
            .map(|(name, datum)| (name.to_string(), datum))
            .collect::<HashMap<_, _>>(),
    }
}

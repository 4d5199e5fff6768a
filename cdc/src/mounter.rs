//! Transaction mounting: raw key-value mutations to logical operations.
//!
//! Given a watermark-certified [`RawTransaction`], the mounter either decodes
//! a schema-change job out of the reserved DDL-log key range, or decodes each
//! row and index mutation into row-level operations against the table
//! definition that governed the transaction's commit timestamp. Updates expand
//! to delete-before-insert so that replay against a uniqueness-constrained
//! sink never transiently holds two rows with the same primary key.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, info};

use crate::codec::key::{self, DecodedKey};
use crate::codec::row::{RowImage, decode_index_value, decode_row_value};
use crate::error::{CdcResult, ErrorKind};
use crate::schema::{
    ColumnDefinition, PrimaryKeyForm, SchemaChangeJob, SchemaRegistry, SchemaVersionLookup,
    TableDefinition,
};
use crate::types::{
    Datum, DdlOp, DmlKind, DmlOp, LogicalTransaction, MutationKind, RawMutation, RawTransaction,
    TransactionOps,
};
use crate::{bail, cdc_error};

/// Decodes raw transactions into logical transactions.
///
/// The mounter owns the [`SchemaRegistry`] for its pipeline: advancing the
/// registry is a visible state transition, so exactly one mounter drives it.
/// Aside from that advance, mounting is a pure function of the raw transaction
/// and the pinned schema snapshot; decode failures abort the whole call and
/// no partial transaction escapes.
pub struct TransactionMounter<V> {
    registry: SchemaRegistry,
    versions: V,
}

impl<V> TransactionMounter<V>
where
    V: SchemaVersionLookup,
{
    /// Creates a mounter over a registry and a version-lookup collaborator.
    pub fn new(registry: SchemaRegistry, versions: V) -> Self {
        Self { registry, versions }
    }

    /// Returns read access to the underlying registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Decodes one raw transaction.
    ///
    /// A transaction carrying a DDL-log mutation becomes a DDL-only logical
    /// transaction and is never row-decoded. Anything else is decoded mutation
    /// by mutation, in arrival order, against the schema version governing the
    /// transaction's commit timestamp. An empty DML sequence is valid.
    pub async fn mount(&mut self, raw: RawTransaction) -> CdcResult<LogicalTransaction> {
        if let Some(job_mutation) = raw.mutations.iter().find(|m| key::is_meta_key(&m.key)) {
            let ddl = self.mount_schema_change(job_mutation)?;

            info!(
                commit_ts = raw.commit_ts,
                action = %ddl.action,
                database = %ddl.database,
                table = %ddl.table,
                "mounted schema-change transaction"
            );

            return Ok(LogicalTransaction {
                commit_ts: raw.commit_ts,
                ops: TransactionOps::Ddl(ddl),
            });
        }

        let version = self.versions.version_at(raw.commit_ts).await?;
        self.registry.advance_to(version)?;

        let mut dml = Vec::new();
        // Row images already decoded for a row key within this transaction;
        // the presence of one is what turns a later Put into an update.
        let mut seen: HashMap<Bytes, RowImage> = HashMap::new();

        for mutation in &raw.mutations {
            self.mount_mutation(mutation, &mut seen, &mut dml)?;
        }

        debug!(
            commit_ts = raw.commit_ts,
            operations = dml.len(),
            "mounted transaction"
        );

        Ok(LogicalTransaction {
            commit_ts: raw.commit_ts,
            ops: TransactionOps::Dml(dml),
        })
    }

    /// Decodes the schema-change job carried by a DDL-log mutation and
    /// advances the registry to the job's version.
    fn mount_schema_change(&mut self, mutation: &RawMutation) -> CdcResult<DdlOp> {
        let job: SchemaChangeJob = serde_json::from_slice(&mutation.value)?;
        self.registry.advance_to(job.version)?;

        // The job feed the registry was built from must already contain the
        // job observed on the stream; decoding past it with a stale schema
        // would silently misinterpret later mutations.
        if self.registry.active_version() < job.version {
            bail!(
                ErrorKind::SchemaAdvanceFailed,
                "Schema-change job is not present in the registry's history",
                format!(
                    "job version {} is beyond the registry's last known job (active version {})",
                    job.version,
                    self.registry.active_version()
                )
            );
        }

        Ok(DdlOp {
            database: job.database,
            table: job.table,
            statement: job.statement,
            action: job.action,
        })
    }

    /// Decodes one mutation into zero or more DML operations.
    fn mount_mutation(
        &self,
        mutation: &RawMutation,
        seen: &mut HashMap<Bytes, RowImage>,
        dml: &mut Vec<DmlOp>,
    ) -> CdcResult<()> {
        match key::decode_key(&mutation.key)? {
            DecodedKey::Row { table_id, handle } => {
                let table = self.registry.table_by_id(table_id)?;
                match mutation.kind {
                    MutationKind::Put => self.mount_row_put(table, handle, mutation, seen, dml),
                    MutationKind::Delete => {
                        self.mount_row_delete(table, handle, mutation, seen, dml)
                    }
                }
            }
            DecodedKey::Index {
                table_id,
                index_id,
                values,
            } => {
                let table = self.registry.table_by_id(table_id)?;
                match mutation.kind {
                    // The entry the Put establishes is re-created by the
                    // row-level Insert; only validate the value.
                    MutationKind::Put => decode_index_value(&mutation.value).map(|_| ()),
                    MutationKind::Delete => {
                        self.mount_index_delete(table, index_id, values, dml)
                    }
                }
            }
        }
    }

    /// Decodes a Put on a row key: an insert, or an update expanded into a
    /// delete of the replaced row followed by the insert.
    fn mount_row_put(
        &self,
        table: &TableDefinition,
        handle: i64,
        mutation: &RawMutation,
        seen: &mut HashMap<Bytes, RowImage>,
        dml: &mut Vec<DmlOp>,
    ) -> CdcResult<()> {
        let value = decode_row_value(&mutation.value)?;
        let row = self.build_logical_row(table, handle, &value.row)?;

        let old_image = value
            .old
            .or_else(|| seen.get(&mutation.key).cloned());
        if let Some(old_image) = old_image {
            let identity = self.identity_from_image(table, handle, &old_image)?;
            dml.push(dml_op(table, DmlKind::Delete, identity));
        }

        dml.push(dml_op(table, DmlKind::Insert, row));
        seen.insert(mutation.key.clone(), value.row);

        Ok(())
    }

    /// Decodes a Delete on a row key into a retraction keyed on the row's
    /// identifying columns.
    fn mount_row_delete(
        &self,
        table: &TableDefinition,
        handle: i64,
        mutation: &RawMutation,
        seen: &mut HashMap<Bytes, RowImage>,
        dml: &mut Vec<DmlOp>,
    ) -> CdcResult<()> {
        let identity = match &table.primary_key {
            PrimaryKeyForm::IntegerHandle { .. } => {
                // The handle in the key names the row; no value is needed.
                self.identity_from_image(table, handle, &RowImage::default())?
            }
            PrimaryKeyForm::ExplicitColumns { .. } => {
                if mutation.value.is_empty() {
                    bail!(
                        ErrorKind::DecodeCorruption,
                        "Row delete carries no identity image",
                        format!(
                            "table {}.{} addresses rows by an internal handle; \
                             the delete value must carry the primary-key columns",
                            table.database, table.name
                        )
                    );
                }

                let value = decode_row_value(&mutation.value)?;
                self.identity_from_image(table, handle, &value.row)?
            }
        };

        dml.push(dml_op(table, DmlKind::Delete, identity));
        seen.remove(&mutation.key);

        Ok(())
    }

    /// Decodes a Delete on a unique-index key into a retraction keyed only on
    /// the stale indexed column values.
    fn mount_index_delete(
        &self,
        table: &TableDefinition,
        index_id: u64,
        values: Vec<Datum>,
        dml: &mut Vec<DmlOp>,
    ) -> CdcResult<()> {
        let Some(columns) = table.index_columns(index_id) else {
            bail!(
                ErrorKind::DecodeCorruption,
                "Index id is not part of the table definition",
                format!("index {index_id} on table {}.{}", table.database, table.name)
            );
        };

        if columns.len() != values.len() {
            bail!(
                ErrorKind::DecodeCorruption,
                "Index key does not match the index's column count",
                format!(
                    "index {index_id} on table {}.{} covers {} columns, key carries {}",
                    table.database,
                    table.name,
                    columns.len(),
                    values.len()
                )
            );
        }

        let mut retraction = HashMap::with_capacity(columns.len());
        for (column_id, datum) in columns.iter().zip(values) {
            let column = self.resolve_column(table, *column_id)?;
            check_column_datum(table, column, &datum)?;
            retraction.insert(column.name.clone(), datum);
        }

        dml.push(dml_op(table, DmlKind::Delete, retraction));

        Ok(())
    }

    /// Builds the full column map of a row from its image, validating that
    /// the image covers the table's column set exactly.
    fn build_logical_row(
        &self,
        table: &TableDefinition,
        handle: i64,
        image: &RowImage,
    ) -> CdcResult<HashMap<String, Datum>> {
        let mut values = HashMap::with_capacity(table.columns.len());

        if let Some(handle_column) = table.handle_column() {
            let column = self.resolve_column(table, handle_column)?;
            values.insert(column.name.clone(), Datum::Int(handle));
        }

        for (column_id, datum) in &image.entries {
            let column = self.resolve_column(table, *column_id)?;
            check_column_datum(table, column, datum)?;
            if values.insert(column.name.clone(), datum.clone()).is_some() {
                bail!(
                    ErrorKind::DecodeCorruption,
                    "Row image repeats a column",
                    format!(
                        "column {} of table {}.{}",
                        column.name, table.database, table.name
                    )
                );
            }
        }

        if values.len() != table.columns.len() {
            let missing = table
                .columns
                .iter()
                .filter(|column| !values.contains_key(&column.name))
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            bail!(
                ErrorKind::DecodeCorruption,
                "Row image does not cover the table's column set",
                format!(
                    "table {}.{} is missing columns: {missing}",
                    table.database, table.name
                )
            );
        }

        Ok(values)
    }

    /// Builds the identifying column map of the row an old image describes.
    fn identity_from_image(
        &self,
        table: &TableDefinition,
        handle: i64,
        image: &RowImage,
    ) -> CdcResult<HashMap<String, Datum>> {
        match &table.primary_key {
            PrimaryKeyForm::IntegerHandle { column } => {
                let column = self.resolve_column(table, *column)?;
                Ok(HashMap::from([(column.name.clone(), Datum::Int(handle))]))
            }
            PrimaryKeyForm::ExplicitColumns { columns, .. } => {
                let mut identity = HashMap::with_capacity(columns.len());
                for column_id in columns {
                    let column = self.resolve_column(table, *column_id)?;
                    let Some(datum) = image.get(*column_id) else {
                        bail!(
                            ErrorKind::DecodeCorruption,
                            "Row image is missing a primary-key column",
                            format!(
                                "column {} of table {}.{}",
                                column.name, table.database, table.name
                            )
                        );
                    };

                    check_column_datum(table, column, datum)?;
                    identity.insert(column.name.clone(), datum.clone());
                }

                Ok(identity)
            }
        }
    }

    /// Resolves a column id against a table definition.
    fn resolve_column<'a>(
        &self,
        table: &'a TableDefinition,
        column_id: u32,
    ) -> CdcResult<&'a ColumnDefinition> {
        table.column(column_id).ok_or_else(|| {
            cdc_error!(
                ErrorKind::DecodeCorruption,
                "Column id is not part of the table definition",
                format!(
                    "column id {column_id} of table {}.{}",
                    table.database, table.name
                )
            )
        })
    }
}

/// Validates a decoded datum against its column definition.
fn check_column_datum(
    table: &TableDefinition,
    column: &ColumnDefinition,
    datum: &Datum,
) -> CdcResult<()> {
    if datum.is_null() {
        if column.nullable {
            return Ok(());
        }

        bail!(
            ErrorKind::DecodeCorruption,
            "Null value for a non-nullable column",
            format!(
                "column {} of table {}.{}",
                column.name, table.database, table.name
            )
        );
    }

    if !column.typ.accepts(datum) {
        bail!(
            ErrorKind::DecodeCorruption,
            "Datum type does not match the column type",
            format!(
                "column {} of table {}.{} cannot hold a {} datum",
                column.name,
                table.database,
                table.name,
                datum.kind_name()
            )
        );
    }

    Ok(())
}

/// Builds a DML operation against `table`.
fn dml_op(table: &TableDefinition, kind: DmlKind, values: HashMap<String, Datum>) -> DmlOp {
    DmlOp {
        database: table.database.clone(),
        table: table.name.clone(),
        kind,
        values,
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Datum;

/// Physical identifier of a table in the upstream store's key space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a column within its table definition.
pub type ColumnId = u32;

/// Physical identifier of an index in the upstream store's key space.
pub type IndexId = u64;

/// Monotonically increasing counter incremented by every structural schema
/// change; pins decode semantics to a point in schema history.
pub type SchemaVersion = u64;

/// The logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    BigInt,
    UnsignedBigInt,
    Double,
    Varchar,
    VarBinary,
}

impl ColumnType {
    /// Returns true if a decoded datum is acceptable for this column type.
    ///
    /// [`Datum::Null`] is handled by the nullability check, not here.
    pub fn accepts(&self, datum: &Datum) -> bool {
        matches!(
            (self, datum),
            (ColumnType::Boolean, Datum::Bool(_))
                | (ColumnType::BigInt, Datum::Int(_))
                | (ColumnType::UnsignedBigInt, Datum::Uint(_))
                | (ColumnType::Double, Datum::Double(_))
                | (ColumnType::Varchar, Datum::String(_))
                | (ColumnType::VarBinary, Datum::Bytes(_))
        )
    }
}

/// Definition of a single column in a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Stable column identifier used in the physical row encoding.
    pub id: ColumnId,
    /// Column name.
    pub name: String,
    /// Logical column type.
    pub typ: ColumnType,
    /// Whether the column can contain NULL values.
    pub nullable: bool,
}

/// Definition of a unique index over a set of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Physical index identifier used in the key encoding.
    pub id: IndexId,
    /// Index name.
    pub name: String,
    /// The indexed columns, in index order.
    pub columns: Vec<ColumnId>,
}

/// How a table's primary key is realized physically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyForm {
    /// The primary key is a single integer column whose value is embedded
    /// directly in the row key as the handle.
    IntegerHandle {
        /// The handle column.
        column: ColumnId,
    },
    /// The primary key is one or more ordinary columns, enforced through a
    /// dedicated unique index; rows are addressed by an internal handle that
    /// is not a schema column.
    ExplicitColumns {
        /// The primary-key columns, in key order.
        columns: Vec<ColumnId>,
        /// The unique index realizing the primary key.
        index_id: IndexId,
    },
}

/// The definition of a table as of one schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Physical table identifier.
    pub id: TableId,
    /// Database the table belongs to.
    pub database: String,
    /// Table name.
    pub name: String,
    /// Column definitions, in table column order.
    pub columns: Vec<ColumnDefinition>,
    /// Physical primary-key form.
    pub primary_key: PrimaryKeyForm,
    /// Unique secondary indexes (excluding the primary-key index of
    /// [`PrimaryKeyForm::ExplicitColumns`] tables, which is tracked there).
    pub unique_indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// Returns the column with the given id.
    pub fn column(&self, id: ColumnId) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.id == id)
    }

    /// Returns the column with the given name.
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns the handle column id for [`PrimaryKeyForm::IntegerHandle`]
    /// tables, `None` otherwise.
    pub fn handle_column(&self) -> Option<ColumnId> {
        match &self.primary_key {
            PrimaryKeyForm::IntegerHandle { column } => Some(*column),
            PrimaryKeyForm::ExplicitColumns { .. } => None,
        }
    }

    /// Returns the ids of the columns that uniquely identify a row.
    pub fn primary_key_columns(&self) -> Vec<ColumnId> {
        match &self.primary_key {
            PrimaryKeyForm::IntegerHandle { column } => vec![*column],
            PrimaryKeyForm::ExplicitColumns { columns, .. } => columns.clone(),
        }
    }

    /// Resolves an index id to the column set it covers.
    ///
    /// The primary-key index of an [`PrimaryKeyForm::ExplicitColumns`] table
    /// resolves like any other unique index.
    pub fn index_columns(&self, index_id: IndexId) -> Option<&[ColumnId]> {
        if let PrimaryKeyForm::ExplicitColumns { columns, index_id: pk_index } =
            &self.primary_key
            && *pk_index == index_id
        {
            return Some(columns.as_slice());
        }

        self.unique_indexes
            .iter()
            .find(|index| index.id == index_id)
            .map(|index| index.columns.as_slice())
    }
}

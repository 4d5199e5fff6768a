use std::collections::HashMap;
use std::fmt;

use crate::schema::DdlAction;
use crate::types::Datum;

/// The kind of a decoded row-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmlKind {
    /// A full row is inserted.
    Insert,
    /// A row or index entry is retracted.
    Delete,
}

impl fmt::Display for DmlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "Insert"),
            Self::Delete => write!(f, "Delete"),
        }
    }
}

/// A decoded row-level data change ready for replay.
///
/// For [`DmlKind::Insert`], `values` carries the full column set of the row.
/// For [`DmlKind::Delete`], `values` carries only the columns sufficient to
/// uniquely identify the row or index entry being retracted.
#[derive(Debug, Clone, PartialEq)]
pub struct DmlOp {
    /// Database the affected table belongs to.
    pub database: String,
    /// Affected table name.
    pub table: String,
    /// Whether this is an insert or a retraction.
    pub kind: DmlKind,
    /// Column name to value mapping.
    pub values: HashMap<String, Datum>,
}

/// A decoded schema-change statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DdlOp {
    /// Database the statement applies to.
    pub database: String,
    /// Table the statement applies to; empty for database-level statements.
    pub table: String,
    /// The original statement text.
    pub statement: String,
    /// The structured action kind of the statement.
    pub action: DdlAction,
}

/// The payload of a logical transaction: schema change or data change,
/// never both.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOps {
    /// A single schema-change operation.
    Ddl(DdlOp),
    /// Zero or more row-level operations, in decode order.
    Dml(Vec<DmlOp>),
}

/// A fully decoded transaction handed to the downstream sink.
///
/// Transactions are delivered in strictly increasing `commit_ts` order, each
/// exactly once. The DML sequence preserves the delete-before-insert pairing
/// the decoder establishes for updates; sinks must not reorder it.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalTransaction {
    /// Commit timestamp of the originating raw transaction.
    pub commit_ts: u64,
    /// The decoded operations.
    pub ops: TransactionOps,
}

impl LogicalTransaction {
    /// Returns true if this transaction carries a schema change.
    pub fn is_ddl(&self) -> bool {
        matches!(self.ops, TransactionOps::Ddl(_))
    }

    /// Returns the DDL operation if this is a schema-change transaction.
    pub fn ddl(&self) -> Option<&DdlOp> {
        match &self.ops {
            TransactionOps::Ddl(ddl) => Some(ddl),
            TransactionOps::Dml(_) => None,
        }
    }

    /// Returns the DML sequence if this is a data-change transaction.
    pub fn dml(&self) -> Option<&[DmlOp]> {
        match &self.ops {
            TransactionOps::Ddl(_) => None,
            TransactionOps::Dml(ops) => Some(ops),
        }
    }
}

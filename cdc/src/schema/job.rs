use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{SchemaVersion, TableDefinition};

/// The recognized kinds of schema-change actions.
///
/// The enumeration is closed: a serialized job carrying an action outside this
/// set fails deserialization, which surfaces as a decode error at the call
/// site instead of being silently skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlAction {
    CreateDatabase,
    DropDatabase,
    CreateTable,
    DropTable,
    AddColumn,
    DropColumn,
    AddIndex,
    DropIndex,
}

impl fmt::Display for DdlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDatabase => write!(f, "create database"),
            Self::DropDatabase => write!(f, "drop database"),
            Self::CreateTable => write!(f, "create table"),
            Self::DropTable => write!(f, "drop table"),
            Self::AddColumn => write!(f, "add column"),
            Self::DropColumn => write!(f, "drop column"),
            Self::AddIndex => write!(f, "add index"),
            Self::DropIndex => write!(f, "drop index"),
        }
    }
}

/// One applied schema-change job in the upstream DDL history.
///
/// Jobs arrive pre-parsed: turning a raw SQL statement into a structured job
/// record happens upstream. The registry replays jobs in version order; the
/// mounter decodes the same records out of DDL-log mutation values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaChangeJob {
    /// Schema version this job produced.
    pub version: SchemaVersion,
    /// Structured action kind.
    pub action: DdlAction,
    /// Database the job applies to.
    pub database: String,
    /// Table the job applies to; empty for database-level jobs.
    #[serde(default)]
    pub table: String,
    /// The original statement text.
    pub statement: String,
    /// The table definition resulting from this job, for table-level actions.
    #[serde(default)]
    pub table_definition: Option<TableDefinition>,
}

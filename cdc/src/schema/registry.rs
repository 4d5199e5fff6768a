use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::{CdcResult, ErrorKind};
use crate::schema::{
    DdlAction, SchemaChangeJob, SchemaVersion, TableDefinition, TableId,
};
use crate::{bail, cdc_error};

/// Replayable registry of table and database metadata as a function of schema
/// version.
///
/// Built from the ordered sequence of applied schema-change jobs supplied by
/// the upstream job feed. The visible state is the fold of all jobs with
/// version at or below the currently active version; advancing is monotonic
/// and idempotent.
///
/// The registry is a single-writer resource: exactly one logical caller drives
/// [`SchemaRegistry::advance_to`], because advancing is a visible state
/// transition. Lookups after a given advance are read-only.
#[derive(Debug)]
pub struct SchemaRegistry {
    /// All known jobs, ascending by version.
    jobs: Vec<SchemaChangeJob>,
    /// Index of the first job not yet applied.
    next_job: usize,
    /// Version of the last applied job; 0 before any job is applied.
    active_version: SchemaVersion,
    /// Databases existing at the active version.
    databases: HashSet<String>,
    /// Table definitions at the active version, by physical id.
    tables: HashMap<TableId, TableDefinition>,
    /// Name-to-id mapping at the active version.
    by_name: HashMap<(String, String), TableId>,
}

impl SchemaRegistry {
    /// Creates a registry from a non-empty ordered sequence of schema-change
    /// jobs. No job is applied until the first [`SchemaRegistry::advance_to`].
    pub fn new(jobs: Vec<SchemaChangeJob>) -> CdcResult<Self> {
        if jobs.is_empty() {
            bail!(
                ErrorKind::ConfigError,
                "Schema registry requires at least one schema-change job"
            );
        }

        Ok(Self {
            jobs,
            next_job: 0,
            active_version: 0,
            databases: HashSet::new(),
            tables: HashMap::new(),
            by_name: HashMap::new(),
        })
    }

    /// Returns the currently active schema version.
    pub fn active_version(&self) -> SchemaVersion {
        self.active_version
    }

    /// Replays all unapplied jobs with version at or below `version`, in
    /// ascending version order.
    ///
    /// Requesting a version at or below the active one is a no-op. A malformed
    /// job fails the advance with [`ErrorKind::SchemaAdvanceFailed`]; the
    /// active version stays at the last successfully applied job and no
    /// partial application of the failing job is visible.
    pub fn advance_to(&mut self, version: SchemaVersion) -> CdcResult<()> {
        if version <= self.active_version {
            return Ok(());
        }

        while self.next_job < self.jobs.len() && self.jobs[self.next_job].version <= version {
            let job = self.jobs[self.next_job].clone();
            self.apply(&job)?;
            self.next_job += 1;
            self.active_version = job.version;

            debug!(
                version = job.version,
                action = %job.action,
                database = %job.database,
                table = %job.table,
                "applied schema-change job"
            );
        }

        info!(active_version = self.active_version, "schema registry advanced");

        Ok(())
    }

    /// Returns the definition of `database`.`table` as of the active version.
    pub fn lookup(&self, database: &str, table: &str) -> CdcResult<&TableDefinition> {
        let table_id = self
            .by_name
            .get(&(database.to_string(), table.to_string()))
            .ok_or_else(|| {
                cdc_error!(
                    ErrorKind::UnknownTable,
                    "Table is not known at the active schema version",
                    format!(
                        "{database}.{table} does not exist as of version {}",
                        self.active_version
                    )
                )
            })?;

        self.table_by_id(*table_id)
    }

    /// Returns the definition of the table with the given physical id as of
    /// the active version.
    pub fn table_by_id(&self, id: TableId) -> CdcResult<&TableDefinition> {
        self.tables.get(&id).ok_or_else(|| {
            cdc_error!(
                ErrorKind::UnknownTable,
                "Table id is not known at the active schema version",
                format!(
                    "table id {id} does not exist as of version {}",
                    self.active_version
                )
            )
        })
    }

    /// Applies a single job to the in-memory state.
    fn apply(&mut self, job: &SchemaChangeJob) -> CdcResult<()> {
        match job.action {
            DdlAction::CreateDatabase => {
                if !self.databases.insert(job.database.clone()) {
                    bail!(
                        ErrorKind::SchemaAdvanceFailed,
                        "Schema-change job creates a database that already exists",
                        format!("database {} at version {}", job.database, job.version)
                    );
                }
            }
            DdlAction::DropDatabase => {
                if !self.databases.remove(&job.database) {
                    bail!(
                        ErrorKind::SchemaAdvanceFailed,
                        "Schema-change job drops an unknown database",
                        format!("database {} at version {}", job.database, job.version)
                    );
                }

                self.tables.retain(|_, table| table.database != job.database);
                self.by_name.retain(|(database, _), _| *database != job.database);
            }
            DdlAction::CreateTable => {
                let definition = Self::job_definition(job)?;
                if !self.databases.contains(&definition.database) {
                    bail!(
                        ErrorKind::SchemaAdvanceFailed,
                        "Schema-change job creates a table in an unknown database",
                        format!("database {} at version {}", definition.database, job.version)
                    );
                }
                if self.tables.contains_key(&definition.id) {
                    bail!(
                        ErrorKind::SchemaAdvanceFailed,
                        "Schema-change job creates a table id that already exists",
                        format!("table id {} at version {}", definition.id, job.version)
                    );
                }

                self.by_name.insert(
                    (definition.database.clone(), definition.name.clone()),
                    definition.id,
                );
                self.tables.insert(definition.id, definition);
            }
            DdlAction::DropTable => {
                let key = (job.database.clone(), job.table.clone());
                let Some(table_id) = self.by_name.remove(&key) else {
                    bail!(
                        ErrorKind::SchemaAdvanceFailed,
                        "Schema-change job drops an unknown table",
                        format!(
                            "{}.{} at version {}",
                            job.database, job.table, job.version
                        )
                    );
                };
                self.tables.remove(&table_id);
            }
            DdlAction::AddColumn
            | DdlAction::DropColumn
            | DdlAction::AddIndex
            | DdlAction::DropIndex => {
                let definition = Self::job_definition(job)?;
                if !self.tables.contains_key(&definition.id) {
                    bail!(
                        ErrorKind::SchemaAdvanceFailed,
                        "Schema-change job alters an unknown table",
                        format!("table id {} at version {}", definition.id, job.version)
                    );
                }

                self.tables.insert(definition.id, definition);
            }
        }

        Ok(())
    }

    /// Extracts the resulting table definition a table-level job must carry.
    fn job_definition(job: &SchemaChangeJob) -> CdcResult<TableDefinition> {
        job.table_definition.clone().ok_or_else(|| {
            cdc_error!(
                ErrorKind::SchemaAdvanceFailed,
                "Schema-change job is missing its resulting table definition",
                format!("{} at version {}", job.action, job.version)
            )
        })
    }
}

//! Runtime schema changes for extendable entity tables.
//!
//! Adding or dropping a dynamic field touches two things: the physical column and its
//! row in `dynamic_fields`. Both happen inside one `BEGIN IMMEDIATE` transaction, so a
//! failure after the `ALTER TABLE` rolls the column back with it. The write lock is taken
//! before the column-exists check, which serialises concurrent adds of the same name.

use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;

use crate::{
    errors::{PortalError, is_duplicate_column},
    registry::{FieldRegistry, RegistryError},
    sql::{Identifier, add_column_sql, drop_column_sql},
    store::{has_column, table_columns},
    types::{AbstractType, ActingUser, EntityTable, FieldDefinition, FieldSpec},
};

/// Why a schema change was refused before anything was altered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("only administrators may change the schema")]
    Unauthorized,
    #[error("table, field name and type are required")]
    MissingInput,
    #[error("table cannot be extended")]
    InvalidTable,
    #[error("invalid field name")]
    InvalidIdentifier,
    #[error("invalid field type")]
    InvalidType,
    #[error("column already exists")]
    AlreadyExists,
    #[error("column is protected")]
    ProtectedColumn,
    #[error("column does not exist")]
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddColumnOutcome {
    Added(FieldDefinition),
    Rejected(RejectReason),
    /// Storage and metadata disagree; the change was not applied.
    PartialFailure { detail: String },
}

impl AddColumnOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddColumnOutcome::Added(_))
    }

    pub fn into_result(self) -> Result<FieldDefinition, PortalError> {
        match self {
            AddColumnOutcome::Added(field) => Ok(field),
            AddColumnOutcome::Rejected(reason) => Err(reason.into()),
            AddColumnOutcome::PartialFailure { detail } => Err(PortalError::Inconsistent { detail }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropColumnOutcome {
    Dropped,
    Rejected(RejectReason),
    PartialFailure { detail: String },
}

impl DropColumnOutcome {
    pub fn into_result(self) -> Result<(), PortalError> {
        match self {
            DropColumnOutcome::Dropped => Ok(()),
            DropColumnOutcome::Rejected(reason) => Err(reason.into()),
            DropColumnOutcome::PartialFailure { detail } => Err(PortalError::Inconsistent { detail }),
        }
    }
}

impl From<RejectReason> for PortalError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::Unauthorized => PortalError::Unauthorized,
            RejectReason::AlreadyExists => PortalError::already_exists("column", reason.to_string()),
            RejectReason::NotFound => PortalError::not_found("column", None),
            other => PortalError::Validation(crate::errors::ValidationError::single(
                "field",
                format!("schema.{}", reject_code(other)),
                other.to_string(),
            )),
        }
    }
}

fn reject_code(reason: RejectReason) -> &'static str {
    match reason {
        RejectReason::Unauthorized => "unauthorized",
        RejectReason::MissingInput => "missing_input",
        RejectReason::InvalidTable => "invalid_table",
        RejectReason::InvalidIdentifier => "invalid_identifier",
        RejectReason::InvalidType => "invalid_type",
        RejectReason::AlreadyExists => "already_exists",
        RejectReason::ProtectedColumn => "protected_column",
        RejectReason::NotFound => "not_found",
    }
}

fn rejected_add(spec: &FieldSpec, reason: RejectReason) -> Result<AddColumnOutcome, PortalError> {
    warn!(
        "add column {}.{} rejected: {reason}",
        spec.table_name, spec.field_name
    );
    Ok(AddColumnOutcome::Rejected(reason))
}

fn rejected_drop(table: &str, field_name: &str, reason: RejectReason) -> Result<DropColumnOutcome, PortalError> {
    warn!("drop column {table}.{field_name} rejected: {reason}");
    Ok(DropColumnOutcome::Rejected(reason))
}

/// Adds a typed column to an extendable table and registers its definition.
pub fn add_column(conn: &mut Connection, actor: &ActingUser, spec: &FieldSpec) -> Result<AddColumnOutcome, PortalError> {
    if !actor.is_admin() {
        return rejected_add(spec, RejectReason::Unauthorized);
    }
    if [&spec.table_name, &spec.field_name, &spec.field_type]
        .iter()
        .any(|value| value.trim().is_empty())
    {
        return rejected_add(spec, RejectReason::MissingInput);
    }
    let Some(table) = EntityTable::parse(&spec.table_name) else {
        return rejected_add(spec, RejectReason::InvalidTable);
    };
    let Some(column) = Identifier::parse(&spec.field_name) else {
        return rejected_add(spec, RejectReason::InvalidIdentifier);
    };
    let Some(field_type) = AbstractType::parse(&spec.field_type) else {
        return rejected_add(spec, RejectReason::InvalidType);
    };

    let table_ident = Identifier::table(table);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let columns = table_columns(&tx, &table_ident)?;
    if has_column(&columns, column.as_str()) {
        return rejected_add(spec, RejectReason::AlreadyExists);
    }

    match tx.execute_batch(&add_column_sql(&table_ident, &column, field_type.storage_type())) {
        Ok(()) => {}
        Err(err) if is_duplicate_column(&err) => return rejected_add(spec, RejectReason::AlreadyExists),
        Err(err) => return Err(err.into()),
    }

    let registered = FieldRegistry::new(&tx).register_field(spec);
    match registered {
        Ok(field) => {
            tx.commit()?;
            info!(
                "added column {table}.{column} ({}) for user {}",
                field.field_type, actor.id
            );
            Ok(AddColumnOutcome::Added(field))
        }
        Err(RegistryError::AlreadyExists { .. }) => {
            // Metadata for a column that did not physically exist.
            let detail = format!("orphaned metadata row for {table}.{column}; column add rolled back");
            error!("{detail}");
            Ok(rollback_or_partial(tx, detail))
        }
        Err(err) => {
            error!("registering {table}.{column} failed after alter: {err}");
            let detail = format!("registration of {table}.{column} failed: {err}");
            match tx.rollback() {
                Ok(()) => Err(err.into()),
                Err(rollback_err) => {
                    error!("rollback of {table}.{column} failed: {rollback_err}");
                    Ok(AddColumnOutcome::PartialFailure { detail })
                }
            }
        }
    }
}

fn rollback_or_partial(tx: Transaction<'_>, detail: String) -> AddColumnOutcome {
    if let Err(err) = tx.rollback() {
        error!("rollback failed: {err}");
    }
    AddColumnOutcome::PartialFailure { detail }
}

/// Drops a dynamic column and deletes its definition.
pub fn drop_column(
    conn: &mut Connection,
    actor: &ActingUser,
    table_name: &str,
    field_name: &str,
) -> Result<DropColumnOutcome, PortalError> {
    if !actor.is_admin() {
        return rejected_drop(table_name, field_name, RejectReason::Unauthorized);
    }
    if table_name.trim().is_empty() || field_name.trim().is_empty() {
        return rejected_drop(table_name, field_name, RejectReason::MissingInput);
    }
    let Some(table) = EntityTable::parse(table_name) else {
        return rejected_drop(table_name, field_name, RejectReason::InvalidTable);
    };
    let Some(column) = Identifier::parse(field_name) else {
        return rejected_drop(table_name, field_name, RejectReason::InvalidIdentifier);
    };
    if table.is_protected(column.as_str()) {
        return rejected_drop(table_name, field_name, RejectReason::ProtectedColumn);
    }

    let table_ident = Identifier::table(table);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let columns = table_columns(&tx, &table_ident)?;
    if !has_column(&columns, column.as_str()) {
        return rejected_drop(table_name, field_name, RejectReason::NotFound);
    }

    tx.execute_batch(&drop_column_sql(&table_ident, &column))?;

    let unregistered = FieldRegistry::new(&tx).unregister_field(table, column.as_str());
    match unregistered {
        Ok(()) => {}
        Err(RegistryError::NotFound { .. }) => {
            warn!("dropped unmanaged column {table}.{column}: no field metadata was registered");
        }
        Err(err) => {
            error!("unregistering {table}.{column} failed after drop: {err}");
            return match tx.rollback() {
                Ok(()) => Err(err.into()),
                Err(rollback_err) => {
                    error!("rollback of {table}.{column} failed: {rollback_err}");
                    Ok(DropColumnOutcome::PartialFailure {
                        detail: format!("column {table}.{column} dropped but metadata remains: {err}"),
                    })
                }
            };
        }
    }

    tx.commit()?;
    info!("dropped column {table}.{column} for user {}", actor.id);
    Ok(DropColumnOutcome::Dropped)
}

/// Differences between registered fields and physical columns of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub table: EntityTable,
    /// Registered fields with no physical column.
    pub orphaned_metadata: Vec<String>,
    /// Physical non-base columns with no registered field.
    pub unmanaged_columns: Vec<String>,
    /// Registered fields whose stored type key is not a known field type.
    pub unknown_type_fields: Vec<String>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_metadata.is_empty() && self.unmanaged_columns.is_empty() && self.unknown_type_fields.is_empty()
    }
}

/// Compares metadata with storage. Reports only; nothing is repaired.
pub fn reconcile(conn: &Connection, table: EntityTable) -> Result<ReconcileReport, PortalError> {
    let columns = table_columns(conn, &Identifier::table(table))?;
    let registry = FieldRegistry::new(conn);
    let fields = registry.list_fields(table, false)?;
    let unknown = registry.unknown_type_fields(table)?;

    let orphaned_metadata = fields
        .iter()
        .filter(|field| !has_column(&columns, &field.field_name))
        .map(|field| field.field_name.clone())
        .collect();
    // A registered row with an unreadable type still manages its column.
    let unmanaged_columns = columns
        .iter()
        .filter(|column| !table.is_base_column(column))
        .filter(|column| {
            !fields
                .iter()
                .any(|field| field.field_name.eq_ignore_ascii_case(column))
                && !unknown.iter().any(|(name, _)| name.eq_ignore_ascii_case(column))
        })
        .cloned()
        .collect();
    for (name, type_key) in &unknown {
        warn!("{table}.{name} is registered with unknown type `{type_key}`");
    }

    let report = ReconcileReport {
        table,
        orphaned_metadata,
        unmanaged_columns,
        unknown_type_fields: unknown.into_iter().map(|(name, _)| name).collect(),
    };
    if !report.is_consistent() {
        warn!(
            "{table}: {} orphaned field(s), {} unmanaged column(s), {} field(s) of unknown type",
            report.orphaned_metadata.len(),
            report.unmanaged_columns.len(),
            report.unknown_type_fields.len()
        );
    }
    Ok(report)
}

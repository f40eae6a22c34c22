//! Innovation portal core.
//!
//! Registered users record publications, patents and commercialization projects.
//! Administrators extend the `patents` and `commercializations` tables at runtime with
//! typed fields; the field registry then drives form metadata, value coercion, record
//! statements and report columns.

pub mod client;
pub mod coercion;
pub mod config;
pub mod directory;
pub mod errors;
pub mod export;
pub mod publications;
pub mod registry;
pub mod repository;
pub mod schema;
pub mod scholar;
pub mod sql;
pub mod store;
pub mod types;
pub mod validators;

pub use client::{Portal, RecordHandle, form};
pub use coercion::{FormValues, coerce, coerce_fields};
pub use config::PortalConfig;
pub use directory::{Department, NewUser, User, UserSummary};
pub use errors::*;
pub use export::{Report, ReportKind, build_report, report_filename};
pub use publications::{AmendSummary, Publication, PublicationInput};
pub use registry::{FieldRegistry, RegistryError};
pub use repository::{Record, RecordRepo};
pub use schema::{AddColumnOutcome, DropColumnOutcome, ReconcileReport, RejectReason, add_column, drop_column, reconcile};
pub use scholar::{FetchedPublication, JsonFileSource, PublicationSource, scholar_profile_id};
pub use store::{Database, DatabaseConfig};
pub use types::{
    AbstractType, ActingUser, EntityTable, FieldDefinition, FieldSpec, InputKind, Role, StorageType, TypedValue,
};
pub use validators::{resolve_input_kind, resolve_storage_type, validate_identifier, validate_table};

//! Entry point that owns the database location and opens one connection per call.
//!
//! # Example
//! ```ignore
//! let portal = Portal::open(DatabaseConfig::new("portal.db"))?;
//! let admin = portal.acting_user(1)?;
//!
//! portal.add_field(&admin, &FieldSpec::new("patents", "patent_office", "text").label("Patent Office"))?;
//! let id = portal.records(EntityTable::Patents).insert(&admin, &form)?;
//! ```

mod records;

pub use records::RecordHandle;

use chrono::NaiveDate;

use crate::{
    coercion::FormValues,
    directory::{self, Department, NewUser, User, UserSummary},
    errors::PortalError,
    export::{self, Report, ReportKind},
    publications::{self, AmendSummary, Publication, PublicationInput},
    registry::FieldRegistry,
    scholar::{FetchedPublication, PublicationSource},
    schema::{self, AddColumnOutcome, DropColumnOutcome, ReconcileReport},
    store::{Database, DatabaseConfig},
    types::{ActingUser, EntityTable, FieldDefinition, FieldSpec},
};

/// Portal operations over a single database file.
#[derive(Debug, Clone)]
pub struct Portal {
    db: Database,
}

impl Portal {
    /// Opens the database and creates missing base tables.
    pub fn open(config: DatabaseConfig) -> Result<Self, PortalError> {
        let db = Database::new(config)?;
        db.bootstrap()?;
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn acting_user(&self, user_id: i64) -> Result<ActingUser, PortalError> {
        let conn = self.db.connect()?;
        ActingUser::resolve(&conn, user_id)
    }

    // Schema ---------------------------------------------------------------

    pub fn add_field(&self, actor: &ActingUser, spec: &FieldSpec) -> Result<AddColumnOutcome, PortalError> {
        let mut conn = self.db.connect()?;
        schema::add_column(&mut conn, actor, spec)
    }

    pub fn drop_field(&self, actor: &ActingUser, table: &str, field_name: &str) -> Result<DropColumnOutcome, PortalError> {
        let mut conn = self.db.connect()?;
        schema::drop_column(&mut conn, actor, table, field_name)
    }

    /// Field definitions in declaration order; `for_form` attaches rendering kinds.
    pub fn fields(&self, table: EntityTable, for_form: bool) -> Result<Vec<FieldDefinition>, PortalError> {
        let conn = self.db.connect()?;
        Ok(FieldRegistry::new(&conn).list_fields(table, for_form)?)
    }

    pub fn reconcile(&self, table: EntityTable) -> Result<ReconcileReport, PortalError> {
        let conn = self.db.connect()?;
        schema::reconcile(&conn, table)
    }

    // Records --------------------------------------------------------------

    pub fn records(&self, table: EntityTable) -> RecordHandle<'_> {
        RecordHandle::new(&self.db, table)
    }

    // Users ----------------------------------------------------------------

    pub fn register_user(&self, new: &NewUser) -> Result<User, PortalError> {
        let mut conn = self.db.connect()?;
        directory::register_user(&mut conn, new)
    }

    pub fn user(&self, id: i64) -> Result<User, PortalError> {
        let conn = self.db.connect()?;
        directory::get_user(&conn, id)
    }

    /// Users with per-table counts, optionally filtered by name or email. Admin only.
    pub fn users(&self, actor: &ActingUser, search: Option<&str>) -> Result<Vec<UserSummary>, PortalError> {
        let conn = self.db.connect()?;
        directory::list_users(&conn, actor, search)
    }

    pub fn delete_user(&self, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
        let conn = self.db.connect()?;
        directory::delete_user(&conn, actor, id)
    }

    pub fn departments(&self) -> Result<Vec<Department>, PortalError> {
        let conn = self.db.connect()?;
        directory::list_departments(&conn)
    }

    // Publications ---------------------------------------------------------

    pub fn add_publication(&self, actor: &ActingUser, input: &PublicationInput) -> Result<i64, PortalError> {
        let conn = self.db.connect()?;
        publications::add_publication(&conn, actor, input)
    }

    pub fn update_publication(&self, actor: &ActingUser, id: i64, input: &PublicationInput) -> Result<(), PortalError> {
        let conn = self.db.connect()?;
        publications::update_publication(&conn, actor, id, input)
    }

    pub fn delete_publication(&self, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
        let conn = self.db.connect()?;
        publications::delete_publication(&conn, actor, id)
    }

    pub fn publications(&self, actor: &ActingUser, owner_id: i64) -> Result<Vec<Publication>, PortalError> {
        let conn = self.db.connect()?;
        publications::list_publications(&conn, actor, owner_id)
    }

    pub fn replace_publications(
        &self,
        actor: &ActingUser,
        owner_id: i64,
        entries: &[PublicationInput],
    ) -> Result<usize, PortalError> {
        let mut conn = self.db.connect()?;
        publications::replace_publications(&mut conn, actor, owner_id, entries)
    }

    pub fn amend_publications(
        &self,
        actor: &ActingUser,
        entries: &[FetchedPublication],
    ) -> Result<AmendSummary, PortalError> {
        let mut conn = self.db.connect()?;
        publications::amend_publications(&mut conn, actor, entries)
    }

    pub fn import_publications(
        &self,
        actor: &ActingUser,
        source: &dyn PublicationSource,
        link: &str,
    ) -> Result<AmendSummary, PortalError> {
        let mut conn = self.db.connect()?;
        publications::import_publications(&mut conn, actor, source, link)
    }

    // Reports --------------------------------------------------------------

    pub fn report(&self, actor: &ActingUser, kind: ReportKind) -> Result<Report, PortalError> {
        let conn = self.db.connect()?;
        export::build_report(&conn, actor, kind)
    }

    pub fn report_filename(kind: ReportKind, date: NaiveDate) -> String {
        export::report_filename(kind, date)
    }
}

/// Builds a [`FormValues`] map from key/value pairs.
pub fn form<K, V, I>(pairs: I) -> FormValues
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect()
}

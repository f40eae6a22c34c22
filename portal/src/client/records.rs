//! Per-table record accessor handed out by [`Portal::records`](super::Portal::records).

use crate::{
    coercion::FormValues,
    errors::PortalError,
    repository::{Record, RecordRepo},
    store::Database,
    types::{ActingUser, EntityTable},
};

/// Record operations on one entity table, each on a fresh connection.
#[derive(Debug, Clone, Copy)]
pub struct RecordHandle<'p> {
    db: &'p Database,
    repo: RecordRepo,
}

impl<'p> RecordHandle<'p> {
    pub(crate) fn new(db: &'p Database, table: EntityTable) -> Self {
        Self {
            db,
            repo: RecordRepo::new(table),
        }
    }

    pub fn table(&self) -> EntityTable {
        self.repo.table()
    }

    pub fn insert(&self, actor: &ActingUser, form: &FormValues) -> Result<i64, PortalError> {
        let mut conn = self.db.connect()?;
        self.repo.insert(&mut conn, actor, form)
    }

    pub fn update(&self, actor: &ActingUser, id: i64, form: &FormValues) -> Result<(), PortalError> {
        let mut conn = self.db.connect()?;
        self.repo.update(&mut conn, actor, id, form)
    }

    pub fn get(&self, actor: &ActingUser, id: i64) -> Result<Record, PortalError> {
        let conn = self.db.connect()?;
        self.repo.get(&conn, actor, id)
    }

    pub fn list(&self, actor: &ActingUser) -> Result<Vec<Record>, PortalError> {
        let conn = self.db.connect()?;
        self.repo.list(&conn, actor)
    }

    pub fn delete(&self, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
        let mut conn = self.db.connect()?;
        self.repo.delete(&mut conn, actor, id)
    }
}

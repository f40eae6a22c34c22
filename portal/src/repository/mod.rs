//! Insert, update, read and delete for entity tables that carry dynamic columns.
//!
//! Every save reads the field registry inside its own transaction, so the column set a
//! statement names is the one storage has at that moment. Only base column constants and
//! registry field names ever reach statement text; unknown form keys are ignored.

use std::fmt;

use log::{error, info, warn};
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter, types::Value as SqlValue};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    coercion::{FormValues, coerce, coerce_fields},
    errors::{PortalError, ValidationError, ValidationIssue},
    registry::FieldRegistry,
    sql::{Identifier, InsertStatement, UpdateStatement},
    types::{AbstractType, ActingUser, EntityTable, FieldDefinition, TypedValue},
};

/// One stored row, columns in physical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub user_id: i64,
    pub values: Vec<(String, TypedValue)>,
}

impl Record {
    /// Column value by name, case-insensitive like the column itself.
    pub fn get(&self, column: &str) -> Option<&TypedValue> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in &self.values {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Record access for one extendable table.
#[derive(Debug, Clone, Copy)]
pub struct RecordRepo {
    table: EntityTable,
}

impl RecordRepo {
    pub fn new(table: EntityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> EntityTable {
        self.table
    }

    /// Inserts a record owned by `actor` and returns its id.
    pub fn insert(&self, conn: &mut Connection, actor: &ActingUser, form: &FormValues) -> Result<i64, PortalError> {
        self.validate_required(form)?;

        let tx = conn.transaction().map_err(|err| self.save_failed("insert", err))?;
        let fields = self.snapshot(&tx, "insert")?;

        let mut insert = InsertStatement::new(Identifier::table(self.table));
        insert.push(Identifier::from_static("user_id"), TypedValue::Integer(actor.id));
        for column in self.table.writable_columns() {
            let raw = form.get(column.name).map(String::as_str);
            insert.push(Identifier::from_static(column.name), coerce(raw, AbstractType::LongText));
        }
        for (field, value) in coerce_fields(&fields, form) {
            if let Some(column) = dynamic_column(field) {
                insert.push(column, value);
            }
        }

        tx.execute(&insert.sql(), params_from_iter(insert.params()))
            .map_err(|err| self.save_failed("insert", err))?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(|err| self.save_failed("insert", err))?;

        info!("user {} created {} {id}", actor.id, self.table.singular());
        Ok(id)
    }

    /// Replaces the writable base fields and every registered dynamic field of a record.
    ///
    /// Fields absent from `form` are cleared (booleans to 0). Non-admins may only update
    /// records they own and get `Unauthorized` whether or not the record exists.
    pub fn update(
        &self,
        conn: &mut Connection,
        actor: &ActingUser,
        id: i64,
        form: &FormValues,
    ) -> Result<(), PortalError> {
        let tx = conn.transaction().map_err(|err| self.save_failed("update", err))?;
        self.authorize(&tx, actor, id)?;
        self.validate_required(form)?;

        let fields = self.snapshot(&tx, "update")?;
        let mut update = UpdateStatement::new(Identifier::table(self.table));
        for column in self.table.writable_columns() {
            let raw = form.get(column.name).map(String::as_str);
            update.set(Identifier::from_static(column.name), coerce(raw, AbstractType::LongText));
        }
        for (field, value) in coerce_fields(&fields, form) {
            if let Some(column) = dynamic_column(field) {
                update.set(column, value);
            }
        }
        update.filter(Identifier::from_static("id"), TypedValue::Integer(id));
        if !actor.is_admin() {
            update.filter(Identifier::from_static("user_id"), TypedValue::Integer(actor.id));
        }

        let changed = tx
            .execute(&update.sql(), params_from_iter(update.params()))
            .map_err(|err| self.save_failed("update", err))?;
        if changed == 0 {
            return Err(PortalError::not_found(self.table.singular(), Some(id)));
        }
        tx.commit().map_err(|err| self.save_failed("update", err))?;

        info!("user {} updated {} {id}", actor.id, self.table.singular());
        Ok(())
    }

    pub fn get(&self, conn: &Connection, actor: &ActingUser, id: i64) -> Result<Record, PortalError> {
        self.authorize(conn, actor, id)?;
        let sql = format!("SELECT * FROM {} WHERE \"id\" = ?1", Identifier::table(self.table).quoted());
        let mut stmt = conn.prepare(&sql)?;
        let columns = column_names(&stmt);
        let record = stmt
            .query_row(params![id], |row| read_record(row, &columns))
            .optional()?;
        record.ok_or_else(|| PortalError::not_found(self.table.singular(), Some(id)))
    }

    /// All records visible to `actor`: every row for admins, owned rows otherwise.
    pub fn list(&self, conn: &Connection, actor: &ActingUser) -> Result<Vec<Record>, PortalError> {
        let table = Identifier::table(self.table).quoted();
        let (sql, owner) = if actor.is_admin() {
            (format!("SELECT * FROM {table} ORDER BY \"id\""), None)
        } else {
            (
                format!("SELECT * FROM {table} WHERE \"user_id\" = ?1 ORDER BY \"id\""),
                Some(actor.id),
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let columns = column_names(&stmt);
        let rows = stmt.query_map(params_from_iter(owner.iter()), |row| read_record(row, &columns))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete(&self, conn: &mut Connection, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
        let tx = conn.transaction()?;
        self.authorize(&tx, actor, id)?;
        let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", Identifier::table(self.table).quoted());
        tx.execute(&sql, params![id])?;
        tx.commit()?;
        info!("user {} deleted {} {id}", actor.id, self.table.singular());
        Ok(())
    }

    /// Ownership check that runs before any mutation.
    fn authorize(&self, conn: &Connection, actor: &ActingUser, id: i64) -> Result<(), PortalError> {
        let sql = format!(
            "SELECT \"user_id\" FROM {} WHERE \"id\" = ?1",
            Identifier::table(self.table).quoted()
        );
        let owner: Option<i64> = conn.query_row(&sql, params![id], |row| row.get(0)).optional()?;
        match owner {
            Some(owner) if actor.may_access(owner) => Ok(()),
            None if actor.is_admin() => Err(PortalError::not_found(self.table.singular(), Some(id))),
            _ => {
                warn!("user {} denied access to {} {id}", actor.id, self.table.singular());
                Err(PortalError::Unauthorized)
            }
        }
    }

    fn validate_required(&self, form: &FormValues) -> Result<(), PortalError> {
        let issues: Vec<_> = self
            .table
            .writable_columns()
            .iter()
            .filter(|column| column.required)
            .filter(|column| form.get(column.name).is_none_or(|value| value.trim().is_empty()))
            .map(|column| {
                ValidationIssue::new(
                    column.name,
                    "validation.required",
                    format!("{} is required", column.label),
                )
            })
            .collect();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues).into())
        }
    }

    fn snapshot(&self, tx: &Transaction<'_>, action: &str) -> Result<Vec<FieldDefinition>, PortalError> {
        FieldRegistry::new(tx)
            .list_fields(self.table, false)
            .map_err(|err| self.save_failed(action, err))
    }

    fn save_failed(&self, action: &str, err: impl fmt::Display) -> PortalError {
        error!("{action} on {} failed: {err}", self.table);
        PortalError::save_failed(err)
    }
}

fn dynamic_column(field: &FieldDefinition) -> Option<Identifier> {
    let column = Identifier::parse(&field.field_name);
    if column.is_none() {
        warn!("skipping registered field with invalid name `{}`", field.field_name);
    }
    column
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(str::to_string).collect()
}

fn read_record(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut values = Vec::with_capacity(columns.len());
    let mut id = 0;
    let mut user_id = 0;
    for (index, column) in columns.iter().enumerate() {
        let value = TypedValue::from(row.get::<_, SqlValue>(index)?);
        match column.as_str() {
            "id" => id = value.as_i64().unwrap_or_default(),
            "user_id" => user_id = value.as_i64().unwrap_or_default(),
            _ => {}
        }
        values.push((column.clone(), value));
    }
    Ok(Record { id, user_id, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schema::add_column,
        store::ensure_base_tables,
        types::{FieldSpec, Role},
    };

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", true).unwrap();
        ensure_base_tables(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, name, email, role) VALUES (1, 'Ada', 'ada@example.com', 'admin');
             INSERT INTO users (id, name, email, role) VALUES (2, 'Bo', 'bo@example.com', 'faculty');
             INSERT INTO users (id, name, email, role) VALUES (3, 'Cy', 'cy@example.com', 'user');",
        )
        .unwrap();
        conn
    }

    fn form(pairs: &[(&str, &str)]) -> FormValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    const ADMIN: ActingUser = ActingUser { id: 1, role: Role::Admin };
    const BO: ActingUser = ActingUser { id: 2, role: Role::Faculty };
    const CY: ActingUser = ActingUser { id: 3, role: Role::User };

    #[test]
    fn insert_coerces_dynamic_values() {
        let mut conn = setup();
        add_column(&mut conn, &ADMIN, &FieldSpec::new("patents", "claims", "int")).unwrap();
        add_column(&mut conn, &ADMIN, &FieldSpec::new("patents", "granted", "bool")).unwrap();

        let repo = RecordRepo::new(EntityTable::Patents);
        let id = repo
            .insert(&mut conn, &BO, &form(&[("title", "Widget"), ("claims", "abc"), ("ignored", "x")]))
            .unwrap();

        let record = repo.get(&conn, &BO, id).unwrap();
        assert_eq!(record.user_id, 2);
        assert_eq!(record.get("title"), Some(&TypedValue::Text("Widget".into())));
        assert_eq!(record.get("inventors"), Some(&TypedValue::Null));
        assert_eq!(record.get("claims"), Some(&TypedValue::Null));
        assert_eq!(record.get("granted"), Some(&TypedValue::Integer(0)));
        assert!(record.get("ignored").is_none());
    }

    #[test]
    fn missing_required_base_field_is_a_validation_error() {
        let mut conn = setup();
        let repo = RecordRepo::new(EntityTable::Commercializations);
        let err = repo.insert(&mut conn, &BO, &form(&[("project_name", "  ")])).unwrap_err();
        match err {
            PortalError::Validation(err) => assert!(err.has_code("validation.required")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn ownership_is_checked_uniformly() {
        let mut conn = setup();
        let repo = RecordRepo::new(EntityTable::Patents);
        let id = repo.insert(&mut conn, &BO, &form(&[("title", "Mine")])).unwrap();

        let update = form(&[("title", "Theirs")]);
        assert!(matches!(repo.update(&mut conn, &CY, id, &update), Err(PortalError::Unauthorized)));
        assert!(matches!(repo.update(&mut conn, &CY, 999, &update), Err(PortalError::Unauthorized)));
        assert!(matches!(repo.update(&mut conn, &ADMIN, 999, &update), Err(PortalError::NotFound { .. })));
        assert!(matches!(repo.delete(&mut conn, &CY, id), Err(PortalError::Unauthorized)));

        repo.update(&mut conn, &ADMIN, id, &update).unwrap();
        assert_eq!(
            repo.get(&conn, &BO, id).unwrap().get("title"),
            Some(&TypedValue::Text("Theirs".into()))
        );
        assert!(repo.list(&conn, &CY).unwrap().is_empty());
        assert_eq!(repo.list(&conn, &ADMIN).unwrap().len(), 1);

        repo.delete(&mut conn, &BO, id).unwrap();
        assert!(repo.list(&conn, &BO).unwrap().is_empty());
    }

    #[test]
    fn malformed_date_fails_the_save_without_partial_writes() {
        let mut conn = setup();
        add_column(&mut conn, &ADMIN, &FieldSpec::new("patents", "filed_on", "date")).unwrap();
        let repo = RecordRepo::new(EntityTable::Patents);

        let err = repo
            .insert(&mut conn, &BO, &form(&[("title", "Dated"), ("filed_on", "31/12/2024")]))
            .unwrap_err();
        assert!(matches!(err, PortalError::SaveFailed { .. }));
        assert!(repo.list(&conn, &ADMIN).unwrap().is_empty());

        let id = repo
            .insert(&mut conn, &BO, &form(&[("title", "Dated"), ("filed_on", "2024-12-31")]))
            .unwrap();
        let err = repo
            .update(&mut conn, &BO, id, &form(&[("title", "Dated"), ("filed_on", "soon")]))
            .unwrap_err();
        assert!(matches!(err, PortalError::SaveFailed { .. }));
        assert_eq!(
            repo.get(&conn, &BO, id).unwrap().get("filed_on"),
            Some(&TypedValue::Text("2024-12-31".into()))
        );
    }

    #[test]
    fn record_serializes_as_ordered_map() {
        let record = Record {
            id: 4,
            user_id: 2,
            values: vec![
                ("id".into(), TypedValue::Integer(4)),
                ("title".into(), TypedValue::Text("Widget".into())),
                ("claims".into(), TypedValue::Null),
            ],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":4,"title":"Widget","claims":null}"#);
    }
}

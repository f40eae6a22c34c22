//! Durable metadata for admin-defined fields.
//!
//! The `dynamic_fields` table is the single source of truth for which dynamic columns
//! an entity table carries. Declaration order (row id) defines form layout and export
//! column order.

use log::warn;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::{
    errors::{PortalError, is_constraint_violation},
    types::{AbstractType, EntityTable, FieldDefinition, FieldSpec},
    validators::validate_identifier,
};

/// Reasons a registry write can fail.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("field `{field_name}` is already registered on `{table}`")]
    AlreadyExists { table: String, field_name: String },

    #[error("invalid field name `{0}`")]
    InvalidIdentifier(String),

    #[error("unknown field type `{0}`")]
    InvalidType(String),

    #[error("table `{0}` cannot be extended")]
    InvalidTable(String),

    #[error("field `{field_name}` is not registered on `{table}`")]
    NotFound { table: String, field_name: String },

    #[error("registry storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl From<RegistryError> for PortalError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists { table, field_name } => {
                PortalError::already_exists("field", format!("{table}.{field_name}"))
            }
            RegistryError::NotFound { table, field_name } => {
                PortalError::not_found(format!("field {table}.{field_name}"), None)
            }
            RegistryError::Storage(err) => PortalError::Storage(err),
            other => PortalError::Validation(crate::errors::ValidationError::single(
                "field",
                "registry.invalid",
                other.to_string(),
            )),
        }
    }
}

/// Registry view over a single connection or transaction.
pub struct FieldRegistry<'c> {
    conn: &'c Connection,
}

impl<'c> FieldRegistry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Field definitions for `table` in declaration order.
    ///
    /// With `for_form` each definition also carries its rendering kind; the declared
    /// abstract type is kept either way.
    pub fn list_fields(&self, table: EntityTable, for_form: bool) -> Result<Vec<FieldDefinition>, RegistryError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, field_name, field_label, field_type, is_required, options
             FROM dynamic_fields
             WHERE table_name = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![table.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut fields = Vec::new();
        for row in rows {
            let (id, field_name, field_label, type_key, is_required, options) = row?;
            let Some(field_type) = AbstractType::parse(&type_key) else {
                warn!("skipping {table}.{field_name}: registry holds unknown type `{type_key}`");
                continue;
            };
            fields.push(FieldDefinition {
                id,
                table,
                field_name,
                field_label,
                field_type,
                is_required,
                options: options.filter(|value| !value.is_empty()),
                input_kind: for_form.then(|| field_type.input_kind()),
            });
        }
        Ok(fields)
    }

    /// Names and stored type keys of rows `list_fields` skips because the type is unknown.
    pub fn unknown_type_fields(&self, table: EntityTable) -> Result<Vec<(String, String)>, RegistryError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT field_name, field_type FROM dynamic_fields WHERE table_name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![table.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut unknown = Vec::new();
        for row in rows {
            let (field_name, type_key) = row?;
            if AbstractType::parse(&type_key).is_none() {
                unknown.push((field_name, type_key));
            }
        }
        Ok(unknown)
    }

    /// Validates and durably stores a field definition.
    pub fn register_field(&self, spec: &FieldSpec) -> Result<FieldDefinition, RegistryError> {
        let table =
            EntityTable::parse(&spec.table_name).ok_or_else(|| RegistryError::InvalidTable(spec.table_name.clone()))?;
        if !validate_identifier(&spec.field_name) {
            return Err(RegistryError::InvalidIdentifier(spec.field_name.clone()));
        }
        let field_type =
            AbstractType::parse(&spec.field_type).ok_or_else(|| RegistryError::InvalidType(spec.field_type.clone()))?;

        let label = match spec.field_label.trim() {
            "" => spec.field_name.clone(),
            label => label.to_string(),
        };
        let options = spec
            .options
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let inserted = self.conn.execute(
            "INSERT INTO dynamic_fields (table_name, field_name, field_label, field_type, is_required, options)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![table.as_str(), spec.field_name, label, field_type.key(), spec.is_required, options],
        );
        match inserted {
            Ok(_) => Ok(FieldDefinition {
                id: self.conn.last_insert_rowid(),
                table,
                field_name: spec.field_name.clone(),
                field_label: label,
                field_type,
                is_required: spec.is_required,
                options,
                input_kind: None,
            }),
            Err(err) if is_constraint_violation(&err) => Err(RegistryError::AlreadyExists {
                table: table.to_string(),
                field_name: spec.field_name.clone(),
            }),
            Err(err) => Err(RegistryError::Storage(err)),
        }
    }

    /// Removes a definition. The caller owns removing the physical column.
    pub fn unregister_field(&self, table: EntityTable, field_name: &str) -> Result<(), RegistryError> {
        let removed = self.conn.execute(
            "DELETE FROM dynamic_fields WHERE table_name = ?1 AND field_name = ?2",
            params![table.as_str(), field_name],
        )?;
        if removed == 0 {
            return Err(RegistryError::NotFound {
                table: table.to_string(),
                field_name: field_name.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_registered(&self, table: EntityTable, field_name: &str) -> Result<bool, RegistryError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM dynamic_fields WHERE table_name = ?1 AND field_name = ?2",
                params![table.as_str(), field_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::ensure_base_tables, types::InputKind};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_base_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn lists_in_declaration_order_with_form_mapping() {
        let conn = conn();
        let registry = FieldRegistry::new(&conn);
        registry.register_field(&FieldSpec::new("patents", "filed_on", "date")).unwrap();
        registry
            .register_field(&FieldSpec::new("patents", "granted", "checkbox").label("Granted?"))
            .unwrap();
        registry.register_field(&FieldSpec::new("commercializations", "revenue", "float")).unwrap();

        let fields = registry.list_fields(EntityTable::Patents, true).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["filed_on", "granted"]);
        assert_eq!(fields[0].field_label, "filed_on");
        assert_eq!(fields[1].field_type, AbstractType::Boolean);
        assert_eq!(fields[1].input_kind, Some(InputKind::Checkbox));

        let raw = registry.list_fields(EntityTable::Patents, false).unwrap();
        assert!(raw.iter().all(|f| f.input_kind.is_none()));
    }

    #[test]
    fn rejects_duplicates_bad_names_and_types() {
        let conn = conn();
        let registry = FieldRegistry::new(&conn);
        registry.register_field(&FieldSpec::new("patents", "office", "text")).unwrap();

        assert!(matches!(
            registry.register_field(&FieldSpec::new("patents", "office", "int")),
            Err(RegistryError::AlreadyExists { .. })
        ));
        assert!(matches!(
            registry.register_field(&FieldSpec::new("patents", "OFFICE", "int")),
            Err(RegistryError::AlreadyExists { .. })
        ));
        assert!(matches!(
            registry.register_field(&FieldSpec::new("patents", "9lives", "int")),
            Err(RegistryError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            registry.register_field(&FieldSpec::new("patents", "size", "bigint")),
            Err(RegistryError::InvalidType(_))
        ));
        assert!(matches!(
            registry.register_field(&FieldSpec::new("users", "size", "int")),
            Err(RegistryError::InvalidTable(_))
        ));
        // Same name on the other table is fine.
        registry.register_field(&FieldSpec::new("commercializations", "office", "text")).unwrap();
    }

    #[test]
    fn unregister_reports_missing_rows() {
        let conn = conn();
        let registry = FieldRegistry::new(&conn);
        registry.register_field(&FieldSpec::new("patents", "office", "text")).unwrap();

        registry.unregister_field(EntityTable::Patents, "office").unwrap();
        assert!(!registry.is_registered(EntityTable::Patents, "office").unwrap());
        assert!(matches!(
            registry.unregister_field(EntityTable::Patents, "office"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_persisted_types_are_skipped() {
        let conn = conn();
        conn.execute(
            "INSERT INTO dynamic_fields (table_name, field_name, field_label, field_type) VALUES ('patents', 'legacy', 'Legacy', 'blob')",
            [],
        )
        .unwrap();
        let registry = FieldRegistry::new(&conn);
        assert!(registry.list_fields(EntityTable::Patents, false).unwrap().is_empty());
    }
}

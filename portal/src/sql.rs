//! Statement text construction for dynamic column sets.
//!
//! Values are always bound positionally. Table and column names are the only text
//! spliced into statements, and they can only arrive here as [`Identifier`]s, which
//! are built by validation.

use std::fmt;

use crate::{
    types::{EntityTable, StorageType, TypedValue, VARCHAR_LIMIT},
    validators::validate_identifier,
};

/// A table or column name that passed the identifier grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(name: &str) -> Option<Self> {
        validate_identifier(name).then(|| Self(name.to_string()))
    }

    pub fn table(table: EntityTable) -> Self {
        Self(table.as_str().to_string())
    }

    /// For column names fixed at compile time (base and structural columns).
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(validate_identifier(name), "`{name}` is not a valid identifier");
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for statement text. The grammar rules out embedded quotes.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn placeholder(position: usize) -> String {
    format!("?{position}")
}

/// `INSERT` with a column list known only at call time.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    table: Identifier,
    columns: Vec<Identifier>,
    values: Vec<TypedValue>,
}

impl InsertStatement {
    pub fn new(table: Identifier) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, column: Identifier, value: TypedValue) -> &mut Self {
        self.columns.push(column);
        self.values.push(value);
        self
    }

    pub fn params(&self) -> &[TypedValue] {
        &self.values
    }

    pub fn sql(&self) -> String {
        let columns = self.columns.iter().map(Identifier::quoted).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=self.values.len()).map(placeholder).collect::<Vec<_>>().join(", ");
        format!("INSERT INTO {} ({columns}) VALUES ({placeholders})", self.table.quoted())
    }
}

/// `UPDATE` with a dynamic `SET` list and equality filters.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    table: Identifier,
    assignments: Vec<(Identifier, TypedValue)>,
    filters: Vec<(Identifier, TypedValue)>,
}

impl UpdateStatement {
    pub fn new(table: Identifier) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn set(&mut self, column: Identifier, value: TypedValue) -> &mut Self {
        self.assignments.push((column, value));
        self
    }

    pub fn filter(&mut self, column: Identifier, value: TypedValue) -> &mut Self {
        self.filters.push((column, value));
        self
    }

    /// Assignment values first, then filter values, matching placeholder order.
    pub fn params(&self) -> Vec<&TypedValue> {
        self.assignments
            .iter()
            .chain(self.filters.iter())
            .map(|(_, value)| value)
            .collect()
    }

    pub fn sql(&self) -> String {
        let mut position = 0;
        let mut next = || {
            position += 1;
            placeholder(position)
        };
        let set_clause = self
            .assignments
            .iter()
            .map(|(column, _)| format!("{} = {}", column.quoted(), next()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {set_clause}", self.table.quoted());
        if !self.filters.is_empty() {
            let where_clause = self
                .filters
                .iter()
                .map(|(column, _)| format!("{} = {}", column.quoted(), next()))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }
        sql
    }
}

/// `ALTER TABLE ... ADD COLUMN`, nullable with a null default.
///
/// SQLite does not enforce declared lengths or date formats, so bounded strings and
/// dates carry a column-level check and bad values are refused by storage.
pub fn add_column_sql(table: &Identifier, column: &Identifier, storage: StorageType) -> String {
    let quoted = column.quoted();
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {quoted} {} DEFAULT NULL",
        table.quoted(),
        storage.declaration()
    );
    let check = match storage {
        StorageType::VarChar255 => Some(format!("{quoted} IS NULL OR length({quoted}) <= {VARCHAR_LIMIT}")),
        StorageType::Date => Some(format!("{quoted} IS NULL OR date({quoted}) IS {quoted}")),
        StorageType::Text | StorageType::Integer | StorageType::Double | StorageType::TinyInt1 => None,
    };
    if let Some(check) = check {
        sql.push_str(&format!(" CHECK ({check})"));
    }
    sql
}

pub fn drop_column_sql(table: &Identifier, column: &Identifier) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table.quoted(), column.quoted())
}

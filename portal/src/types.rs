use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize, Serializer};

// ═══════════════════════════════════════════════════════════════════════════════
// Entity tables
// ═══════════════════════════════════════════════════════════════════════════════

/// Record tables that administrators may extend with dynamic columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Patents,
    Commercializations,
}

/// A fixed column every row of an entity table carries.
#[derive(Debug, Clone, Copy)]
pub struct BaseColumn {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
}

const PATENT_WRITABLE: &[BaseColumn] = &[
    BaseColumn {
        name: "title",
        label: "Title",
        required: true,
    },
    BaseColumn {
        name: "inventors",
        label: "Inventors",
        required: false,
    },
];

const COMMERCIALIZATION_WRITABLE: &[BaseColumn] = &[BaseColumn {
    name: "project_name",
    label: "Project Name",
    required: true,
}];

/// Column names that exist on every row and are never user supplied.
pub const STRUCTURAL_COLUMNS: &[&str] = &["id", "user_id", "created_at", "updated_at"];

impl EntityTable {
    pub const ALL: [EntityTable; 2] = [EntityTable::Patents, EntityTable::Commercializations];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityTable::Patents => "patents",
            EntityTable::Commercializations => "commercializations",
        }
    }

    /// Looks up an extendable table by its physical name. Anything else is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == name)
    }

    pub fn singular(&self) -> &'static str {
        match self {
            EntityTable::Patents => "patent",
            EntityTable::Commercializations => "commercialization",
        }
    }

    /// Base columns a user fills in, in form order.
    pub fn writable_columns(&self) -> &'static [BaseColumn] {
        match self {
            EntityTable::Patents => PATENT_WRITABLE,
            EntityTable::Commercializations => COMMERCIALIZATION_WRITABLE,
        }
    }

    /// Every base column name, structural ones included.
    pub fn base_column_names(&self) -> Vec<&'static str> {
        let mut names = vec!["id", "user_id"];
        names.extend(self.writable_columns().iter().map(|column| column.name));
        names.push("created_at");
        names
    }

    /// Columns that can never be dropped, regardless of who asks.
    pub fn is_protected(&self, column: &str) -> bool {
        STRUCTURAL_COLUMNS
            .iter()
            .copied()
            .chain(self.writable_columns().iter().map(|column| column.name))
            .any(|protected| protected.eq_ignore_ascii_case(column))
    }

    pub fn is_base_column(&self, column: &str) -> bool {
        self.base_column_names()
            .into_iter()
            .any(|name| name.eq_ignore_ascii_case(column))
    }
}

impl fmt::Display for EntityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Abstract type vocabulary
// ═══════════════════════════════════════════════════════════════════════════════

/// Closed vocabulary of field kinds an administrator may choose.
///
/// Every variant maps to exactly one [`StorageType`] and one [`InputKind`]; both
/// mappings are exhaustive matches so a new variant cannot be added without deciding
/// how it is stored and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractType {
    ShortText,
    LongText,
    FreeText,
    Choice,
    Date,
    Integer,
    Decimal,
    Boolean,
}

impl AbstractType {
    pub const ALL: [AbstractType; 8] = [
        AbstractType::ShortText,
        AbstractType::LongText,
        AbstractType::FreeText,
        AbstractType::Choice,
        AbstractType::Date,
        AbstractType::Integer,
        AbstractType::Decimal,
        AbstractType::Boolean,
    ];

    /// Canonical key persisted in the registry.
    pub fn key(&self) -> &'static str {
        match self {
            AbstractType::ShortText => "text",
            AbstractType::LongText => "longtext",
            AbstractType::FreeText => "textarea",
            AbstractType::Choice => "select",
            AbstractType::Date => "date",
            AbstractType::Integer => "int",
            AbstractType::Decimal => "float",
            AbstractType::Boolean => "bool",
        }
    }

    /// Parses a type key. `number` and `checkbox` are accepted as aliases of `int` and `bool`.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "number" => Some(AbstractType::Integer),
            "checkbox" => Some(AbstractType::Boolean),
            other => Self::ALL.into_iter().find(|ty| ty.key() == other),
        }
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            AbstractType::ShortText | AbstractType::Choice => StorageType::VarChar255,
            AbstractType::LongText | AbstractType::FreeText => StorageType::Text,
            AbstractType::Date => StorageType::Date,
            AbstractType::Integer => StorageType::Integer,
            AbstractType::Decimal => StorageType::Double,
            AbstractType::Boolean => StorageType::TinyInt1,
        }
    }

    pub fn input_kind(&self) -> InputKind {
        match self {
            AbstractType::ShortText => InputKind::Text,
            AbstractType::LongText | AbstractType::FreeText => InputKind::Textarea,
            AbstractType::Choice => InputKind::Select,
            AbstractType::Date => InputKind::Date,
            AbstractType::Integer | AbstractType::Decimal => InputKind::Number,
            AbstractType::Boolean => InputKind::Checkbox,
        }
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for AbstractType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

/// Longest value a `VARCHAR(255)` column accepts, enforced with a column check.
pub const VARCHAR_LIMIT: usize = 255;

/// Physical column type used in `ALTER TABLE ... ADD COLUMN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    VarChar255,
    Text,
    Date,
    Integer,
    Double,
    TinyInt1,
}

impl StorageType {
    pub fn declaration(&self) -> &'static str {
        match self {
            StorageType::VarChar255 => "VARCHAR(255)",
            StorageType::Text => "TEXT",
            StorageType::Date => "DATE",
            StorageType::Integer => "INTEGER",
            StorageType::Double => "DOUBLE",
            StorageType::TinyInt1 => "TINYINT(1)",
        }
    }
}

/// Form control a dashboard renders for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Textarea,
    Select,
    Date,
    Number,
    Checkbox,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Textarea => "textarea",
            InputKind::Select => "select",
            InputKind::Date => "date",
            InputKind::Number => "number",
            InputKind::Checkbox => "checkbox",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Field definitions
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw "add field" request as an administrator submits it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSpec {
    pub table_name: String,
    pub field_name: String,
    #[serde(default)]
    pub field_label: String,
    pub field_type: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub options: Option<String>,
}

impl FieldSpec {
    pub fn new(table_name: impl Into<String>, field_name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            field_name: field_name.into(),
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.field_label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.is_required = required;
        self
    }

    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }
}

/// A registered dynamic field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub id: i64,
    pub table: EntityTable,
    pub field_name: String,
    pub field_label: String,
    /// Declared type; coercion always uses this, never the rendering kind.
    pub field_type: AbstractType,
    pub is_required: bool,
    pub options: Option<String>,
    /// Rendering kind, attached only when listed for a form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_kind: Option<InputKind>,
}

impl FieldDefinition {
    /// Comma separated choice options, trimmed, blanks dropped.
    pub fn option_list(&self) -> Vec<&str> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|option| !option.is_empty())
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Callers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
    Faculty,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Faculty => "faculty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            "faculty" => Some(Role::Faculty),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the caller, passed explicitly into every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser {
    pub id: i64,
    pub role: Role,
}

impl ActingUser {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may act on any record; everyone else only on their own.
    pub fn may_access(&self, owner_id: i64) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Typed values
// ═══════════════════════════════════════════════════════════════════════════════

/// A value ready to be bound into a statement, or read back from one.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl TypedValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Plain text rendering; null renders as the empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            TypedValue::Null => String::new(),
            TypedValue::Integer(value) => value.to_string(),
            TypedValue::Real(value) => value.to_string(),
            TypedValue::Text(value) => value.clone(),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::Text(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::Text(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Integer(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Real(value)
    }
}

impl From<Option<String>> for TypedValue {
    fn from(value: Option<String>) -> Self {
        value.map(TypedValue::Text).unwrap_or(TypedValue::Null)
    }
}

impl From<SqlValue> for TypedValue {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => TypedValue::Null,
            SqlValue::Integer(value) => TypedValue::Integer(value),
            SqlValue::Real(value) => TypedValue::Real(value),
            SqlValue::Text(value) => TypedValue::Text(value),
            SqlValue::Blob(bytes) => TypedValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

impl ToSql for TypedValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            TypedValue::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            TypedValue::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            TypedValue::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            TypedValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TypedValue::Null => serializer.serialize_none(),
            TypedValue::Integer(value) => serializer.serialize_i64(*value),
            TypedValue::Real(value) => serializer.serialize_f64(*value),
            TypedValue::Text(value) => serializer.serialize_str(value),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}
